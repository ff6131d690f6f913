use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub customer_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRegistration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

/// Profile edit. Absent fields keep their stored value; an explicit `null`
/// clears `phone` or `date_of_birth`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
}

// Only called for keys that appear in the body, so `null` becomes `Some(None)`.
fn present<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

impl Customer {
    pub fn apply(&mut self, update: CustomerUpdate) {
        if let Some(v) = update.first_name {
            self.first_name = v;
        }
        if let Some(v) = update.last_name {
            self.last_name = v;
        }
        if let Some(v) = update.email {
            self.email = v;
        }
        if let Some(v) = update.phone {
            self.phone = v.filter(|p| !p.trim().is_empty());
        }
        if let Some(v) = update.date_of_birth {
            self.date_of_birth = v;
        }
        if let Some(v) = update.is_active {
            self.is_active = v;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("first and last name are required".to_string());
        }
        if !self.email.contains('@') {
            return Err(format!("invalid email: {}", self.email));
        }
        Ok(())
    }
}

impl CustomerRegistration {
    pub fn into_customer(self, customer_id: String) -> Customer {
        Customer {
            customer_id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.filter(|p| !p.trim().is_empty()),
            date_of_birth: self.date_of_birth,
            is_active: true,
        }
    }
}
