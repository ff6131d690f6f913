use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Money;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub booking_id: String,
    pub customer_id: String,
    pub service_type: String,
    pub vehicle: String,
    pub service_date: DateTime<Utc>,
    pub labor: LaborCharge,
    pub parts: Vec<PartLine>,
    pub labor_total: Money,
    pub parts_total: Money,
    pub total: Money,
    pub payment_status: PaymentStatus,
}

/// Labor time in hundredths of an hour, billed at an hourly rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaborCharge {
    pub hours_hundredths: i64,
    pub rate: Money,
}

impl LaborCharge {
    pub fn hours(hours: i64, rate: Money) -> Self {
        Self {
            hours_hundredths: hours * 100,
            rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}
