use serde::{Deserialize, Serialize};

use super::Money;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: String,
    pub item_name: String,
    pub quantity: i64,
    pub price: Money,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInventoryItem {
    pub item_name: String,
    pub quantity: i64,
    pub price: Money,
    pub description: Option<String>,
}
