use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer data as supplied by the buyer. `email` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub last_name: String,
    pub dni: String,
    pub phone: String,
    pub email: String,
}

/// A persisted customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub last_name: String,
    pub dni: String,
    pub phone: String,
    pub email: String,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.last_name)
    }
}
