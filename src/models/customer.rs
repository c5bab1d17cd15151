use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    pub customer_id: Uuid,
    pub tax_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub business_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Display name preferring the business name over the personal one.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.business_name.as_deref() {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            "Customer".to_string()
        } else {
            name
        }
    }
}

/// A child registered under a customer, used for back-to-school reservations.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerChild {
    pub child_id: Uuid,
    pub customer_id: Uuid,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}
