use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, require_non_blank, validate_email};
use crate::error::AppResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Free-form preferences, e.g. `{"dietary": ["vegetarian"], "spice_level": "mild"}`
    pub preferences: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// Body for create and full update. Server-owned fields (`id`, `created_at`) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerPayload {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
}

impl CustomerPayload {
    pub fn validate(&self) -> AppResult<()> {
        require_non_blank("name", &self.name)?;
        validate_email(&self.email)?;
        require_non_blank("phone", &self.phone)?;
        require_non_blank("address", &self.address)
    }

    pub fn into_customer(self, now: DateTime<Utc>) -> Customer {
        Customer {
            id: new_id(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            preferences: self.preferences,
            created_at: now,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct CustomerFilters {
    pub limit: Option<i64>,
}
