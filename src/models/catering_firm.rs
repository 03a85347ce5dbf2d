use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, require_non_blank, validate_email};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CateringFirm {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub cuisine_types: Vec<String>,
    pub rating: f64,
    pub is_active: bool,
    /// e.g. `{"monday": "9:00-21:00"}`
    pub operating_hours: Option<serde_json::Value>,
    /// Only populated on single-firm lookups.
    pub menu_items: Option<Vec<MenuItem>>,
    pub created_at: DateTime<Utc>,
}

impl CateringFirm {
    pub fn serves(&self, cuisine: &str) -> bool {
        self.cuisine_types
            .iter()
            .any(|c| c.eq_ignore_ascii_case(cuisine.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub catering_firm_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub dietary_info: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
    pub is_available: bool,
}

// ── Request payloads ─────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CateringFirmPayload {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub cuisine_types: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub operating_hours: Option<serde_json::Value>,
}

impl CateringFirmPayload {
    pub fn validate(&self) -> AppResult<()> {
        require_non_blank("name", &self.name)?;
        validate_email(&self.email)?;
        require_non_blank("phone", &self.phone)?;
        require_non_blank("address", &self.address)?;
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(AppError::Validation(
                    "rating must be between 0 and 5".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// New firms start unrated unless the payload says otherwise.
    pub fn into_firm(self, now: DateTime<Utc>) -> CateringFirm {
        CateringFirm {
            id: new_id(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            cuisine_types: self.cuisine_types,
            rating: self.rating.unwrap_or(0.0),
            is_active: self.is_active,
            operating_hours: self.operating_hours,
            menu_items: None,
            created_at: now,
        }
    }
}

/// A `catering_firm_id` in the body is ignored; the firm comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct MenuItemPayload {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub dietary_info: Option<Vec<String>>,
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl MenuItemPayload {
    pub fn validate(&self) -> AppResult<()> {
        require_non_blank("name", &self.name)?;
        require_non_blank("category", &self.category)?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::Validation("price must be >= 0".to_string()));
        }
        Ok(())
    }

    pub fn into_menu_item(self, firm_id: &str) -> MenuItem {
        MenuItem {
            id: new_id(),
            catering_firm_id: firm_id.to_string(),
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            dietary_info: self.dietary_info,
            ingredients: self.ingredients,
            is_available: self.is_available,
        }
    }
}

// ── Query parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct CateringFirmFilters {
    pub is_active: Option<bool>,
    pub cuisine_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MenuFilters {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FirmOrderFilters {
    pub status: Option<String>,
}

/// Per-firm sales summary.
#[derive(Debug, Clone, Serialize)]
pub struct FirmAnalytics {
    pub firm_id: String,
    pub total_orders: i64,
    pub revenue: f64,
    pub average_rating: f64,
    pub popular_items: Vec<PopularItem>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PopularItem {
    pub menu_item_name: String,
    pub quantity: i64,
}
