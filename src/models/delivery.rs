use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DeliveryStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: String,
    pub order_id: String,
    pub driver_id: Option<String>,
    pub status: DeliveryStatus,
    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub current_location: Option<Location>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    /// Blob name of the proof-of-delivery signature, once captured.
    pub signature_blob: Option<String>,
}

/// Driver assignment is always decided server-side; only the order is read from the body.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryPayload {
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryStatusParams {
    pub status: DeliveryStatus,
}

#[derive(Debug, Deserialize)]
pub struct LocationParams {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Default)]
pub struct CompleteParams {
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryTracking {
    pub delivery_id: String,
    pub status: DeliveryStatus,
    pub current_location: Option<Location>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub driver: Option<Driver>,
    pub route: Vec<Location>,
}
