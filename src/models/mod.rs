pub mod catering_firm;
pub mod customer;
pub mod delivery;
pub mod order;
pub mod payment;
pub mod status;

pub use catering_firm::*;
pub use customer::*;
pub use delivery::*;
pub use order::*;
pub use payment::*;
pub use status::*;

use crate::error::{AppError, AppResult};

/// Fresh opaque identifier for a new entity.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn require_non_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Loose structural check: `local@domain.tld`, no whitespace.
pub(crate) fn validate_email(value: &str) -> AppResult<()> {
    let invalid = || AppError::Validation(format!("'{}' is not a valid email address", value));

    if value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}
