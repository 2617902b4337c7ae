//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Trim a display name and reject empty values.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Canonical form of an email address: NFKC, trimmed, lowercased.
///
/// Uniqueness of member emails is checked on this form.
pub(crate) fn normalize_email(value: &str) -> ResultEngine<String> {
    let email: String = value.trim().nfkc().collect::<String>().to_lowercase();
    if email.is_empty() {
        return Err(EngineError::InvalidInput(
            "email must not be empty".to_string(),
        ));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(EngineError::InvalidInput(format!("invalid email: {email}")));
    };
    if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(EngineError::InvalidInput(format!("invalid email: {email}")));
    }
    Ok(email)
}

/// Validate quantity and unit price of a grocery item.
pub(crate) fn validate_item_amounts(quantity: i32, unit_price: f64) -> ResultEngine<()> {
    if quantity <= 0 {
        return Err(EngineError::InvalidInput(
            "quantity must be > 0".to_string(),
        ));
    }
    if !unit_price.is_finite() || unit_price < 0.0 {
        return Err(EngineError::InvalidInput(
            "unit price must be a finite value >= 0".to_string(),
        ));
    }
    Ok(())
}

/// Reject update requests whose body id differs from the addressed id.
pub(crate) fn ensure_same_id(path_id: Uuid, body_id: Uuid, label: &str) -> ResultEngine<()> {
    if path_id != body_id {
        return Err(EngineError::IdMismatch(format!(
            "{label} id {path_id} does not match body id {body_id}"
        )));
    }
    Ok(())
}
