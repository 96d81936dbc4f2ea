//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dto::parse_system_time;

/// Rejects names that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a timestamp is RFC 3339.
///
/// ```ignore
/// validate_rfc3339("2024-05-01T14:00:00Z") // Ok
/// validate_rfc3339("01/05/2024")           // Err
/// ```
pub fn validate_rfc3339(value: &str) -> Result<(), ValidationError> {
    if parse_system_time(value).is_none() {
        let mut err = ValidationError::new("rfc3339");
        err.message = Some(format!("`{value}` is not an RFC 3339 timestamp").into());
        return Err(err);
    }
    Ok(())
}
