//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dto::parse_system_time;

/// Validates that a timestamp string is RFC3339.
///
/// # Examples
///
/// ```ignore
/// validate_rfc3339("2026-08-06T19:30:00Z")      // Ok
/// validate_rfc3339("yesterday around nine")     // Err
/// ```
pub fn validate_rfc3339(value: &str) -> Result<(), ValidationError> {
    if parse_system_time(value).is_none() {
        let mut err = ValidationError::new("timestamp_format");
        err.message = Some(format!("`{value}` is not an RFC3339 timestamp").into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rfc3339_valid() {
        assert!(validate_rfc3339("2026-08-06T19:30:00Z").is_ok());
        assert!(validate_rfc3339("2026-08-06T12:00:00-07:00").is_ok());
    }

    #[test]
    fn test_validate_rfc3339_invalid() {
        assert!(validate_rfc3339("").is_err());
        assert!(validate_rfc3339("2026-08-06").is_err()); // date only
        assert!(validate_rfc3339("tonight").is_err());
    }
}
