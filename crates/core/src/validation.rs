//! Input validation utilities.
//!
//! Validation happens before any provider or network call so rejected input never leaves the
//! process.

use crate::{PortalError, PortalResult};
use portal_types::PhoneNumber;

/// Validates a phone number entered on the login screen.
///
/// # Errors
///
/// Returns `PortalError::InvalidPhone` unless `phone` is exactly ten ASCII digits.
pub fn validate_phone(phone: &str) -> PortalResult<PhoneNumber> {
    Ok(PhoneNumber::parse(phone)?)
}

/// Validates that a patient identifier is safe for embedding in a share URL path.
///
/// The identifier becomes a path segment: `{share_base}/{patient_id}?qr=..&token=..`.
/// - Rejects empty or whitespace-only strings
/// - Bounds the length to avoid pathological inputs
/// - Restricts characters to a conservative ASCII set that needs no escaping
///
/// # Errors
///
/// Returns a `PortalError::InvalidInput` if the identifier is invalid.
pub fn validate_patient_id_safe_for_url(patient_id: &str) -> PortalResult<()> {
    const MAX_PATIENT_ID_LEN: usize = 128;

    if patient_id.trim().is_empty() {
        return Err(PortalError::InvalidInput(
            "patient id cannot be empty".into(),
        ));
    }

    if patient_id.len() > MAX_PATIENT_ID_LEN {
        return Err(PortalError::InvalidInput(format!(
            "patient id exceeds maximum length of {} characters",
            MAX_PATIENT_ID_LEN
        )));
    }

    let ok = patient_id
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok {
        return Err(PortalError::InvalidInput(
            "patient id contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone_for_all_lengths() {
        for len in 0..=15 {
            let phone = "9".repeat(len);
            assert_eq!(validate_phone(&phone).is_ok(), len == 10, "len {len}");
        }
    }

    #[test]
    fn test_patient_id_accepts_simple_ids() {
        assert!(validate_patient_id_safe_for_url("patient_123").is_ok());
        assert!(validate_patient_id_safe_for_url("P-9.a").is_ok());
    }

    #[test]
    fn test_patient_id_rejects_url_metacharacters() {
        for bad in ["", "  ", "a/b", "a?b", "a&b", "a b", "émile"] {
            assert!(validate_patient_id_safe_for_url(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_patient_id_rejects_overlong() {
        let long = "a".repeat(129);
        assert!(validate_patient_id_safe_for_url(&long).is_err());
    }
}
