//! Input validation utilities.
//!
//! Everything here runs before a write is attempted, so a failure never leaves partial state.

use crate::constants::{MAX_KEY_LEN, MIN_PASSWORD_LEN};
use crate::{AdminError, AdminResult};

/// Validates that a key (document id, field name, project id) is a safe single path segment.
///
/// Keys are used as file names by the file-backed store, so they are restricted to
/// `[A-Za-z0-9_-]`, 1 to `MAX_KEY_LEN` characters.
pub fn validate_key(kind: &str, key: &str) -> AdminResult<()> {
    if key.is_empty() {
        return Err(AdminError::Validation(format!("{kind} cannot be empty")));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(AdminError::Validation(format!(
            "{kind} exceeds maximum length of {MAX_KEY_LEN} characters"
        )));
    }

    let ok = key
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_'));
    if !ok {
        return Err(AdminError::Validation(format!(
            "{kind} '{key}' contains invalid characters (only alphanumeric, '-', '_' allowed)"
        )));
    }

    Ok(())
}

/// Applies the identity provider's password strength policy.
pub fn validate_password(password: &str) -> AdminResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AdminError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if password.trim().is_empty() {
        return Err(AdminError::Validation(
            "password cannot consist only of whitespace".into(),
        ));
    }

    Ok(())
}

/// Amounts on billing records must be finite and strictly positive.
pub fn validate_amount(field: &str, amount: f64) -> AdminResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AdminError::Validation(format!(
            "{field} must be a positive amount, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_accepts_ids_and_counter_names() {
        assert!(validate_key("document id", "550e8400e29b41d4a716446655440000").is_ok());
        assert!(validate_key("document id", "purchaseOrderId").is_ok());
        assert!(validate_key("document id", "bill_42-a").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_path_tricks() {
        for bad in ["", "..", "a/b", "a.json", "with space", "ünïcode"] {
            let err = validate_key("document id", bad).unwrap_err();
            assert!(matches!(err, AdminError::Validation(_)), "{bad:?}");
        }
        let long = "a".repeat(MAX_KEY_LEN + 1);
        assert!(validate_key("document id", &long).is_err());
    }

    #[test]
    fn test_validate_password_policy() {
        assert!(validate_password("abc12").is_err());
        assert!(validate_password("      ").is_err());
        assert!(validate_password("abc123").is_ok());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount("amount", 12.5).is_ok());
        assert!(validate_amount("amount", 0.0).is_err());
        assert!(validate_amount("amount", -3.0).is_err());
        assert!(validate_amount("amount", f64::NAN).is_err());
        assert!(validate_amount("amount", f64::INFINITY).is_err());
    }
}
