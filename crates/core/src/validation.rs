//! Local input checks run before any request leaves the client.

use crate::error::ValidationError;

/// Minimum count of digits in a phone number.
pub const MIN_PHONE_DIGITS: usize = 10;

/// Length of the one-time code.
pub const OTP_LENGTH: usize = 6;

/// Strips whitespace from `phone` and checks it carries enough digits.
///
/// Returns the cleaned number, which is what gets sent to the backend.
pub fn validate_phone(phone: &str) -> Result<String, ValidationError> {
    let cleaned: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = cleaned.chars().filter(char::is_ascii_digit).count();
    if digits < MIN_PHONE_DIGITS {
        return Err(ValidationError::PhoneTooShort {
            digits,
            required: MIN_PHONE_DIGITS,
        });
    }
    Ok(cleaned)
}

/// Accepts exactly six ASCII digits.
pub fn validate_otp(code: &str) -> Result<(), ValidationError> {
    if code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidOtp)
    }
}

/// Trims both fields and checks them. Returns the trimmed `(name, email)`.
pub fn validate_profile<'a>(
    name: &'a str,
    email: &'a str,
) -> Result<(&'a str, &'a str), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok((name, email))
}
