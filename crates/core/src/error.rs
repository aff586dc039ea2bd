//! Error taxonomy shared by the auth, chat and voice channels.
//!
//! Validation and auth errors are meant to be shown to the user. Chat transport
//! failures never reach the caller (they become a fallback turn) and voice runtime
//! errors are only logged, so neither has a variant here.

use crate::model::CallState;

/// Client-side input shape rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Enter a valid phone number (at least {required} digits, got {digits})")]
    PhoneTooShort { digits: usize, required: usize },
    #[error("Enter the 6-digit OTP")]
    InvalidOtp,
    #[error("Name is required")]
    EmptyName,
    #[error("Enter a valid email")]
    InvalidEmail,
}

/// Failures of the phone → OTP → profile flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    OtpSend(String),
    #[error("{0}")]
    OtpVerify(String),
    #[error("{0}")]
    ProfileUpdate(String),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Already signed in; log out first")]
    AlreadyAuthenticated,
    #[error("Profile incomplete; finish signing in")]
    ProfileIncomplete,
}

/// The only chat failures a caller ever sees. Transport and decode failures
/// are absorbed into the transcript as a fallback reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a message is already awaiting a reply")]
    TurnInFlight,
}

/// Failures surfaced by the voice channel's `start`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    #[error("a call is already {0}; stop it first")]
    CallInProgress(CallState),
    #[error("failed to start voice call: {0}")]
    Start(String),
}

/// Decode failure of a backend conversation payload.
#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error("payload has no `message` text")]
    MissingMessage,
    #[error("malformed conversation payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::PhoneTooShort {
            digits: 7,
            required: 10,
        };
        assert_eq!(
            err.to_string(),
            "Enter a valid phone number (at least 10 digits, got 7)"
        );
        assert_eq!(ValidationError::InvalidOtp.to_string(), "Enter the 6-digit OTP");
        assert_eq!(ValidationError::EmptyName.to_string(), "Name is required");
        assert_eq!(ValidationError::InvalidEmail.to_string(), "Enter a valid email");
    }

    #[test]
    fn test_auth_error_is_transparent_over_validation() {
        let err: AuthError = ValidationError::EmptyName.into();
        assert!(matches!(err, AuthError::Validation(ValidationError::EmptyName)));
        assert_eq!(err.to_string(), "Name is required");
    }

    #[test]
    fn test_auth_error_gate_messages() {
        assert_eq!(AuthError::NotAuthenticated.to_string(), "Not authenticated");
        assert_eq!(
            AuthError::ProfileIncomplete.to_string(),
            "Profile incomplete; finish signing in"
        );
    }

    #[test]
    fn test_auth_error_surfaces_server_reason_verbatim() {
        let err = AuthError::OtpVerify("OTP expired".to_string());
        assert_eq!(err.to_string(), "OTP expired");
    }

    #[test]
    fn test_voice_error_mentions_state() {
        let err = VoiceError::CallInProgress(CallState::Active);
        assert_eq!(err.to_string(), "a call is already active; stop it first");
    }
}
