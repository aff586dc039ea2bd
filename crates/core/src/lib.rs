//! Concierge domain core.
//!
//! Pure types and decoding shared by the chat and voice channels: the account
//! and conversation model, local input validation, the error taxonomy, and the
//! interpreter for the assistant's structured replies. Nothing here does I/O.

pub mod error;
pub mod interpret;
pub mod model;
pub mod validation;

pub use error::{AuthError, ChatError, InterpretError, ValidationError, VoiceError};
pub use interpret::{ConversationResult, interpret};
pub use model::{
    Account, AuthToken, BookingConfirmation, CallState, ChatRole, ConversationTurn,
    PropertyListing, SessionId, Speaker, VoiceTranscriptEntry,
};
