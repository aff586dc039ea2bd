//! Domain model for the concierge: accounts, conversation turns, structured
//! results and the voice call lifecycle.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque identifier correlating anonymous chat turns into one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer token issued after a successful OTP verification.
///
/// The value is kept in a `SecretString` so it never shows up in `Debug`
/// output or log fields.
pub struct AuthToken(SecretString);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Returns the raw bearer value, for the `Authorization` header and storage only.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for AuthToken {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

/// Client-side cache of the server account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Account {
    /// A profile is complete once both name and email are present and non-empty.
    pub fn profile_complete(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.name) && present(&self.email)
    }
}

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Agent,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Agent => write!(f, "agent"),
        }
    }
}

/// A property match returned by the assistant. Read-only snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyListing {
    pub id: i64,
    pub title: String,
    pub price_minor_units: u64,
    pub location: String,
    pub city: String,
    pub bedroom_count: Option<u32>,
    pub area_units: Option<f64>,
    pub amenities: Option<BTreeSet<String>>,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub status: Option<String>,
    pub image_url: Option<String>,
}

impl PropertyListing {
    /// Price in the short form used on property cards, e.g. `₹75.0 L`.
    pub fn display_price(&self) -> String {
        format!("₹{}", format_price(self.price_minor_units))
    }
}

/// Formats a price given in minor units (paise) the way Indian listings read:
/// crores and lakhs with one decimal, smaller amounts with Indian digit grouping.
pub fn format_price(minor_units: u64) -> String {
    const CRORE: f64 = 10_000_000.0;
    const LAKH: f64 = 100_000.0;

    let rupees = minor_units as f64 / 100.0;
    if rupees >= CRORE {
        format!("{:.1} Cr", rupees / CRORE)
    } else if rupees >= LAKH {
        format!("{:.1} L", rupees / LAKH)
    } else {
        group_indian(minor_units.saturating_add(50) / 100)
    }
}

fn group_indian(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

/// Outcome of a visit-booking tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub success: bool,
    #[serde(default)]
    pub booking_id: i64,
    #[serde(default)]
    pub property_title: String,
    #[serde(default)]
    pub visit_date: String,
    #[serde(default)]
    pub visit_time: String,
}

/// One entry of the chat transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub role: ChatRole,
    pub text: String,
    pub properties: Option<Vec<PropertyListing>>,
    pub booking: Option<BookingConfirmation>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            properties: None,
            booking: None,
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Agent,
            text: text.into(),
            properties: None,
            booking: None,
        }
    }

    /// The booking, but only when it actually succeeded.
    pub fn confirmed_booking(&self) -> Option<&BookingConfirmation> {
        self.booking.as_ref().filter(|b| b.success)
    }
}

/// Who is speaking in a voice call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Assistant => write!(f, "assistant"),
        }
    }
}

/// A line of the live voice transcript. A non-final entry is replaced in
/// place by the final entry for the same speaker turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceTranscriptEntry {
    pub role: Speaker,
    pub text: String,
    pub is_final: bool,
}

/// Lifecycle of the (single) voice call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallState {
    #[default]
    Idle,
    Connecting,
    Active,
}

impl CallState {
    /// `Connecting` and `Active` both hold the transport.
    pub fn is_live(&self) -> bool {
        !matches!(self, CallState::Idle)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Idle => write!(f, "idle"),
            CallState::Connecting => write!(f, "connecting"),
            CallState::Active => write!(f, "active"),
        }
    }
}
