//! Decoder for the structured payload the assistant returns on a turn.
//!
//! Both the chat and voice channels receive the same shape:
//! `{ message, properties?, booking? }`. Absence or `null` of an optional
//! field means there are no results of that kind this turn.

use crate::error::InterpretError;
use crate::model::{BookingConfirmation, ConversationTurn, PropertyListing};
use serde::Deserialize;
use std::collections::BTreeSet;

/// A decoded assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationResult {
    pub message: String,
    pub properties: Option<Vec<PropertyListing>>,
    pub booking: Option<BookingConfirmation>,
}

impl ConversationResult {
    /// Booking, only when it succeeded. Failed bookings are never surfaced.
    pub fn confirmed_booking(&self) -> Option<&BookingConfirmation> {
        self.booking.as_ref().filter(|b| b.success)
    }

    pub fn into_turn(self) -> ConversationTurn {
        let mut turn = ConversationTurn::agent(self.message);
        turn.properties = self.properties;
        turn.booking = self.booking;
        turn
    }
}

#[derive(Deserialize)]
struct RawResult {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    properties: Option<Vec<RawProperty>>,
    #[serde(default)]
    booking: Option<BookingConfirmation>,
}

#[derive(Deserialize)]
struct RawProperty {
    id: i64,
    title: String,
    price: f64,
    location: String,
    city: String,
    bhk: Option<u32>,
    area_sqft: Option<f64>,
    amenities: Option<RawAmenities>,
    description: Option<String>,
    property_type: Option<String>,
    status: Option<String>,
    image_url: Option<String>,
}

/// Amenities arrive either as a list or as text holding a JSON list (the
/// backend stores them that way); plain comma-separated text is also accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmenities {
    List(Vec<String>),
    Text(String),
}

impl RawAmenities {
    fn into_tags(self) -> Option<BTreeSet<String>> {
        let items = match self {
            RawAmenities::List(items) => items,
            RawAmenities::Text(text) => {
                let text = text.trim();
                if text.starts_with('[') {
                    serde_json::from_str::<Vec<String>>(text).unwrap_or_default()
                } else {
                    text.split(',').map(str::to_string).collect()
                }
            }
        };
        let tags: BTreeSet<String> = items
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        (!tags.is_empty()).then_some(tags)
    }
}

impl From<RawProperty> for PropertyListing {
    fn from(raw: RawProperty) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
            price_minor_units: (raw.price.max(0.0) * 100.0).round() as u64,
            location: raw.location,
            city: raw.city,
            bedroom_count: raw.bhk,
            area_units: raw.area_sqft,
            amenities: raw.amenities.and_then(RawAmenities::into_tags),
            description: raw.description.filter(|d| !d.trim().is_empty()),
            property_type: raw.property_type,
            status: raw.status,
            image_url: raw.image_url,
        }
    }
}

/// Decodes a raw backend payload into a [`ConversationResult`].
pub fn interpret(payload: serde_json::Value) -> Result<ConversationResult, InterpretError> {
    let raw: RawResult = serde_json::from_value(payload)?;
    let message = raw.message.ok_or(InterpretError::MissingMessage)?;
    let properties = raw
        .properties
        .filter(|list| !list.is_empty())
        .map(|list| list.into_iter().map(PropertyListing::from).collect());

    Ok(ConversationResult {
        message,
        properties,
        booking: raw.booking,
    })
}
