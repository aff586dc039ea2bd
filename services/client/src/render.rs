//! Plain-text rendering of conversation turns, property cards, booking
//! confirmations and voice transcript lines.

use concierge_core::{
    BookingConfirmation, ChatRole, ConversationTurn, PropertyListing, Speaker,
    VoiceTranscriptEntry,
};
use std::fmt::Write;

pub fn render_turn(turn: &ConversationTurn) -> String {
    let speaker = match turn.role {
        ChatRole::User => "You",
        ChatRole::Agent => "Agent",
    };
    let mut out = format!("{speaker}: {}", turn.text);

    for property in turn.properties.iter().flatten() {
        out.push('\n');
        out.push_str(&indent(&render_property(property)));
    }
    if let Some(booking) = turn.confirmed_booking() {
        out.push('\n');
        out.push_str(&indent(&render_booking(booking)));
    }
    out
}

pub fn render_property(property: &PropertyListing) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  {}", property.title, property.display_price());
    let _ = writeln!(out, "{}, {}", property.location, property.city);
    if let Some(description) = &property.description {
        let _ = writeln!(out, "{description}");
    }

    let mut facts = Vec::new();
    if let Some(bhk) = property.bedroom_count {
        facts.push(format!("{bhk} BHK"));
    }
    if let Some(kind) = &property.property_type {
        facts.push(kind.replace('_', " "));
    }
    if let Some(area) = property.area_units {
        facts.push(format!("{area} sqft"));
    }
    if !facts.is_empty() {
        let _ = writeln!(out, "{}", facts.join(" · "));
    }

    if let Some(amenities) = property.amenities.as_ref().filter(|a| !a.is_empty()) {
        let tags: Vec<&str> = amenities.iter().map(String::as_str).collect();
        let _ = writeln!(out, "Amenities: {}", tags.join(", "));
    }
    let _ = write!(out, "Property #{}", property.id);
    out
}

pub fn render_booking(booking: &BookingConfirmation) -> String {
    format!(
        "Visit Booked\n{}\n{} at {}\nBooking #{}",
        booking.property_title, booking.visit_date, booking.visit_time, booking.booking_id
    )
}

/// One transcript line. Lines still being revised end with an ellipsis.
pub fn render_voice_line(entry: &VoiceTranscriptEntry) -> String {
    let speaker = match entry.role {
        Speaker::User => "You",
        Speaker::Assistant => "AI",
    };
    if entry.is_final {
        format!("{speaker}: {}", entry.text)
    } else {
        format!("{speaker}: {}…", entry.text)
    }
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
