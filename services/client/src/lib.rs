//! Concierge Client Library Crate
//!
//! Orchestrates a visitor's session with the property concierge: the
//! phone-verification flow, the typed chat channel and live voice calls,
//! on top of durable client storage and the backend HTTP contract. The
//! `concierge` binary is a thin terminal front end over this library.

pub mod auth;
pub mod backend;
pub mod chat;
pub mod config;
pub mod context;
pub mod render;
pub mod session;
pub mod storage;
pub mod voice;

#[cfg(test)]
mod testing;
