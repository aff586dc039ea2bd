//! The seam between `VoiceChannel` and the external real-time call engine.

pub mod websocket;

use super::protocol::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub use websocket::WebSocketTransport;

/// A real-time call engine.
///
/// `start` returns once the call is being set up; from then on the transport
/// reports progress through `events` until it sends `CallEnd` or drops the
/// sender. A closed receiver means the channel no longer wants the call.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn start(
        &self,
        public_key: &str,
        assistant: &serde_json::Value,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<()>;

    /// Best-effort teardown. Must not block or fail.
    fn stop(&self);
}
