//! Live voice calls: the call lifecycle, its transcript and the transports
//! that carry it.

pub mod channel;
pub mod protocol;
pub mod transport;

pub use channel::VoiceChannel;
pub use protocol::{TranscriptKind, TransportEvent};
pub use transport::{VoiceTransport, WebSocketTransport};
