//! Typed chat channel.
//!
//! A send is a two-phase write: the user turn is appended before the request
//! goes out and the transcript is marked as awaiting a reply; the agent (or
//! fallback) turn reconciles it. The reconciliation also runs if the send
//! future is dropped, so a user turn is never left without a reply.

use crate::backend::{Backend, ChatRequest};
use concierge_core::{AuthToken, ChatError, ConversationTurn, SessionId, interpret};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};

pub const GREETING: &str = "Hello! I'm your real estate assistant. I can help you find the perfect property and book visits. What are you looking for today?";
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong. Please try again.";

pub struct ChatChannel {
    backend: Arc<dyn Backend>,
    transcript: Mutex<Vec<ConversationTurn>>,
    awaiting_reply: AtomicBool,
}

impl ChatChannel {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            transcript: Mutex::new(vec![ConversationTurn::agent(GREETING)]),
            awaiting_reply: AtomicBool::new(false),
        }
    }

    /// Sends one user message and returns the agent turn that answered it.
    ///
    /// Network and decode failures never surface here; they produce the
    /// fallback turn instead. Only one send may be pending at a time.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn send(
        &self,
        session_id: &SessionId,
        text: &str,
        token: Option<&AuthToken>,
    ) -> Result<ConversationTurn, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self
            .awaiting_reply
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ChatError::TurnInFlight);
        }

        let pending = PendingReply {
            channel: self,
            settled: false,
        };
        self.lock().push(ConversationTurn::user(text));

        let request = ChatRequest {
            session_id: session_id.to_string(),
            message: text.to_string(),
        };
        let reply = match self.backend.chat(&request, token).await {
            Ok(payload) => match interpret(payload) {
                Ok(result) => {
                    debug!(
                        properties = result.properties.as_ref().map_or(0, Vec::len),
                        booking = result.confirmed_booking().is_some(),
                        "Agent replied"
                    );
                    result.into_turn()
                }
                Err(e) => {
                    warn!(error = %e, "Could not decode chat reply");
                    ConversationTurn::agent(FALLBACK_REPLY)
                }
            },
            Err(e) => {
                warn!(error = %e, "Chat request failed");
                ConversationTurn::agent(FALLBACK_REPLY)
            }
        };

        pending.settle(reply.clone());
        Ok(reply)
    }

    pub fn transcript(&self) -> Vec<ConversationTurn> {
        self.lock().clone()
    }

    /// True between the user turn being appended and its reply arriving.
    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply.load(Ordering::Acquire)
    }

    /// Drops everything but the greeting, for a new logical conversation.
    pub fn reset(&self) {
        *self.lock() = vec![ConversationTurn::agent(GREETING)];
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConversationTurn>> {
        self.transcript.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The provisional half of a send. Settling (or dropping) it appends the
/// reply and clears the awaiting mark.
struct PendingReply<'a> {
    channel: &'a ChatChannel,
    settled: bool,
}

impl PendingReply<'_> {
    fn settle(mut self, reply: ConversationTurn) {
        self.finish(reply);
    }

    fn finish(&mut self, reply: ConversationTurn) {
        self.settled = true;
        self.channel.lock().push(reply);
        self.channel.awaiting_reply.store(false, Ordering::Release);
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Chat send cancelled before a reply arrived");
            self.finish(ConversationTurn::agent(FALLBACK_REPLY));
        }
    }
}
