use super::protocol::{TranscriptKind, TransportEvent};
use super::transport::VoiceTransport;
use crate::backend::Backend;
use concierge_core::{CallState, Speaker, VoiceError, VoiceTranscriptEntry};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, instrument, warn};

/// Drives one voice call at a time and keeps its live transcript.
///
/// Every call gets its own event channel. Stopping a call drops the receiving
/// end, so nothing a torn-down transport still sends can reach a later call.
pub struct VoiceChannel {
    backend: Arc<dyn Backend>,
    transport: Arc<dyn VoiceTransport>,
    state: CallState,
    transcript: Vec<VoiceTranscriptEntry>,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
}

impl VoiceChannel {
    pub fn new(backend: Arc<dyn Backend>, transport: Arc<dyn VoiceTransport>) -> Self {
        Self {
            backend,
            transport,
            state: CallState::Idle,
            transcript: Vec::new(),
            events: None,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn transcript(&self) -> &[VoiceTranscriptEntry] {
        &self.transcript
    }

    /// The last `n` transcript entries.
    pub fn recent(&self, n: usize) -> &[VoiceTranscriptEntry] {
        let start = self.transcript.len().saturating_sub(n);
        &self.transcript[start..]
    }

    /// Text of the most recent entry still being revised, if any.
    pub fn current_speech(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|entry| !entry.is_final)
            .map(|entry| entry.text.as_str())
    }

    /// Starts a call with freshly fetched configuration.
    #[instrument(skip_all)]
    pub async fn start(&mut self) -> Result<(), VoiceError> {
        if self.state.is_live() {
            return Err(VoiceError::CallInProgress(self.state));
        }

        self.state = CallState::Connecting;
        self.transcript.clear();

        let config = match self.backend.assistant_config().await {
            Ok(config) => config,
            Err(e) => {
                self.state = CallState::Idle;
                return Err(VoiceError::Start(format!(
                    "could not fetch call configuration: {e}"
                )));
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(e) = self
            .transport
            .start(&config.public_key, &config.assistant_config, tx)
            .await
        {
            self.transport.stop();
            self.state = CallState::Idle;
            return Err(VoiceError::Start(format!("{e:#}")));
        }

        self.events = Some(rx);
        info!("Voice call connecting");
        Ok(())
    }

    /// Ends the current call without waiting for the transport. No-op when idle.
    pub fn stop(&mut self) {
        if !self.state.is_live() {
            return;
        }
        self.events = None;
        self.transport.stop();
        self.state = CallState::Idle;
        info!("Voice call stopped");
    }

    /// Force-stops any live call. Run on shutdown and logout.
    pub fn teardown(&mut self) {
        if self.state.is_live() {
            warn!(state = %self.state, "Tearing down a live voice call");
        }
        self.stop();
    }

    /// Waits for the next transport event of the current call and applies it.
    ///
    /// Returns `None` when there is no call to listen to. A transport that
    /// goes away without saying so is treated as having ended the call.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        let events = self.events.as_mut()?;
        let event = match events.recv().await {
            Some(event) => event,
            None => {
                warn!("Voice transport went away without ending the call");
                TransportEvent::CallEnd
            }
        };
        self.apply(event.clone());
        Some(event)
    }

    /// Applies every event already queued, without waiting. Returns how many
    /// were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let next = match self.events.as_mut() {
                Some(events) => events.try_recv(),
                None => break,
            };
            match next {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Voice transport went away without ending the call");
                    self.apply(TransportEvent::CallEnd);
                }
            }
            applied += 1;
        }
        applied
    }

    /// Applies a single transport event to the call state and transcript.
    pub fn apply(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CallStart => {
                if self.state == CallState::Connecting {
                    self.state = CallState::Active;
                    info!("Voice call active");
                } else {
                    debug!(state = %self.state, "Ignoring call-start");
                }
            }
            TransportEvent::CallEnd => {
                if self.state.is_live() {
                    self.events = None;
                    self.transport.stop();
                    self.state = CallState::Idle;
                    info!(entries = self.transcript.len(), "Voice call ended");
                }
            }
            TransportEvent::Transcript { role, text, kind } => {
                self.record(role, text, kind == TranscriptKind::Final)
            }
            TransportEvent::Error(message) => {
                error!(reason = %message, "Voice transport error");
            }
        }
    }

    /// A speaker has at most one entry in revision. Partials overwrite it and
    /// the final text commits it.
    fn record(&mut self, role: Speaker, text: String, is_final: bool) {
        let pending = self
            .transcript
            .iter()
            .rposition(|entry| entry.role == role && !entry.is_final);
        let entry = VoiceTranscriptEntry {
            role,
            text,
            is_final,
        };
        match pending {
            Some(index) => self.transcript[index] = entry,
            None => self.transcript.push(entry),
        }
    }
}

impl Drop for VoiceChannel {
    fn drop(&mut self) {
        self.teardown();
    }
}
