//! Application Context
//!
//! `AppContext` is built once at startup and owns one instance of every
//! component. It is passed by reference wherever auth or session state is
//! needed; there is no global state.

use crate::auth::{AuthController, AuthState};
use crate::backend::{Backend, HttpBackend};
use crate::chat::ChatChannel;
use crate::config::Config;
use crate::session::SessionIdentityStore;
use crate::storage::{FileStore, KeyValueStore, StorageError};
use crate::voice::{VoiceChannel, VoiceTransport, WebSocketTransport};
use concierge_core::{ChatError, ConversationTurn};
use std::sync::Arc;
use tracing::info;

pub struct AppContext {
    pub config: Arc<Config>,
    pub sessions: SessionIdentityStore,
    pub auth: AuthController,
    pub chat: ChatChannel,
    pub voice: VoiceChannel,
}

impl AppContext {
    /// Wires the production collaborators: file storage, the HTTP backend and
    /// the WebSocket voice transport.
    pub fn new(config: Config) -> Result<Self, StorageError> {
        let store = Arc::new(FileStore::open(&config.storage_path)?);
        let backend = Arc::new(HttpBackend::new(&config.api_base_url));
        let transport = Arc::new(WebSocketTransport::new(&config.voice_api_url));
        Ok(Self::with_parts(config, backend, store, transport))
    }

    pub fn with_parts(
        config: Config,
        backend: Arc<dyn Backend>,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn VoiceTransport>,
    ) -> Self {
        let sessions = SessionIdentityStore::new(store.clone());
        Self {
            config: Arc::new(config),
            auth: AuthController::new(backend.clone(), store, sessions.clone()),
            chat: ChatChannel::new(backend.clone()),
            voice: VoiceChannel::new(backend, transport),
            sessions,
        }
    }

    /// Restores any signed-in session from storage.
    pub async fn init(&mut self) -> &AuthState {
        self.auth.restore_session().await
    }

    /// Sends a chat message on the current session, personalised when signed in.
    pub async fn send_chat(&self, text: &str) -> Result<ConversationTurn, ChatError> {
        let session_id = self.sessions.get_or_create();
        self.chat.send(&session_id, text, self.auth.token()).await
    }

    /// Signs out and starts a new logical conversation. Never fails.
    pub fn logout(&mut self) {
        self.voice.stop();
        self.auth.logout();
        self.chat.reset();
        info!("Context reset after logout");
    }

    /// Releases anything that must not outlive the process.
    pub fn teardown(&mut self) {
        self.voice.teardown();
    }
}
