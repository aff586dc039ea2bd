//! Session identity: the opaque id that ties anonymous chat turns into one
//! logical conversation across restarts.

use crate::storage::{KeyValueStore, SESSION_ID_KEY};
use concierge_core::SessionId;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};
use uuid::Uuid;

/// Owner of the durable session identifier. Cheap to clone; clones share
/// the same cache and storage.
#[derive(Clone)]
pub struct SessionIdentityStore {
    store: Arc<dyn KeyValueStore>,
    cached: Arc<Mutex<Option<SessionId>>>,
}

impl SessionIdentityStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the stored identifier, creating and persisting a random one
    /// on first use.
    ///
    /// A failed durable write is logged and the identifier is still kept for
    /// the rest of the process, so repeated calls always agree.
    pub fn get_or_create(&self) -> SessionId {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }

        let stored = match self.store.get(SESSION_ID_KEY) {
            Ok(stored) => stored.filter(|id| !id.is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read session id; issuing a new one");
                None
            }
        };

        let id = match stored {
            Some(id) => SessionId::new(id),
            None => {
                let id = SessionId::new(Uuid::new_v4().to_string());
                if let Err(e) = self.store.set(SESSION_ID_KEY, id.as_str()) {
                    warn!(error = %e, "Could not persist session id");
                }
                info!(session_id = %id, "Started new conversation session");
                id
            }
        };
        *cached = Some(id.clone());
        id
    }

    /// Forgets the identifier so the next call to `get_or_create` starts a
    /// new logical conversation.
    pub fn clear(&self) {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Err(e) = self.store.remove(SESSION_ID_KEY) {
            warn!(error = %e, "Could not remove stored session id");
        }
    }
}
