//! Scripted collaborators for unit tests.

use crate::backend::{AssistantConfig, Backend, BackendError, ChatRequest, VerifiedLogin};
use async_trait::async_trait;
use concierge_core::{Account, AuthToken};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// A recorded backend call. Tokens are recorded exposed so tests can assert on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    SendOtp(String),
    VerifyOtp(String, String),
    UpdateProfile {
        token: String,
        name: String,
        email: String,
    },
    Me(String),
    Chat {
        request: ChatRequest,
        token: Option<String>,
    },
    AssistantConfig,
}

/// Backend that answers from per-endpoint queues. An empty queue answers 500.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    send_otp: Mutex<VecDeque<Result<(), BackendError>>>,
    verify_otp: Mutex<VecDeque<Result<VerifiedLogin, BackendError>>>,
    update_profile: Mutex<VecDeque<Result<Account, BackendError>>>,
    me: Mutex<VecDeque<Result<Account, BackendError>>>,
    chat: Mutex<VecDeque<Result<serde_json::Value, BackendError>>>,
    assistant_config: Mutex<VecDeque<Result<AssistantConfig, BackendError>>>,
    chat_hold: Mutex<Option<oneshot::Receiver<()>>>,
    calls: Mutex<Vec<Call>>,
}

pub(crate) fn rejected(status: u16, detail: &str) -> BackendError {
    BackendError::Status {
        status,
        detail: Some(detail.to_string()),
    }
}

pub(crate) fn account(name: Option<&str>, email: Option<&str>) -> Account {
    Account {
        id: 1,
        phone: "+919876543210".to_string(),
        name: name.map(str::to_string),
        email: email.map(str::to_string),
    }
}

fn next<T>(queue: &Mutex<VecDeque<Result<T, BackendError>>>) -> Result<T, BackendError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(rejected(500, "unscripted call")))
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_send_otp(&self, reply: Result<(), BackendError>) -> &Self {
        self.send_otp.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn on_verify_otp(&self, reply: Result<VerifiedLogin, BackendError>) -> &Self {
        self.verify_otp.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn on_update_profile(&self, reply: Result<Account, BackendError>) -> &Self {
        self.update_profile.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn on_me(&self, reply: Result<Account, BackendError>) -> &Self {
        self.me.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn on_chat(&self, reply: Result<serde_json::Value, BackendError>) -> &Self {
        self.chat.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn on_assistant_config(&self, reply: Result<AssistantConfig, BackendError>) -> &Self {
        self.assistant_config.lock().unwrap().push_back(reply);
        self
    }

    /// Makes the next chat call wait until the returned sender fires (or drops).
    pub(crate) fn hold_chat(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.chat_hold.lock().unwrap() = Some(rx);
        tx
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn send_otp(&self, phone: &str) -> Result<(), BackendError> {
        self.record(Call::SendOtp(phone.to_string()));
        next(&self.send_otp)
    }

    async fn verify_otp(&self, phone: &str, otp: &str) -> Result<VerifiedLogin, BackendError> {
        self.record(Call::VerifyOtp(phone.to_string(), otp.to_string()));
        next(&self.verify_otp)
    }

    async fn update_profile(
        &self,
        token: &AuthToken,
        name: &str,
        email: &str,
    ) -> Result<Account, BackendError> {
        self.record(Call::UpdateProfile {
            token: token.expose().to_string(),
            name: name.to_string(),
            email: email.to_string(),
        });
        next(&self.update_profile)
    }

    async fn me(&self, token: &AuthToken) -> Result<Account, BackendError> {
        self.record(Call::Me(token.expose().to_string()));
        next(&self.me)
    }

    async fn chat(
        &self,
        request: &ChatRequest,
        token: Option<&AuthToken>,
    ) -> Result<serde_json::Value, BackendError> {
        self.record(Call::Chat {
            request: request.clone(),
            token: token.map(|t| t.expose().to_string()),
        });
        let hold = self.chat_hold.lock().unwrap().take();
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        next(&self.chat)
    }

    async fn assistant_config(&self) -> Result<AssistantConfig, BackendError> {
        self.record(Call::AssistantConfig);
        next(&self.assistant_config)
    }
}
