//! Client for the concierge backend's HTTP contract.
//!
//! The `Backend` trait is the seam every channel talks through, so tests can
//! script replies without a server. `HttpBackend` is the `reqwest`
//! implementation used by the binary.

use async_trait::async_trait;
use concierge_core::{Account, AuthToken};
use reqwest::{RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

/// Failure talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    /// The backend refused the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Status { status: 401, .. })
    }

    /// Server-provided reason, falling back to `default` when there is none.
    pub fn reason_or(&self, default: &str) -> String {
        match self {
            BackendError::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => default.to_string(),
        }
    }
}

/// Body of a successful `/api/auth/verify-otp`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedLogin {
    pub token: String,
    pub user: Account,
}

/// Body of `/api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

/// Voice call configuration, fetched right before every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    pub public_key: String,
    pub assistant_config: serde_json::Value,
}

/// The backend HTTP contract, as consumed by the client core.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /api/auth/send-otp`
    async fn send_otp(&self, phone: &str) -> Result<(), BackendError>;

    /// `POST /api/auth/verify-otp`
    async fn verify_otp(&self, phone: &str, otp: &str) -> Result<VerifiedLogin, BackendError>;

    /// `POST /api/auth/profile` (bearer)
    async fn update_profile(
        &self,
        token: &AuthToken,
        name: &str,
        email: &str,
    ) -> Result<Account, BackendError>;

    /// `GET /api/auth/me` (bearer)
    async fn me(&self, token: &AuthToken) -> Result<Account, BackendError>;

    /// `POST /api/chat` (bearer optional). The reply is returned undecoded;
    /// callers run it through the conversation interpreter.
    async fn chat(
        &self,
        request: &ChatRequest,
        token: Option<&AuthToken>,
    ) -> Result<serde_json::Value, BackendError>;

    /// `GET /api/vapi/assistant-config`
    async fn assistant_config(&self) -> Result<AssistantConfig, BackendError>;
}

/// `reqwest` implementation of [`Backend`].
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, path: &str, request: RequestBuilder) -> Result<Response, BackendError> {
        debug!(path, "Backend request");
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        debug!(path, status = status.as_u16(), ?detail, "Backend rejected request");
        Err(BackendError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let bytes = self.execute(path, request).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Pulls FastAPI's `detail` out of an error body. Non-string details
/// (validation error lists) are rendered as JSON text.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send_otp(&self, phone: &str) -> Result<(), BackendError> {
        let path = "/api/auth/send-otp";
        let request = self
            .client
            .post(self.url(path))
            .json(&serde_json::json!({ "phone": phone }));
        self.execute(path, request).await?;
        Ok(())
    }

    async fn verify_otp(&self, phone: &str, otp: &str) -> Result<VerifiedLogin, BackendError> {
        let path = "/api/auth/verify-otp";
        let request = self
            .client
            .post(self.url(path))
            .json(&serde_json::json!({ "phone": phone, "otp": otp }));
        self.execute_json(path, request).await
    }

    async fn update_profile(
        &self,
        token: &AuthToken,
        name: &str,
        email: &str,
    ) -> Result<Account, BackendError> {
        let path = "/api/auth/profile";
        let request = self
            .client
            .post(self.url(path))
            .bearer_auth(token.expose())
            .json(&serde_json::json!({ "name": name, "email": email }));
        self.execute_json(path, request).await
    }

    async fn me(&self, token: &AuthToken) -> Result<Account, BackendError> {
        let path = "/api/auth/me";
        let request = self.client.get(self.url(path)).bearer_auth(token.expose());
        self.execute_json(path, request).await
    }

    async fn chat(
        &self,
        request: &ChatRequest,
        token: Option<&AuthToken>,
    ) -> Result<serde_json::Value, BackendError> {
        let path = "/api/chat";
        let mut builder = self.client.post(self.url(path)).json(request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose());
        }
        self.execute_json(path, builder).await
    }

    async fn assistant_config(&self) -> Result<AssistantConfig, BackendError> {
        let path = "/api/vapi/assistant-config";
        let request = self.client.get(self.url(path));
        self.execute_json(path, request).await
    }
}
