//! Phone-verification identity flow.
//!
//! `AuthController` owns the `Unauthenticated → OtpPending → Authenticated`
//! state machine and is the only writer of the bearer token, both in memory
//! and in durable storage.

use crate::backend::Backend;
use crate::session::SessionIdentityStore;
use crate::storage::{AUTH_TOKEN_KEY, KeyValueStore};
use concierge_core::validation::{validate_otp, validate_phone, validate_profile};
use concierge_core::{Account, AuthError, AuthToken};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Where the visitor is in the sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// An OTP was sent to `phone` (whitespace stripped).
    OtpPending { phone: String },
    /// Signed in. The profile may still be incomplete.
    Authenticated { account: Account },
}

/// What the application surface should show right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGate {
    /// Session restoration has not finished; defer any decision.
    Loading,
    SignIn,
    VerifyOtp,
    CompleteProfile,
    Ready,
}

pub struct AuthController {
    backend: Arc<dyn Backend>,
    store: Arc<dyn KeyValueStore>,
    sessions: SessionIdentityStore,
    state: AuthState,
    token: Option<AuthToken>,
    loading: bool,
}

impl AuthController {
    /// Starts `Unauthenticated` and loading until [`restore_session`](Self::restore_session) runs.
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<dyn KeyValueStore>,
        sessions: SessionIdentityStore,
    ) -> Self {
        Self {
            backend,
            store,
            sessions,
            state: AuthState::Unauthenticated,
            token: None,
            loading: true,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub fn account(&self) -> Option<&Account> {
        match &self.state {
            AuthState::Authenticated { account } => Some(account),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated { .. })
    }

    pub fn profile_complete(&self) -> bool {
        self.account().is_some_and(Account::profile_complete)
    }

    pub fn gate(&self) -> AccessGate {
        if self.loading {
            return AccessGate::Loading;
        }
        match &self.state {
            AuthState::Unauthenticated => AccessGate::SignIn,
            AuthState::OtpPending { .. } => AccessGate::VerifyOtp,
            AuthState::Authenticated { account } if account.profile_complete() => AccessGate::Ready,
            AuthState::Authenticated { .. } => AccessGate::CompleteProfile,
        }
    }

    /// The signed-in account, provided the gate is `Ready`.
    pub fn require_ready(&self) -> Result<&Account, AuthError> {
        match self.gate() {
            AccessGate::Ready => self.account().ok_or(AuthError::NotAuthenticated),
            AccessGate::CompleteProfile => Err(AuthError::ProfileIncomplete),
            _ => Err(AuthError::NotAuthenticated),
        }
    }

    /// Validates a stored token against the backend, once per process.
    ///
    /// Never fails: any problem reading or validating the token ends in
    /// `Unauthenticated` with the stored token removed.
    #[instrument(name = "restore_session", skip_all)]
    pub async fn restore_session(&mut self) -> &AuthState {
        if !self.loading {
            return &self.state;
        }

        let stored = match self.store.get(AUTH_TOKEN_KEY) {
            Ok(stored) => stored.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read stored auth token");
                None
            }
        };

        if let Some(raw) = stored {
            let token = AuthToken::new(raw);
            match self.backend.me(&token).await {
                Ok(account) => {
                    info!(
                        account_id = account.id,
                        profile_complete = account.profile_complete(),
                        "Restored signed-in session"
                    );
                    self.token = Some(token);
                    self.state = AuthState::Authenticated { account };
                }
                Err(e) if e.is_unauthorized() => {
                    info!("Stored auth token expired; signing out");
                    self.forget_token();
                }
                Err(e) => {
                    warn!(error = %e, "Could not validate stored auth token; signing out");
                    self.forget_token();
                }
            }
        }

        self.loading = false;
        &self.state
    }

    /// Requests an OTP for `phone`. The number is checked locally first.
    #[instrument(skip_all)]
    pub async fn send_otp(&mut self, phone: &str) -> Result<(), AuthError> {
        let phone = validate_phone(phone)?;
        if self.is_authenticated() {
            return Err(AuthError::AlreadyAuthenticated);
        }

        self.backend
            .send_otp(&phone)
            .await
            .map_err(|e| AuthError::OtpSend(e.reason_or("Failed to send OTP")))?;

        info!(phone = %phone, "OTP sent");
        self.state = AuthState::OtpPending { phone };
        Ok(())
    }

    /// Exchanges an OTP for a token. On rejection nothing changes.
    #[instrument(skip_all)]
    pub async fn verify_otp(&mut self, phone: &str, code: &str) -> Result<(), AuthError> {
        validate_otp(code)?;
        if self.is_authenticated() {
            return Err(AuthError::AlreadyAuthenticated);
        }
        let phone: String = phone.chars().filter(|c| !c.is_whitespace()).collect();

        let login = self
            .backend
            .verify_otp(&phone, code)
            .await
            .map_err(|e| AuthError::OtpVerify(e.reason_or("Invalid OTP")))?;
        if login.token.is_empty() {
            return Err(AuthError::OtpVerify("Invalid OTP".to_string()));
        }

        let token = AuthToken::new(login.token);
        if let Err(e) = self.store.set(AUTH_TOKEN_KEY, token.expose()) {
            warn!(error = %e, "Could not persist auth token; session will not survive restart");
        }
        info!(
            account_id = login.user.id,
            profile_complete = login.user.profile_complete(),
            "Phone verified"
        );
        self.token = Some(token);
        self.state = AuthState::Authenticated {
            account: login.user,
        };
        self.loading = false;
        Ok(())
    }

    /// Saves name and email on the account.
    #[instrument(skip_all)]
    pub async fn complete_profile(&mut self, name: &str, email: &str) -> Result<(), AuthError> {
        let (name, email) = validate_profile(name, email)?;
        let token = self.token.as_ref().ok_or(AuthError::NotAuthenticated)?;

        let account = self
            .backend
            .update_profile(token, name, email)
            .await
            .map_err(|e| AuthError::ProfileUpdate(e.reason_or("Failed to update profile")))?;

        info!(account_id = account.id, "Profile completed");
        self.state = AuthState::Authenticated { account };
        Ok(())
    }

    /// Signs out locally. Touches no network and cannot fail; safe to repeat.
    pub fn logout(&mut self) {
        let was_authenticated = self.is_authenticated();
        self.forget_token();
        self.sessions.clear();
        self.state = AuthState::Unauthenticated;
        self.loading = false;
        if was_authenticated {
            info!("Signed out");
        }
    }

    fn forget_token(&mut self) {
        self.token = None;
        if let Err(e) = self.store.remove(AUTH_TOKEN_KEY) {
            warn!(error = %e, "Could not remove stored auth token");
        }
    }
}
