//! Prompt library client core.
//!
//! This crate holds the client-side coordination logic of the prompt
//! library. It handles:
//! - Typed notifications between components (event bus)
//! - Throttled profile refresh driven by auth state changes
//! - Debounce/throttle rate limiting for UI input
//! - Viewport visibility tracking for deferred work
//! - Prompt and favorites operations against the hosted backend
//!
//! # Architecture
//!
//! - `bus`: Event bus with typed events and a batched sink bridge
//! - `backend`: Backend trait, error type and REST client
//! - `profile`: Profile refresh coordinator and auth session
//! - `prompts`: Prompt listing, creation and favorites
//! - `timing`: Debounce and throttle utilities
//! - `visibility`: Intersection tracking and lazy image gating
//! - `text`: Title generation and truncation
//! - `config`: Environment-driven configuration

pub mod backend;
pub mod bus;
pub mod config;
pub mod profile;
pub mod prompts;
pub mod text;
pub mod timing;
pub mod visibility;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use backend::{AuthUser, Backend, BackendError, RestBackend};
use bus::EventBus;
use config::{AppConfig, ConfigError};
use profile::{AuthChange, AuthSession, ProfileRefreshCoordinator};
use prompts::PromptService;
use timing::{Debounced, Throttled};

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Backend(#[from] BackendError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Serialize for AppError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

pub const LOG_ENV: &str = "PROMPTVAULT_LOG";
const DEFAULT_LOG_FILTER: &str = "promptvault=debug,info";

/// Install the fmt subscriber. Filter comes from `PROMPTVAULT_LOG`, then
/// `RUST_LOG`. Safe to call more than once.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Everything a UI shell needs, wired once and shared by `Arc`.
pub struct AppState {
    pub config: AppConfig,
    pub bus: Arc<EventBus>,
    pub backend: Arc<dyn Backend>,
    pub coordinator: Arc<ProfileRefreshCoordinator>,
    pub session: Arc<AuthSession>,
    pub prompts: Arc<PromptService>,
}

impl AppState {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_config(AppConfig::from_env()?)
    }

    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let backend: Arc<dyn Backend> = Arc::new(RestBackend::from_config(&config)?);
        Ok(Self::with_backend(config, backend))
    }

    pub fn with_backend(config: AppConfig, backend: Arc<dyn Backend>) -> Self {
        let bus = Arc::new(EventBus::new());
        let coordinator =
            Arc::new(ProfileRefreshCoordinator::new(backend.clone()).with_bus(bus.clone()));
        let session = Arc::new(AuthSession::new(coordinator.clone(), bus.clone()));
        let prompts = Arc::new(PromptService::new(backend.clone(), bus.clone()));

        tracing::info!(backend_url = %config.backend_url, "prompt library client initialized");
        Self {
            config,
            bus,
            backend,
            coordinator,
            session,
            prompts,
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AppError> {
        let tokens = self.backend.sign_in_with_password(email, password).await?;
        self.session
            .handle_auth_change(AuthChange::SignedIn(tokens.user.clone()))
            .await;
        Ok(tokens.user)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<AuthUser, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::InvalidInput("username cannot be empty".to_string()));
        }
        Ok(self.backend.sign_up(email, password, username).await?)
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        let result = self.backend.sign_out().await;
        // Local state is cleared even if the remote logout failed.
        self.session.handle_auth_change(AuthChange::SignedOut).await;
        Ok(result?)
    }

    /// Debounced search input using the configured delay.
    pub fn search_input(&self) -> Debounced<String> {
        Debounced::new(String::new(), Duration::from_millis(self.config.debounce_ms))
    }

    /// Wrap `callback` in a throttle using the configured interval.
    pub fn throttled<F>(&self, callback: F) -> Throttled<F> {
        Throttled::new(Duration::from_millis(self.config.throttle_ms), callback)
    }
}
