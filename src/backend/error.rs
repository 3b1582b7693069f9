use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    Network,
    Timeout,
    Auth,
    NotFound,
    Query,
    Decode,
    Config,
}

impl BackendErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::NotFound => "not found",
            Self::Query => "query",
            Self::Decode => "decode",
            Self::Config => "config",
        }
    }
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure reported by the hosted backend or the transport in front of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Config, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Decode, message)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return Self::new(BackendErrorKind::Timeout, value.to_string());
        }
        if value.is_decode() {
            return Self::decode(value.to_string());
        }
        Self::new(BackendErrorKind::Network, value.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(value: serde_json::Error) -> Self {
        Self::decode(value.to_string())
    }
}
