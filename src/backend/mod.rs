//! Typed access to the hosted backend (auth + row storage).

pub mod error;
pub mod rest;
pub mod types;

pub use error::{BackendError, BackendErrorKind};
pub use rest::RestBackend;
pub use types::{
    AuthTokens, AuthUser, Backend, Favorite, NewPrompt, Profile, ProfileUpdate, Prompt,
    PromptQuery,
};
