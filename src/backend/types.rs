use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::error::BackendError;

/// The authenticated identity as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }
}

/// Tokens returned by a successful password sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// A row of the `profiles` table. Columns this client does not know about
/// are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: String::new(),
            username: username.into(),
            full_name: None,
            avatar_url: None,
            bio: None,
            website: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Name to show in the UI: full name when set, otherwise the username.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Insert payload for the `prompts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrompt {
    pub user_id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: String,
    pub prompt_id: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptQuery {
    /// Case-insensitive substring matched against title and content.
    pub search: Option<String>,
    pub user_id: Option<String>,
    pub public_only: bool,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the profile row whose id equals `user_id`. `Ok(None)` when no
    /// row exists.
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError>;
    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError>;

    async fn list_prompts(&self, query: &PromptQuery) -> Result<Vec<Prompt>, BackendError>;
    async fn create_prompt(&self, prompt: &NewPrompt) -> Result<Prompt, BackendError>;
    async fn delete_prompt(&self, prompt_id: &str) -> Result<(), BackendError>;

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Favorite>, BackendError>;
    async fn add_favorite(&self, user_id: &str, prompt_id: &str) -> Result<Favorite, BackendError>;
    async fn remove_favorite(&self, user_id: &str, prompt_id: &str) -> Result<(), BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthTokens, BackendError>;
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<AuthUser, BackendError>;
    async fn sign_out(&self) -> Result<(), BackendError>;
}
