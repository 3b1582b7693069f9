//! Prompt browsing, creation and favorites.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{AuthUser, Backend, NewPrompt, Prompt, PromptQuery};
use crate::bus::{AppEvent, EventBus};
use crate::text::{generate_title, truncate, DEFAULT_TITLE_WORDS, MAX_TITLE_CHARS};
use crate::AppError;

pub const DEFAULT_PAGE_SIZE: usize = 24;

/// User input for a new prompt. A blank title is derived from the content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptDraft {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

pub struct PromptService {
    backend: Arc<dyn Backend>,
    bus: Arc<EventBus>,
}

impl PromptService {
    pub fn new(backend: Arc<dyn Backend>, bus: Arc<EventBus>) -> Self {
        Self { backend, bus }
    }

    pub async fn list_public(&self, search: Option<&str>, limit: usize) -> Result<Vec<Prompt>, AppError> {
        let query = PromptQuery {
            search: search.map(str::to_string),
            public_only: true,
            limit: Some(limit.max(1)),
            ..PromptQuery::default()
        };
        Ok(self.backend.list_prompts(&query).await?)
    }

    pub async fn list_for_user(&self, user: &AuthUser) -> Result<Vec<Prompt>, AppError> {
        let query = PromptQuery {
            user_id: Some(user.id.clone()),
            ..PromptQuery::default()
        };
        Ok(self.backend.list_prompts(&query).await?)
    }

    pub async fn create(&self, user: &AuthUser, draft: PromptDraft) -> Result<Prompt, AppError> {
        let content = draft.content.trim();
        if content.is_empty() {
            return Err(AppError::InvalidInput("prompt content cannot be empty".to_string()));
        }

        let title = match draft.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => truncate(title, MAX_TITLE_CHARS),
            _ => generate_title(content, DEFAULT_TITLE_WORDS),
        };
        let tags = normalize_tags(draft.tags);

        let prompt = self
            .backend
            .create_prompt(&NewPrompt {
                user_id: user.id.clone(),
                title,
                content: content.to_string(),
                description: draft
                    .description
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty()),
                tags,
                is_public: draft.is_public,
            })
            .await?;

        tracing::info!(prompt_id = %prompt.id, user_id = %user.id, "prompt created");
        self.bus.emit(AppEvent::PromptCreated {
            prompt_id: prompt.id.clone(),
            user_id: user.id.clone(),
            title: prompt.title.clone(),
        });
        Ok(prompt)
    }

    pub async fn delete(&self, user: &AuthUser, prompt_id: &str) -> Result<(), AppError> {
        self.backend.delete_prompt(prompt_id).await?;
        self.bus.emit(AppEvent::PromptDeleted {
            prompt_id: prompt_id.to_string(),
            user_id: user.id.clone(),
        });
        Ok(())
    }

    pub async fn favorite_ids(&self, user: &AuthUser) -> Result<HashSet<String>, AppError> {
        let favorites = self.backend.list_favorites(&user.id).await?;
        Ok(favorites.into_iter().map(|f| f.prompt_id).collect())
    }

    /// Add or remove `prompt_id` from the user's favorites. Returns whether
    /// it is a favorite afterwards and announces the change on the bus.
    pub async fn toggle_favorite(&self, user: &AuthUser, prompt_id: &str) -> Result<bool, AppError> {
        let favorited = if self.favorite_ids(user).await?.contains(prompt_id) {
            self.backend.remove_favorite(&user.id, prompt_id).await?;
            false
        } else {
            self.backend.add_favorite(&user.id, prompt_id).await?;
            true
        };

        self.bus.emit(AppEvent::FavoritesChanged {
            user_id: user.id.clone(),
            prompt_id: prompt_id.to_string(),
            favorited,
        });
        Ok(favorited)
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
