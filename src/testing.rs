//! In-memory backend used by unit tests across modules.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{
    AuthTokens, AuthUser, Backend, BackendError, BackendErrorKind, Favorite, NewPrompt, Profile,
    ProfileUpdate, Prompt, PromptQuery,
};

#[derive(Default)]
pub struct MockBackend {
    profiles: Mutex<HashMap<String, Profile>>,
    prompts: Mutex<Vec<Prompt>>,
    favorites: Mutex<Vec<Favorite>>,
    profile_failures: Mutex<VecDeque<BackendError>>,
    profile_delay: Mutex<Option<Duration>>,
    profile_delays: Mutex<VecDeque<Duration>>,
    profile_fetches: AtomicUsize,
    next_id: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
        self
    }

    pub fn with_prompt(self, prompt: Prompt) -> Self {
        self.prompts.lock().unwrap().push(prompt);
        self
    }

    /// Every profile fetch sleeps this long (on the tokio clock) first.
    pub fn with_profile_delay(self, delay: Duration) -> Self {
        *self.profile_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Per-fetch delays, consumed in call order before the fixed delay applies.
    pub fn with_profile_delays(self, delays: impl IntoIterator<Item = Duration>) -> Self {
        self.profile_delays.lock().unwrap().extend(delays);
        self
    }

    pub fn fail_next_profile_fetch(&self, error: BackendError) {
        self.profile_failures.lock().unwrap().push_back(error);
    }

    pub fn profile_fetches(&self) -> usize {
        self.profile_fetches.load(Ordering::SeqCst)
    }

    pub fn favorites(&self) -> Vec<Favorite> {
        self.favorites.lock().unwrap().clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

pub fn prompt(id: &str, user_id: &str, title: &str, is_public: bool) -> Prompt {
    Prompt {
        id: id.to_string(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        content: format!("{title} content"),
        description: None,
        tags: Vec::new(),
        is_public,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: None,
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        // The row is read when the request starts; the delay models the response.
        let row = self.profiles.lock().unwrap().get(user_id).cloned();
        let delay = self
            .profile_delays
            .lock()
            .unwrap()
            .pop_front()
            .or(*self.profile_delay.lock().unwrap());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.profile_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(row)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(user_id).ok_or_else(|| {
            BackendError::new(BackendErrorKind::NotFound, format!("profile not found: {user_id}"))
        })?;
        if let Some(username) = &update.username {
            profile.username = username.clone();
        }
        if update.full_name.is_some() {
            profile.full_name = update.full_name.clone();
        }
        if update.bio.is_some() {
            profile.bio = update.bio.clone();
        }
        Ok(profile.clone())
    }

    async fn list_prompts(&self, query: &PromptQuery) -> Result<Vec<Prompt>, BackendError> {
        let needle = query.search.as_deref().map(|s| s.trim().to_lowercase());
        let mut rows: Vec<Prompt> = self
            .prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| !query.public_only || p.is_public)
            .filter(|p| query.user_id.as_ref().map_or(true, |id| &p.user_id == id))
            .filter(|p| {
                needle.as_ref().map_or(true, |n| {
                    p.title.to_lowercase().contains(n) || p.content.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect();
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn create_prompt(&self, prompt: &NewPrompt) -> Result<Prompt, BackendError> {
        let row = Prompt {
            id: self.next_id("p"),
            user_id: prompt.user_id.clone(),
            title: prompt.title.clone(),
            content: prompt.content.clone(),
            description: prompt.description.clone(),
            tags: prompt.tags.clone(),
            is_public: prompt.is_public,
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: None,
        };
        self.prompts.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn delete_prompt(&self, prompt_id: &str) -> Result<(), BackendError> {
        self.prompts.lock().unwrap().retain(|p| p.id != prompt_id);
        Ok(())
    }

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Favorite>, BackendError> {
        Ok(self
            .favorites
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_favorite(&self, user_id: &str, prompt_id: &str) -> Result<Favorite, BackendError> {
        let favorite = Favorite {
            user_id: user_id.to_string(),
            prompt_id: prompt_id.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.favorites.lock().unwrap().push(favorite.clone());
        Ok(favorite)
    }

    async fn remove_favorite(&self, user_id: &str, prompt_id: &str) -> Result<(), BackendError> {
        self.favorites
            .lock()
            .unwrap()
            .retain(|f| !(f.user_id == user_id && f.prompt_id == prompt_id));
        Ok(())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<AuthTokens, BackendError> {
        let user_id = email.split('@').next().unwrap_or(email).to_string();
        Ok(AuthTokens {
            access_token: format!("token-{user_id}"),
            refresh_token: None,
            expires_in: Some(3600),
            user: AuthUser {
                id: user_id,
                email: Some(email.to_string()),
            },
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        username: &str,
    ) -> Result<AuthUser, BackendError> {
        let user = AuthUser {
            id: self.next_id("u"),
            email: Some(email.to_string()),
        };
        self.profiles
            .lock()
            .unwrap()
            .insert(user.id.clone(), Profile::new(user.id.clone(), username));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
