use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::backend::error::{BackendError, BackendErrorKind};
use crate::backend::types::{
    AuthTokens, AuthUser, Backend, Favorite, NewPrompt, Profile, ProfileUpdate, Prompt,
    PromptQuery,
};
use crate::config::AppConfig;

/// Client for the hosted backend's REST surface: PostgREST-style row
/// endpoints under `/rest/v1` and password auth under `/auth/v1`.
pub struct RestBackend {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
    access_token: RwLock<Option<String>>,
}

impl RestBackend {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, BackendError> {
        let base_url = base_url.into();
        let anon_key = anon_key.into();
        if base_url.trim().is_empty() {
            return Err(BackendError::config("backend url cannot be empty"));
        }
        if anon_key.trim().is_empty() {
            return Err(BackendError::config("backend anon key cannot be empty"));
        }
        if timeout_ms == 0 {
            return Err(BackendError::config(
                "backend request timeout must be greater than 0",
            ));
        }

        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .map_err(|error| BackendError::config(error.to_string()))?,
            access_token: RwLock::new(None),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, BackendError> {
        Self::new(
            config.backend_url.clone(),
            config.anon_key.clone(),
            config.request_timeout_ms,
        )
    }

    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    pub async fn has_session(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    fn rest_url(&self, table: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}/rest/v1/{table}", self.base_url);
        append_query(&mut url, query);
        url
    }

    fn auth_url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}/auth/v1/{path}", self.base_url);
        append_query(&mut url, query);
        url
    }

    async fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }
        serde_json::from_str(&body).map_err(|error| {
            BackendError::decode(format!("failed to parse backend response: {error}"))
        })
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), BackendError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }

    async fn insert_one<B, T>(&self, table: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.rest_url(table, &[]);
        let rows: Vec<T> = self
            .send_json(
                self.request(Method::POST, &url)
                    .await
                    .header("Prefer", "return=representation")
                    .json(body),
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| {
            BackendError::new(
                BackendErrorKind::Query,
                format!("insert into {table} returned no rows"),
            )
        })
    }
}

fn append_query(url: &mut String, query: &[(&str, String)]) {
    for (idx, (key, value)) in query.iter().enumerate() {
        url.push(if idx == 0 { '?' } else { '&' });
        url.push_str(key);
        url.push('=');
        url.push_str(&urlencoding::encode(value));
    }
}

// Filter-list syntax characters would split the `or=(...)` expression.
fn sanitize_search(raw: &str) -> String {
    raw.replace([',', '(', ')', '*'], " ").trim().to_string()
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

/// Map a non-success response into a typed error. Row endpoints answer with
/// `{message, code}`, auth endpoints with `{error_description}` or `{msg}`.
fn error_from_response(status: StatusCode, body: &str) -> BackendError {
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendErrorKind::Auth,
        StatusCode::NOT_FOUND => BackendErrorKind::NotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendErrorKind::Timeout,
        _ => BackendErrorKind::Query,
    };

    let payload: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        payload
            .as_ref()
            .and_then(|value| value.get(name))
            .and_then(|value| value.as_str())
            .map(str::to_string)
    };

    let message = field("message")
        .or_else(|| field("error_description"))
        .or_else(|| field("msg"))
        .or_else(|| field("error"))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("backend returned status {}", status.as_u16())
            } else {
                trimmed.to_string()
            }
        });

    let error = BackendError::new(kind, message);
    match field("code").or_else(|| field("error_code")) {
        Some(code) => error.with_code(code),
        None => error,
    }
}

#[async_trait::async_trait]
impl Backend for RestBackend {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let url = self.rest_url(
            "profiles",
            &[("id", eq(user_id)), ("select", "*".to_string())],
        );
        let mut rows: Vec<Profile> = self.send_json(self.request(Method::GET, &url).await).await?;
        if rows.len() > 1 {
            return Err(BackendError::new(
                BackendErrorKind::Query,
                format!("expected at most one profile for {user_id}, got {}", rows.len()),
            ));
        }
        Ok(rows.pop())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        let url = self.rest_url("profiles", &[("id", eq(user_id))]);
        let rows: Vec<Profile> = self
            .send_json(
                self.request(Method::PATCH, &url)
                    .await
                    .header("Prefer", "return=representation")
                    .json(update),
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| {
            BackendError::new(
                BackendErrorKind::NotFound,
                format!("profile not found: {user_id}"),
            )
        })
    }

    async fn list_prompts(&self, query: &PromptQuery) -> Result<Vec<Prompt>, BackendError> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if query.public_only {
            params.push(("is_public", "eq.true".to_string()));
        }
        if let Some(user_id) = &query.user_id {
            params.push(("user_id", eq(user_id)));
        }
        if let Some(search) = query.search.as_deref().map(sanitize_search).filter(|s| !s.is_empty()) {
            params.push((
                "or",
                format!("(title.ilike.*{search}*,content.ilike.*{search}*)"),
            ));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        let url = self.rest_url("prompts", &params);
        self.send_json(self.request(Method::GET, &url).await).await
    }

    async fn create_prompt(&self, prompt: &NewPrompt) -> Result<Prompt, BackendError> {
        self.insert_one("prompts", prompt).await
    }

    async fn delete_prompt(&self, prompt_id: &str) -> Result<(), BackendError> {
        let url = self.rest_url("prompts", &[("id", eq(prompt_id))]);
        self.send_empty(self.request(Method::DELETE, &url).await).await
    }

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Favorite>, BackendError> {
        let url = self.rest_url(
            "favorites",
            &[("user_id", eq(user_id)), ("select", "*".to_string())],
        );
        self.send_json(self.request(Method::GET, &url).await).await
    }

    async fn add_favorite(&self, user_id: &str, prompt_id: &str) -> Result<Favorite, BackendError> {
        self.insert_one(
            "favorites",
            &serde_json::json!({ "user_id": user_id, "prompt_id": prompt_id }),
        )
        .await
    }

    async fn remove_favorite(&self, user_id: &str, prompt_id: &str) -> Result<(), BackendError> {
        let url = self.rest_url(
            "favorites",
            &[("user_id", eq(user_id)), ("prompt_id", eq(prompt_id))],
        );
        self.send_empty(self.request(Method::DELETE, &url).await).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthTokens, BackendError> {
        let url = self.auth_url("token", &[("grant_type", "password".to_string())]);
        let tokens: AuthTokens = self
            .send_json(
                self.request(Method::POST, &url)
                    .await
                    .json(&serde_json::json!({ "email": email, "password": password })),
            )
            .await?;
        self.set_access_token(Some(tokens.access_token.clone())).await;
        tracing::info!(user_id = %tokens.user.id, "signed in");
        Ok(tokens)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<AuthUser, BackendError> {
        let url = self.auth_url("signup", &[]);
        let payload: serde_json::Value = self
            .send_json(self.request(Method::POST, &url).await.json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "username": username },
            })))
            .await?;

        // With email confirmation on, the user is returned bare; otherwise it
        // comes wrapped in a session.
        let user = payload.get("user").cloned().unwrap_or(payload);
        Ok(serde_json::from_value(user)?)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if !self.has_session().await {
            return Ok(());
        }
        let url = self.auth_url("logout", &[]);
        let result = self.send_empty(self.request(Method::POST, &url).await).await;
        self.set_access_token(None).await;
        result
    }
}
