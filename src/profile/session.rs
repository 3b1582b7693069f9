use std::sync::{Arc, RwLock};

use crate::backend::{AuthUser, Profile};
use crate::bus::{AppEvent, EventBus};
use crate::profile::coordinator::{
    ProfileRefreshCoordinator, ProfileSink, ProfileSlot, RefreshOutcome,
};

/// Auth state transitions reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn(AuthUser),
    TokenRefreshed(AuthUser),
    UserUpdated,
    SignedOut,
}

/// Current authenticated user plus the cached profile that follows it.
pub struct AuthSession {
    coordinator: Arc<ProfileRefreshCoordinator>,
    bus: Arc<EventBus>,
    user: RwLock<Option<AuthUser>>,
    profile: ProfileSlot,
}

impl AuthSession {
    pub fn new(coordinator: Arc<ProfileRefreshCoordinator>, bus: Arc<EventBus>) -> Self {
        Self {
            coordinator,
            bus,
            user: RwLock::new(None),
            profile: ProfileSlot::new(),
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.user.read().expect("session user lock poisoned").clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.profile.get()
    }

    pub fn profile_slot(&self) -> &ProfileSlot {
        &self.profile
    }

    pub async fn handle_auth_change(&self, change: AuthChange) -> RefreshOutcome {
        match change {
            AuthChange::SignedIn(user) => {
                tracing::info!(user_id = %user.id, "auth: signed in");
                self.set_user(Some(user));
                self.refresh(true).await
            }
            AuthChange::TokenRefreshed(user) => {
                tracing::debug!(user_id = %user.id, "auth: token refreshed");
                self.set_user(Some(user));
                self.refresh(false).await
            }
            AuthChange::UserUpdated => self.refresh(true).await,
            AuthChange::SignedOut => {
                tracing::info!("auth: signed out");
                self.set_user(None);
                self.profile.clear();
                RefreshOutcome::SkippedNoUser
            }
        }
    }

    /// Refresh the cached profile for the current user.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        let user = self.current_user();
        let Some(user_id) = user.as_ref().map(|u| u.id.clone()) else {
            return self.coordinator.refresh_profile(None, &self.profile, force).await;
        };
        let sink = SessionSink {
            session: self,
            user_id,
        };
        self.coordinator
            .refresh_profile(user.as_ref(), &sink, force)
            .await
    }

    fn set_user(&self, user: Option<AuthUser>) {
        let event = AppEvent::AuthStateChanged {
            user_id: user.as_ref().map(|u| u.id.clone()),
            signed_in: user.is_some(),
        };
        {
            let mut guard = self.user.write().expect("session user lock poisoned");
            let changed_identity =
                guard.as_ref().map(|u| &u.id) != user.as_ref().map(|u| &u.id);
            if changed_identity {
                self.profile.clear();
            }
            *guard = user;
        }
        self.bus.emit(event);
    }
}

/// Delivers into the session's slot only while the fetch's user is still
/// the session user, so a result landing after sign-out or a user switch is
/// dropped.
struct SessionSink<'a> {
    session: &'a AuthSession,
    user_id: String,
}

impl ProfileSink for SessionSink<'_> {
    fn set_profile(&self, profile: Profile) {
        self.session.profile.set_profile(profile);
    }

    fn is_live(&self) -> bool {
        self.session.profile.is_live()
            && self
                .session
                .current_user()
                .is_some_and(|user| user.id == self.user_id)
    }
}
