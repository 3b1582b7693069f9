use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::time::Instant;

use crate::backend::{AuthUser, Backend, Profile};
use crate::bus::{AppEvent, EventBus};

/// Minimum time between two unforced refreshes on one coordinator.
pub const PROFILE_REFRESH_INTERVAL: Duration = Duration::from_millis(2000);

/// Destination for a freshly fetched profile.
///
/// `set_profile` runs while the coordinator's state lock is held and must not
/// call back into the coordinator.
pub trait ProfileSink: Send + Sync {
    fn set_profile(&self, profile: Profile);

    /// A sink that is no longer live (its consumer went away) drops results
    /// that arrive late.
    fn is_live(&self) -> bool {
        true
    }
}

impl<F> ProfileSink for F
where
    F: Fn(Profile) + Send + Sync,
{
    fn set_profile(&self, profile: Profile) {
        self(profile)
    }
}

/// Shared cached copy of the current profile. Clones observe the same slot.
#[derive(Debug, Clone, Default)]
pub struct ProfileSlot {
    inner: Arc<SlotInner>,
}

#[derive(Debug, Default)]
struct SlotInner {
    profile: RwLock<Option<Profile>>,
    detached: AtomicBool,
}

impl ProfileSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Profile> {
        self.inner
            .profile
            .read()
            .expect("profile slot lock poisoned")
            .clone()
    }

    pub fn clear(&self) {
        *self.inner.profile.write().expect("profile slot lock poisoned") = None;
    }

    /// Mark the slot's consumer as gone. Later deliveries are ignored.
    pub fn detach(&self) {
        self.inner.detached.store(true, Ordering::SeqCst);
    }

    pub fn is_detached(&self) -> bool {
        self.inner.detached.load(Ordering::SeqCst)
    }
}

impl ProfileSink for ProfileSlot {
    fn set_profile(&self, profile: Profile) {
        *self.inner.profile.write().expect("profile slot lock poisoned") = Some(profile);
    }

    fn is_live(&self) -> bool {
        !self.is_detached()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No user: nothing fetched.
    SkippedNoUser,
    /// Inside the throttle window and not forced: nothing fetched.
    Throttled,
    /// Fetched and delivered to the sink.
    Updated,
    /// Fetch succeeded without a row; sink untouched.
    Empty,
    /// Fetch failed; logged, sink untouched.
    Failed,
    /// Fetched, but the sink was no longer live.
    SinkGone,
    /// Fetched, but a refresh claimed after this one owns the sink now.
    Superseded,
}

impl RefreshOutcome {
    pub fn fetched(&self) -> bool {
        !matches!(self, Self::SkippedNoUser | Self::Throttled)
    }
}

/// Per-coordinator throttle marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshState {
    last_refresh_at: Option<Instant>,
    generation: u64,
}

impl RefreshState {
    pub fn last_refresh_at(&self) -> Option<Instant> {
        self.last_refresh_at
    }

    /// Number of refreshes claimed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Claim a refresh slot at `now` and return its generation. The marker
    /// never moves backwards.
    fn try_begin(&mut self, now: Instant, min_interval: Duration, force: bool) -> Option<u64> {
        if let Some(last) = self.last_refresh_at {
            if !force && now.saturating_duration_since(last) < min_interval {
                return None;
            }
        }
        self.last_refresh_at = Some(match self.last_refresh_at {
            Some(last) if last > now => last,
            _ => now,
        });
        self.generation += 1;
        Some(self.generation)
    }
}

/// Fetches the current user's profile and hands it to a sink, suppressing
/// refreshes that arrive within [`PROFILE_REFRESH_INTERVAL`] of the last
/// attempt.
///
/// Each instance throttles independently. Refreshes never return an error:
/// failures are logged and leave the sink as it was. When fetches overlap,
/// only the most recently claimed one may deliver.
pub struct ProfileRefreshCoordinator {
    backend: Arc<dyn Backend>,
    bus: Option<Arc<EventBus>>,
    min_interval: Duration,
    state: Mutex<RefreshState>,
}

impl ProfileRefreshCoordinator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            bus: None,
            min_interval: PROFILE_REFRESH_INTERVAL,
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Announce delivered profiles as [`AppEvent::ProfileUpdated`].
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn state(&self) -> RefreshState {
        *self.state.lock().expect("refresh state mutex poisoned")
    }

    pub async fn refresh_profile<S>(&self, user: Option<&AuthUser>, sink: &S, force: bool) -> RefreshOutcome
    where
        S: ProfileSink + ?Sized,
    {
        let Some(user) = user else {
            tracing::debug!("profile refresh skipped: no user");
            return RefreshOutcome::SkippedNoUser;
        };

        // Claimed before the fetch so calls made while it is in flight are
        // throttled too.
        let claimed = {
            let mut state = self.state.lock().expect("refresh state mutex poisoned");
            state.try_begin(Instant::now(), self.min_interval, force)
        };
        let Some(generation) = claimed else {
            tracing::debug!(user_id = %user.id, "profile refresh throttled");
            return RefreshOutcome::Throttled;
        };

        match self.backend.fetch_profile(&user.id).await {
            Ok(Some(profile)) => {
                if !sink.is_live() {
                    tracing::debug!(user_id = %user.id, "profile fetched for a detached sink; dropped");
                    return RefreshOutcome::SinkGone;
                }
                let event = AppEvent::ProfileUpdated {
                    user_id: profile.id.clone(),
                    username: profile.username.clone(),
                };
                {
                    // Held across delivery so an overlapping refresh cannot
                    // interleave its check and write with ours.
                    let state = self.state.lock().expect("refresh state mutex poisoned");
                    if state.generation != generation {
                        tracing::debug!(
                            user_id = %user.id,
                            generation,
                            latest = state.generation,
                            "profile fetch superseded by a newer refresh; dropped"
                        );
                        return RefreshOutcome::Superseded;
                    }
                    sink.set_profile(profile);
                }
                if let Some(bus) = &self.bus {
                    bus.emit(event);
                }
                RefreshOutcome::Updated
            }
            Ok(None) => {
                tracing::debug!(user_id = %user.id, "profile refresh returned no row");
                RefreshOutcome::Empty
            }
            Err(error) => {
                tracing::warn!(user_id = %user.id, "profile refresh failed: {error}");
                RefreshOutcome::Failed
            }
        }
    }
}
