//! Profile refresh coordination and the auth session that drives it.

mod coordinator;
mod session;

pub use coordinator::{
    ProfileRefreshCoordinator, ProfileSink, ProfileSlot, RefreshOutcome, RefreshState,
    PROFILE_REFRESH_INTERVAL,
};
pub use session::{AuthChange, AuthSession};
