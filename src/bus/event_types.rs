//! Event kinds, typed payloads and flush policy.
//!
//! Single source of truth for the channel names used across the client and
//! for which events are "immediate" (delivered to the sink without batching).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::event_bus::BusEvent;

// ---------------------------------------------------------------------------
// Channel names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FavoritesChanged,
    PromptCreated,
    PromptDeleted,
    ProfileUpdated,
    AuthStateChanged,
}

impl EventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FavoritesChanged => "favorites.changed",
            Self::PromptCreated => "prompt.created",
            Self::PromptDeleted => "prompt.deleted",
            Self::ProfileUpdated => "profile.updated",
            Self::AuthStateChanged => "auth.state_changed",
        }
    }

    pub const fn all() -> &'static [EventKind] {
        &[
            EventKind::FavoritesChanged,
            EventKind::PromptCreated,
            EventKind::PromptDeleted,
            EventKind::ProfileUpdated,
            EventKind::AuthStateChanged,
        ]
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == trimmed)
            .ok_or_else(|| format!("unknown event kind: {value}"))
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Events carried on the bus. Each variant belongs to exactly one
/// [`EventKind`] channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A prompt was added to or removed from a user's favorites.
    FavoritesChanged {
        user_id: String,
        prompt_id: String,
        favorited: bool,
    },

    /// A prompt was created.
    PromptCreated {
        prompt_id: String,
        user_id: String,
        title: String,
    },

    /// A prompt was deleted by its owner.
    PromptDeleted { prompt_id: String, user_id: String },

    /// Fresh profile data was stored for a user.
    ProfileUpdated { user_id: String, username: String },

    /// The authenticated user changed (sign-in, refresh or sign-out).
    AuthStateChanged {
        user_id: Option<String>,
        signed_in: bool,
    },
}

impl AppEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::FavoritesChanged { .. } => EventKind::FavoritesChanged,
            Self::PromptCreated { .. } => EventKind::PromptCreated,
            Self::PromptDeleted { .. } => EventKind::PromptDeleted,
            Self::ProfileUpdated { .. } => EventKind::ProfileUpdated,
            Self::AuthStateChanged { .. } => EventKind::AuthStateChanged,
        }
    }
}

// ---------------------------------------------------------------------------
// Flush policy
// ---------------------------------------------------------------------------

/// Returns true if this event should be sent to the sink immediately
/// instead of being buffered. Immediate events preserve ordering with the
/// current buffer before being sent.
pub fn should_flush_immediately(event: &BusEvent) -> bool {
    matches!(
        event.event.kind(),
        EventKind::FavoritesChanged | EventKind::AuthStateChanged
    )
}
