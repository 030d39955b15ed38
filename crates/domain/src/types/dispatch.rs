//! Dispatch scheduling vocabulary

use serde::{Deserialize, Serialize};

use crate::impl_tag_conversions;

/// How soon a dispatched task may be picked up by a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayTier {
    /// Next free worker
    #[default]
    None,
    /// Short jittered delay for calls made while the host app is backgrounded
    Default,
    /// Longer delay for low-priority telemetry
    Long,
}

impl_tag_conversions!(DelayTier {
    None => "none",
    Default => "default",
    Long => "long",
});

impl DelayTier {
    /// Tier for an ordinary API call given the caller's background flag.
    pub const fn for_background(is_background: bool) -> Self {
        if is_background {
            Self::Default
        } else {
            Self::None
        }
    }
}

/// Lifecycle of one logical call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Idle,
    /// Submitted to a scheduler, waiting out its delay tier
    Dispatched,
    /// Transport call executing
    InFlight,
    /// Callbacks drained and the fingerprint entry removed
    Completed,
}

impl_tag_conversions!(CallState {
    Idle => "idle",
    Dispatched => "dispatched",
    InFlight => "in_flight",
    Completed => "completed",
});
