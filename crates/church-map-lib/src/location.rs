//! Device location as a single observable value, plus the permission gate
//!
//! The watcher wraps a `tokio::sync::watch` channel: the platform side
//! publishes fixes, interested parties subscribe and poll for changes.
//! Dropping the receiver is the unsubscribe, so there is no way to leave a
//! dangling callback into a torn-down consumer.

use crate::utils::lat_lon;
use geo::Point;
use tokio::sync::watch;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Query anchor when location permission is denied or no fix has arrived:
/// central Moscow
pub fn fallback_position() -> Point<f64> {
    lat_lon(55.7558, 37.6173)
}

/// Observable holder of the latest location fix
pub struct LocationWatcher {
    tx: watch::Sender<Option<Point<f64>>>,
}

impl Default for LocationWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationWatcher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Register a subscriber; it observes the current value immediately and
    /// every later change. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Point<f64>>> {
        self.tx.subscribe()
    }

    /// Push a new fix (or `None` when the fix is lost) to all subscribers
    pub fn publish(&self, fix: Option<Point<f64>>) {
        self.tx.send_replace(fix);
    }

    /// Most recent published value
    pub fn latest(&self) -> Option<Point<f64>> {
        *self.tx.borrow()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Location-permission prompt lifecycle
///
/// Persisted across sessions; the prompt is shown exactly once, the first
/// time the map screen appears while still in `NotAsked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PermissionState {
    #[default]
    NotAsked,
    /// Prompt shown, no answer recorded yet
    Asked,
    Granted,
    Denied,
}

impl PermissionState {
    /// Whether the prompt should be shown now
    pub fn should_prompt(&self) -> bool {
        matches!(self, Self::NotAsked)
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied)
    }

    /// `NotAsked -> Asked`; any other state is left unchanged
    pub fn prompt_shown(self) -> Self {
        match self {
            Self::NotAsked => Self::Asked,
            other => other,
        }
    }

    /// `Asked -> Granted`; also accepts `Denied -> Granted` for the case
    /// where the user enables location later through system settings
    pub fn grant(self) -> Self {
        match self {
            Self::Asked | Self::Denied => Self::Granted,
            other => {
                tracing::warn!(state = ?other, "ignoring grant from invalid permission state");
                other
            }
        }
    }

    /// `Asked -> Denied`
    pub fn deny(self) -> Self {
        match self {
            Self::Asked => Self::Denied,
            other => {
                tracing::warn!(state = ?other, "ignoring deny from invalid permission state");
                other
            }
        }
    }
}
