//! Church Map Library - Core Logic for the Church Directory Map
//!
//! This library holds everything behind the map screen that does not touch a
//! widget: the church data model, the stale-while-revalidate cache over the
//! local store, zoom-dependent marker clustering, the tap-handling policy
//! with its zero-or-one selection invariant, and the interaction controller
//! that turns events into effects for the application shell to apply.
//!
//! # Architecture
//!
//! - **[`Church`] / [`ConfessionFilter`]**: immutable records and the
//!   persisted denomination filter
//! - **[`ChurchCache`]**: serves local data unconditionally, refreshes
//!   remotely when older than an hour, single-flight per attempt
//! - **[`Clusterer`]**: deterministic grid clustering per zoom bucket
//! - **[`MapController`]**: event -> [`Effect`] transformer owning selection
//!   and camera-relevant state
//! - **[`LocationWatcher`]**: the device position as one observable value

mod cache;
mod church;
mod cluster;
mod controller;
mod directory;
mod filter;
mod location;
mod selection;
mod store;
pub mod utils;

// Public API exports
pub use cache::{ChurchCache, RefreshOutcome, RefreshTicket, CACHE_TTL_SECS};
pub use church::{Church, Confession};
pub use cluster::{ClusterItem, Clusterer, MapMarker, CLUSTER_CELL_PX, COINCIDENT_EPSILON_M};
pub use controller::{Effect, MapController};
pub use directory::{ChurchDirectory, DirectoryQuery};
pub use filter::ConfessionFilter;
pub use location::{fallback_position, LocationWatcher, PermissionState};
pub use selection::{
    resolve_tap, CameraCommand, SelectedMarker, Selection, TapOutcome, TapTarget, FIT_PADDING_PX,
    NEAREST_ZOOM, NEAR_ZOOM, START_ZOOM,
};
pub use store::{ChurchStore, MemoryStore};

/// Error types for the map core
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("directory fetch failed: {0}")]
    Fetch(String),

    #[error("local store error: {0}")]
    Store(String),

    #[error("invalid church record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that the main entry points are accessible
        let _: fn(MemoryStore) -> ChurchCache<MemoryStore> = ChurchCache::new;
        let _: fn() -> ConfessionFilter = ConfessionFilter::all;
        let _: fn() -> Clusterer = Clusterer::new;
    }

    #[test]
    fn test_error_messages_name_the_failure() {
        let e = MapError::Fetch("timeout".to_string());
        assert!(e.to_string().contains("timeout"));
    }
}
