//! Application runtime state
//!
//! Glue between the headless [`MapController`] and the frame loop: the
//! background-fetch slot, the location subscription, pending effects and
//! taps queued by panels or the map plugin, and small UI flags.

use crate::app::settings::Settings;
use crate::directory::{FileDirectory, HttpDirectory, UnconfiguredDirectory};
use chrono::{DateTime, Utc};
use church_map_lib::{
    Church, ChurchCache, ChurchDirectory, ConfessionFilter, DirectoryQuery, Effect,
    LocationWatcher, MapController, MemoryStore, PermissionState, RefreshTicket, TapTarget,
};
use geo::Point;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Tap reported by the map plugin, drained once per frame
pub type TapBridge = Arc<Mutex<Option<TapTarget>>>;

/// One entry in the fetch error log
#[derive(Debug, Clone)]
pub struct FetchError {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Available map tile providers
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TilesProvider {
    OpenStreetMap,
    OpenTopoMap,
}

impl TilesProvider {
    pub fn attribution(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "© OpenStreetMap contributors",
            Self::OpenTopoMap => "© OpenTopoMap (CC-BY-SA)",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::OpenStreetMap, Self::OpenTopoMap]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "OpenStreetMap",
            Self::OpenTopoMap => "OpenTopoMap",
        }
    }
}

/// Main application state
pub struct AppState {
    /// Headless owner of selection, filter, cache and clustering
    pub controller: MapController<MemoryStore>,

    /// Where church records come from
    directory: Arc<dyn ChurchDirectory>,

    /// Handle for spawning background fetches
    runtime: tokio::runtime::Handle,

    /// Completed fetches waiting to be fed back on the UI thread
    fetch_results: Arc<Mutex<Vec<(RefreshTicket, church_map_lib::Result<Vec<Church>>)>>>,

    /// Observable device position
    pub location: LocationWatcher,

    /// Our subscription to it; dropped on teardown with the state itself
    pub location_rx: watch::Receiver<Option<Point<f64>>>,

    /// Simulated fix from the command line, published once permission is granted
    cli_fix: Option<Point<f64>>,

    /// Detail panel content: church ids, or `None` when hidden
    pub detail: Option<Vec<i64>>,

    /// Fetch error log shown in the sidebar
    pub errors: Vec<FetchError>,

    /// Effects queued by panels, waiting for the end-of-frame router
    pending_effects: Vec<Effect>,

    /// Taps queued by panels (the plugin reports through `tap_bridge`)
    pending_taps: Vec<TapTarget>,

    /// Filter edit from the sidebar, applied once per frame
    pub filter_edit: Option<ConfessionFilter>,

    /// Manual refresh requested from the sidebar
    pub refresh_requested: bool,

    /// The permission prompt is on screen (transitioned this session)
    pub show_permission_prompt: bool,

    pub sidebar_open: bool,
    pub tiles_provider: TilesProvider,

    pub tap_bridge: TapBridge,
}

impl AppState {
    pub fn new(
        settings: &Settings,
        cache: ChurchCache<MemoryStore>,
        filter: ConfessionFilter,
        permission: PermissionState,
        sidebar_open: bool,
        tiles_provider: TilesProvider,
    ) -> Self {
        let directory: Arc<dyn ChurchDirectory> = match (&settings.churches_file, &settings.directory_url) {
            (Some(path), _) => Arc::new(FileDirectory::new(path.clone())),
            (None, Some(url)) => match HttpDirectory::new(url.clone(), settings.fetch_timeout_secs) {
                Ok(directory) => Arc::new(directory),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to build HTTP directory client");
                    Arc::new(UnconfiguredDirectory)
                }
            },
            (None, None) => Arc::new(UnconfiguredDirectory),
        };

        let location = LocationWatcher::new();
        let location_rx = location.subscribe();

        let controller = MapController::new(cache, filter, permission);

        let state = Self {
            controller,
            directory,
            runtime: tokio::runtime::Handle::current(),
            fetch_results: Arc::new(Mutex::new(Vec::new())),
            location,
            location_rx,
            cli_fix: settings.cli_fix(),
            detail: None,
            errors: Vec::new(),
            pending_effects: Vec::new(),
            pending_taps: Vec::new(),
            filter_edit: None,
            refresh_requested: false,
            show_permission_prompt: false,
            sidebar_open,
            tiles_provider,
            tap_bridge: Arc::new(Mutex::new(None)),
        };

        // Permission granted in an earlier session: the fix source can start
        // right away
        if state.controller.permission().is_granted() {
            state.publish_cli_fix();
        }
        state
    }

    /// Queue effects for the end-of-frame router
    pub fn queue(&mut self, effects: Vec<Effect>) {
        self.pending_effects.extend(effects);
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.pending_effects)
    }

    /// Queue a tap coming from a panel (e.g. the detail panel's close button)
    pub fn queue_tap(&mut self, tap: TapTarget) {
        self.pending_taps.push(tap);
    }

    /// All taps of this frame: the plugin's, then panel-queued ones
    pub fn take_taps(&mut self) -> Vec<TapTarget> {
        let mut taps = Vec::new();
        if let Ok(mut bridge) = self.tap_bridge.lock() {
            if let Some(tap) = bridge.take() {
                taps.push(tap);
            }
        }
        taps.append(&mut self.pending_taps);
        taps
    }

    /// Run the directory fetch on a background task
    ///
    /// The result is queued and handed to the controller on the UI thread;
    /// the background task never mutates map state itself.
    pub fn spawn_fetch(&self, ticket: RefreshTicket, query: DirectoryQuery) {
        let directory = self.directory.clone();
        let results = self.fetch_results.clone();

        self.runtime.spawn_blocking(move || {
            let result = directory.fetch(&query);
            if let Ok(mut slot) = results.lock() {
                slot.push((ticket, result));
            }
        });
    }

    /// Completed fetches since the last frame
    pub fn take_fetch_results(&mut self) -> Vec<(RefreshTicket, church_map_lib::Result<Vec<Church>>)> {
        match self.fetch_results.lock() {
            Ok(mut slot) => std::mem::take(&mut *slot),
            Err(_) => Vec::new(),
        }
    }

    pub fn push_error(&mut self, message: String, at: DateTime<Utc>) {
        tracing::warn!(message, "fetch error surfaced to user");
        self.errors.push(FetchError { at, message });
    }

    /// Feed the simulated CLI fix into the watcher, if one was given
    pub fn publish_cli_fix(&self) {
        if let Some(fix) = self.cli_fix {
            tracing::info!(lat = fix.y(), lon = fix.x(), "publishing simulated location fix");
            self.location.publish(Some(fix));
        }
    }
}
