//! Map interaction controller
//!
//! Composes the cache, clusterer, selection and permission gate into a
//! single event-driven owner of map state. Every input (screen activation,
//! filter edits, location fixes, taps, fetch completions) is turned into a
//! list of [`Effect`] values processed by one router in the application
//! shell; the controller itself performs no I/O and never touches the
//! camera directly.

use crate::cache::{ChurchCache, RefreshOutcome, RefreshTicket};
use crate::church::Church;
use crate::cluster::{Clusterer, MapMarker};
use crate::directory::DirectoryQuery;
use crate::filter::ConfessionFilter;
use crate::location::{fallback_position, PermissionState};
use crate::selection::{
    resolve_tap, CameraCommand, Selection, SelectedMarker, TapTarget, NEAR_ZOOM,
};
use crate::store::ChurchStore;
use crate::Result;
use chrono::{DateTime, Utc};
use geo::Point;

/// Instruction for the application shell
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Camera(CameraCommand),
    /// Show the detail panel for these churches
    ShowDetail(Vec<i64>),
    HideDetail,
    /// Run the directory fetch on a background task; its result must come
    /// back through [`MapController::fetch_completed`] with the same ticket
    StartFetch {
        ticket: RefreshTicket,
        query: DirectoryQuery,
    },
    /// Surface a failure to the user; local data stays as it was
    ReportError(String),
}

/// Owner of selection, filter, and camera-relevant map state
pub struct MapController<S> {
    cache: ChurchCache<S>,
    clusterer: Clusterer,
    selection: Selection,
    filter: ConfessionFilter,
    /// Filter in effect at the last local data load; compared against the
    /// current filter to detect changes made while the screen was away
    loaded_filter: Option<ConfessionFilter>,
    churches: Vec<Church>,
    data_generation: u64,
    zoom: f64,
    permission: PermissionState,
    last_fix: Option<Point<f64>>,
    /// One-shot guard: the camera is centered on the user exactly once per
    /// session, on the first fix
    centered_on_user: bool,
}

impl<S: ChurchStore> MapController<S> {
    pub fn new(cache: ChurchCache<S>, filter: ConfessionFilter, permission: PermissionState) -> Self {
        Self {
            cache,
            clusterer: Clusterer::new(),
            selection: Selection::new(),
            filter,
            loaded_filter: None,
            churches: Vec::new(),
            data_generation: 0,
            zoom: crate::selection::START_ZOOM,
            permission,
            last_fix: None,
            centered_on_user: false,
        }
    }

    /// The map screen became active
    ///
    /// Always reloads from the local store; a remote refresh is started only
    /// when the cache is stale. A filter changed while the screen was away
    /// is treated like [`Self::set_filter`].
    pub fn activated(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if self
            .loaded_filter
            .as_ref()
            .is_some_and(|loaded| *loaded != self.filter)
        {
            tracing::debug!("filter changed while inactive, re-running data flow");
            return self.obtain_data(now);
        }

        let mut effects = Vec::new();
        if let Err(e) = self.reload_local() {
            effects.push(Effect::ReportError(e.to_string()));
        }
        if let Some(effect) = self.conditional_fetch(now) {
            effects.push(effect);
        }
        effects
    }

    /// Replace the confession filter
    ///
    /// A change clears the selection, hides the detail panel, drops any
    /// in-flight fetch (its scope is obsolete) and re-runs the full
    /// obtain-data flow. Setting an equal filter does nothing.
    pub fn set_filter(&mut self, filter: ConfessionFilter, now: DateTime<Utc>) -> Vec<Effect> {
        if filter == self.filter {
            return Vec::new();
        }
        self.filter = filter;
        self.cache.cancel_inflight();
        self.obtain_data(now)
    }

    /// A location fix arrived
    ///
    /// The first fix centers the camera once and anchors an initial data
    /// load at the user's position; later fixes only update the stored
    /// anchor.
    pub fn location_fix(&mut self, fix: Point<f64>, now: DateTime<Utc>) -> Vec<Effect> {
        self.last_fix = Some(fix);

        if self.centered_on_user {
            return Vec::new();
        }
        self.centered_on_user = true;

        let mut effects = vec![Effect::Camera(CameraCommand::CenterOn {
            position: fix,
            zoom: Some(NEAR_ZOOM),
        })];
        effects.extend(self.obtain_data(now));
        effects
    }

    /// The map zoom changed (markers re-bucket lazily on the next query)
    pub fn zoom_changed(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    /// Markers for the current data set at the current zoom
    pub fn markers(&mut self) -> &[MapMarker] {
        self.clusterer
            .markers(&self.churches, self.zoom, self.data_generation)
    }

    /// Resolve a tap and apply its selection change
    pub fn tap(&mut self, target: &TapTarget) -> Vec<Effect> {
        let outcome = resolve_tap(target, self.zoom, &self.churches);

        match &outcome.selection {
            Some(marker) => self.selection.select(marker.clone()),
            None => self.selection.clear(),
        }

        let mut effects = Vec::new();
        if let Some(camera) = outcome.camera {
            effects.push(Effect::Camera(camera));
        }
        match outcome.detail {
            Some(ids) => effects.push(Effect::ShowDetail(ids)),
            None => effects.push(Effect::HideDetail),
        }
        effects
    }

    /// A background fetch finished
    pub fn fetch_completed(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<Church>>,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        match self.cache.complete_refresh(ticket, result, now) {
            RefreshOutcome::Applied(_) => {
                let mut effects = Vec::new();
                if let Err(e) = self.reload_local() {
                    effects.push(Effect::ReportError(e.to_string()));
                }
                effects
            }
            RefreshOutcome::Failed(e) => vec![Effect::ReportError(e.to_string())],
            RefreshOutcome::Superseded => Vec::new(),
        }
    }

    // Permission gate; persisted by the application shell

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn permission_prompt_shown(&mut self) {
        self.permission = self.permission.prompt_shown();
    }

    pub fn permission_granted(&mut self) {
        self.permission = self.permission.grant();
    }

    pub fn permission_denied(&mut self) {
        self.permission = self.permission.deny();
    }

    // Accessors for the application shell

    pub fn filter(&self) -> &ConfessionFilter {
        &self.filter
    }

    pub fn selection(&self) -> Option<&SelectedMarker> {
        self.selection.current()
    }

    /// Whether the church id is part of the current selection
    pub fn is_selected(&self, id: i64) -> bool {
        self.selection.contains(id)
    }

    pub fn churches(&self) -> &[Church] {
        &self.churches
    }

    pub fn church(&self, id: i64) -> Option<&Church> {
        self.churches.iter().find(|c| c.id == id)
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.cache.last_refresh()
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.cache.refresh_in_flight()
    }

    pub fn cache(&self) -> &ChurchCache<S> {
        &self.cache
    }

    /// Position used as the query anchor: the latest fix, or the fixed
    /// fallback city while permission is missing or no fix has arrived
    pub fn query_anchor(&self) -> Point<f64> {
        self.last_fix.unwrap_or_else(fallback_position)
    }

    /// Force a refresh attempt regardless of staleness (manual refresh)
    pub fn force_refresh(&mut self) -> Vec<Effect> {
        match self.start_fetch() {
            Some(effect) => vec![effect],
            None => Vec::new(),
        }
    }

    /// Clear selection, hide the panel, reload locally and refresh remotely
    /// if due
    fn obtain_data(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        self.selection.clear();

        let mut effects = vec![Effect::HideDetail];
        if let Err(e) = self.reload_local() {
            effects.push(Effect::ReportError(e.to_string()));
        }
        if let Some(effect) = self.conditional_fetch(now) {
            effects.push(effect);
        }
        effects
    }

    fn conditional_fetch(&mut self, now: DateTime<Utc>) -> Option<Effect> {
        if !self.cache.should_refresh(now) {
            return None;
        }
        self.start_fetch()
    }

    fn start_fetch(&mut self) -> Option<Effect> {
        let ticket = self.cache.begin_refresh()?;
        Some(Effect::StartFetch {
            ticket,
            query: DirectoryQuery {
                near: self.query_anchor(),
                filter: self.filter.clone(),
            },
        })
    }

    fn reload_local(&mut self) -> Result<()> {
        self.churches = self.cache.load(&self.filter)?;
        self.loaded_filter = Some(self.filter.clone());
        self.data_generation += 1;
        tracing::debug!(
            count = self.churches.len(),
            generation = self.data_generation,
            "reloaded churches from local store"
        );
        Ok(())
    }
}
