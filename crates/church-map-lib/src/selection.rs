//! Marker selection and the tap-handling policy
//!
//! At most one marker is selected at any time; selecting a new one replaces
//! the previous selection. Taps are resolved into a [`TapOutcome`] value
//! (selection change, camera command, detail-panel content) which a single
//! router applies, instead of each input path mutating the map directly.

use crate::church::Church;
use crate::cluster::{ClusterItem, MapMarker};
use crate::utils;
use geo::{Point, Rect};

/// Zoom at which a cluster no longer expands on tap (maximally zoomed)
pub const NEAREST_ZOOM: f64 = 16.0;

/// Zoom used when stepping into a crowded-pin cluster
pub const NEAR_ZOOM: f64 = 14.0;

/// Initial zoom before any location fix arrives
pub const START_ZOOM: f64 = 10.0;

/// Padding around a cluster's bounding box when fitting the camera to it
pub const FIT_PADDING_PX: f64 = 80.0;

/// The currently chosen marker
#[derive(Debug, Clone, PartialEq)]
pub enum SelectedMarker {
    Church(i64),
    /// Cluster selection, identified by its member church ids
    Cluster(Vec<i64>),
}

impl SelectedMarker {
    /// Church ids behind the selection
    pub fn church_ids(&self) -> Vec<i64> {
        match self {
            Self::Church(id) => vec![*id],
            Self::Cluster(ids) => ids.clone(),
        }
    }
}

/// Zero-or-one selected marker
#[derive(Debug, Default)]
pub struct Selection {
    current: Option<SelectedMarker>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a marker, implicitly deselecting the previous one
    pub fn select(&mut self, marker: SelectedMarker) {
        self.current = Some(marker);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&SelectedMarker> {
        self.current.as_ref()
    }

    /// Whether the church id is part of the current selection
    pub fn contains(&self, id: i64) -> bool {
        match &self.current {
            Some(SelectedMarker::Church(selected)) => *selected == id,
            Some(SelectedMarker::Cluster(ids)) => ids.contains(&id),
            None => false,
        }
    }
}

/// Camera movement requested by the tap policy
#[derive(Debug, Clone, PartialEq)]
pub enum CameraCommand {
    /// Recenter, optionally changing the zoom
    CenterOn {
        position: Point<f64>,
        zoom: Option<f64>,
    },
    /// Animate to fit a Web Mercator bounding box with fixed pixel padding;
    /// the zoom is derived from the fit, never given explicitly
    FitBounds { bounds: Rect<f64>, padding_px: f64 },
}

/// What the user tapped
#[derive(Debug, Clone, PartialEq)]
pub enum TapTarget {
    Marker(MapMarker),
    /// Empty map background
    Background,
}

/// Resolved consequences of one tap
#[derive(Debug, Clone, PartialEq)]
pub struct TapOutcome {
    /// `Some` selects that marker; `None` leaves nothing selected
    pub selection: Option<SelectedMarker>,
    pub camera: Option<CameraCommand>,
    /// `Some(ids)` shows the detail panel for those churches; `None` hides it
    pub detail: Option<Vec<i64>>,
}

/// Apply the tap policy for the current zoom
///
/// `churches` is the set the markers were built from; it is consulted for
/// member positions when a cluster needs a bounding-box fit.
pub fn resolve_tap(target: &TapTarget, zoom: f64, churches: &[Church]) -> TapOutcome {
    match target {
        TapTarget::Background => TapOutcome {
            selection: None,
            camera: None,
            detail: None,
        },
        TapTarget::Marker(MapMarker::Church { id, position }) => TapOutcome {
            selection: Some(SelectedMarker::Church(*id)),
            camera: Some(CameraCommand::CenterOn {
                position: *position,
                zoom: None,
            }),
            detail: Some(vec![*id]),
        },
        TapTarget::Marker(MapMarker::Cluster(item)) => resolve_cluster_tap(item, zoom, churches),
    }
}

fn resolve_cluster_tap(item: &ClusterItem, zoom: f64, churches: &[Church]) -> TapOutcome {
    let members: Vec<i64> = item.members.to_vec();

    if zoom >= NEAREST_ZOOM {
        // Already maximally zoomed: terminal selection, camera stays put
        return TapOutcome {
            selection: Some(SelectedMarker::Cluster(members.clone())),
            camera: None,
            detail: Some(members),
        };
    }

    if item.coincident {
        // Expanding would not change the crowded-pin layout; step in once
        // and select directly
        let target_zoom = (zoom < NEAR_ZOOM).then_some(NEAR_ZOOM);
        return TapOutcome {
            selection: Some(SelectedMarker::Cluster(members.clone())),
            camera: Some(CameraCommand::CenterOn {
                position: item.position,
                zoom: target_zoom,
            }),
            detail: Some(members),
        };
    }

    // Divergent members: only move the camera; selection happens on a
    // subsequent tap once the cluster has spread out
    let positions: Vec<Point<f64>> = churches
        .iter()
        .filter(|c| members.contains(&c.id))
        .map(|c| c.position)
        .collect();

    TapOutcome {
        selection: None,
        camera: utils::mercator_bounds(&positions).map(|bounds| CameraCommand::FitBounds {
            bounds,
            padding_px: FIT_PADDING_PX,
        }),
        detail: None,
    }
}
