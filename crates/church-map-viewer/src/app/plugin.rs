//! Walkers plugin that draws church and cluster markers on the map
//!
//! Renders the controller's current markers each frame and resolves primary
//! clicks into [`TapTarget`]s: the nearest marker within the hit radius, or
//! a background tap. Taps are reported through the shared bridge and picked
//! up by the frame loop; the plugin never mutates map state itself.

use crate::app::state::TapBridge;
use church_map_lib::{Confession, MapMarker, TapTarget};
use egui::{Align2, Color32, FontId, Pos2, Stroke};
use walkers::{Plugin, Projector};

/// Church pin radius in pixels
const CHURCH_RADIUS: f32 = 7.0;

/// Cluster disc radius in pixels
const CLUSTER_RADIUS: f32 = 14.0;

/// Extra slack around a marker that still counts as tapping it
const HIT_SLACK: f32 = 6.0;

fn confession_color(confession: Confession) -> Color32 {
    match confession {
        Confession::Orthodox => Color32::from_rgb(212, 160, 23),
        Confession::Catholic => Color32::from_rgb(70, 130, 220),
        Confession::Protestant => Color32::from_rgb(60, 160, 110),
    }
}

/// Plugin rendering the clustered church markers
pub struct ChurchMarkersPlugin {
    markers: Vec<MapMarker>,
    /// Confession per church id, for pin coloring
    confessions: Vec<(i64, Confession)>,
    /// Ids that belong to the current selection (highlighted)
    selected_ids: Vec<i64>,
    bridge: TapBridge,
}

impl ChurchMarkersPlugin {
    pub fn new(
        markers: Vec<MapMarker>,
        confessions: Vec<(i64, Confession)>,
        selected_ids: Vec<i64>,
        bridge: TapBridge,
    ) -> Self {
        Self {
            markers,
            confessions,
            selected_ids,
            bridge,
        }
    }

    fn confession_of(&self, id: i64) -> Option<Confession> {
        self.confessions
            .iter()
            .find(|(church_id, _)| *church_id == id)
            .map(|(_, confession)| *confession)
    }

    fn is_selected(&self, marker: &MapMarker) -> bool {
        marker.member_ids().iter().any(|id| self.selected_ids.contains(id))
    }

    fn draw_marker(&self, marker: &MapMarker, screen: Pos2, painter: &egui::Painter) {
        let selected = self.is_selected(marker);

        match marker {
            MapMarker::Church { id, .. } => {
                let color = self
                    .confession_of(*id)
                    .map(confession_color)
                    .unwrap_or(Color32::GRAY);
                if selected {
                    painter.circle_stroke(screen, CHURCH_RADIUS + 3.0, Stroke::new(2.0, Color32::WHITE));
                }
                painter.circle_filled(screen, CHURCH_RADIUS, color);
                painter.circle_stroke(screen, CHURCH_RADIUS, Stroke::new(1.0, Color32::from_black_alpha(120)));
            }
            MapMarker::Cluster(item) => {
                if selected {
                    painter.circle_stroke(screen, CLUSTER_RADIUS + 3.0, Stroke::new(2.0, Color32::WHITE));
                }
                painter.circle_filled(screen, CLUSTER_RADIUS, Color32::from_rgb(60, 70, 90));
                painter.circle_stroke(screen, CLUSTER_RADIUS, Stroke::new(1.5, Color32::WHITE));
                painter.text(
                    screen,
                    Align2::CENTER_CENTER,
                    item.members.len().to_string(),
                    FontId::proportional(12.0),
                    Color32::WHITE,
                );
            }
        }
    }
}

/// Pick the nearest candidate within its hit radius
///
/// `candidates` holds `(index, screen position, radius)` per marker.
fn hit_test(pointer: Pos2, candidates: &[(usize, Pos2, f32)]) -> Option<usize> {
    candidates
        .iter()
        .filter_map(|(index, screen, radius)| {
            let distance = screen.distance(pointer);
            (distance <= radius + HIT_SLACK).then_some((*index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

impl Plugin for ChurchMarkersPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _map_memory: &walkers::MapMemory,
    ) {
        profiling::scope!("ChurchMarkersPlugin::run");

        let painter = ui.painter();

        // Project every marker once; reused for drawing and hit-testing
        let screen_positions: Vec<Pos2> = self
            .markers
            .iter()
            .map(|marker| {
                let position = marker.position();
                let vec = projector.project(walkers::lat_lon(position.y(), position.x()));
                Pos2::new(vec.x, vec.y)
            })
            .collect();

        for (marker, screen) in self.markers.iter().zip(&screen_positions) {
            self.draw_marker(marker, *screen, painter);
        }

        if response.clicked() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let candidates: Vec<(usize, Pos2, f32)> = self
                    .markers
                    .iter()
                    .enumerate()
                    .map(|(index, marker)| {
                        let radius = match marker {
                            MapMarker::Church { .. } => CHURCH_RADIUS,
                            MapMarker::Cluster(_) => CLUSTER_RADIUS,
                        };
                        (index, screen_positions[index], radius)
                    })
                    .collect();

                let tap = match hit_test(pointer, &candidates) {
                    Some(index) => TapTarget::Marker(self.markers[index].clone()),
                    None => TapTarget::Background,
                };

                if let Ok(mut bridge) = self.bridge.lock() {
                    *bridge = Some(tap);
                }
            }
        }
    }
}
