//! Application module
//!
//! Owns the eframe window: the full-screen walkers map with the marker
//! plugin, the sidebar and detail panels, and the end-of-frame effect
//! router. All map state decisions live in `church_map_lib`'s controller;
//! this module only feeds it events and applies the effects it returns.

mod panels;
mod plugin;
pub(crate) mod settings;
mod state;

use crate::app::plugin::ChurchMarkersPlugin;
use crate::app::settings::Settings;
use crate::app::state::{AppState, TilesProvider};
use chrono::{DateTime, Utc};
use church_map_lib::utils;
use church_map_lib::{
    fallback_position, CameraCommand, Church, ChurchCache, ChurchStore, ConfessionFilter, Effect,
    MemoryStore, PermissionState, START_ZOOM,
};
use eframe::egui;
use walkers::{
    HttpTiles, Map, MapMemory, TileId,
    sources::{Attribution, OpenStreetMap, TileSource},
};

/// Custom OpenTopoMap tile source
pub struct OpenTopoMap;

impl TileSource for OpenTopoMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.opentopomap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenTopoMap (CC-BY-SA)",
            url: "https://opentopomap.org/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        17
    }
}

/// Persisted settings (cached churches included, so the map works offline)
#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedSettings {
    filter: ConfessionFilter,
    permission: PermissionState,
    last_refresh: Option<DateTime<Utc>>,
    churches: Vec<Church>,
    tiles_provider: String,
    sidebar_open: bool,
}

/// Main application structure
pub struct ChurchMapApp {
    /// Application state (controller, fetch slot, panel flags)
    state: AppState,

    /// Map tiles provider (OpenStreetMap)
    tiles_osm: HttpTiles,

    /// Map tiles provider (OpenTopoMap)
    tiles_otm: HttpTiles,

    /// Map state (camera position, zoom, etc.)
    map_memory: MapMemory,

    /// Whether the screen-became-active work already ran
    activated: bool,
}

impl ChurchMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let cli_args = Settings::from_cli();

        let persisted = if !cli_args.ignore_persisted {
            cc.storage.and_then(Self::load_persisted_settings)
        } else {
            tracing::info!("Ignoring persisted state (--ignore-persisted flag)");
            None
        };

        let (cache, filter, permission, sidebar_open, tiles_provider) = match persisted {
            Some(s) => (
                ChurchCache::with_last_refresh(
                    MemoryStore::with_churches(s.churches),
                    s.last_refresh,
                ),
                s.filter,
                s.permission,
                s.sidebar_open,
                match s.tiles_provider.as_str() {
                    "OpenTopoMap" => TilesProvider::OpenTopoMap,
                    _ => TilesProvider::OpenStreetMap,
                },
            ),
            None => (
                ChurchCache::new(MemoryStore::new()),
                ConfessionFilter::default(),
                PermissionState::default(),
                true,
                TilesProvider::OpenStreetMap,
            ),
        };

        let state = AppState::new(
            &cli_args,
            cache,
            filter,
            permission,
            sidebar_open,
            tiles_provider,
        );

        let tiles_osm = HttpTiles::new(OpenStreetMap, cc.egui_ctx.clone());
        let tiles_otm = HttpTiles::new(OpenTopoMap, cc.egui_ctx.clone());

        // Start over the fallback city until a location fix arrives
        let mut map_memory = MapMemory::default();
        let start = fallback_position();
        map_memory.center_at(walkers::lat_lon(start.y(), start.x()));
        let _ = map_memory.set_zoom(START_ZOOM);

        tracing::info!(
            cached_churches = state.controller.cache().store().len(),
            "initialized church map"
        );

        Self {
            state,
            tiles_osm,
            tiles_otm,
            map_memory,
            activated: false,
        }
    }

    /// Restore persisted settings from storage
    fn load_persisted_settings(storage: &dyn eframe::Storage) -> Option<PersistedSettings> {
        let json = storage.get_string("persisted_settings")?;
        if json.is_empty() {
            return None;
        }
        match serde_json::from_str::<PersistedSettings>(&json) {
            Ok(settings) => {
                tracing::info!("Restored persisted settings");
                Some(settings)
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable persisted settings");
                None
            }
        }
    }

    /// Apply one controller effect to the map, panels or fetch runner
    fn apply_effect(&mut self, effect: Effect, viewport_px: (f64, f64), now: DateTime<Utc>) {
        match effect {
            Effect::Camera(CameraCommand::CenterOn { position, zoom }) => {
                self.map_memory
                    .center_at(walkers::lat_lon(position.y(), position.x()));
                if let Some(zoom) = zoom {
                    let _ = self.map_memory.set_zoom(zoom);
                }
            }
            Effect::Camera(CameraCommand::FitBounds { bounds, padding_px }) => {
                let (center, zoom) = utils::fit_bounds(bounds, viewport_px, padding_px);
                self.map_memory
                    .center_at(walkers::lat_lon(center.y(), center.x()));
                let _ = self.map_memory.set_zoom(zoom);
            }
            Effect::ShowDetail(ids) => self.state.detail = Some(ids),
            Effect::HideDetail => self.state.detail = None,
            Effect::StartFetch { ticket, query } => self.state.spawn_fetch(ticket, query),
            Effect::ReportError(message) => self.state.push_error(message, now),
        }
    }
}

impl eframe::App for ChurchMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Utc::now();

        // One-shot: the map screen became active
        if !self.activated {
            self.activated = true;
            if self.state.controller.permission().should_prompt() {
                self.state.controller.permission_prompt_shown();
                self.state.show_permission_prompt = true;
            }
            let effects = self.state.controller.activated(now);
            self.state.queue(effects);
        }

        // Location fixes from the watcher, marshalled onto this thread
        if self.state.location_rx.has_changed().unwrap_or(false) {
            let fix = *self.state.location_rx.borrow_and_update();
            if let Some(fix) = fix {
                let effects = self.state.controller.location_fix(fix, now);
                self.state.queue(effects);
            }
        }

        // Completed background fetches
        for (ticket, result) in self.state.take_fetch_results() {
            let effects = self.state.controller.fetch_completed(ticket, result, now);
            self.state.queue(effects);
        }

        panels::permission_prompt(ctx, &mut self.state);
        panels::render_sidebar(ctx, &mut self.state, now);
        panels::detail_panel(ctx, &mut self.state);

        // Keep the clusterer in step with the camera before querying markers
        self.state.controller.zoom_changed(self.map_memory.zoom());

        let markers = self.state.controller.markers().to_vec();
        let confessions: Vec<_> = self
            .state
            .controller
            .churches()
            .iter()
            .map(|c| (c.id, c.confession))
            .collect();
        let selected_ids = self
            .state
            .controller
            .selection()
            .map(|s| s.church_ids())
            .unwrap_or_default();
        let bridge = self.state.tap_bridge.clone();
        let provider = self.state.tiles_provider;
        let attribution_text = provider.attribution();

        // Central panel: the map view (full screen)
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                profiling::scope!("map_panel");

                let marker_plugin =
                    ChurchMarkersPlugin::new(markers, confessions, selected_ids, bridge);

                let tiles: &mut HttpTiles = match provider {
                    TilesProvider::OpenStreetMap => &mut self.tiles_osm,
                    TilesProvider::OpenTopoMap => &mut self.tiles_otm,
                };

                let start = fallback_position();
                let map = Map::new(
                    Some(tiles),
                    &mut self.map_memory,
                    walkers::lat_lon(start.y(), start.x()),
                )
                .with_plugin(marker_plugin);

                ui.add(map);

                panels::sidebar_toggle_button(ui, &mut self.state);

                let painter = ui.painter();
                let screen_rect = ui.max_rect();
                painter.text(
                    screen_rect.center_bottom() + egui::vec2(0.0, -5.0),
                    egui::Align2::CENTER_BOTTOM,
                    attribution_text,
                    egui::FontId::proportional(10.0),
                    egui::Color32::from_black_alpha(180),
                );
            });

        // Inputs gathered by the plugin and the panels this frame
        for tap in self.state.take_taps() {
            let effects = self.state.controller.tap(&tap);
            self.state.queue(effects);
        }
        if std::mem::take(&mut self.state.refresh_requested) {
            let effects = self.state.controller.force_refresh();
            self.state.queue(effects);
        }
        if let Some(filter) = self.state.filter_edit.take() {
            let effects = self.state.controller.set_filter(filter, now);
            self.state.queue(effects);
        }

        // Route every queued effect
        let viewport = ctx.viewport_rect().size();
        for effect in self.state.take_effects() {
            self.apply_effect(effect, (viewport.x as f64, viewport.y as f64), now);
        }

        // Poll for the background fetch result
        if self.state.controller.refresh_in_flight() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings {
            filter: self.state.controller.filter().clone(),
            permission: self.state.controller.permission(),
            last_refresh: self.state.controller.last_refresh(),
            churches: self.state.controller.cache().store().all(),
            tiles_provider: format!("{:?}", self.state.tiles_provider),
            sidebar_open: self.state.sidebar_open,
        };

        if let Ok(json) = serde_json::to_string(&settings) {
            storage.set_string("persisted_settings", json);
            tracing::debug!("Saved settings on exit");
        }
    }
}
