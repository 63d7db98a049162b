//! UI panels around the map: sidebar, detail panel, permission prompt

use crate::app::state::{AppState, TilesProvider};
use chrono::{DateTime, Utc};
use church_map_lib::utils::haversine_meters;
use church_map_lib::{Confession, TapTarget};
use egui::{Color32, RichText, Ui};

/// Render the sidebar toggle button (overlaid on top-right of the map)
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    let button_size = egui::vec2(40.0, 40.0);
    let margin = 10.0;

    let rect = ui.max_rect();
    let button_pos = rect.right_top() + egui::vec2(-button_size.x - margin, margin);
    let button_rect = egui::Rect::from_min_size(button_pos, button_size);

    let response = ui.allocate_rect(button_rect, egui::Sense::click());
    if response.clicked() {
        state.sidebar_open = !state.sidebar_open;
    }

    let bg_color = if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.inactive.bg_fill
    };
    ui.painter().rect_filled(button_rect, 5.0, bg_color);

    let icon = if state.sidebar_open { "✕" } else { "☰" };
    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

/// Render the sidebar with filter, refresh and error sections
pub fn render_sidebar(ctx: &egui::Context, state: &mut AppState, now: DateTime<Utc>) {
    if !state.sidebar_open {
        return;
    }

    egui::SidePanel::right("main_sidebar")
        .default_width(280.0)
        .min_width(240.0)
        .resizable(true)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.heading("Churches");
                    ui.separator();

                    render_filter_section(ui, state);
                    ui.separator();
                    render_data_section(ui, state, now);
                    ui.separator();
                    render_settings_section(ui, state);

                    if !state.errors.is_empty() {
                        ui.separator();
                        render_errors_section(ui, state);
                    }
                });
        });
}

fn render_filter_section(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("Confessions").strong());

    let mut filter = state.controller.filter().clone();
    let mut changed = false;
    for confession in Confession::ALL {
        let mut enabled = filter.contains(confession);
        if ui.checkbox(&mut enabled, confession.name()).changed() {
            filter.set(confession, enabled);
            changed = true;
        }
    }
    if changed {
        state.filter_edit = Some(filter);
    }
}

fn render_data_section(ui: &mut Ui, state: &mut AppState, now: DateTime<Utc>) {
    ui.label(RichText::new("Data").strong());
    ui.label(format!("{} churches shown", state.controller.churches().len()));

    match state.controller.last_refresh() {
        Some(last) => {
            let minutes = (now - last).num_minutes();
            ui.label(format!("Updated {} min ago", minutes.max(0)));
        }
        None => {
            ui.label("Never updated");
        }
    }

    ui.horizontal(|ui| {
        if ui.button("⟳ Refresh").clicked() {
            state.refresh_requested = true;
        }
        if state.controller.refresh_in_flight() {
            ui.spinner();
        }
    });
}

fn render_settings_section(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("Map tiles").strong());
    for provider in TilesProvider::all() {
        ui.selectable_value(&mut state.tiles_provider, *provider, provider.name());
    }
}

fn render_errors_section(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("Errors").strong());
    for error in &state.errors {
        ui.label(
            RichText::new(format!("{} {}", error.at.format("%H:%M"), error.message))
                .color(Color32::from_rgb(200, 80, 80))
                .small(),
        );
    }
    if ui.button("Clear").clicked() {
        state.errors.clear();
    }
}

/// Render the bottom panel with the selected churches
pub fn detail_panel(ctx: &egui::Context, state: &mut AppState) {
    let Some(ids) = state.detail.clone() else {
        return;
    };

    // Collect rows first; the panel closure needs the state mutably
    let anchor = state.controller.query_anchor();
    let rows: Vec<(String, &'static str, Option<String>, f64)> = ids
        .iter()
        .filter_map(|id| state.controller.church(*id))
        .map(|church| {
            (
                church.name.clone(),
                church.confession.name(),
                church.address.clone(),
                haversine_meters(anchor, church.position),
            )
        })
        .collect();

    egui::TopBottomPanel::bottom("church_detail")
        .resizable(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(match rows.len() {
                    1 => "Church".to_string(),
                    n => format!("{} churches", n),
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("✕").clicked() {
                        state.queue_tap(TapTarget::Background);
                    }
                });
            });
            ui.separator();

            egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                for (name, confession, address, distance) in &rows {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(name).strong());
                        ui.label(*confession);
                        ui.label(format_distance(*distance));
                    });
                    if let Some(address) = address {
                        ui.label(RichText::new(address).small());
                    }
                    ui.add_space(4.0);
                }
            });
        });
}

/// Render the one-shot location-permission prompt
pub fn permission_prompt(ctx: &egui::Context, state: &mut AppState) {
    if !state.show_permission_prompt {
        return;
    }

    egui::Window::new("Location")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.label("Use your location to find churches nearby?");
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Allow").clicked() {
                    state.controller.permission_granted();
                    state.publish_cli_fix();
                    state.show_permission_prompt = false;
                }
                if ui.button("Don't allow").clicked() {
                    state.controller.permission_denied();
                    state.show_permission_prompt = false;
                }
            });
        });
}

/// Format a distance as a human-readable string
fn format_distance(meters: f64) -> String {
    let km = meters / 1000.0;
    if km < 1.0 {
        format!("{:.0} m", meters)
    } else if km < 100.0 {
        format!("{:.1} km", km)
    } else {
        format!("{:.0} km", km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance_ranges() {
        assert_eq!(format_distance(350.0), "350 m");
        assert_eq!(format_distance(1500.0), "1.5 km");
        assert_eq!(format_distance(250_000.0), "250 km");
    }
}
