use macroquad::prelude::Color;

use crate::config::InputMode;
use crate::engine::Engine;
use crate::renderer::Palette;
use crate::stats::{PopulationStats, RingBuffer};
use crate::themes::Theme;

/// Panel toggles and host-side controls that live outside the engine.
pub struct HudState {
    pub paused: bool,
    pub step_requested: bool,
    pub show_graphs: bool,
    pub show_diagnostics: bool,
}

impl Default for HudState {
    fn default() -> Self {
        Self {
            paused: false,
            step_requested: false,
            show_graphs: false,
            show_diagnostics: true,
        }
    }
}

/// Requests the host applies after the frame's UI pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HudAction {
    NextTheme,
    Restart,
    SetMode(InputMode),
}

/// Draw every egui panel and return what the user asked for.
pub fn draw_hud(engine: &Engine, theme: Theme, palette: &Palette, hud: &mut HudState) -> Vec<HudAction> {
    let mut actions = Vec::new();

    egui_macroquad::ui(|ctx| {
        draw_toolbar(ctx, engine, theme, hud, &mut actions);

        if hud.show_graphs {
            if let (Some(stats), Some(config)) = (engine.stats(), engine.config()) {
                draw_graphs(ctx, stats, &config.categories, palette);
            }
        }
    });
    egui_macroquad::draw();

    actions
}

fn draw_toolbar(
    ctx: &egui::Context,
    engine: &Engine,
    theme: Theme,
    hud: &mut HudState,
    actions: &mut Vec<HudAction>,
) {
    let snapshot = engine.snapshot();
    let mode = engine.config().map(|c| c.input.mode);

    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.add_space(3.0);
        ui.horizontal_wrapped(|ui| {
            ui.label(
                egui::RichText::new(theme.label().to_uppercase())
                    .strong()
                    .color(egui::Color32::from_rgb(190, 220, 255)),
            );

            ui.separator();
            compact_group(ui, "Sim", |ui| {
                let pause_label = if hud.paused { "Play" } else { "Pause" };
                if ui.button(pause_label).clicked() {
                    hud.paused = !hud.paused;
                }
                if ui.button("Step").clicked() {
                    hud.step_requested = true;
                }
                if ui.button("Restart").clicked() {
                    actions.push(HudAction::Restart);
                }
                if ui.button("Next theme").clicked() {
                    actions.push(HudAction::NextTheme);
                }
            });

            compact_group(ui, "Pointer", |ui| {
                for (target, label) in [(InputMode::Spawn, "Spawn"), (InputMode::Paint, "Paint")] {
                    if ui.selectable_label(mode == Some(target), label).clicked() && mode != Some(target) {
                        actions.push(HudAction::SetMode(target));
                    }
                }
            });

            compact_group(ui, "Panels", |ui| {
                ui.toggle_value(&mut hud.show_graphs, "Graphs");
                ui.toggle_value(&mut hud.show_diagnostics, "Diagnostics");
            });
        });

        let Some(snap) = snapshot else {
            return;
        };
        ui.add_space(4.0);
        ui.horizontal_wrapped(|ui| {
            metric_chip(ui, "Population", format!("{}/{}", snap.len(), snap.population_cap));
            metric_chip(ui, "Links", format!("{}", snap.connections.len()));
            metric_chip(ui, "Tick", format!("{}", snap.tick));
            metric_chip(ui, "Time", format!("{:.1}s", snap.elapsed));
            if let Some(top) = snap.entities.iter().map(|e| e.generation).max() {
                metric_chip(ui, "Max Gen", format!("{top}"));
            }
            if snap.diagnostics.saturated() {
                status_chip(ui, "AT CAP", egui::Color32::from_rgb(230, 170, 80));
            }
            if hud.paused {
                status_chip(ui, "PAUSED", egui::Color32::from_rgb(255, 205, 50));
            }
        });

        if hud.show_diagnostics {
            let totals = &snap.totals;
            ui.horizontal_wrapped(|ui| {
                metric_chip(ui, "Births", format!("{}", totals.births));
                metric_chip(ui, "Spawned", format!("{}", totals.spawned));
                metric_chip(
                    ui,
                    "Deaths",
                    format!("{} starved / {} old", totals.deaths_starved, totals.deaths_old_age),
                );
                metric_chip(
                    ui,
                    "Refused",
                    format!("{} repl / {} spawn", totals.refused_replications, totals.refused_spawns),
                );
                metric_chip(ui, "Mutations", format!("{}", totals.mutations));
                metric_chip(ui, "Coalesced", format!("{}", totals.coalesced_inputs));
                metric_chip(
                    ui,
                    "Clamps",
                    format!(
                        "{} dt / {} force / {} speed",
                        totals.clamped_frames, totals.clamped_forces, totals.clamped_speeds
                    ),
                );
                if totals.non_finite_repairs > 0 {
                    status_chip(
                        ui,
                        &format!("NaN repairs: {}", totals.non_finite_repairs),
                        egui::Color32::from_rgb(255, 100, 100),
                    );
                }
            });
        }
        ui.add_space(3.0);
    });
}

fn draw_graphs(ctx: &egui::Context, stats: &PopulationStats, categories: &[String], palette: &Palette) {
    egui::Window::new("Statistics")
        .default_pos(egui::pos2(20.0, 120.0))
        .default_size(egui::vec2(360.0, 320.0))
        .resizable(true)
        .show(ctx, |ui| {
            ui.collapsing("Population", |ui| {
                line_graph(ui, &stats.population, egui::Color32::from_rgb(100, 200, 100));
            });

            ui.collapsing("By Category", |ui| {
                let (rect, painter) = graph_area(ui);
                for (idx, buffer) in stats.per_category.iter().enumerate() {
                    draw_line_in_rect(&painter, buffer, rect, to_color32(palette.category_color(idx)));
                }
                ui.horizontal_wrapped(|ui| {
                    for (idx, tag) in categories.iter().enumerate() {
                        ui.colored_label(to_color32(palette.category_color(idx)), tag);
                    }
                });
            });

            ui.collapsing("Average Energy", |ui| {
                line_graph(ui, &stats.avg_energy, egui::Color32::from_rgb(200, 200, 100));
            });

            ui.collapsing("Births / Deaths", |ui| {
                let (rect, painter) = graph_area(ui);
                draw_line_in_rect(&painter, &stats.births, rect, egui::Color32::from_rgb(100, 180, 255));
                draw_line_in_rect(&painter, &stats.deaths, rect, egui::Color32::from_rgb(255, 100, 100));
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(100, 180, 255), "Births");
                    ui.colored_label(egui::Color32::from_rgb(255, 100, 100), "Deaths");
                });
            });

            ui.collapsing("Average Generation", |ui| {
                line_graph(ui, &stats.avg_generation, egui::Color32::from_rgb(200, 150, 255));
            });

            ui.collapsing("Connections / Mutants", |ui| {
                let (rect, painter) = graph_area(ui);
                draw_line_in_rect(&painter, &stats.connections, rect, egui::Color32::from_rgb(150, 220, 255));
                draw_line_in_rect(&painter, &stats.mutants, rect, egui::Color32::from_rgb(255, 120, 220));
            });
        });
}

fn graph_area(ui: &mut egui::Ui) -> (egui::Rect, egui::Painter) {
    let size = egui::vec2(ui.available_width(), 80.0);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    painter.rect_filled(response.rect, 2.0, egui::Color32::from_gray(20));
    (response.rect, painter)
}

fn line_graph(ui: &mut egui::Ui, buffer: &RingBuffer, color: egui::Color32) {
    let (rect, painter) = graph_area(ui);
    draw_line_in_rect(&painter, buffer, rect, color);

    if let Some(val) = buffer.last() {
        painter.text(
            egui::pos2(rect.right() - 4.0, rect.top() + 2.0),
            egui::Align2::RIGHT_TOP,
            format!("{val:.0}"),
            egui::FontId::proportional(10.0),
            egui::Color32::from_gray(200),
        );
    }
}

fn draw_line_in_rect(painter: &egui::Painter, buffer: &RingBuffer, rect: egui::Rect, color: egui::Color32) {
    let samples: Vec<f32> = buffer.iter().collect();
    let points = graph_points(&samples, rect);
    for pair in points.windows(2) {
        painter.line_segment([pair[0], pair[1]], egui::Stroke::new(1.5, color));
    }
}

/// Samples spread across `rect`, scaled between their min and max.
fn graph_points(samples: &[f32], rect: egui::Rect) -> Vec<egui::Pos2> {
    if samples.len() < 2 {
        return Vec::new();
    }
    let max_val = samples.iter().copied().fold(1.0f32, f32::max);
    let min_val = samples.iter().copied().fold(max_val, f32::min);
    let range = (max_val - min_val).max(1.0);
    let last = (samples.len() - 1) as f32;

    samples
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = rect.left() + (i as f32 / last) * rect.width();
            let y = rect.bottom() - ((v - min_val) / range) * rect.height();
            egui::pos2(x, y)
        })
        .collect()
}

fn to_color32(color: Color) -> egui::Color32 {
    let [r, g, b, a]: [u8; 4] = color.into();
    egui::Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn compact_group(ui: &mut egui::Ui, heading: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    ui.group(|ui| {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(heading)
                    .small()
                    .color(egui::Color32::from_rgb(150, 170, 185)),
            );
            add_contents(ui);
        });
    });
}

fn metric_chip(ui: &mut egui::Ui, key: &str, value: String) {
    let text = egui::RichText::new(format!("{key}: {value}"))
        .small()
        .color(egui::Color32::from_rgb(205, 215, 225));
    ui.group(|ui| {
        ui.label(text);
    });
}

fn status_chip(ui: &mut egui::Ui, label: &str, color: egui::Color32) {
    ui.group(|ui| {
        ui.label(egui::RichText::new(label).small().strong().color(color));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_points_span_the_rect() {
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 50.0));
        let points = graph_points(&[0.0, 5.0, 10.0], rect);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], egui::pos2(0.0, 50.0));
        assert_eq!(points[1], egui::pos2(50.0, 25.0));
        assert_eq!(points[2], egui::pos2(100.0, 0.0));
        assert!(graph_points(&[3.0], rect).is_empty());
    }

    #[test]
    fn colors_convert_to_egui() {
        let c = to_color32(Color::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(c, egui::Color32::from_rgb(255, 0, 0));
    }
}
