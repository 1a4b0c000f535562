use crate::showcase::camera::UiInteractionState;
use crate::showcase::config::{
    ANIMATION_SPEED_RANGE, ConfigStore, DebugTuning, ENV_MAP_INTENSITY_RANGE, EXPOSURE_RANGE,
    LIGHT_INTENSITY_RANGE, LIGHT_POSITION_RANGE,
};
use crate::showcase::fox::FoxAnimations;
use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use std::ops::RangeInclusive;
use tracing::{info, warn};

#[derive(Resource)]
pub struct PanelState {
    pub status: String,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            status: "Ready".to_string(),
        }
    }
}

fn slider(
    ui: &mut egui::Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    step: f64,
    label: &str,
) -> bool {
    ui.add(egui::Slider::new(value, range).step_by(step).text(label))
        .changed()
}

pub fn debug_panel_system(
    mut contexts: EguiContexts,
    mut tuning: ResMut<DebugTuning>,
    mut panel: ResMut<PanelState>,
    mut ui_state: ResMut<UiInteractionState>,
    store: Res<ConfigStore>,
    animations: Option<Res<FoxAnimations>>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    // Edit a copy so the resource only reports a change when a widget moved.
    let mut edited = tuning.clone();
    let mut changed = false;

    egui::Window::new("Debug")
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-12.0, 12.0))
        .resizable(false)
        .default_width(280.0)
        .show(ctx, |ui| {
            changed |= slider(
                ui,
                &mut edited.env_map_intensity,
                ENV_MAP_INTENSITY_RANGE,
                0.001,
                "envMapIntensity",
            );

            match animations.as_deref() {
                Some(animations) if !animations.catalog.is_empty() => {
                    let selected = edited.animation.clone().unwrap_or_default();
                    egui::ComboBox::from_label("animation")
                        .selected_text(selected.clone())
                        .show_ui(ui, |ui| {
                            for name in animations.catalog.names() {
                                if ui.selectable_label(*name == selected, name).clicked() {
                                    edited.animation = Some(name.clone());
                                    changed = true;
                                }
                            }
                        });
                }
                Some(_) => {
                    ui.label("animation: none in model");
                }
                None => {
                    ui.label("animation: loading…");
                }
            }

            changed |= slider(
                ui,
                &mut edited.animation_speed,
                ANIMATION_SPEED_RANGE,
                0.01,
                "animationSpeed",
            );
            changed |= slider(
                ui,
                &mut edited.light_intensity,
                LIGHT_INTENSITY_RANGE,
                0.001,
                "lightIntensity",
            );
            changed |= slider(
                ui,
                &mut edited.light_position.0,
                LIGHT_POSITION_RANGE,
                0.001,
                "lightX",
            );
            changed |= slider(
                ui,
                &mut edited.light_position.1,
                LIGHT_POSITION_RANGE,
                0.001,
                "lightY",
            );
            changed |= slider(
                ui,
                &mut edited.light_position.2,
                LIGHT_POSITION_RANGE,
                0.001,
                "lightZ",
            );
            changed |= slider(ui, &mut edited.exposure, EXPOSURE_RANGE, 0.001, "exposure");

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    match store.save(&edited) {
                        Ok(()) => {
                            panel.status = format!("Saved to {}", store.path.display());
                            info!("{}", panel.status);
                        }
                        Err(err) => {
                            panel.status = format!("Save failed: {err}");
                            warn!("{}", panel.status);
                        }
                    }
                }

                if ui.button("Reload").clicked() {
                    match store.reload_tuning() {
                        Ok(loaded) => {
                            edited = loaded;
                            changed = true;
                            panel.status = "Reloaded".to_string();
                        }
                        Err(err) => {
                            panel.status = format!("Reload failed: {err}");
                            warn!("{}", panel.status);
                        }
                    }
                }

                if ui.button("Reset").clicked() {
                    edited = DebugTuning {
                        animation: edited.animation.clone(),
                        ..DebugTuning::default()
                    };
                    changed = true;
                    panel.status = "Reset to defaults".to_string();
                }
            });
            ui.small(panel.status.clone());
        });

    if changed {
        *tuning = edited;
    }

    ui_state.wants_pointer_input = ctx.wants_pointer_input() || ctx.is_pointer_over_area();
}
