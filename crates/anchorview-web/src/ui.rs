//! Session overlay: status, back button and scale controls

use anchorview_core::interaction::{MAX_USER_SCALE, MIN_USER_SCALE, SCALE_STEP};
use anchorview_core::SessionStatus;
use anchorview_scene::{ArSession, EndSession, PointerCapture, ResetInteraction, UserInteraction};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

pub const STARTING_MESSAGE: &str = "Starting AR Engine...";
pub const SCANNING_MESSAGE: &str = "Scanning Active";
pub const DETECTED_MESSAGE: &str = "Model Detected";
pub const GESTURE_HINT: &str = "Drag to rotate, pinch to zoom";

pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OverlayState>()
            .add_systems(EguiPrimaryContextPass, overlay_system);
    }
}

/// Overlay visibility toggles
#[derive(Resource)]
pub struct OverlayState {
    pub show_controls: bool,
    /// Display name of the current item
    pub title: Option<String>,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            show_controls: true,
            title: None,
        }
    }
}

/// Status line for the current session state
pub fn status_line(status: &SessionStatus, tracked: bool) -> Option<String> {
    match status {
        SessionStatus::Idle => None,
        SessionStatus::Initializing => Some(STARTING_MESSAGE.to_string()),
        SessionStatus::Error(e) => Some(e.user_message().to_string()),
        SessionStatus::Ready if tracked => Some(DETECTED_MESSAGE.to_string()),
        SessionStatus::Ready => Some(SCANNING_MESSAGE.to_string()),
    }
}

fn overlay_system(
    mut contexts: EguiContexts,
    session: Res<ArSession>,
    mut overlay: ResMut<OverlayState>,
    mut interaction: ResMut<UserInteraction>,
    mut capture: ResMut<PointerCapture>,
    mut end: MessageWriter<EndSession>,
    mut reset: MessageWriter<ResetInteraction>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let status = session.lifecycle.status();
    let tracked = session.lifecycle.tracked();

    // Nothing to show between sessions; the hosting frontend owns the screen
    if status == &SessionStatus::Idle && !session.lifecycle.is_mounted() {
        return;
    }

    egui::TopBottomPanel::top("session_bar")
        .frame(egui::Frame::NONE.fill(egui::Color32::from_black_alpha(140)).inner_margin(8.0))
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button(egui::RichText::new("← Back").size(18.0)).clicked() {
                    end.write(EndSession);
                }
                if let Some(title) = &overlay.title {
                    ui.label(egui::RichText::new(title).strong().color(egui::Color32::WHITE));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if status == &SessionStatus::Ready {
                        let label = if overlay.show_controls { "Hide controls" } else { "Controls" };
                        if ui.button(label).clicked() {
                            overlay.show_controls = !overlay.show_controls;
                        }
                    }
                });
            });
        });

    if let Some(line) = status_line(status, tracked) {
        let color = if status.is_error() {
            egui::Color32::from_rgb(255, 120, 120)
        } else {
            egui::Color32::WHITE
        };
        egui::Area::new(egui::Id::new("session_status"))
            .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 56.0))
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::NONE
                    .fill(egui::Color32::from_black_alpha(160))
                    .corner_radius(12.0)
                    .inner_margin(egui::Margin::symmetric(14, 8))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(line).size(16.0).color(color));
                        if status == &SessionStatus::Ready && tracked {
                            ui.label(egui::RichText::new(GESTURE_HINT).size(12.0).color(egui::Color32::LIGHT_GRAY));
                        }
                    });
            });
    }

    if status == &SessionStatus::Ready && overlay.show_controls {
        egui::Area::new(egui::Id::new("scale_controls"))
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
            .show(ctx, |ui| {
                egui::Frame::NONE
                    .fill(egui::Color32::from_black_alpha(160))
                    .corner_radius(16.0)
                    .inner_margin(10.0)
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            let transform = &mut interaction.transform;
                            if ui.button(egui::RichText::new("−").size(20.0)).clicked() {
                                transform.nudge_scale(-SCALE_STEP);
                            }
                            let mut scale = transform.user_scale;
                            let slider = egui::Slider::new(&mut scale, MIN_USER_SCALE..=MAX_USER_SCALE)
                                .step_by(0.01)
                                .custom_formatter(|v, _| format!("{v:.2}×"));
                            if ui.add(slider).changed() {
                                transform.set_scale(scale);
                            }
                            if ui.button(egui::RichText::new("+").size(20.0)).clicked() {
                                transform.nudge_scale(SCALE_STEP);
                            }
                            ui.separator();
                            if ui.button("Reset").clicked() {
                                reset.write(ResetInteraction);
                            }
                        });
                    });
            });
    }

    // Contacts over the overlay must not also drive the model
    let over_ui = ctx.is_pointer_over_area() || ctx.wants_pointer_input();
    if capture.captured != over_ui {
        capture.captured = over_ui;
    }
}
