//! Preview toolbar using bevy_egui

use anchorview_core::SessionStatus;
use anchorview_scene::{ArSession, PointerCapture, ShadowSettings};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

use crate::bridge::ViewerCommand;
use crate::camera::OrbitCamera;
use crate::capture::CaptureState;
use crate::preview::PreviewState;

pub struct ToolbarPlugin;

impl Plugin for ToolbarPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(EguiPrimaryContextPass, toolbar_system);
    }
}

fn toolbar_system(
    mut contexts: EguiContexts,
    session: Res<ArSession>,
    preview: Res<PreviewState>,
    shadows: Res<ShadowSettings>,
    orbit: Res<OrbitCamera>,
    capture_state: Res<CaptureState>,
    mut capture: ResMut<PointerCapture>,
    mut commands: MessageWriter<ViewerCommand>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    egui::Area::new(egui::Id::new("preview_toolbar"))
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(8.0, 8.0))
        .show(ctx, |ui| {
            egui::Frame::NONE
                .fill(egui::Color32::from_white_alpha(220))
                .corner_radius(8.0)
                .inner_margin(6.0)
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let mut show_shadows = shadows.enabled;
                        if ui.checkbox(&mut show_shadows, "Shadows").changed() {
                            commands.write(ViewerCommand::SetShadows(show_shadows));
                        }
                        let mut show_grid = preview.show_grid;
                        if ui.checkbox(&mut show_grid, "Grid").changed() {
                            commands.write(ViewerCommand::SetGrid(show_grid));
                        }
                        let mut auto_rotate = orbit.auto_rotate;
                        if ui.checkbox(&mut auto_rotate, "Auto-rotate").changed() {
                            commands.write(ViewerCommand::SetAutoRotate(auto_rotate));
                        }
                        let placed = session.lifecycle.status() == &SessionStatus::Ready;
                        if ui
                            .add_enabled(placed && !capture_state.is_pending(), egui::Button::new("📷 Capture"))
                            .clicked()
                        {
                            commands.write(ViewerCommand::Capture);
                        }
                    });
                });
        });

    let message = match session.lifecycle.status() {
        SessionStatus::Idle if preview.model_url.is_none() => Some("No model".to_string()),
        SessionStatus::Initializing => Some("Loading model...".to_string()),
        SessionStatus::Error(e) => Some(e.user_message().to_string()),
        _ => None,
    };
    if let Some(message) = message {
        egui::Area::new(egui::Id::new("preview_status"))
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(egui::RichText::new(message).color(egui::Color32::GRAY));
            });
    }

    let over_ui = ctx.is_pointer_over_area() || ctx.wants_pointer_input();
    if capture.captured != over_ui {
        capture.captured = over_ui;
    }
}
