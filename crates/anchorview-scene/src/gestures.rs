//! Contact collection and interaction-node updates

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::types::{InteractionNode, PointerCapture, ResetInteraction, SceneHostConfig, UserInteraction};

pub struct GesturePlugin;

impl Plugin for GesturePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<UserInteraction>()
            .init_resource::<PointerCapture>()
            .add_message::<ResetInteraction>()
            .add_systems(
                Update,
                (
                    handle_reset,
                    interpret_contacts.run_if(gestures_enabled),
                    apply_interaction,
                )
                    .chain(),
            );
    }
}

fn gestures_enabled(config: Option<Res<SceneHostConfig>>) -> bool {
    config.map(|c| c.gestures).unwrap_or(true)
}

/// Current contact positions: touches ordered by id, or the cursor while the left button is held
pub fn collect_contacts(
    touches: &Touches,
    mouse_button: Option<&ButtonInput<MouseButton>>,
    cursor: Option<Vec2>,
) -> Vec<Vec2> {
    let mut active: Vec<_> = touches.iter().map(|t| (t.id(), t.position())).collect();
    if !active.is_empty() {
        active.sort_by_key(|(id, _)| *id);
        return active.into_iter().map(|(_, p)| p).collect();
    }

    match (mouse_button, cursor) {
        (Some(buttons), Some(position)) if buttons.pressed(MouseButton::Left) => vec![position],
        _ => Vec::new(),
    }
}

fn interpret_contacts(
    touches: Res<Touches>,
    mouse_button: Option<Res<ButtonInput<MouseButton>>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    capture: Res<PointerCapture>,
    mut interaction: ResMut<UserInteraction>,
) {
    // The overlay owns the pointer: lift every contact so baselines are dropped
    let contacts = if capture.captured {
        Vec::new()
    } else {
        let cursor = windows.single().ok().and_then(|w| w.cursor_position());
        collect_contacts(&touches, mouse_button.as_deref(), cursor)
    };

    let UserInteraction { transform, gestures } = &mut *interaction;
    let update = gestures.update(&contacts, transform);
    if !matches!(update, anchorview_core::GestureUpdate::Unchanged) {
        tracing::trace!(?update, "gesture");
    }
}

fn handle_reset(mut resets: MessageReader<ResetInteraction>, mut interaction: ResMut<UserInteraction>) {
    if resets.read().count() > 0 {
        interaction.reset();
    }
}

/// The render loop picks up the latest interaction value every frame
fn apply_interaction(interaction: Res<UserInteraction>, mut nodes: Query<&mut Transform, With<InteractionNode>>) {
    let similarity = interaction.transform.to_similarity();
    for mut transform in nodes.iter_mut() {
        let next = Transform {
            translation: similarity.translation,
            rotation: similarity.rotation,
            scale: Vec3::splat(similarity.scale),
        };
        if *transform != next {
            *transform = next;
        }
    }
}
