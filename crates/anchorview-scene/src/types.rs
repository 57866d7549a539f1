//! Components, resources and messages shared by the scene plugins

use anchorview_core::{
    Generation, GestureInterpreter, InteractionTransform, ModelConfig, PlacementTarget, SessionLifecycle,
    SessionPlan,
};
use anchorview_core::placement::BaseTransform;
use bevy::prelude::*;

/// How the hosting frontend wants the shared scene set up
#[derive(Debug, Clone, Resource)]
pub struct SceneHostConfig {
    /// Stand content upright on a tracked marker plane (rotate the frame wrapper +90 deg about X)
    pub marker_frame: bool,
    /// Interpret touch/mouse contacts as object gestures
    pub gestures: bool,
}

impl Default for SceneHostConfig {
    fn default() -> Self {
        Self {
            marker_frame: true,
            gestures: true,
        }
    }
}

impl SceneHostConfig {
    /// Non-tracking editor preview: upright Y-up frame, pointer drives the camera instead
    pub fn editor() -> Self {
        Self {
            marker_frame: false,
            gestures: false,
        }
    }
}

/// Camera owned by the active render host. Deactivating it stops rendering.
#[derive(Component)]
pub struct SessionCamera;

/// Node whose transform the tracking backend drives
#[derive(Component)]
pub struct AnchorNode {
    pub generation: Generation,
}

/// Wrapper between the anchor and placed content
#[derive(Component)]
pub struct MarkerFrame;

/// Node carrying the user interaction transform
#[derive(Component)]
pub struct InteractionNode;

/// Node carrying the placement of one loaded asset
#[derive(Component, Debug, Clone)]
pub struct PlacedModel {
    pub generation: Generation,
    pub config: Option<ModelConfig>,
    /// Set once the asset's bounds are known
    pub base: Option<BaseTransform>,
}

/// Asset reference waiting to be loaded under a [`PlacedModel`]
#[derive(Component, Debug, Clone)]
pub struct ModelRequest {
    pub url: String,
}

/// Entities making up one session's anchor subgraph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorRig {
    pub anchor: Entity,
    pub frame: Entity,
    pub interaction: Entity,
    pub model: Entity,
}

/// The one active session of this app
#[derive(Resource, Default)]
pub struct ArSession {
    pub lifecycle: SessionLifecycle,
    pub plan: Option<SessionPlan>,
    pub rig: Option<AnchorRig>,
    /// Tracking start requested but not yet handed to the backend
    pub awaiting_start: bool,
}

impl ArSession {
    /// Asset-load and tracking continuations of `generation` may still write state
    pub fn accepts(&self, generation: Generation) -> bool {
        self.lifecycle.is_live(generation)
    }
}

/// User-owned interaction state plus the gesture baselines driving it
#[derive(Resource, Default)]
pub struct UserInteraction {
    pub transform: InteractionTransform,
    pub gestures: GestureInterpreter,
}

impl UserInteraction {
    pub fn reset(&mut self) {
        self.gestures.reset(&mut self.transform);
    }
}

/// Whether an overlay UI currently owns the pointer
#[derive(Resource, Default)]
pub struct PointerCapture {
    pub captured: bool,
}

/// Request a session for a placement target
#[derive(Message, Debug, Clone)]
pub struct StartSession {
    pub target: PlacementTarget,
}

/// Leave the current session and tear it down
#[derive(Message, Debug, Clone, Default)]
pub struct EndSession;

/// A session finished teardown
#[derive(Message, Debug, Clone, Copy)]
pub struct SessionEnded {
    pub generation: Generation,
}

/// Placement was applied and the asset is visible
#[derive(Message, Debug, Clone, Copy)]
pub struct ModelPlaced {
    pub generation: Generation,
    pub entity: Entity,
}

/// Put the interaction transform back to rest
#[derive(Message, Debug, Clone, Default)]
pub struct ResetInteraction;
