//! Anchorview Scene - Shared Bevy plumbing for the render hosts
//!
//! Every host (tracking session, editor preview, exported bundle) adds
//! [`AnchorScenePlugin`] and so runs the same sequence: lighting, shadow
//! catcher, asset load, placement composition, anchor insertion, rendering.
//! Hosts differ only in the camera they spawn, the [`SceneHostConfig`] they
//! insert and the [`TrackingBackend`] they inject.

pub mod capability;
pub mod gestures;
pub mod lighting;
pub mod placement;
pub mod session;
pub mod types;

use bevy::prelude::*;

/// Plugin that sets up the shared scene, placement and session systems
pub struct AnchorScenePlugin;

impl Plugin for AnchorScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(lighting::LightingPlugin)
            .add_plugins(session::SessionDriverPlugin)
            .add_plugins(placement::ModelLoadingPlugin)
            .add_plugins(gestures::GesturePlugin);
    }
}

// Re-export commonly used types
pub use capability::{
    CapabilityReady, CapabilityStatus, StaticAnchorBackend, TrackingBackend, TrackingCapability, TrackingEvent,
};
pub use lighting::ShadowSettings;
pub use session::SessionSet;
pub use types::*;
