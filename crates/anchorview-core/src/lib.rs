//! Anchorview Core - Placement math, gestures and session lifecycle
//!
//! This crate holds everything that must behave identically across the
//! Anchorview render hosts (tracking session, editor preview, exported bundle):
//! - Placement engine: bounding volume -> base transform -> composed placement
//! - Gesture interpreter: contact snapshots -> rotation / scale updates
//! - Interaction state: the user-owned transform layered over the placement
//! - Session lifecycle: state machine, generation guard and ordered teardown
//! - Menu item, marker artifact and bundle manifest types
//!
//! Nothing in here depends on a renderer, so every operation is testable on its own.

pub mod bundle;
pub mod config;
pub mod gesture;
pub mod interaction;
pub mod marker;
pub mod placement;
pub mod session;

pub use bundle::{BundleError, BundleItem, BundleManifest, BundleWriter};
pub use config::{Axes, MenuItem, ModelConfig};
pub use gesture::{GestureInterpreter, GestureKind, GestureUpdate};
pub use interaction::{compose, ComposedTransform, InteractionTransform, Similarity};
pub use marker::{MarkerArtifact, MarkerError};
pub use placement::{compose_placement, compute_base_transform, BaseTransform, BoundingVolume, Placement};
pub use session::{
    run_teardown, ErrorKind, Generation, MarkerSource, PlacementTarget, ResolvedMarker, SessionError,
    SessionLifecycle, SessionPlan, SessionResources, SessionStatus, TeardownError, TeardownReport,
    TeardownStep,
};
