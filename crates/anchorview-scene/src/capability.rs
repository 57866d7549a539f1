//! Tracking capability injected into the session driver
//!
//! The tracking library (marker recognition, camera stream, video surface) is
//! an external collaborator. Hosts wrap it in a [`TrackingBackend`] and insert it
//! as a non-send resource once it is available; until then the driver waits on
//! [`CapabilityStatus`] and the [`CapabilityReady`] message.

use anchorview_core::{Generation, ResolvedMarker, SessionError};
use bevy::prelude::*;

/// Asynchronous notification from a tracking backend. Every event names the
/// generation it was started under so stale ones can be dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    Started { generation: Generation },
    Failed { generation: Generation, reason: String },
    Found { generation: Generation },
    Lost { generation: Generation },
    /// Anchor pose in camera space
    AnchorPose { generation: Generation, pose: Mat4 },
    /// Camera intrinsics once the video stream dimensions are known
    Projection {
        generation: Generation,
        fov_y: f32,
        near: f32,
        far: f32,
    },
}

impl TrackingEvent {
    pub fn generation(&self) -> Generation {
        match self {
            TrackingEvent::Started { generation }
            | TrackingEvent::Failed { generation, .. }
            | TrackingEvent::Found { generation }
            | TrackingEvent::Lost { generation }
            | TrackingEvent::AnchorPose { generation, .. }
            | TrackingEvent::Projection { generation, .. } => *generation,
        }
    }
}

/// Host-specific tracking context. Release methods must be idempotent.
pub trait TrackingBackend {
    fn name(&self) -> &str;

    /// Acquire the camera and begin tracking. Success is reported later as
    /// [`TrackingEvent::Started`]; an `Err` here means acquisition failed outright.
    fn start(&mut self, marker: &ResolvedMarker, generation: Generation) -> Result<(), SessionError>;

    /// Drain events that arrived since the last frame
    fn poll(&mut self) -> Vec<TrackingEvent>;

    fn stop(&mut self) -> Result<(), String>;
    fn release_camera(&mut self) -> Result<(), String>;
    fn remove_video_surface(&mut self) -> Result<(), String>;
}

/// The injected backend. Non-send: browser backends hold JS handles.
pub struct TrackingCapability(pub Box<dyn TrackingBackend>);

impl TrackingCapability {
    pub fn new(backend: impl TrackingBackend + 'static) -> Self {
        Self(Box::new(backend))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Resource)]
pub enum CapabilityStatus {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

/// Published once when the capability finishes loading (or fails to)
#[derive(Message, Debug, Clone)]
pub struct CapabilityReady {
    pub result: Result<(), String>,
}

/// Non-tracking backend: starts immediately and reports the marker as always found.
/// Used by the editor preview, where the anchor sits at the world origin.
#[derive(Debug, Default)]
pub struct StaticAnchorBackend {
    pending: Vec<TrackingEvent>,
    running: bool,
}

impl TrackingBackend for StaticAnchorBackend {
    fn name(&self) -> &str {
        "static"
    }

    fn start(&mut self, marker: &ResolvedMarker, generation: Generation) -> Result<(), SessionError> {
        if !matches!(marker, ResolvedMarker::Fixed) {
            tracing::debug!("static anchor ignores marker artifacts");
        }
        self.running = true;
        self.pending.push(TrackingEvent::Started { generation });
        self.pending.push(TrackingEvent::Found { generation });
        Ok(())
    }

    fn poll(&mut self) -> Vec<TrackingEvent> {
        std::mem::take(&mut self.pending)
    }

    fn stop(&mut self) -> Result<(), String> {
        self.running = false;
        self.pending.clear();
        Ok(())
    }

    fn release_camera(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn remove_video_surface(&mut self) -> Result<(), String> {
        Ok(())
    }
}

/// Track capability readiness from the loader's message
pub(crate) fn update_capability_status(
    mut ready: MessageReader<CapabilityReady>,
    mut status: ResMut<CapabilityStatus>,
) {
    for message in ready.read() {
        *status = match &message.result {
            Ok(()) => {
                tracing::info!("tracking capability ready");
                CapabilityStatus::Ready
            }
            Err(reason) => {
                tracing::error!(reason = %reason, "tracking capability failed to load");
                CapabilityStatus::Failed(reason.clone())
            }
        };
    }
}
