//! Session lifecycle state machine
//!
//! `idle -> initializing -> ready | error`, with a `tracked` flag that toggles
//! inside `ready`. Every (re)start bumps a generation counter; asynchronous
//! continuations carry the generation they were started under and are dropped
//! when it is no longer current or the session has been unmounted.
//!
//! Teardown is host specific, so hosts implement [`SessionResources`] and hand it
//! to [`run_teardown`], which runs every step in order whatever fails.

use std::fmt;

use thiserror::Error;

use crate::config::{MenuItem, ModelConfig};
use crate::marker::MarkerArtifact;

pub const MISSING_DATA_MESSAGE: &str = "This item is missing AR data. Please update it in Admin Dashboard.";
pub const ACQUISITION_MESSAGE: &str = "Could not start AR Camera. Check permissions.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("missing AR data: no {0}")]
    MissingArData(&'static str),
    #[error("marker artifact unusable: {0}")]
    InvalidMarker(String),
    #[error("tracking capability unavailable: {0}")]
    CapabilityUnavailable(String),
    #[error("could not start tracking: {0}")]
    Acquisition(String),
    #[error("previous session has not released the camera")]
    PreviousSessionActive,
}

/// Error taxonomy surfaced to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Acquisition,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::MissingArData(_) | SessionError::InvalidMarker(_) => ErrorKind::Configuration,
            SessionError::CapabilityUnavailable(_)
            | SessionError::Acquisition(_)
            | SessionError::PreviousSessionActive => ErrorKind::Acquisition,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => MISSING_DATA_MESSAGE,
            ErrorKind::Acquisition => ACQUISITION_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Initializing,
    Ready,
    Error(SessionError),
}

impl SessionStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SessionStatus::Error(_))
    }
}

/// Monotonic session generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Where the marker artifact comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerSource {
    /// Base64 blob as stored by the authoring surface
    Encoded(String),
    /// Already-decoded artifact reachable by URL (exported bundles)
    Url(String),
    /// No tracking: content stays on a fixed anchor at the origin (editor preview)
    Fixed,
}

/// Marker artifact ready to hand to a tracking backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedMarker {
    Artifact(MarkerArtifact),
    Url(String),
    Fixed,
}

/// Everything a session needs to place one asset on one marker
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacementTarget {
    pub name: String,
    pub marker: Option<MarkerSource>,
    pub asset: Option<String>,
    pub config: Option<ModelConfig>,
}

impl PlacementTarget {
    /// Target for a non-tracking host that only needs an asset
    pub fn fixed(asset: impl Into<String>, config: Option<ModelConfig>) -> Self {
        Self {
            name: String::new(),
            marker: Some(MarkerSource::Fixed),
            asset: Some(asset.into()),
            config,
        }
    }

    pub fn from_menu_item(item: &MenuItem) -> Self {
        let marker = match (&item.compiled_target, &item.compiled_target_url) {
            (Some(encoded), _) if !encoded.trim().is_empty() => Some(MarkerSource::Encoded(encoded.clone())),
            (_, Some(url)) if !url.trim().is_empty() => Some(MarkerSource::Url(url.clone())),
            _ => None,
        };
        Self {
            name: item.name.clone(),
            marker,
            asset: item.model_url.clone().filter(|url| !url.trim().is_empty()),
            config: item.model_config,
        }
    }
}

/// Validated inputs for a session that entered `initializing`
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub generation: Generation,
    pub marker: ResolvedMarker,
    pub asset: String,
    pub config: Option<ModelConfig>,
}

#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    status: SessionStatus,
    tracked: bool,
    generation: Generation,
    mounted: bool,
    camera_held: bool,
    asset_failure: Option<String>,
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            tracked: false,
            generation: Generation::default(),
            mounted: false,
            camera_held: false,
            asset_failure: None,
        }
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn tracked(&self) -> bool {
        self.tracked
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether the camera is still owned by a session that has not been torn down
    pub fn camera_held(&self) -> bool {
        self.camera_held
    }

    pub fn asset_failure(&self) -> Option<&str> {
        self.asset_failure.as_deref()
    }

    /// A continuation started under `generation` may still write state
    pub fn is_live(&self, generation: Generation) -> bool {
        self.mounted
            && generation == self.generation
            && matches!(self.status, SessionStatus::Initializing | SessionStatus::Ready)
    }

    /// Placement target became available: validate and enter `initializing` or `error`
    pub fn begin(&mut self, target: &PlacementTarget) -> Result<SessionPlan, SessionError> {
        if self.camera_held || self.mounted {
            return Err(SessionError::PreviousSessionActive);
        }

        self.generation = Generation(self.generation.0 + 1);
        self.mounted = true;
        self.tracked = false;
        self.asset_failure = None;

        let plan = match Self::validate(target) {
            Ok((marker, asset)) => SessionPlan {
                generation: self.generation,
                marker,
                asset,
                config: target.config,
            },
            Err(e) => {
                tracing::warn!(generation = %self.generation, error = %e, "session rejected");
                self.status = SessionStatus::Error(e.clone());
                return Err(e);
            }
        };

        tracing::info!(generation = %self.generation, name = %target.name, "session initializing");
        self.status = SessionStatus::Initializing;
        self.camera_held = true;
        Ok(plan)
    }

    fn validate(target: &PlacementTarget) -> Result<(ResolvedMarker, String), SessionError> {
        let marker = match &target.marker {
            None => return Err(SessionError::MissingArData("marker artifact")),
            Some(MarkerSource::Encoded(encoded)) => MarkerArtifact::from_base64(encoded)
                .map(ResolvedMarker::Artifact)
                .map_err(|e| SessionError::InvalidMarker(e.to_string()))?,
            Some(MarkerSource::Url(url)) if url.trim().is_empty() => {
                return Err(SessionError::MissingArData("marker artifact"))
            }
            Some(MarkerSource::Url(url)) => ResolvedMarker::Url(url.clone()),
            Some(MarkerSource::Fixed) => ResolvedMarker::Fixed,
        };
        let asset = target
            .asset
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(SessionError::MissingArData("asset reference"))?;
        Ok((marker, asset.to_string()))
    }

    /// The tracking context reported a successful start
    pub fn tracking_started(&mut self, generation: Generation) -> bool {
        if !self.is_live(generation) || self.status != SessionStatus::Initializing {
            return false;
        }
        tracing::info!(generation = %generation, "session ready");
        self.status = SessionStatus::Ready;
        true
    }

    /// Acquiring or starting the tracking context failed
    pub fn acquisition_failed(&mut self, generation: Generation, error: SessionError) -> bool {
        if !self.is_live(generation) || self.status != SessionStatus::Initializing {
            return false;
        }
        tracing::error!(generation = %generation, error = %error, "session failed to start");
        self.status = SessionStatus::Error(error);
        true
    }

    /// Asset fetch or parse failed. The session keeps its status; the anchor stays empty.
    pub fn asset_failed(&mut self, generation: Generation, reason: impl Into<String>) -> bool {
        if !self.is_live(generation) {
            return false;
        }
        let reason = reason.into();
        tracing::error!(generation = %generation, reason = %reason, "asset failed to load");
        self.asset_failure = Some(reason);
        true
    }

    /// Tracking found/lost. Only meaningful while `ready`.
    pub fn set_tracked(&mut self, generation: Generation, tracked: bool) -> bool {
        if !self.is_live(generation) || self.status != SessionStatus::Ready {
            return false;
        }
        self.tracked = tracked;
        true
    }

    /// Leave the view. Returns the generation to tear down, or `None` if there is
    /// nothing left to release. Any continuation of the ended generation becomes a no-op.
    pub fn end(&mut self) -> Option<Generation> {
        if !self.mounted && !self.camera_held {
            return None;
        }
        let ended = self.generation;
        self.mounted = false;
        self.tracked = false;
        self.generation = Generation(self.generation.0 + 1);
        tracing::info!(generation = %ended, "session ending");
        Some(ended)
    }

    /// Teardown finished; the camera may be acquired by the next session
    pub fn teardown_complete(&mut self, report: &TeardownReport) {
        if !report.is_clean() {
            tracing::warn!(failures = report.failures.len(), "teardown finished with failures");
        }
        self.camera_held = false;
        self.status = SessionStatus::Idle;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    StopTracking,
    CancelRenderLoop,
    ReleaseCamera,
    RemoveVideoSurface,
    ClearHost,
}

impl TeardownStep {
    pub const ORDER: [TeardownStep; 5] = [
        TeardownStep::StopTracking,
        TeardownStep::CancelRenderLoop,
        TeardownStep::ReleaseCamera,
        TeardownStep::RemoveVideoSurface,
        TeardownStep::ClearHost,
    ];
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TeardownStep::StopTracking => "stop tracking",
            TeardownStep::CancelRenderLoop => "cancel render loop",
            TeardownStep::ReleaseCamera => "release camera",
            TeardownStep::RemoveVideoSurface => "remove video surface",
            TeardownStep::ClearHost => "clear host",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("teardown step '{step}' failed: {reason}")]
pub struct TeardownError {
    pub step: TeardownStep,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct TeardownReport {
    pub failures: Vec<TeardownError>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Host-owned resources released on exit. Every method must tolerate being
/// called when the resource was never acquired or is already released.
pub trait SessionResources {
    fn stop_tracking(&mut self) -> Result<(), String>;
    fn cancel_render_loop(&mut self) -> Result<(), String>;
    fn release_camera(&mut self) -> Result<(), String>;
    fn remove_video_surface(&mut self) -> Result<(), String>;
    fn clear_host(&mut self) -> Result<(), String>;
}

/// Run every teardown step in order. Failures are logged and collected, never propagated.
pub fn run_teardown(resources: &mut dyn SessionResources) -> TeardownReport {
    let mut report = TeardownReport::default();
    for step in TeardownStep::ORDER {
        let result = match step {
            TeardownStep::StopTracking => resources.stop_tracking(),
            TeardownStep::CancelRenderLoop => resources.cancel_render_loop(),
            TeardownStep::ReleaseCamera => resources.release_camera(),
            TeardownStep::RemoveVideoSurface => resources.remove_video_surface(),
            TeardownStep::ClearHost => resources.clear_host(),
        };
        if let Err(reason) = result {
            tracing::warn!(step = %step, reason = %reason, "teardown step failed");
            report.failures.push(TeardownError { step, reason });
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> PlacementTarget {
        PlacementTarget {
            name: "Tiramisu".to_string(),
            marker: Some(MarkerSource::Encoded("AAECAw==".to_string())),
            asset: Some("models/tiramisu.glb".to_string()),
            config: None,
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        calls: Vec<TeardownStep>,
        failing: Vec<TeardownStep>,
    }

    impl RecordingHost {
        fn record(&mut self, step: TeardownStep) -> Result<(), String> {
            self.calls.push(step);
            if self.failing.contains(&step) {
                Err(format!("{step} exploded"))
            } else {
                Ok(())
            }
        }
    }

    impl SessionResources for RecordingHost {
        fn stop_tracking(&mut self) -> Result<(), String> {
            self.record(TeardownStep::StopTracking)
        }
        fn cancel_render_loop(&mut self) -> Result<(), String> {
            self.record(TeardownStep::CancelRenderLoop)
        }
        fn release_camera(&mut self) -> Result<(), String> {
            self.record(TeardownStep::ReleaseCamera)
        }
        fn remove_video_surface(&mut self) -> Result<(), String> {
            self.record(TeardownStep::RemoveVideoSurface)
        }
        fn clear_host(&mut self) -> Result<(), String> {
            self.record(TeardownStep::ClearHost)
        }
    }

    #[test]
    fn test_happy_path() {
        let mut session = SessionLifecycle::new();
        let plan = session.begin(&target()).unwrap();
        assert_eq!(*session.status(), SessionStatus::Initializing);
        assert!(matches!(plan.marker, ResolvedMarker::Artifact(ref m) if m.as_bytes() == [0, 1, 2, 3]));

        assert!(session.tracking_started(plan.generation));
        assert_eq!(*session.status(), SessionStatus::Ready);

        assert!(session.set_tracked(plan.generation, true));
        assert!(session.tracked());
        assert!(session.set_tracked(plan.generation, false));
        assert_eq!(*session.status(), SessionStatus::Ready);
    }

    #[test]
    fn test_missing_asset_goes_straight_to_error() {
        let mut session = SessionLifecycle::new();
        let mut t = target();
        t.asset = None;

        let err = session.begin(&t).unwrap_err();
        assert_eq!(err, SessionError::MissingArData("asset reference"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(*session.status(), SessionStatus::Error(err));
        assert!(!session.camera_held());
    }

    #[test]
    fn test_missing_marker_and_bad_marker() {
        let mut session = SessionLifecycle::new();
        let mut t = target();
        t.marker = None;
        assert_eq!(session.begin(&t), Err(SessionError::MissingArData("marker artifact")));

        session.end();
        session.teardown_complete(&TeardownReport::default());

        t.marker = Some(MarkerSource::Encoded("%%%".to_string()));
        let err = session.begin(&t).unwrap_err();
        assert!(matches!(err, SessionError::InvalidMarker(_)));
        assert_eq!(err.user_message(), MISSING_DATA_MESSAGE);
    }

    #[test]
    fn test_acquisition_failure_is_terminal() {
        let mut session = SessionLifecycle::new();
        let plan = session.begin(&target()).unwrap();

        let err = SessionError::Acquisition("NotAllowedError".to_string());
        assert!(session.acquisition_failed(plan.generation, err.clone()));
        assert_eq!(err.user_message(), ACQUISITION_MESSAGE);

        // No way back to ready without leaving
        assert!(!session.tracking_started(plan.generation));
        assert!(session.status().is_error());
    }

    #[test]
    fn test_unmount_drops_stale_continuations() {
        let mut session = SessionLifecycle::new();
        let plan = session.begin(&target()).unwrap();

        assert_eq!(session.end(), Some(plan.generation));
        assert!(!session.is_live(plan.generation));
        assert!(!session.tracking_started(plan.generation));
        assert!(!session.set_tracked(plan.generation, true));
        assert!(!session.asset_failed(plan.generation, "late 404"));
        assert!(session.asset_failure().is_none());
    }

    #[test]
    fn test_asset_failure_keeps_ready() {
        let mut session = SessionLifecycle::new();
        let plan = session.begin(&target()).unwrap();
        session.tracking_started(plan.generation);

        assert!(session.asset_failed(plan.generation, "HTTP 404"));
        assert_eq!(*session.status(), SessionStatus::Ready);
        assert_eq!(session.asset_failure(), Some("HTTP 404"));
    }

    #[test]
    fn test_camera_must_be_released_before_restart() {
        let mut session = SessionLifecycle::new();
        let first = session.begin(&target()).unwrap();
        assert_eq!(session.begin(&target()), Err(SessionError::PreviousSessionActive));

        session.end();
        assert!(session.camera_held());
        assert_eq!(session.begin(&target()), Err(SessionError::PreviousSessionActive));

        let mut host = RecordingHost::default();
        let report = run_teardown(&mut host);
        session.teardown_complete(&report);

        let second = session.begin(&target()).unwrap();
        assert!(second.generation > first.generation);
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut session = SessionLifecycle::new();
        session.begin(&target()).unwrap();
        assert!(session.end().is_some());
        session.teardown_complete(&TeardownReport::default());
        assert_eq!(session.end(), None);
        assert_eq!(*session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_teardown_runs_every_step_in_order() {
        let mut host = RecordingHost {
            failing: vec![TeardownStep::StopTracking, TeardownStep::ReleaseCamera],
            ..Default::default()
        };
        let report = run_teardown(&mut host);

        assert_eq!(host.calls, TeardownStep::ORDER.to_vec());
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].step, TeardownStep::StopTracking);
        assert_eq!(report.failures[1].step, TeardownStep::ReleaseCamera);

        // Running again is harmless
        let again = run_teardown(&mut host);
        assert_eq!(host.calls.len(), 10);
        assert_eq!(again.failures.len(), 2);
    }

    #[test]
    fn test_target_from_menu_item() {
        let item = MenuItem {
            id: "a".to_string(),
            name: "Burger".to_string(),
            model_url: Some("".to_string()),
            compiled_target_url: Some("assets/a/targets.mind".to_string()),
            ..Default::default()
        };
        let t = PlacementTarget::from_menu_item(&item);
        assert_eq!(t.marker, Some(MarkerSource::Url("assets/a/targets.mind".to_string())));
        assert_eq!(t.asset, None);
    }
}
