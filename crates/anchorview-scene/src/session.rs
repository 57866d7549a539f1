//! Session driver
//!
//! Bridges [`SessionLifecycle`](anchorview_core::SessionLifecycle) to the ECS:
//! builds the anchor subgraph, hands the marker to the injected tracking
//! backend, routes its events through the generation guard, and runs the
//! ordered teardown when the session ends.

use anchorview_core::placement::marker_frame_rotation;
use anchorview_core::{run_teardown, SessionError, SessionResources};
use bevy::prelude::*;

use crate::capability::{update_capability_status, CapabilityReady, CapabilityStatus, TrackingCapability, TrackingEvent};
use crate::types::{
    AnchorNode, AnchorRig, ArSession, EndSession, InteractionNode, MarkerFrame, ModelRequest, PlacedModel,
    SceneHostConfig, SessionCamera, SessionEnded, StartSession, UserInteraction,
};

pub struct SessionDriverPlugin;

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionSet {
    /// Start/end requests, tracking start and tracking events
    Drive,
}

impl Plugin for SessionDriverPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ArSession>()
            .init_resource::<CapabilityStatus>()
            .init_resource::<SceneHostConfig>()
            .init_resource::<UserInteraction>()
            .add_message::<StartSession>()
            .add_message::<EndSession>()
            .add_message::<SessionEnded>()
            .add_message::<CapabilityReady>()
            .add_message::<crate::types::ModelPlaced>()
            .add_systems(
                Update,
                (
                    update_capability_status,
                    handle_end_requests,
                    handle_start_requests,
                    start_tracking,
                    poll_tracking,
                )
                    .chain()
                    .in_set(SessionSet::Drive),
            );
    }
}

fn handle_start_requests(
    mut commands: Commands,
    mut requests: MessageReader<StartSession>,
    mut session: ResMut<ArSession>,
    mut interaction: ResMut<UserInteraction>,
    config: Res<SceneHostConfig>,
) {
    for request in requests.read() {
        let plan = match session.lifecycle.begin(&request.target) {
            Ok(plan) => plan,
            Err(SessionError::PreviousSessionActive) => {
                tracing::warn!("start requested while a session is still active, ignoring");
                continue;
            }
            // Already recorded as the error state
            Err(_) => continue,
        };

        interaction.reset();

        let frame_rotation = if config.marker_frame {
            marker_frame_rotation()
        } else {
            Quat::IDENTITY
        };

        let anchor = commands
            .spawn((
                Transform::default(),
                // Tracking hosts reveal the anchor when the marker is found
                if config.marker_frame {
                    Visibility::Hidden
                } else {
                    Visibility::Inherited
                },
                AnchorNode {
                    generation: plan.generation,
                },
            ))
            .id();
        let frame = commands
            .spawn((Transform::from_rotation(frame_rotation), Visibility::Inherited, MarkerFrame))
            .id();
        let interaction_node = commands
            .spawn((Transform::default(), Visibility::Inherited, InteractionNode))
            .id();
        let model = commands
            .spawn((
                Transform::default(),
                Visibility::Hidden,
                PlacedModel {
                    generation: plan.generation,
                    config: plan.config,
                    base: None,
                },
                ModelRequest {
                    url: plan.asset.clone(),
                },
            ))
            .id();

        commands.entity(anchor).add_child(frame);
        commands.entity(frame).add_child(interaction_node);
        commands.entity(interaction_node).add_child(model);

        session.rig = Some(AnchorRig {
            anchor,
            frame,
            interaction: interaction_node,
            model,
        });
        session.plan = Some(plan);
        session.awaiting_start = true;
    }
}

/// Hand the marker to the backend once the capability is available
fn start_tracking(
    mut session: ResMut<ArSession>,
    status: Res<CapabilityStatus>,
    backend: Option<NonSendMut<TrackingCapability>>,
    mut cameras: Query<&mut Camera, With<SessionCamera>>,
) {
    if !session.awaiting_start {
        return;
    }
    let Some(plan) = session.plan.clone() else {
        session.awaiting_start = false;
        return;
    };

    match (&*status, backend) {
        (CapabilityStatus::Failed(reason), _) => {
            session.awaiting_start = false;
            session
                .lifecycle
                .acquisition_failed(plan.generation, SessionError::CapabilityUnavailable(reason.clone()));
        }
        (CapabilityStatus::Ready, Some(mut backend)) => {
            session.awaiting_start = false;
            tracing::info!(backend = backend.0.name(), generation = %plan.generation, "starting tracking");
            match backend.0.start(&plan.marker, plan.generation) {
                Ok(()) => {
                    for mut camera in cameras.iter_mut() {
                        camera.is_active = true;
                    }
                }
                Err(e) => {
                    session.lifecycle.acquisition_failed(plan.generation, e);
                }
            }
        }
        // Capability still loading
        _ => {}
    }
}

fn poll_tracking(
    mut session: ResMut<ArSession>,
    backend: Option<NonSendMut<TrackingCapability>>,
    mut anchors: Query<(&AnchorNode, &mut Transform, &mut Visibility)>,
    mut projections: Query<&mut Projection, With<SessionCamera>>,
    config: Res<SceneHostConfig>,
) {
    let Some(mut backend) = backend else {
        return;
    };

    for event in backend.0.poll() {
        let generation = event.generation();
        if !session.accepts(generation) {
            tracing::debug!(%generation, ?event, "dropping stale tracking event");
            continue;
        }

        match event {
            TrackingEvent::Started { generation } => {
                session.lifecycle.tracking_started(generation);
            }
            TrackingEvent::Failed { generation, reason } => {
                session
                    .lifecycle
                    .acquisition_failed(generation, SessionError::Acquisition(reason));
            }
            TrackingEvent::Found { generation } => {
                if session.lifecycle.set_tracked(generation, true) && config.marker_frame {
                    reveal_anchor(&mut anchors, generation, true);
                }
            }
            TrackingEvent::Lost { generation } => {
                if session.lifecycle.set_tracked(generation, false) && config.marker_frame {
                    reveal_anchor(&mut anchors, generation, false);
                }
            }
            TrackingEvent::AnchorPose { generation, pose } => {
                for (anchor, mut transform, _) in anchors.iter_mut() {
                    if anchor.generation == generation {
                        *transform = Transform::from_matrix(pose);
                    }
                }
            }
            TrackingEvent::Projection { fov_y, near, far, .. } => {
                for mut projection in projections.iter_mut() {
                    if let Projection::Perspective(perspective) = &mut *projection {
                        perspective.fov = fov_y;
                        perspective.near = near;
                        perspective.far = far;
                    }
                }
            }
        }
    }
}

fn reveal_anchor(
    anchors: &mut Query<(&AnchorNode, &mut Transform, &mut Visibility)>,
    generation: anchorview_core::Generation,
    visible: bool,
) {
    for (anchor, _, mut visibility) in anchors.iter_mut() {
        if anchor.generation == generation {
            *visibility = if visible { Visibility::Inherited } else { Visibility::Hidden };
        }
    }
}

fn handle_end_requests(
    mut commands: Commands,
    mut requests: MessageReader<EndSession>,
    mut session: ResMut<ArSession>,
    mut backend: Option<NonSendMut<TrackingCapability>>,
    mut cameras: Query<&mut Camera, With<SessionCamera>>,
    mut interaction: ResMut<UserInteraction>,
    mut ended: MessageWriter<SessionEnded>,
) {
    if requests.read().count() == 0 {
        return;
    }

    let Some(generation) = session.lifecycle.end() else {
        tracing::debug!("end requested with no active session");
        return;
    };

    let mut host = HostResources {
        backend: backend.as_deref_mut(),
        commands: &mut commands,
        cameras: cameras.iter_mut().collect(),
        anchor: session.rig.map(|rig| rig.anchor),
    };
    let report = run_teardown(&mut host);
    session.lifecycle.teardown_complete(&report);
    session.rig = None;
    session.plan = None;
    session.awaiting_start = false;
    interaction.reset();

    tracing::info!(%generation, clean = report.is_clean(), "session torn down");
    ended.write(SessionEnded { generation });
}

/// What this app owns for a session, released in the fixed teardown order
struct HostResources<'a, 'w, 's> {
    backend: Option<&'a mut TrackingCapability>,
    commands: &'a mut Commands<'w, 's>,
    cameras: Vec<Mut<'a, Camera>>,
    anchor: Option<Entity>,
}

impl SessionResources for HostResources<'_, '_, '_> {
    fn stop_tracking(&mut self) -> Result<(), String> {
        match self.backend.as_mut() {
            Some(backend) => backend.0.stop(),
            None => Ok(()),
        }
    }

    fn cancel_render_loop(&mut self) -> Result<(), String> {
        for camera in self.cameras.iter_mut() {
            camera.is_active = false;
        }
        Ok(())
    }

    fn release_camera(&mut self) -> Result<(), String> {
        match self.backend.as_mut() {
            Some(backend) => backend.0.release_camera(),
            None => Ok(()),
        }
    }

    fn remove_video_surface(&mut self) -> Result<(), String> {
        match self.backend.as_mut() {
            Some(backend) => backend.0.remove_video_surface(),
            None => Ok(()),
        }
    }

    fn clear_host(&mut self) -> Result<(), String> {
        if let Some(anchor) = self.anchor.take() {
            match self.commands.get_entity(anchor) {
                Ok(mut entity) => entity.despawn(),
                Err(_) => tracing::debug!(?anchor, "anchor already despawned"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{StaticAnchorBackend, TrackingBackend};
    use anchorview_core::{Generation, MarkerSource, PlacementTarget, ResolvedMarker, SessionStatus};
    use std::sync::{Arc, Mutex};

    /// Backend that records calls and lets the test feed events
    #[derive(Clone, Default)]
    struct ScriptedBackend {
        log: Arc<Mutex<Vec<&'static str>>>,
        events: Arc<Mutex<Vec<TrackingEvent>>>,
        fail_stop: bool,
        fail_start: bool,
    }

    impl TrackingBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }
        fn start(&mut self, _marker: &ResolvedMarker, _generation: Generation) -> Result<(), SessionError> {
            self.log.lock().unwrap().push("start");
            if self.fail_start {
                Err(SessionError::Acquisition("NotAllowedError".to_string()))
            } else {
                Ok(())
            }
        }
        fn poll(&mut self) -> Vec<TrackingEvent> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
        fn stop(&mut self) -> Result<(), String> {
            self.log.lock().unwrap().push("stop");
            if self.fail_stop {
                Err("tracker already disposed".to_string())
            } else {
                Ok(())
            }
        }
        fn release_camera(&mut self) -> Result<(), String> {
            self.log.lock().unwrap().push("release_camera");
            Ok(())
        }
        fn remove_video_surface(&mut self) -> Result<(), String> {
            self.log.lock().unwrap().push("remove_video_surface");
            Ok(())
        }
    }

    fn target() -> PlacementTarget {
        PlacementTarget {
            name: "Burger".to_string(),
            marker: Some(MarkerSource::Url("assets/burger/targets.mind".to_string())),
            asset: Some("assets/burger/burger.glb".to_string()),
            config: None,
        }
    }

    fn app(backend: impl TrackingBackend + 'static) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).add_plugins(SessionDriverPlugin);
        app.insert_non_send_resource(TrackingCapability::new(backend));
        app.insert_resource(CapabilityStatus::Ready);
        app.world_mut().spawn((Camera::default(), SessionCamera));
        app
    }

    fn status(app: &App) -> SessionStatus {
        app.world().resource::<ArSession>().lifecycle.status().clone()
    }

    #[test]
    fn test_start_builds_rig_and_reaches_ready() {
        let backend = ScriptedBackend::default();
        let mut app = app(backend.clone());

        app.world_mut().write_message(StartSession { target: target() });
        app.update();
        assert_eq!(status(&app), SessionStatus::Initializing);

        let rig = app.world().resource::<ArSession>().rig.unwrap();
        assert!(app.world().get::<MarkerFrame>(rig.frame).is_some());
        assert!(app.world().get::<ModelRequest>(rig.model).is_some());
        assert_eq!(app.world().get::<Visibility>(rig.model), Some(&Visibility::Hidden));

        let generation = app.world().resource::<ArSession>().lifecycle.generation();
        backend.events.lock().unwrap().extend([
            TrackingEvent::Started { generation },
            TrackingEvent::Found { generation },
        ]);
        app.update();

        assert_eq!(status(&app), SessionStatus::Ready);
        assert!(app.world().resource::<ArSession>().lifecycle.tracked());
        assert_eq!(app.world().get::<Visibility>(rig.anchor), Some(&Visibility::Inherited));
        assert_eq!(*backend.log.lock().unwrap(), vec!["start"]);
    }

    #[test]
    fn test_missing_asset_never_initializes() {
        let backend = ScriptedBackend::default();
        let mut app = app(backend.clone());

        let mut t = target();
        t.asset = None;
        app.world_mut().write_message(StartSession { target: t });
        app.update();

        assert!(status(&app).is_error());
        assert!(app.world().resource::<ArSession>().rig.is_none());
        assert!(backend.log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_end_tears_down_in_order_and_drops_late_events() {
        let backend = ScriptedBackend {
            fail_stop: true,
            ..Default::default()
        };
        let mut app = app(backend.clone());

        app.world_mut().write_message(StartSession { target: target() });
        app.update();
        let session = app.world().resource::<ArSession>();
        let generation = session.lifecycle.generation();
        let rig = session.rig.unwrap();

        // Leave while still initializing
        app.world_mut().write_message(EndSession);
        app.update();

        assert_eq!(
            *backend.log.lock().unwrap(),
            vec!["start", "stop", "release_camera", "remove_video_surface"]
        );
        assert!(app.world().get_entity(rig.anchor).is_err());
        assert!(app.world().get_entity(rig.model).is_err());
        assert_eq!(status(&app), SessionStatus::Idle);

        let mut cameras = app.world_mut().query::<&Camera>();
        assert!(cameras.iter(app.world()).all(|c| !c.is_active));

        // The tracker resolves after the user left: nothing changes
        backend.events.lock().unwrap().push(TrackingEvent::Started { generation });
        app.update();
        assert_eq!(status(&app), SessionStatus::Idle);

        // A second end is harmless
        app.world_mut().write_message(EndSession);
        app.update();
        assert_eq!(backend.log.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_failed_start_is_still_torn_down() {
        let backend = ScriptedBackend {
            fail_start: true,
            ..Default::default()
        };
        let mut app = app(backend.clone());

        app.world_mut().write_message(StartSession { target: target() });
        app.update();
        assert!(status(&app).is_error());
        assert!(app.world().resource::<ArSession>().lifecycle.camera_held());

        app.world_mut().write_message(EndSession);
        app.update();

        assert_eq!(
            *backend.log.lock().unwrap(),
            vec!["start", "stop", "release_camera", "remove_video_surface"]
        );
        assert_eq!(status(&app), SessionStatus::Idle);
        assert!(!app.world().resource::<ArSession>().lifecycle.camera_held());
    }

    #[test]
    fn test_start_waits_for_capability() {
        let backend = ScriptedBackend::default();
        let mut app = app(backend.clone());
        app.insert_resource(CapabilityStatus::Loading);

        app.world_mut().write_message(StartSession { target: target() });
        app.update();
        assert!(backend.log.lock().unwrap().is_empty());

        app.world_mut().write_message(CapabilityReady { result: Ok(()) });
        app.update();
        assert_eq!(*backend.log.lock().unwrap(), vec!["start"]);
    }

    #[test]
    fn test_capability_failure_is_acquisition_error() {
        let mut app = app(StaticAnchorBackend::default());
        app.insert_resource(CapabilityStatus::Loading);

        app.world_mut().write_message(StartSession { target: target() });
        app.world_mut().write_message(CapabilityReady {
            result: Err("script blocked".to_string()),
        });
        app.update();

        match status(&app) {
            SessionStatus::Error(e) => assert_eq!(e.kind(), anchorview_core::ErrorKind::Acquisition),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_restart_after_end() {
        let mut app = app(StaticAnchorBackend::default());
        app.world_mut().write_message(StartSession { target: target() });
        app.update();
        app.update();
        assert_eq!(status(&app), SessionStatus::Ready);

        let first = app.world().resource::<ArSession>().lifecycle.generation();

        // Teardown runs before the new start in the same frame, so the camera is free
        app.world_mut().write_message(EndSession);
        app.world_mut().write_message(StartSession { target: target() });
        app.update();
        assert_eq!(status(&app), SessionStatus::Ready);
        assert!(app.world().resource::<ArSession>().lifecycle.generation() > first);
    }
}
