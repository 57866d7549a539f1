//! Binding to the browser tracking library
//!
//! The tracker script wraps the external marker-tracking library behind a
//! small class:
//!
//! ```text
//! new AnchorTracker(container, markerUrl)
//! tracker.start(): Promise<void>        acquires the camera, starts tracking
//! tracker.stop()
//! tracker.onTargetFound / onTargetLost  callbacks
//! tracker.anchorMatrix(): Float32Array? column-major anchor pose in camera space
//! tracker.projection(): Float32Array?   [fovY (rad), near, far]
//! tracker.video: HTMLVideoElement?
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anchorview_core::{Generation, ResolvedMarker, SessionError};
use anchorview_scene::{TrackingBackend, TrackingEvent};
use bevy::math::Mat4;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::media;

/// Element the tracker renders its video surface into
pub const CONTAINER_ID: &str = "anchorview-ar";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = AnchorTracker)]
    type JsTracker;

    #[wasm_bindgen(constructor, js_class = "AnchorTracker", catch)]
    fn new(container: &web_sys::HtmlElement, marker_url: &str) -> Result<JsTracker, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn start(this: &JsTracker) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn stop(this: &JsTracker) -> Result<(), JsValue>;

    #[wasm_bindgen(method, setter = onTargetFound)]
    fn set_on_target_found(this: &JsTracker, callback: &Closure<dyn FnMut()>);

    #[wasm_bindgen(method, setter = onTargetLost)]
    fn set_on_target_lost(this: &JsTracker, callback: &Closure<dyn FnMut()>);

    #[wasm_bindgen(method, js_name = anchorMatrix)]
    fn anchor_matrix(this: &JsTracker) -> Option<Vec<f32>>;

    #[wasm_bindgen(method)]
    fn projection(this: &JsTracker) -> Option<Vec<f32>>;

    #[wasm_bindgen(method, getter)]
    fn video(this: &JsTracker) -> Option<web_sys::HtmlVideoElement>;
}

type EventQueue = Rc<RefCell<VecDeque<TrackingEvent>>>;

/// One running tracker and everything that must be released with it
struct ActiveTracker {
    tracker: JsTracker,
    generation: Generation,
    /// Object URL created for an inline marker artifact
    object_url: Option<String>,
    video: Option<web_sys::HtmlVideoElement>,
    _on_found: Closure<dyn FnMut()>,
    _on_lost: Closure<dyn FnMut()>,
}

/// [`TrackingBackend`] over the page's `AnchorTracker`
pub struct WebTracker {
    events: EventQueue,
    active: Option<ActiveTracker>,
    tracked: bool,
    projection_sent: bool,
}

impl Default for WebTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl WebTracker {
    pub fn new() -> Self {
        Self {
            events: Rc::default(),
            active: None,
            tracked: false,
            projection_sent: false,
        }
    }

    fn push(events: &EventQueue, event: TrackingEvent) {
        events.borrow_mut().push_back(event);
    }
}

fn container() -> Result<web_sys::HtmlElement, SessionError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| SessionError::CapabilityUnavailable("no document".to_string()))?;
    if let Some(el) = document.get_element_by_id(CONTAINER_ID) {
        if let Ok(el) = el.dyn_into::<web_sys::HtmlElement>() {
            return Ok(el);
        }
    }
    document
        .body()
        .ok_or_else(|| SessionError::CapabilityUnavailable("no document body".to_string()))
}

/// Turn the marker into something the tracker can fetch
fn marker_url(marker: &ResolvedMarker) -> Result<(String, Option<String>), SessionError> {
    match marker {
        ResolvedMarker::Url(url) => Ok((url.clone(), None)),
        ResolvedMarker::Artifact(artifact) => {
            let bytes = js_sys::Uint8Array::from(artifact.as_bytes());
            let parts = js_sys::Array::of1(&bytes);
            let blob = web_sys::Blob::new_with_u8_array_sequence(&parts)
                .map_err(|e| SessionError::InvalidMarker(format!("{e:?}")))?;
            let url = web_sys::Url::create_object_url_with_blob(&blob)
                .map_err(|e| SessionError::InvalidMarker(format!("{e:?}")))?;
            Ok((url.clone(), Some(url)))
        }
        ResolvedMarker::Fixed => Err(SessionError::MissingArData("marker artifact")),
    }
}

impl TrackingBackend for WebTracker {
    fn name(&self) -> &str {
        "web"
    }

    fn start(&mut self, marker: &ResolvedMarker, generation: Generation) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::PreviousSessionActive);
        }

        let container = container()?;
        let (url, object_url) = marker_url(marker)?;

        let tracker = match JsTracker::new(&container, &url) {
            Ok(tracker) => tracker,
            Err(e) => {
                if let Some(object_url) = &object_url {
                    let _ = web_sys::Url::revoke_object_url(object_url);
                }
                return Err(SessionError::Acquisition(format!("{e:?}")));
            }
        };

        let found_queue = self.events.clone();
        let on_found = Closure::wrap(Box::new(move || {
            Self::push(&found_queue, TrackingEvent::Found { generation });
        }) as Box<dyn FnMut()>);
        let lost_queue = self.events.clone();
        let on_lost = Closure::wrap(Box::new(move || {
            Self::push(&lost_queue, TrackingEvent::Lost { generation });
        }) as Box<dyn FnMut()>);
        tracker.set_on_target_found(&on_found);
        tracker.set_on_target_lost(&on_lost);

        self.tracked = false;
        self.projection_sent = false;
        // Owned before starting, so teardown can reach the tracker even if start throws
        let active = self.active.insert(ActiveTracker {
            tracker,
            generation,
            object_url,
            video: None,
            _on_found: on_found,
            _on_lost: on_lost,
        });

        let promise = match active.tracker.start() {
            Ok(promise) => promise,
            Err(e) => {
                if let Err(stop) = active.tracker.stop() {
                    tracing::debug!("stopping a tracker that failed to start: {:?}", stop);
                }
                if let Some(url) = active.object_url.take() {
                    let _ = web_sys::Url::revoke_object_url(&url);
                }
                return Err(SessionError::Acquisition(format!("{e:?}")));
            }
        };
        let start_queue = self.events.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let event = match wasm_bindgen_futures::JsFuture::from(promise).await {
                Ok(_) => TrackingEvent::Started { generation },
                Err(e) => TrackingEvent::Failed {
                    generation,
                    reason: e.as_string().unwrap_or_else(|| format!("{e:?}")),
                },
            };
            Self::push(&start_queue, event);
        });
        Ok(())
    }

    fn poll(&mut self) -> Vec<TrackingEvent> {
        let mut events: Vec<_> = self.events.borrow_mut().drain(..).collect();

        for event in &events {
            match event {
                TrackingEvent::Found { .. } => self.tracked = true,
                TrackingEvent::Lost { .. } => self.tracked = false,
                _ => {}
            }
        }

        if let Some(active) = self.active.as_mut() {
            if active.video.is_none() {
                active.video = active.tracker.video();
            }
            if !self.projection_sent {
                if let Some([fov_y, near, far]) = active.tracker.projection().and_then(|p| <[f32; 3]>::try_from(p).ok()) {
                    self.projection_sent = true;
                    events.push(TrackingEvent::Projection {
                        generation: active.generation,
                        fov_y,
                        near,
                        far,
                    });
                }
            }
            if self.tracked {
                if let Some(cols) = active.tracker.anchor_matrix().and_then(|m| <[f32; 16]>::try_from(m).ok()) {
                    events.push(TrackingEvent::AnchorPose {
                        generation: active.generation,
                        pose: Mat4::from_cols_array(&cols),
                    });
                }
            }
        }
        events
    }

    fn stop(&mut self) -> Result<(), String> {
        self.tracked = false;
        match self.active.as_ref() {
            Some(active) => active.tracker.stop().map_err(|e| format!("{e:?}")),
            None => Ok(()),
        }
    }

    fn release_camera(&mut self) -> Result<(), String> {
        let video = self
            .active
            .as_ref()
            .and_then(|a| a.video.clone().or_else(|| a.tracker.video()));
        match video {
            Some(video) => media::stop_video_tracks(&video),
            None => media::stop_page_video_tracks(),
        }
    }

    fn remove_video_surface(&mut self) -> Result<(), String> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };
        self.events.borrow_mut().clear();
        if let Some(url) = &active.object_url {
            let _ = web_sys::Url::revoke_object_url(url);
        }
        match active.video.or_else(|| active.tracker.video()) {
            Some(video) => {
                video.remove();
                Ok(())
            }
            None => media::remove_page_videos(),
        }
    }
}
