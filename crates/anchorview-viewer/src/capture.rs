//! Thumbnail capture
//!
//! A capture is taken automatically a short while after the asset is placed
//! (so it has been drawn at least once) and on request from the page. The frame
//! is PNG-encoded into a data URL and dispatched on `window` as an
//! `anchorview-capture` event.

use std::io::Cursor;
use std::time::Duration;

use anchorview_scene::ModelPlaced;
use base64::Engine;
use bevy::prelude::*;
use bevy::render::view::screenshot::{Screenshot, ScreenshotCaptured};
use thiserror::Error;

/// Settle time between placement and the automatic capture
pub const CAPTURE_DELAY: Duration = Duration::from_millis(100);

/// How long a screenshot may stay undelivered before further captures go ahead
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(2);

/// DOM event carrying the data URL in `detail`
pub const CAPTURE_EVENT: &str = "anchorview-capture";

pub struct CapturePlugin;

impl Plugin for CapturePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CaptureState>()
            .init_resource::<LastCapture>()
            .add_systems(Update, (schedule_after_placement, run_captures).chain());
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("frame conversion failed: {0}")]
    Convert(String),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Pending capture work
#[derive(Resource, Default)]
pub struct CaptureState {
    delay: Option<Timer>,
    requested: bool,
    /// Time spent waiting on the screenshot that is currently out
    in_flight: Option<Duration>,
}

impl CaptureState {
    /// Capture on the next frame
    pub fn request(&mut self) {
        self.requested = true;
    }

    /// Capture once `delay` has elapsed
    pub fn schedule(&mut self, delay: Duration) {
        self.delay = Some(Timer::new(delay, TimerMode::Once));
    }

    pub fn is_pending(&self) -> bool {
        self.requested || self.delay.is_some()
    }

    /// Advance the delay; true when a capture should be taken now
    fn due(&mut self, delta: Duration) -> bool {
        if let Some(timer) = self.delay.as_mut() {
            if timer.tick(delta).is_finished() {
                self.delay = None;
                self.requested = true;
            }
        }
        if let Some(waited) = self.in_flight.as_mut() {
            *waited += delta;
            if *waited < CAPTURE_TIMEOUT {
                return false;
            }
            tracing::warn!(waited = ?*waited, "screenshot was never delivered, giving up on it");
            self.in_flight = None;
        }
        if self.requested {
            self.requested = false;
            return true;
        }
        false
    }

    fn begin(&mut self) {
        self.in_flight = Some(Duration::ZERO);
    }

    fn finish(&mut self) {
        self.in_flight = None;
    }
}

/// Most recent capture, also kept for the page to poll
#[derive(Resource, Default)]
pub struct LastCapture(pub Option<String>);

pub fn encode_png_data_url(frame: &image::DynamicImage) -> Result<String, CaptureError> {
    let mut bytes = Vec::new();
    frame.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&bytes)
    ))
}

fn schedule_after_placement(mut placed: MessageReader<ModelPlaced>, mut state: ResMut<CaptureState>) {
    if placed.read().count() > 0 {
        state.schedule(CAPTURE_DELAY);
    }
}

fn run_captures(mut commands: Commands, mut state: ResMut<CaptureState>, time: Res<Time>) {
    if !state.due(time.delta()) {
        return;
    }
    state.begin();
    commands.spawn(Screenshot::primary_window()).observe(deliver_capture);
}

fn deliver_capture(
    captured: On<ScreenshotCaptured>,
    mut state: ResMut<CaptureState>,
    mut last: ResMut<LastCapture>,
) {
    state.finish();

    let encoded = captured
        .image
        .clone()
        .try_into_dynamic()
        .map_err(|e| CaptureError::Convert(e.to_string()))
        .and_then(|frame| encode_png_data_url(&frame));

    match encoded {
        Ok(data_url) => {
            tracing::info!(bytes = data_url.len(), "captured preview frame");
            dispatch(&data_url);
            last.0 = Some(data_url);
        }
        Err(e) => tracing::error!("Capture failed: {}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn dispatch(data_url: &str) {
    use wasm_bindgen::JsValue;

    let Some(window) = web_sys::window() else {
        return;
    };
    let init = web_sys::CustomEventInit::new();
    init.set_detail(&JsValue::from_str(data_url));
    match web_sys::CustomEvent::new_with_event_init_dict(CAPTURE_EVENT, &init) {
        Ok(event) => {
            if let Err(e) = window.dispatch_event(&event) {
                tracing::error!("Failed to dispatch capture event: {:?}", e);
            }
        }
        Err(e) => tracing::error!("Failed to create capture event: {:?}", e),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn dispatch(_data_url: &str) {}
