//! Gesture interpreter
//!
//! Turns "contacts changed" snapshots into updates of an [`InteractionTransform`].
//! The number of active contacts selects the mode:
//! - one contact rotates (horizontal drag = yaw, vertical drag = pitch)
//! - two contacts pinch-scale
//! - anything else is ignored until the count changes again
//!
//! Every change in contact count re-baselines from the current transform and the
//! current contact positions, so baselines from one mode are never reused by another.

use glam::Vec2;

use crate::interaction::{clamp_scale, InteractionTransform};

/// Radians of rotation per pixel of drag
pub const ROTATION_SENSITIVITY: f32 = 0.01;

/// Pinch start distances below this (pixels) cannot be used as a divisor
pub const MIN_PINCH_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Idle,
    Rotate,
    Scale,
    /// Three or more contacts
    Suspended,
}

/// What a snapshot did to the interaction transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureUpdate {
    /// Contact count changed; baselines captured, transform untouched
    Began(GestureKind),
    /// All contacts lifted; baselines cleared, transform untouched
    Ended,
    Rotated(Vec2),
    Scaled(f32),
    /// Snapshot carried no usable change
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Idle,
    Rotate {
        start: Vec2,
        baseline: Vec2,
    },
    Scale {
        /// `None` until the two contacts are far enough apart to divide by
        start_distance: Option<f32>,
        baseline: f32,
    },
    Suspended {
        contacts: usize,
    },
}

impl Mode {
    fn contact_count(&self) -> usize {
        match self {
            Mode::Idle => 0,
            Mode::Rotate { .. } => 1,
            Mode::Scale { .. } => 2,
            Mode::Suspended { contacts } => *contacts,
        }
    }
}

/// Stateful interpreter; the only state it keeps are gesture baselines
#[derive(Debug, Clone)]
pub struct GestureInterpreter {
    mode: Mode,
}

impl Default for GestureInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureInterpreter {
    pub fn new() -> Self {
        Self { mode: Mode::Idle }
    }

    pub fn kind(&self) -> GestureKind {
        match self.mode {
            Mode::Idle => GestureKind::Idle,
            Mode::Rotate { .. } => GestureKind::Rotate,
            Mode::Scale { .. } => GestureKind::Scale,
            Mode::Suspended { .. } => GestureKind::Suspended,
        }
    }

    /// Feed the current set of active contact positions
    pub fn update(&mut self, contacts: &[Vec2], state: &mut InteractionTransform) -> GestureUpdate {
        if contacts.len() != self.mode.contact_count() {
            return self.rebaseline(contacts, state);
        }

        match &mut self.mode {
            Mode::Idle | Mode::Suspended { .. } => GestureUpdate::Unchanged,
            Mode::Rotate { start, baseline } => {
                let delta = contacts[0] - *start;
                let rotation = Vec2::new(
                    baseline.x + delta.y * ROTATION_SENSITIVITY,
                    baseline.y + delta.x * ROTATION_SENSITIVITY,
                );
                if !rotation.is_finite() || rotation == state.user_rotation {
                    return GestureUpdate::Unchanged;
                }
                state.user_rotation = rotation;
                GestureUpdate::Rotated(rotation)
            }
            Mode::Scale { start_distance, baseline } => {
                let distance = contacts[0].distance(contacts[1]);
                let Some(d0) = *start_distance else {
                    if distance >= MIN_PINCH_DISTANCE {
                        *start_distance = Some(distance);
                        *baseline = state.user_scale;
                    }
                    return GestureUpdate::Unchanged;
                };
                let scale = clamp_scale(*baseline * (distance / d0));
                if !scale.is_finite() || scale == state.user_scale {
                    return GestureUpdate::Unchanged;
                }
                state.user_scale = scale;
                GestureUpdate::Scaled(scale)
            }
        }
    }

    /// Drop all baselines without touching the transform
    pub fn cancel(&mut self) {
        self.mode = Mode::Idle;
    }

    /// Reset the transform to rest and drop baselines in one step.
    ///
    /// Contacts still down are re-baselined on the next snapshot, so the object
    /// does not jump back to its pre-reset pose mid-drag.
    pub fn reset(&mut self, state: &mut InteractionTransform) {
        state.reset();
        self.mode = Mode::Idle;
    }

    fn rebaseline(&mut self, contacts: &[Vec2], state: &InteractionTransform) -> GestureUpdate {
        if contacts.is_empty() {
            self.mode = Mode::Idle;
            return GestureUpdate::Ended;
        }

        self.mode = match contacts.len() {
            1 => Mode::Rotate {
                start: contacts[0],
                baseline: state.user_rotation,
            },
            2 => {
                let distance = contacts[0].distance(contacts[1]);
                Mode::Scale {
                    start_distance: (distance >= MIN_PINCH_DISTANCE).then_some(distance),
                    baseline: state.user_scale,
                }
            }
            n => Mode::Suspended { contacts: n },
        };
        GestureUpdate::Began(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinch(distance: f32) -> [Vec2; 2] {
        [Vec2::new(200.0, 300.0), Vec2::new(200.0 + distance, 300.0)]
    }

    #[test]
    fn test_single_contact_drag_rotates() {
        let mut state = InteractionTransform::default();
        let mut gestures = GestureInterpreter::new();

        assert_eq!(
            gestures.update(&[Vec2::new(50.0, 80.0)], &mut state),
            GestureUpdate::Began(GestureKind::Rotate)
        );
        gestures.update(&[Vec2::new(150.0, 80.0)], &mut state);

        assert!((state.user_rotation.y - 1.0).abs() < 1e-6);
        assert_eq!(state.user_rotation.x, 0.0);
    }

    #[test]
    fn test_vertical_drag_pitches_from_baseline() {
        let mut state = InteractionTransform {
            user_scale: 1.0,
            user_rotation: Vec2::new(0.2, 0.5),
        };
        let mut gestures = GestureInterpreter::new();

        gestures.update(&[Vec2::new(10.0, 10.0)], &mut state);
        gestures.update(&[Vec2::new(10.0, 40.0)], &mut state);
        gestures.update(&[Vec2::new(10.0, 60.0)], &mut state);

        assert!((state.user_rotation.x - 0.7).abs() < 1e-6);
        assert!((state.user_rotation.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_pinch_scales_from_start_distance() {
        let mut state = InteractionTransform::default();
        let mut gestures = GestureInterpreter::new();

        gestures.update(&pinch(100.0), &mut state);
        gestures.update(&pinch(180.0), &mut state);
        gestures.update(&pinch(250.0), &mut state);

        assert!((state.user_scale - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_pinch_ignores_intermediate_samples() {
        let samples = [130.0, 20.0, 400.0, 90.0, 160.0];
        let mut state = InteractionTransform {
            user_scale: 0.8,
            user_rotation: Vec2::ZERO,
        };
        let mut gestures = GestureInterpreter::new();

        gestures.update(&pinch(80.0), &mut state);
        for d in samples {
            gestures.update(&pinch(d), &mut state);
        }

        let expected = clamp_scale(0.8 * (160.0 / 80.0));
        assert!((state.user_scale - expected).abs() < 1e-6);
    }

    #[test]
    fn test_pinch_clamps() {
        let mut state = InteractionTransform::default();
        let mut gestures = GestureInterpreter::new();

        gestures.update(&pinch(100.0), &mut state);
        gestures.update(&pinch(1000.0), &mut state);
        assert_eq!(state.user_scale, 3.0);

        gestures.update(&pinch(1.0), &mut state);
        assert_eq!(state.user_scale, 0.1);
    }

    #[test]
    fn test_count_change_rebaselines() {
        let mut state = InteractionTransform::default();
        let mut gestures = GestureInterpreter::new();

        // Rotate a bit with one finger
        gestures.update(&[Vec2::new(0.0, 0.0)], &mut state);
        gestures.update(&[Vec2::new(50.0, 0.0)], &mut state);
        let rotated = state.user_rotation;

        // Second finger lands: scale mode, nothing moves yet
        let update = gestures.update(&[Vec2::new(50.0, 0.0), Vec2::new(150.0, 0.0)], &mut state);
        assert_eq!(update, GestureUpdate::Began(GestureKind::Scale));
        assert_eq!(state.user_rotation, rotated);
        assert_eq!(state.user_scale, 1.0);

        gestures.update(&[Vec2::new(50.0, 0.0), Vec2::new(250.0, 0.0)], &mut state);
        assert!((state.user_scale - 2.0).abs() < 1e-6);
        assert_eq!(state.user_rotation, rotated);

        // Third finger suspends
        let three = [Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)];
        assert_eq!(gestures.update(&three, &mut state), GestureUpdate::Began(GestureKind::Suspended));
        assert_eq!(gestures.update(&three, &mut state), GestureUpdate::Unchanged);

        // Back to one finger: the remaining contact becomes the new rotation start
        gestures.update(&[Vec2::new(300.0, 300.0)], &mut state);
        assert_eq!(state.user_rotation, rotated);
        gestures.update(&[Vec2::new(310.0, 300.0)], &mut state);
        assert!((state.user_rotation.y - (rotated.y + 0.1)).abs() < 1e-6);
        assert!((state.user_scale - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_lift_clears_baselines_without_snapping() {
        let mut state = InteractionTransform::default();
        let mut gestures = GestureInterpreter::new();

        gestures.update(&pinch(100.0), &mut state);
        gestures.update(&pinch(150.0), &mut state);
        assert_eq!(gestures.update(&[], &mut state), GestureUpdate::Ended);
        assert_eq!(gestures.kind(), GestureKind::Idle);
        assert!((state.user_scale - 1.5).abs() < 1e-6);

        // A new pinch starts from the scale we ended at
        gestures.update(&pinch(100.0), &mut state);
        gestures.update(&pinch(200.0), &mut state);
        assert!((state.user_scale - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_coincident_pinch_defers_baseline() {
        let mut state = InteractionTransform::default();
        let mut gestures = GestureInterpreter::new();

        gestures.update(&[Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0)], &mut state);
        assert_eq!(gestures.update(&pinch(40.0), &mut state), GestureUpdate::Unchanged);
        gestures.update(&pinch(80.0), &mut state);
        assert!((state.user_scale - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_mid_drag() {
        let mut state = InteractionTransform::default();
        let mut gestures = GestureInterpreter::new();

        gestures.update(&[Vec2::new(0.0, 0.0)], &mut state);
        gestures.update(&[Vec2::new(100.0, 0.0)], &mut state);
        gestures.reset(&mut state);
        assert!(state.is_at_rest());

        // Finger still down: next snapshot re-baselines, no jump back to 1.0 rad
        gestures.update(&[Vec2::new(100.0, 0.0)], &mut state);
        assert!(state.is_at_rest());
        gestures.update(&[Vec2::new(120.0, 0.0)], &mut state);
        assert!((state.user_rotation.y - 0.2).abs() < 1e-6);
    }
}
