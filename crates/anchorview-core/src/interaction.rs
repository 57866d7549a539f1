//! User-owned interaction transform and its composition with the placement
//!
//! The scene graph for placed content is layered as
//! `anchor -> frame wrapper -> interaction node -> model node`. The interaction
//! node carries [`InteractionTransform`], the model node carries the
//! [`Placement`], so user rotation spins the already-normalised object about the
//! frame's own axes.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::placement::Placement;

pub const MIN_USER_SCALE: f32 = 0.1;
pub const MAX_USER_SCALE: f32 = 3.0;

/// Step used by the zoom buttons
pub const SCALE_STEP: f32 = 0.1;

/// Ephemeral per-session transform driven by gestures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionTransform {
    /// Uniform scale in `[MIN_USER_SCALE, MAX_USER_SCALE]`
    pub user_scale: f32,
    /// Pitch (x) and yaw (y) in radians; roll is not user adjustable
    pub user_rotation: Vec2,
}

impl Default for InteractionTransform {
    fn default() -> Self {
        Self::REST
    }
}

impl InteractionTransform {
    pub const REST: Self = Self {
        user_scale: 1.0,
        user_rotation: Vec2::ZERO,
    };

    pub fn reset(&mut self) {
        *self = Self::REST;
    }

    pub fn is_at_rest(&self) -> bool {
        *self == Self::REST
    }

    /// Set the scale, clamped. Non-finite input leaves the scale unchanged.
    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_finite() {
            self.user_scale = clamp_scale(scale);
        }
    }

    pub fn nudge_scale(&mut self, delta: f32) {
        self.set_scale(self.user_scale + delta);
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.user_rotation.x, self.user_rotation.y, 0.0)
    }

    pub fn to_similarity(&self) -> Similarity {
        Similarity {
            translation: Vec3::ZERO,
            rotation: self.rotation(),
            scale: self.user_scale,
        }
    }
}

pub fn clamp_scale(scale: f32) -> f32 {
    scale.clamp(MIN_USER_SCALE, MAX_USER_SCALE)
}

/// Uniform-scale rigid transform, the only kind the layers ever carry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl Similarity {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: 1.0,
    };

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.translation)
    }
}

impl From<Placement> for Similarity {
    fn from(p: Placement) -> Self {
        Self {
            translation: p.position,
            rotation: p.rotation,
            scale: p.scale,
        }
    }
}

/// Per-frame transforms for the two content layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposedTransform {
    /// Outer node: user rotation and scale
    pub interaction: Similarity,
    /// Inner node: base transform and author override
    pub model: Similarity,
}

impl ComposedTransform {
    /// Model-to-frame matrix of the two layers combined
    pub fn to_mat4(&self) -> Mat4 {
        self.interaction.to_mat4() * self.model.to_mat4()
    }

    /// Effective uniform scale of the model in the frame
    pub fn total_scale(&self) -> f32 {
        self.interaction.scale * self.model.scale
    }
}

pub fn compose(placement: &Placement, interaction: &InteractionTransform) -> ComposedTransform {
    ComposedTransform {
        interaction: interaction.to_similarity(),
        model: (*placement).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Axes, ModelConfig};
    use crate::placement::{compose_placement, compute_base_transform, BoundingVolume};

    #[test]
    fn test_reset_is_idempotent() {
        let mut t = InteractionTransform {
            user_scale: 2.2,
            user_rotation: Vec2::new(0.3, -1.0),
        };
        t.reset();
        let once = t;
        t.reset();
        assert_eq!(t, once);
        assert!(t.is_at_rest());
    }

    #[test]
    fn test_set_scale_clamps() {
        let mut t = InteractionTransform::default();
        t.set_scale(10.0);
        assert_eq!(t.user_scale, MAX_USER_SCALE);
        t.set_scale(0.0);
        assert_eq!(t.user_scale, MIN_USER_SCALE);
        t.set_scale(f32::NAN);
        assert_eq!(t.user_scale, MIN_USER_SCALE);
        t.nudge_scale(SCALE_STEP);
        assert!((t.user_scale - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_rest_interaction_has_no_drift() {
        let volume = BoundingVolume::new(Vec3::new(-0.2, 0.0, -0.1), Vec3::new(0.6, 0.3, 0.1));
        let base = compute_base_transform(&volume);
        let config = ModelConfig {
            scale: 1.3,
            position: Axes::new(0.0, 0.05, 0.0),
            rotation: Axes::new(0.0, 0.7, 0.0),
        };
        let placement = compose_placement(&base, Some(&config));

        let composed = compose(&placement, &InteractionTransform::REST);
        assert_eq!(composed.interaction, Similarity::IDENTITY);
        assert_eq!(composed.to_mat4(), placement.to_mat4());
        assert_eq!(composed.total_scale(), placement.scale);
    }

    #[test]
    fn test_user_rotation_spins_about_frame_origin() {
        let base = compute_base_transform(&BoundingVolume::from_size(Vec3::new(1.0, 2.0, 1.0)));
        let placement = compose_placement(&base, None);
        let interaction = InteractionTransform {
            user_scale: 2.0,
            user_rotation: Vec2::new(0.0, std::f32::consts::PI),
        };
        let composed = compose(&placement, &interaction);

        // The centred model stays centred whatever the user does
        let center = composed.to_mat4().transform_point3(Vec3::ZERO);
        assert!(center.length() < 1e-5);
        assert!((composed.total_scale() - 0.5).abs() < 1e-6);
    }
}
