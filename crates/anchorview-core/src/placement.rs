//! Placement engine
//!
//! Derives a base transform from an asset's bounding volume so that its longest
//! dimension spans half of one marker-frame unit (the tracked image is one unit
//! wide), then layers the author's [`ModelConfig`] on top.
//!
//! Both functions are pure; hosts call them with values read off the scene graph
//! and write the result back themselves.

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::config::ModelConfig;

/// Extent the longest model dimension is normalised to, in marker-frame units
pub const TARGET_EXTENT: f32 = 0.5;

/// Largest dimensions at or below this are treated as a degenerate (point) model
pub const MIN_DIMENSION: f32 = 0.001;

/// Axis-aligned bounds in the asset's local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingVolume {
    /// An empty volume; unioning anything into it yields that thing
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Volume centred at the origin with the given full extents
    pub fn from_size(size: Vec3) -> Self {
        let half = size * 0.5;
        Self::new(-half, half)
    }

    /// Smallest volume containing every point, `None` when there are none
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut volume = Self::EMPTY;
        for p in points {
            volume.extend(p);
        }
        (!volume.is_empty()).then_some(volume)
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Self) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Extents, never negative. An empty volume has zero size.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.max - self.min).max(Vec3::ZERO)
    }

    /// Centre point, or the origin when the volume is empty or non-finite
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        let c = (self.min + self.max) * 0.5;
        if c.is_finite() {
            c
        } else {
            Vec3::ZERO
        }
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// Bounds of this volume after an affine transform (all eight corners)
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let (lo, hi) = (self.min, self.max);
        let corners = [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ];
        Self::from_points(corners.iter().map(|c| matrix.transform_point3(*c))).unwrap_or(Self::EMPTY)
    }
}

/// Automatic normalisation derived purely from geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseTransform {
    /// Uniform scale bringing the longest dimension to [`TARGET_EXTENT`]
    pub scale: f32,
    /// Unscaled offset moving the bounding-box centre onto the origin (`-center`)
    pub center_offset: Vec3,
}

/// Final transform for the model node inside the interaction wrapper
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub position: Vec3,
    pub rotation: Quat,
}

impl Placement {
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.position)
    }
}

pub fn compute_base_transform(volume: &BoundingVolume) -> BaseTransform {
    let mut divisor = volume.max_dimension();
    if !divisor.is_finite() || divisor <= MIN_DIMENSION {
        divisor = 1.0;
    }

    BaseTransform {
        scale: TARGET_EXTENT / divisor,
        center_offset: -volume.center(),
    }
}

/// Layer the author override onto the base transform.
///
/// Rotation is applied about the bounding-box centre, so the centre lands exactly
/// on `config.position` whatever the author rotation is.
pub fn compose_placement(base: &BaseTransform, config: Option<&ModelConfig>) -> Placement {
    let config = config.copied().unwrap_or(ModelConfig::IDENTITY);
    let euler = config.euler();
    let rotation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);
    let scale = base.scale * config.effective_scale();

    Placement {
        scale,
        position: rotation * (base.center_offset * scale) + config.offset(),
        rotation,
    }
}

/// Rotation of the wrapper that stands content upright on a tracked marker plane
pub fn marker_frame_rotation() -> Quat {
    Quat::from_rotation_x(std::f32::consts::FRAC_PI_2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Axes;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_scale_targets_longest_dimension() {
        for d in [0.002_f32, 0.5, 1.0, 7.25, 1200.0] {
            let base = compute_base_transform(&BoundingVolume::from_size(Vec3::new(d, d * 0.5, d * 0.25)));
            assert!(approx(base.scale, 0.5 / d), "d={d} scale={}", base.scale);
        }
    }

    #[test]
    fn test_degenerate_volume_uses_unit_divisor() {
        let point = BoundingVolume::new(Vec3::ONE, Vec3::ONE);
        assert_eq!(compute_base_transform(&point).scale, 0.5);

        let tiny = BoundingVolume::from_size(Vec3::splat(0.0005));
        assert_eq!(compute_base_transform(&tiny).scale, 0.5);

        let edge = BoundingVolume::from_size(Vec3::new(MIN_DIMENSION, 0.0, 0.0));
        assert_eq!(compute_base_transform(&edge).scale, 0.5);

        let infinite = BoundingVolume::new(Vec3::ZERO, Vec3::new(f32::INFINITY, 1.0, 1.0));
        assert_eq!(compute_base_transform(&infinite).scale, 0.5);

        let nan = BoundingVolume::new(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(compute_base_transform(&nan).scale, 0.5);

        assert_eq!(compute_base_transform(&BoundingVolume::EMPTY).scale, 0.5);
    }

    #[test]
    fn test_wide_model_scenario() {
        let base = compute_base_transform(&BoundingVolume::from_size(Vec3::new(2.0, 1.0, 1.0)));
        assert_eq!(base.scale, 0.25);

        let placement = compose_placement(&base, None);
        assert_eq!(placement.scale, 0.25);
        assert_eq!(placement.position, Vec3::ZERO);
        assert_eq!(placement.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_absent_config_equals_identity_config() {
        let volume = BoundingVolume::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 0.5, 2.5));
        let base = compute_base_transform(&volume);
        assert_eq!(
            compose_placement(&base, None),
            compose_placement(&base, Some(&ModelConfig::IDENTITY))
        );
    }

    #[test]
    fn test_center_lands_on_origin_before_offset() {
        let volume = BoundingVolume::new(Vec3::new(2.0, 4.0, -6.0), Vec3::new(4.0, 5.0, -5.0));
        let base = compute_base_transform(&volume);

        let placement = compose_placement(&base, None);
        let center = placement.to_mat4().transform_point3(volume.center());
        assert!(center.length() < 1e-5, "center mapped to {center:?}");

        let config = ModelConfig {
            scale: 2.0,
            position: Axes::new(0.1, 0.2, 0.3),
            rotation: Axes::new(0.4, 1.1, -0.3),
        };
        let placement = compose_placement(&base, Some(&config));
        let center = placement.to_mat4().transform_point3(volume.center());
        assert!((center - Vec3::new(0.1, 0.2, 0.3)).length() < 1e-5, "center mapped to {center:?}");
        assert!(approx(placement.scale, base.scale * 2.0));
    }

    #[test]
    fn test_unrotated_config_matches_plain_offset() {
        let volume = BoundingVolume::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 1.0));
        let base = compute_base_transform(&volume);
        let config = ModelConfig {
            scale: 1.0,
            position: Axes::new(0.0, 0.1, 0.0),
            rotation: Axes::ZERO,
        };
        let placement = compose_placement(&base, Some(&config));
        let expected = -volume.center() * base.scale + Vec3::new(0.0, 0.1, 0.0);
        assert!((placement.position - expected).length() < 1e-6);
    }

    #[test]
    fn test_scale_is_always_finite_positive() {
        let volumes = [
            BoundingVolume::EMPTY,
            BoundingVolume::from_size(Vec3::ZERO),
            BoundingVolume::from_size(Vec3::splat(1e-9)),
            BoundingVolume::from_size(Vec3::splat(1e9)),
        ];
        let configs = [None, Some(ModelConfig { scale: -3.0, ..ModelConfig::IDENTITY })];
        for volume in &volumes {
            let base = compute_base_transform(volume);
            for config in &configs {
                let placement = compose_placement(&base, config.as_ref());
                assert!(placement.scale.is_finite() && placement.scale > 0.0);
                assert!(placement.position.is_finite());
            }
        }
    }

    #[test]
    fn test_transformed_bounds() {
        let volume = BoundingVolume::from_size(Vec3::new(2.0, 1.0, 1.0));
        let rotated = volume.transformed(&Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let size = rotated.size();
        assert!(approx(size.x, 1.0) && approx(size.y, 2.0) && approx(size.z, 1.0));
    }
}
