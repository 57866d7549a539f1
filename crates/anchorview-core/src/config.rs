//! Author-supplied placement overrides and menu item records
//!
//! The authoring surface stores these as camelCase JSON. Every numeric field is
//! optional; whatever is missing or non-finite falls back to the identity override.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Three named components, as written by the authoring surface (`{x, y, z}`)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Axes {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Axes {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Convert to a vector, replacing non-finite components with 0
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(finite_or(self.x, 0.0), finite_or(self.y, 0.0), finite_or(self.z, 0.0))
    }
}

impl From<Vec3> for Axes {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Author placement override applied on top of the automatic base transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Uniform multiplier on the base scale
    pub scale: f32,
    /// Offset in marker-frame units
    pub position: Axes,
    /// Euler XYZ rotation in radians
    pub rotation: Axes,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ModelConfig {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        position: Axes::ZERO,
        rotation: Axes::ZERO,
    };

    /// Scale multiplier actually applied. Zero, negative and non-finite values count as 1.
    pub fn effective_scale(&self) -> f32 {
        if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            1.0
        }
    }

    pub fn offset(&self) -> Vec3 {
        self.position.to_vec3()
    }

    pub fn euler(&self) -> Vec3 {
        self.rotation.to_vec3()
    }

    /// Parse from the authoring JSON
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

/// A menu item as persisted by the authoring surface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Source photograph of the marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_image_url: Option<String>,
    /// 3D asset reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
    /// Compiled marker artifact, base64 encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled_target: Option<String>,
    /// Relative path to an already-decoded marker artifact (exported bundles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled_target_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_config: Option<ModelConfig>,
}

impl MenuItem {
    /// Whether the item carries everything an AR session needs
    pub fn has_ar_data(&self) -> bool {
        let marker = self.compiled_target.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.compiled_target_url.as_deref().is_some_and(|s| !s.trim().is_empty());
        let model = self.model_url.as_deref().is_some_and(|s| !s.trim().is_empty());
        marker && model
    }
}

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}
