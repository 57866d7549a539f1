//! Exported bundle manifest and writer
//!
//! A bundle is a self-contained directory served statically:
//!
//! ```text
//! bundle.json
//! assets/{id}/targets.mind     decoded marker artifact
//! assets/{id}/{model file}     copied when the model is a local file
//! assets/{id}/{image file}     copied when the marker photo is a local file
//! ```
//!
//! Every path in `bundle.json` is relative to the bundle root, so the directory
//! works from any origin. Remote URLs are kept as they are.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{MenuItem, ModelConfig};
use crate::marker::{MarkerArtifact, MarkerError};

pub const MANIFEST_FILE: &str = "bundle.json";
pub const ASSETS_DIR: &str = "assets";
pub const MARKER_FILE: &str = "targets.mind";

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("marker for item '{id}': {source}")]
    Marker {
        id: String,
        #[source]
        source: MarkerError,
    },
    #[error("duplicate item id: {0}")]
    DuplicateItem(String),
    #[error("item id cannot be used as a directory name: {0:?}")]
    InvalidId(String),
}

/// One menu entry inside an exported bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
    /// Relative path of the decoded marker artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled_target_url: Option<String>,
    /// SHA256 of the marker artifact, hex encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_config: Option<ModelConfig>,
}

impl BundleItem {
    pub fn has_ar_data(&self) -> bool {
        self.to_menu_item().has_ar_data()
    }

    /// View the entry as a menu item, the shape session hosts consume
    pub fn to_menu_item(&self) -> MenuItem {
        MenuItem {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            calories: self.calories,
            tags: self.tags.clone(),
            target_image_url: self.target_image_url.clone(),
            model_url: self.model_url.clone(),
            compiled_target: None,
            compiled_target_url: self.compiled_target_url.clone(),
            model_config: self.model_config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    #[serde(default = "default_version")]
    pub version: String,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub items: Vec<BundleItem>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl BundleManifest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            title: title.into(),
            generated_at: Utc::now(),
            items: Vec::new(),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, BundleError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, BundleError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), BundleError> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&BundleItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn ar_ready_count(&self) -> usize {
        self.items.iter().filter(|item| item.has_ar_data()).count()
    }
}

/// Writes a bundle directory item by item
pub struct BundleWriter {
    root: PathBuf,
    /// Directory local (non-URL) asset references are resolved against
    source_dir: PathBuf,
    manifest: BundleManifest,
    ids: HashSet<String>,
}

impl BundleWriter {
    pub fn new(root: impl Into<PathBuf>, source_dir: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            source_dir: source_dir.into(),
            manifest: BundleManifest::new(title),
            ids: HashSet::new(),
        }
    }

    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    /// Add one menu item, decoding its marker and copying local assets
    pub fn add(&mut self, item: &MenuItem) -> Result<&BundleItem, BundleError> {
        validate_id(&item.id)?;
        if self.ids.contains(&item.id) {
            return Err(BundleError::DuplicateItem(item.id.clone()));
        }

        let item_dir = Path::new(ASSETS_DIR).join(&item.id);

        let (compiled_target_url, marker_sha256) = match item.compiled_target.as_deref() {
            Some(encoded) if !encoded.trim().is_empty() => {
                let marker = MarkerArtifact::from_base64(encoded).map_err(|source| BundleError::Marker {
                    id: item.id.clone(),
                    source,
                })?;
                let relative = item_dir.join(MARKER_FILE);
                self.write_file(&relative, marker.as_bytes())?;
                (Some(to_url_path(&relative)), Some(marker.sha256()))
            }
            _ => (item.compiled_target_url.clone(), None),
        };

        let model_url = self.localize(item.model_url.as_deref(), &item_dir)?;
        let target_image_url = self.localize(item.target_image_url.as_deref(), &item_dir)?;

        let entry = BundleItem {
            id: item.id.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price,
            calories: item.calories,
            tags: item.tags.clone(),
            target_image_url,
            model_url,
            compiled_target_url,
            marker_sha256,
            model_config: item.model_config,
        };

        if !entry.has_ar_data() {
            tracing::warn!(id = %entry.id, "item has no AR data, it will be listed without AR");
        }

        self.ids.insert(item.id.clone());
        self.manifest.items.push(entry);
        Ok(&self.manifest.items[self.manifest.items.len() - 1])
    }

    /// Write `bundle.json` and hand back the manifest
    pub fn finish(self) -> Result<BundleManifest, BundleError> {
        self.manifest.save(&self.root.join(MANIFEST_FILE))?;
        tracing::info!(
            root = %self.root.display(),
            items = self.manifest.items.len(),
            ar_ready = self.manifest.ar_ready_count(),
            "bundle written"
        );
        Ok(self.manifest)
    }

    /// Copy a local asset into the item directory; remote or missing ones are kept as-is
    fn localize(&self, reference: Option<&str>, item_dir: &Path) -> Result<Option<String>, BundleError> {
        let Some(reference) = reference.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        if is_remote(reference) {
            return Ok(Some(reference.to_string()));
        }

        let source = self.source_dir.join(reference);
        let Some(file_name) = source.file_name() else {
            return Ok(Some(reference.to_string()));
        };
        if !source.is_file() {
            tracing::warn!(path = %source.display(), "local asset not found, keeping reference");
            return Ok(Some(reference.to_string()));
        }

        let relative = item_dir.join(file_name);
        let bytes = std::fs::read(&source)?;
        self.write_file(&relative, &bytes)?;
        Ok(Some(to_url_path(&relative)))
    }

    fn write_file(&self, relative: &Path, bytes: &[u8]) -> Result<(), BundleError> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote bundle file");
        Ok(())
    }
}

fn is_remote(reference: &str) -> bool {
    ["http://", "https://", "data:", "blob:"]
        .iter()
        .any(|scheme| reference.starts_with(scheme))
}

fn validate_id(id: &str) -> Result<(), BundleError> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.chars().any(|c| matches!(c, '/' | '\\' | ':') || c.is_control());
    if bad {
        return Err(BundleError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn to_url_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
