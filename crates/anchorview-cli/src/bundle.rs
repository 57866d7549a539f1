//! `bundle` command: lays out a static bundle directory from exported menu items

use anchorview_core::{BundleManifest, BundleWriter, MenuItem};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Menu export: a bare item list or an object carrying a title
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MenuFile {
    Items(Vec<MenuItem>),
    Menu {
        #[serde(default)]
        title: Option<String>,
        items: Vec<MenuItem>,
    },
}

impl MenuFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read menu file: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse menu file: {}", path.display()))
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            MenuFile::Items(_) => None,
            MenuFile::Menu { title, .. } => title.as_deref(),
        }
    }

    pub fn items(&self) -> &[MenuItem] {
        match self {
            MenuFile::Items(items) | MenuFile::Menu { items, .. } => items,
        }
    }
}

/// Write every item of `menu` into `out`; local asset paths resolve against `source`
pub fn write_bundle(menu: &MenuFile, out: &Path, source: &Path, title: &str) -> Result<BundleManifest> {
    std::fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;

    let mut writer = BundleWriter::new(out, source, title);
    for item in menu.items() {
        writer
            .add(item)
            .with_context(|| format!("Failed to add item '{}'", item.id))?;
    }
    writer.finish().context("Failed to write bundle manifest")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchorview_core::bundle::MANIFEST_FILE;
    use base64::Engine;

    #[test]
    fn test_menu_file_shapes() {
        let bare: MenuFile = serde_json::from_str(r#"[{"id":"a","name":"A"}]"#).unwrap();
        assert_eq!(bare.title(), None);
        assert_eq!(bare.items().len(), 1);

        let titled: MenuFile =
            serde_json::from_str(r#"{"title":"Bistro","items":[{"id":"a"},{"id":"b"}]}"#).unwrap();
        assert_eq!(titled.title(), Some("Bistro"));
        assert_eq!(titled.items().len(), 2);
    }

    #[test]
    fn test_write_bundle() {
        let source = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("burger.glb"), b"glTF").unwrap();

        let marker = base64::engine::general_purpose::STANDARD.encode(b"marker-bytes");
        let menu: MenuFile = serde_json::from_str(&format!(
            r#"[{{"id":"burger","name":"Burger","price":9.5,"modelUrl":"burger.glb","compiledTarget":"{marker}"}},
                {{"id":"soup","name":"Soup","price":4.0}}]"#
        ))
        .unwrap();

        let manifest = write_bundle(&menu, out.path(), source.path(), "Bistro").unwrap();
        assert_eq!(manifest.title, "Bistro");
        assert_eq!(manifest.ar_ready_count(), 1);

        let burger = manifest.get("burger").unwrap();
        assert_eq!(burger.model_url.as_deref(), Some("assets/burger/burger.glb"));
        assert_eq!(burger.compiled_target_url.as_deref(), Some("assets/burger/targets.mind"));
        assert_eq!(
            std::fs::read(out.path().join("assets/burger/targets.mind")).unwrap(),
            b"marker-bytes"
        );

        let written = BundleManifest::from_file(&out.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(written.items.len(), 2);
    }

    #[test]
    fn test_duplicate_ids_fail() {
        let out = tempfile::tempdir().unwrap();
        let menu: MenuFile = serde_json::from_str(r#"[{"id":"a"},{"id":"a"}]"#).unwrap();
        assert!(write_bundle(&menu, out.path(), out.path(), "Menu").is_err());
    }
}
