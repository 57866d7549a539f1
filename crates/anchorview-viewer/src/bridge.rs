//! JavaScript-facing controls for the authoring page
//!
//! The page calls the exported functions whenever the author edits the item;
//! calls are queued and applied by [`crate::preview`] on the next frame.

use std::sync::Mutex;

use anchorview_core::ModelConfig;
use bevy::prelude::*;
use wasm_bindgen::prelude::*;

pub struct BridgePlugin;

impl Plugin for BridgePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ViewerCommand>()
            .add_systems(Startup, queue_initial_commands)
            .add_systems(PreUpdate, forward_commands);
    }
}

/// One change requested by the page
#[derive(Message, Debug, Clone, PartialEq)]
pub enum ViewerCommand {
    LoadModel(String),
    SetTargetImage(Option<String>),
    SetConfig(Option<ModelConfig>),
    SetShadows(bool),
    SetGrid(bool),
    SetAutoRotate(bool),
    Capture,
}

static COMMANDS: Mutex<Vec<ViewerCommand>> = Mutex::new(Vec::new());

pub fn push(command: ViewerCommand) {
    match COMMANDS.lock() {
        Ok(mut queue) => queue.push(command),
        Err(_) => tracing::error!("viewer command queue poisoned, dropping {:?}", command),
    }
}

pub fn drain() -> Vec<ViewerCommand> {
    COMMANDS
        .lock()
        .map(|mut queue| std::mem::take(&mut *queue))
        .unwrap_or_default()
}

/// Parse the author config JSON; empty input clears the override
pub fn parse_config(json: &str) -> Result<Option<ModelConfig>, serde_json::Error> {
    if json.trim().is_empty() || json.trim() == "null" {
        return Ok(None);
    }
    ModelConfig::from_json(json).map(Some)
}

#[wasm_bindgen(js_name = setModel)]
pub fn set_model(url: String) {
    push(ViewerCommand::LoadModel(url));
}

#[wasm_bindgen(js_name = setTargetImage)]
pub fn set_target_image(url: Option<String>) {
    push(ViewerCommand::SetTargetImage(url.filter(|u| !u.trim().is_empty())));
}

#[wasm_bindgen(js_name = setModelConfig)]
pub fn set_model_config(json: &str) -> Result<(), JsValue> {
    let config = parse_config(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    push(ViewerCommand::SetConfig(config));
    Ok(())
}

#[wasm_bindgen(js_name = setShadows)]
pub fn set_shadows(enabled: bool) {
    push(ViewerCommand::SetShadows(enabled));
}

#[wasm_bindgen(js_name = setGrid)]
pub fn set_grid(visible: bool) {
    push(ViewerCommand::SetGrid(visible));
}

#[wasm_bindgen(js_name = setAutoRotate)]
pub fn set_auto_rotate(enabled: bool) {
    push(ViewerCommand::SetAutoRotate(enabled));
}

/// Render once and deliver the frame as an `anchorview-capture` event
#[wasm_bindgen]
pub fn capture() {
    push(ViewerCommand::Capture);
}

fn queue_initial_commands() {
    for command in initial_commands() {
        push(command);
    }
}

/// Hand queued page calls to the ECS
fn forward_commands(mut writer: MessageWriter<ViewerCommand>) {
    for command in drain() {
        tracing::debug!(?command, "viewer command");
        writer.write(command);
    }
}

/// Commands describing the page URL (`?model=&target=&config=`)
pub fn initial_commands() -> Vec<ViewerCommand> {
    let mut commands = Vec::new();

    #[cfg(target_arch = "wasm32")]
    {
        let params = web_sys::window()
            .and_then(|w| w.location().href().ok())
            .and_then(|href| web_sys::Url::new(&href).ok())
            .map(|url| url.search_params());
        let Some(params) = params else {
            return commands;
        };

        if let Some(json) = params.get("config") {
            match parse_config(&json) {
                Ok(config) => commands.push(ViewerCommand::SetConfig(config)),
                Err(e) => tracing::warn!("Ignoring invalid config parameter: {}", e),
            }
        }
        if let Some(target) = params.get("target").filter(|t| !t.is_empty()) {
            commands.push(ViewerCommand::SetTargetImage(Some(target)));
        }
        if let Some(model) = params.get("model").filter(|m| !m.is_empty()) {
            commands.push(ViewerCommand::LoadModel(model));
        }
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        assert_eq!(parse_config("").unwrap(), None);
        assert_eq!(parse_config("null").unwrap(), None);

        let config = parse_config(r#"{"scale":1.5,"position":{"x":0.1,"y":0,"z":0}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(config.scale, 1.5);
        assert_eq!(config.position.x, 0.1);
        assert_eq!(config.rotation.z, 0.0);

        assert!(parse_config("{scale:").is_err());
    }

    #[test]
    fn test_queue_preserves_order() {
        // Shared static; only this test touches it
        drain();
        push(ViewerCommand::SetGrid(false));
        push(ViewerCommand::Capture);
        assert_eq!(drain(), vec![ViewerCommand::SetGrid(false), ViewerCommand::Capture]);
        assert!(drain().is_empty());
    }
}
