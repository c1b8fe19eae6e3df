// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The JSON application data tree: window, renderer, assets, and scene.
//!
//! Floating-point fields are written as 3-decimal strings and accepted back as
//! either strings or plain numbers.

mod assets;
mod render;
mod scene;
mod serde_float;
mod window;

pub use self::assets::{AssetData, AssetsData, TextureUsage};
pub use self::render::{
    default_deferred_passes, default_forward_passes, RenderData, RenderPassData, RenderTechnique,
};
pub use self::scene::{
    CameraData, DirectionalLightData, ModelInstanceData, PointLightData, SceneData,
    SceneObjectData,
};
pub use self::serde_float::{fixed3, fixed3_array};
pub use self::window::WindowData;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors raised while reading or writing the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or written.
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not a valid application data document.
    Parse {
        /// The file involved, if any.
        path: Option<PathBuf>,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to access config file '{}': {}", path.display(), source)
            }
            ConfigError::Parse {
                path: Some(path),
                source,
            } => write!(f, "Invalid config file '{}': {}", path.display(), source),
            ConfigError::Parse { path: None, source } => write!(f, "Invalid config: {source}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

/// The root of the configuration document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationData {
    /// Window and process settings.
    pub window_data: WindowData,
    /// Renderer settings and pass lists.
    pub render_data: RenderData,
    /// Asset declarations.
    pub assets_data: AssetsData,
    /// Scene objects.
    pub scene_data: SceneData,
}

impl ApplicationData {
    /// Reads and parses `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let data = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        log::info!("Loaded configuration from '{}'", path.display());
        Ok(data)
    }

    /// Parses a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse { path: None, source })
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self)
            .map_err(|source| ConfigError::Parse { path: None, source })
    }

    /// Writes the document to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let data = ApplicationData::from_json(r#"{"window_data": {"title": "Demo"}}"#).unwrap();
        assert_eq!(data.window_data.title, "Demo");
        assert_eq!(data.window_data.width, 1280);
        assert_eq!(data.render_data.technique, RenderTechnique::Forward);
        assert!(!data.render_data.forward_render_passes.is_empty());
    }

    #[test]
    fn tagged_objects_and_assets_are_parsed() {
        let json = r#"{
            "assets_data": {"assets": [
                {"type": "model", "name": "cube", "path": "cube.obj"},
                {"type": "texture", "name": "bricks", "path": "bricks.png", "usage": "albedo"}
            ]},
            "scene_data": {"objects": [
                {"type": "camera", "name": "cam", "position": ["0.000", "1.000", "5.000"],
                 "target": [0, 0, 0], "fov_y_degrees": "60.000", "near": 0.1, "far": 50},
                {"type": "model_instance", "name": "a", "model": "cube",
                 "position": [0, 0, 0], "rotation": [0, 45, 0], "scale": [1, 1, 1]}
            ]}
        }"#;
        let data = ApplicationData::from_json(json).unwrap();
        assert_eq!(data.assets_data.assets.len(), 2);
        assert_eq!(data.assets_data.assets[1].name(), "bricks");
        match &data.scene_data.objects[0] {
            SceneObjectData::Camera(camera) => assert_eq!(camera.far, 50.0),
            other => panic!("expected a camera, got {other:?}"),
        }
        match &data.scene_data.objects[1] {
            SceneObjectData::ModelInstance(instance) => {
                assert!(instance.enabled);
                assert_eq!(instance.base_color, [1.0; 4]);
                assert_eq!(instance.rotation, [0.0, 45.0, 0.0]);
            }
            other => panic!("expected a model instance, got {other:?}"),
        }
    }

    #[test]
    fn pass_entries_default_to_clearing() {
        let json = r#"{"render_data": {"forward_render_passes": [
            {"name": "final", "input": ["ldr"]}
        ]}}"#;
        let data = ApplicationData::from_json(json).unwrap();
        let pass = &data.render_data.forward_render_passes[0];
        assert!(pass.clear_outputs);
        assert!(pass.output.is_empty());
        assert_eq!(pass.vertex_shader_name, None);
    }

    #[test]
    fn save_and_load_preserve_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut data = ApplicationData::default();
        data.render_data.technique = RenderTechnique::Deferred;
        data.scene_data
            .objects
            .push(SceneObjectData::Camera(CameraData::default()));
        data.scene_data.objects.push(SceneObjectData::ModelInstance(
            ModelInstanceData::new("crate", "cube"),
        ));
        data.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"fov_y_degrees\": \"60.000\""));

        let loaded = ApplicationData::load(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ApplicationData::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
