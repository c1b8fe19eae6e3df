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

use super::{fixed3, fixed3_array};
use serde::{Deserialize, Serialize};

/// A perspective camera looking from `position` toward `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraData {
    /// Display name.
    pub name: String,
    /// World position.
    #[serde(with = "fixed3_array")]
    pub position: [f32; 3],
    /// World point the camera looks at.
    #[serde(with = "fixed3_array")]
    pub target: [f32; 3],
    /// Vertical field of view in degrees.
    #[serde(with = "fixed3")]
    pub fov_y_degrees: f32,
    /// Near plane distance.
    #[serde(with = "fixed3")]
    pub near: f32,
    /// Far plane distance.
    #[serde(with = "fixed3")]
    pub far: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            name: "Main Camera".to_string(),
            position: [0.0, 3.0, 8.0],
            target: [0.0, 0.0, 0.0],
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// The single shadow-casting sun light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLightData {
    /// Display name.
    pub name: String,
    /// Direction the light travels.
    #[serde(with = "fixed3_array")]
    pub direction: [f32; 3],
    /// Linear color.
    #[serde(with = "fixed3_array")]
    pub color: [f32; 3],
    /// Brightness multiplier.
    #[serde(with = "fixed3")]
    pub intensity: f32,
    /// Render the cascaded shadow map for this light.
    #[serde(default = "default_true")]
    pub cast_shadows: bool,
}

impl Default for DirectionalLightData {
    fn default() -> Self {
        Self {
            name: "Sun".to_string(),
            direction: [-0.4, -1.0, -0.3],
            color: [1.0, 0.96, 0.9],
            intensity: 3.0,
            cast_shadows: true,
        }
    }
}

/// A point light with a finite range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointLightData {
    /// Display name.
    pub name: String,
    /// World position.
    #[serde(with = "fixed3_array")]
    pub position: [f32; 3],
    /// Linear color.
    #[serde(with = "fixed3_array")]
    pub color: [f32; 3],
    /// Brightness multiplier.
    #[serde(with = "fixed3")]
    pub intensity: f32,
    /// Distance at which the contribution reaches zero.
    #[serde(with = "fixed3")]
    pub range: f32,
}

/// A placed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInstanceData {
    /// Display name.
    pub name: String,
    /// Key of a `model` asset.
    pub model: String,
    /// Key of a `texture` asset used as albedo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub albedo_texture: Option<String>,
    /// World position.
    #[serde(with = "fixed3_array")]
    pub position: [f32; 3],
    /// Euler rotation in degrees, applied Y then X then Z.
    #[serde(with = "fixed3_array")]
    pub rotation: [f32; 3],
    /// Per-axis scale.
    #[serde(with = "fixed3_array")]
    pub scale: [f32; 3],
    /// Color multiplier.
    #[serde(with = "fixed3_array", default = "white")]
    pub base_color: [f32; 4],
    /// Surface roughness in `[0, 1]`.
    #[serde(with = "fixed3", default = "half")]
    pub roughness: f32,
    /// Metalness in `[0, 1]`.
    #[serde(with = "fixed3", default)]
    pub metallic: f32,
    /// Disabled instances are skipped by every mesh pass.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ModelInstanceData {
    /// An enabled, untransformed instance of `model`.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            albedo_texture: None,
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            base_color: white(),
            roughness: half(),
            metallic: 0.0,
            enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn white() -> [f32; 4] {
    [1.0; 4]
}

fn half() -> f32 {
    0.5
}

/// One scene object, dispatched on its `"type"` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneObjectData {
    /// The viewing camera. The first one wins.
    Camera(CameraData),
    /// The sun. The first one wins.
    DirectionalLight(DirectionalLightData),
    /// A point light.
    PointLight(PointLightData),
    /// A placed model.
    ModelInstance(ModelInstanceData),
}

/// All scene objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneData {
    /// Objects, in declaration order.
    pub objects: Vec<SceneObjectData>,
}
