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

//! The render-side projection of the scene data.
//!
//! [`Scene`] is rebuilt from [`SceneData`] one way: edits made to the data
//! (by the editor, for example) are picked up by [`Scene::sync`] each frame,
//! and nothing flows back.

use crate::config::{
    CameraData, DirectionalLightData, ModelInstanceData, PointLightData, SceneData,
    SceneObjectData,
};
use crate::renderer::{CascadeCamera, ObjectConstants};
use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};

/// A perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World position.
    pub position: Vec3,
    /// Point looked at.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_data(&CameraData::default())
    }
}

impl Camera {
    /// Builds a camera from its data.
    pub fn from_data(data: &CameraData) -> Self {
        let near = data.near.max(1e-3);
        Self {
            position: Vec3::from(data.position),
            target: Vec3::from(data.target),
            fov_y: data.fov_y_degrees.clamp(1.0, 179.0).to_radians(),
            near,
            far: data.far.max(near + 1e-3),
        }
    }

    /// World to view, right-handed.
    pub fn view(&self) -> Mat4 {
        let forward = (self.target - self.position).try_normalize().unwrap_or(Vec3::NEG_Z);
        let up = if forward.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
        Mat4::look_to_rh(self.position, forward, up)
    }

    /// View to clip with a `[0, 1]` depth range.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    /// The parameters the cascade fit needs.
    pub fn cascade_camera(&self, aspect: f32) -> CascadeCamera {
        CascadeCamera {
            view: self.view(),
            fov_y: self.fov_y,
            aspect,
            near: self.near,
            far: self.far,
        }
    }
}

/// The sun.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels, normalized.
    pub direction: Vec3,
    /// Linear color.
    pub color: Vec3,
    /// Brightness multiplier.
    pub intensity: f32,
    /// Whether the shadow map is sampled.
    pub cast_shadows: bool,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::from_data(&DirectionalLightData::default())
    }
}

impl DirectionalLight {
    /// Builds a light from its data. A zero direction points straight down.
    pub fn from_data(data: &DirectionalLightData) -> Self {
        Self {
            direction: Vec3::from(data.direction)
                .try_normalize()
                .unwrap_or(Vec3::NEG_Y),
            color: Vec3::from(data.color),
            intensity: data.intensity,
            cast_shadows: data.cast_shadows,
        }
    }
}

/// A point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// World position.
    pub position: Vec3,
    /// Linear color.
    pub color: Vec3,
    /// Brightness multiplier.
    pub intensity: f32,
    /// Falloff distance.
    pub range: f32,
}

impl PointLight {
    /// Builds a light from its data.
    pub fn from_data(data: &PointLightData) -> Self {
        Self {
            position: Vec3::from(data.position),
            color: Vec3::from(data.color),
            intensity: data.intensity,
            range: data.range.max(1e-3),
        }
    }
}

/// A placed model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    /// Display name.
    pub name: String,
    /// Model asset key.
    pub model: String,
    /// Albedo texture asset key.
    pub albedo_texture: Option<String>,
    /// Object to world.
    pub transform: Mat4,
    /// Color multiplier.
    pub base_color: Vec4,
    /// Surface roughness.
    pub roughness: f32,
    /// Metalness.
    pub metallic: f32,
    /// Skipped by mesh passes when `false`.
    pub enabled: bool,
}

impl ModelInstance {
    /// Builds an instance from its data.
    pub fn from_data(data: &ModelInstanceData) -> Self {
        let [x, y, z] = data.rotation.map(f32::to_radians);
        let rotation = Quat::from_euler(EulerRot::YXZ, y, x, z);
        Self {
            name: data.name.clone(),
            model: data.model.clone(),
            albedo_texture: data.albedo_texture.clone(),
            transform: Mat4::from_scale_rotation_translation(
                Vec3::from(data.scale),
                rotation,
                Vec3::from(data.position),
            ),
            base_color: Vec4::from(data.base_color),
            roughness: data.roughness.clamp(0.0, 1.0),
            metallic: data.metallic.clamp(0.0, 1.0),
            enabled: data.enabled,
        }
    }

    /// The per-draw constants of this instance.
    pub fn object_constants(&self) -> ObjectConstants {
        ObjectConstants {
            model: self.transform.to_cols_array_2d(),
            normal_matrix: self.transform.inverse().transpose().to_cols_array_2d(),
            base_color: self.base_color.to_array(),
            material: [self.roughness, self.metallic, 0.0, 0.0],
        }
    }
}

/// The renderable scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// The viewing camera.
    pub camera: Camera,
    /// The sun.
    pub light: DirectionalLight,
    /// Point lights in declaration order.
    pub point_lights: Vec<PointLight>,
    /// Model instances in declaration order.
    pub instances: Vec<ModelInstance>,
}

impl Scene {
    /// Projects `data` into a fresh scene.
    ///
    /// The first camera and the first directional light win; later ones are
    /// ignored with a warning. Missing ones get defaults.
    pub fn from_data(data: &SceneData) -> Self {
        let mut scene = Scene::default();
        let (mut camera_seen, mut light_seen) = (false, false);
        for object in &data.objects {
            match object {
                SceneObjectData::Camera(camera) if !camera_seen => {
                    scene.camera = Camera::from_data(camera);
                    camera_seen = true;
                }
                SceneObjectData::DirectionalLight(light) if !light_seen => {
                    scene.light = DirectionalLight::from_data(light);
                    light_seen = true;
                }
                SceneObjectData::Camera(camera) => {
                    log::warn!("Ignoring extra camera '{}'", camera.name);
                }
                SceneObjectData::DirectionalLight(light) => {
                    log::warn!("Ignoring extra directional light '{}'", light.name);
                }
                SceneObjectData::PointLight(light) => {
                    scene.point_lights.push(PointLight::from_data(light));
                }
                SceneObjectData::ModelInstance(instance) => {
                    scene.instances.push(ModelInstance::from_data(instance));
                }
            }
        }
        scene
    }

    /// Re-projects `data` onto this scene.
    ///
    /// Returns `true` when the set of instances changed shape (count, model,
    /// or texture keys), meaning per-instance GPU resources must be rebuilt.
    /// Transform and material edits alone return `false`.
    pub fn sync(&mut self, data: &SceneData) -> bool {
        let updated = Scene::from_data(data);
        let reshaped = updated.instances.len() != self.instances.len()
            || updated
                .instances
                .iter()
                .zip(&self.instances)
                .any(|(new, old)| new.model != old.model || new.albedo_texture != old.albedo_texture);
        *self = updated;
        reshaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_data() -> SceneData {
        SceneData {
            objects: vec![
                SceneObjectData::Camera(CameraData::default()),
                SceneObjectData::DirectionalLight(DirectionalLightData::default()),
                SceneObjectData::PointLight(PointLightData {
                    name: "lamp".into(),
                    position: [1.0, 2.0, 3.0],
                    color: [1.0, 0.5, 0.2],
                    intensity: 2.0,
                    range: 5.0,
                }),
                SceneObjectData::ModelInstance(ModelInstanceData::new("a", "cube")),
            ],
        }
    }

    #[test]
    fn projects_every_object_kind() {
        let scene = Scene::from_data(&sample_data());
        assert_eq!(scene.point_lights.len(), 1);
        assert_eq!(scene.instances.len(), 1);
        assert_relative_eq!(scene.light.direction.length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(scene.camera.fov_y, 60f32.to_radians());
    }

    #[test]
    fn transform_edits_do_not_reshape() {
        let mut data = sample_data();
        let mut scene = Scene::from_data(&data);
        if let SceneObjectData::ModelInstance(instance) = &mut data.objects[3] {
            instance.position = [4.0, 0.0, 0.0];
        }
        assert!(!scene.sync(&data));
        assert_relative_eq!(scene.instances[0].transform.w_axis.x, 4.0);

        data.objects
            .push(SceneObjectData::ModelInstance(ModelInstanceData::new("b", "cube")));
        assert!(scene.sync(&data));
        assert_eq!(scene.instances.len(), 2);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let mut data = ModelInstanceData::new("a", "cube");
        data.scale = [2.0, 1.0, 1.0];
        let constants = ModelInstance::from_data(&data).object_constants();
        let normal = Mat4::from_cols_array_2d(&constants.normal_matrix);
        assert_relative_eq!(normal.x_axis.x, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn camera_looking_straight_down_has_a_valid_view() {
        let camera = Camera::from_data(&CameraData {
            position: [0.0, 10.0, 0.0],
            target: [0.0, 0.0, 0.0],
            ..CameraData::default()
        });
        assert!(!camera.view().is_nan());
    }
}
