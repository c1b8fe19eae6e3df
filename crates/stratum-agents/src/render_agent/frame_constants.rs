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

//! Builds the per-frame constants bound at root slot 0.

use stratum_core::renderer::{
    CascadeSet, FrameConstants, GpuPointLight, CASCADE_COUNT, MAX_POINT_LIGHTS,
};
use stratum_core::scene::Scene;

/// Projects the scene and this frame's cascades into the frame constant block.
///
/// Point lights past [`MAX_POINT_LIGHTS`] are dropped.
pub fn frame_constants(
    scene: &Scene,
    cascades: &CascadeSet,
    width: u32,
    height: u32,
    elapsed_seconds: f32,
) -> FrameConstants {
    let (width, height) = (width.max(1) as f32, height.max(1) as f32);
    let camera = &scene.camera;
    let view = camera.view();
    let projection = camera.projection(width / height);
    let view_projection = projection * view;

    let mut constants = FrameConstants {
        view: view.to_cols_array_2d(),
        projection: projection.to_cols_array_2d(),
        view_projection: view_projection.to_cols_array_2d(),
        inverse_view_projection: view_projection.inverse().to_cols_array_2d(),
        cascade_view_projection: cascades.view_projections().map(|m| m.to_cols_array_2d()),
        ..Default::default()
    };

    constants.cascade_splits[..CASCADE_COUNT].copy_from_slice(&cascades.far_splits());
    constants.camera_position = camera.position.extend(camera.near).to_array();

    let light = &scene.light;
    constants.light_direction = light.direction.extend(light.intensity).to_array();
    let shadows = if light.cast_shadows { 1.0 } else { 0.0 };
    constants.light_color = light.color.extend(shadows).to_array();
    constants.screen = [width, height, 1.0 / width, 1.0 / height];

    let count = scene.point_lights.len().min(MAX_POINT_LIGHTS);
    for (slot, light) in constants.point_lights.iter_mut().zip(&scene.point_lights) {
        *slot = GpuPointLight {
            position_range: light.position.extend(light.range).to_array(),
            color_intensity: light.color.extend(light.intensity).to_array(),
        };
    }
    constants.params = [count as f32, elapsed_seconds, camera.far, 0.0];
    constants
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{Mat4, Vec3};
    use stratum_core::renderer::compute_cascades;
    use stratum_core::scene::PointLight;

    fn scene_with_lights(count: usize) -> Scene {
        let mut scene = Scene::default();
        scene.point_lights = (0..count)
            .map(|i| PointLight {
                position: Vec3::new(i as f32, 1.0, 0.0),
                color: Vec3::ONE,
                intensity: 2.0,
                range: 4.0,
            })
            .collect();
        scene
    }

    fn view_projection(constants: &FrameConstants) -> Mat4 {
        Mat4::from_cols_array_2d(&constants.view_projection)
    }

    #[test]
    fn screen_and_camera_fields_are_filled() {
        let scene = scene_with_lights(2);
        let cascades = compute_cascades(&scene.camera.cascade_camera(2.0), scene.light.direction);
        let constants = frame_constants(&scene, &cascades, 200, 100, 1.5);

        assert_eq!(constants.screen, [200.0, 100.0, 0.005, 0.01]);
        assert_eq!(constants.params[0], 2.0);
        assert_relative_eq!(constants.params[1], 1.5);
        assert_relative_eq!(constants.camera_position[3], scene.camera.near);
        assert_eq!(constants.point_lights[1].position_range, [1.0, 1.0, 0.0, 4.0]);

        let expected = scene.camera.projection(2.0) * scene.camera.view();
        assert!(view_projection(&constants).abs_diff_eq(expected, 1e-5));
        let round_trip = Mat4::from_cols_array_2d(&constants.inverse_view_projection)
            * view_projection(&constants);
        assert!(round_trip.abs_diff_eq(Mat4::IDENTITY, 1e-3));
    }

    #[test]
    fn cascade_data_matches_the_fit() {
        let scene = Scene::default();
        let cascades = compute_cascades(&scene.camera.cascade_camera(1.0), scene.light.direction);
        let constants = frame_constants(&scene, &cascades, 64, 64, 0.0);

        let far = cascades.far_splits();
        assert_eq!(&constants.cascade_splits[..3], &far[..]);
        for (matrix, cascade) in constants.cascade_view_projection.iter().zip(&cascades.cascades) {
            assert_eq!(*matrix, cascade.view_projection.to_cols_array_2d());
        }
    }

    #[test]
    fn point_lights_are_capped() {
        let scene = scene_with_lights(MAX_POINT_LIGHTS + 3);
        let constants = frame_constants(&scene, &CascadeSet::default(), 64, 64, 0.0);
        assert_eq!(constants.params[0], MAX_POINT_LIGHTS as f32);
    }

    #[test]
    fn disabled_shadows_clear_the_flag() {
        let mut scene = Scene::default();
        scene.light.cast_shadows = false;
        let constants = frame_constants(&scene, &CascadeSet::default(), 64, 64, 0.0);
        assert_eq!(constants.light_color[3], 0.0);
    }
}
