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

//! Cascaded shadow-map fitting.
//!
//! The camera frustum is cut into [`CASCADE_COUNT`] slices along view-space Z
//! at fixed split distances. Each slice is fitted with an orthographic
//! projection in the directional light's view space.
//!
//! Conventions: both the camera and the light views are right-handed and look
//! down `-Z`. Light-space depth is mapped to `[0, 1]` by
//! [`Mat4::orthographic_rh`], with near = `-max_z` and far = `-min_z` of the
//! slice bounds. The near side is pushed toward the light by
//! [`SHADOW_CASTER_PADDING`] so casters outside the slice still write depth.

use crate::renderer::constants::CASCADE_COUNT;
use glam::{Mat4, Vec3};

/// The hand-tuned inner split distances, in view-space units.
pub const CASCADE_SPLITS: [f32; CASCADE_COUNT - 1] = [8.0, 20.0];

/// How far the light-space volume is extended toward the light.
pub const SHADOW_CASTER_PADDING: f32 = 50.0;

/// Above this `|direction.y|` the light counts as parallel to world-up.
const PARALLEL_TO_UP_THRESHOLD: f32 = 0.99;

/// The camera parameters a cascade fit depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeCamera {
    /// World to view transform.
    pub view: Mat4,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
}

/// One fitted cascade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cascade {
    /// Near split distance.
    pub near: f32,
    /// Far split distance.
    pub far: f32,
    /// World to light clip space: `projection * light_view`.
    pub view_projection: Mat4,
    /// Minimum corner of the slice bounds in light view space.
    pub bounds_min: Vec3,
    /// Maximum corner of the slice bounds in light view space.
    pub bounds_max: Vec3,
}

/// All cascades of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeSet {
    /// The cascades, nearest first.
    pub cascades: [Cascade; CASCADE_COUNT],
}

impl Default for CascadeSet {
    fn default() -> Self {
        let cascade = Cascade {
            near: 0.0,
            far: 0.0,
            view_projection: Mat4::IDENTITY,
            bounds_min: Vec3::ZERO,
            bounds_max: Vec3::ZERO,
        };
        Self {
            cascades: [cascade; CASCADE_COUNT],
        }
    }
}

impl CascadeSet {
    /// Far split distance of every cascade.
    pub fn far_splits(&self) -> [f32; CASCADE_COUNT] {
        self.cascades.map(|c| c.far)
    }

    /// Light-space matrix of every cascade.
    pub fn view_projections(&self) -> [Mat4; CASCADE_COUNT] {
        self.cascades.map(|c| c.view_projection)
    }
}

/// Returns the split distances `[near, 8, 20, far]`.
///
/// When the camera range does not strictly contain the fixed inner splits,
/// the range is divided uniformly instead so the splits stay strictly increasing.
pub fn cascade_splits(near: f32, far: f32) -> [f32; CASCADE_COUNT + 1] {
    let mut splits = [near; CASCADE_COUNT + 1];
    splits[CASCADE_COUNT] = far;

    let fixed_fit = near < CASCADE_SPLITS[0] && CASCADE_SPLITS[CASCADE_COUNT - 2] < far;
    for i in 1..CASCADE_COUNT {
        splits[i] = if fixed_fit {
            CASCADE_SPLITS[i - 1]
        } else {
            near + (far - near) * i as f32 / CASCADE_COUNT as f32
        };
    }
    splits
}

/// The 8 view-space corners of the frustum slice between `near` and `far`.
///
/// The first four corners lie on the near face, the last four on the far face.
pub fn frustum_slice_corners(fov_y: f32, aspect: f32, near: f32, far: f32) -> [Vec3; 8] {
    let tan_half_v = (fov_y * 0.5).tan();
    let tan_half_h = tan_half_v * aspect;

    let mut corners = [Vec3::ZERO; 8];
    for (face, distance) in [near, far].into_iter().enumerate() {
        let x = distance * tan_half_h;
        let y = distance * tan_half_v;
        let base = face * 4;
        corners[base] = Vec3::new(-x, -y, -distance);
        corners[base + 1] = Vec3::new(x, -y, -distance);
        corners[base + 2] = Vec3::new(x, y, -distance);
        corners[base + 3] = Vec3::new(-x, y, -distance);
    }
    corners
}

/// The view matrix of a directional light travelling along `direction`.
///
/// The light looks from `-normalize(direction)` toward the origin. World-up is
/// used as the up vector unless the light is near-parallel to it, in which case
/// `+X` is used instead.
pub fn light_view(direction: Vec3) -> Mat4 {
    let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Y);
    let up = if direction.y.abs() > PARALLEL_TO_UP_THRESHOLD {
        Vec3::X
    } else {
        Vec3::Y
    };
    Mat4::look_at_rh(-direction, Vec3::ZERO, up)
}

/// Fits one orthographic projection per cascade for the given camera and light.
pub fn compute_cascades(camera: &CascadeCamera, light_direction: Vec3) -> CascadeSet {
    let splits = cascade_splits(camera.near, camera.far);
    let light_view = light_view(light_direction);
    let view_to_light = light_view * camera.view.inverse();

    let mut set = CascadeSet::default();
    for (i, cascade) in set.cascades.iter_mut().enumerate() {
        let (near, far) = (splits[i], splits[i + 1]);
        let corners = frustum_slice_corners(camera.fov_y, camera.aspect, near, far);

        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for corner in corners {
            let p = view_to_light.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }

        let projection = Mat4::orthographic_rh(
            min.x,
            max.x,
            min.y,
            max.y,
            -max.z - SHADOW_CASTER_PADDING,
            -min.z,
        );

        *cascade = Cascade {
            near,
            far,
            view_projection: projection * light_view,
            bounds_min: min,
            bounds_max: max,
        };
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera_looking(eye: Vec3, target: Vec3) -> CascadeCamera {
        let up = if (target - eye).normalize().y.abs() > 0.99 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        CascadeCamera {
            view: Mat4::look_at_rh(eye, target, up),
            fov_y: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }

    fn assert_well_formed(set: &CascadeSet) {
        for cascade in &set.cascades {
            for axis in 0..3 {
                assert!(
                    cascade.bounds_max[axis] >= cascade.bounds_min[axis],
                    "empty bounds on axis {axis}: {cascade:?}"
                );
            }
            assert!(!cascade.view_projection.is_nan());
            assert!(cascade.view_projection.determinant().abs() > 0.0);
        }
    }

    #[test]
    fn splits_match_fixed_distances() {
        let splits = cascade_splits(0.1, 100.0);
        assert_eq!(splits, [0.1, 8.0, 20.0, 100.0]);
    }

    #[test]
    fn splits_stay_increasing_for_short_ranges() {
        let splits = cascade_splits(0.5, 15.0);
        for pair in splits.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(splits[0], 0.5);
        assert_eq!(splits[CASCADE_COUNT], 15.0);
    }

    #[test]
    fn slice_corners_use_half_fov_tangents() {
        let corners = frustum_slice_corners(90f32.to_radians(), 2.0, 1.0, 10.0);
        // tan(45°) = 1, so the far face spans x in [-20, 20] and y in [-10, 10].
        assert_relative_eq!(corners[6].x, 20.0, epsilon = 1e-4);
        assert_relative_eq!(corners[6].y, 10.0, epsilon = 1e-4);
        assert_relative_eq!(corners[6].z, -10.0);
        assert_relative_eq!(corners[0].x, -2.0, epsilon = 1e-4);
        assert_relative_eq!(corners[0].z, -1.0);
    }

    #[test]
    fn cascades_are_non_empty_for_many_orientations() {
        let camera_targets = [
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.3, -0.8, 0.2),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let lights = [
            Vec3::new(-0.4, -1.0, -0.3),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        for target in camera_targets {
            let camera = camera_looking(Vec3::new(2.0, 3.0, 5.0), Vec3::new(2.0, 3.0, 5.0) + target);
            for light in lights {
                assert_well_formed(&compute_cascades(&camera, light));
            }
        }
    }

    #[test]
    fn light_parallel_to_world_up_falls_back_to_secondary_up() {
        let camera = camera_looking(Vec3::new(0.0, 2.0, 10.0), Vec3::ZERO);
        for light in [
            Vec3::NEG_Y,
            Vec3::Y,
            Vec3::new(0.001, -1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0005),
        ] {
            let view = light_view(light);
            assert!(!view.is_nan(), "degenerate light view for {light:?}");
            assert_well_formed(&compute_cascades(&camera, light));
        }
    }

    #[test]
    fn slice_corners_land_inside_the_light_clip_volume() {
        let camera = camera_looking(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO);
        let set = compute_cascades(&camera, Vec3::new(-0.5, -1.0, -0.25));
        let view_inverse = camera.view.inverse();
        let splits = cascade_splits(camera.near, camera.far);
        for (i, cascade) in set.cascades.iter().enumerate() {
            for corner in frustum_slice_corners(camera.fov_y, camera.aspect, splits[i], splits[i + 1]) {
                let world = view_inverse.transform_point3(corner);
                let clip = cascade.view_projection.project_point3(world);
                assert!(clip.x >= -1.0 - 1e-3 && clip.x <= 1.0 + 1e-3);
                assert!(clip.y >= -1.0 - 1e-3 && clip.y <= 1.0 + 1e-3);
                assert!(clip.z >= -1e-3 && clip.z <= 1.0 + 1e-3);
            }
        }
    }

    #[test]
    fn far_splits_are_reported_in_order() {
        let camera = camera_looking(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO);
        let set = compute_cascades(&camera, Vec3::new(0.2, -1.0, 0.1));
        assert_eq!(set.far_splits(), [8.0, 20.0, 100.0]);
    }

    #[test]
    fn zero_light_direction_does_not_produce_nan() {
        let camera = camera_looking(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO);
        assert_well_formed(&compute_cascades(&camera, Vec3::ZERO));
    }
}
