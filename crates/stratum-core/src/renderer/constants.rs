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

//! GPU-visible data layouts shared by the core, the passes, and the WGSL shaders.
//!
//! Every struct here is `#[repr(C)]` and mirrors a WGSL struct of the same
//! name in `assets/shaders/common.wgsl`.

use bytemuck::{Pod, Zeroable};

/// Number of shadow cascades.
pub const CASCADE_COUNT: usize = 3;

/// Maximum number of point lights uploaded per frame.
pub const MAX_POINT_LIGHTS: usize = 8;

/// The interleaved vertex format of every mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Object-space normal.
    pub normal: [f32; 3],
    /// Texture coordinates.
    pub uv: [f32; 2],
}

/// One point light as seen by shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    /// World position in `xyz`, range in `w`.
    pub position_range: [f32; 4],
    /// Linear color in `rgb`, intensity in `w`.
    pub color_intensity: [f32; 4],
}

/// Per-frame camera, light, and cascade data bound at root slot 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameConstants {
    /// World to view.
    pub view: [[f32; 4]; 4],
    /// View to clip.
    pub projection: [[f32; 4]; 4],
    /// World to clip.
    pub view_projection: [[f32; 4]; 4],
    /// Clip to world.
    pub inverse_view_projection: [[f32; 4]; 4],
    /// World to light clip space, one per cascade.
    pub cascade_view_projection: [[[f32; 4]; 4]; CASCADE_COUNT],
    /// Far split distance of each cascade in `xyz`.
    pub cascade_splits: [f32; 4],
    /// Camera world position in `xyz`, near plane in `w`.
    pub camera_position: [f32; 4],
    /// Direction the light travels in `xyz`, intensity in `w`.
    pub light_direction: [f32; 4],
    /// Light color in `rgb`, `1.0` in `w` when shadows are enabled.
    pub light_color: [f32; 4],
    /// Width, height, 1/width, 1/height.
    pub screen: [f32; 4],
    /// Point light count, elapsed seconds, far plane, unused.
    pub params: [f32; 4],
    /// Point lights, `params.x` of them are valid.
    pub point_lights: [GpuPointLight; MAX_POINT_LIGHTS],
}

/// Per-instance data bound at root slot 1 by mesh passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    /// Object to world.
    pub model: [[f32; 4]; 4],
    /// Inverse-transpose of `model`.
    pub normal_matrix: [[f32; 4]; 4],
    /// Base color multiplier.
    pub base_color: [f32; 4],
    /// Roughness, metallic, unused, unused.
    pub material: [f32; 4],
}

/// Small per-pass parameter block bound at root slot 1 by full-screen passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct PassParams {
    /// Pass-specific values.
    pub values: [f32; 4],
    /// More pass-specific values.
    pub extra: [f32; 4],
}

/// The light-space matrix of one cascade, bound at slot 0 by the shadow pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CascadeConstants {
    /// World to light clip space.
    pub view_projection: [[f32; 4]; 4],
    /// Cascade index in `x`.
    pub params: [f32; 4],
}

impl Default for FrameConstants {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_structs_are_sixteen_byte_multiples() {
        assert_eq!(std::mem::size_of::<FrameConstants>() % 16, 0);
        assert_eq!(std::mem::size_of::<ObjectConstants>() % 16, 0);
        assert_eq!(std::mem::size_of::<PassParams>() % 16, 0);
        assert_eq!(std::mem::size_of::<CascadeConstants>() % 16, 0);
        assert_eq!(std::mem::size_of::<MeshVertex>(), 32);
    }
}
