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

//! Conversions between the engine's render API types and `wgpu` types.

use stratum_core::renderer::api::{BlendMode, CompareFunction, CullMode, Format, IndexFormat};
use stratum_core::renderer::traits::AdapterKind;

/// A local extension trait to convert engine types into `wgpu` types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a `wgpu`-compatible type.
    fn into_wgpu(self) -> T;
}

// --- Formats ---

impl IntoWgpu<wgpu::TextureFormat> for Format {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            Format::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            Format::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Format::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            Format::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            Format::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            Format::R8Unorm => wgpu::TextureFormat::R8Unorm,
            Format::R16Float => wgpu::TextureFormat::R16Float,
            Format::Depth32Float => wgpu::TextureFormat::Depth32Float,
        }
    }
}

/// Maps a surface format back to the engine format, if the engine knows it.
pub fn from_wgpu_texture_format(format: wgpu::TextureFormat) -> Option<Format> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Some(Format::Rgba8Unorm),
        wgpu::TextureFormat::Rgba8UnormSrgb => Some(Format::Rgba8UnormSrgb),
        wgpu::TextureFormat::Bgra8Unorm => Some(Format::Bgra8Unorm),
        wgpu::TextureFormat::Bgra8UnormSrgb => Some(Format::Bgra8UnormSrgb),
        wgpu::TextureFormat::Rgba16Float => Some(Format::Rgba16Float),
        wgpu::TextureFormat::R8Unorm => Some(Format::R8Unorm),
        wgpu::TextureFormat::R16Float => Some(Format::R16Float),
        wgpu::TextureFormat::Depth32Float => Some(Format::Depth32Float),
        _ => None,
    }
}

// --- Pipeline state ---

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

impl IntoWgpu<Option<wgpu::Face>> for CullMode {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

impl IntoWgpu<Option<wgpu::BlendState>> for BlendMode {
    fn into_wgpu(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Opaque => None,
            BlendMode::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent::OVER,
            }),
            BlendMode::AlphaBlend => Some(wgpu::BlendState::ALPHA_BLENDING),
        }
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

// --- Adapters ---

/// Converts a `wgpu` device type to the engine's adapter class.
pub fn adapter_kind_from_wgpu(device_type: wgpu::DeviceType) -> AdapterKind {
    match device_type {
        wgpu::DeviceType::DiscreteGpu => AdapterKind::Discrete,
        wgpu::DeviceType::IntegratedGpu => AdapterKind::Integrated,
        wgpu::DeviceType::VirtualGpu => AdapterKind::Virtual,
        wgpu::DeviceType::Cpu => AdapterKind::Software,
        wgpu::DeviceType::Other => AdapterKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_round_trip_through_wgpu() {
        for format in [
            Format::Rgba8Unorm,
            Format::Rgba8UnormSrgb,
            Format::Bgra8Unorm,
            Format::Bgra8UnormSrgb,
            Format::Rgba16Float,
            Format::R8Unorm,
            Format::R16Float,
            Format::Depth32Float,
        ] {
            assert_eq!(from_wgpu_texture_format(format.into_wgpu()), Some(format));
        }
    }

    #[test]
    fn cpu_adapters_are_software() {
        assert_eq!(
            adapter_kind_from_wgpu(wgpu::DeviceType::Cpu),
            AdapterKind::Software
        );
    }

    #[test]
    fn opaque_blending_disables_blend_state() {
        let blend: Option<wgpu::BlendState> = BlendMode::Opaque.into_wgpu();
        assert!(blend.is_none());
    }
}
