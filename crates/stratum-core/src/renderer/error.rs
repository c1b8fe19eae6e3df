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

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::renderer::api::{DescriptorHeapType, PipelineId, ShaderId};
use std::fmt;

/// An error related to the loading or compilation of a shader module.
#[derive(Debug)]
pub enum ShaderError {
    /// An error occurred while trying to load the shader source from a path.
    LoadError {
        /// The path of the file that failed to load.
        path: String,
        /// The underlying I/O error.
        source_error: String,
    },
    /// The shader source failed to compile into a backend-specific module.
    CompilationError {
        /// The path or label of the shader.
        label: String,
        /// Detailed error messages from the shader compiler.
        details: String,
    },
    /// The requested shader module could not be found.
    NotFound {
        /// The ID of the shader module that was not found.
        id: ShaderId,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::LoadError { path, source_error } => {
                write!(
                    f,
                    "Failed to load shader source from '{path}': {source_error}"
                )
            }
            ShaderError::CompilationError { label, details } => {
                write!(f, "Shader compilation failed for '{label}': {details}")
            }
            ShaderError::NotFound { id } => {
                write!(f, "Shader module not found for ID: {id:?}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation or management of a pipeline-state object.
#[derive(Debug)]
pub enum PipelineError {
    /// The backend failed to build the pipeline.
    CompilationFailed {
        /// The label of the pipeline.
        label: String,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// A shader module provided for the pipeline was invalid or missing.
    InvalidShaderModule {
        /// The ID of the invalid shader module.
        id: ShaderId,
        /// The label of the pipeline being created.
        pipeline_label: String,
    },
    /// The specified pipeline ID is not valid.
    InvalidPipeline {
        /// The ID of the invalid pipeline.
        id: PipelineId,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::CompilationFailed { label, details } => {
                write!(f, "Pipeline compilation failed for '{label}': {details}")
            }
            PipelineError::InvalidShaderModule { id, pipeline_label } => {
                write!(
                    f,
                    "Invalid shader module {id:?} for pipeline '{pipeline_label}'"
                )
            }
            PipelineError::InvalidPipeline { id } => {
                write!(f, "Invalid pipeline ID: {id:?}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// An error related to descriptor heaps and their index regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// A heap was requested with zero descriptors.
    ZeroCapacity {
        /// The kind of heap requested.
        heap_type: DescriptorHeapType,
    },
    /// A region of a heap has no free slot left.
    RegionExhausted {
        /// The name of the region.
        region: &'static str,
        /// The number of slots the region holds.
        capacity: u32,
    },
    /// A region does not fit inside its heap.
    RegionOutOfHeap {
        /// The name of the region.
        region: &'static str,
        /// One past the last index of the region.
        end: u32,
        /// The heap capacity.
        heap_capacity: u32,
    },
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::ZeroCapacity { heap_type } => {
                write!(f, "Descriptor heap {heap_type:?} requested with zero capacity")
            }
            DescriptorError::RegionExhausted { region, capacity } => {
                write!(
                    f,
                    "Descriptor region '{region}' exhausted: all {capacity} slots are in use"
                )
            }
            DescriptorError::RegionOutOfHeap {
                region,
                end,
                heap_capacity,
            } => {
                write!(
                    f,
                    "Descriptor region '{region}' ends at {end}, past the heap capacity {heap_capacity}"
                )
            }
        }
    }
}

impl std::error::Error for DescriptorError {}

/// An error related to the creation or use of a GPU resource (buffers, textures, etc.).
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A pipeline-specific error occurred.
    Pipeline(PipelineError),
    /// A descriptor heap or region error occurred.
    Descriptor(DescriptorError),
    /// A generic resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds (e.g., in a buffer).
    OutOfBounds,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline resource error: {err}"),
            ResourceError::Descriptor(err) => write!(f, "Descriptor error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => {
                write!(f, "Resource access out of bounds.")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            ResourceError::Descriptor(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

impl From<DescriptorError> for ResourceError {
    fn from(err: DescriptorError) -> Self {
        ResourceError::Descriptor(err)
    }
}

/// A high-level error that can occur within the renderer or graphics device.
#[derive(Debug)]
pub enum RenderError {
    /// An operation was attempted before the rendering system was initialized.
    NotInitialized,
    /// A failure occurred during the initialization of the graphics backend.
    InitializationFailed(String),
    /// Adapter enumeration found nothing but software adapters.
    NoSuitableAdapter,
    /// Failed to acquire the next frame from the swap chain.
    SurfaceAcquisitionFailed(String),
    /// A critical rendering operation failed.
    RenderingFailed(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// A pass declared an input that no earlier pass produced.
    MissingPassInput {
        /// The pass that reads the input.
        pass: String,
        /// The missing texture name.
        input: String,
    },
    /// A model file could not be loaded.
    AssetLoadFailed {
        /// The file that failed.
        path: String,
        /// What went wrong.
        reason: String,
    },
    /// The graphics device was lost.
    DeviceLost,
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => {
                write!(f, "The rendering system is not initialized.")
            }
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics backend: {msg}")
            }
            RenderError::NoSuitableAdapter => {
                write!(f, "No hardware graphics adapter was found.")
            }
            RenderError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Failed to acquire surface for rendering: {msg}")
            }
            RenderError::RenderingFailed(msg) => {
                write!(f, "A critical rendering operation failed: {msg}")
            }
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::MissingPassInput { pass, input } => {
                write!(
                    f,
                    "Pass '{pass}' reads '{input}', which no render target texture provides"
                )
            }
            RenderError::AssetLoadFailed { path, reason } => {
                write!(f, "Failed to load asset '{path}': {reason}")
            }
            RenderError::DeviceLost => write!(
                f,
                "The graphics device was lost and needs to be reinitialized."
            ),
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::ResourceError(ResourceError::Shader(err))
    }
}

impl From<PipelineError> for RenderError {
    fn from(err: PipelineError) -> Self {
        RenderError::ResourceError(ResourceError::Pipeline(err))
    }
}

impl From<DescriptorError> for RenderError {
    fn from(err: DescriptorError) -> Self {
        RenderError::ResourceError(ResourceError::Descriptor(err))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::LoadError {
            path: "shaders/forward.wgsl".to_string(),
            source_error: "File not found".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Failed to load shader source from 'shaders/forward.wgsl': File not found"
        );
    }

    #[test]
    fn render_error_wraps_descriptor_error() {
        let err: RenderError = DescriptorError::RegionExhausted {
            region: "textures",
            capacity: 4,
        }
        .into();
        assert_eq!(
            format!("{err}"),
            "Graphics resource operation failed: Descriptor error: Descriptor region 'textures' exhausted: all 4 slots are in use"
        );
        let source = err.source().unwrap();
        assert!(source.source().is_some());
    }

    #[test]
    fn missing_input_names_pass_and_texture() {
        let err = RenderError::MissingPassInput {
            pass: "tonemapping".into(),
            input: "lighting_target".into(),
        };
        let text = err.to_string();
        assert!(text.contains("tonemapping"));
        assert!(text.contains("lighting_target"));
    }
}
