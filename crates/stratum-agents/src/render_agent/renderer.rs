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

//! Defines the Renderer, the central orchestrator of a frame.

use super::draw_list::DrawList;
use super::frame_constants::frame_constants;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use stratum_core::asset::{AssetCache, AssetLoader, GpuTexture};
use stratum_core::config::{ApplicationData, RenderData, RenderTechnique};
use stratum_core::editor::{EditorOverlay, NullEditor};
use stratum_core::renderer::{
    compute_cascades, sort_passes, CascadeSet, ContextSettings, Device, DrawItem, FrameData,
    PassGraphError, RenderContext, RenderError, RenderPass,
};
use stratum_core::scene::Scene;
use stratum_lanes::{PassFactoryError, RenderPassFactory};
use thiserror::Error;

/// Errors that stop the renderer.
#[derive(Debug, Error)]
pub enum RendererError {
    /// A GPU, resource, shader, or pass failure.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// A configured pass name is not registered.
    #[error(transparent)]
    Factory(#[from] PassFactoryError),
    /// The configured pass list cannot be ordered.
    #[error("Invalid pass list: {0}")]
    PassGraph(#[from] PassGraphError),
}

/// Owns everything a frame needs and records frames in a fixed order.
///
/// Lifecycle: [`new`](Self::new) loads the assets, projects the scene, and
/// builds the active pass list; [`render_frame`](Self::render_frame) runs once
/// per frame; [`shutdown`](Self::shutdown) releases everything.
pub struct Renderer {
    context: RenderContext,
    factory: RenderPassFactory,
    passes: Vec<Box<dyn RenderPass>>,
    technique: RenderTechnique,
    shader_directory: PathBuf,
    assets: AssetCache,
    scene: Scene,
    draw_list: DrawList,
    cascades: CascadeSet,
    editor: Box<dyn EditorOverlay>,
    // Raised by the shader watcher thread, consumed at the next frame start.
    reload_requested: Arc<AtomicBool>,
    started: Instant,
    frame_count: u64,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("technique", &self.technique)
            .field("passes", &self.pass_names())
            .field("draws", &self.draw_list.draws().len())
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Creates the render context on `device`, loads every declared asset,
    /// and builds the pass list of the configured technique.
    ///
    /// # Errors
    ///
    /// Any context, asset, factory, pass-graph, or pass initialization failure.
    pub fn new(
        device: Device,
        data: &ApplicationData,
        loader: &dyn AssetLoader,
        factory: RenderPassFactory,
    ) -> Result<Self, RendererError> {
        let render_data = &data.render_data;
        let mut context = RenderContext::initialize(
            device,
            ContextSettings {
                width: data.window_data.width,
                height: data.window_data.height,
                shadow_map_size: render_data.shadow_map_size,
                clear_color: render_data.clear_color,
            },
        )?;

        let mut assets = AssetCache::new();
        assets.load_all(&data.assets_data, loader, &mut context)?;

        let mut renderer = Self {
            context,
            factory,
            passes: Vec::new(),
            technique: render_data.technique,
            shader_directory: PathBuf::from(&render_data.shader_directory),
            assets,
            scene: Scene::from_data(&data.scene_data),
            draw_list: DrawList::new(),
            cascades: CascadeSet::default(),
            editor: Box::new(NullEditor),
            reload_requested: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
            frame_count: 0,
        };
        renderer.build_passes(render_data)?;
        renderer.prepare_scene()?;

        log::info!(
            "Renderer ready: {:?} technique, passes [{}], {} assets",
            renderer.technique,
            renderer.pass_names().join(", "),
            renderer.assets.len()
        );
        Ok(renderer)
    }

    /// Replaces the editor overlay.
    pub fn set_editor(&mut self, editor: Box<dyn EditorOverlay>) {
        self.editor = editor;
    }

    /// Records, submits, and presents one frame, then waits for the GPU.
    ///
    /// In order: editor frame, command list reset, descriptor heaps, viewport,
    /// target clears, every pass, editor overlay, present transition, close,
    /// submit, present, fence wait. Scene edits made by the editor are applied
    /// before recording starts.
    pub fn render_frame(&mut self, data: &mut ApplicationData) -> Result<(), RendererError> {
        self.editor.build_frame(data);
        self.apply_edits(data)?;

        self.context.reset_command_list();
        self.context.bind_descriptor_heaps();
        self.context.bind_viewport();
        self.context.clear_render_targets()?;

        let frame = FrameData {
            draws: self.draw_list.draws(),
            cascades: &self.cascades,
            skybox: self.assets.first_cubemap().map(GpuTexture::table),
        };
        for pass in &mut self.passes {
            pass.render(&mut self.context, &frame)?;
        }

        self.editor.render(&mut self.context)?;
        self.context.prepare_for_present()?;
        self.context.close_command_list();
        self.context.submit()?;
        self.context.present()?;
        self.context.wait_for_previous_frame()?;

        self.frame_count += 1;
        log::trace!("Frame {} done, {} draws", self.frame_count, frame.draws.len());
        Ok(())
    }

    /// Resizes the swap chain and every screen-sized target. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RendererError> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {width}x{height}");
            return Ok(());
        }
        if (width, height) == (self.context.width(), self.context.height()) {
            return Ok(());
        }
        self.context.set_window_size(width, height)?;
        Ok(())
    }

    /// The flag that triggers a reload of every pass at the next frame.
    ///
    /// Hand it to a shader directory watcher.
    pub fn reload_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.reload_requested)
    }

    /// Reloads every pass at the next frame.
    pub fn request_reload(&self) {
        self.reload_requested.store(true, Ordering::Release);
    }

    /// Waits for the GPU, then releases passes, object buffers, assets, and the context.
    pub fn shutdown(mut self) -> Result<(), RendererError> {
        self.context.wait_for_previous_frame()?;
        for pass in &mut self.passes {
            pass.shutdown(&mut self.context);
        }
        self.passes.clear();
        self.draw_list.release(&self.context);
        self.assets.clear(&self.context);
        self.context.shutdown()?;
        log::info!("Renderer shut down after {} frames", self.frame_count);
        Ok(())
    }

    /// The render context.
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// The technique whose pass list is active.
    pub fn technique(&self) -> RenderTechnique {
        self.technique
    }

    /// Names of the active passes, in execution order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// The draws recorded by mesh passes in the last prepared frame.
    pub fn draws(&self) -> &[DrawItem] {
        self.draw_list.draws()
    }

    /// The cascades fitted for the last prepared frame.
    pub fn cascades(&self) -> &CascadeSet {
        &self.cascades
    }

    /// The loaded GPU assets.
    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    /// Frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    // ─────────────────────────────────────────────────────────────────────
    // Frame preparation
    // ─────────────────────────────────────────────────────────────────────

    fn apply_edits(&mut self, data: &ApplicationData) -> Result<(), RendererError> {
        if data.render_data.technique != self.technique {
            log::info!(
                "Switching technique {:?} -> {:?}",
                self.technique,
                data.render_data.technique
            );
            self.technique = data.render_data.technique;
            self.build_passes(&data.render_data)?;
        }

        if self.reload_requested.swap(false, Ordering::AcqRel) {
            log::info!("Reloading {} passes", self.passes.len());
            for pass in &mut self.passes {
                pass.request_reload();
            }
        }

        if self.scene.sync(&data.scene_data) {
            log::debug!("Scene instances changed, rebuilding draws");
        }
        self.prepare_scene()?;
        Ok(())
    }

    /// Updates the draw list, the cascades, and the frame constants.
    fn prepare_scene(&mut self) -> Result<(), RenderError> {
        self.draw_list
            .update(&self.scene, &self.assets, &mut self.context)?;

        let (width, height) = (self.context.width(), self.context.height());
        let aspect = width as f32 / height.max(1) as f32;
        self.cascades = compute_cascades(
            &self.scene.camera.cascade_camera(aspect),
            self.scene.light.direction,
        );
        let constants = frame_constants(
            &self.scene,
            &self.cascades,
            width,
            height,
            self.started.elapsed().as_secs_f32(),
        );
        self.context.update_frame_constants(&constants)
    }

    /// Replaces the active passes with the ordered pass list of the current technique.
    fn build_passes(&mut self, render_data: &RenderData) -> Result<(), RendererError> {
        let ordered = sort_passes(render_data.active_passes().to_vec())?;
        let mut passes = self.factory.create_all(&ordered, &self.shader_directory)?;

        for mut old in self.passes.drain(..) {
            old.shutdown(&mut self.context);
        }
        for pass in &mut passes {
            log::debug!("Initializing pass '{}'", pass.name());
            pass.initialize(&mut self.context)?;
        }
        self.passes = passes;
        Ok(())
    }
}
