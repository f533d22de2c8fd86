//! Part-mesh rendering.
//!
//! [`SceneRenderer`] is the seam [`RenderInterface`](crate::render_interface::RenderInterface)
//! drives; [`Renderer`] implements it on wgpu. Every frame is a
//! [`FramePlan`]: opaque batches with depth writes, then translucent
//! batches blended in plan order. Picking replays the same plan with
//! int-valued opacities into the ID target.

pub mod picking;
pub mod plan;
pub mod readiness;

pub use picking::{PickTarget, Picking};
pub use plan::{FramePlan, MeshParts, PartTable, PlannedDraw};
pub use readiness::Readiness;
use web_time::Instant;

use crate::camera::{Camera, CameraBinding};
use crate::catalog::{texture_source, Material, MeshEntry, ModelInfo, TextureSource};
use crate::codec::DecodedMesh;
use crate::error::ViewerError;
use crate::gpu::draw_uniforms::DrawUniforms;
use crate::gpu::pipeline::{
    MaterialBinding, PartPipelines, PipelineLayouts, VERTEX_CHANNELS,
};
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::gpu::texture::{RenderTarget, Texture, TextureCache};
use crate::layers::OpacityInfo;
use crate::mesh::{GpuMesh, MeshBuffers};
use crate::options::{LoadingOptions, Options};

/// Bind group index of the camera uniform.
pub const CAMERA_GROUP: u32 = 0;
/// Bind group index of the per-draw uniform.
pub const DRAW_GROUP: u32 = 2;

/// Operations the render interface needs from a renderer.
pub trait SceneRenderer {
    /// Upload one decoded entry of `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Format`] or [`ViewerError::IndexLimit`] if
    /// the mesh cannot be drawn.
    fn on_mesh_load(
        &mut self,
        model: &ModelInfo,
        entry: &MeshEntry,
        mesh: DecodedMesh,
    ) -> Result<(), ViewerError>;

    /// Every entry of `model` has been delivered.
    fn update_mesh_info(&mut self, model: &ModelInfo);

    /// Opacities used by subsequent redisplays.
    fn update_opacity(&mut self, info: &OpacityInfo);

    /// Draw a frame from `camera`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Surface`] if no frame could be acquired.
    fn redisplay(&mut self, camera: &Camera) -> Result<(), ViewerError>;

    /// Start an ID read at pixel `(x, y)` using `info` (already
    /// int-valued). Returns `false` if the read was not started.
    ///
    /// # Errors
    ///
    /// Implementations may fail if the GPU rejects the pass.
    fn identify(
        &mut self,
        x: u32,
        y: u32,
        camera: &Camera,
        info: &OpacityInfo,
    ) -> Result<bool, ViewerError>;

    /// Collect the result of the last identify, if it has arrived.
    fn poll_identify(&mut self) -> Option<PickTarget>;

    /// Drop every mesh of the current model.
    fn reset(&mut self);

    /// Flip between textured and plain shading. Returns the new state.
    fn toggle_colored(&mut self) -> bool;

    /// Resize every target.
    fn handle_resize(&mut self, width: u32, height: u32);

    /// Current viewport size in pixels.
    fn size(&self) -> (u32, u32);
}

struct MeshSlot {
    gpu: GpuMesh,
    texture_url: Option<String>,
    material: Option<Material>,
}

/// wgpu renderer for one model at a time.
pub struct Renderer {
    context: RenderContext,
    camera: CameraBinding,
    materials: MaterialBinding,
    draw_uniforms: DrawUniforms,
    pipelines: PartPipelines,
    depth: RenderTarget,
    /// Colour target when the context has no surface.
    offscreen: Option<RenderTarget>,
    picking: Picking,
    textures: TextureCache,
    meshes: Vec<MeshSlot>,
    table: PartTable,
    opacity: OpacityInfo,
    colored: bool,
    clear_color: wgpu::Color,
    loading: LoadingOptions,
}

impl Renderer {
    /// Build pipelines and targets for `context`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Shader`] if a shader fails to compose.
    pub fn new(context: RenderContext, options: &Options) -> Result<Self, ViewerError> {
        let device = &context.device;
        let size = context.size();
        let camera = CameraBinding::new(device, &options.camera.camera(context.aspect()));
        let materials = MaterialBinding::new(device);
        let draw_uniforms = DrawUniforms::new(device, 64);

        let mut composer = ShaderComposer::new()?;
        let pipelines = PartPipelines::new(
            &context,
            &PipelineLayouts {
                camera: &camera.layout,
                material: &materials.layout,
                draw: draw_uniforms.layout(),
            },
            &mut composer,
        )?;

        let depth = RenderTarget::depth(device, "Depth Target", size);
        let offscreen = (!context.has_surface())
            .then(|| Self::offscreen_target(device, size, context.format()));
        let picking = Picking::new(device, size);

        Ok(Self {
            camera,
            materials,
            draw_uniforms,
            pipelines,
            depth,
            offscreen,
            picking,
            textures: TextureCache::new(),
            meshes: Vec::new(),
            table: PartTable::new(options.picking.base_color_index),
            opacity: OpacityInfo::default(),
            colored: options.render.colored,
            clear_color: options.render.clear_color(),
            loading: options.loading.clone(),
            context,
        })
    }

    fn offscreen_target(
        device: &wgpu::Device,
        size: (u32, u32),
        format: wgpu::TextureFormat,
    ) -> RenderTarget {
        RenderTarget::new(
            device,
            "Offscreen Color Target",
            size,
            format,
            wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    /// The GPU context.
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Parts of the current model.
    pub fn table(&self) -> &PartTable {
        &self.table
    }

    /// Opacities of the last [`SceneRenderer::update_opacity`].
    pub fn opacity(&self) -> &OpacityInfo {
        &self.opacity
    }

    /// `true` when parts are drawn with their material textures.
    pub fn is_colored(&self) -> bool {
        self.colored
    }

    /// Offscreen colour target, present only without a surface.
    pub fn offscreen(&self) -> Option<&RenderTarget> {
        self.offscreen.as_ref()
    }

    /// Texture URLs waiting to be fetched. The host fetches each and
    /// passes the bytes to [`Renderer::on_texture_load`].
    pub fn pending_textures(&mut self) -> Vec<String> {
        self.textures.take_pending()
    }

    /// Swap the placeholder for `url` with its image and rebind every mesh
    /// that uses it. Returns `false` if `url` was never requested.
    pub fn on_texture_load(&mut self, url: &str, bytes: &[u8]) -> bool {
        let device = &self.context.device;
        let Some(texture) = self.textures.fulfill(device, &self.context.queue, url, bytes) else {
            return false;
        };
        for (index, slot) in self
            .meshes
            .iter_mut()
            .enumerate()
            .filter(|(_, slot)| slot.texture_url.as_deref() == Some(url))
        {
            let label = format!("Mesh {index}");
            let group = self
                .materials
                .bind_group(device, &label, texture, slot.material.as_ref());
            slot.gpu.set_material_bind_group(group);
        }
        true
    }

    /// Total GPU bytes held by mesh buffers.
    pub fn mesh_memory(&self) -> u64 {
        self.meshes
            .iter()
            .flat_map(|slot| slot.gpu.buffer_info())
            .map(|(_, bytes)| bytes)
            .sum()
    }

    fn draw_planned(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        slot: usize,
        draw: &PlannedDraw,
        for_picking: bool,
    ) {
        let Some(mesh) = self.meshes.get(draw.mesh) else {
            return;
        };
        if !mesh.gpu.bind(pass, for_picking) {
            return;
        }
        if !for_picking {
            self.draw_uniforms.bind(pass, DRAW_GROUP, slot);
        }
        mesh.gpu.draw_list(pass, &draw.list);
    }
}

/// Reject meshes whose vertex layout the part pipelines cannot read.
fn check_vertex_layout(mesh: &DecodedMesh) -> Result<(), ViewerError> {
    if mesh.channel_count == VERTEX_CHANNELS {
        return Ok(());
    }
    Err(ViewerError::Format(format!(
        "meshes need {VERTEX_CHANNELS} channels per vertex, got {}",
        mesh.channel_count
    )))
}

/// Per-draw opacities in submission order: opaque batches, then
/// translucent ones.
fn draw_opacities(plan: &FramePlan) -> Vec<f32> {
    plan.opaque
        .iter()
        .chain(&plan.translucent)
        .map(|draw| draw.opacity)
        .collect()
}

impl SceneRenderer for Renderer {
    fn on_mesh_load(
        &mut self,
        model: &ModelInfo,
        entry: &MeshEntry,
        mesh: DecodedMesh,
    ) -> Result<(), ViewerError> {
        check_vertex_layout(&mesh)?;
        let first_id = self.table.check_entry(entry)?;
        let started = Instant::now();
        let buffers = MeshBuffers::build(mesh, &entry.lengths, Some(first_id))?;

        let device = &self.context.device;
        let queue = &self.context.queue;
        let label = format!("Mesh {}", self.meshes.len());
        let mut gpu = GpuMesh::upload(device, &label, &buffers);

        let material = model.material(&entry.material).cloned();
        let texture_path = self.loading.texture_path(&model.texture_path);
        let (texture_url, group) = match texture_source(material.as_ref(), texture_path) {
            TextureSource::Url(url) => {
                let texture = self.textures.request(device, queue, &url);
                let group = self
                    .materials
                    .bind_group(device, &label, texture, material.as_ref());
                (Some(url), group)
            }
            TextureSource::Flat(color) => {
                let texture = Texture::flat(device, queue, color);
                let group = self
                    .materials
                    .bind_group(device, &label, &texture, material.as_ref());
                (None, group)
            }
        };
        gpu.set_material_bind_group(group);

        let _ = self.table.add_mesh(entry, model, &buffers.bboxes)?;
        log::debug!(
            "uploaded '{}': {} vertices, {} indices, {} parts in {:?}",
            entry.material,
            gpu.vertex_count(),
            gpu.index_count(),
            entry.part_count(),
            started.elapsed()
        );
        self.meshes.push(MeshSlot {
            gpu,
            texture_url,
            material,
        });
        Ok(())
    }

    fn update_mesh_info(&mut self, model: &ModelInfo) {
        let expected = model.entry_count();
        if self.meshes.len() < expected {
            log::warn!(
                "model finished with {} of {expected} entries uploaded",
                self.meshes.len()
            );
        }
        log::info!(
            "model ready: {} meshes, {} parts, {} layers, {} KiB of mesh buffers",
            self.meshes.len(),
            self.table.part_count(),
            model.layer_count(),
            self.mesh_memory() / 1024
        );
    }

    fn update_opacity(&mut self, info: &OpacityInfo) {
        self.opacity.clone_from(info);
    }

    fn redisplay(&mut self, camera: &Camera) -> Result<(), ViewerError> {
        self.camera.update(&self.context.queue, camera);
        let plan = FramePlan::build(&self.table, &self.opacity, camera.eye);
        self.draw_uniforms.write(
            &self.context.device,
            &self.context.queue,
            &draw_opacities(&plan),
            self.colored,
        );

        let frame = if self.context.has_surface() {
            Some(self.context.get_next_frame()?)
        } else {
            None
        };
        let frame_view = frame
            .as_ref()
            .map(|f| f.texture.create_view(&wgpu::TextureViewDescriptor::default()));
        let Some(view) = frame_view
            .as_ref()
            .or_else(|| self.offscreen.as_ref().map(|target| &target.view))
        else {
            return Ok(());
        };

        let mut encoder = self.context.create_encoder();
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Part Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_bind_group(CAMERA_GROUP, &self.camera.bind_group, &[]);

            pass.set_pipeline(&self.pipelines.opaque);
            for (slot, draw) in plan.opaque.iter().enumerate() {
                self.draw_planned(&mut pass, slot, draw, false);
            }

            pass.set_pipeline(&self.pipelines.translucent);
            let first = plan.opaque.len();
            for (i, draw) in plan.translucent.iter().enumerate() {
                self.draw_planned(&mut pass, first + i, draw, false);
            }
        }
        self.context.submit(encoder);

        if let Some(frame) = frame {
            frame.present();
        }
        Ok(())
    }

    fn identify(
        &mut self,
        x: u32,
        y: u32,
        camera: &Camera,
        info: &OpacityInfo,
    ) -> Result<bool, ViewerError> {
        if self.picking.is_discarding() {
            let _ = self.picking.complete_readback(&self.context.device);
        }
        if self.picking.is_busy() {
            log::debug!("identify at ({x}, {y}) skipped: readback in flight");
            return Ok(false);
        }
        self.camera.update(&self.context.queue, camera);
        let plan = FramePlan::build(&self.table, info, camera.eye);

        let mut encoder = self.context.create_encoder();
        {
            let mut pass = self.picking.begin_pass(&mut encoder);
            pass.set_pipeline(&self.pipelines.picking);
            pass.set_bind_group(CAMERA_GROUP, &self.camera.bind_group, &[]);
            for (slot, draw) in plan.opaque.iter().chain(&plan.translucent).enumerate() {
                self.draw_planned(&mut pass, slot, draw, true);
            }
        }
        let copied = self.picking.copy_pixel(&mut encoder, (x, y));
        self.context.submit(encoder);
        if copied {
            self.picking.start_readback();
        }
        Ok(copied)
    }

    fn poll_identify(&mut self) -> Option<PickTarget> {
        self.picking
            .complete_readback(&self.context.device)
            .map(|raw_id| PickTarget::resolve(&self.table, raw_id))
    }

    fn reset(&mut self) {
        let count = self.meshes.len();
        for slot in self.meshes.drain(..) {
            slot.gpu.destroy();
        }
        self.table.clear();
        self.picking.cancel();
        log::info!("renderer reset: released {count} meshes");
    }

    fn toggle_colored(&mut self) -> bool {
        self.colored = !self.colored;
        self.colored
    }

    fn handle_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.context.resize(width, height);
        let device = &self.context.device;
        let size = (width, height);
        self.depth = RenderTarget::depth(device, "Depth Target", size);
        if self.offscreen.is_some() {
            self.offscreen = Some(Self::offscreen_target(device, size, self.context.format()));
        }
        self.picking.resize(device, width, height);
    }

    fn size(&self) -> (u32, u32) {
        self.context.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::DisplayList;

    fn decoded(channel_count: usize) -> DecodedMesh {
        DecodedMesh {
            attribs: vec![0.0; channel_count * 3],
            indices: vec![0, 1, 2],
            bboxes: Vec::new(),
            channel_count,
        }
    }

    #[test]
    fn only_full_vertex_layout_is_accepted() {
        assert!(check_vertex_layout(&decoded(VERTEX_CHANNELS)).is_ok());
        assert!(matches!(
            check_vertex_layout(&decoded(3)),
            Err(ViewerError::Format(_))
        ));
    }

    #[test]
    fn uniform_slots_follow_submission_order() {
        let draw = |opacity| PlannedDraw {
            mesh: 0,
            layer: 0,
            opacity,
            list: DisplayList::new(),
            distance_sq: 0.0,
        };
        let plan = FramePlan {
            opaque: vec![draw(1.0), draw(1.0)],
            translucent: vec![draw(0.25), draw(0.5)],
        };
        assert_eq!(draw_opacities(&plan), vec![1.0, 1.0, 0.25, 0.5]);
    }
}
