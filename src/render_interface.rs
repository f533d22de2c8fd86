//! Front door between the loading/UI side and a [`SceneRenderer`].
//!
//! Tracks readiness so refreshes issued mid-load are parked and replayed on
//! completion, accumulates per-part bounding boxes for navigation, and keeps
//! the current [`OpacityInfo`] so picking can derive int-valued opacities
//! without touching the renderer's display state.

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::camera::Camera;
use crate::catalog::{MeshEntry, ModelInfo};
use crate::codec::DecodedMesh;
use crate::error::ViewerError;
use crate::layers::OpacityInfo;
use crate::mesh::{grow_bbox, union_bboxes, BBox};
use crate::renderer::{PickTarget, Readiness, SceneRenderer};

/// Drives a renderer through a model's load, display and picking.
pub struct RenderInterface<R> {
    renderer: R,
    bboxes: FxHashMap<String, BBox>,
    readiness: Readiness<Camera>,
    opacity: OpacityInfo,
}

impl<R: SceneRenderer> RenderInterface<R> {
    /// Wrap `renderer`; nothing is loaded yet.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            bboxes: FxHashMap::default(),
            readiness: Readiness::default(),
            opacity: OpacityInfo::default(),
        }
    }

    /// The wrapped renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The wrapped renderer, mutably (texture delivery, offscreen reads).
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// `true` once the current model has finished loading.
    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Upload one decoded entry and record its part boxes. A part split
    /// across entries gets the union of its boxes.
    ///
    /// # Errors
    ///
    /// Propagates the renderer's upload error; no boxes are recorded then.
    pub fn on_mesh_load(
        &mut self,
        model: &ModelInfo,
        entry: &MeshEntry,
        mesh: DecodedMesh,
    ) -> Result<(), ViewerError> {
        let boxes = mesh.bboxes.clone();
        self.renderer.on_mesh_load(model, entry, mesh)?;
        for (name, bbox) in entry.names.iter().zip(&boxes) {
            let grown = grow_bbox(self.bboxes.get(name).copied(), bbox);
            let _ = self.bboxes.insert(name.clone(), grown);
        }
        Ok(())
    }

    /// Every entry has been delivered. Marks the model ready and runs the
    /// refresh parked during the load, if any.
    ///
    /// # Errors
    ///
    /// Propagates a failure of the parked refresh.
    pub fn on_model_load(&mut self, model: &ModelInfo) -> Result<(), ViewerError> {
        self.renderer.update_mesh_info(model);
        self.readiness
            .mark_ready()
            .map_or(Ok(()), |camera| self.draw(&camera))
    }

    /// Tear down the current model. Cancels any parked refresh.
    pub fn reset(&mut self) {
        self.renderer.reset();
        self.bboxes.clear();
        self.readiness.reset();
    }

    /// Bounding box of every loaded part, by name.
    pub fn bboxes(&self) -> &FxHashMap<String, BBox> {
        &self.bboxes
    }

    /// Union of every part box.
    pub fn model_bounds(&self) -> Option<BBox> {
        union_bboxes(self.bboxes.values())
    }

    /// Opacities used by the next refresh and identify.
    pub fn set_opacity_info(&mut self, info: OpacityInfo) {
        self.opacity = info;
    }

    /// Current display opacities.
    pub fn opacity_info(&self) -> &OpacityInfo {
        &self.opacity
    }

    /// Redraw from `camera`, or park the request until the model is ready
    /// (a later request replaces it). Returns `true` if a frame was drawn.
    ///
    /// # Errors
    ///
    /// Propagates the renderer's frame error.
    pub fn refresh(&mut self, camera: Camera) -> Result<bool, ViewerError> {
        self.readiness
            .defer(camera)
            .map_or(Ok(false), |camera| self.draw(&camera).map(|()| true))
    }

    fn draw(&mut self, camera: &Camera) -> Result<(), ViewerError> {
        self.renderer.update_opacity(&self.opacity);
        self.renderer.redisplay(camera)
    }

    /// Start an identify at pixel `(x, y)`. Parts are pickable iff their
    /// opacity rounds to 1. Returns `false` before the model is ready or
    /// while a previous identify is unresolved.
    ///
    /// # Errors
    ///
    /// Propagates the renderer's picking error.
    pub fn identify(&mut self, x: u32, y: u32, camera: &Camera) -> Result<bool, ViewerError> {
        if !self.readiness.is_ready() {
            return Ok(false);
        }
        let picking = self.opacity.int_valued();
        self.renderer.identify(x, y, camera, &picking)
    }

    /// Result of the last identify, once the GPU has delivered it.
    pub fn poll_identify(&mut self) -> Option<PickTarget> {
        self.renderer.poll_identify()
    }

    /// Flip textured/plain shading. Returns the new state.
    pub fn toggle_colored(&mut self) -> bool {
        self.renderer.toggle_colored()
    }

    /// Forward a viewport resize.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.renderer.handle_resize(width, height);
    }

    /// Pixel position of `point` seen from `camera`, for anchoring labels.
    pub fn viewport_coords(&self, camera: &Camera, point: Vec3) -> Option<(f32, f32)> {
        let (width, height) = self.renderer.size();
        camera.project(point, width, height)
    }
}
