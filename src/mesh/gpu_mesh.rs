//! GPU-resident mesh: vertex, index, bounding-box, and colour-index buffers
//! plus the draw calls that walk them.
//!
//! Draw submission goes through [`DrawSink`] so the span logic is shared by
//! the colour pass, the picking pass, and tests.

use std::ops::Range;

use wgpu::util::DeviceExt;

use super::bbox::{self, BBox};
use super::buffers::MeshBuffers;
use super::draw_range::DisplayList;

/// Anything that can record an indexed draw over the currently bound mesh.
pub trait DrawSink {
    /// Draw the triangles in `indices` of the bound index buffer.
    fn draw_indexed(&mut self, indices: Range<u32>);
}

impl DrawSink for wgpu::RenderPass<'_> {
    fn draw_indexed(&mut self, indices: Range<u32>) {
        Self::draw_indexed(self, indices, 0, 0..1);
    }
}

/// Issue one draw over `[offset, offset + length)`, defaulting to the whole
/// buffer. A zero length issues nothing; the span is clipped to
/// `index_count`.
pub fn draw_range(
    sink: &mut impl DrawSink,
    index_count: u32,
    length: Option<u32>,
    offset: Option<u32>,
) {
    let offset = offset.unwrap_or(0).min(index_count);
    let length = length.unwrap_or(index_count - offset);
    let end = offset.saturating_add(length).min(index_count);
    if end > offset {
        sink.draw_indexed(offset..end);
    }
}

/// Issue one draw per span of `list`, in order.
pub fn draw_spans(sink: &mut impl DrawSink, index_count: u32, list: &DisplayList) {
    for span in list.spans() {
        draw_range(sink, index_count, Some(span.end - span.start), Some(span.start));
    }
}

/// Vertex buffer slot holding the interleaved attributes.
pub const ATTRIB_SLOT: u32 = 0;
/// Vertex buffer slot holding the per-vertex part ID during picking.
pub const COLOR_INDEX_SLOT: u32 = 1;
/// Bind group index of the material texture/uniform group.
pub const MATERIAL_GROUP: u32 = 1;

/// A mesh entry uploaded to the GPU. Owns its buffers; release them with
/// [`GpuMesh::destroy`] on model teardown.
pub struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    bbox_buffer: Option<wgpu::Buffer>,
    color_index_buffer: Option<wgpu::Buffer>,
    material_bind_group: Option<wgpu::BindGroup>,
    index_count: u32,
    vertex_count: u32,
    part_bboxes: Vec<BBox>,
    bounds: Option<BBox>,
}

impl GpuMesh {
    /// Upload `buffers`. `label` names the GPU resources for debugging.
    pub fn upload(device: &wgpu::Device, label: &str, buffers: &MeshBuffers) -> Self {
        let vertex_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertices")),
                contents: bytemuck::cast_slice(&buffers.attribs),
                usage: wgpu::BufferUsages::VERTEX,
            });

        // Uint16 data is padded to the copy alignment by create_buffer_init.
        let index_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Indices")),
                contents: bytemuck::cast_slice(&buffers.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let bbox_floats = buffers.bbox_floats();
        let bbox_buffer = (!bbox_floats.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Bounding Boxes")),
                contents: bytemuck::cast_slice(&bbox_floats),
                usage: wgpu::BufferUsages::STORAGE,
            })
        });

        let color_index_buffer = buffers
            .color_indices
            .as_ref()
            .filter(|colors| !colors.is_empty())
            .map(|colors| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label} Color Indices")),
                    contents: bytemuck::cast_slice(colors),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            });

        Self {
            vertex_buffer,
            index_buffer,
            bbox_buffer,
            color_index_buffer,
            material_bind_group: None,
            index_count: buffers.index_count(),
            vertex_count: buffers.vertex_count() as u32,
            part_bboxes: buffers.bboxes.clone(),
            bounds: bbox::union(&buffers.bboxes),
        }
    }

    /// Attach the texture/material bind group used by the colour pass.
    pub fn set_material_bind_group(&mut self, bind_group: wgpu::BindGroup) {
        self.material_bind_group = Some(bind_group);
    }

    /// `true` once a material bind group is attached.
    pub fn has_material(&self) -> bool {
        self.material_bind_group.is_some()
    }

    /// `true` if the mesh carries a colour-index stream for picking.
    pub fn is_pickable(&self) -> bool {
        self.color_index_buffer.is_some()
    }

    /// Bind buffers for drawing. The colour pass binds the material group;
    /// the picking pass binds the colour-index stream instead.
    ///
    /// Returns `false` (and binds nothing) if the mesh cannot be drawn in the
    /// requested mode.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, for_picking: bool) -> bool {
        if self.index_count == 0 {
            return false;
        }
        if for_picking {
            let Some(colors) = &self.color_index_buffer else {
                return false;
            };
            pass.set_vertex_buffer(COLOR_INDEX_SLOT, colors.slice(..));
        } else {
            let Some(material) = &self.material_bind_group else {
                return false;
            };
            pass.set_bind_group(MATERIAL_GROUP, material, &[]);
        }
        pass.set_vertex_buffer(ATTRIB_SLOT, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        true
    }

    /// Draw `[offset, offset + length)` of the bound mesh, defaulting to
    /// everything. A zero length issues no GPU call.
    pub fn draw(&self, sink: &mut impl DrawSink, length: Option<u32>, offset: Option<u32>) {
        draw_range(sink, self.index_count, length, offset);
    }

    /// Draw each span of `list`, in order.
    pub fn draw_list(&self, sink: &mut impl DrawSink, list: &DisplayList) {
        draw_spans(sink, self.index_count, list);
    }

    /// Bind and draw the full mesh.
    pub fn bind_and_draw(&self, pass: &mut wgpu::RenderPass<'_>, for_picking: bool) {
        if self.bind(pass, for_picking) {
            self.draw(pass, None, None);
        }
    }

    /// Total indices in the index buffer.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Total vertices in the vertex buffer.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Per-part bounding boxes, in entry order.
    pub fn part_bboxes(&self) -> &[BBox] {
        &self.part_bboxes
    }

    /// Union of the part boxes.
    pub fn bounds(&self) -> Option<BBox> {
        self.bounds
    }

    /// GPU buffer sizes: `(label, bytes)`.
    pub fn buffer_info(&self) -> Vec<(&'static str, u64)> {
        let mut info = vec![
            ("Vertices", self.vertex_buffer.size()),
            ("Indices", self.index_buffer.size()),
        ];
        if let Some(b) = &self.bbox_buffer {
            info.push(("Bounding Boxes", b.size()));
        }
        if let Some(b) = &self.color_index_buffer {
            info.push(("Color Indices", b.size()));
        }
        info
    }

    /// Release every GPU buffer now rather than when the last reference to
    /// them is dropped.
    pub fn destroy(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        if let Some(b) = self.bbox_buffer {
            b.destroy();
        }
        if let Some(b) = self.color_index_buffer {
            b.destroy();
        }
    }
}
