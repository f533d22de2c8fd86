//! Colour-ID picking.
//!
//! Every part's vertices carry a per-part ID (see
//! [`MeshBuffers`](crate::mesh::MeshBuffers)). The picking pass draws them
//! into an R32Uint target with int-valued opacities, copies the pixel under
//! the cursor to a staging buffer, and maps it asynchronously. `0` is the
//! background.
//!
//! A readback cancelled by a reset stays in flight until its map callback
//! fires; the buffer is then unmapped and the stale pixel thrown away.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::plan::PartTable;
use crate::gpu::pipeline::PICKING_FORMAT;
use crate::gpu::texture::RenderTarget;

/// Result of an identify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickTarget {
    /// Background, or an ID no loaded part owns.
    None,
    /// The named part.
    Part(String),
}

impl PickTarget {
    /// Resolve a raw ID read back from the picking target.
    pub fn resolve(table: &PartTable, raw_id: u32) -> Self {
        table
            .part_for_id(raw_id)
            .map_or(Self::None, |name| Self::Part(name.to_owned()))
    }

    /// The part name, if any.
    pub fn part(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Part(name) => Some(name),
        }
    }
}

/// `copy_texture_to_buffer` rows must be 256-byte aligned.
const STAGING_ROW_BYTES: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

const MAP_PENDING: u8 = 0;
const MAP_READY: u8 = 1;
const MAP_FAILED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Waiting,
    Discarding,
}

/// What a poll found for the in-flight readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collect {
    /// Map not reported yet.
    Pending,
    /// Mapped; read the pixel, then unmap.
    Read,
    /// Mapped after a cancel; unmap only.
    Discard,
    /// Mapping failed; nothing to unmap.
    Failed,
}

/// Staging-buffer lifecycle, shared with the `map_async` callback through
/// `outcome`.
#[derive(Debug)]
struct Readback {
    stage: Stage,
    outcome: Arc<AtomicU8>,
}

impl Readback {
    fn new() -> Self {
        Self {
            stage: Stage::Idle,
            outcome: Arc::new(AtomicU8::new(MAP_PENDING)),
        }
    }

    fn is_busy(&self) -> bool {
        self.stage != Stage::Idle
    }

    /// Arm a new readback and hand out the flag its callback reports to.
    /// `None` while the buffer is still owned by an earlier one.
    fn begin(&mut self) -> Option<Arc<AtomicU8>> {
        if self.is_busy() {
            return None;
        }
        self.stage = Stage::Waiting;
        self.outcome.store(MAP_PENDING, Ordering::SeqCst);
        Some(Arc::clone(&self.outcome))
    }

    fn cancel(&mut self) {
        if self.stage == Stage::Waiting {
            self.stage = Stage::Discarding;
        }
    }

    fn collect(&mut self) -> Collect {
        let found = match (self.stage, self.outcome.load(Ordering::SeqCst)) {
            (Stage::Idle, _) | (_, MAP_PENDING) => return Collect::Pending,
            (_, MAP_FAILED) => Collect::Failed,
            (Stage::Waiting, _) => Collect::Read,
            (Stage::Discarding, _) => Collect::Discard,
        };
        self.stage = Stage::Idle;
        found
    }
}

/// Offscreen ID target, its depth buffer, and the one-pixel readback.
pub struct Picking {
    target: RenderTarget,
    depth: RenderTarget,
    staging_buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    readback: Readback,
}

impl Picking {
    /// Allocate targets of `size` pixels.
    pub fn new(device: &wgpu::Device, size: (u32, u32)) -> Self {
        let (target, depth) = Self::create_targets(device, size);
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Picking Staging Buffer"),
            size: u64::from(STAGING_ROW_BYTES),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Self {
            target,
            depth,
            staging_buffer,
            width: size.0,
            height: size.1,
            readback: Readback::new(),
        }
    }

    fn create_targets(device: &wgpu::Device, size: (u32, u32)) -> (RenderTarget, RenderTarget) {
        (
            RenderTarget::new(
                device,
                "Picking Target",
                size,
                PICKING_FORMAT,
                wgpu::TextureUsages::COPY_SRC,
            ),
            RenderTarget::depth(device, "Picking Depth", size),
        )
    }

    /// Recreate the targets for a new viewport size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        (self.target, self.depth) = Self::create_targets(device, (width, height));
    }

    /// `true` while the staging buffer belongs to an earlier identify,
    /// including one cancelled but not yet drained.
    pub fn is_busy(&self) -> bool {
        self.readback.is_busy()
    }

    /// `true` while a cancelled readback still waits for its map callback.
    pub fn is_discarding(&self) -> bool {
        self.readback.stage == Stage::Discarding
    }

    /// Begin the ID pass. The caller draws every visible part with the
    /// picking pipeline bound.
    pub fn begin_pass<'e>(&self, encoder: &'e mut wgpu::CommandEncoder) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Picking Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
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
        })
    }

    /// Copy the pixel at `(x, y)` to the staging buffer. Returns `false`
    /// (copying nothing) if the point is off-target or a readback is in
    /// flight.
    pub fn copy_pixel(&self, encoder: &mut wgpu::CommandEncoder, (x, y): (u32, u32)) -> bool {
        if x >= self.width || y >= self.height || self.readback.is_busy() {
            return false;
        }
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(STAGING_ROW_BYTES),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        true
    }

    /// Start async readback (call after queue.submit)
    pub fn start_readback(&mut self) {
        let Some(outcome) = self.readback.begin() else {
            return;
        };
        self.staging_buffer
            .slice(..4)
            .map_async(wgpu::MapMode::Read, move |result| {
                let code = if result.is_ok() { MAP_READY } else { MAP_FAILED };
                outcome.store(code, Ordering::SeqCst);
            });
    }

    /// Collect the raw ID without blocking. `None` while the map is still
    /// pending, if nothing was requested, or if the request was cancelled.
    pub fn complete_readback(&mut self, device: &wgpu::Device) -> Option<u32> {
        if !self.readback.is_busy() {
            return None;
        }
        let _ = device.poll(wgpu::PollType::Poll);
        match self.readback.collect() {
            Collect::Pending => None,
            Collect::Read => {
                let raw_id = {
                    let data = self.staging_buffer.slice(..4).get_mapped_range();
                    bytemuck::pod_read_unaligned::<u32>(&data[..4])
                };
                self.staging_buffer.unmap();
                Some(raw_id)
            }
            Collect::Discard => {
                self.staging_buffer.unmap();
                log::debug!("discarded cancelled picking readback");
                None
            }
            Collect::Failed => {
                log::warn!("picking staging buffer failed to map");
                None
            }
        }
    }

    /// Drop an in-flight readback (model reset). The buffer stays busy until
    /// [`Picking::complete_readback`] sees the map land and unmaps it.
    pub fn cancel(&mut self) {
        self.readback.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MeshEntry, ModelInfo, StreamRange};
    use crate::codec::DecodeParams;

    fn table() -> PartTable {
        let model = ModelInfo {
            materials: Default::default(),
            decode_params: DecodeParams::new(vec![0.0; 3], vec![1.0; 3]).unwrap(),
            urls: Default::default(),
            layers: Vec::new(),
            texture_path: String::new(),
            format: Default::default(),
        };
        let entry = MeshEntry {
            material: "neuron".into(),
            attrib_range: StreamRange { start: 0, length: 0 },
            index_range: StreamRange { start: 0, length: 0 },
            bboxes: 0,
            names: vec!["AVAL".into(), "AVAR".into()],
            lengths: vec![3, 3],
        };
        let mut table = PartTable::new(1);
        let _ = table.add_mesh(&entry, &model, &[]).unwrap();
        table
    }

    fn land(readback: &Readback, code: u8) {
        readback.outcome.store(code, Ordering::SeqCst);
    }

    #[test]
    fn readback_reports_once_mapped() {
        let mut readback = Readback::new();
        assert_eq!(readback.collect(), Collect::Pending);
        let outcome = readback.begin().unwrap();
        assert!(readback.is_busy());
        assert!(readback.begin().is_none());
        assert_eq!(readback.collect(), Collect::Pending);

        outcome.store(MAP_READY, Ordering::SeqCst);
        assert_eq!(readback.collect(), Collect::Read);
        assert!(!readback.is_busy());
    }

    #[test]
    fn cancelled_readback_stays_busy_until_drained() {
        let mut readback = Readback::new();
        let _ = readback.begin().unwrap();
        readback.cancel();
        assert!(readback.is_busy());
        assert!(readback.begin().is_none());
        assert_eq!(readback.collect(), Collect::Pending);

        land(&readback, MAP_READY);
        assert_eq!(readback.collect(), Collect::Discard);
        assert!(!readback.is_busy());

        // The stale completion must not answer the next request.
        let _ = readback.begin().unwrap();
        assert_eq!(readback.collect(), Collect::Pending);
        land(&readback, MAP_READY);
        assert_eq!(readback.collect(), Collect::Read);
    }

    #[test]
    fn failed_map_frees_the_buffer() {
        let mut readback = Readback::new();
        let _ = readback.begin().unwrap();
        land(&readback, MAP_FAILED);
        assert_eq!(readback.collect(), Collect::Failed);
        assert!(!readback.is_busy());

        readback.cancel();
        assert!(!readback.is_busy());
    }

    #[test]
    fn background_resolves_to_none() {
        assert_eq!(PickTarget::resolve(&table(), 0), PickTarget::None);
    }

    #[test]
    fn ids_resolve_to_part_names() {
        let table = table();
        assert_eq!(PickTarget::resolve(&table, 2).part(), Some("AVAR"));
        assert_eq!(PickTarget::resolve(&table, 1), PickTarget::Part("AVAL".into()));
        assert_eq!(PickTarget::resolve(&table, 99), PickTarget::None);
    }
}
