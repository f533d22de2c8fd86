//! Per-draw uniforms addressed by dynamic offset.
//!
//! Each planned draw gets one slot holding its opacity and the colour mode.
//! Slots sit at the device's minimum uniform offset alignment, so a single
//! bind group serves every draw of a frame. The buffer grows 2x when a frame
//! needs more slots and never shrinks.

/// One draw's uniform block; matches `Draw` in `part_mesh.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    /// Output alpha.
    pub opacity: f32,
    /// 1.0 to shade with the material's texture, 0.0 for plain white.
    pub colored: f32,
    pub(crate) _pad: [f32; 2],
}

impl DrawUniform {
    /// Uniform for one draw at `opacity`.
    pub fn new(opacity: f32, colored: bool) -> Self {
        Self {
            opacity,
            colored: if colored { 1.0 } else { 0.0 },
            _pad: [0.0; 2],
        }
    }
}

/// Slot stride used when the device does not say otherwise.
pub const DEFAULT_STRIDE: u32 = 256;

/// Lay out one [`DrawUniform`] per opacity at `stride`-byte intervals.
pub fn pack_slots(opacities: &[f32], colored: bool, stride: u32) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; opacities.len() * stride];
    for (slot, &opacity) in bytes.chunks_exact_mut(stride).zip(opacities) {
        let uniform = DrawUniform::new(opacity, colored);
        let src = bytemuck::bytes_of(&uniform);
        slot[..src.len()].copy_from_slice(src);
    }
    bytes
}

/// Growable uniform buffer of per-draw slots plus its bind group (group 2).
pub struct DrawUniforms {
    buffer: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    stride: u32,
    capacity: usize,
    len: usize,
}

impl DrawUniforms {
    /// Allocate room for `initial_slots` draws.
    pub fn new(device: &wgpu::Device, initial_slots: usize) -> Self {
        let stride = device
            .limits()
            .min_uniform_buffer_offset_alignment
            .max(size_of::<DrawUniform>() as u32);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        size_of::<DrawUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let capacity = initial_slots.max(16);
        let buffer = Self::create_buffer(device, stride, capacity);
        let bind_group = Self::create_bind_group(device, &layout, &buffer);
        Self {
            buffer,
            layout,
            bind_group,
            stride,
            capacity,
            len: 0,
        }
    }

    fn create_buffer(device: &wgpu::Device, stride: u32, slots: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size: u64::from(stride) * slots as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniform Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(size_of::<DrawUniform>() as u64),
                }),
            }],
        })
    }

    /// Upload one slot per opacity, growing the buffer if needed.
    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        opacities: &[f32],
        colored: bool,
    ) {
        if opacities.len() > self.capacity {
            self.capacity = (opacities.len() * 2).max(self.capacity + 16);
            self.buffer = Self::create_buffer(device, self.stride, self.capacity);
            self.bind_group = Self::create_bind_group(device, &self.layout, &self.buffer);
            log::debug!("draw uniforms grown to {} slots", self.capacity);
        }
        if !opacities.is_empty() {
            queue.write_buffer(&self.buffer, 0, &pack_slots(opacities, colored, self.stride));
        }
        self.len = opacities.len();
    }

    /// Bind slot `index` at group `group`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, group: u32, index: usize) {
        pass.set_bind_group(group, &self.bind_group, &[self.offset(index)]);
    }

    /// Dynamic offset of slot `index`.
    pub fn offset(&self, index: usize) -> u32 {
        index as u32 * self.stride
    }

    /// Layout for pipeline creation.
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Slots written by the last [`DrawUniforms::write`].
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the last write had no draws.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
