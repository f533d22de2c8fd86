//! Device, queue, and the target frames are drawn into.
//!
//! A context either presents to a window surface or, when built from an
//! embedder's device, renders offscreen at a fixed format. Either way the
//! size lives in a [`TargetSize`].

use std::fmt;

/// Why the GPU could not be brought up.
#[derive(Debug)]
pub enum RenderContextError {
    /// The window handle could not back a surface.
    Surface(wgpu::CreateSurfaceError),
    /// No adapter can drive the surface.
    Adapter(wgpu::RequestAdapterError),
    /// The adapter refused the device descriptor.
    Device(wgpu::RequestDeviceError),
    /// The adapter reports no configuration for the surface.
    Unsupported,
}

impl fmt::Display for RenderContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(e) => write!(f, "cannot create window surface: {e}"),
            Self::Adapter(e) => write!(f, "no usable GPU adapter: {e}"),
            Self::Device(e) => write!(f, "GPU device unavailable: {e}"),
            Self::Unsupported => f.write_str("adapter cannot present to this surface"),
        }
    }
}

impl std::error::Error for RenderContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Surface(e) => Some(e),
            Self::Adapter(e) => Some(e),
            Self::Device(e) => Some(e),
            Self::Unsupported => None,
        }
    }
}

/// Pixel size of the render target. Zero-sized updates (a minimised
/// window) are ignored so the target never degenerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    width: u32,
    height: u32,
}

impl TargetSize {
    /// Size clamped to at least one pixel per side.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Adopt `(width, height)` if both are non-zero and differ from the
    /// current size. Returns whether anything changed.
    pub fn update(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == self.get() {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    /// `(width, height)`.
    pub const fn get(self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Width over height.
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

struct WindowSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

/// GPU device and queue plus the frame target.
pub struct RenderContext {
    /// The wgpu logical device.
    pub device: wgpu::Device,
    /// The wgpu command queue.
    pub queue: wgpu::Queue,
    /// `None` when rendering offscreen.
    window: Option<WindowSurface>,
    format: wgpu::TextureFormat,
    size: TargetSize,
}

impl RenderContext {
    /// Bring up an adapter and device able to present to `window`.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderContextError`] for whichever step failed.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        (width, height): (u32, u32),
    ) -> Result<Self, RenderContextError> {
        let size = TargetSize::new(width, height);
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(RenderContextError::Surface)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::Adapter)?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Anatomy Viewer Device"),
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::Device)?;

        let (w, h) = size.get();
        let mut config = surface
            .get_default_config(&adapter, w, h)
            .ok_or(RenderContextError::Unsupported)?;
        config.present_mode = wgpu::PresentMode::Fifo;
        surface.configure(&device, &config);
        log::info!(
            "presenting via {:?} as {:?} at {w}x{h}",
            adapter.get_info().backend,
            config.format
        );

        Ok(Self {
            device,
            queue,
            format: config.format,
            window: Some(WindowSurface { surface, config }),
            size,
        })
    }

    /// Wrap a device the embedder owns. Frames go to an offscreen target of
    /// `format`; nothing is presented.
    #[must_use]
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        (width, height): (u32, u32),
    ) -> Self {
        Self {
            device,
            queue,
            window: None,
            format,
            size: TargetSize::new(width, height),
        }
    }

    /// Colour format frames are rendered in.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Current target size in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    /// Width over height of the current target.
    pub fn aspect(&self) -> f32 {
        self.size.aspect()
    }

    /// Track a new viewport size, reconfiguring the surface if there is one.
    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.size.update(width, height) {
            return;
        }
        if let Some(window) = &mut self.window {
            window.config.width = width;
            window.config.height = height;
            window.surface.configure(&self.device, &window.config);
        }
    }

    /// Next swapchain texture.
    ///
    /// # Errors
    ///
    /// Returns [`wgpu::SurfaceError`] from the surface, or
    /// [`wgpu::SurfaceError::Lost`] for an offscreen context.
    pub fn get_next_frame(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.window
            .as_ref()
            .map_or(Err(wgpu::SurfaceError::Lost), |w| w.surface.get_current_texture())
    }

    /// `true` when frames are presented to a window.
    pub fn has_surface(&self) -> bool {
        self.window.is_some()
    }

    /// Fresh command encoder.
    pub fn create_encoder(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            })
    }

    /// Finish `encoder` and queue it.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
    }
}
