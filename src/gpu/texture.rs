//! Material textures, the URL-keyed texture cache, and render targets.
//!
//! A texture requested by URL is created immediately as a 1x1 white
//! placeholder so meshes can draw before the image arrives. When the bytes
//! land, [`TextureCache::fulfill`] replaces it; bytes that fail to decode
//! leave the white placeholder in place.

use rustc_hash::FxHashMap;

use crate::catalog::FALLBACK_COLOR;
use crate::error::ViewerError;

/// Decode PNG/JPEG bytes to tightly packed RGBA8.
///
/// # Errors
///
/// Returns [`ViewerError::Format`] if the image cannot be decoded.
pub fn decode_rgba(bytes: &[u8]) -> Result<(u32, u32, Vec<u8>), ViewerError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ViewerError::Format(format!("texture decode failed: {e}")))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok((width, height, image.into_raw()))
}

/// Number of mip levels for a `width` x `height` texture.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Box-filter an RGBA8 image to half size (rounding dimensions down, never
/// below 1).
pub fn downsample_rgba(width: u32, height: u32, pixels: &[u8]) -> (u32, u32, Vec<u8>) {
    let (w, h) = ((width / 2).max(1), (height / 2).max(1));
    let mut out = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            for c in 0..4 {
                let mut sum = 0u32;
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let sx = (x * 2 + dx).min(width - 1);
                    let sy = (y * 2 + dy).min(height - 1);
                    sum += u32::from(pixels[((sy * width + sx) * 4 + c) as usize]);
                }
                out.push(((sum + 2) / 4) as u8);
            }
        }
    }
    (w, h, out)
}

/// A sampled 2D texture and its default view.
pub struct Texture {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Upload an RGBA8 image with a full box-filtered mip chain.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Self {
        let mip_levels = mip_level_count(width, height);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let mut level = (width, height, pixels.to_vec());
        for mip_level in 0..mip_levels {
            let (w, h, ref data) = level;
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
            if mip_level + 1 < mip_levels {
                level = downsample_rgba(w, h, data);
            }
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// 1x1 texture of a single colour.
    pub fn flat(device: &wgpu::Device, queue: &wgpu::Queue, color: [u8; 3]) -> Self {
        let [r, g, b] = color;
        Self::from_rgba(device, queue, "Flat Texture", 1, 1, &[r, g, b, 255])
    }

    /// Decode and upload image bytes, falling back to flat white (with a
    /// warning) if they do not decode.
    pub fn from_image_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        bytes: &[u8],
    ) -> Self {
        match decode_rgba(bytes) {
            Ok((width, height, pixels)) => {
                Self::from_rgba(device, queue, label, width, height, &pixels)
            }
            Err(e) => {
                log::warn!("{label}: {e}; using flat white");
                Self::flat(device, queue, FALLBACK_COLOR)
            }
        }
    }
}

/// Textures by URL. Each URL is fetched at most once per session; the
/// placeholder is shared until the real image arrives.
#[derive(Default)]
pub struct TextureCache {
    textures: FxHashMap<String, Texture>,
    pending: Vec<String>,
}

impl TextureCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The texture for `url`, creating a white placeholder and queueing the
    /// URL for fetch on first request.
    pub fn request(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, url: &str) -> &Texture {
        if !self.textures.contains_key(url) {
            self.pending.push(url.to_owned());
        }
        self.textures
            .entry(url.to_owned())
            .or_insert_with(|| Texture::flat(device, queue, FALLBACK_COLOR))
    }

    /// URLs requested but not yet fulfilled, oldest first. The host fetches
    /// these and calls [`TextureCache::fulfill`].
    pub fn take_pending(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }

    /// Replace the placeholder for `url` with the decoded image. Returns the
    /// new texture, or `None` if `url` was never requested.
    pub fn fulfill(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        url: &str,
        bytes: &[u8],
    ) -> Option<&Texture> {
        let slot = self.textures.get_mut(url)?;
        *slot = Texture::from_image_bytes(device, queue, url, bytes);
        log::debug!("texture '{url}' loaded");
        Some(slot)
    }

    /// Cached texture for `url`, if requested.
    pub fn get(&self, url: &str) -> Option<&Texture> {
        self.textures.get(url)
    }

    /// Number of cached URLs.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// `true` if nothing has been requested.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// An offscreen attachment and its default view.
pub struct RenderTarget {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    /// Create a `width` x `height` attachment. `usage` is added to
    /// `RENDER_ATTACHMENT`.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Depth32Float attachment.
    pub fn depth(device: &wgpu::Device, label: &str, size: (u32, u32)) -> Self {
        Self::new(
            device,
            label,
            size,
            wgpu::TextureFormat::Depth32Float,
            wgpu::TextureUsages::empty(),
        )
    }
}
