// texture.rs
use std::path::Path;

use anyhow::anyhow;

/// A decoded image, always expanded to four 8-bit channels.
#[derive(Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Channels present in the file before expansion to RGBA.
    pub component_count: u8,
    pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path).map_err(|e| anyhow!("failed to open image {:?}: {}", path, e))?;
        let component_count = image.color().channel_count();
        let rgba = image.to_rgba8();
        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            component_count,
            pixels: rgba.into_raw(),
        })
    }

    /// Decodes `path`, or logs why it could not and returns a 1x1 transparent black image.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(image) => {
                log::info!("Texture {:?} loaded: {}x{}, {} components", path, image.width, image.height, image.component_count);
                image
            }
            Err(e) => {
                log::error!("ERROR: Texture not loaded: {e:#}");
                Self::empty()
            }
        }
    }

    pub fn empty() -> Self {
        Self { width: 1, height: 1, component_count: 4, pixels: vec![0; 4] }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn size(&self) -> wgpu::Extent3d {
        wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 }
    }

    /// Frees the pixel buffer. Consumes the image, so it can only happen once.
    pub fn release(self) {
        log::debug!("Releasing {} bytes of decoded image data", self.pixels.len());
        drop(self.pixels);
    }
}

/// The cube's texture as bound in the fragment shader: image, view and sampler.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn from_image(device: &wgpu::Device, queue: &wgpu::Queue, image: &DecodedImage, clamp_to_border: bool) -> Self {
        let size = image.size();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Cube Texture"), size, mip_level_count: 1, sample_count: 1,
            dimension: wgpu::TextureDimension::D2, format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST, view_formats: &[],
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&sampler_descriptor(clamp_to_border));
        Self { texture, view, sampler }
    }

    pub fn destroy(self) {
        self.texture.destroy();
    }
}

/// Nearest when minifying, linear when magnifying, transparent black outside [0, 1].
pub fn sampler_descriptor(clamp_to_border: bool) -> wgpu::SamplerDescriptor<'static> {
    let (address_mode, border_color) = if clamp_to_border {
        (wgpu::AddressMode::ClampToBorder, Some(wgpu::SamplerBorderColor::TransparentBlack))
    } else {
        (wgpu::AddressMode::ClampToEdge, None)
    };

    wgpu::SamplerDescriptor {
        label: Some("Cube Sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        border_color,
        ..Default::default()
    }
}
