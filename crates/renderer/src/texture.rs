//! GPU textures: RGBA8 sRGB with a full mip chain and a repeating,
//! trilinear sampler.

use asset::TextureData;
use wgpu::{
    AddressMode, Device, Extent3d, FilterMode, Queue, Sampler, SamplerDescriptor, Texture,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
};

use crate::RenderError;

pub const DIFFUSE_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

pub struct GpuTexture {
    texture: Texture,
    pub view: TextureView,
    pub sampler: Sampler,
}

impl GpuTexture {
    pub fn upload(
        device: &Device,
        queue: &Queue,
        data: &TextureData,
        label: &str,
    ) -> Result<Self, RenderError> {
        check_texture_size(label, data.width, data.height, device.limits().max_texture_dimension_2d)?;
        let levels = data.mip_chain();
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width: data.width.max(1),
                height: data.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: DIFFUSE_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &level.rgba,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level.width),
                    rows_per_image: Some(level.height),
                },
                Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&sampler_descriptor(label));

        log::debug!(
            "Uploaded texture {} {}x{} with {} mip levels (alpha: {})",
            label,
            data.width,
            data.height,
            levels.len(),
            data.format.has_alpha()
        );

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    pub(crate) fn destroy(&self) {
        self.texture.destroy();
    }
}

/// Both sides must fit in the device's `max_texture_dimension_2d`.
pub fn check_texture_size(label: &str, width: u32, height: u32, max: u32) -> Result<(), RenderError> {
    if width > max || height > max {
        return Err(RenderError::TextureTooLarge {
            label: label.to_owned(),
            width,
            height,
            max,
        });
    }
    Ok(())
}

/// Repeat wrapping, linear magnification, linear-mipmap-linear minification.
pub fn sampler_descriptor(label: &str) -> SamplerDescriptor<'_> {
    SamplerDescriptor {
        label: Some(label),
        address_mode_u: AddressMode::Repeat,
        address_mode_v: AddressMode::Repeat,
        address_mode_w: AddressMode::Repeat,
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        mipmap_filter: FilterMode::Linear,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_is_trilinear_repeat() {
        let desc = sampler_descriptor("felt");
        assert_eq!(desc.address_mode_u, AddressMode::Repeat);
        assert_eq!(desc.address_mode_v, AddressMode::Repeat);
        assert_eq!(desc.min_filter, FilterMode::Linear);
        assert_eq!(desc.mipmap_filter, FilterMode::Linear);
        assert_eq!(desc.mag_filter, FilterMode::Linear);
    }

    #[test]
    fn oversized_texture_is_rejected() {
        let max = wgpu::Limits::downlevel_webgl2_defaults().max_texture_dimension_2d;
        assert!(check_texture_size("felt", max, max, max).is_ok());
        match check_texture_size("felt", max + 1, 4, max) {
            Err(RenderError::TextureTooLarge { label, width, height, max: limit }) => {
                assert_eq!(label, "felt");
                assert_eq!((width, height, limit), (max + 1, 4, max));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(check_texture_size("felt", 1, max + 1, max).is_err());
    }
}
