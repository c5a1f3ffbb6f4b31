//! Texture loading and data structures.
//! Decodes PNG/JPEG into 8-bit RGB or RGBA and builds mip chains for upload.

use std::path::Path;

use image::{DynamicImage, RgbaImage, imageops::FilterType};

use crate::error::{AssetError, AssetResult};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    /// Opaque, three bytes per pixel.
    Rgb8,
    /// Alpha capable, four bytes per pixel.
    Rgba8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, TextureFormat::Rgba8)
    }
}

/// One level of a mip chain, always RGBA8.
#[derive(Clone, Debug, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Number of levels down to 1x1: `floor(log2(max(w, h))) + 1`.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Size in bytes of a `width x height` image, computed without `u32` overflow.
pub fn byte_len(width: u32, height: u32, bytes_per_pixel: u32) -> usize {
    width as usize * height as usize * bytes_per_pixel as usize
}

impl TextureData {
    /// Load texture from an image file. Four-channel sources keep their alpha.
    pub fn load<P: AsRef<Path>>(path: P) -> AssetResult<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path).map_err(|source| match source {
            image::ImageError::IoError(e) => AssetError::io(path, e),
            source => AssetError::Image {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let texture = Self::from_image(img);

        log::info!(
            "Loaded texture {}x{} ({:?}) with {} bytes",
            texture.width,
            texture.height,
            texture.format,
            texture.data.len()
        );
        Ok(texture)
    }

    /// Convert a decoded image, keeping alpha only for four-channel sources.
    pub fn from_image(img: DynamicImage) -> Self {
        if img.color().channel_count() == 4 {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            Self::new(width, height, TextureFormat::Rgba8, rgba.into_raw())
        } else {
            let rgb = img.to_rgb8();
            let (width, height) = rgb.dimensions();
            Self::new(width, height, TextureFormat::Rgb8, rgb.into_raw())
        }
    }

    fn new(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            data.len(),
            byte_len(width, height, format.bytes_per_pixel()),
            "Data size doesn't match texture format"
        );
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// 1x1 texture for materials without `map_Kd`.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self::new(1, 1, TextureFormat::Rgba8, rgba.to_vec())
    }

    /// Create a simple test texture (checkerboard pattern).
    pub fn create_test_texture(size: u32) -> Self {
        let mut data = Vec::with_capacity(byte_len(size, size, 4));

        for y in 0..size {
            for x in 0..size {
                let checker = ((x / 8) + (y / 8)) % 2;
                if checker == 0 {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                } else {
                    data.extend_from_slice(&[128, 128, 128, 255]);
                }
            }
        }

        Self::new(size, size, TextureFormat::Rgba8, data)
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        self.format.bytes_per_pixel()
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size = byte_len(self.width, self.height, self.bytes_per_pixel());
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }

    /// Tightly packed RGBA8 pixels; RGB sources get an opaque alpha.
    pub fn to_rgba8(&self) -> Vec<u8> {
        match self.format {
            TextureFormat::Rgba8 => self.data.clone(),
            TextureFormat::Rgb8 => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
        }
    }

    pub fn mip_level_count(&self) -> u32 {
        mip_level_count(self.width, self.height)
    }

    /// Full mip pyramid in RGBA8, level 0 first, halving down to 1x1.
    pub fn mip_chain(&self) -> Vec<MipLevel> {
        let base = MipLevel {
            width: self.width,
            height: self.height,
            rgba: self.to_rgba8(),
        };
        let Some(base_image) = RgbaImage::from_raw(base.width, base.height, base.rgba.clone())
        else {
            return vec![base];
        };

        let mut levels = vec![base];
        let (mut w, mut h) = (self.width, self.height);
        for _ in 1..self.mip_level_count() {
            w = (w / 2).max(1);
            h = (h / 2).max(1);
            let scaled = image::imageops::resize(&base_image, w, h, FilterType::Triangle);
            levels.push(MipLevel {
                width: w,
                height: h,
                rgba: scaled.into_raw(),
            });
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    #[test]
    fn level_counts() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 64), 9);
        assert_eq!(mip_level_count(300, 5), 9);
    }

    #[test]
    fn rgb_source_is_opaque() {
        let img = ImageBuffer::from_pixel(2, 2, Rgb([10u8, 20, 30]));
        let tex = TextureData::from_image(DynamicImage::ImageRgb8(img));
        assert_eq!(tex.format, TextureFormat::Rgb8);
        assert!(!tex.format.has_alpha());
        assert!(tex.is_valid());
        assert_eq!(&tex.to_rgba8()[..4], &[10, 20, 30, 255]);
        assert_eq!(tex.to_rgba8().len(), 16);
    }

    #[test]
    fn rgba_source_keeps_alpha() {
        let img = ImageBuffer::from_pixel(4, 2, Rgba([1u8, 2, 3, 4]));
        let tex = TextureData::from_image(DynamicImage::ImageRgba8(img));
        assert_eq!(tex.format, TextureFormat::Rgba8);
        assert_eq!(&tex.to_rgba8()[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn mip_chain_halves_to_one_pixel() {
        let tex = TextureData::create_test_texture(16);
        let chain = tex.mip_chain();
        assert_eq!(chain.len(), 5);
        let sizes: Vec<(u32, u32)> = chain.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(16, 16), (8, 8), (4, 4), (2, 2), (1, 1)]);
        assert!(chain.iter().all(|l| l.rgba.len() == byte_len(l.width, l.height, 4)));
    }

    #[test]
    fn byte_len_does_not_wrap() {
        assert_eq!(byte_len(65_536, 65_536, 4), 17_179_869_184);
        assert_eq!(byte_len(3, 2, 3), 18);
    }

    #[test]
    fn solid_texture_is_single_level() {
        let tex = TextureData::solid([255; 4]);
        assert!(tex.is_valid());
        assert_eq!(tex.mip_chain().len(), 1);
    }

    #[test]
    fn missing_file_fails() {
        assert!(TextureData::load("no/such/texture.png").is_err());
    }
}
