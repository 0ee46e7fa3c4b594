//! Fast image decoding and resizing for fingerprints.
//!
//! JPEGs go through zune-jpeg; everything else falls back to the image
//! crate. Resizing uses fast_image_resize (SIMD) since fingerprints only
//! need a tiny grayscale grid.

use crate::error::DedupeError;
use fast_image_resize::{images::Image, PixelType, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage, ImageBuffer, Rgb};
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Decode an image from a file path using the fastest available decoder.
pub fn decode_image(path: &Path) -> Result<DynamicImage, DedupeError> {
    let is_jpeg = matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg")
    );

    if is_jpeg {
        match decode_jpeg(path) {
            Ok(image) => return Ok(image),
            Err(_) => { /* fall through to the generic decoder */ }
        }
    }

    image::open(path).map_err(|e| DedupeError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn decode_jpeg(path: &Path) -> Result<DynamicImage, DedupeError> {
    let bytes = std::fs::read(path).map_err(|e| DedupeError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(&bytes, options);

    let pixels = decoder.decode().map_err(|e| DedupeError::Decode {
        path: path.to_path_buf(),
        reason: format!("{:?}", e),
    })?;

    let info = decoder.info().ok_or_else(|| DedupeError::Decode {
        path: path.to_path_buf(),
        reason: "missing image info".to_string(),
    })?;

    let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(info.width as u32, info.height as u32, pixels).ok_or_else(|| {
            DedupeError::Decode {
                path: path.to_path_buf(),
                reason: "pixel buffer size mismatch".to_string(),
            }
        })?;

    Ok(DynamicImage::ImageRgb8(buffer))
}

/// Resize to a small grayscale grid for fingerprinting.
pub fn resize_to_grayscale(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<GrayImage, DedupeError> {
    let gray = image.to_luma8();
    let (src_width, src_height) = (gray.width(), gray.height());

    if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
        return Err(DedupeError::Decode {
            path: Default::default(),
            reason: "zero-sized image".to_string(),
        });
    }

    let src = Image::from_vec_u8(src_width, src_height, gray.into_raw(), PixelType::U8)
        .map_err(|e| DedupeError::Decode {
            path: Default::default(),
            reason: e.to_string(),
        })?;

    let mut dst = Image::new(width, height, PixelType::U8);

    let options = ResizeOptions::new().resize_alg(fast_image_resize::ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));

    Resizer::new()
        .resize(&src, &mut dst, &options)
        .map_err(|e| DedupeError::Decode {
            path: Default::default(),
            reason: e.to_string(),
        })?;

    ImageBuffer::from_raw(width, height, dst.into_vec()).ok_or_else(|| DedupeError::Decode {
        path: Default::default(),
        reason: "resize buffer size mismatch".to_string(),
    })
}
