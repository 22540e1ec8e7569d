//! PNG encoding and writing of rendered pages.

use crate::config::{RenderConfig, RenderedPage};
use crate::error::{ConversionError, Result};
use image::RgbaImage;
use std::io::Cursor;
use std::path::Path;

/// Map a 0-9 compression level onto the png crate's presets.
fn compression_for_level(level: u8) -> png::Compression {
    match level {
        0..=2 => png::Compression::Fast,
        3..=6 => png::Compression::Default,
        _ => png::Compression::Best,
    }
}

/// Encode an image to PNG bytes.
pub fn encode_png(image: &RgbaImage, compression: u8) -> std::result::Result<Vec<u8>, String> {
    let mut buffer = Cursor::new(Vec::new());

    let mut encoder = png::Encoder::new(&mut buffer, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(compression_for_level(compression));

    let mut writer = encoder
        .write_header()
        .map_err(|e| format!("Failed to write PNG header: {}", e))?;

    writer
        .write_image_data(image.as_raw())
        .map_err(|e| format!("Failed to write PNG data: {}", e))?;

    drop(writer);

    Ok(buffer.into_inner())
}

/// Blend transparent pixels onto a solid background.
pub fn apply_background(mut image: RgbaImage, (r, g, b): (u8, u8, u8)) -> RgbaImage {
    for pixel in image.pixels_mut() {
        let alpha = pixel[3] as f32 / 255.0;
        if alpha < 1.0 {
            let inv_alpha = 1.0 - alpha;
            pixel[0] = ((pixel[0] as f32 * alpha) + (r as f32 * inv_alpha)) as u8;
            pixel[1] = ((pixel[1] as f32 * alpha) + (g as f32 * inv_alpha)) as u8;
            pixel[2] = ((pixel[2] as f32 * alpha) + (b as f32 * inv_alpha)) as u8;
            pixel[3] = 255;
        }
    }

    image
}

/// Flatten (unless alpha is kept), encode, and write one page to `path`.
///
/// The parent directory must already exist.
pub fn write_png(
    path: &Path,
    page_index: usize,
    image: RgbaImage,
    config: &RenderConfig,
) -> Result<RenderedPage> {
    let image = if config.use_alpha {
        image
    } else {
        apply_background(image, config.background_color)
    };

    let data = encode_png(&image, config.png_compression).map_err(|message| {
        ConversionError::EncodingFailure {
            path: path.to_path_buf(),
            message,
        }
    })?;

    std::fs::write(path, &data).map_err(|e| ConversionError::EncodingFailure {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(RenderedPage {
        page_number: page_index + 1,
        width: image.width(),
        height: image.height(),
        bytes_written: data.len(),
    })
}
