// SPDX-License-Identifier: AGPL-3.0-only

//! BMP input and output
//!
//! Reads 24- and 32-bit files into `[1, h, w, c]` f32 tensors in `[0, 1]`,
//! channels in RGB(A) order, row 0 at the top. Writes 24-bit files: alpha
//! is dropped and tensors with fewer than three channels are written as
//! grey.

use anyhow::{anyhow, bail, Context, Result};
use image::{ColorType, DynamicImage, ImageFormat, RgbImage};
use neurax_driver::{DataType, Tensor};
use std::io::Cursor;
use std::path::Path;

/// Decode a BMP image held in memory.
pub fn decode(bytes: &[u8]) -> Result<Tensor> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Bmp)
        .context("decoding BMP")?;
    let channels = match img.color() {
        ColorType::Rgb8 => 3,
        ColorType::Rgba8 => 4,
        other => bail!("unsupported BMP pixel format {other:?}"),
    };

    let rgba = img.to_rgba8();
    let (w, h) = (rgba.width() as usize, rgba.height() as usize);
    let mut tensor = Tensor::new(w, h, channels, 1, DataType::F32)?;
    for (x, y, px) in rgba.enumerate_pixels() {
        for (c, &v) in px.0.iter().take(channels).enumerate() {
            tensor.set(0, y as usize, x as usize, c, f32::from(v) / 255.0);
        }
    }
    Ok(tensor)
}

/// First batch of `image` as 8-bit RGB.
fn to_rgb8(image: &Tensor) -> Result<RgbImage> {
    let (w, h) = (image.width(), image.height());
    let grey = image.channels() < 3;
    let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;

    let mut raw = Vec::with_capacity(w * h * 3);
    for y in 0..h {
        for x in 0..w {
            if grey {
                let v = to_byte(image.get(0, y, x, 0));
                raw.extend_from_slice(&[v, v, v]);
            } else {
                raw.extend((0..3).map(|c| to_byte(image.get(0, y, x, c))));
            }
        }
    }
    let width = u32::try_from(w).context("image too wide for BMP")?;
    let height = u32::try_from(h).context("image too tall for BMP")?;
    RgbImage::from_raw(width, height, raw).ok_or_else(|| anyhow!("pixel buffer size mismatch"))
}

/// Encode the first batch of `image` as a 24-bit BMP.
pub fn encode(image: &Tensor) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(to_rgb8(image)?)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Bmp)
        .context("encoding BMP")?;
    Ok(bytes)
}

/// Read a BMP file.
pub fn read(path: &Path) -> Result<Tensor> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    decode(&bytes).with_context(|| format!("decoding {}", path.display()))
}

/// Write `image` as a 24-bit BMP file.
pub fn write(path: &Path, image: &Tensor) -> Result<()> {
    to_rgb8(image)?
        .save_with_format(path, ImageFormat::Bmp)
        .with_context(|| format!("writing {}", path.display()))
}
