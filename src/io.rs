use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::canvas::PixelBuffer;
use crate::color::Color;
use crate::error::EngineError;
use crate::palette::Palette;

// ============================================================================
// IMAGE LOAD
// ============================================================================

/// Decode any image the `image` crate understands into rows of colors.
pub fn open_image(path: &Path) -> Result<Vec<Vec<Color>>, EngineError> {
    let image = decode_rgba(path)?;
    let rows = image
        .rows()
        .map(|row| row.map(|px| Color::from(*px)).collect())
        .collect();
    Ok(rows)
}

/// Decode straight into a buffer.
pub fn open_buffer(path: &Path) -> Result<PixelBuffer, EngineError> {
    PixelBuffer::from_rgba_image(&decode_rgba(path)?)
}

fn decode_rgba(path: &Path) -> Result<RgbaImage, EngineError> {
    let img = image::open(path)?;
    Ok(img.to_rgba8())
}

// ============================================================================
// IMAGE SAVE
// ============================================================================

/// Encode rows as an RGBA8 PNG.  Ragged rows are rejected before anything
/// touches the disk.
pub fn save_image(path: &Path, rows: &[Vec<Color>]) -> Result<(), EngineError> {
    let buffer = PixelBuffer::load(rows)?;
    save_buffer(path, &buffer)
}

pub fn save_buffer(path: &Path, buffer: &PixelBuffer) -> Result<(), EngineError> {
    encode_and_write(&buffer.to_rgba_image(), path)
}

/// Write to a sibling temp file and rename over the target, so a failed
/// encode never leaves a truncated PNG at `path`.
pub fn encode_and_write(image: &RgbaImage, path: &Path) -> Result<(), EngineError> {
    let tmp = temp_sibling(path);
    let result = write_png(image, &tmp).and_then(|_| fs::rename(&tmp, path).map_err(EngineError::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_png(image: &RgbaImage, path: &Path) -> Result<(), EngineError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = PngEncoder::new(&mut writer);
    encoder.write_image(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
    writer.flush()?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}

// ============================================================================
// PALETTE IMPORT
// ============================================================================

/// Every distinct color of an image as `#rrggbbaa`, sorted.
pub fn palette_colors_from_image(path: &Path) -> Result<Vec<String>, EngineError> {
    let image = decode_rgba(path)?;
    let unique: BTreeSet<String> = image.pixels().map(|px| Color::from(*px).to_hex()).collect();
    Ok(unique.into_iter().collect())
}

/// Same as [`palette_colors_from_image`], named after the file stem.
pub fn palette_from_image(path: &Path) -> Result<Palette, EngineError> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "imported".to_string());
    let image = decode_rgba(path)?;
    let unique: BTreeSet<Color> = image.pixels().map(|px| Color::from(*px)).collect();
    let mut colors: Vec<Color> = unique.into_iter().collect();
    colors.sort_by_key(|c| c.to_hex());
    Ok(Palette { name, colors })
}
