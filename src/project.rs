//! Native `.pgrid` sprite document: the grid plus the active colors.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::canvas::PixelBuffer;
use crate::color::Color;
use crate::error::EngineError;

pub const SPRITE_EXTENSION: &str = "pgrid";

const PGRID_MAGIC_V1: &str = "PGR1";

/// What a `.pgrid` file restores.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpriteDocument {
    pub buffer: PixelBuffer,
    pub primary: Color,
    pub secondary: Color,
}

/// V1 on-disk layout.
#[derive(Serialize, Deserialize)]
struct SpriteFileV1 {
    magic: String,
    width: u32,
    height: u32,
    primary: Color,
    secondary: Color,
    /// Row-major, `width * height` entries.
    cells: Vec<Color>,
}

/// Error type for sprite document operations
#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    Serialize(String),
    InvalidFormat(String),
}

impl std::fmt::Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::Io(e) => write!(f, "I/O error: {}", e),
            ProjectError::Serialize(e) => write!(f, "Serialization error: {}", e),
            ProjectError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
        }
    }
}

impl std::error::Error for ProjectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProjectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProjectError {
    fn from(e: std::io::Error) -> Self {
        ProjectError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for ProjectError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        ProjectError::Serialize(e.to_string())
    }
}

impl From<EngineError> for ProjectError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Io(io) => ProjectError::Io(io),
            other => ProjectError::InvalidFormat(other.to_string()),
        }
    }
}

/// `true` when the path carries the native extension.
pub fn is_sprite_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SPRITE_EXTENSION))
}

pub fn save_sprite(doc: &SpriteDocument, path: &Path) -> Result<(), ProjectError> {
    let file = SpriteFileV1 {
        magic: PGRID_MAGIC_V1.to_string(),
        width: doc.buffer.width(),
        height: doc.buffer.height(),
        primary: doc.primary,
        secondary: doc.secondary,
        cells: doc.buffer.cells().map(|(_, c)| c).collect(),
    };

    let tmp = tmp_path(path);
    let result = write_v1(&file, &tmp).and_then(|_| fs::rename(&tmp, path).map_err(ProjectError::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_v1(file: &SpriteFileV1, path: &Path) -> Result<(), ProjectError> {
    let out = File::create(path)?;
    let writer = BufWriter::new(out);
    bincode::serialize_into(writer, file)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

pub fn load_sprite(path: &Path) -> Result<SpriteDocument, ProjectError> {
    let raw = fs::read(path)?;
    if raw.len() < 12 {
        return Err(ProjectError::InvalidFormat("File too small".into()));
    }

    // bincode writes a String as an 8-byte length prefix then the bytes,
    // so a 4-char magic sits at 8..12.
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    match magic {
        PGRID_MAGIC_V1 => load_v1(&raw),
        _ => Err(ProjectError::InvalidFormat(format!("Unknown magic '{}'", magic))),
    }
}

fn load_v1(raw: &[u8]) -> Result<SpriteDocument, ProjectError> {
    let file: SpriteFileV1 = bincode::deserialize(raw)?;
    // Same bounds as any other buffer, so whatever saves also loads.
    PixelBuffer::check_dimensions(file.width, file.height)
        .map_err(|_| ProjectError::InvalidFormat(format!("Grid size {}x{} out of range", file.width, file.height)))?;
    if file.cells.len() != file.width as usize * file.height as usize {
        return Err(ProjectError::InvalidFormat(format!(
            "Expected {} cells, found {}",
            file.width as usize * file.height as usize,
            file.cells.len()
        )));
    }
    let rows: Vec<Vec<Color>> = file.cells.chunks(file.width as usize).map(|r| r.to_vec()).collect();
    let buffer = PixelBuffer::load(&rows)?;
    Ok(SpriteDocument {
        buffer,
        primary: file.primary,
        secondary: file.secondary,
    })
}
