use std::fmt;

use image::ImageError;

/// Errors surfaced by buffer loading and image file operations.
///
/// Out-of-bounds edits never surface here; tools skip them.
#[derive(Debug)]
pub enum EngineError {
    /// Rows were ragged/empty, or the file could not be decoded.
    MalformedImage(String),
    /// A side was zero or the grid exceeds the cell cap.
    InvalidDimensions { width: u32, height: u32 },
    /// The grid cannot be cached at this cell size within the surface budget.
    SurfaceTooLarge { width: u32, height: u32, cell_size: u32 },
    /// Reading or writing a file failed.
    Io(std::io::Error),
    /// The encoder rejected the pixel data.
    Encode(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::MalformedImage(e) => write!(f, "Malformed image: {}", e),
            EngineError::InvalidDimensions { width, height } => {
                write!(f, "Invalid canvas size {}×{}", width, height)
            }
            EngineError::SurfaceTooLarge { width, height, cell_size } => {
                write!(f, "Canvas {}×{} is too large to display at {}px cells", width, height, cell_size)
            }
            EngineError::Io(e) => write!(f, "I/O error: {}", e),
            EngineError::Encode(e) => write!(f, "Encode error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e)
    }
}

impl From<ImageError> for EngineError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => EngineError::Io(io),
            ImageError::Decoding(d) => EngineError::MalformedImage(d.to_string()),
            ImageError::Unsupported(u) => EngineError::MalformedImage(u.to_string()),
            other => EngineError::Encode(other.to_string()),
        }
    }
}

/// Outcome of a screen color-sample request that produced no color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickError {
    /// The user dismissed the picker, or the responder went away.
    Cancelled,
    Failed(String),
}

impl fmt::Display for PickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickError::Cancelled => write!(f, "color pick cancelled"),
            PickError::Failed(e) => write!(f, "color pick failed: {}", e),
        }
    }
}

impl std::error::Error for PickError {}
