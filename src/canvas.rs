use image::RgbaImage;
use rayon::prelude::*;

use crate::color::Color;
use crate::error::EngineError;
use crate::raster::Cell;

/// Upper bound on `width * height`, matching what the render cache can
/// allocate at the largest zoom without overflowing.
/// Largest grid, in cells, any buffer may hold.
pub const MAX_CELLS: u64 = 16_777_216;

// ============================================================================
// PIXEL BUFFER – the canvas grid, row-major, origin top-left
// ============================================================================

/// Rectangular grid of colors.
///
/// Dimensions never change after construction; `load` builds a new buffer
/// instead of resizing this one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    cells: Vec<Color>,
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// New buffer with every cell set to `fill`.
    pub fn create(width: u32, height: u32, fill: Color) -> Result<Self, EngineError> {
        Self::check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![fill; width as usize * height as usize],
        })
    }

    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Result<Self, EngineError> {
        Self::create(width, height, Color::TRANSPARENT)
    }

    /// Build a buffer from row-major rows.  Width comes from the first row and
    /// every other row must match it.
    pub fn load(rows: &[Vec<Color>]) -> Result<Self, EngineError> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(EngineError::MalformedImage("image has no pixels".into()));
        }
        if let Some((y, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(EngineError::MalformedImage(format!(
                "row {} has {} cells, expected {}",
                y,
                row.len(),
                width
            )));
        }
        let (width, height) = (
            u32::try_from(width).map_err(|_| EngineError::MalformedImage("image too wide".into()))?,
            u32::try_from(height).map_err(|_| EngineError::MalformedImage("image too tall".into()))?,
        );
        Self::check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            cells: rows.concat(),
        })
    }

    /// Row-major copy of every cell; `load(&b.export())` reproduces `b`.
    pub fn export(&self) -> Vec<Vec<Color>> {
        self.cells
            .chunks_exact(self.width as usize)
            .map(<[Color]>::to_vec)
            .collect()
    }

    /// Import from a decoded RGBA image.
    pub fn from_rgba_image(src: &RgbaImage) -> Result<Self, EngineError> {
        let (width, height) = src.dimensions();
        Self::check_dimensions(width, height)
            .map_err(|_| EngineError::MalformedImage(format!("unusable image size {}×{}", width, height)))?;
        let cells = src.as_raw().par_chunks_exact(4).map(|px| Color::new(px[0], px[1], px[2], px[3])).collect();
        Ok(Self { width, height, cells })
    }

    /// Flatten to an `RgbaImage` at one image pixel per cell.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let raw: Vec<u8> = self.cells.iter().flat_map(Color::to_array).collect();
        // Length is width * height * 4 by construction.
        RgbaImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), EngineError> {
        if width == 0 || height == 0 || (width as u64) * (height as u64) > MAX_CELLS {
            return Err(EngineError::InvalidDimensions { width, height });
        }
        Ok(())
    }

    // ---- cell access --------------------------------------------------------

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Read a cell.
    ///
    /// # Panics
    /// If `(x, y)` is outside the buffer; callers bounds-check first
    /// (see [`PixelBuffer::contains`] / [`PixelBuffer::try_get`]).
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Color {
        assert!(self.contains(x, y), "cell ({}, {}) outside {}×{} buffer", x, y, self.width, self.height);
        self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn try_get(&self, x: i32, y: i32) -> Option<Color> {
        self.contains(x, y).then(|| self.cells[self.index(x, y)])
    }

    /// Overwrite one cell.  Out-of-range writes are ignored; returns whether
    /// the write landed.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, color: Color) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        let idx = self.index(x, y);
        self.cells[idx] = color;
        true
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row slice `y` (panics if out of range).
    pub fn row(&self, y: u32) -> &[Color] {
        let w = self.width as usize;
        &self.cells[y as usize * w..(y as usize + 1) * w]
    }

    /// All cells with their coordinates, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (Cell, Color)> + '_ {
        let w = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (((i % w) as i32, (i / w) as i32), *c))
    }

    /// Number of distinct colors currently on the canvas.
    pub fn distinct_colors(&self) -> usize {
        let mut seen: Vec<Color> = self.cells.clone();
        seen.par_sort_unstable();
        seen.dedup();
        seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Color {
        Color::rgb(255, 0, 0)
    }

    #[test]
    fn new_canvas_is_transparent() {
        let buf = PixelBuffer::new(4, 4).unwrap();
        assert_eq!(buf.cells().count(), 16);
        assert!(buf.cells().all(|(_, c)| c == Color::TRANSPARENT));
    }

    #[test]
    fn create_uses_fill() {
        let buf = PixelBuffer::create(3, 2, red()).unwrap();
        assert_eq!(buf.width(), 3);
        assert_eq!(buf.height(), 2);
        assert!(buf.cells().all(|(_, c)| c == red()));
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(
            PixelBuffer::new(0, 4),
            Err(EngineError::InvalidDimensions { width: 0, height: 4 })
        ));
        assert!(PixelBuffer::new(4, 0).is_err());
    }

    #[test]
    fn set_then_get_touches_one_cell() {
        let mut buf = PixelBuffer::new(4, 3).unwrap();
        assert!(buf.set(2, 1, red()));
        assert_eq!(buf.get(2, 1), red());
        for ((x, y), c) in buf.cells() {
            if (x, y) != (2, 1) {
                assert_eq!(c, Color::TRANSPARENT);
            }
        }
    }

    #[test]
    fn out_of_range_set_is_ignored() {
        let mut buf = PixelBuffer::create(4, 4, Color::WHITE).unwrap();
        let before = buf.clone();
        for (x, y) in [(-1, 0), (0, -1), (4, 0), (0, 4), (100, 100), (i32::MIN, 2)] {
            assert!(!buf.set(x, y, red()));
        }
        assert_eq!(buf, before);
        assert_eq!(buf.try_get(4, 0), None);
    }

    #[test]
    #[should_panic]
    fn get_out_of_range_panics() {
        let buf = PixelBuffer::new(2, 2).unwrap();
        let _ = buf.get(2, 0);
    }

    #[test]
    fn export_load_round_trip() {
        let mut buf = PixelBuffer::new(5, 3).unwrap();
        buf.set(0, 0, red());
        buf.set(4, 2, Color::new(1, 2, 3, 4));
        buf.set(2, 1, Color::WHITE);
        let rows = buf.export();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 5));
        assert_eq!(rows[2][4], Color::new(1, 2, 3, 4));
        assert_eq!(PixelBuffer::load(&rows).unwrap(), buf);
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let rows = vec![vec![red(); 3], vec![red(); 2]];
        assert!(matches!(PixelBuffer::load(&rows), Err(EngineError::MalformedImage(_))));
        assert!(matches!(PixelBuffer::load(&[]), Err(EngineError::MalformedImage(_))));
        assert!(matches!(PixelBuffer::load(&[vec![]]), Err(EngineError::MalformedImage(_))));
    }

    #[test]
    fn rgba_image_round_trip() {
        let mut buf = PixelBuffer::new(3, 2).unwrap();
        buf.set(1, 1, Color::new(9, 8, 7, 6));
        let img = buf.to_rgba_image();
        assert_eq!(img.get_pixel(1, 1).0, [9, 8, 7, 6]);
        assert_eq!(PixelBuffer::from_rgba_image(&img).unwrap(), buf);
    }

    #[test]
    fn distinct_colors_counts_unique_values() {
        let mut buf = PixelBuffer::new(3, 3).unwrap();
        assert_eq!(buf.distinct_colors(), 1);
        buf.set(0, 0, red());
        buf.set(1, 0, red());
        buf.set(2, 2, Color::WHITE);
        assert_eq!(buf.distinct_colors(), 3);
    }
}
