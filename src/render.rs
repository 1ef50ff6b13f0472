use egui::{ColorImage, Rect, pos2};
use image::RgbaImage;
use rayon::prelude::*;

use crate::canvas::PixelBuffer;
use crate::color::Color;
use crate::error::EngineError;
use crate::raster::Cell;

/// Largest cached surface, in bytes of RGBA8.
pub const MAX_SURFACE_BYTES: u64 = 256 * 1024 * 1024;

/// Pixel size of the surface for a grid at `cell_size`, or `None` when it
/// would exceed [`MAX_SURFACE_BYTES`].
pub fn surface_dimensions(grid_width: u32, grid_height: u32, cell_size: u32) -> Option<(u32, u32)> {
    let w = (grid_width as u64).checked_mul(cell_size as u64)?;
    let h = (grid_height as u64).checked_mul(cell_size as u64)?;
    let bytes = w.checked_mul(h)?.checked_mul(4)?;
    if bytes > MAX_SURFACE_BYTES {
        return None;
    }
    Some((u32::try_from(w).ok()?, u32::try_from(h).ok()?))
}

/// Largest cell size whose surface fits the budget; 0 when none does.
pub fn max_cell_size(grid_width: u32, grid_height: u32) -> u32 {
    let bytes_per_unit = grid_width as u64 * grid_height as u64 * 4;
    if bytes_per_unit == 0 {
        return 0;
    }
    (MAX_SURFACE_BYTES / bytes_per_unit).isqrt().min(u32::MAX as u64) as u32
}

// ============================================================================
// OVERLAY – transient previews drawn over the cached composite
// ============================================================================

/// Per-frame visual feedback (cursor highlight, line preview).  Never written
/// into the buffer or the cache surface.
#[derive(Clone, Debug, Default)]
pub struct Overlay {
    fills: Vec<(Cell, Color)>,
    outlines: Vec<(Cell, Color)>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill a whole cell, blended over the composite.
    pub fn fill_cell(&mut self, cell: Cell, color: Color) {
        self.fills.push((cell, color));
    }

    /// One-pixel outline inset inside a cell.
    pub fn outline_cell(&mut self, cell: Cell, color: Color) {
        self.outlines.push((cell, color));
    }

    pub fn fills(&self) -> &[(Cell, Color)] {
        &self.fills
    }

    pub fn outlines(&self) -> &[(Cell, Color)] {
        &self.outlines
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty() && self.outlines.is_empty()
    }

    pub fn clear(&mut self) {
        self.fills.clear();
        self.outlines.clear();
    }
}

// ============================================================================
// RENDER CACHE – buffer composited at the current cell size
// ============================================================================

/// Cached bitmap of the buffer scaled by `cell_size`.
///
/// Single-cell edits repaint only that cell's square; buffer reloads and zoom
/// changes rebuild the whole surface.  Every change is accumulated into
/// `dirty_rect` (surface pixel coordinates) until the consumer takes it.
pub struct RenderCache {
    surface: RgbaImage,
    cell_size: u32,
    grid_width: u32,
    grid_height: u32,
    dirty_rect: Option<Rect>,
    /// Monotonically increasing counter, bumped on each mark_dirty call.
    pub generation: u64,
    full_rebuilds: u64,
}

impl RenderCache {
    pub fn new(buffer: &PixelBuffer, cell_size: u32) -> Result<Self, EngineError> {
        let cell_size = cell_size.max(1);
        let (w, h) = checked_surface(buffer, cell_size)?;
        let mut cache = Self {
            surface: RgbaImage::new(w, h),
            cell_size,
            grid_width: buffer.width(),
            grid_height: buffer.height(),
            dirty_rect: None,
            generation: 0,
            full_rebuilds: 0,
        };
        cache.rebuild(buffer);
        Ok(cache)
    }

    /// Throw the surface away and recomposite everything.  Called after the
    /// buffer is replaced or the cell size changes.  An oversized surface is
    /// rejected before anything is touched.
    pub fn reset(&mut self, buffer: &PixelBuffer, cell_size: u32) -> Result<(), EngineError> {
        let cell_size = cell_size.max(1);
        let (w, h) = checked_surface(buffer, cell_size)?;
        if self.surface.dimensions() != (w, h) {
            self.surface = RgbaImage::new(w, h);
        }
        self.cell_size = cell_size;
        self.grid_width = buffer.width();
        self.grid_height = buffer.height();
        self.rebuild(buffer);
        Ok(())
    }

    fn rebuild(&mut self, buffer: &PixelBuffer) {
        let cs = self.cell_size as usize;
        let row_stride = self.surface.width() as usize * 4;
        if row_stride == 0 {
            return;
        }
        let raw: &mut [u8] = &mut self.surface;
        raw.par_chunks_mut(row_stride).enumerate().for_each(|(py, row)| {
            let cells = buffer.row((py / cs) as u32);
            for (cx, color) in cells.iter().enumerate() {
                let bytes = color.to_array();
                for px in row[cx * cs * 4..(cx + 1) * cs * 4].chunks_exact_mut(4) {
                    px.copy_from_slice(&bytes);
                }
            }
        });
        self.full_rebuilds += 1;
        self.mark_dirty(None);
    }

    /// Repaint one cell from the buffer.  Cells outside the grid are ignored.
    pub fn update_cell(&mut self, buffer: &PixelBuffer, cell: Cell) {
        if let Some(rect) = self.paint_cell(buffer, cell) {
            self.mark_dirty(Some(rect));
        }
    }

    /// Repaint a batch of cells with a single dirty-rect update.  The result
    /// is identical to calling `update_cell` for each one in order.
    pub fn update_cells<I: IntoIterator<Item = Cell>>(&mut self, buffer: &PixelBuffer, cells: I) {
        let mut bounds: Option<Rect> = None;
        for cell in cells {
            if let Some(rect) = self.paint_cell(buffer, cell) {
                bounds = Some(bounds.map_or(rect, |b| b.union(rect)));
            }
        }
        if bounds.is_some() {
            self.mark_dirty(bounds);
        }
    }

    fn paint_cell(&mut self, buffer: &PixelBuffer, (x, y): Cell) -> Option<Rect> {
        let color = buffer.try_get(x, y)?;
        if x as u32 >= self.grid_width || y as u32 >= self.grid_height {
            return None;
        }
        let rect = self.cell_rect((x, y));
        fill_square(&mut self.surface, (x, y), self.cell_size, color.to_array());
        Some(rect)
    }

    /// Surface-space rectangle covered by `cell`.
    pub fn cell_rect(&self, (x, y): Cell) -> Rect {
        let cs = self.cell_size as f32;
        Rect::from_min_max(
            pos2(x as f32 * cs, y as f32 * cs),
            pos2((x + 1) as f32 * cs, (y + 1) as f32 * cs),
        )
    }

    pub fn mark_dirty(&mut self, rect: Option<Rect>) {
        let full = Rect::from_min_max(
            pos2(0.0, 0.0),
            pos2(self.surface.width() as f32, self.surface.height() as f32),
        );
        let new_rect = rect.unwrap_or(full);
        // Merge with any existing dirty rect so we never lose pending updates
        self.dirty_rect = Some(match self.dirty_rect {
            Some(existing) => existing.union(new_rect),
            None => new_rect,
        });
        self.generation = self.generation.wrapping_add(1);
    }

    /// Pending dirty region, cleared by this call.
    pub fn take_dirty_rect(&mut self) -> Option<Rect> {
        self.dirty_rect.take()
    }

    pub fn dirty_rect(&self) -> Option<Rect> {
        self.dirty_rect
    }

    /// Number of whole-surface rebuilds since construction.
    pub fn full_rebuilds(&self) -> u64 {
        self.full_rebuilds
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Cached composite with the overlay drawn on top.
    pub fn compose(&self, overlay: &Overlay) -> RgbaImage {
        let mut frame = self.surface.clone();
        if overlay.is_empty() {
            return frame;
        }
        let cs = self.cell_size;
        for &(cell, color) in overlay.fills() {
            if self.in_grid(cell) {
                blend_square(&mut frame, cell, cs, color);
            }
        }
        for &(cell, color) in overlay.outlines() {
            if self.in_grid(cell) {
                outline_square(&mut frame, cell, cs, color);
            }
        }
        frame
    }

    fn in_grid(&self, (x, y): Cell) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.grid_width && (y as u32) < self.grid_height
    }
}

fn checked_surface(buffer: &PixelBuffer, cell_size: u32) -> Result<(u32, u32), EngineError> {
    surface_dimensions(buffer.width(), buffer.height(), cell_size).ok_or(EngineError::SurfaceTooLarge {
        width: buffer.width(),
        height: buffer.height(),
        cell_size,
    })
}

/// Convert a composed frame for upload to an egui texture.
pub fn to_color_image(frame: &RgbaImage) -> ColorImage {
    ColorImage::from_rgba_unmultiplied(
        [frame.width() as usize, frame.height() as usize],
        frame.as_raw(),
    )
}

fn fill_square(img: &mut RgbaImage, (x, y): Cell, cs: u32, bytes: [u8; 4]) {
    let stride = img.width() as usize * 4;
    let raw: &mut [u8] = img;
    let x0 = x as usize * cs as usize * 4;
    let x1 = x0 + cs as usize * 4;
    for py in (y as u32 * cs)..((y as u32 + 1) * cs) {
        let row = &mut raw[py as usize * stride..(py as usize + 1) * stride];
        for px in row[x0..x1].chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }
}

fn blend_square(img: &mut RgbaImage, (x, y): Cell, cs: u32, color: Color) {
    let (bx, by) = (x as u32 * cs, y as u32 * cs);
    for py in by..by + cs {
        for px in bx..bx + cs {
            let p = img.get_pixel_mut(px, py);
            *p = Color::from(*p).blend_over(color).into();
        }
    }
}

fn outline_square(img: &mut RgbaImage, (x, y): Cell, cs: u32, color: Color) {
    // Inset by one pixel when there is room, like the cursor stroke.
    let inset = if cs > 2 { 1 } else { 0 };
    let (x0, y0) = (x as u32 * cs + inset, y as u32 * cs + inset);
    let (x1, y1) = ((x as u32 + 1) * cs - 1 - inset, (y as u32 + 1) * cs - 1 - inset);
    for px in x0..=x1 {
        for py in [y0, y1] {
            let p = img.get_pixel_mut(px, py);
            *p = Color::from(*p).blend_over(color).into();
        }
    }
    for py in (y0 + 1)..y1 {
        for px in [x0, x1] {
            let p = img.get_pixel_mut(px, py);
            *p = Color::from(*p).blend_over(color).into();
        }
    }
}
