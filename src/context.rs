use crate::canvas::PixelBuffer;
use crate::color::Color;
use crate::error::EngineError;
use crate::palette::PaletteRegistry;
use crate::picker::{PickPoll, PickRequest, PickResult, ScreenSampler};
use crate::raster::Cell;
use crate::render::RenderCache;

/// Everything a tool may touch, owned once per session and handed to tools
/// by reference.
pub struct EditorContext {
    pub buffer: PixelBuffer,
    pub palette: PaletteRegistry,
    pub cache: RenderCache,
    sampler: Box<dyn ScreenSampler>,
    pending_picks: Vec<PickRequest>,
}

impl EditorContext {
    pub fn new(buffer: PixelBuffer, cell_size: u32, sampler: Box<dyn ScreenSampler>) -> Result<Self, EngineError> {
        let cache = RenderCache::new(&buffer, cell_size)?;
        Ok(Self {
            buffer,
            palette: PaletteRegistry::new(),
            cache,
            sampler,
            pending_picks: Vec::new(),
        })
    }

    /// Write one cell and repaint it in the cache.  Out-of-range cells are
    /// skipped; returns whether the write landed.
    pub fn paint(&mut self, cell: Cell, color: Color) -> bool {
        if !self.buffer.set(cell.0, cell.1, color) {
            return false;
        }
        self.cache.update_cell(&self.buffer, cell);
        true
    }

    /// Write several cells with one cache pass.  Returns how many landed.
    pub fn paint_cells<I: IntoIterator<Item = Cell>>(&mut self, cells: I, color: Color) -> usize {
        let landed: Vec<Cell> = cells
            .into_iter()
            .filter(|&(x, y)| self.buffer.set(x, y, color))
            .collect();
        self.cache.update_cells(&self.buffer, landed.iter().copied());
        landed.len()
    }

    /// Swap in a new buffer (new canvas / load) composited at `cell_size`.
    /// If the cache cannot hold it, the current buffer and cache are kept.
    pub fn replace_buffer(&mut self, buffer: PixelBuffer, cell_size: u32) -> Result<(), EngineError> {
        self.cache.reset(&buffer, cell_size)?;
        self.buffer = buffer;
        Ok(())
    }

    /// Cell geometry changed: recomposite at the new size.
    pub fn set_cell_size(&mut self, cell_size: u32) -> Result<(), EngineError> {
        self.cache.reset(&self.buffer, cell_size)
    }

    /// Fire a screen color-sample request without waiting for it.
    pub fn request_pick(&mut self) {
        let request = self.sampler.request_pick();
        self.pending_picks.push(request);
    }

    pub fn pending_picks(&self) -> usize {
        self.pending_picks.len()
    }

    /// Apply every pick that has completed since the last poll.  Successful
    /// picks become the primary color; failures and cancellations change
    /// nothing.  Returns the outcomes in completion-check order.
    pub fn poll_picks(&mut self) -> Vec<PickResult> {
        let mut finished = Vec::new();
        self.pending_picks.retain(|request| match request.poll() {
            PickPoll::Pending => true,
            PickPoll::Ready(result) => {
                finished.push(result);
                false
            }
        });
        for result in &finished {
            match result {
                Ok(color) => {
                    self.palette.set_primary(*color);
                    log_info!("Color picked: {}", color);
                }
                Err(e) => log_warn!("{}", e),
            }
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::UnavailableSampler;

    #[test]
    fn oversized_replacement_keeps_current_canvas() {
        let mut ed = EditorContext::new(PixelBuffer::new(4, 4).unwrap(), 20, Box::new(UnavailableSampler)).unwrap();
        ed.paint((1, 1), Color::WHITE);
        let huge = PixelBuffer::new(4000, 4000).unwrap();
        let err = ed.replace_buffer(huge, 20).unwrap_err();
        assert!(matches!(err, EngineError::SurfaceTooLarge { width: 4000, height: 4000, cell_size: 20 }));
        assert_eq!((ed.buffer.width(), ed.buffer.height()), (4, 4));
        assert_eq!(ed.buffer.get(1, 1), Color::WHITE);
        assert_eq!(ed.cache.surface().dimensions(), (80, 80));
    }

    #[test]
    fn replacement_adopts_the_given_cell_size() {
        let mut ed = EditorContext::new(PixelBuffer::new(4, 4).unwrap(), 20, Box::new(UnavailableSampler)).unwrap();
        ed.replace_buffer(PixelBuffer::new(6, 3).unwrap(), 5).unwrap();
        assert_eq!(ed.cache.cell_size(), 5);
        assert_eq!(ed.cache.surface().dimensions(), (30, 15));
    }

    #[test]
    fn oversized_cell_size_is_refused() {
        let mut ed = EditorContext::new(PixelBuffer::new(8, 8).unwrap(), 10, Box::new(UnavailableSampler)).unwrap();
        assert!(ed.set_cell_size(u32::MAX).is_err());
        assert_eq!(ed.cache.cell_size(), 10);
    }

    #[test]
    fn batch_paint_counts_only_landed_cells() {
        let mut ed = EditorContext::new(PixelBuffer::new(3, 3).unwrap(), 4, Box::new(UnavailableSampler)).unwrap();
        let landed = ed.paint_cells([(0, 0), (-1, 0), (2, 2), (3, 1)], Color::WHITE);
        assert_eq!(landed, 2);
        assert_eq!(ed.buffer.get(2, 2), Color::WHITE);
    }
}
