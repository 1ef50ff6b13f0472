use egui::Pos2;

use crate::canvas::PixelBuffer;
use crate::color::Color;
use crate::context::EditorContext;
use crate::error::EngineError;
use crate::raster::{Cell, LineIter};
use crate::render::{self, Overlay};
use crate::tools::{Tool, ToolContext, ToolKind};

/// Pointer button as seen by tools.  Left maps to primary, right to secondary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
}

// ============================================================================
// Viewport – cell pixel size (zoom)
// ============================================================================

/// Bounds and step for the cell pixel size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoomLimits {
    pub min: u32,
    pub max: u32,
    pub step: u32,
    /// Starting cell size; also the 100% reference for the zoom label.
    pub initial: u32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: 2, max: 40, step: 2, initial: 20 }
    }
}

impl ZoomLimits {
    /// Repair inverted or zero bounds so the viewport invariants can hold.
    pub fn sanitized(self) -> Self {
        let min = self.min.max(1);
        let max = self.max.max(min);
        Self {
            min,
            max,
            step: self.step.max(1),
            initial: self.initial.clamp(min, max),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Viewport {
    cell_size: u32,
    limits: ZoomLimits,
}

impl Viewport {
    pub fn new(limits: ZoomLimits) -> Self {
        let limits = limits.sanitized();
        Self { cell_size: limits.initial, limits }
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn step(&self) -> u32 {
        self.limits.step
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    /// Cell size after adding `delta`, clamped to the limits.
    pub fn target(&self, delta: i32) -> u32 {
        (self.cell_size as i64 + delta as i64).clamp(self.limits.min as i64, self.limits.max as i64) as u32
    }

    /// Add `delta` to the cell size, clamped to the limits.  Returns whether
    /// the size actually changed.
    pub fn adjust(&mut self, delta: i32) -> bool {
        let target = self.target(delta);
        let changed = target != self.cell_size;
        self.cell_size = target;
        changed
    }

    pub fn set_cell_size(&mut self, cell_size: u32) {
        self.cell_size = cell_size.clamp(self.limits.min, self.limits.max);
    }

    /// Zoom relative to the initial cell size, e.g. 20 → 100.
    pub fn zoom_percent(&self) -> u32 {
        self.cell_size * 100 / self.limits.initial
    }

    /// Rendered canvas size in screen pixels.
    pub fn render_size(&self, grid_width: u32, grid_height: u32) -> (u32, u32) {
        (grid_width.saturating_mul(self.cell_size), grid_height.saturating_mul(self.cell_size))
    }

    /// Canvas-relative screen position → cell, `floor(coord / cell_size)`.
    /// Positions beyond the `i32` range saturate; NaN maps to 0.
    pub fn screen_to_cell(&self, pos: Pos2) -> Cell {
        let cs = self.cell_size as f32;
        ((pos.x / cs).floor() as i32, (pos.y / cs).floor() as i32)
    }
}

// ============================================================================
// ToolController – pointer dispatch and drag interpolation
// ============================================================================

pub struct ToolController {
    tool: Tool,
    viewport: Viewport,
    /// Last pointer cell, possibly off-grid; drag traces start here.
    pointer_cell: Option<Cell>,
    /// `pointer_cell` when it lies on the canvas.
    current_cell: Option<Cell>,
    held: Option<PointerButton>,
    cursor_color: Color,
}

impl ToolController {
    pub fn new(limits: ZoomLimits, cursor_color: Color) -> Self {
        Self {
            tool: Tool::default(),
            viewport: Viewport::new(limits),
            pointer_cell: None,
            current_cell: None,
            held: None,
            cursor_color,
        }
    }

    pub fn active_kind(&self) -> ToolKind {
        self.tool.kind()
    }

    pub fn active_tool(&self) -> &Tool {
        &self.tool
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Cell under the pointer, `None` while it is off the canvas.
    pub fn current_cell(&self) -> Option<Cell> {
        self.current_cell
    }

    fn track(&mut self, editor: &EditorContext, cell: Cell) {
        self.pointer_cell = Some(cell);
        self.current_cell = editor.buffer.contains(cell.0, cell.1).then_some(cell);
    }

    /// Largest cell size, not above the current one, at which a
    /// `width` x `height` grid fits the render cache.
    pub fn fit_cell_size(&self, width: u32, height: u32) -> Result<u32, EngineError> {
        let cell_size = self.viewport.cell_size().min(render::max_cell_size(width, height));
        if cell_size < self.viewport.limits().min {
            return Err(EngineError::SurfaceTooLarge { width, height, cell_size: self.viewport.limits().min });
        }
        Ok(cell_size)
    }

    /// Swap the editor's buffer, zooming out if the current cell size would
    /// overflow the render cache.  On error nothing changes.
    pub fn install_buffer(&mut self, editor: &mut EditorContext, buffer: PixelBuffer) -> Result<(), EngineError> {
        let cell_size = self.fit_cell_size(buffer.width(), buffer.height())?;
        editor.replace_buffer(buffer, cell_size)?;
        if cell_size != self.viewport.cell_size() {
            log_info!("Zoom: cell size {} to fit {}x{}", cell_size, editor.buffer.width(), editor.buffer.height());
            self.viewport.set_cell_size(cell_size);
        }
        self.pointer_cell = None;
        self.current_cell = None;
        Ok(())
    }

    pub fn held_button(&self) -> Option<PointerButton> {
        self.held
    }

    /// Switch tools.  The outgoing tool drops any in-progress state, so a
    /// half-drawn line is discarded rather than committed.
    pub fn set_active(&mut self, kind: ToolKind) {
        if kind == self.tool.kind() {
            return;
        }
        self.tool.handler_mut().deactivate();
        self.tool = Tool::from_kind(kind);
        self.held = None;
        log_info!("Tool: {}", kind.label());
    }

    pub fn set_zoom(&mut self, editor: &mut EditorContext, delta: i32) -> bool {
        let mut ctx = ToolContext { editor, viewport: &mut self.viewport };
        ctx.zoom(delta)
    }

    pub fn zoom_in(&mut self, editor: &mut EditorContext) -> bool {
        let step = self.viewport.step() as i32;
        self.set_zoom(editor, step)
    }

    pub fn zoom_out(&mut self, editor: &mut EditorContext) -> bool {
        let step = self.viewport.step() as i32;
        self.set_zoom(editor, -step)
    }

    /// Scroll gesture: with the zoom modifier held, one notch is one zoom
    /// step (scrolling up zooms in).  Without the modifier it is ignored.
    pub fn scroll(&mut self, editor: &mut EditorContext, delta_y: f32, modifier: bool) -> bool {
        if !modifier || delta_y == 0.0 {
            return false;
        }
        if delta_y > 0.0 {
            self.zoom_in(editor)
        } else {
            self.zoom_out(editor)
        }
    }

    pub fn pointer_press(&mut self, editor: &mut EditorContext, button: PointerButton, pos: Pos2) {
        if self.held.is_some() {
            return;
        }
        let cell = self.viewport.screen_to_cell(pos);
        self.held = Some(button);
        self.track(editor, cell);
        let mut ctx = ToolContext { editor, viewport: &mut self.viewport };
        self.tool.press(button, cell, &mut ctx);
    }

    /// Pointer moved.  While a button is held, every on-canvas cell of the
    /// Bresenham path from the previous cell to the new one gets a hold event,
    /// so fast strokes have no gaps.  An off-canvas end cell still gets a
    /// final hold so tools that track the pointer see where it went.
    pub fn pointer_motion(&mut self, editor: &mut EditorContext, pos: Pos2) {
        let cell = self.viewport.screen_to_cell(pos);
        let previous = self.pointer_cell;
        if previous == Some(cell) {
            return;
        }
        self.track(editor, cell);
        let Some(button) = self.held else {
            return;
        };
        let on_canvas = self.current_cell.is_some();
        let (w, h) = (editor.buffer.width(), editor.buffer.height());
        let mut ctx = ToolContext { editor, viewport: &mut self.viewport };
        if let Some(prev) = previous {
            for step in LineIter::new(prev, cell).clipped(w, h) {
                self.tool.hold(button, step, &mut ctx);
            }
        }
        if previous.is_none() || !on_canvas {
            self.tool.hold(button, cell, &mut ctx);
        }
    }

    pub fn pointer_release(&mut self, editor: &mut EditorContext, button: PointerButton, pos: Pos2) {
        if self.held != Some(button) {
            return;
        }
        self.held = None;
        let cell = self.viewport.screen_to_cell(pos);
        self.track(editor, cell);
        let mut ctx = ToolContext { editor, viewport: &mut self.viewport };
        self.tool.release(button, cell, &mut ctx);
    }

    pub fn pointer_leave(&mut self) {
        self.pointer_cell = None;
        self.current_cell = None;
    }

    /// Active tool preview plus the cursor highlight.
    pub fn draw_overlay(&self, editor: &EditorContext) -> Overlay {
        let mut overlay = Overlay::new();
        self.tool.handler().draw_overlay(&mut overlay, editor);
        if let Some(cell) = self.current_cell {
            overlay.outline_cell(cell, self.cursor_color);
        }
        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::UnavailableSampler;
    use egui::pos2;

    const CURSOR: Color = Color::rgb(0, 0, 255);

    fn setup(w: u32, h: u32) -> (ToolController, EditorContext) {
        let ctrl = ToolController::new(ZoomLimits::default(), CURSOR);
        let ed = EditorContext::new(
            PixelBuffer::new(w, h).unwrap(),
            ctrl.viewport().cell_size(),
            Box::new(UnavailableSampler),
        )
        .unwrap();
        (ctrl, ed)
    }

    /// Screen position at the centre of a cell at the default 20px zoom.
    fn at(x: i32, y: i32) -> Pos2 {
        pos2(x as f32 * 20.0 + 10.0, y as f32 * 20.0 + 10.0)
    }

    #[test]
    fn screen_mapping_floors() {
        let vp = Viewport::new(ZoomLimits::default());
        assert_eq!(vp.screen_to_cell(pos2(0.0, 0.0)), (0, 0));
        assert_eq!(vp.screen_to_cell(pos2(19.9, 20.0)), (0, 1));
        assert_eq!(vp.screen_to_cell(pos2(-0.5, 45.0)), (-1, 2));
    }

    #[test]
    fn zoom_stays_within_bounds() {
        let mut vp = Viewport::new(ZoomLimits::default());
        for _ in 0..100 {
            vp.adjust(2);
            assert!(vp.cell_size() <= 40);
        }
        assert_eq!(vp.cell_size(), 40);
        assert!(!vp.adjust(2));
        assert_eq!(vp.cell_size(), 40);
        assert!(vp.adjust(-1000));
        assert_eq!(vp.cell_size(), 2);
        assert!(!vp.adjust(-2));
    }

    #[test]
    fn zoom_percent_and_render_size() {
        let mut vp = Viewport::new(ZoomLimits::default());
        assert_eq!(vp.zoom_percent(), 100);
        vp.adjust(10);
        assert_eq!(vp.zoom_percent(), 150);
        assert_eq!(vp.render_size(16, 8), (480, 240));
    }

    #[test]
    fn broken_limits_are_repaired() {
        let limits = ZoomLimits { min: 0, max: 0, step: 0, initial: 50 }.sanitized();
        assert_eq!(limits, ZoomLimits { min: 1, max: 1, step: 1, initial: 1 });
    }

    #[test]
    fn pencil_press_paints_single_cell() {
        let (mut ctrl, mut ed) = setup(4, 4);
        ed.palette.set_primary(Color::from_hex("#FF0000FF").unwrap());
        ctrl.pointer_press(&mut ed, PointerButton::Primary, at(1, 1));
        assert_eq!(ed.buffer.get(1, 1), Color::new(255, 0, 0, 255));
        let painted: Vec<_> = ed.buffer.cells().filter(|(_, c)| !c.is_transparent()).collect();
        assert_eq!(painted.len(), 1);
    }

    #[test]
    fn fast_drag_fills_gaps() {
        let (mut ctrl, mut ed) = setup(4, 4);
        ctrl.pointer_press(&mut ed, PointerButton::Primary, at(0, 0));
        ctrl.pointer_motion(&mut ed, at(3, 0));
        for x in 0..4 {
            assert_eq!(ed.buffer.get(x, 0), Color::BLACK, "cell ({}, 0)", x);
        }
        assert_eq!(ed.buffer.get(0, 1), Color::TRANSPARENT);
    }

    #[test]
    fn motion_without_button_only_moves_cursor() {
        let (mut ctrl, mut ed) = setup(4, 4);
        ctrl.pointer_motion(&mut ed, at(2, 2));
        assert_eq!(ctrl.current_cell(), Some((2, 2)));
        assert!(ed.buffer.cells().all(|(_, c)| c.is_transparent()));
        let overlay = ctrl.draw_overlay(&ed);
        assert_eq!(overlay.outlines(), &[((2, 2), CURSOR)]);
        ctrl.pointer_leave();
        assert_eq!(ctrl.current_cell(), None);
        assert!(ctrl.draw_overlay(&ed).is_empty());
    }

    #[test]
    fn release_ends_the_stroke() {
        let (mut ctrl, mut ed) = setup(4, 4);
        ctrl.pointer_press(&mut ed, PointerButton::Primary, at(0, 0));
        ctrl.pointer_release(&mut ed, PointerButton::Primary, at(0, 0));
        ctrl.pointer_motion(&mut ed, at(3, 3));
        assert_eq!(ed.buffer.get(3, 3), Color::TRANSPARENT);
        assert_eq!(ctrl.held_button(), None);
    }

    #[test]
    fn drag_outside_canvas_is_clipped() {
        let (mut ctrl, mut ed) = setup(3, 3);
        ctrl.pointer_press(&mut ed, PointerButton::Secondary, at(1, 1));
        ctrl.pointer_motion(&mut ed, at(6, 1));
        ed.palette.set_secondary(Color::WHITE);
        ctrl.pointer_motion(&mut ed, at(-3, 1));
        assert_eq!(ed.buffer.get(0, 1), Color::WHITE);
        assert_eq!(ed.buffer.get(2, 1), Color::WHITE);
        assert_eq!(ed.buffer.get(1, 0), Color::TRANSPARENT);
    }

    #[test]
    fn line_tool_through_controller() {
        let (mut ctrl, mut ed) = setup(4, 4);
        ctrl.set_active(ToolKind::Line);
        ctrl.pointer_press(&mut ed, PointerButton::Primary, at(0, 0));
        ctrl.pointer_motion(&mut ed, at(2, 1));
        ctrl.pointer_motion(&mut ed, at(3, 3));
        assert!(ed.buffer.cells().all(|(_, c)| c.is_transparent()));
        let overlay = ctrl.draw_overlay(&ed);
        assert_eq!(overlay.fills().len(), 4);
        ctrl.pointer_release(&mut ed, PointerButton::Primary, at(3, 3));
        for ((x, y), c) in ed.buffer.cells() {
            let expected = if x == y { Color::BLACK } else { Color::TRANSPARENT };
            assert_eq!(c, expected, "cell ({}, {})", x, y);
        }
    }

    #[test]
    fn line_press_then_release_paints_diagonal_only() {
        let (mut ctrl, mut ed) = setup(4, 4);
        ctrl.set_active(ToolKind::Line);
        ctrl.pointer_press(&mut ed, PointerButton::Primary, at(0, 0));
        ctrl.pointer_release(&mut ed, PointerButton::Primary, at(3, 3));
        let painted: Vec<Cell> = ed.buffer.cells().filter(|(_, c)| *c == Color::BLACK).map(|(p, _)| p).collect();
        assert_eq!(painted, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn switching_tools_mid_drag_discards_line() {
        let (mut ctrl, mut ed) = setup(4, 4);
        ctrl.set_active(ToolKind::Line);
        ctrl.pointer_press(&mut ed, PointerButton::Primary, at(0, 0));
        ctrl.pointer_motion(&mut ed, at(3, 0));
        ctrl.set_active(ToolKind::Pencil);
        ctrl.pointer_release(&mut ed, PointerButton::Primary, at(3, 0));
        assert!(ed.buffer.cells().all(|(_, c)| c.is_transparent()));
        assert_eq!(ctrl.active_kind(), ToolKind::Pencil);
    }

    #[test]
    fn eraser_clears_painted_cell() {
        let (mut ctrl, mut ed) = setup(2, 2);
        ctrl.pointer_press(&mut ed, PointerButton::Primary, at(1, 0));
        ctrl.pointer_release(&mut ed, PointerButton::Primary, at(1, 0));
        assert_eq!(ed.buffer.get(1, 0), Color::BLACK);
        ctrl.set_active(ToolKind::Eraser);
        ctrl.pointer_press(&mut ed, PointerButton::Primary, at(1, 0));
        assert_eq!(ed.buffer.get(1, 0), Color::TRANSPARENT);
    }

    #[test]
    fn scroll_zoom_requires_modifier() {
        let (mut ctrl, mut ed) = setup(2, 2);
        assert!(!ctrl.scroll(&mut ed, 1.0, false));
        assert_eq!(ctrl.viewport().cell_size(), 20);
        assert!(ctrl.scroll(&mut ed, 1.0, true));
        assert_eq!(ctrl.viewport().cell_size(), 22);
        assert_eq!(ed.cache.surface().dimensions(), (44, 44));
        assert!(ctrl.scroll(&mut ed, -3.0, true));
        assert_eq!(ctrl.viewport().cell_size(), 20);
    }

    #[test]
    fn zoom_in_at_max_is_noop() {
        let limits = ZoomLimits { min: 2, max: 24, step: 2, initial: 24 };
        let mut ctrl = ToolController::new(limits, CURSOR);
        let mut ed = EditorContext::new(PixelBuffer::new(2, 2).unwrap(), 24, Box::new(UnavailableSampler)).unwrap();
        let rebuilds = ed.cache.full_rebuilds();
        assert!(!ctrl.zoom_in(&mut ed));
        assert_eq!(ctrl.viewport().cell_size(), 24);
        assert_eq!(ed.cache.full_rebuilds(), rebuilds);
        assert!(ctrl.zoom_out(&mut ed));
        assert_eq!(ed.cache.full_rebuilds(), rebuilds + 1);
    }

    #[test]
    fn off_canvas_pointer_has_no_current_cell() {
        let (mut ctrl, mut ed) = setup(4, 4);
        ctrl.pointer_motion(&mut ed, at(1, 1));
        assert_eq!(ctrl.current_cell(), Some((1, 1)));
        ctrl.pointer_motion(&mut ed, at(7, 1));
        assert_eq!(ctrl.current_cell(), None);
        assert!(ctrl.draw_overlay(&ed).is_empty());
        ctrl.pointer_motion(&mut ed, at(-1, 0));
        assert_eq!(ctrl.current_cell(), None);
    }

    #[test]
    fn far_drag_stays_bounded_and_paints_only_the_canvas() {
        let (mut ctrl, mut ed) = setup(4, 4);
        ctrl.pointer_press(&mut ed, PointerButton::Primary, at(0, 1));
        ctrl.pointer_motion(&mut ed, pos2(1e12, 30.0));
        ctrl.pointer_motion(&mut ed, pos2(-1e12, 30.0));
        ctrl.pointer_motion(&mut ed, pos2(f32::NAN, f32::INFINITY));
        for ((x, y), c) in ed.buffer.cells() {
            let expected = if y == 1 { Color::BLACK } else { Color::TRANSPARENT };
            assert_eq!(c, expected, "cell ({}, {})", x, y);
        }
        assert_eq!(ctrl.current_cell(), None);
    }

    #[test]
    fn line_drag_far_off_canvas_commits_the_crossing() {
        let (mut ctrl, mut ed) = setup(4, 4);
        ctrl.set_active(ToolKind::Line);
        ctrl.pointer_press(&mut ed, PointerButton::Primary, at(0, 2));
        ctrl.pointer_motion(&mut ed, pos2(4e10, 50.0));
        assert_eq!(ctrl.draw_overlay(&ed).fills().len(), 4);
        ctrl.pointer_release(&mut ed, PointerButton::Primary, pos2(4e10, 50.0));
        for ((_, y), c) in ed.buffer.cells() {
            let expected = if y == 2 { Color::BLACK } else { Color::TRANSPARENT };
            assert_eq!(c, expected);
        }
    }

    #[test]
    fn large_grids_zoom_out_to_fit() {
        let ctrl = ToolController::new(ZoomLimits::default(), CURSOR);
        assert_eq!(ctrl.fit_cell_size(16, 16).unwrap(), 20);
        assert_eq!(ctrl.fit_cell_size(1000, 1000).unwrap(), 8);
        assert_eq!(ctrl.fit_cell_size(4000, 4000).unwrap(), 2);

        let strict = ToolController::new(ZoomLimits { min: 10, max: 40, step: 2, initial: 20 }, CURSOR);
        assert!(matches!(
            strict.fit_cell_size(4000, 4000),
            Err(EngineError::SurfaceTooLarge { width: 4000, height: 4000, cell_size: 10 })
        ));
    }

    #[test]
    fn refused_install_keeps_canvas_and_zoom() {
        let limits = ZoomLimits { min: 20, max: 40, step: 2, initial: 20 };
        let mut ctrl = ToolController::new(limits, CURSOR);
        let mut ed = EditorContext::new(PixelBuffer::new(3, 3).unwrap(), 20, Box::new(UnavailableSampler)).unwrap();
        let err = ctrl.install_buffer(&mut ed, PixelBuffer::new(2048, 2048).unwrap());
        assert!(err.is_err());
        assert_eq!((ed.buffer.width(), ed.buffer.height()), (3, 3));
        assert_eq!(ctrl.viewport().cell_size(), 20);

        ctrl.install_buffer(&mut ed, PixelBuffer::new(5, 2).unwrap()).unwrap();
        assert_eq!(ed.cache.surface().dimensions(), (100, 40));
    }
}
