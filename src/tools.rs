use crate::color::Color;
use crate::context::EditorContext;
use crate::controller::{PointerButton, Viewport};
use crate::raster::{Cell, LineIter};
use crate::render::Overlay;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ToolKind {
    #[default]
    Pencil,
    Line,
    Eraser,
    ColorPicker,
    Zoom,
}

impl ToolKind {
    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::Pencil => "Pencil",
            ToolKind::Line => "Line",
            ToolKind::Eraser => "Eraser",
            ToolKind::ColorPicker => "Color Picker",
            ToolKind::Zoom => "Zoom",
        }
    }

    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::Pencil,
            ToolKind::Line,
            ToolKind::Eraser,
            ToolKind::ColorPicker,
            ToolKind::Zoom,
        ]
    }
}

/// What a tool gets to work with while handling one event.
pub struct ToolContext<'a> {
    pub editor: &'a mut EditorContext,
    pub viewport: &'a mut Viewport,
}

impl ToolContext<'_> {
    /// Adjust the cell size and, if it moved, recomposite the cache.  A size
    /// the cache cannot hold leaves the zoom where it was.
    pub fn zoom(&mut self, delta: i32) -> bool {
        let target = self.viewport.target(delta);
        if target == self.viewport.cell_size() {
            return false;
        }
        if let Err(e) = self.editor.set_cell_size(target) {
            log_warn!("Zoom refused: {}", e);
            return false;
        }
        self.viewport.set_cell_size(target);
        log_info!("Zoom: cell size {} ({}%)", self.viewport.cell_size(), self.viewport.zoom_percent());
        true
    }
}

/// Pointer event handlers shared by every tool.  All default to no-ops so a
/// tool only implements the events it cares about.
pub trait ToolHandler {
    fn on_primary_press(&mut self, _cell: Cell, _ctx: &mut ToolContext<'_>) {}
    fn on_primary_hold(&mut self, _cell: Cell, _ctx: &mut ToolContext<'_>) {}
    fn on_primary_release(&mut self, _cell: Cell, _ctx: &mut ToolContext<'_>) {}
    fn on_secondary_press(&mut self, _cell: Cell, _ctx: &mut ToolContext<'_>) {}
    fn on_secondary_hold(&mut self, _cell: Cell, _ctx: &mut ToolContext<'_>) {}
    fn on_secondary_release(&mut self, _cell: Cell, _ctx: &mut ToolContext<'_>) {}
    /// Transient feedback drawn over the canvas; must not touch the buffer.
    fn draw_overlay(&self, _overlay: &mut Overlay, _editor: &EditorContext) {}
    /// Called when another tool takes over; drop any in-progress state.
    fn deactivate(&mut self) {}
}

// ============================================================================
// Tool variants
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct Pencil;

impl ToolHandler for Pencil {
    fn on_primary_press(&mut self, cell: Cell, ctx: &mut ToolContext<'_>) {
        let color = ctx.editor.palette.primary();
        ctx.editor.paint(cell, color);
    }

    fn on_primary_hold(&mut self, cell: Cell, ctx: &mut ToolContext<'_>) {
        self.on_primary_press(cell, ctx);
    }

    fn on_secondary_press(&mut self, cell: Cell, ctx: &mut ToolContext<'_>) {
        let color = ctx.editor.palette.secondary();
        ctx.editor.paint(cell, color);
    }

    fn on_secondary_hold(&mut self, cell: Cell, ctx: &mut ToolContext<'_>) {
        self.on_secondary_press(cell, ctx);
    }
}

#[derive(Clone, Debug, Default)]
pub struct Eraser;

impl ToolHandler for Eraser {
    fn on_primary_press(&mut self, cell: Cell, ctx: &mut ToolContext<'_>) {
        ctx.editor.paint(cell, Color::TRANSPARENT);
    }

    fn on_primary_hold(&mut self, cell: Cell, ctx: &mut ToolContext<'_>) {
        self.on_primary_press(cell, ctx);
    }

    fn on_secondary_press(&mut self, cell: Cell, ctx: &mut ToolContext<'_>) {
        self.on_primary_press(cell, ctx);
    }

    fn on_secondary_hold(&mut self, cell: Cell, ctx: &mut ToolContext<'_>) {
        self.on_primary_press(cell, ctx);
    }
}

/// Straight line: press anchors, drag previews, release commits.
#[derive(Clone, Debug, Default)]
pub struct LineTool {
    pub start_cell: Option<Cell>,
    pub current_cell: Option<Cell>,
    /// Button that started the drag; picks the commit color.
    button: Option<PointerButton>,
}

impl LineTool {
    pub fn is_dragging(&self) -> bool {
        self.start_cell.is_some()
    }

    fn begin(&mut self, cell: Cell, button: PointerButton) {
        self.start_cell = Some(cell);
        self.current_cell = Some(cell);
        self.button = Some(button);
    }

    fn drag(&mut self, cell: Cell) {
        if self.start_cell.is_some() {
            self.current_cell = Some(cell);
        }
    }

    fn commit(&mut self, end: Cell, ctx: &mut ToolContext<'_>) {
        let (Some(start), Some(button)) = (self.start_cell, self.button) else {
            return;
        };
        let color = ctx.editor.palette.color_for(button);
        let (w, h) = (ctx.editor.buffer.width(), ctx.editor.buffer.height());
        ctx.editor.paint_cells(LineIter::new(start, end).clipped(w, h), color);
        self.reset();
    }

    fn reset(&mut self) {
        self.start_cell = None;
        self.current_cell = None;
        self.button = None;
    }
}

impl ToolHandler for LineTool {
    fn on_primary_press(&mut self, cell: Cell, _ctx: &mut ToolContext<'_>) {
        self.begin(cell, PointerButton::Primary);
    }

    fn on_primary_hold(&mut self, cell: Cell, _ctx: &mut ToolContext<'_>) {
        self.drag(cell);
    }

    fn on_primary_release(&mut self, cell: Cell, ctx: &mut ToolContext<'_>) {
        self.commit(cell, ctx);
    }

    fn on_secondary_press(&mut self, cell: Cell, _ctx: &mut ToolContext<'_>) {
        self.begin(cell, PointerButton::Secondary);
    }

    fn on_secondary_hold(&mut self, cell: Cell, _ctx: &mut ToolContext<'_>) {
        self.drag(cell);
    }

    fn on_secondary_release(&mut self, cell: Cell, ctx: &mut ToolContext<'_>) {
        self.commit(cell, ctx);
    }

    fn draw_overlay(&self, overlay: &mut Overlay, editor: &EditorContext) {
        let (Some(start), Some(end), Some(button)) = (self.start_cell, self.current_cell, self.button) else {
            return;
        };
        let color = editor.palette.color_for(button);
        let (w, h) = (editor.buffer.width(), editor.buffer.height());
        for cell in LineIter::new(start, end).clipped(w, h) {
            overlay.fill_cell(cell, color);
        }
    }

    fn deactivate(&mut self) {
        self.reset();
    }
}

/// Samples a color from anywhere on screen into the primary slot.
#[derive(Clone, Debug, Default)]
pub struct ColorPicker;

impl ToolHandler for ColorPicker {
    fn on_primary_press(&mut self, _cell: Cell, ctx: &mut ToolContext<'_>) {
        ctx.editor.request_pick();
    }

    fn on_secondary_press(&mut self, _cell: Cell, ctx: &mut ToolContext<'_>) {
        ctx.editor.request_pick();
    }
}

/// Click zooms in, right-click zooms out.
#[derive(Clone, Debug, Default)]
pub struct ZoomTool;

impl ToolHandler for ZoomTool {
    fn on_primary_press(&mut self, _cell: Cell, ctx: &mut ToolContext<'_>) {
        let step = ctx.viewport.step() as i32;
        ctx.zoom(step);
    }

    fn on_secondary_press(&mut self, _cell: Cell, ctx: &mut ToolContext<'_>) {
        let step = ctx.viewport.step() as i32;
        ctx.zoom(-step);
    }
}

/// The closed set of tools, each carrying its own state.
#[derive(Clone, Debug)]
pub enum Tool {
    Pencil(Pencil),
    Line(LineTool),
    Eraser(Eraser),
    ColorPicker(ColorPicker),
    Zoom(ZoomTool),
}

impl Default for Tool {
    fn default() -> Self {
        Tool::from_kind(ToolKind::default())
    }
}

impl Tool {
    pub fn from_kind(kind: ToolKind) -> Self {
        match kind {
            ToolKind::Pencil => Tool::Pencil(Pencil),
            ToolKind::Line => Tool::Line(LineTool::default()),
            ToolKind::Eraser => Tool::Eraser(Eraser),
            ToolKind::ColorPicker => Tool::ColorPicker(ColorPicker),
            ToolKind::Zoom => Tool::Zoom(ZoomTool),
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Tool::Pencil(_) => ToolKind::Pencil,
            Tool::Line(_) => ToolKind::Line,
            Tool::Eraser(_) => ToolKind::Eraser,
            Tool::ColorPicker(_) => ToolKind::ColorPicker,
            Tool::Zoom(_) => ToolKind::Zoom,
        }
    }

    pub fn handler(&self) -> &dyn ToolHandler {
        match self {
            Tool::Pencil(t) => t,
            Tool::Line(t) => t,
            Tool::Eraser(t) => t,
            Tool::ColorPicker(t) => t,
            Tool::Zoom(t) => t,
        }
    }

    pub fn handler_mut(&mut self) -> &mut dyn ToolHandler {
        match self {
            Tool::Pencil(t) => t,
            Tool::Line(t) => t,
            Tool::Eraser(t) => t,
            Tool::ColorPicker(t) => t,
            Tool::Zoom(t) => t,
        }
    }

    pub fn press(&mut self, button: PointerButton, cell: Cell, ctx: &mut ToolContext<'_>) {
        let handler = self.handler_mut();
        match button {
            PointerButton::Primary => handler.on_primary_press(cell, ctx),
            PointerButton::Secondary => handler.on_secondary_press(cell, ctx),
        }
    }

    pub fn hold(&mut self, button: PointerButton, cell: Cell, ctx: &mut ToolContext<'_>) {
        let handler = self.handler_mut();
        match button {
            PointerButton::Primary => handler.on_primary_hold(cell, ctx),
            PointerButton::Secondary => handler.on_secondary_hold(cell, ctx),
        }
    }

    pub fn release(&mut self, button: PointerButton, cell: Cell, ctx: &mut ToolContext<'_>) {
        let handler = self.handler_mut();
        match button {
            PointerButton::Primary => handler.on_primary_release(cell, ctx),
            PointerButton::Secondary => handler.on_secondary_release(cell, ctx),
        }
    }
}
