use egui::{ColorImage, Pos2, Rect};
use image::RgbaImage;
use std::path::{Path, PathBuf};

use crate::canvas::PixelBuffer;
use crate::color::Color;
use crate::context::EditorContext;
use crate::controller::{PointerButton, ToolController};
use crate::error::EngineError;
use crate::io;
use crate::palette::{Palette, PaletteId, PaletteRegistry};
use crate::picker::{PickResult, ScreenSampler, UnavailableSampler};
use crate::project::{self, ProjectError, SpriteDocument};
use crate::render::to_color_image;
use crate::settings::{CANVAS_PRESETS, EngineSettings};
use crate::tools::ToolKind;

/// Requested size for a new canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanvasSize {
    /// Square canvas, one of [`CANVAS_PRESETS`].
    Preset(u32),
    Custom { width: u32, height: u32 },
}

impl CanvasSize {
    pub fn dimensions(self) -> Result<(u32, u32), EngineError> {
        match self {
            CanvasSize::Preset(side) if CANVAS_PRESETS.contains(&side) => Ok((side, side)),
            CanvasSize::Preset(side) => Err(EngineError::InvalidDimensions { width: side, height: side }),
            CanvasSize::Custom { width, height } => Ok((width, height)),
        }
    }
}

/// One open sprite: the editor state, the tool controller driving it and the
/// preferences it was started with.  Hosts feed pointer events in and pull
/// frames out.
pub struct Session {
    editor: EditorContext,
    controller: ToolController,
    settings: EngineSettings,
    /// `None` until the sprite has been opened from or saved to disk.
    path: Option<PathBuf>,
}

impl Session {
    pub fn new(settings: EngineSettings, sampler: Box<dyn ScreenSampler>) -> Result<Self, EngineError> {
        let buffer = PixelBuffer::create(settings.canvas_width, settings.canvas_height, settings.canvas_fill)?;
        let mut controller = ToolController::new(settings.zoom_limits(), settings.cursor_color);
        let cell_size = controller.fit_cell_size(buffer.width(), buffer.height())?;
        controller.viewport_mut().set_cell_size(cell_size);
        let mut editor = EditorContext::new(buffer, cell_size, sampler)?;
        if let Some(palette) = settings.startup_palette() {
            editor.palette.register_palette(&palette);
        }
        log_info!(
            "Session started: {}x{} canvas, cell size {}",
            settings.canvas_width,
            settings.canvas_height,
            controller.viewport().cell_size()
        );
        Ok(Self { editor, controller, settings, path: None })
    }

    /// Session without screen sampling, for the CLI and tests.
    pub fn headless(settings: EngineSettings) -> Result<Self, EngineError> {
        Self::new(settings, Box::new(UnavailableSampler))
    }

    // ---- canvas -------------------------------------------------------------

    pub fn new_canvas(&mut self, size: CanvasSize, fill: Color) -> Result<(), EngineError> {
        let (width, height) = size.dimensions()?;
        let buffer = PixelBuffer::create(width, height, fill)?;
        self.controller
            .install_buffer(&mut self.editor, buffer)
            .inspect_err(|e| log_err!("New canvas refused: {}", e))?;
        self.path = None;
        log_info!("New canvas {}x{} filled {}", width, height, fill);
        Ok(())
    }

    /// Load an image as the canvas.  On failure the current canvas stays.
    pub fn open(&mut self, path: &Path) -> Result<(), EngineError> {
        let loaded = io::open_buffer(path).and_then(|buffer| self.controller.install_buffer(&mut self.editor, buffer));
        match loaded {
            Ok(()) => {
                log_info!("Opened {} ({}x{})", path.display(), self.editor.buffer.width(), self.editor.buffer.height());
                self.path = Some(path.to_path_buf());
                Ok(())
            }
            Err(e) => {
                log_err!("Failed to open {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    pub fn save(&mut self, path: &Path) -> Result<(), EngineError> {
        match io::save_buffer(path, &self.editor.buffer) {
            Ok(()) => {
                log_info!("Saved {}", path.display());
                self.path = Some(path.to_path_buf());
                Ok(())
            }
            Err(e) => {
                log_err!("Failed to save {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    pub fn save_project(&mut self, path: &Path) -> Result<(), ProjectError> {
        let doc = SpriteDocument {
            buffer: self.editor.buffer.clone(),
            primary: self.editor.palette.primary(),
            secondary: self.editor.palette.secondary(),
        };
        project::save_sprite(&doc, path).inspect_err(|e| log_err!("Failed to save {}: {}", path.display(), e))?;
        log_info!("Saved project {}", path.display());
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn open_project(&mut self, path: &Path) -> Result<(), ProjectError> {
        let doc = project::load_sprite(path).inspect_err(|e| log_err!("Failed to open {}: {}", path.display(), e))?;
        self.controller
            .install_buffer(&mut self.editor, doc.buffer)
            .inspect_err(|e| log_err!("Failed to open {}: {}", path.display(), e))?;
        self.editor.palette.set_primary(doc.primary);
        self.editor.palette.set_secondary(doc.secondary);
        self.path = Some(path.to_path_buf());
        log_info!("Opened project {}", path.display());
        Ok(())
    }

    // ---- palette ------------------------------------------------------------

    /// Register every color of an image and return them as a palette.
    pub fn import_palette(&mut self, path: &Path) -> Result<Palette, EngineError> {
        let palette = io::palette_from_image(path)?;
        self.editor.palette.register_palette(&palette);
        log_info!("Imported {} colors from {}", palette.len(), path.display());
        Ok(palette)
    }

    /// Palette swatch clicked: left sets primary, right sets secondary.
    pub fn select_palette_entry(&mut self, color: Color, button: PointerButton) -> PaletteId {
        self.editor.palette.select(color, button)
    }

    // ---- input --------------------------------------------------------------

    pub fn set_tool(&mut self, kind: ToolKind) {
        self.controller.set_active(kind);
    }

    pub fn pointer_press(&mut self, button: PointerButton, pos: Pos2) {
        self.controller.pointer_press(&mut self.editor, button, pos);
    }

    pub fn pointer_motion(&mut self, pos: Pos2) {
        self.controller.pointer_motion(&mut self.editor, pos);
    }

    pub fn pointer_release(&mut self, button: PointerButton, pos: Pos2) {
        self.controller.pointer_release(&mut self.editor, button, pos);
    }

    pub fn pointer_leave(&mut self) {
        self.controller.pointer_leave();
    }

    pub fn zoom_in(&mut self) -> bool {
        self.controller.zoom_in(&mut self.editor)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.controller.zoom_out(&mut self.editor)
    }

    pub fn scroll(&mut self, delta_y: f32, modifier: bool) -> bool {
        self.controller.scroll(&mut self.editor, delta_y, modifier)
    }

    /// Start a screen pick without going through the picker tool.
    pub fn pick_color(&mut self) {
        self.editor.request_pick();
    }

    /// Apply finished picks.  Call once per frame.
    pub fn poll_picks(&mut self) -> Vec<PickResult> {
        self.editor.poll_picks()
    }

    // ---- output -------------------------------------------------------------

    /// Cached canvas with tool preview and cursor drawn on top.
    pub fn frame(&self) -> RgbaImage {
        let overlay = self.controller.draw_overlay(&self.editor);
        self.editor.cache.compose(&overlay)
    }

    pub fn frame_color_image(&self) -> ColorImage {
        to_color_image(&self.frame())
    }

    /// Surface region changed since the last call, if any.
    pub fn take_dirty_rect(&mut self) -> Option<Rect> {
        self.editor.cache.take_dirty_rect()
    }

    // ---- accessors ----------------------------------------------------------

    pub fn buffer(&self) -> &PixelBuffer {
        &self.editor.buffer
    }

    pub fn palette(&self) -> &PaletteRegistry {
        &self.editor.palette
    }

    pub fn editor(&self) -> &EditorContext {
        &self.editor
    }

    pub fn controller(&self) -> &ToolController {
        &self.controller
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn cell_size(&self) -> u32 {
        self.controller.viewport().cell_size()
    }

    pub fn zoom_label(&self) -> String {
        format!("{}%", self.controller.viewport().zoom_percent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::ChannelSampler;
    use egui::pos2;

    fn temp_path(ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pixelgrid-session-{}.{}", uuid::Uuid::new_v4(), ext))
    }

    fn session() -> Session {
        Session::headless(EngineSettings::default()).unwrap()
    }

    /// Screen position at the centre of a cell at the current zoom.
    fn at(s: &Session, x: i32, y: i32) -> Pos2 {
        let cs = s.cell_size() as f32;
        pos2(x as f32 * cs + cs / 2.0, y as f32 * cs + cs / 2.0)
    }

    #[test]
    fn new_canvas_is_transparent() {
        let mut s = session();
        s.new_canvas(CanvasSize::Preset(4), Color::TRANSPARENT).unwrap();
        assert_eq!((s.buffer().width(), s.buffer().height()), (4, 4));
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(s.buffer().get(x, y), Color::TRANSPARENT);
            }
        }
    }

    #[test]
    fn rejects_bad_canvas_sizes() {
        let mut s = session();
        assert!(s.new_canvas(CanvasSize::Preset(5), Color::WHITE).is_err());
        assert!(s.new_canvas(CanvasSize::Custom { width: 0, height: 3 }, Color::WHITE).is_err());
        assert_eq!(s.buffer().width(), 16);
        s.new_canvas(CanvasSize::Custom { width: 7, height: 3 }, Color::WHITE).unwrap();
        assert_eq!(s.buffer().get(6, 2), Color::WHITE);
    }

    #[test]
    fn startup_palette_is_registered() {
        let s = session();
        let cc29 = Palette::builtin("cc-29").unwrap();
        assert!(cc29.colors.iter().all(|c| s.palette().id_of(*c).is_some()));
    }

    #[test]
    fn eraser_makes_cell_transparent() {
        let mut s = session();
        s.new_canvas(CanvasSize::Preset(4), Color::WHITE).unwrap();
        s.set_tool(ToolKind::Eraser);
        let p = at(&s, 2, 1);
        s.pointer_press(PointerButton::Primary, p);
        s.pointer_release(PointerButton::Primary, p);
        assert_eq!(s.buffer().get(2, 1), Color::TRANSPARENT);
        assert_eq!(s.buffer().get(1, 1), Color::WHITE);
    }

    #[test]
    fn frame_shows_paint_and_cursor() {
        let mut s = session();
        s.new_canvas(CanvasSize::Preset(4), Color::TRANSPARENT).unwrap();
        let p = at(&s, 0, 0);
        s.pointer_press(PointerButton::Primary, p);
        s.pointer_release(PointerButton::Primary, p);
        s.pointer_motion(at(&s, 3, 3));
        let cs = s.cell_size();
        let frame = s.frame();
        assert_eq!(frame.dimensions(), (4 * cs, 4 * cs));
        assert_eq!(frame.get_pixel(cs / 2, cs / 2).0, [0, 0, 0, 255]);
        // Outline sits one pixel inside the hovered cell.
        assert_eq!(frame.get_pixel(3 * cs + 1, 3 * cs + 1).0, [0, 0, 255, 255]);
        assert_eq!(frame.get_pixel(3 * cs + cs / 2, 3 * cs + cs / 2).0, [0, 0, 0, 0]);
        let image = s.frame_color_image();
        assert_eq!(image.size, [(4 * cs) as usize, (4 * cs) as usize]);
    }

    #[test]
    fn painting_reports_dirty_region() {
        let mut s = session();
        s.new_canvas(CanvasSize::Preset(8), Color::TRANSPARENT).unwrap();
        s.take_dirty_rect();
        let p = at(&s, 2, 3);
        s.pointer_press(PointerButton::Primary, p);
        let cs = s.cell_size() as f32;
        let dirty = s.take_dirty_rect().unwrap();
        assert_eq!(dirty.min, pos2(2.0 * cs, 3.0 * cs));
        assert_eq!(dirty.max, pos2(3.0 * cs, 4.0 * cs));
        assert!(s.take_dirty_rect().is_none());
    }

    #[test]
    fn failed_open_keeps_canvas() {
        let mut s = session();
        s.new_canvas(CanvasSize::Preset(4), Color::WHITE).unwrap();
        let missing = temp_path("png");
        assert!(s.open(&missing).is_err());
        assert_eq!(s.buffer().width(), 4);
        assert_eq!(s.buffer().get(0, 0), Color::WHITE);
        assert!(s.path().is_none());
    }

    #[test]
    fn open_refuses_images_too_large_to_display() {
        let settings = EngineSettings { zoom_min: 40, zoom_max: 40, initial_cell_size: 40, ..Default::default() };
        let mut s = Session::headless(settings).unwrap();
        s.new_canvas(CanvasSize::Preset(4), Color::WHITE).unwrap();
        let path = temp_path("png");
        io::save_image(&path, &vec![vec![Color::BLACK; 300]; 300]).unwrap();
        let result = s.open(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(EngineError::SurfaceTooLarge { width: 300, height: 300, .. })));
        assert_eq!(s.buffer().width(), 4);
        assert_eq!(s.buffer().get(0, 0), Color::WHITE);
        assert_eq!(s.editor().cache.surface().dimensions(), (160, 160));
        assert!(s.path().is_none());
        assert!(s.new_canvas(CanvasSize::Custom { width: 300, height: 300 }, Color::WHITE).is_err());
        assert_eq!(s.buffer().width(), 4);
    }

    #[test]
    fn save_and_reopen_image() {
        let mut s = session();
        s.new_canvas(CanvasSize::Custom { width: 3, height: 2 }, Color::TRANSPARENT).unwrap();
        let p = at(&s, 1, 1);
        s.pointer_press(PointerButton::Primary, p);
        let path = temp_path("png");
        s.save(&path).unwrap();

        let mut other = session();
        other.open(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(other.buffer(), s.buffer());
        assert_eq!(other.path(), Some(path.as_path()));
        assert_eq!(other.editor().cache.surface().dimensions(), (3 * 20, 2 * 20));
    }

    #[test]
    fn project_restores_active_colors() {
        let mut s = session();
        s.select_palette_entry(Color::rgb(200, 10, 10), PointerButton::Primary);
        s.select_palette_entry(Color::rgb(10, 200, 10), PointerButton::Secondary);
        let p = at(&s, 5, 5);
        s.pointer_press(PointerButton::Secondary, p);
        let path = temp_path("pgrid");
        s.save_project(&path).unwrap();

        let mut other = session();
        other.open_project(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(other.buffer().get(5, 5), Color::rgb(10, 200, 10));
        assert_eq!(other.palette().primary(), Color::rgb(200, 10, 10));
        assert_eq!(other.palette().secondary(), Color::rgb(10, 200, 10));
    }

    #[test]
    fn palette_import_registers_colors() {
        let path = temp_path("png");
        let rows = vec![vec![Color::rgb(1, 2, 3), Color::rgb(4, 5, 6)]];
        io::save_image(&path, &rows).unwrap();
        let mut s = session();
        let palette = s.import_palette(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(palette.len(), 2);
        assert!(s.palette().id_of(Color::rgb(4, 5, 6)).is_some());
    }

    #[test]
    fn picked_color_becomes_primary() {
        let (sampler, inbox) = ChannelSampler::new();
        let mut s = Session::new(EngineSettings::default(), Box::new(sampler)).unwrap();
        s.set_tool(ToolKind::ColorPicker);
        let p = at(&s, 0, 0);
        s.pointer_press(PointerButton::Primary, p);
        s.pointer_release(PointerButton::Primary, p);
        assert!(s.poll_picks().is_empty());
        inbox.recv().unwrap().resolve(Color::rgb(40, 50, 60));
        assert_eq!(s.poll_picks(), vec![Ok(Color::rgb(40, 50, 60))]);
        assert_eq!(s.palette().primary(), Color::rgb(40, 50, 60));
    }

    #[test]
    fn zoom_label_tracks_cell_size() {
        let mut s = session();
        assert_eq!(s.zoom_label(), "100%");
        assert!(s.zoom_out());
        assert_eq!(s.cell_size(), 18);
        assert_eq!(s.zoom_label(), "90%");
        assert!(!s.scroll(-1.0, false));
        assert_eq!(s.editor().cache.cell_size(), 18);
    }
}
