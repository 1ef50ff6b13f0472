use std::path::{Path, PathBuf};

use crate::color::Color;
use crate::controller::ZoomLimits;
use crate::palette::{DEFAULT_PALETTE, Palette};

const SETTINGS_FILE: &str = "pixelgrid_settings.cfg";

/// Canvas sizes offered by the "new canvas" dialog and the CLI.
pub const CANVAS_PRESETS: [u32; 5] = [4, 8, 16, 32, 64];

/// Persistent engine preferences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub zoom_min: u32,
    pub zoom_max: u32,
    pub zoom_step: u32,
    pub initial_cell_size: u32,

    pub canvas_width: u32,
    pub canvas_height: u32,
    pub canvas_fill: Color,

    /// Outline drawn around the hovered cell.
    pub cursor_color: Color,
    /// Name of the builtin palette loaded at startup.
    pub palette: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let zoom = ZoomLimits::default();
        Self {
            zoom_min: zoom.min,
            zoom_max: zoom.max,
            zoom_step: zoom.step,
            initial_cell_size: zoom.initial,

            canvas_width: 16,
            canvas_height: 16,
            canvas_fill: Color::TRANSPARENT,

            cursor_color: Color::rgb(0, 0, 255),
            palette: DEFAULT_PALETTE.to_string(),
        }
    }
}

impl EngineSettings {
    /// `pixelgrid_settings.cfg` in the per-user config folder, created if
    /// missing.  Falls back to the executable's directory.
    pub fn settings_path() -> Option<PathBuf> {
        let dir = match config_base() {
            Some(base) => base.join(if cfg!(target_os = "linux") { "pixelgrid" } else { "PixelGrid" }),
            None => std::env::current_exe().ok()?.parent()?.to_path_buf(),
        };
        std::fs::create_dir_all(&dir).ok()?;
        Some(dir.join(SETTINGS_FILE))
    }

    /// Serialize a Color as "r,g,b,a"
    fn color_to_str(c: Color) -> String {
        format!("{},{},{},{}", c.r, c.g, c.b, c.a)
    }

    /// Parse a Color from "r,g,b,a" or a hex string.
    fn str_to_color(s: &str) -> Option<Color> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() == 4 {
            let r = parts[0].trim().parse::<u8>().ok()?;
            let g = parts[1].trim().parse::<u8>().ok()?;
            let b = parts[2].trim().parse::<u8>().ok()?;
            let a = parts[3].trim().parse::<u8>().ok()?;
            Some(Color::new(r, g, b, a))
        } else {
            Color::from_hex(s).ok()
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "zoom_min={}\n\
             zoom_max={}\n\
             zoom_step={}\n\
             initial_cell_size={}\n\
             canvas_width={}\n\
             canvas_height={}\n\
             canvas_fill={}\n\
             cursor_color={}\n\
             palette={}\n",
            self.zoom_min,
            self.zoom_max,
            self.zoom_step,
            self.initial_cell_size,
            self.canvas_width,
            self.canvas_height,
            Self::color_to_str(self.canvas_fill),
            Self::color_to_str(self.cursor_color),
            self.palette,
        )
    }

    /// Parse settings text.  Unknown keys are skipped and bad values keep
    /// their defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "zoom_min" => {
                    if let Ok(v) = val.parse() { s.zoom_min = v; }
                }
                "zoom_max" => {
                    if let Ok(v) = val.parse() { s.zoom_max = v; }
                }
                "zoom_step" => {
                    if let Ok(v) = val.parse() { s.zoom_step = v; }
                }
                "initial_cell_size" => {
                    if let Ok(v) = val.parse() { s.initial_cell_size = v; }
                }
                "canvas_width" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.canvas_width = v;
                    }
                }
                "canvas_height" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.canvas_height = v;
                    }
                }
                "canvas_fill" => {
                    if let Some(c) = Self::str_to_color(val) { s.canvas_fill = c; }
                }
                "cursor_color" => {
                    if let Some(c) = Self::str_to_color(val) { s.cursor_color = c; }
                }
                "palette" => {
                    if Palette::builtin(val).is_some() {
                        s.palette = val.to_string();
                    } else {
                        log_warn!("Unknown palette '{}' in settings, using {}", val, DEFAULT_PALETTE);
                    }
                }
                _ => {}
            }
        }
        s
    }

    /// Settings from the config folder; defaults when there is none.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    /// Read settings from `path`.  A missing file is seeded with the defaults
    /// so there is something to edit; an unreadable one is left alone.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let defaults = Self::default();
                match defaults.save_to(path) {
                    Ok(()) => log_info!("Wrote default settings to {}", path.display()),
                    Err(e) => log_warn!("Failed to write settings {}: {}", path.display(), e),
                }
                defaults
            }
            Err(e) => {
                log_warn!("Failed to read settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_config_string())
    }

    /// Zoom bounds for the viewport, repaired if the file held nonsense.
    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            min: self.zoom_min,
            max: self.zoom_max,
            step: self.zoom_step,
            initial: self.initial_cell_size,
        }
        .sanitized()
    }

    /// Startup palette, falling back to the default preset.
    pub fn startup_palette(&self) -> Option<Palette> {
        Palette::builtin(&self.palette).or_else(|| Palette::builtin(DEFAULT_PALETTE))
    }
}

/// Per-OS base for application config folders.
fn config_base() -> Option<PathBuf> {
    let var = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from);
    if cfg!(target_os = "windows") {
        var("APPDATA").or_else(|| var("USERPROFILE"))
    } else if cfg!(target_os = "macos") {
        var("HOME").map(|home| home.join("Library").join("Application Support"))
    } else if cfg!(target_os = "linux") {
        var("XDG_CONFIG_HOME").or_else(|| var("HOME").map(|home| home.join(".config")))
    } else {
        None
    }
}
