// ============================================================================
// PixelGrid CLI: headless sprite operations via command-line arguments
// ============================================================================
//
// Usage examples:
//   pixelgrid new --size 32 --fill "#ffffffff" -o blank.png
//   pixelgrid new --width 24 --height 12 -o hero.pgrid
//   pixelgrid palette "refs/*.png" swatch.png
//   pixelgrid line sprite.png --from 0,0 --to 15,15 --color "#ff0000" -o out.png
//   pixelgrid info "sprites/*.png"
//
// Everything runs synchronously on the current thread through a headless
// Session, so the CLI exercises exactly the same tool paths as the editor.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use egui::{Pos2, pos2};

use crate::color::Color;
use crate::controller::PointerButton;
use crate::io;
use crate::logger;
use crate::project;
use crate::raster::Cell;
use crate::session::{CanvasSize, Session};
use crate::settings::{CANVAS_PRESETS, EngineSettings};
use crate::tools::ToolKind;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelGrid headless sprite tool.
#[derive(Parser, Debug)]
#[command(
    name = "pixelgrid",
    about = "PixelGrid headless pixel-art tool",
    long_about = "Create canvases, draw lines, extract palettes and inspect images\n\
                  without opening an editor. Reads any format the image crate\n\
                  decodes; writes PNG or the native .pgrid document.\n\n\
                  Example:\n  \
                  pixelgrid new --size 32 -o blank.png\n  \
                  pixelgrid palette \"refs/*.png\""
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Print timing and the session log location.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a blank canvas and write it out.
    New(NewArgs),
    /// Print the sorted, de-duplicated colors of one or more images.
    Palette(PaletteArgs),
    /// Draw a straight line onto an image with the Line tool.
    Line(LineArgs),
    /// Print size and distinct color count of one or more images.
    Info(InfoArgs),
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Square preset size: 4, 8, 16, 32 or 64.
    #[arg(long, conflicts_with_all = ["width", "height"])]
    pub size: Option<u32>,

    /// Custom width in cells (requires --height).
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Custom height in cells (requires --width).
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Fill color, `#rrggbb` or `#rrggbbaa`.  Defaults to the configured fill.
    #[arg(long, value_name = "HEX")]
    pub fill: Option<Color>,

    /// Output file; `.pgrid` writes a sprite document, anything else PNG.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct PaletteArgs {
    /// Input image(s). Glob patterns accepted (e.g. "*.png").
    #[arg(required = true, num_args = 1..)]
    pub input: Vec<String>,
}

#[derive(Args, Debug)]
pub struct LineArgs {
    /// Image or `.pgrid` document to draw on.
    pub input: PathBuf,

    /// Start cell as `x,y`.
    #[arg(long, value_parser = parse_cell, allow_hyphen_values = true)]
    pub from: Cell,

    /// End cell as `x,y`.
    #[arg(long, value_parser = parse_cell, allow_hyphen_values = true)]
    pub to: Cell,

    /// Line color.  Defaults to the document's primary color.
    #[arg(long, value_name = "HEX")]
    pub color: Option<Color>,

    /// Output file.  Defaults to overwriting the input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Input image(s). Glob patterns accepted.
    #[arg(required = true, num_args = 1..)]
    pub input: Vec<String>,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run one command and return an OS exit code.
/// `0` = success, `1` = failure (details on stderr).
pub fn run(args: CliArgs) -> ExitCode {
    let settings = EngineSettings::load();
    let start = Instant::now();
    let result = match &args.command {
        Command::New(a) => run_new(a, &settings).map(|path| println!("{}", path.display())),
        Command::Palette(a) => palette_lines(&resolve_inputs(&a.input)).map(|lines| {
            for line in lines {
                println!("{}", line);
            }
        }),
        Command::Line(a) => run_line(a, &settings).map(|path| println!("{}", path.display())),
        Command::Info(a) => info_lines(&resolve_inputs(&a.input)).map(|lines| {
            for line in lines {
                println!("{}", line);
            }
        }),
    };
    if args.verbose {
        println!("done in {:.0}ms", start.elapsed().as_secs_f64() * 1000.0);
        if let Some(path) = logger::log_path() {
            println!("log: {}", path.display());
        }
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_err!("CLI: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_new(args: &NewArgs, settings: &EngineSettings) -> Result<PathBuf, String> {
    let size = match (args.size, args.width, args.height) {
        (Some(side), _, _) => CanvasSize::Preset(side),
        (None, Some(width), Some(height)) => CanvasSize::Custom { width, height },
        _ => CanvasSize::Custom {
            width: settings.canvas_width,
            height: settings.canvas_height,
        },
    };
    if let CanvasSize::Preset(side) = size
        && !CANVAS_PRESETS.contains(&side)
    {
        return Err(format!("--size must be one of {:?}, got {}", CANVAS_PRESETS, side));
    }
    let fill = args.fill.unwrap_or(settings.canvas_fill);

    let mut session = Session::headless(settings.clone()).map_err(|e| e.to_string())?;
    session.new_canvas(size, fill).map_err(|e| e.to_string())?;
    write_output(&mut session, &args.output)?;
    Ok(args.output.clone())
}

fn run_line(args: &LineArgs, settings: &EngineSettings) -> Result<PathBuf, String> {
    let mut session = Session::headless(settings.clone()).map_err(|e| e.to_string())?;
    if project::is_sprite_path(&args.input) {
        session.open_project(&args.input).map_err(|e| format!("load failed: {}", e))?;
    } else {
        session.open(&args.input).map_err(|e| format!("load failed: {}", e))?;
    }
    if let Some(color) = args.color {
        session.select_palette_entry(color, PointerButton::Primary);
    }

    session.set_tool(ToolKind::Line);
    let cs = session.cell_size();
    session.pointer_press(PointerButton::Primary, cell_center(args.from, cs));
    session.pointer_motion(cell_center(args.to, cs));
    session.pointer_release(PointerButton::Primary, cell_center(args.to, cs));

    let output = args.output.clone().unwrap_or_else(|| args.input.clone());
    write_output(&mut session, &output)?;
    Ok(output)
}

/// One `#rrggbbaa` line per distinct color across all inputs.
fn palette_lines(inputs: &[PathBuf]) -> Result<Vec<String>, String> {
    if inputs.is_empty() {
        return Err("no input files matched the given pattern(s)".into());
    }
    let mut colors = BTreeSet::new();
    for path in inputs {
        let found = io::palette_colors_from_image(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        colors.extend(found);
    }
    Ok(colors.into_iter().collect())
}

fn info_lines(inputs: &[PathBuf]) -> Result<Vec<String>, String> {
    if inputs.is_empty() {
        return Err("no input files matched the given pattern(s)".into());
    }
    inputs
        .iter()
        .map(|path| {
            let buffer = io::open_buffer(path).map_err(|e| format!("{}: {}", path.display(), e))?;
            Ok(format!(
                "{}: {}x{}, {} colors",
                path.display(),
                buffer.width(),
                buffer.height(),
                buffer.distinct_colors()
            ))
        })
        .collect()
}

// ============================================================================
// Helpers
// ============================================================================

fn write_output(session: &mut Session, output: &Path) -> Result<(), String> {
    if project::is_sprite_path(output) {
        session.save_project(output).map_err(|e| format!("save failed: {}", e))
    } else {
        session.save(output).map_err(|e| format!("save failed: {}", e))
    }
}

/// Screen position in the middle of `cell` at the given zoom.
fn cell_center((x, y): Cell, cell_size: u32) -> Pos2 {
    let cs = cell_size as f32;
    pos2(x as f32 * cs + cs / 2.0, y as f32 * cs + cs / 2.0)
}

/// Parse `x,y` into a cell.
fn parse_cell(s: &str) -> Result<Cell, String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected x,y, got '{}'", s))?;
    let x = x.trim().parse::<i32>().map_err(|e| format!("bad x '{}': {}", x, e))?;
    let y = y.trim().parse::<i32>().map_err(|e| format!("bad y '{}': {}", y, e))?;
    Ok((x, y))
}

/// Literal paths and glob matches, first occurrence wins.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    patterns
        .iter()
        .flat_map(|pattern| expand_pattern(pattern))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// An existing path is taken as-is, so file names containing `[` work.
fn expand_pattern(pattern: &str) -> Vec<PathBuf> {
    let literal = PathBuf::from(pattern);
    if literal.exists() {
        return vec![literal];
    }
    let matches: Vec<PathBuf> = match glob::glob(pattern) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(e) => {
            eprintln!("warning: invalid glob '{}': {}", pattern, e);
            return Vec::new();
        }
    };
    if matches.is_empty() {
        eprintln!("warning: '{}' matched nothing", pattern);
    }
    matches
}
