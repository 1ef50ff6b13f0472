//! PixelGrid: a pixel-art canvas engine.
//!
//! A [`Session`] owns the sprite ([`PixelBuffer`]), the active colors
//! ([`PaletteRegistry`]), the composited bitmap ([`RenderCache`]) and the
//! [`ToolController`] that turns pointer events into tool actions.  Hosts
//! feed it screen-space pointer events and upload [`Session::frame`] output.

#[macro_use]
pub mod logger;

pub mod canvas;
pub mod cli;
pub mod color;
pub mod context;
pub mod controller;
pub mod error;
pub mod io;
pub mod palette;
pub mod picker;
pub mod project;
pub mod raster;
pub mod render;
pub mod session;
pub mod settings;
pub mod tools;

pub use canvas::PixelBuffer;
pub use color::{Color, ColorParseError};
pub use context::EditorContext;
pub use controller::{PointerButton, ToolController, Viewport, ZoomLimits};
pub use error::{EngineError, PickError};
pub use palette::{Palette, PaletteId, PaletteRegistry};
pub use picker::{ChannelSampler, PickRequest, PickResponder, ScreenSampler};
pub use project::{ProjectError, SpriteDocument};
pub use raster::{Cell, LineIter, trace_line};
pub use render::{Overlay, RenderCache};
pub use session::{CanvasSize, Session};
pub use settings::EngineSettings;
pub use tools::{Tool, ToolHandler, ToolKind};
