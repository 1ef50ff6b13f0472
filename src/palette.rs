use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::color::{Color, ColorParseError};
use crate::controller::PointerButton;

/// Opaque identifier handed out once per distinct color.  A rendering layer
/// keys its per-color display style on this instead of re-deriving it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PaletteId(Uuid);

impl PaletteId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PaletteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "swatch-{}", self.0.simple())
    }
}

// ============================================================================
// PaletteRegistry – color dedup + primary/secondary selection
// ============================================================================

pub struct PaletteRegistry {
    ids: HashMap<Color, PaletteId>,
    primary: Color,
    secondary: Color,
}

impl Default for PaletteRegistry {
    fn default() -> Self {
        let mut registry = Self {
            ids: HashMap::new(),
            primary: Color::BLACK,
            secondary: Color::TRANSPARENT,
        };
        registry.register(Color::BLACK);
        registry.register(Color::TRANSPARENT);
        registry
    }
}

impl PaletteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier for `color`, generating one on first sight.
    pub fn register(&mut self, color: Color) -> PaletteId {
        *self.ids.entry(color).or_insert_with(PaletteId::generate)
    }

    pub fn id_of(&self, color: Color) -> Option<PaletteId> {
        self.ids.get(&color).copied()
    }

    /// Number of distinct colors registered so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Register every color of a preset, returning entries in preset order.
    pub fn register_palette(&mut self, palette: &Palette) -> Vec<(Color, PaletteId)> {
        palette.colors.iter().map(|&c| (c, self.register(c))).collect()
    }

    pub fn primary(&self) -> Color {
        self.primary
    }

    pub fn secondary(&self) -> Color {
        self.secondary
    }

    /// Color bound to a pointer button.
    pub fn color_for(&self, button: PointerButton) -> Color {
        match button {
            PointerButton::Primary => self.primary,
            PointerButton::Secondary => self.secondary,
        }
    }

    pub fn set_primary(&mut self, color: Color) -> PaletteId {
        self.primary = color;
        self.register(color)
    }

    pub fn set_secondary(&mut self, color: Color) -> PaletteId {
        self.secondary = color;
        self.register(color)
    }

    /// Click on a palette entry: left selects primary, right selects secondary.
    pub fn select(&mut self, color: Color, button: PointerButton) -> PaletteId {
        match button {
            PointerButton::Primary => self.set_primary(color),
            PointerButton::Secondary => self.set_secondary(color),
        }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.primary, &mut self.secondary);
    }
}

// ============================================================================
// Palette presets
// ============================================================================

/// The 29-color "cc-29" palette used to seed the palette bar.
const CC_29: [&str; 29] = [
    "#f2f0e5", "#b8b5b9", "#868188", "#646365", "#45444f", "#3a3858", "#212123", "#352b42",
    "#43436a", "#4b80ca", "#68c2d3", "#a2dcc7", "#ede19e", "#d3a068", "#b45252", "#6a536e",
    "#4b4158", "#80493a", "#a77b5b", "#e5ceb4", "#c2d368", "#8ab060", "#567b79", "#4e584a",
    "#7b7243", "#b2b47e", "#edc8c4", "#cf8acb", "#5f556a",
];

pub const DEFAULT_PALETTE: &str = "cc-29";

/// A named, ordered list of swatches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub name: String,
    pub colors: Vec<Color>,
}

impl Palette {
    pub fn from_hex<S: AsRef<str>>(name: &str, hex: &[S]) -> Result<Self, ColorParseError> {
        let colors = hex
            .iter()
            .map(|h| Color::from_hex(h.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { name: name.to_string(), colors })
    }

    /// Built-in preset by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            DEFAULT_PALETTE => Self::from_hex(DEFAULT_PALETTE, &CC_29).ok(),
            _ => None,
        }
    }

    pub fn builtin_names() -> &'static [&'static str] {
        &[DEFAULT_PALETTE]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
