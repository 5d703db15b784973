//! Conversion modes and the geometry that follows from them.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What the converted graphics will be used for.
///
/// | Mode | Block (palette unit) | Tile | Max tile ID |
/// |------|----------------------|------|-------------|
/// | `background` | 16×16 | 8×8 | 255 |
/// | `sprites8x8` | 8×8 | 8×8 | 255 |
/// | `sprites8x16` | 8×16 | 8×16 | 127 |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Nametable background with an attribute table
    #[default]
    Background,
    /// 8×8 sprites
    #[serde(rename = "sprites8x8")]
    #[value(name = "sprites8x8")]
    Sprites8x8,
    /// 8×16 sprites, each tile is two stacked 8×8 halves
    #[serde(rename = "sprites8x16")]
    #[value(name = "sprites8x16")]
    Sprites8x16,
}

impl Mode {
    /// Width and height of the region that shares one palette.
    ///
    /// ```
    /// use nestile::mode::Mode;
    ///
    /// assert_eq!(Mode::Background.block_size(), (16, 16));
    /// assert_eq!(Mode::Sprites8x16.block_size(), (8, 16));
    /// ```
    pub fn block_size(&self) -> (u32, u32) {
        match self {
            Mode::Background => (16, 16),
            Mode::Sprites8x8 => (8, 8),
            Mode::Sprites8x16 => (8, 16),
        }
    }

    /// Height in pixels of one tile (width is always 8).
    pub fn tile_height(&self) -> u32 {
        match self {
            Mode::Sprites8x16 => 16,
            Mode::Background | Mode::Sprites8x8 => 8,
        }
    }

    /// Largest tile ID the hardware can address in this mode.
    pub fn max_tile_id(&self) -> u32 {
        match self {
            Mode::Sprites8x16 => 127,
            Mode::Background | Mode::Sprites8x8 => 255,
        }
    }

    pub fn is_sprite(&self) -> bool {
        !matches!(self, Mode::Background)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Background => write!(f, "background"),
            Mode::Sprites8x8 => write!(f, "sprites8x8"),
            Mode::Sprites8x16 => write!(f, "sprites8x16"),
        }
    }
}
