//! Error types for the conversion pipeline

use crate::mode::Mode;
use thiserror::Error;

/// A fatal conversion error. Every stage aborts the run on the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// The catalog has nothing to match against, or an index has no color
    #[error("Color {color} not found in the system color catalog")]
    ColorNotFound { color: String },
    /// Image size is not a multiple of the mode's block size
    #[error("Image '{image}' ({width}x{height}) is not a multiple of the {block_w}x{block_h} block size required by {mode} mode", block_w = block_size.0, block_h = block_size.1)]
    InvalidBlockSize { image: String, width: u32, height: u32, block_size: (u32, u32), mode: Mode },
    /// Sprite modes cannot guess the transparent color
    #[error("{mode} mode requires an explicit background color")]
    MissingBackgroundColor { mode: Mode },
    /// Too many distinct palettes for the enabled slots
    #[error("{required} palettes are required but only {available} palette slots are available (use lossy mode to drop the rest)")]
    PaletteOverflow { required: usize, available: usize },
    /// Tile ID outside the range the hardware can address
    #[error("Tile ID {id} in pattern table '{scope}' exceeds the maximum of {max} (too many distinct tiles)")]
    TileOverflow { scope: String, id: u32, max: u32 },
    /// A fixed palette lists more colors than a palette can hold
    #[error("Fixed palette for slot {slot} has {count} colors; at most 3 are allowed")]
    InvalidFixedPalette { slot: usize, count: usize },
    /// Operation not available in the selected mode
    #[error("{operation} is not supported in {mode} mode")]
    UnsupportedMode { operation: &'static str, mode: Mode },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ConvertError::InvalidBlockSize {
            image: "title".to_string(),
            width: 20,
            height: 16,
            block_size: (16, 16),
            mode: Mode::Background,
        };
        assert_eq!(
            err.to_string(),
            "Image 'title' (20x16) is not a multiple of the 16x16 block size required by background mode"
        );

        let err = ConvertError::PaletteOverflow { required: 5, available: 4 };
        assert!(err.to_string().starts_with("5 palettes are required but only 4"));
    }
}
