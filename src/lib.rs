//! Nestile - convert images into NES graphics data
//!
//! This library provides functionality to:
//! - Match arbitrary colors to the 64-entry system color catalog
//! - Extract, merge and allocate the four shared palettes
//! - Assign a palette to every block and re-quantize its pixels
//! - Encode deduplicated 8×8 / 8×16 tiles, nametables and attribute tables
//! - Render previews and write the binary tables to disk
//!
//! The conversion itself lives in [`pipeline::convert`]; everything it
//! produces stays in memory until [`output::write_outputs`] is called.

pub mod allocate;
pub mod assign;
pub mod attributes;
pub mod background;
pub mod bitmap;
pub mod catalog;
pub mod cli;
pub mod color;
pub mod color_mapper;
pub mod config;
pub mod error;
pub mod extract;
pub mod mode;
pub mod output;
pub mod palette;
pub mod pipeline;
pub mod preview;
pub mod tiles;

pub use error::ConvertError;
pub use mode::Mode;
pub use pipeline::{convert, ConversionContext, ConversionResult, ConvertOptions, ImageInput};
