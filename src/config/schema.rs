//! Configuration schema types for `nestile.toml`
//!
//! Defines the structure and validation rules for conversion settings.

use crate::catalog::{CATALOG_SIZE, DEFAULT_FORBIDDEN};
use crate::color::{parse_color_spec, ColorError, ColorSpec};
use crate::mode::Mode;
use crate::palette::{Palette, PALETTE_SLOTS};
use crate::pipeline::ConvertOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Largest pattern offset that still leaves room for one tile.
pub const MAX_PATTERN_OFFSET: u32 = 255;

/// Largest preview upscale factor.
pub const MAX_PREVIEW_SCALE: u8 = 16;

/// Conversion mode and background color
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// What the graphics are for
    #[serde(default)]
    pub mode: Mode,
    /// Shared background color (`#RRGGBB` or catalog index like `$0F`).
    /// Selected automatically when absent, background mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

/// System color catalog settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog file (`.json` or raw `.pal`); built-in 2C02 colors when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Indices never chosen when matching colors
    #[serde(default = "default_forbidden")]
    pub forbidden: Vec<u8>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { path: None, forbidden: default_forbidden() }
    }
}

fn default_forbidden() -> Vec<u8> {
    vec![DEFAULT_FORBIDDEN]
}

/// A palette pinned to one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPaletteConfig {
    /// Palette slot (0-3)
    pub slot: usize,
    /// Up to three colors; the background may be listed too
    pub colors: Vec<String>,
}

/// Palette allocation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalettesConfig {
    /// Slots that may be used
    #[serde(default = "default_enabled")]
    pub enabled: Vec<usize>,
    /// Drop the least used palettes instead of failing
    #[serde(default)]
    pub lossy: bool,
    /// Palettes pinned to slots
    #[serde(default)]
    pub fixed: Vec<FixedPaletteConfig>,
}

impl Default for PalettesConfig {
    fn default() -> Self {
        Self { enabled: default_enabled(), lossy: false, fixed: Vec::new() }
    }
}

fn default_enabled() -> Vec<usize> {
    (0..PALETTE_SLOTS).collect()
}

/// Pattern table settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesConfig {
    /// Keep going when tile IDs exceed the hardware limit
    #[serde(default)]
    pub allow_overflow: bool,
    /// One pattern table for all images
    #[serde(default)]
    pub share_pattern_table: bool,
    /// First tile ID
    #[serde(default)]
    pub pattern_offset: u32,
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory
    #[serde(default = "default_out_dir")]
    pub dir: PathBuf,
    /// Write `<name>.preview.png` for every image
    #[serde(default)]
    pub preview: bool,
    /// Preview upscale factor
    #[serde(default = "default_preview_scale")]
    pub preview_scale: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_out_dir(), preview: false, preview_scale: default_preview_scale() }
    }
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_preview_scale() -> u8 {
    1
}

/// An input image listed in the config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Image file or directory
    pub path: PathBuf,
    /// Pattern offset for this image (overrides `tiles.pattern_offset`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_offset: Option<u32>,
}

/// Complete nestile.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestileConfig {
    #[serde(default)]
    pub convert: ConvertConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub palettes: PalettesConfig,
    #[serde(default)]
    pub tiles: TilesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Images converted when none are given on the command line
    #[serde(default)]
    pub images: Vec<ImageConfig>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "palettes.fixed[0].slot")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "nestile.toml: '{}' {}", self.field, self.message)
    }
}

impl NestileConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut error = |field: String, message: String| errors.push(ConfigValidationError { field, message });

        if let Some(background) = &self.convert.background {
            if let Err(e) = parse_color_spec(background) {
                error("convert.background".to_string(), e.to_string());
            }
        } else if self.convert.mode.is_sprite() {
            error("convert.background".to_string(), format!("is required in {} mode", self.convert.mode));
        }

        for (i, &index) in self.catalog.forbidden.iter().enumerate() {
            if index as usize >= CATALOG_SIZE {
                error(format!("catalog.forbidden[{}]", i), format!("${:02X} is not a catalog index", index));
            }
        }

        let mut seen = BTreeSet::new();
        for (i, &slot) in self.palettes.enabled.iter().enumerate() {
            if slot >= PALETTE_SLOTS {
                error(format!("palettes.enabled[{}]", i), format!("slot {} does not exist (0-3)", slot));
            } else if !seen.insert(slot) {
                error(format!("palettes.enabled[{}]", i), format!("slot {} is listed twice", slot));
            }
        }

        let mut fixed_slots = BTreeSet::new();
        for (i, fixed) in self.palettes.fixed.iter().enumerate() {
            if fixed.slot >= PALETTE_SLOTS {
                error(format!("palettes.fixed[{}].slot", i), format!("slot {} does not exist (0-3)", fixed.slot));
            } else if !fixed_slots.insert(fixed.slot) {
                error(format!("palettes.fixed[{}].slot", i), format!("slot {} is fixed twice", fixed.slot));
            }
            if fixed.colors.is_empty() || fixed.colors.len() > Palette::MAX_COLORS + 1 {
                error(format!("palettes.fixed[{}].colors", i), "must list 1 to 3 colors plus an optional background".to_string());
            }
            for (j, color) in fixed.colors.iter().enumerate() {
                if let Err(e) = parse_color_spec(color) {
                    error(format!("palettes.fixed[{}].colors[{}]", i, j), e.to_string());
                }
            }
        }

        if self.tiles.pattern_offset > MAX_PATTERN_OFFSET {
            error("tiles.pattern_offset".to_string(), format!("must be at most {}", MAX_PATTERN_OFFSET));
        }
        for (i, image) in self.images.iter().enumerate() {
            if image.pattern_offset.is_some_and(|o| o > MAX_PATTERN_OFFSET) {
                error(format!("images[{}].pattern_offset", i), format!("must be at most {}", MAX_PATTERN_OFFSET));
            }
        }

        if self.output.preview_scale == 0 || self.output.preview_scale > MAX_PREVIEW_SCALE {
            error("output.preview_scale".to_string(), format!("must be between 1 and {}", MAX_PREVIEW_SCALE));
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Pipeline options described by this configuration.
    pub fn convert_options(&self) -> Result<ConvertOptions, ColorError> {
        let background = self.convert.background.as_deref().map(parse_color_spec).transpose()?;

        let mut enabled_slots = [false; PALETTE_SLOTS];
        for &slot in &self.palettes.enabled {
            if let Some(enabled) = enabled_slots.get_mut(slot) {
                *enabled = true;
            }
        }

        let mut fixed_palettes: [Option<Vec<ColorSpec>>; PALETTE_SLOTS] = Default::default();
        for fixed in &self.palettes.fixed {
            let colors = fixed.colors.iter().map(|c| parse_color_spec(c)).collect::<Result<Vec<_>, _>>()?;
            if let Some(slot) = fixed_palettes.get_mut(fixed.slot) {
                *slot = Some(colors);
            }
        }

        Ok(ConvertOptions {
            mode: self.convert.mode,
            background,
            enabled_slots,
            fixed_palettes,
            lossy: self.palettes.lossy,
            allow_tile_overflow: self.tiles.allow_overflow,
            share_pattern_table: self.tiles.share_pattern_table,
        })
    }

    /// Pattern offset of a configured image, falling back to the global one.
    pub fn effective_pattern_offset(&self, image: &ImageConfig) -> u32 {
        image.pattern_offset.unwrap_or(self.tiles.pattern_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_parse() {
        let config: NestileConfig = toml::from_str("").unwrap();
        assert_eq!(config, NestileConfig::default());
        assert_eq!(config.convert.mode, Mode::Background);
        assert_eq!(config.catalog.forbidden, vec![0x0D]);
        assert_eq!(config.palettes.enabled, vec![0, 1, 2, 3]);
        assert_eq!(config.output.dir, PathBuf::from("."));
        assert!(config.is_valid());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r##"
[convert]
mode = "sprites8x16"
background = "$0F"

[catalog]
path = "palettes/fceux.pal"
forbidden = [0x0D, 0x1D]

[palettes]
enabled = [0, 2]
lossy = true

[[palettes.fixed]]
slot = 2
colors = ["#B53120", "$27", "0x30"]

[tiles]
allow_overflow = true
share_pattern_table = true
pattern_offset = 16

[output]
dir = "build/chr"
preview = true
preview_scale = 3

[[images]]
path = "art/hero.png"

[[images]]
path = "art/enemies"
pattern_offset = 64
"##;
        let config: NestileConfig = toml::from_str(toml).unwrap();
        assert!(config.is_valid(), "{:?}", config.validate());

        assert_eq!(config.convert.mode, Mode::Sprites8x16);
        assert_eq!(config.catalog.path, Some(PathBuf::from("palettes/fceux.pal")));
        assert_eq!(config.catalog.forbidden, vec![0x0D, 0x1D]);
        assert_eq!(config.palettes.fixed[0].slot, 2);
        assert!(config.tiles.share_pattern_table);
        assert_eq!(config.output.preview_scale, 3);
        assert_eq!(config.effective_pattern_offset(&config.images[0]), 16);
        assert_eq!(config.effective_pattern_offset(&config.images[1]), 64);

        let options = config.convert_options().unwrap();
        assert_eq!(options.mode, Mode::Sprites8x16);
        assert_eq!(options.background, Some(ColorSpec::Index(0x0F)));
        assert_eq!(options.enabled_slots, [true, false, true, false]);
        assert_eq!(options.fixed_palettes[2].as_ref().map(Vec::len), Some(3));
        assert!(options.lossy && options.allow_tile_overflow && options.share_pattern_table);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let toml = r##"
[convert]
background = "#GG0000"

[catalog]
forbidden = [64]

[palettes]
enabled = [0, 4, 0]

[[palettes.fixed]]
slot = 7
colors = []

[tiles]
pattern_offset = 300

[output]
preview_scale = 0
"##;
        let config: NestileConfig = toml::from_str(toml).unwrap();
        let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "convert.background",
                "catalog.forbidden[0]",
                "palettes.enabled[1]",
                "palettes.enabled[2]",
                "palettes.fixed[0].slot",
                "palettes.fixed[0].colors",
                "tiles.pattern_offset",
                "output.preview_scale",
            ]
        );
    }

    #[test]
    fn test_sprite_mode_requires_background() {
        let config: NestileConfig = toml::from_str("[convert]\nmode = \"sprites8x8\"").unwrap();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "nestile.toml: 'convert.background' is required in sprites8x8 mode");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result: Result<NestileConfig, _> = toml::from_str("[convert]\nmode = \"sprites\"");
        assert!(result.is_err());
    }
}
