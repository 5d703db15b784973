//! Conversion pipeline orchestration.
//!
//! [`convert`] runs every stage in order over all input images and returns the
//! complete result in memory. Nothing is written anywhere: a run either
//! produces a full [`ConversionResult`] or fails with the first error.
//!
//! 1. Check block alignment of every image
//! 2. Resolve fixed palettes and the background color (selecting one if needed)
//! 3. Count raw block palettes and allocate the free slots
//! 4. Assign a palette to every block and re-quantize
//! 5. Encode tiles into one pattern table per scope
//! 6. Pack attribute tables (background mode)

use crate::allocate::allocate_palettes;
use crate::assign::{assign_blocks, Assignment};
use crate::attributes::encode_attributes;
use crate::background::select_background;
use crate::bitmap::IndexedImage;
use crate::catalog::Catalog;
use crate::color::ColorSpec;
use crate::color_mapper::ColorMapper;
use crate::error::ConvertError;
use crate::extract::count_usage;
use crate::mode::Mode;
use crate::palette::{Palette, PaletteSet, PALETTE_SLOTS};
use crate::tiles::{encode_tiles, nametable_bytes, PatternTable};
use log::{debug, info, warn};

/// Name of the pattern table scope shared by all images.
pub const SHARED_SCOPE: &str = "shared";

/// Everything that controls one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub mode: Mode,
    /// Shared background color; selected automatically when `None`
    /// (background mode only)
    pub background: Option<ColorSpec>,
    /// Which hardware palette slots may be used
    pub enabled_slots: [bool; PALETTE_SLOTS],
    /// Palettes pinned to a slot before allocation
    pub fixed_palettes: [Option<Vec<ColorSpec>>; PALETTE_SLOTS],
    /// Keep the most used palettes instead of failing on overflow
    pub lossy: bool,
    /// Keep going when tile IDs exceed the mode's limit
    pub allow_tile_overflow: bool,
    /// Use one pattern table for all images
    pub share_pattern_table: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            background: None,
            enabled_slots: [true; PALETTE_SLOTS],
            fixed_palettes: Default::default(),
            lossy: false,
            allow_tile_overflow: false,
            share_pattern_table: false,
        }
    }
}

/// One image to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub image: IndexedImage,
    /// First tile ID of this image's pattern table. With a shared pattern
    /// table only the first image's offset is used.
    pub pattern_offset: u32,
}

impl ImageInput {
    pub fn new(image: IndexedImage) -> Self {
        Self { image, pattern_offset: 0 }
    }

    pub fn with_pattern_offset(mut self, offset: u32) -> Self {
        self.pattern_offset = offset;
        self
    }
}

/// Per-run state: the catalog and the color memo built up while matching.
///
/// Create one per run, load images through [`ConversionContext::mapper_mut`]
/// and hand it to [`convert`].
#[derive(Debug, Clone)]
pub struct ConversionContext {
    mapper: ColorMapper,
}

impl ConversionContext {
    pub fn new(catalog: Catalog) -> Self {
        Self { mapper: ColorMapper::new(catalog) }
    }

    pub fn mapper(&self) -> &ColorMapper {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut ColorMapper {
        &mut self.mapper
    }

    pub fn catalog(&self) -> &Catalog {
        self.mapper.catalog()
    }
}

/// Conversion output of one image.
#[derive(Debug, Clone)]
pub struct ImageOutput {
    pub name: String,
    /// Tile ID of every cell, row-major
    pub tile_ids: Vec<u32>,
    /// Attribute table, background mode only
    pub attributes: Option<Vec<u8>>,
    /// Index into [`ConversionResult::pattern_tables`]
    pub pattern_table: usize,
    /// Palette slot of every block and the re-quantized image
    pub assignment: Assignment,
}

impl ImageOutput {
    /// Nametable bytes.
    pub fn nametable(&self) -> Vec<u8> {
        nametable_bytes(&self.tile_ids)
    }
}

/// Everything a run produced, ready to be written out.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub mode: Mode,
    pub background: u8,
    pub palettes: PaletteSet,
    pub pattern_tables: Vec<PatternTable>,
    pub images: Vec<ImageOutput>,
}

impl ConversionResult {
    /// Palette file bytes of a filled slot.
    pub fn palette_bytes(&self, slot: usize) -> Option<[u8; 4]> {
        self.palettes.get(slot).map(|p| p.to_bytes(self.background))
    }

    /// Pattern table an image's tile IDs refer to.
    pub fn pattern_table_of(&self, image: &ImageOutput) -> Option<&PatternTable> {
        self.pattern_tables.get(image.pattern_table)
    }
}

/// Resolve fixed palette colors to catalog indices, keeping only enabled slots.
fn resolve_fixed(
    ctx: &mut ConversionContext,
    options: &ConvertOptions,
) -> Result<[Option<Vec<u8>>; PALETTE_SLOTS], ConvertError> {
    let mut fixed: [Option<Vec<u8>>; PALETTE_SLOTS] = Default::default();
    for (slot, colors) in options.fixed_palettes.iter().enumerate() {
        let Some(colors) = colors else { continue };
        if !options.enabled_slots[slot] {
            warn!("Fixed palette for slot {} ignored: the slot is disabled", slot);
            continue;
        }

        let mut indices = colors.iter().map(|&c| ctx.mapper.resolve(c)).collect::<Result<Vec<u8>, _>>()?;
        indices.sort_unstable();
        indices.dedup();
        fixed[slot] = Some(indices);
    }
    Ok(fixed)
}

/// Fixed palettes as seen with the chosen background: the background itself
/// is implicit and never part of a palette.
fn pin_fixed(
    fixed: &[Option<Vec<u8>>; PALETTE_SLOTS],
    background: u8,
) -> Result<[Option<Palette>; PALETTE_SLOTS], ConvertError> {
    let mut pinned: [Option<Palette>; PALETTE_SLOTS] = Default::default();
    for (slot, colors) in fixed.iter().enumerate() {
        let Some(colors) = colors else { continue };
        let colors: Vec<u8> = colors.iter().copied().filter(|&c| c != background).collect();
        let count = colors.len();
        pinned[slot] = Some(Palette::from_colors(colors).ok_or(ConvertError::InvalidFixedPalette { slot, count })?);
    }
    Ok(pinned)
}

/// Convert all images in one run.
///
/// Images share the background color and the four palettes. Each gets its
/// own pattern table unless `share_pattern_table` is set.
pub fn convert(
    ctx: &mut ConversionContext,
    inputs: &[ImageInput],
    options: &ConvertOptions,
) -> Result<ConversionResult, ConvertError> {
    let mode = options.mode;
    if mode.is_sprite() && options.background.is_none() {
        return Err(ConvertError::MissingBackgroundColor { mode });
    }
    for input in inputs {
        input.image.check_block_size(mode)?;
    }

    let images: Vec<&IndexedImage> = inputs.iter().map(|i| &i.image).collect();
    let fixed = resolve_fixed(ctx, options)?;
    let free_slots: Vec<usize> =
        (0..PALETTE_SLOTS).filter(|&s| options.enabled_slots[s] && fixed[s].is_none()).collect();

    let background = match options.background {
        Some(spec) => ctx.mapper.resolve(spec)?,
        None => {
            let raw_fixed: Vec<Vec<u8>> = fixed.iter().flatten().cloned().collect();
            let selected = select_background(&images, mode, &raw_fixed, free_slots.len())
                .ok_or(ConvertError::MissingBackgroundColor { mode })?;
            info!("Selected background color ${:02X}", selected);
            selected
        }
    };

    // Allocate the free slots
    let pinned = pin_fixed(&fixed, background)?;
    let pinned_list: Vec<Palette> = pinned.iter().flatten().cloned().collect();
    let usage = count_usage(&images, mode, background, &pinned_list);
    debug!("{} distinct raw palettes over {} block(s)", usage.len(), usage.total());
    let allocated = allocate_palettes(&usage, free_slots.len(), options.lossy)?;

    let mut slots = pinned;
    for (slot, palette) in free_slots.iter().zip(allocated) {
        slots[*slot] = Some(palette);
    }
    let palettes = PaletteSet::new(slots);
    for (slot, palette) in palettes.filled() {
        debug!("palette {}: {}", slot, palette);
    }

    // Assign, encode
    let mut pattern_tables: Vec<PatternTable> = Vec::new();
    if options.share_pattern_table {
        let offset = inputs.first().map_or(0, |i| i.pattern_offset);
        pattern_tables.push(PatternTable::new(SHARED_SCOPE, offset, mode, options.allow_tile_overflow));
    }

    let mut outputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let assignment = assign_blocks(&input.image, mode, background, &palettes, &mut ctx.mapper);

        let table_index = if options.share_pattern_table {
            0
        } else {
            pattern_tables.push(PatternTable::new(
                input.image.name(),
                input.pattern_offset,
                mode,
                options.allow_tile_overflow,
            ));
            pattern_tables.len() - 1
        };
        let tile_ids = encode_tiles(&assignment, &palettes, background, mode, &mut pattern_tables[table_index])?;

        let attributes = match mode {
            Mode::Background => Some(encode_attributes(&assignment, mode)?),
            Mode::Sprites8x8 | Mode::Sprites8x16 => None,
        };

        outputs.push(ImageOutput {
            name: input.image.name().to_string(),
            tile_ids,
            attributes,
            pattern_table: table_index,
            assignment,
        });
    }

    info!(
        "Converted {} image(s): background ${:02X}, {} palette(s), {} tile(s)",
        outputs.len(),
        background,
        palettes.filled_count(),
        pattern_tables.iter().map(PatternTable::len).sum::<usize>()
    );

    Ok(ConversionResult { mode, background, palettes, pattern_tables, images: outputs })
}
