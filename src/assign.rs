//! Block-to-palette assignment and re-quantization.

use crate::bitmap::IndexedImage;
use crate::color_mapper::ColorMapper;
use crate::mode::Mode;
use crate::palette::{Palette, PaletteSet};
use std::collections::BTreeMap;

/// Result of assigning palettes to every block of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// The image with every pixel snapped to its block's palette
    pub image: IndexedImage,
    /// Palette slot of every block, row-major
    pub block_slots: Vec<u8>,
    /// Blocks per row
    pub blocks_wide: u32,
    /// Blocks per column
    pub blocks_high: u32,
}

impl Assignment {
    /// Slot of the block at block coordinates, or 0 outside the image.
    pub fn slot_at(&self, bx: u32, by: u32) -> u8 {
        if bx >= self.blocks_wide || by >= self.blocks_high {
            return 0;
        }
        self.block_slots[(by * self.blocks_wide + bx) as usize]
    }
}

/// Color of `{background} ∪ palette` nearest to `color`, with its distance.
/// Ties keep the background, then the lower palette color.
fn nearest_in(mapper: &mut ColorMapper, color: u8, palette: &Palette, background: u8) -> (u8, f64) {
    let mut best = (background, mapper.distance(color, background));
    for &candidate in palette.colors() {
        let d = mapper.distance(color, candidate);
        if d < best.1 {
            best = (candidate, d);
        }
    }
    best
}

/// Pick the best palette for every block and re-quantize its pixels.
///
/// A block goes to the slot with the lowest summed distance over its
/// pixels; ties keep the lowest slot. When no slot holds a palette, all
/// blocks use an empty palette in slot 0.
pub fn assign_blocks(
    image: &IndexedImage,
    mode: Mode,
    background: u8,
    palettes: &PaletteSet,
    mapper: &mut ColorMapper,
) -> Assignment {
    let empty = Palette::empty();
    let mut candidates: Vec<(usize, &Palette)> = palettes.filled().collect();
    if candidates.is_empty() {
        candidates.push((0, &empty));
    }

    let (blocks_wide, blocks_high) = image.block_grid(mode);
    let mut requantized = image.clone();
    let mut block_slots = Vec::with_capacity((blocks_wide * blocks_high) as usize);

    for block in image.blocks(mode) {
        let mut histogram: BTreeMap<u8, u32> = BTreeMap::new();
        for color in block.pixels() {
            *histogram.entry(color).or_insert(0) += 1;
        }

        let mut best: Option<(usize, &Palette, f64)> = None;
        for &(slot, palette) in &candidates {
            let total: f64 = histogram
                .iter()
                .map(|(&color, &count)| nearest_in(mapper, color, palette, background).1 * count as f64)
                .sum();
            if best.map_or(true, |(_, _, d)| total < d) {
                best = Some((slot, palette, total));
            }
        }
        let (slot, palette) = best.map_or((0, &empty), |(s, p, _)| (s, p));

        for (x, y) in block.coordinates() {
            let (color, _) = nearest_in(mapper, image.pixel(x, y), palette, background);
            requantized.set_pixel(x, y, color);
        }
        block_slots.push(slot as u8);
    }

    Assignment { image: requantized, block_slots, blocks_wide, blocks_high }
}
