//! Raw per-block palette extraction.

use crate::bitmap::{Block, IndexedImage};
use crate::mode::Mode;
use crate::palette::{Palette, PaletteUsage};
use std::collections::BTreeMap;

/// The three most frequent non-background colors of a block.
///
/// Ties in frequency go to the lower catalog index. A block made only of
/// the background yields an empty palette.
pub fn extract_palette(pixels: impl IntoIterator<Item = u8>, background: u8) -> Palette {
    let mut counts: BTreeMap<u8, u32> = BTreeMap::new();
    for color in pixels {
        if color != background {
            *counts.entry(color).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(u8, u32)> = counts.into_iter().collect();
    // Stable sort over index-ordered entries keeps the lower index first on ties
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    Palette::from_colors(ranked.into_iter().take(Palette::MAX_COLORS).map(|(c, _)| c)).unwrap_or_default()
}

/// Raw palette of one block.
pub fn block_palette(block: &Block<'_>, background: u8) -> Palette {
    extract_palette(block.pixels(), background)
}

/// Count the raw palettes of every block of every image.
///
/// Blocks with an empty palette, and blocks whose palette is covered by one
/// of the `fixed` palettes, are not counted: they never need a new slot.
pub fn count_usage(images: &[&IndexedImage], mode: Mode, background: u8, fixed: &[Palette]) -> PaletteUsage {
    let mut usage = PaletteUsage::new();
    for image in images {
        for block in image.blocks(mode) {
            let palette = block_palette(&block, background);
            if palette.is_empty() || fixed.iter().any(|f| f.is_superset_of(&palette)) {
                continue;
            }
            usage.record(palette);
        }
    }
    usage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_three_by_frequency() {
        let pixels = [5, 5, 5, 5, 7, 7, 7, 2, 2, 9, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F];
        let p = extract_palette(pixels, 0x0F);
        assert_eq!(p.colors(), &[2, 5, 7]);
    }

    #[test]
    fn test_frequency_ties_prefer_lower_index() {
        let pixels = [9, 8, 7, 6, 6];
        let p = extract_palette(pixels, 0);
        // 6 wins outright, then 7 and 8 beat 9 on index
        assert_eq!(p.colors(), &[6, 7, 8]);
    }

    #[test]
    fn test_background_only_block_is_empty() {
        let p = extract_palette([0x0F; 64], 0x0F);
        assert!(p.is_empty());

        let img = IndexedImage::from_fn("bg", 16, 16, |_, _| 0x0F);
        let usage = count_usage(&[&img], Mode::Background, 0x0F, &[]);
        assert!(usage.is_empty());
        assert_eq!(usage.total(), 0);
    }

    #[test]
    fn test_count_usage_skips_fixed_subsets() {
        // Left block uses $16, right block uses $21
        let img = IndexedImage::from_fn("img", 32, 16, |x, _| if x < 16 { 0x16 } else { 0x21 });
        let fixed = [Palette::from_colors([0x16, 0x27]).unwrap()];
        let usage = count_usage(&[&img], Mode::Background, 0x0F, &fixed);
        assert_eq!(usage.len(), 1);
        assert_eq!(usage.count(&Palette::from_colors([0x21]).unwrap()), 1);
    }

    #[test]
    fn test_count_usage_across_images() {
        let a = IndexedImage::from_fn("a", 8, 8, |_, _| 0x16);
        let b = IndexedImage::from_fn("b", 8, 16, |_, _| 0x16);
        let usage = count_usage(&[&a, &b], Mode::Sprites8x8, 0x0F, &[]);
        assert_eq!(usage.count(&Palette::from_colors([0x16]).unwrap()), 3);
    }
}
