//! Automatic background color selection.
//!
//! The background color is shared by all four palettes, so picking the right
//! one can decide whether an image fits at all. The most widespread colors
//! are tried one by one and the one that needs the fewest palettes wins.

use crate::allocate::merge_palettes;
use crate::bitmap::IndexedImage;
use crate::extract::count_usage;
use crate::mode::Mode;
use crate::palette::Palette;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// How many candidate colors are trial-allocated.
pub const MAX_CANDIDATES: usize = 5;

/// Colors ranked by the number of blocks they appear in (each block counts a
/// color once), ties by catalog index. At most [`MAX_CANDIDATES`] are kept.
pub fn background_candidates(images: &[&IndexedImage], mode: Mode) -> Vec<u8> {
    let mut block_counts: BTreeMap<u8, u32> = BTreeMap::new();
    for image in images {
        for block in image.blocks(mode) {
            let distinct: BTreeSet<u8> = block.pixels().collect();
            for color in distinct {
                *block_counts.entry(color).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(u8, u32)> = block_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(MAX_CANDIDATES).map(|(c, _)| c).collect()
}

/// Pick the background color that leaves the fewest palettes after merging.
///
/// `fixed` holds the colors of each pinned palette; a candidate listed in one
/// is dropped from it for that trial. Returns `None` only when there are no
/// pixels at all.
pub fn select_background(images: &[&IndexedImage], mode: Mode, fixed: &[Vec<u8>], slots: usize) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;
    for candidate in background_candidates(images, mode) {
        let pinned: Vec<Palette> = fixed
            .iter()
            .filter_map(|colors| Palette::from_colors(colors.iter().copied().filter(|&c| c != candidate)))
            .collect();
        let usage = count_usage(images, mode, candidate, &pinned);
        let needed = merge_palettes(&usage, slots).len();
        debug!("background ${:02X} needs {} palette(s)", candidate, needed);
        if best.map_or(true, |(_, n)| needed < n) {
            best = Some((candidate, needed));
        }
    }
    best.map(|(color, _)| color)
}
