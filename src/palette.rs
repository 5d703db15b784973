//! Hardware palette values.
//!
//! A [`Palette`] is the set of up to three foreground colors of one NES
//! sub-palette. The shared background color is never stored in it. Colors are
//! kept sorted by catalog index so that two palettes built from the same
//! colors in any order compare (and hash) equal.

use std::collections::BTreeMap;
use std::fmt;

/// Number of palette slots the PPU offers for backgrounds (and for sprites).
pub const PALETTE_SLOTS: usize = 4;

/// Canonical set of at most three non-background catalog indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Palette {
    colors: Vec<u8>,
}

impl Palette {
    /// Foreground colors per palette.
    pub const MAX_COLORS: usize = 3;

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a palette from colors in any order. Duplicates collapse.
    /// Returns `None` if more than three distinct colors remain.
    ///
    /// ```
    /// use nestile::palette::Palette;
    ///
    /// let a = Palette::from_colors([0x30, 0x16, 0x27]).unwrap();
    /// let b = Palette::from_colors([0x27, 0x30, 0x16, 0x16]).unwrap();
    /// assert_eq!(a, b);
    /// assert_eq!(a.colors(), &[0x16, 0x27, 0x30]);
    /// assert!(Palette::from_colors([1, 2, 3, 4]).is_none());
    /// ```
    pub fn from_colors(colors: impl IntoIterator<Item = u8>) -> Option<Self> {
        let mut colors: Vec<u8> = colors.into_iter().collect();
        colors.sort_unstable();
        colors.dedup();
        if colors.len() > Self::MAX_COLORS {
            return None;
        }
        Some(Self { colors })
    }

    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.colors.len() >= Self::MAX_COLORS
    }

    pub fn contains(&self, color: u8) -> bool {
        self.colors.binary_search(&color).is_ok()
    }

    pub fn is_superset_of(&self, other: &Palette) -> bool {
        other.colors.iter().all(|&c| self.contains(c))
    }

    /// Union of both palettes, if it still fits in one palette.
    pub fn union(&self, other: &Palette) -> Option<Palette> {
        Palette::from_colors(self.colors.iter().chain(other.colors.iter()).copied())
    }

    /// 2-bit pixel value of a color in this palette (1..=3).
    pub fn pixel_value(&self, color: u8) -> Option<u8> {
        self.colors.binary_search(&color).ok().map(|i| i as u8 + 1)
    }

    /// Color stored at a 2-bit pixel value; 0 is the background.
    pub fn color_at(&self, value: u8, background: u8) -> u8 {
        match value {
            0 => background,
            v => self.colors.get(v as usize - 1).copied().unwrap_or(background),
        }
    }

    /// Hardware byte layout: `[background, c1, c2, c3]`, unused slots 0.
    pub fn to_bytes(&self, background: u8) -> [u8; 4] {
        let mut bytes = [background, 0, 0, 0];
        for (dst, &c) in bytes[1..].iter_mut().zip(&self.colors) {
            *dst = c;
        }
        bytes
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let colors: Vec<String> = self.colors.iter().map(|c| format!("${:02X}", c)).collect();
        write!(f, "[{}]", colors.join(" "))
    }
}

/// How many blocks asked for each distinct palette.
///
/// Zero counts are treated as absent. A `BTreeMap` keeps iteration in
/// canonical palette order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaletteUsage {
    counts: BTreeMap<Palette, u32>,
}

impl PaletteUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more use of `palette`. Empty palettes are ignored.
    pub fn record(&mut self, palette: Palette) {
        self.add(palette, 1);
    }

    pub fn add(&mut self, palette: Palette, count: u32) {
        if palette.is_empty() || count == 0 {
            return;
        }
        *self.counts.entry(palette).or_insert(0) += count;
    }

    pub fn count(&self, palette: &Palette) -> u32 {
        self.counts.get(palette).copied().unwrap_or(0)
    }

    /// Non-zero entries in canonical palette order.
    pub fn iter(&self) -> impl Iterator<Item = (&Palette, u32)> {
        self.counts.iter().filter(|&(_, &n)| n > 0).map(|(p, &n)| (p, n))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total(&self) -> u32 {
        self.iter().map(|(_, n)| n).sum()
    }
}

/// The final palette of every hardware slot. `None` marks a slot that is
/// disabled or that nothing needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaletteSet {
    slots: [Option<Palette>; PALETTE_SLOTS],
}

impl PaletteSet {
    pub fn new(slots: [Option<Palette>; PALETTE_SLOTS]) -> Self {
        Self { slots }
    }

    pub fn get(&self, slot: usize) -> Option<&Palette> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Filled slots in slot order.
    pub fn filled(&self) -> impl Iterator<Item = (usize, &Palette)> {
        self.slots.iter().enumerate().filter_map(|(i, p)| p.as_ref().map(|p| (i, p)))
    }

    pub fn filled_count(&self) -> usize {
        self.filled().count()
    }
}
