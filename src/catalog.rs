//! System color catalog.
//!
//! The NES PPU can only display the 64 colors of its master palette. Every
//! color in a converted image is one of these entries, referenced by index.
//! A catalog can be the built-in 2C02 table, a NesTiler-style JSON file, or a
//! raw `.pal` dump (64 RGB triplets).

use crate::color::{parse_hex_color, ColorError, Rgb};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Number of entries in the master palette.
pub const CATALOG_SIZE: usize = 64;

/// `$0D` is "blacker than black" and confuses the sync detector of some TVs.
pub const DEFAULT_FORBIDDEN: u8 = 0x0D;

/// Error when loading a catalog file
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid catalog index '{0}', expected 00-3F")]
    InvalidIndex(String),
    #[error("Invalid color for catalog entry {index:02X}: {source}")]
    InvalidColor {
        index: u8,
        #[source]
        source: ColorError,
    },
    #[error("Palette file is {0} bytes, expected at least {min}", min = CATALOG_SIZE * 3)]
    TooShort(usize),
}

/// One entry of the master palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemColor {
    pub index: u8,
    pub rgb: Rgb,
}

/// 2C02 master palette, `0xRRGGBB`.
const NES_2C02: [u32; CATALOG_SIZE] = [
    // $00-$0F
    0x666666, 0x002A88, 0x1412A7, 0x3B00A4, 0x5C007E, 0x6E0040, 0x6C0600, 0x561D00,
    0x333500, 0x0B4800, 0x005200, 0x004F08, 0x00404D, 0x000000, 0x000000, 0x000000,
    // $10-$1F
    0xADADAD, 0x155FD9, 0x4240FF, 0x7527FE, 0xA01ACC, 0xB71E7B, 0xB53120, 0x994E00,
    0x6B6D00, 0x388700, 0x0C9300, 0x008F32, 0x007C8D, 0x000000, 0x000000, 0x000000,
    // $20-$2F
    0xFFFEFF, 0x64B0FF, 0x9290FF, 0xC676FF, 0xF36AFF, 0xFE6ECC, 0xFE8170, 0xEA9E22,
    0xBCBE00, 0x88D800, 0x5CE430, 0x45E082, 0x48CDDE, 0x4F4F4F, 0x000000, 0x000000,
    // $30-$3F
    0xFFFEFF, 0xC0DFFF, 0xD3D2FF, 0xE8C8FF, 0xFBC2FF, 0xFEC4EA, 0xFECCC5, 0xF7D8A5,
    0xE4E594, 0xCFEF96, 0xBDF4AB, 0xB3F3CC, 0xB5EBF2, 0xB8B8B8, 0x000000, 0x000000,
];

/// The master palette with its matching rules.
///
/// Entries may be missing (a JSON catalog that leaves an index out); missing
/// and forbidden entries are never chosen as a nearest color, but they can
/// still be referenced explicitly by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: [Option<Rgb>; CATALOG_SIZE],
    forbidden: BTreeSet<u8>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::nes()
    }
}

impl Catalog {
    /// The built-in 2C02 catalog with `$0D` forbidden.
    pub fn nes() -> Self {
        let mut entries = [None; CATALOG_SIZE];
        for (entry, rgb) in entries.iter_mut().zip(NES_2C02) {
            *entry = Some(Rgb::from_u32(rgb));
        }
        Self { entries, forbidden: BTreeSet::from([DEFAULT_FORBIDDEN]) }
    }

    /// Build a catalog from explicit entries.
    pub fn from_entries(entries: [Option<Rgb>; CATALOG_SIZE], forbidden: BTreeSet<u8>) -> Self {
        Self { entries, forbidden }
    }

    /// Replace the set of forbidden indices.
    pub fn with_forbidden(mut self, forbidden: impl IntoIterator<Item = u8>) -> Self {
        self.forbidden = forbidden.into_iter().collect();
        self
    }

    pub fn forbidden(&self) -> &BTreeSet<u8> {
        &self.forbidden
    }

    /// RGB value of a catalog index, if the entry exists.
    pub fn rgb(&self, index: u8) -> Option<Rgb> {
        self.entries.get(index as usize).copied().flatten()
    }

    /// Entries that may be chosen when matching colors, in index order.
    pub fn matchable(&self) -> impl Iterator<Item = SystemColor> + '_ {
        self.entries.iter().enumerate().filter_map(move |(i, entry)| {
            let index = i as u8;
            match entry {
                Some(rgb) if !self.forbidden.contains(&index) => Some(SystemColor { index, rgb: *rgb }),
                _ => None,
            }
        })
    }

    /// Load a catalog file, picking the format from the extension:
    /// `.json` is parsed as a JSON object, anything else as raw RGB triplets.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let bytes = fs::read(path)?;
        let is_json = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&bytes)
        } else {
            Self::from_pal_bytes(&bytes)
        }
    }

    /// Parse a JSON object mapping hex indices to hex colors:
    /// `{"00": "#666666", "01": "#002A88", ...}`. Missing indices stay empty.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CatalogError> {
        let map: BTreeMap<String, String> = serde_json::from_slice(bytes)?;
        let mut entries = [None; CATALOG_SIZE];
        for (key, value) in &map {
            let index = u8::from_str_radix(key.trim_start_matches("0x"), 16)
                .ok()
                .filter(|&i| (i as usize) < CATALOG_SIZE)
                .ok_or_else(|| CatalogError::InvalidIndex(key.clone()))?;
            let rgb = parse_hex_color(value).map_err(|source| CatalogError::InvalidColor { index, source })?;
            entries[index as usize] = Some(rgb);
        }
        Ok(Self { entries, forbidden: BTreeSet::from([DEFAULT_FORBIDDEN]) })
    }

    /// Parse a raw palette dump. Only the first 64 triplets are used, so
    /// emphasis-extended dumps (512 entries) load as well.
    pub fn from_pal_bytes(bytes: &[u8]) -> Result<Self, CatalogError> {
        if bytes.len() < CATALOG_SIZE * 3 {
            return Err(CatalogError::TooShort(bytes.len()));
        }
        let mut entries = [None; CATALOG_SIZE];
        for (entry, rgb) in entries.iter_mut().zip(bytes.chunks_exact(3)) {
            *entry = Some(Rgb::new(rgb[0], rgb[1], rgb[2]));
        }
        Ok(Self { entries, forbidden: BTreeSet::from([DEFAULT_FORBIDDEN]) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nes_catalog_excludes_forbidden() {
        let catalog = Catalog::nes();
        assert_eq!(catalog.rgb(0x0D), Some(Rgb::new(0, 0, 0)));
        assert!(catalog.matchable().all(|c| c.index != 0x0D));
        assert_eq!(catalog.matchable().count(), 63);
    }

    #[test]
    fn test_json_catalog_partial() {
        let json = br##"{"00": "#666666", "3F": "#010203"}"##;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.rgb(0x00), Some(Rgb::new(0x66, 0x66, 0x66)));
        assert_eq!(catalog.rgb(0x3F), Some(Rgb::new(1, 2, 3)));
        assert_eq!(catalog.rgb(0x01), None);
        let indices: Vec<u8> = catalog.matchable().map(|c| c.index).collect();
        assert_eq!(indices, vec![0x00, 0x3F]);
    }

    #[test]
    fn test_json_catalog_bad_index() {
        let json = br##"{"40": "#666666"}"##;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::InvalidIndex(_))));
    }

    #[test]
    fn test_json_catalog_bad_color() {
        let json = br##"{"01": "#66"}"##;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::InvalidColor { index: 1, .. })
        ));
    }

    #[test]
    fn test_pal_bytes() {
        let mut bytes = vec![0u8; CATALOG_SIZE * 3 + 9];
        bytes[3..6].copy_from_slice(&[10, 20, 30]);
        let catalog = Catalog::from_pal_bytes(&bytes).unwrap();
        assert_eq!(catalog.rgb(1), Some(Rgb::new(10, 20, 30)));
        assert!(matches!(Catalog::from_pal_bytes(&bytes[..10]), Err(CatalogError::TooShort(10))));
    }

    #[test]
    fn test_with_forbidden_replaces_set() {
        let catalog = Catalog::nes().with_forbidden([0x0E, 0x0F]);
        let indices: Vec<u8> = catalog.matchable().map(|c| c.index).collect();
        assert!(indices.contains(&0x0D));
        assert!(!indices.contains(&0x0E));
    }
}
