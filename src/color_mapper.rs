//! Nearest-catalog-color lookup.
//!
//! A [`ColorMapper`] lives for one conversion run. It memoizes both the
//! RGB → catalog index matches and the catalog-to-catalog distances that
//! block assignment asks for over and over.

use crate::catalog::Catalog;
use crate::color::{ColorSpec, LabColor, Rgb};
use crate::error::ConvertError;
use std::collections::HashMap;

/// Matches colors against a [`Catalog`] with CIEDE2000.
#[derive(Debug, Clone)]
pub struct ColorMapper {
    catalog: Catalog,
    nearest: HashMap<Rgb, u8>,
    distances: HashMap<(u8, u8), f64>,
}

impl ColorMapper {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog, nearest: HashMap::new(), distances: HashMap::new() }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Catalog index of the perceptually nearest matchable entry.
    ///
    /// Ties keep the lowest index.
    pub fn nearest(&mut self, rgb: Rgb) -> Result<u8, ConvertError> {
        if let Some(&index) = self.nearest.get(&rgb) {
            return Ok(index);
        }

        let target = LabColor::from_rgb(rgb);
        let mut best: Option<(u8, f64)> = None;
        for entry in self.catalog.matchable() {
            let distance = if entry.rgb == rgb {
                0.0
            } else {
                target.delta_e2000(&LabColor::from_rgb(entry.rgb))
            };
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((entry.index, distance));
            }
        }

        let (index, _) = best.ok_or_else(|| ConvertError::ColorNotFound { color: rgb.to_hex() })?;
        self.nearest.insert(rgb, index);
        Ok(index)
    }

    /// Resolve a user color to a catalog index. Explicit indices bypass the
    /// forbidden list but must name an existing entry.
    pub fn resolve(&mut self, spec: ColorSpec) -> Result<u8, ConvertError> {
        match spec {
            ColorSpec::Rgb(rgb) => self.nearest(rgb),
            ColorSpec::Index(index) => match self.catalog.rgb(index) {
                Some(_) => Ok(index),
                None => Err(ConvertError::ColorNotFound { color: format!("${:02X}", index) }),
            },
        }
    }

    /// CIEDE2000 distance between two catalog entries. Entries without a
    /// color are infinitely far from everything but themselves.
    pub fn distance(&mut self, a: u8, b: u8) -> f64 {
        if a == b {
            return 0.0;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&d) = self.distances.get(&key) {
            return d;
        }

        let d = match (self.catalog.rgb(key.0), self.catalog.rgb(key.1)) {
            (Some(x), Some(y)) if x == y => 0.0,
            (Some(x), Some(y)) => LabColor::from_rgb(x).delta_e2000(&LabColor::from_rgb(y)),
            _ => f64::INFINITY,
        };
        self.distances.insert(key, d);
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CATALOG_SIZE;
    use std::collections::BTreeSet;

    #[test]
    fn test_exact_match() {
        let mut mapper = ColorMapper::new(Catalog::nes());
        assert_eq!(mapper.nearest(Rgb::from_u32(0x64B0FF)).unwrap(), 0x21);
        assert_eq!(mapper.nearest(Rgb::from_u32(0xB53120)).unwrap(), 0x16);
    }

    #[test]
    fn test_near_match() {
        let mut mapper = ColorMapper::new(Catalog::nes());
        // A slightly off red still lands on $16
        assert_eq!(mapper.nearest(Rgb::new(0xB0, 0x30, 0x22)).unwrap(), 0x16);
    }

    #[test]
    fn test_forbidden_black_is_skipped() {
        let mut mapper = ColorMapper::new(Catalog::nes());
        let black = mapper.nearest(Rgb::new(0, 0, 0)).unwrap();
        assert_ne!(black, 0x0D);
        // First black after the forbidden entry
        assert_eq!(black, 0x0E);
    }

    #[test]
    fn test_tie_keeps_first_entry() {
        // $20 and $30 are both #FFFEFF in the 2C02 table
        let mut mapper = ColorMapper::new(Catalog::nes());
        assert_eq!(mapper.nearest(Rgb::from_u32(0xFFFEFF)).unwrap(), 0x20);
    }

    #[test]
    fn test_memoized_result_is_stable() {
        let mut mapper = ColorMapper::new(Catalog::nes());
        let first = mapper.nearest(Rgb::new(1, 2, 3)).unwrap();
        let second = mapper.nearest(Rgb::new(1, 2, 3)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_catalog_fails() {
        let catalog = Catalog::from_entries([None; CATALOG_SIZE], BTreeSet::new());
        let mut mapper = ColorMapper::new(catalog);
        assert_eq!(
            mapper.nearest(Rgb::new(0, 0, 0)),
            Err(ConvertError::ColorNotFound { color: "#000000".to_string() })
        );
    }

    #[test]
    fn test_resolve_index() {
        let mut mapper = ColorMapper::new(Catalog::nes());
        assert_eq!(mapper.resolve(ColorSpec::Index(0x0D)), Ok(0x0D));

        let mut entries = [None; CATALOG_SIZE];
        entries[0] = Some(Rgb::new(0, 0, 0));
        let mut sparse = ColorMapper::new(Catalog::from_entries(entries, BTreeSet::new()));
        assert!(matches!(sparse.resolve(ColorSpec::Index(5)), Err(ConvertError::ColorNotFound { .. })));
    }

    #[test]
    fn test_distance_symmetric_and_zero_for_duplicates() {
        let mut mapper = ColorMapper::new(Catalog::nes());
        assert_eq!(mapper.distance(0x20, 0x30), 0.0);
        let ab = mapper.distance(0x16, 0x21);
        let ba = mapper.distance(0x21, 0x16);
        assert!(ab > 0.0);
        assert_eq!(ab, ba);
    }
}
