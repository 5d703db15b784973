//! Palette allocation: merge the raw block palettes into the few hardware
//! palettes that are actually available.
//!
//! The allocator works on an arena of unique palette values. Handles
//! ([`PaletteId`]) answer "is this the same entry", palette values answer
//! "do these hold the same colors". Merging never edits colors in place: the
//! union is interned as its own value and the counts move over to it.
//!
//! Ranking is by descending use count, then by ascending palette value, so
//! the outcome never depends on hash map iteration order.

use crate::error::ConvertError;
use crate::palette::{Palette, PaletteUsage};
use log::{debug, warn};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Handle of a palette value inside a [`PaletteArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaletteId(usize);

/// Unique palette values with a use count each.
#[derive(Debug, Clone, Default)]
pub struct PaletteArena {
    palettes: Vec<Palette>,
    counts: Vec<u32>,
    ids: HashMap<Palette, PaletteId>,
}

impl PaletteArena {
    pub fn from_usage(usage: &PaletteUsage) -> Self {
        let mut arena = Self::default();
        for (palette, count) in usage.iter() {
            let id = arena.intern(palette.clone());
            arena.counts[id.0] += count;
        }
        arena
    }

    /// Handle of `palette`, adding it with a zero count if it is new.
    pub fn intern(&mut self, palette: Palette) -> PaletteId {
        if let Some(&id) = self.ids.get(&palette) {
            return id;
        }
        let id = PaletteId(self.palettes.len());
        self.palettes.push(palette.clone());
        self.counts.push(0);
        self.ids.insert(palette, id);
        id
    }

    pub fn palette(&self, id: PaletteId) -> &Palette {
        &self.palettes[id.0]
    }

    pub fn count(&self, id: PaletteId) -> u32 {
        self.counts[id.0]
    }

    /// Move all uses of `from` onto `into`.
    fn transfer(&mut self, from: PaletteId, into: PaletteId) {
        if from == into {
            return;
        }
        self.counts[into.0] += self.counts[from.0];
        self.counts[from.0] = 0;
    }

    /// Live entries (non-zero count), most used first, ties by palette value.
    pub fn ranked(&self) -> Vec<PaletteId> {
        let mut live: Vec<PaletteId> =
            (0..self.palettes.len()).map(PaletteId).filter(|&id| self.count(id) > 0).collect();
        live.sort_by_key(|&id| (Reverse(self.count(id)), self.palette(id)));
        live
    }

    /// Fold every palette into a live superset of at least its size.
    fn merge_supersets(&mut self) -> usize {
        let order = self.ranked();
        let mut merged = 0;
        for &a in &order {
            for &b in &order {
                if a == b || self.count(a) == 0 || self.count(b) == 0 {
                    continue;
                }
                let (pa, pb) = (self.palette(a), self.palette(b));
                if pa.len() >= pb.len() && pa.is_superset_of(pb) {
                    self.transfer(b, a);
                    merged += 1;
                }
            }
        }
        merged
    }

    /// Grow the top `slots` palettes with the colors of other palettes while
    /// they have room. Returns whether anything was merged.
    fn fill_slots(&mut self, slots: usize) -> bool {
        let order = self.ranked();
        let mut changed = false;

        for &winner_id in order.iter().take(slots) {
            let mut winner = winner_id;
            if self.count(winner) == 0 {
                // Absorbed by an earlier winner in this pass
                continue;
            }

            for &candidate in &order {
                if self.palette(winner).is_full() {
                    break;
                }
                if candidate == winner || self.count(candidate) == 0 {
                    continue;
                }
                let Some(union) = self.palette(winner).union(self.palette(candidate)) else {
                    continue;
                };

                let target = self.intern(union);
                self.transfer(winner, target);
                self.transfer(candidate, target);
                debug!(
                    "merged {} into {} as {}",
                    self.palette(candidate),
                    self.palette(winner),
                    self.palette(target)
                );
                winner = target;
                changed = true;
            }
        }
        changed
    }

    /// Run superset merging and slot filling until a full pass changes nothing.
    pub fn merge(&mut self, slots: usize) {
        let mut passes = 0;
        loop {
            passes += 1;
            let folded = self.merge_supersets();
            let changed = self.fill_slots(slots);
            debug!("merge pass {}: {} superset folds, slot filling changed: {}", passes, folded, changed);
            if !changed {
                break;
            }
        }
    }

    /// Live palettes with their counts, in rank order.
    pub fn into_ranked(self) -> Vec<(Palette, u32)> {
        self.ranked().into_iter().map(|id| (self.palette(id).clone(), self.count(id))).collect()
    }
}

/// Merge the raw palettes as far as possible for `slots` free slots.
///
/// No capacity check: the result may hold more than `slots` palettes.
pub fn merge_palettes(usage: &PaletteUsage, slots: usize) -> Vec<(Palette, u32)> {
    let mut arena = PaletteArena::from_usage(usage);
    arena.merge(slots);
    arena.into_ranked()
}

/// Choose the final palettes for `slots` free slots.
///
/// Fails with `PaletteOverflow` when more palettes remain than there are
/// slots, unless `lossy` is set, in which case only the top `slots` are kept.
pub fn allocate_palettes(usage: &PaletteUsage, slots: usize, lossy: bool) -> Result<Vec<Palette>, ConvertError> {
    let merged = merge_palettes(usage, slots);
    debug!("{} raw palettes merged into {}", usage.len(), merged.len());

    if merged.len() > slots {
        if !lossy {
            return Err(ConvertError::PaletteOverflow { required: merged.len(), available: slots });
        }
        for (palette, count) in &merged[slots..] {
            warn!("Dropping palette {} used by {} block(s); those blocks will lose colors", palette, count);
        }
    }

    Ok(merged.into_iter().take(slots).map(|(p, _)| p).collect())
}
