//! Tile extraction, bitplane encoding and the content-addressed pattern table.
//!
//! # Byte layout
//!
//! An 8×8 tile is 16 bytes: eight bytes of low bits (one byte per row, leftmost
//! pixel in the most significant bit) followed by eight bytes of high bits.
//! An 8×16 tile is two such entries back to back, top half first.

use crate::assign::Assignment;
use crate::error::ConvertError;
use crate::mode::Mode;
use crate::palette::{Palette, PaletteSet};
use log::{debug, warn};
use std::collections::HashMap;

/// Width of every tile in pixels.
pub const TILE_WIDTH: u32 = 8;

/// Bytes in one 8×8 pattern table entry.
pub const BYTES_PER_TILE: usize = 16;

/// 2-bit pixel values of one tile, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileIndexGrid {
    height: u32,
    cells: Vec<u8>,
}

impl TileIndexGrid {
    /// A grid of zeros, 8 pixels wide and `height` (8 or 16) tall.
    pub fn new(height: u32) -> Self {
        Self { height, cells: vec![0; (TILE_WIDTH * height) as usize] }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.cells[(y * TILE_WIDTH + x) as usize]
    }

    /// Store a pixel value; only the low two bits are kept.
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        self.cells[(y * TILE_WIDTH + x) as usize] = value & 0b11;
    }

    /// Encode as stacked 16-byte bitplane entries.
    ///
    /// ```
    /// use nestile::tiles::TileIndexGrid;
    ///
    /// let mut grid = TileIndexGrid::new(8);
    /// grid.set(0, 0, 1);
    /// grid.set(7, 0, 2);
    /// grid.set(1, 1, 3);
    /// let tile = grid.encode();
    /// assert_eq!(tile.as_bytes()[0], 0b1000_0000); // row 0, low plane
    /// assert_eq!(tile.as_bytes()[8], 0b0000_0001); // row 0, high plane
    /// assert_eq!(tile.as_bytes()[1], 0b0100_0000);
    /// assert_eq!(tile.as_bytes()[9], 0b0100_0000);
    /// ```
    pub fn encode(&self) -> EncodedTile {
        let mut bytes = Vec::with_capacity((self.height / 8) as usize * BYTES_PER_TILE);
        for half in 0..self.height / 8 {
            let mut low = [0u8; 8];
            let mut high = [0u8; 8];
            for row in 0..8 {
                let y = half * 8 + row;
                for x in 0..TILE_WIDTH {
                    let value = self.get(x, y);
                    let bit = 7 - x;
                    low[row as usize] |= (value & 1) << bit;
                    high[row as usize] |= ((value >> 1) & 1) << bit;
                }
            }
            bytes.extend_from_slice(&low);
            bytes.extend_from_slice(&high);
        }
        EncodedTile(bytes)
    }

    /// Decode stacked 16-byte entries. Returns `None` unless the length is a
    /// non-zero multiple of 16.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() % BYTES_PER_TILE != 0 {
            return None;
        }
        let height = (bytes.len() / BYTES_PER_TILE) as u32 * 8;
        let mut grid = Self::new(height);
        for (half, entry) in bytes.chunks_exact(BYTES_PER_TILE).enumerate() {
            for row in 0..8u32 {
                let low = entry[row as usize];
                let high = entry[row as usize + 8];
                for x in 0..TILE_WIDTH {
                    let bit = 7 - x;
                    let value = ((low >> bit) & 1) | (((high >> bit) & 1) << 1);
                    grid.set(x, half as u32 * 8 + row, value);
                }
            }
        }
        Some(grid)
    }
}

/// Bitplane bytes of one tile. Two tiles are the same tile exactly when
/// their bytes are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedTile(Vec<u8>);

impl EncodedTile {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Deduplicating tile store with its own ID space.
///
/// One table is one pattern-table scope: a single image, or all images that
/// share a pattern table.
#[derive(Debug, Clone)]
pub struct PatternTable {
    name: String,
    offset: u32,
    max_id: u32,
    allow_overflow: bool,
    tiles: Vec<EncodedTile>,
    ids: HashMap<EncodedTile, u32>,
}

impl PatternTable {
    /// An empty table whose first tile gets ID `offset`.
    pub fn new(name: impl Into<String>, offset: u32, mode: Mode, allow_overflow: bool) -> Self {
        Self {
            name: name.into(),
            offset,
            max_id: mode.max_tile_id(),
            allow_overflow,
            tiles: Vec::new(),
            ids: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of distinct tiles stored.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// ID of `tile`, allocating the next one if the content is new.
    ///
    /// Fails with `TileOverflow` when a new ID would exceed the mode's maximum
    /// and overflow is not allowed.
    pub fn intern(&mut self, tile: EncodedTile) -> Result<u32, ConvertError> {
        if let Some(&id) = self.ids.get(&tile) {
            return Ok(id);
        }

        let id = self.offset + self.tiles.len() as u32;
        if id > self.max_id {
            if !self.allow_overflow {
                return Err(ConvertError::TileOverflow { scope: self.name.clone(), id, max: self.max_id });
            }
            if id == self.max_id + 1 {
                warn!(
                    "Pattern table '{}' exceeds tile ID {}; nametable IDs will wrap",
                    self.name, self.max_id
                );
            }
        }

        self.tiles.push(tile.clone());
        self.ids.insert(tile, id);
        Ok(id)
    }

    /// Tile bytes for an ID handed out by this table.
    pub fn tile(&self, id: u32) -> Option<&EncodedTile> {
        id.checked_sub(self.offset).and_then(|i| self.tiles.get(i as usize))
    }

    /// All tiles in ID order, starting at the offset.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.tiles.iter().flat_map(|t| t.as_bytes().iter().copied()).collect()
    }
}

/// Convert one requantized image into tiles, store them in `table` and
/// return the tile ID of every cell, row-major.
pub fn encode_tiles(
    assignment: &Assignment,
    palettes: &PaletteSet,
    background: u8,
    mode: Mode,
    table: &mut PatternTable,
) -> Result<Vec<u32>, ConvertError> {
    let image = &assignment.image;
    let (block_w, block_h) = mode.block_size();
    let tile_h = mode.tile_height();
    let cols = image.width() / TILE_WIDTH;
    let rows = image.height() / tile_h;
    let empty = Palette::empty();

    let mut ids = Vec::with_capacity((cols * rows) as usize);
    for ty in 0..rows {
        for tx in 0..cols {
            let (x0, y0) = (tx * TILE_WIDTH, ty * tile_h);
            let mut grid = TileIndexGrid::new(tile_h);
            for y in 0..tile_h {
                for x in 0..TILE_WIDTH {
                    let (px, py) = (x0 + x, y0 + y);
                    let slot = assignment.slot_at(px / block_w, py / block_h);
                    let palette = palettes.get(slot as usize).unwrap_or(&empty);
                    let color = image.pixel(px, py);
                    let value = if color == background { 0 } else { palette.pixel_value(color).unwrap_or(0) };
                    grid.set(x, y, value);
                }
            }
            ids.push(table.intern(grid.encode())?);
        }
    }

    debug!("'{}': {} cells, pattern table '{}' now holds {} tiles", image.name(), ids.len(), table.name(), table.len());
    Ok(ids)
}

/// Nametable bytes for tile IDs. IDs above 255 (possible only when overflow
/// is allowed) keep their low 8 bits.
pub fn nametable_bytes(ids: &[u32]) -> Vec<u8> {
    ids.iter().map(|&id| id as u8).collect()
}
