//! Attribute table packing.
//!
//! Each attribute byte covers a 32×32 pixel area, that is four 16×16 blocks:
//!
//! ```text
//! bits 7-6   5-4   3-2   1-0
//!      BR    BL    TR    TL
//! ```

use crate::assign::Assignment;
use crate::error::ConvertError;
use crate::mode::Mode;

/// Side of the square area one attribute byte covers, in pixels.
pub const META_CELL_SIZE: u32 = 32;

/// Pack one attribute byte from the slots of its four blocks.
pub fn pack_attribute(top_left: u8, top_right: u8, bottom_left: u8, bottom_right: u8) -> u8 {
    (top_left & 0b11) | (top_right & 0b11) << 2 | (bottom_left & 0b11) << 4 | (bottom_right & 0b11) << 6
}

/// Build the attribute table of one image, row-major over 32×32 areas.
///
/// Blocks outside the image count as slot 0.
pub fn encode_attributes(assignment: &Assignment, mode: Mode) -> Result<Vec<u8>, ConvertError> {
    if mode != Mode::Background {
        return Err(ConvertError::UnsupportedMode { operation: "Attribute table", mode });
    }

    let cells_wide = assignment.image.width().div_ceil(META_CELL_SIZE);
    let cells_high = assignment.image.height().div_ceil(META_CELL_SIZE);

    let mut bytes = Vec::with_capacity((cells_wide * cells_high) as usize);
    for cy in 0..cells_high {
        for cx in 0..cells_wide {
            let (bx, by) = (cx * 2, cy * 2);
            bytes.push(pack_attribute(
                assignment.slot_at(bx, by),
                assignment.slot_at(bx + 1, by),
                assignment.slot_at(bx, by + 1),
                assignment.slot_at(bx + 1, by + 1),
            ));
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::IndexedImage;

    fn assignment(width: u32, height: u32, slots: Vec<u8>) -> Assignment {
        let image = IndexedImage::from_fn("img", width, height, |_, _| 0);
        Assignment { blocks_wide: width / 16, blocks_high: height / 16, block_slots: slots, image }
    }

    #[test]
    fn test_pack_order() {
        assert_eq!(pack_attribute(1, 2, 3, 0), 0b00_11_10_01);
        assert_eq!(pack_attribute(3, 3, 3, 3), 0xFF);
    }

    #[test]
    fn test_single_cell() {
        let a = assignment(32, 32, vec![0, 1, 2, 3]);
        assert_eq!(encode_attributes(&a, Mode::Background), Ok(vec![0b11_10_01_00]));
    }

    #[test]
    fn test_partial_cells_default_to_zero() {
        // 48x16: blocks [1 2 3] in a single row
        let a = assignment(48, 16, vec![1, 2, 3]);
        assert_eq!(encode_attributes(&a, Mode::Background), Ok(vec![0b00_00_10_01, 0b00_00_00_11]));
    }

    #[test]
    fn test_byte_count() {
        for (w, h) in [(16, 16), (32, 32), (48, 16), (256, 240), (64, 96)] {
            let a = assignment(w, h, vec![0; ((w / 16) * (h / 16)) as usize]);
            let expected = (w.div_ceil(32) * h.div_ceil(32)) as usize;
            assert_eq!(encode_attributes(&a, Mode::Background).unwrap().len(), expected);
        }
    }

    #[test]
    fn test_sprite_modes_unsupported() {
        let a = assignment(16, 16, vec![0]);
        assert_eq!(
            encode_attributes(&a, Mode::Sprites8x8),
            Err(ConvertError::UnsupportedMode { operation: "Attribute table", mode: Mode::Sprites8x8 })
        );
    }
}
