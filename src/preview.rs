//! Preview rendering: decode the encoded tables back to RGB.
//!
//! The preview is built only from what a console would see (pattern table,
//! nametable, block palettes and the catalog), so it shows exactly what the
//! output files will look like.

use crate::catalog::Catalog;
use crate::palette::Palette;
use crate::pipeline::{ConversionResult, ImageOutput};
use crate::tiles::{TileIndexGrid, TILE_WIDTH};
use image::{Rgba, RgbaImage};

/// Render one converted image. Cells whose tile cannot be found, and catalog
/// entries without a color, come out transparent.
pub fn render_preview(result: &ConversionResult, image: &ImageOutput, catalog: &Catalog) -> RgbaImage {
    let assignment = &image.assignment;
    let (width, height) = (assignment.image.width(), assignment.image.height());
    let (block_w, block_h) = result.mode.block_size();
    let tile_h = result.mode.tile_height();
    let cols = width / TILE_WIDTH;
    let empty = Palette::empty();

    let mut out = RgbaImage::new(width, height);
    let Some(table) = result.pattern_table_of(image) else {
        return out;
    };

    for (cell, &id) in image.tile_ids.iter().enumerate() {
        let Some(grid) = table.tile(id).and_then(|t| TileIndexGrid::decode(t.as_bytes())) else {
            continue;
        };
        let (x0, y0) = ((cell as u32 % cols) * TILE_WIDTH, (cell as u32 / cols) * tile_h);

        for y in 0..grid.height() {
            for x in 0..TILE_WIDTH {
                let (px, py) = (x0 + x, y0 + y);
                let slot = assignment.slot_at(px / block_w, py / block_h);
                let palette = result.palettes.get(slot as usize).unwrap_or(&empty);
                let color = palette.color_at(grid.get(x, y), result.background);
                let rgba = catalog.rgb(color).map_or(Rgba([0, 0, 0, 0]), |rgb| rgb.to_rgba());
                out.put_pixel(px, py, rgba);
            }
        }
    }
    out
}
