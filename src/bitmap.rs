//! Catalog-indexed images and their blocks.

use crate::color::Rgb;
use crate::color_mapper::ColorMapper;
use crate::error::ConvertError;
use crate::mode::Mode;
use image::RgbaImage;

/// Alpha values below this count as transparent.
const ALPHA_THRESHOLD: u8 = 128;

/// An image whose every pixel is a catalog index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    name: String,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl IndexedImage {
    /// Wrap row-major pixels. Returns `None` if the buffer size doesn't match.
    pub fn new(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self { name: name.into(), width, height, pixels })
    }

    /// Build an image by calling `f(x, y)` for every pixel.
    pub fn from_fn(name: impl Into<String>, width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self { name: name.into(), width, height, pixels }
    }

    /// Match every pixel of a decoded image against the catalog.
    ///
    /// Pixels with alpha below 128 become `transparent` when it is given;
    /// otherwise their RGB is matched like any other pixel.
    pub fn from_rgba(
        name: impl Into<String>,
        image: &RgbaImage,
        mapper: &mut ColorMapper,
        transparent: Option<u8>,
    ) -> Result<Self, ConvertError> {
        let (width, height) = image.dimensions();
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for pixel in image.pixels() {
            let index = match transparent {
                Some(bg) if pixel[3] < ALPHA_THRESHOLD => bg,
                _ => mapper.nearest(Rgb::from_rgba(*pixel))?,
            };
            pixels.push(index);
        }
        Ok(Self { name: name.into(), width, height, pixels })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: u8) {
        let i = (y * self.width + x) as usize;
        self.pixels[i] = color;
    }

    /// Fails with `InvalidBlockSize` unless both dimensions are whole blocks.
    pub fn check_block_size(&self, mode: Mode) -> Result<(), ConvertError> {
        let (bw, bh) = mode.block_size();
        if self.width % bw != 0 || self.height % bh != 0 {
            return Err(ConvertError::InvalidBlockSize {
                image: self.name.clone(),
                width: self.width,
                height: self.height,
                block_size: (bw, bh),
                mode,
            });
        }
        Ok(())
    }

    /// Number of blocks horizontally and vertically (partial blocks round up).
    pub fn block_grid(&self, mode: Mode) -> (u32, u32) {
        let (bw, bh) = mode.block_size();
        (self.width.div_ceil(bw), self.height.div_ceil(bh))
    }

    /// All blocks, row-major.
    pub fn blocks(&self, mode: Mode) -> impl Iterator<Item = Block<'_>> {
        let (cols, rows) = self.block_grid(mode);
        let (bw, bh) = mode.block_size();
        (0..rows).flat_map(move |by| {
            (0..cols).map(move |bx| Block { image: self, x: bx, y: by, width: bw, height: bh })
        })
    }
}

/// One palette-sharing region of an image, in block coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    image: &'a IndexedImage,
    pub x: u32,
    pub y: u32,
    width: u32,
    height: u32,
}

impl<'a> Block<'a> {
    /// Pixel coordinates of the top-left corner.
    pub fn origin(&self) -> (u32, u32) {
        (self.x * self.width, self.y * self.height)
    }

    /// Pixels of the block in row-major order, clipped to the image.
    pub fn pixels(&self) -> impl Iterator<Item = u8> + 'a {
        let image = self.image;
        let (x0, y0) = self.origin();
        let x1 = (x0 + self.width).min(image.width);
        let y1 = (y0 + self.height).min(image.height);
        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| image.pixel(x, y)))
    }

    /// Pixel coordinates covered by the block, clipped to the image.
    pub fn coordinates(&self) -> impl Iterator<Item = (u32, u32)> {
        let (x0, y0) = self.origin();
        let x1 = (x0 + self.width).min(self.image.width);
        let y1 = (y0 + self.height).min(self.image.height);
        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use image::Rgba;

    #[test]
    fn test_new_checks_buffer_size() {
        assert!(IndexedImage::new("a", 2, 2, vec![0; 4]).is_some());
        assert!(IndexedImage::new("a", 2, 2, vec![0; 3]).is_none());
    }

    #[test]
    fn test_block_size_validation() {
        let ok = IndexedImage::from_fn("ok", 32, 16, |_, _| 0);
        assert!(ok.check_block_size(Mode::Background).is_ok());

        let bad = IndexedImage::from_fn("bad", 24, 16, |_, _| 0);
        assert!(matches!(bad.check_block_size(Mode::Background), Err(ConvertError::InvalidBlockSize { .. })));
        assert!(bad.check_block_size(Mode::Sprites8x16).is_ok());
        let short = IndexedImage::from_fn("short", 8, 8, |_, _| 0);
        assert!(short.check_block_size(Mode::Sprites8x16).is_err());
    }

    #[test]
    fn test_blocks_row_major() {
        let img = IndexedImage::from_fn("img", 32, 32, |x, y| ((x / 16) + 2 * (y / 16)) as u8);
        let blocks: Vec<(u32, u32, Vec<u8>)> =
            img.blocks(Mode::Background).map(|b| (b.x, b.y, b.pixels().collect())).collect();
        assert_eq!(blocks.len(), 4);
        assert_eq!((blocks[1].0, blocks[1].1), (1, 0));
        assert!(blocks[2].2.iter().all(|&p| p == 2));
        assert_eq!(blocks[3].2.len(), 256);
    }

    #[test]
    fn test_from_rgba_transparency() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0x64, 0xB0, 0xFF, 255]));
        rgba.put_pixel(1, 0, Rgba([0x64, 0xB0, 0xFF, 0]));
        let mut mapper = ColorMapper::new(Catalog::nes());

        let img = IndexedImage::from_rgba("t", &rgba, &mut mapper, Some(0x0F)).unwrap();
        assert_eq!(img.pixels(), &[0x21, 0x0F]);

        let img = IndexedImage::from_rgba("t", &rgba, &mut mapper, None).unwrap();
        assert_eq!(img.pixels(), &[0x21, 0x21]);
    }
}
