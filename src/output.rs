//! Output files: naming, preview PNGs and writing.
//!
//! Output is planned in full before anything touches the disk, so a run
//! that fails never leaves half its files behind.

use crate::catalog::Catalog;
use crate::pipeline::ConversionResult;
use crate::preview::render_preview;
use image::imageops::FilterType;
use image::RgbaImage;
use std::io;
use std::path::{Path, PathBuf};

/// Error type for output operations
#[derive(Debug)]
pub enum OutputError {
    /// IO error during file operations
    Io(io::Error),
    /// Image encoding error
    Image(image::ImageError),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "IO error: {}", e),
            OutputError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(e) => Some(e),
            OutputError::Image(e) => Some(e),
        }
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::Io(e)
    }
}

impl From<image::ImageError> for OutputError {
    fn from(e: image::ImageError) -> Self {
        OutputError::Image(e)
    }
}

/// Contents of one output file.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputContents {
    Binary(Vec<u8>),
    Png(RgbaImage),
}

/// A file to write, relative to the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub name: String,
    pub contents: OutputContents,
}

impl OutputFile {
    fn binary(name: String, bytes: Vec<u8>) -> Self {
        Self { name, contents: OutputContents::Binary(bytes) }
    }
}

/// Preview settings. Previews are only rendered when this is given.
#[derive(Debug, Clone, Copy)]
pub struct PreviewOptions<'a> {
    pub catalog: &'a Catalog,
    /// Integer upscale factor, 1 for none
    pub scale: u8,
}

/// Decide every file a result produces.
///
/// | File | Contents |
/// |------|----------|
/// | `<name>.nam` | nametable |
/// | `<name>.atr` | attribute table (background mode) |
/// | `<name>.chr` / `shared.chr` | pattern table of the image's scope |
/// | `palette<N>.pal` | palette of each filled slot |
/// | `<name>.preview.png` | preview, when requested |
pub fn plan_outputs(result: &ConversionResult, preview: Option<PreviewOptions<'_>>) -> Vec<OutputFile> {
    let mut files = Vec::new();

    for table in &result.pattern_tables {
        files.push(OutputFile::binary(format!("{}.chr", table.name()), table.to_bytes()));
    }

    for image in &result.images {
        files.push(OutputFile::binary(format!("{}.nam", image.name), image.nametable()));
        if let Some(attributes) = &image.attributes {
            files.push(OutputFile::binary(format!("{}.atr", image.name), attributes.clone()));
        }
        if let Some(options) = preview {
            let rendered = scale_image(render_preview(result, image, options.catalog), options.scale);
            files.push(OutputFile { name: format!("{}.preview.png", image.name), contents: OutputContents::Png(rendered) });
        }
    }

    for (slot, _) in result.palettes.filled() {
        if let Some(bytes) = result.palette_bytes(slot) {
            files.push(OutputFile::binary(format!("palette{}.pal", slot), bytes.to_vec()));
        }
    }

    files
}

/// Write planned files into `dir`, creating it if needed.
///
/// Returns the paths written, in plan order.
pub fn write_outputs(files: &[OutputFile], dir: &Path) -> Result<Vec<PathBuf>, OutputError> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.name);
        match &file.contents {
            OutputContents::Binary(bytes) => write_binary(bytes, &path)?,
            OutputContents::Png(image) => save_png(image, &path)?,
        }
        written.push(path);
    }
    Ok(written)
}

/// Write raw bytes to a file, creating parent directories.
pub fn write_binary(bytes: &[u8], path: &Path) -> Result<(), OutputError> {
    create_parent(path)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Save an RGBA image to a PNG file.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    create_parent(path)?;
    image.save(path)?;
    Ok(())
}

fn create_parent(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Scale image by integer factor using nearest-neighbor interpolation.
///
/// This preserves crisp pixel edges for tile previews.
pub fn scale_image(image: RgbaImage, factor: u8) -> RgbaImage {
    if factor <= 1 {
        return image;
    }
    let (w, h) = image.dimensions();
    let new_w = w * factor as u32;
    let new_h = h * factor as u32;
    image::imageops::resize(&image, new_w, new_h, FilterType::Nearest)
}

/// File stem used to name an input's outputs (`art/title.png` → `title`).
pub fn output_stem(input: &Path) -> String {
    input.file_stem().and_then(|s| s.to_str()).unwrap_or("output").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::IndexedImage;
    use crate::color::ColorSpec;
    use crate::pipeline::{convert, ConversionContext, ConvertOptions, ImageInput};
    use image::Rgba;
    use tempfile::TempDir;

    fn result(share: bool) -> ConversionResult {
        let a = IndexedImage::from_fn("title", 32, 32, |x, _| if x < 16 { 0x16 } else { 0x0F });
        let b = IndexedImage::from_fn("logo", 16, 16, |_, _| 0x21);
        let options = ConvertOptions {
            background: Some(ColorSpec::Index(0x0F)),
            share_pattern_table: share,
            ..Default::default()
        };
        let mut ctx = ConversionContext::new(Catalog::nes());
        convert(&mut ctx, &[ImageInput::new(a), ImageInput::new(b)], &options).unwrap()
    }

    fn names(files: &[OutputFile]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_plan_per_image_tables() {
        let files = plan_outputs(&result(false), None);
        assert_eq!(
            names(&files),
            vec!["title.chr", "logo.chr", "title.nam", "title.atr", "logo.nam", "logo.atr", "palette0.pal"]
        );
    }

    #[test]
    fn test_plan_shared_table_and_preview() {
        let catalog = Catalog::nes();
        let preview = PreviewOptions { catalog: &catalog, scale: 2 };
        let files = plan_outputs(&result(true), Some(preview));
        assert_eq!(names(&files)[0], "shared.chr");
        assert!(!names(&files).contains(&"title.chr"));
        assert!(names(&files).contains(&"logo.preview.png"));

        let png = files.iter().find(|f| f.name == "title.preview.png").unwrap();
        match &png.contents {
            OutputContents::Png(img) => assert_eq!(img.dimensions(), (64, 64)),
            OutputContents::Binary(_) => panic!("preview should be a PNG"),
        }
    }

    #[test]
    fn test_write_outputs() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out");
        let files = plan_outputs(&result(false), None);
        let written = write_outputs(&files, &dir).unwrap();

        assert_eq!(written.len(), files.len());
        let nam = std::fs::read(dir.join("title.nam")).unwrap();
        assert_eq!(nam.len(), 16);
        let atr = std::fs::read(dir.join("title.atr")).unwrap();
        assert_eq!(atr.len(), 1);
        let pal = std::fs::read(dir.join("palette0.pal")).unwrap();
        assert_eq!(pal.len(), 4);
        assert_eq!(pal[0], 0x0F);
    }

    #[test]
    fn test_scale_image() {
        let img = RgbaImage::from_pixel(2, 3, Rgba([1, 2, 3, 255]));
        let scaled = scale_image(img.clone(), 4);
        assert_eq!(scaled.dimensions(), (8, 12));
        assert_eq!(scale_image(img, 1).dimensions(), (2, 3));
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(output_stem(Path::new("art/title.png")), "title");
        assert_eq!(output_stem(Path::new("/")), "output");
    }
}
