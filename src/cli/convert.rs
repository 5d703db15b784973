//! Convert command implementation

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::{debug, info};

use super::{find_image_files, ConvertArgs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::bitmap::IndexedImage;
use crate::catalog::Catalog;
use crate::config::loader::{check, resolve_path};
use crate::config::{load_config, merge_cli_overrides, CliOverrides, FixedPaletteConfig, NestileConfig};
use crate::output::{output_stem, plan_outputs, write_outputs, PreviewOptions};
use crate::pipeline::{convert, ConversionContext, ImageInput};

/// Parse a `--palette` value: `SLOT=C1,C2,C3`.
pub(crate) fn parse_fixed_palette(s: &str) -> Result<FixedPaletteConfig, String> {
    let (slot, colors) = s.split_once('=').ok_or_else(|| format!("'{}' is not SLOT=COLORS", s))?;
    let slot = slot.trim().parse::<usize>().map_err(|_| format!("'{}' is not a palette slot", slot.trim()))?;
    let colors: Vec<String> =
        colors.split(',').map(str::trim).filter(|c| !c.is_empty()).map(String::from).collect();
    Ok(FixedPaletteConfig { slot, colors })
}

/// Make the paths of a loaded config relative to its own directory.
fn resolve_config_paths(config: &mut NestileConfig, root: &Path) {
    if let Some(path) = &config.catalog.path {
        config.catalog.path = Some(resolve_path(root, path));
    }
    config.output.dir = resolve_path(root, &config.output.dir);
    for image in &mut config.images {
        image.path = resolve_path(root, &image.path);
    }
}

/// Expand input paths (directories become the images inside) and attach
/// pattern offsets.
fn collect_inputs(args: &ConvertArgs, config: &NestileConfig) -> Vec<(PathBuf, u32)> {
    let listed: Vec<(PathBuf, u32)> = if args.inputs.is_empty() {
        config.images.iter().map(|i| (i.path.clone(), config.effective_pattern_offset(i))).collect()
    } else {
        args.inputs.iter().map(|p| (p.clone(), config.tiles.pattern_offset)).collect()
    };

    let mut inputs = Vec::new();
    for (path, offset) in listed {
        if path.is_dir() {
            inputs.extend(find_image_files(&path).into_iter().map(|p| (p, offset)));
        } else {
            inputs.push((path, offset));
        }
    }
    inputs
}

/// Execute the convert command
pub fn run_convert(args: &ConvertArgs, quiet: bool) -> ExitCode {
    // Collect fixed palettes from the command line
    let mut fixed = Vec::with_capacity(args.palettes.len());
    for value in &args.palettes {
        match parse_fixed_palette(value) {
            Ok(p) => fixed.push(p),
            Err(e) => {
                eprintln!("Error: --palette {}", e);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        }
    }

    let loaded = match load_config(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    if let Some(path) = &loaded.path {
        debug!("Using config {}", path.display());
    }
    let root = loaded.root();
    let mut config = loaded.config;
    resolve_config_paths(&mut config, &root);

    let overrides = CliOverrides {
        mode: args.mode,
        background: args.bg_color.clone(),
        enabled: args.enable_palettes.clone(),
        fixed,
        lossy: args.lossy.then_some(true),
        allow_overflow: args.allow_tile_overflow.then_some(true),
        share_pattern_table: args.share_pattern_table.then_some(true),
        pattern_offset: args.pattern_offset,
        catalog: args.catalog.clone(),
        out_dir: args.out_dir.clone(),
        preview: args.preview.then_some(true),
        preview_scale: args.preview_scale,
    };
    merge_cli_overrides(&mut config, &overrides);
    if let Err(e) = check(&config) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let options = match config.convert_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let inputs = collect_inputs(args, &config);
    if inputs.is_empty() {
        eprintln!("Error: No input images (pass files or directories, or list [[images]] in nestile.toml)");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    // Output file names come from the input stems and must not collide
    let mut stems: BTreeMap<String, &Path> = BTreeMap::new();
    for (path, _) in &inputs {
        let stem = output_stem(path);
        if let Some(previous) = stems.insert(stem.clone(), path) {
            eprintln!(
                "Error: '{}' and '{}' would both write outputs named '{}'",
                previous.display(),
                path.display(),
                stem
            );
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    }

    let catalog = match &config.catalog.path {
        Some(path) => match Catalog::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                eprintln!("Error: Failed to load catalog '{}': {}", path.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
        None => Catalog::nes(),
    };
    let catalog = catalog.with_forbidden(config.catalog.forbidden.iter().copied());
    let mut ctx = ConversionContext::new(catalog);

    // Transparent pixels take the background color when it is known up front
    let transparent = match options.background {
        Some(spec) => match ctx.mapper_mut().resolve(spec) {
            Ok(index) => Some(index),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
        None => None,
    };

    let mut images = Vec::with_capacity(inputs.len());
    for (path, offset) in &inputs {
        let rgba = match image::open(path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                eprintln!("Error: Failed to load '{}': {}", path.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
        };
        let image = match IndexedImage::from_rgba(output_stem(path), &rgba, ctx.mapper_mut(), transparent) {
            Ok(image) => image,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        };
        debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
        images.push(ImageInput::new(image).with_pattern_offset(*offset));
    }

    let result = match convert(&mut ctx, &images, &options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let preview = config.output.preview.then_some(PreviewOptions { catalog: ctx.catalog(), scale: config.output.preview_scale });
    let files = plan_outputs(&result, preview);
    let written = match write_outputs(&files, &config.output.dir) {
        Ok(written) => written,
        Err(e) => {
            eprintln!("Error: Failed to write output: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    info!("Wrote {} file(s) to {}", written.len(), config.output.dir.display());

    if !quiet {
        for image in &result.images {
            let table = result.pattern_table_of(image);
            println!(
                "Converted: {} ({} cells, pattern table '{}' with {} tiles)",
                image.name,
                image.tile_ids.len(),
                table.map_or("", |t| t.name()),
                table.map_or(0, |t| t.len())
            );
        }
        for (slot, palette) in result.palettes.filled() {
            println!("Palette {}: ${:02X} {}", slot, result.background, palette);
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageConfig;

    #[test]
    fn test_parse_fixed_palette() {
        let p = parse_fixed_palette("2=$16, #FFFFFF ,0x30").unwrap();
        assert_eq!(p.slot, 2);
        assert_eq!(p.colors, vec!["$16", "#FFFFFF", "0x30"]);

        assert!(parse_fixed_palette("$16,$27").is_err());
        assert!(parse_fixed_palette("x=$16").is_err());
        assert_eq!(parse_fixed_palette("1=").unwrap().colors.len(), 0);
    }

    #[test]
    fn test_resolve_config_paths() {
        let mut config = NestileConfig::default();
        config.catalog.path = Some(PathBuf::from("pal/nes.pal"));
        config.images = vec![ImageConfig { path: PathBuf::from("art/a.png"), pattern_offset: None }];

        resolve_config_paths(&mut config, Path::new("/proj"));
        assert_eq!(config.catalog.path, Some(PathBuf::from("/proj/pal/nes.pal")));
        assert_eq!(config.output.dir, PathBuf::from("/proj/."));
        assert_eq!(config.images[0].path, PathBuf::from("/proj/art/a.png"));
    }

    #[test]
    fn test_collect_inputs_from_config() {
        let mut config = NestileConfig::default();
        config.tiles.pattern_offset = 8;
        config.images = vec![
            ImageConfig { path: PathBuf::from("a.png"), pattern_offset: None },
            ImageConfig { path: PathBuf::from("b.png"), pattern_offset: Some(64) },
        ];

        let inputs = collect_inputs(&ConvertArgs::default(), &config);
        assert_eq!(inputs, vec![(PathBuf::from("a.png"), 8), (PathBuf::from("b.png"), 64)]);

        let args = ConvertArgs { inputs: vec![PathBuf::from("c.png")], ..Default::default() };
        assert_eq!(collect_inputs(&args, &config), vec![(PathBuf::from("c.png"), 8)]);
    }
}
