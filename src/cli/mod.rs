//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod convert;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glob::glob;

use crate::mode::Mode;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Image extensions picked up when a directory is given as input.
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "bmp", "gif"];

/// Check if a path has a supported image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
}

/// Find all images in a directory (recursively), sorted by path.
pub fn find_image_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let dir_str = dir.display().to_string();

    if let Ok(paths) = glob(&format!("{}/**/*", dir_str)) {
        files.extend(paths.filter_map(Result::ok).filter(|p| p.is_file() && is_image_file(p)));
    }

    files.sort();
    files
}

/// Nestile - convert images into NES pattern, name, attribute and palette tables
#[derive(Parser)]
#[command(name = "nestile")]
#[command(about = "Nestile - convert images into NES pattern, name, attribute and palette tables")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log per-stage details
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert images into tile data
    Convert(ConvertArgs),
}

/// Arguments of `nestile convert`. Anything left unset falls back to
/// `nestile.toml`, then to the defaults.
#[derive(Args, Debug, Default)]
pub struct ConvertArgs {
    /// Input images or directories (defaults to the `[[images]]` of the config)
    pub inputs: Vec<PathBuf>,

    /// What the graphics are for
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Shared background color: #RRGGBB or catalog index ($0F, 0x0F, 15)
    #[arg(short = 'b', long = "bg-color")]
    pub bg_color: Option<String>,

    /// Palette slots that may be used (e.g. "0,1,2,3")
    #[arg(long, value_delimiter = ',')]
    pub enable_palettes: Option<Vec<usize>>,

    /// Pin a palette to a slot: SLOT=C1,C2,C3 (repeatable)
    #[arg(short = 'p', long = "palette", value_name = "SLOT=COLORS")]
    pub palettes: Vec<String>,

    /// Drop the least used palettes instead of failing
    #[arg(long)]
    pub lossy: bool,

    /// Keep going when tile IDs exceed the hardware limit (IDs wrap)
    #[arg(long)]
    pub allow_tile_overflow: bool,

    /// One pattern table for all images
    #[arg(long)]
    pub share_pattern_table: bool,

    /// First tile ID of every pattern table
    #[arg(long)]
    pub pattern_offset: Option<u32>,

    /// System color catalog (.json or .pal)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Also write <name>.preview.png
    #[arg(long)]
    pub preview: bool,

    /// Preview upscale factor (1-16)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub preview_scale: Option<u8>,

    /// Config file (default: nestile.toml found from the current directory up)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Install the logger. `RUST_LOG` wins over the flags.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        LevelFilter::Warn
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Convert(args) => convert::run_convert(&args, cli.quiet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("title.png")));
        assert!(is_image_file(Path::new("path/to/TITLE.PNG")));
        assert!(is_image_file(Path::new("sprite.bmp")));
        assert!(is_image_file(Path::new("anim.gif")));
        assert!(!is_image_file(Path::new("title.chr")));
        assert!(!is_image_file(Path::new("png")));
    }

    #[test]
    fn test_find_image_files() {
        use std::fs;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();

        fs::write(dir_path.join("b.png"), "x").unwrap();
        fs::write(dir_path.join("a.bmp"), "x").unwrap();
        fs::write(dir_path.join("notes.txt"), "ignored").unwrap();
        let sub_dir = dir_path.join("sub");
        fs::create_dir(&sub_dir).unwrap();
        fs::write(sub_dir.join("c.gif"), "x").unwrap();

        let files = find_image_files(dir_path);
        assert_eq!(files, vec![dir_path.join("a.bmp"), dir_path.join("b.png"), sub_dir.join("c.gif")]);
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert_args() {
        let cli = Cli::parse_from([
            "nestile",
            "convert",
            "a.png",
            "b.png",
            "--mode",
            "sprites8x16",
            "--bg-color",
            "$0F",
            "--enable-palettes",
            "0,2",
            "--palette",
            "0=$16,$27",
            "--palette",
            "2=#FFFFFF",
            "-v",
        ]);
        assert!(cli.verbose);
        let Commands::Convert(args) = cli.command;
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.mode, Some(Mode::Sprites8x16));
        assert_eq!(args.bg_color.as_deref(), Some("$0F"));
        assert_eq!(args.enable_palettes, Some(vec![0, 2]));
        assert_eq!(args.palettes, vec!["0=$16,$27", "2=#FFFFFF"]);
    }
}
