//! Configuration loading and discovery for `nestile.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{FixedPaletteConfig, NestileConfig};
use crate::mode::Mode;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name looked up in every directory.
pub const CONFIG_FILE_NAME: &str = "nestile.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse nestile.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// A configuration together with the file it came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: NestileConfig,
    /// `None` when no config file was found
    pub path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Directory relative paths in the config are resolved against.
    pub fn root(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(project_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub mode: Option<Mode>,
    pub background: Option<String>,
    /// Replaces the enabled slot list
    pub enabled: Option<Vec<usize>>,
    /// Replaces fixed palettes slot by slot
    pub fixed: Vec<FixedPaletteConfig>,
    pub lossy: Option<bool>,
    pub allow_overflow: Option<bool>,
    pub share_pattern_table: Option<bool>,
    pub pattern_offset: Option<u32>,
    pub catalog: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub preview: Option<bool>,
    pub preview_scale: Option<u8>,
}

/// Find nestile.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for nestile.toml
/// 2. Check XDG_CONFIG_HOME/nestile/nestile.toml (or ~/.config/nestile/nestile.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find nestile.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("nestile").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find nestile.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a nestile.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            let config = load_config_file(&p)?;
            Ok(LoadedConfig { config, path: Some(p) })
        }
        None => Ok(LoadedConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<NestileConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: NestileConfig = toml::from_str(&contents)?;
    check(&config)?;
    Ok(config)
}

/// Turn validation errors into a `ConfigError`.
pub fn check(config: &NestileConfig) -> Result<(), ConfigError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }
    Ok(())
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut NestileConfig, overrides: &CliOverrides) {
    if let Some(mode) = overrides.mode {
        config.convert.mode = mode;
    }
    if let Some(ref background) = overrides.background {
        config.convert.background = Some(background.clone());
    }

    if let Some(ref catalog) = overrides.catalog {
        config.catalog.path = Some(catalog.clone());
    }

    if let Some(ref enabled) = overrides.enabled {
        config.palettes.enabled = enabled.clone();
    }
    for fixed in &overrides.fixed {
        config.palettes.fixed.retain(|f| f.slot != fixed.slot);
        config.palettes.fixed.push(fixed.clone());
    }
    config.palettes.fixed.sort_by_key(|f| f.slot);
    if let Some(lossy) = overrides.lossy {
        config.palettes.lossy = lossy;
    }

    if let Some(allow_overflow) = overrides.allow_overflow {
        config.tiles.allow_overflow = allow_overflow;
    }
    if let Some(share) = overrides.share_pattern_table {
        config.tiles.share_pattern_table = share;
    }
    if let Some(offset) = overrides.pattern_offset {
        config.tiles.pattern_offset = offset;
    }

    if let Some(ref out_dir) = overrides.out_dir {
        config.output.dir = out_dir.clone();
    }
    if let Some(preview) = overrides.preview {
        config.output.preview = preview;
    }
    if let Some(scale) = overrides.preview_scale {
        config.output.preview_scale = scale;
    }
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the nestile.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
