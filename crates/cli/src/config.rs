//! Configuration for the popperkit command line.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. the platform config directory (`%APPDATA%/popperkit/popperkit.toml`,
//!    `~/Library/Application Support/...`, `$XDG_CONFIG_HOME/popperkit/...`)
//! 2. `~/.config/popperkit/popperkit.toml`
//! 3. `./popperkit.toml` (current directory, for development)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use popperkit::{ConfigWarning, PopperConfig, PopperOptions, Rect, Viewport};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

const FILE_NAME: &str = "popperkit.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Raw popper options. Numbers may also be written as strings.
    pub popper: PopperOptions,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Scene used by `simulate` and as fallback geometry for `place`.
    pub scene: SceneConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Width and height of an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Geometry of the in-memory scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Trigger bounding box, page-absolute.
    pub trigger: Rect,
    /// Popper size.
    pub popper: Size,
    /// Arrow size; the popper has no arrow when unset.
    pub arrow: Option<Size>,
    /// Visible window and scroll offset.
    pub viewport: Viewport,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            trigger: Rect::new(100.0, 100.0, 50.0, 20.0),
            popper: Size {
                width: 80.0,
                height: 30.0,
            },
            arrow: None,
            viewport: Viewport::new(500.0, 400.0),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Map a level name to a tracing level, falling back to `info`.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns the default config if no file is found.
    pub fn load() -> Result<Self> {
        for path in &config_paths() {
            if path.exists() {
                return Self::load_from_path(path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validated popper settings, plus a warning for every replaced value.
    pub fn popper_config(&self) -> (PopperConfig, Vec<ConfigWarning>) {
        PopperConfig::from_options(&self.popper)
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(proj_dirs) = ProjectDirs::from("dev", "popperkit", "popperkit") {
        paths.push(proj_dirs.config_dir().join(FILE_NAME));
    }

    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("popperkit").join(FILE_NAME));
    }

    paths.push(PathBuf::from(FILE_NAME));

    paths
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use popperkit::{Side, SideRequest};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.scene.viewport, Viewport::new(500.0, 400.0));
        assert!(config.scene.arrow.is_none());

        let (popper, warnings) = config.popper_config();
        assert!(warnings.is_empty());
        assert_eq!(popper, PopperConfig::default());
    }

    #[test]
    fn test_config_partial_parse() {
        let toml_str = r#"
            [popper]
            side = "right"
            enter_delay = "150ms"

            [scene.viewport]
            width = 800
            height = 600
            scroll_top = 40
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let (popper, warnings) = config.popper_config();

        assert!(warnings.is_empty());
        assert_eq!(popper.side, SideRequest::Fixed(Side::Right));
        assert_eq!(popper.enter_delay, 150.0);
        assert_eq!(popper.margin, 4.0);
        assert_eq!(
            config.scene.viewport,
            Viewport::new(800.0, 600.0).with_scroll(0.0, 40.0)
        );
        assert_eq!(config.scene.trigger, Rect::new(100.0, 100.0, 50.0, 20.0));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_lenient_values_warn() {
        let toml_str = r#"
            [popper]
            margin = -2
            hide_duration = "slow"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let (popper, warnings) = config.popper_config();

        assert_eq!(popper.margin, 0.0);
        assert_eq!(popper.hide_duration, 200.0);
        let mut fields: Vec<_> = warnings.iter().map(|w| w.field).collect();
        fields.sort_unstable();
        assert_eq!(fields, vec!["hide_duration", "margin"]);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.scene.popper, config.scene.popper);
        assert_eq!(parsed.logging.level, config.logging.level);
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let err = Config::load_from_path(Path::new("/nonexistent/popperkit.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level(" warn "), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_config_paths_order() {
        let paths = config_paths();
        assert_eq!(paths.last(), Some(&PathBuf::from(FILE_NAME)));
    }
}
