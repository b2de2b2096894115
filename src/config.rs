use std::path::PathBuf;
use std::sync::OnceLock;

use clap::Parser;
use config::{Config as ConfigCrate, ConfigError as ConfigCrateError, Environment, File, Map, Source, Value};
use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BackendConfig;
use crate::controller::EngineConfig;
use crate::layout::LayoutStrategy;
use crate::viewport::ZoomAnchor;

const APP_NAME: &str = "mindmap-rs";
const ENV_PREFIX: &str = "MINDMAP";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] ConfigCrateError),
    #[error("Invalid colour for theme.{key}: {value:?} (expected #rrggbb)")]
    InvalidColor { key: &'static str, value: String },
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Colours used by the terminal front end, as `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub root: String,
    pub node: String,
    pub selected: String,
    pub matched: String,
    pub path: String,
    pub faded: String,
    pub edge: String,
    pub status: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            root: "#a78bfa".to_string(),
            node: "#e2e8f0".to_string(),
            selected: "#f59e0b".to_string(),
            matched: "#22c55e".to_string(),
            path: "#60a5fa".to_string(),
            faded: "#475569".to_string(),
            edge: "#64748b".to_string(),
            status: "#8b5cf6".to_string(),
        }
    }
}

impl ThemeConfig {
    fn entries(&self) -> [(&'static str, &str); 8] {
        [
            ("root", &self.root),
            ("node", &self.node),
            ("selected", &self.selected),
            ("matched", &self.matched),
            ("path", &self.path),
            ("faded", &self.faded),
            ("edge", &self.edge),
            ("status", &self.status),
        ]
    }
}

fn hex_color_regex() -> &'static Regex {
    static HEX: OnceLock<Regex> = OnceLock::new();
    HEX.get_or_init(|| Regex::new(r"^#([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})$").unwrap())
}

/// Parses `#rrggbb` into its components.
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let caps = hex_color_regex().captures(value.trim())?;
    let channel = |i: usize| u8::from_str_radix(&caps[i], 16).ok();
    Some((channel(1)?, channel(2)?, channel(3)?))
}

/// Terminal geometry: how many canvas pixels one character cell stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub cell_width_px: f64,
    pub cell_height_px: f64,
    pub tick_rate_ms: u64,
    /// Canvas pixels moved per arrow-key pan.
    pub pan_step_px: f64,
    /// Wheel delta reported for one scroll notch.
    pub wheel_notch_delta: f64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cell_width_px: 8.0,
            cell_height_px: 16.0,
            tick_rate_ms: 100,
            pan_step_px: 40.0,
            wheel_notch_delta: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: Option<PathBuf>,
    /// Filter used when `MINDMAP_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub theme: ThemeConfig,
    pub terminal: TerminalConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
    /// File opened at startup when none is given on the command line.
    pub default_file: Option<PathBuf>,
    /// Map file from the command line.
    #[serde(skip)]
    pub filename: Option<PathBuf>,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Mind-map viewer with radial and branch layouts", long_about = None)]
pub struct CliArgs {
    /// Mind map file to open (.json, .hmm or .txt)
    pub filename: Option<PathBuf>,

    /// Path to a custom configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the resolved configuration and exit
    #[arg(long)]
    pub debug_config: bool,

    /// Generate a map for this topic at startup
    #[arg(long)]
    pub topic: Option<String>,

    #[arg(long, value_enum)]
    pub layout: Option<LayoutArg>,

    #[arg(long, value_enum)]
    pub zoom_anchor: Option<AnchorArg>,

    /// Base URL of the generation backend
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Bearer token for the generation backend
    #[arg(long)]
    pub token: Option<String>,

    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutArg {
    Radial,
    Vertical,
}

impl From<LayoutArg> for LayoutStrategy {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Radial => LayoutStrategy::Radial,
            LayoutArg::Vertical => LayoutStrategy::Vertical,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorArg {
    Center,
    Cursor,
}

impl From<AnchorArg> for ZoomAnchor {
    fn from(arg: AnchorArg) -> Self {
        match arg {
            AnchorArg::Center => ZoomAnchor::Center,
            AnchorArg::Cursor => ZoomAnchor::Cursor,
        }
    }
}

/// Loads configuration: defaults, then the config file, then `MINDMAP__*`
/// environment variables, then command-line flags.
pub fn load_config(args: &CliArgs) -> Result<AppConfig, ConfigError> {
    let env_map: Map<String, Value> = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .collect()?;
    build_config_from_args(args, Some(env_map))
}

/// Default location of the config file.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Default location of the log file.
pub fn default_log_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_local_dir().join("mindmap.log"))
}

pub fn build_config_from_args(
    args: &CliArgs,
    override_source: Option<Map<String, Value>>,
) -> Result<AppConfig, ConfigError> {
    let config_file_path = args.config.clone().or_else(default_config_path);

    let mut builder = ConfigCrate::builder();
    if let Some(path) = config_file_path {
        // An explicit --config must exist; the default location is optional.
        builder = builder.add_source(File::from(path).required(args.config.is_some()));
    }
    if let Some(overrides) = override_source {
        for (key, value) in overrides {
            builder = builder.set_override(&key, value)?;
        }
    }

    let mut config: AppConfig = builder.build()?.try_deserialize()?;

    config.filename = args.filename.clone();
    if let Some(layout) = args.layout {
        config.engine.layout.strategy = layout.into();
    }
    if let Some(anchor) = args.zoom_anchor {
        config.engine.viewport.anchor = anchor.into();
    }
    if let Some(endpoint) = &args.endpoint {
        config.backend.endpoint = endpoint.clone();
    }
    if let Some(token) = &args.token {
        config.backend.token = Some(token.clone());
    }
    if let Some(log_file) = &args.log_file {
        config.logging.file = Some(log_file.clone());
    }

    validate_config(&config)?;
    Ok(config)
}

impl AppConfig {
    /// File to open at startup: the command-line file, else `default_file`.
    pub fn startup_file(&self) -> Option<&PathBuf> {
        self.filename.as_ref().or(self.default_file.as_ref())
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let viewport = &config.engine.viewport;
    positive("viewport.zoom_min", viewport.zoom_min)?;
    positive("viewport.zoom_max", viewport.zoom_max)?;
    positive("viewport.wheel_divisor", viewport.wheel_divisor)?;
    if viewport.zoom_min > viewport.zoom_max {
        return Err(ConfigError::ValidationError(format!(
            "viewport.zoom_min ({}) is greater than viewport.zoom_max ({})",
            viewport.zoom_min, viewport.zoom_max
        )));
    }

    let layout = &config.engine.layout;
    positive("layout.base_radius", layout.base_radius)?;
    if !(layout.radius_step >= 0.0) {
        return Err(ConfigError::ValidationError(
            "layout.radius_step must not be negative".to_string(),
        ));
    }
    for (name, spacing) in [
        ("layout.first_level", &layout.first_level),
        ("layout.deeper_levels", &layout.deeper_levels),
    ] {
        positive(&format!("{}.min_dx", name), spacing.min_dx)?;
        positive(&format!("{}.min_dy", name), spacing.min_dy)?;
    }

    positive("gesture.swipe_threshold", config.engine.gesture.swipe_threshold)?;
    positive("terminal.cell_width_px", config.terminal.cell_width_px)?;
    positive("terminal.cell_height_px", config.terminal.cell_height_px)?;

    for (key, value) in config.theme.entries() {
        if parse_hex_color(value).is_none() {
            return Err(ConfigError::InvalidColor {
                key,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::ValueKind;
    use std::io::Write;

    fn test_args(extra: &[&str]) -> CliArgs {
        let mut cmd = vec!["test_binary"];
        cmd.extend_from_slice(extra);
        CliArgs::try_parse_from(cmd).expect("Failed to parse test args")
    }

    /// Args pointing at an empty config file, so a user config cannot leak in.
    fn isolated_args(extra: &[&str]) -> (CliArgs, tempfile::NamedTempFile) {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let mut args = test_args(extra);
        args.config = Some(file.path().to_path_buf());
        (args, file)
    }

    #[test]
    fn test_default_config() {
        let (args, _file) = isolated_args(&[]);
        let config = build_config_from_args(&args, None).unwrap();
        assert_eq!(config.engine.layout.strategy, LayoutStrategy::Radial);
        assert_eq!(config.engine.viewport.zoom_min, 0.2);
        assert_eq!(config.engine.viewport.zoom_max, 4.0);
        assert_eq!(config.engine.gesture.long_press_delay_ms, 500);
        assert!(config.filename.is_none());
    }

    #[test]
    fn test_env_override() {
        let (args, _file) = isolated_args(&[]);
        let mut override_map = Map::new();
        override_map.insert(
            "engine.layout.strategy".to_string(),
            Value::new(None, ValueKind::String("vertical".to_string())),
        );
        override_map.insert(
            "engine.viewport.zoom_max".to_string(),
            Value::new(None, ValueKind::Float(3.0)),
        );

        let config = build_config_from_args(&args, Some(override_map)).unwrap();
        assert_eq!(config.engine.layout.strategy, LayoutStrategy::Vertical);
        assert_eq!(config.engine.viewport.zoom_max, 3.0);
        assert_eq!(config.engine.viewport.zoom_min, 0.2);
    }

    #[test]
    fn test_arg_override() {
        let (args, _file) = isolated_args(&[
            "map.json",
            "--layout=vertical",
            "--zoom-anchor=cursor",
            "--endpoint=http://localhost:9000",
        ]);
        let config = build_config_from_args(&args, None).unwrap();
        assert_eq!(config.filename, Some(PathBuf::from("map.json")));
        assert_eq!(config.engine.layout.strategy, LayoutStrategy::Vertical);
        assert_eq!(config.engine.viewport.anchor, ZoomAnchor::Cursor);
        assert_eq!(config.backend.endpoint, "http://localhost:9000");
    }

    #[test]
    fn test_file_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[engine.layout]\nbase_radius = 200.0\n\n[theme]\nselected = \"#ff0000\""
        )
        .unwrap();
        let mut args = test_args(&[]);
        args.config = Some(file.path().to_path_buf());

        let config = build_config_from_args(&args, None).unwrap();
        assert_eq!(config.engine.layout.base_radius, 200.0);
        assert_eq!(config.engine.layout.radius_step, 100.0);
        assert_eq!(config.theme.selected, "#ff0000");
    }

    #[test]
    fn test_missing_explicit_config_file_is_error() {
        let mut args = test_args(&[]);
        args.config = Some(PathBuf::from("/definitely/not/here/config.toml"));
        assert!(matches!(
            build_config_from_args(&args, None),
            Err(ConfigError::ConfigFile(_))
        ));
    }

    #[test]
    fn test_invalid_zoom_range_rejected() {
        let (args, _file) = isolated_args(&[]);
        let mut override_map = Map::new();
        override_map.insert(
            "engine.viewport.zoom_min".to_string(),
            Value::new(None, ValueKind::Float(5.0)),
        );
        let err = build_config_from_args(&args, Some(override_map)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_non_finite_zoom_max_rejected() {
        let (args, _file) = isolated_args(&[]);
        let mut override_map = Map::new();
        override_map.insert(
            "engine.viewport.zoom_max".to_string(),
            Value::new(None, ValueKind::Float(f64::NAN)),
        );
        let err = build_config_from_args(&args, Some(override_map)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_zero_cell_size_rejected() {
        let (args, _file) = isolated_args(&[]);
        let mut override_map = Map::new();
        override_map.insert(
            "terminal.cell_height_px".to_string(),
            Value::new(None, ValueKind::Float(0.0)),
        );
        let err = build_config_from_args(&args, Some(override_map)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_invalid_color_rejected() {
        let (args, _file) = isolated_args(&[]);
        let mut override_map = Map::new();
        override_map.insert(
            "theme.edge".to_string(),
            Value::new(None, ValueKind::String("grey".to_string())),
        );
        let err = build_config_from_args(&args, Some(override_map)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidColor { key: "edge", .. }));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff8000"), Some((255, 128, 0)));
        assert_eq!(parse_hex_color("#FFF"), None);
        assert_eq!(parse_hex_color("red"), None);
    }

    #[test]
    fn test_startup_file_prefers_cli() {
        let config = AppConfig {
            default_file: Some(PathBuf::from("default.hmm")),
            filename: Some(PathBuf::from("cli.json")),
            ..AppConfig::default()
        };
        assert_eq!(config.startup_file(), Some(&PathBuf::from("cli.json")));
    }
}
