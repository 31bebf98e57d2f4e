//! Configuration loading for tubechord.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tubeconf::TubechordConfig;
//!
//! let config = TubechordConfig::load().expect("Failed to load config");
//! println!("tempo: {}", config.export.tempo);
//! println!("hop: {} samples", config.audio.hop_length);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/tubechord/config.toml` (system)
//! 2. `~/.config/tubechord/config.toml` (user)
//! 3. `./tubechord.toml` (local override), or the `--config` path instead
//! 4. Environment variables (`TUBECHORD_*`, `RUST_LOG`)
//!
//! Command-line flags are applied by the binary on top of all of these.
//!
//! # Example Config
//!
//! ```toml
//! [analysis]
//! min_chord_duration = 0.5
//! smoothing_window = 9
//!
//! [export]
//! tempo = 80
//! velocity = 80
//! bass_velocity = 68
//!
//! [audio]
//! hop_length = 512
//! n_fft = 2048
//! yt_dlp = "yt-dlp"
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{AnalysisConfig, AudioConfig, ExportConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },
}

/// Complete tubechord configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TubechordConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl TubechordConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, with `config_path` replacing `./tubechord.toml`.
    ///
    /// System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let files = loader::discover_config_files_with_override(config_path);
        Self::load_files(&files, |key| std::env::var(key).ok())
    }

    /// Merge `files` in order, then apply variable overrides from `lookup`.
    pub fn load_files(
        files: &[PathBuf],
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in files {
            let table = loader::load_from_file(path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path.clone());
        }

        let label = sources
            .files
            .last()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("<defaults>"));
        let mut config = loader::table_to_config(merged, &label)?;

        loader::apply_overrides_from(&mut config, &mut sources, lookup)?;

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();

        output.push_str("# tubechord configuration\n\n");

        output.push_str("[analysis]\n");
        output.push_str(&format!(
            "min_chord_duration = {:?}\n",
            self.analysis.min_chord_duration
        ));
        output.push_str(&format!(
            "smoothing_window = {}\n",
            self.analysis.smoothing_window
        ));

        output.push_str("\n[export]\n");
        output.push_str(&format!("tempo = {}\n", self.export.tempo));
        output.push_str(&format!("velocity = {}\n", self.export.velocity));
        output.push_str(&format!("bass_velocity = {}\n", self.export.bass_velocity));

        output.push_str("\n[audio]\n");
        output.push_str(&format!("hop_length = {}\n", self.audio.hop_length));
        output.push_str(&format!("n_fft = {}\n", self.audio.n_fft));
        output.push_str(&format!(
            "yt_dlp = {}\n",
            toml::Value::String(self.audio.yt_dlp.display().to_string())
        ));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            toml::Value::String(self.telemetry.log_level.clone())
        ));

        output
    }
}
