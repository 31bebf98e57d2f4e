//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, TubechordConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in load order (system, user, local).
///
/// Standard locations are returned only when they exist. A `cli_path`
/// replaces the local override and is returned even when missing, so that
/// loading reports the bad path.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/tubechord/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("tubechord/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("tubechord.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file into a raw table, checking it against the config schema.
pub fn load_from_file(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

fn parse_toml(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    // Reject typos and wrong types here, while the file name is still known
    table_to_config(table.clone(), path)?;

    Ok(table)
}

/// Deserialize a (possibly merged) table into a config.
pub fn table_to_config(table: toml::Table, path: &Path) -> Result<TubechordConfig, ConfigError> {
    table.try_into::<TubechordConfig>().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge `overlay` into `base` key by key; nested tables merge recursively,
/// anything else in `overlay` replaces the value in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(overlay_inner) = value {
            if let Some(toml::Value::Table(base_inner)) = base.get_mut(&key) {
                merge_tables(base_inner, overlay_inner);
                continue;
            }
            base.insert(key, toml::Value::Table(overlay_inner));
        } else {
            base.insert(key, value);
        }
    }
}

/// Apply `TUBECHORD_*` and `RUST_LOG` overrides from a variable lookup
/// (normally the process environment).
pub fn apply_overrides_from(
    config: &mut TubechordConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    fn parsed<T: std::str::FromStr>(var: &str, value: String) -> Result<T, ConfigError> {
        value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            })
    }

    const MIN_DURATION: &str = "TUBECHORD_MIN_DURATION";
    const SMOOTHING_WINDOW: &str = "TUBECHORD_SMOOTHING_WINDOW";
    const TEMPO: &str = "TUBECHORD_TEMPO";
    const VELOCITY: &str = "TUBECHORD_VELOCITY";
    const HOP_LENGTH: &str = "TUBECHORD_HOP_LENGTH";
    const N_FFT: &str = "TUBECHORD_N_FFT";
    const YT_DLP: &str = "TUBECHORD_YT_DLP";
    const LOG_LEVEL: &str = "TUBECHORD_LOG_LEVEL";

    if let Some(v) = lookup(MIN_DURATION) {
        config.analysis.min_chord_duration = parsed(MIN_DURATION, v)?;
        sources.env_overrides.push(MIN_DURATION.to_string());
    }
    if let Some(v) = lookup(SMOOTHING_WINDOW) {
        config.analysis.smoothing_window = parsed(SMOOTHING_WINDOW, v)?;
        sources.env_overrides.push(SMOOTHING_WINDOW.to_string());
    }

    if let Some(v) = lookup(TEMPO) {
        config.export.tempo = parsed(TEMPO, v)?;
        sources.env_overrides.push(TEMPO.to_string());
    }
    if let Some(v) = lookup(VELOCITY) {
        config.export.velocity = parsed(VELOCITY, v)?;
        sources.env_overrides.push(VELOCITY.to_string());
    }

    if let Some(v) = lookup(HOP_LENGTH) {
        config.audio.hop_length = parsed(HOP_LENGTH, v)?;
        sources.env_overrides.push(HOP_LENGTH.to_string());
    }
    if let Some(v) = lookup(N_FFT) {
        config.audio.n_fft = parsed(N_FFT, v)?;
        sources.env_overrides.push(N_FFT.to_string());
    }
    if let Some(v) = lookup(YT_DLP) {
        config.audio.yt_dlp = expand_path(&v);
        sources.env_overrides.push(YT_DLP.to_string());
    }

    if let Some(v) = lookup(LOG_LEVEL) {
        config.telemetry.log_level = v;
        sources.env_overrides.push(LOG_LEVEL.to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    Ok(())
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR or $VAR/rest/of/path
        let (var_name, rest) = stripped.split_once('/').unwrap_or((stripped, ""));
        if let Ok(var_value) = env::var(var_name) {
            let base = PathBuf::from(var_value);
            return if rest.is_empty() { base } else { base.join(rest) };
        }
    }

    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/bin/yt-dlp");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("bin/yt-dlp"));
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("/usr/bin/yt-dlp"), PathBuf::from("/usr/bin/yt-dlp"));
        assert_eq!(expand_path("yt-dlp"), PathBuf::from("yt-dlp"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[export]
tempo = 100
"#;
        let table = parse_toml(toml, Path::new("test.toml")).unwrap();
        let config = table_to_config(table, Path::new("test.toml")).unwrap();
        assert_eq!(config.export.tempo, 100);
        // Other values should be defaults
        assert_eq!(config.export.velocity, 80);
        assert_eq!(config.analysis.smoothing_window, 9);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[analysis]
min_chord_duration = 0.75
smoothing_window = 15

[export]
tempo = 96
velocity = 90
bass_velocity = 60

[audio]
hop_length = 1024
n_fft = 4096
yt_dlp = "/opt/yt-dlp"

[telemetry]
log_level = "debug"
"#;
        let table = parse_toml(toml, Path::new("test.toml")).unwrap();
        let config = table_to_config(table, Path::new("test.toml")).unwrap();

        assert_eq!(config.analysis.min_chord_duration, 0.75);
        assert_eq!(config.analysis.smoothing_window, 15);
        assert_eq!(config.export.tempo, 96);
        assert_eq!(config.export.velocity, 90);
        assert_eq!(config.export.bass_velocity, 60);
        assert_eq!(config.audio.hop_length, 1024);
        assert_eq!(config.audio.n_fft, 4096);
        assert_eq!(config.audio.yt_dlp, PathBuf::from("/opt/yt-dlp"));
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_parse_errors_name_the_file() {
        let err = parse_toml("[export\ntempo = 1", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));

        let err = parse_toml("[export]\ntempo = \"fast\"", Path::new("typed.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = parse_toml("[exports]\ntempo = 90", Path::new("typo.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_merge_is_field_by_field() {
        let mut base: toml::Table = "[export]\ntempo = 100\nvelocity = 70".parse().unwrap();
        let overlay: toml::Table = "[export]\nvelocity = 90\n[telemetry]\nlog_level = \"warn\"".parse().unwrap();
        merge_tables(&mut base, overlay);

        let config = table_to_config(base, Path::new("merged")).unwrap();
        assert_eq!(config.export.tempo, 100);
        assert_eq!(config.export.velocity, 90);
        assert_eq!(config.telemetry.log_level, "warn");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = TubechordConfig::default();
        let mut sources = ConfigSources::default();
        let lookup = lookup_from(&[
            ("TUBECHORD_TEMPO", "120"),
            ("TUBECHORD_MIN_DURATION", "0.25"),
            ("TUBECHORD_N_FFT", "4096"),
            ("RUST_LOG", "tubechord=trace"),
        ]);
        apply_overrides_from(&mut config, &mut sources, lookup).unwrap();

        assert_eq!(config.export.tempo, 120);
        assert_eq!(config.analysis.min_chord_duration, 0.25);
        assert_eq!(config.audio.n_fft, 4096);
        assert_eq!(config.telemetry.log_level, "tubechord=trace");
        assert_eq!(sources.env_overrides.len(), 4);
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let mut config = TubechordConfig::default();
        let mut sources = ConfigSources::default();
        let err = apply_overrides_from(
            &mut config,
            &mut sources,
            lookup_from(&[("TUBECHORD_SMOOTHING_WINDOW", "wide")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "TUBECHORD_SMOOTHING_WINDOW"));
    }

    #[test]
    fn test_cli_path_replaces_local_override() {
        let files = discover_config_files_with_override(Some(Path::new("/nonexistent/custom.toml")));
        assert_eq!(files.last(), Some(&PathBuf::from("/nonexistent/custom.toml")));
    }
}
