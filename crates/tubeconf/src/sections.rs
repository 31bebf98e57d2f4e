//! Config sections, one struct per TOML table.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Chord detection knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Chords shorter than this (seconds) are dropped as noise.
    /// Default: 0.5
    #[serde(default = "AnalysisConfig::default_min_chord_duration")]
    pub min_chord_duration: f64,

    /// Box-filter width in frames.
    /// Default: 9
    #[serde(default = "AnalysisConfig::default_smoothing_window")]
    pub smoothing_window: usize,
}

impl AnalysisConfig {
    fn default_min_chord_duration() -> f64 {
        0.5
    }

    fn default_smoothing_window() -> usize {
        9
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_chord_duration: Self::default_min_chord_duration(),
            smoothing_window: Self::default_smoothing_window(),
        }
    }
}

/// MIDI export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// Playback tempo in BPM.
    /// Default: 80
    #[serde(default = "ExportConfig::default_tempo")]
    pub tempo: u32,

    /// Right-hand velocity.
    /// Default: 80
    #[serde(default = "ExportConfig::default_velocity")]
    pub velocity: u8,

    /// Left-hand velocity.
    /// Default: 68
    #[serde(default = "ExportConfig::default_bass_velocity")]
    pub bass_velocity: u8,
}

impl ExportConfig {
    fn default_tempo() -> u32 {
        80
    }

    fn default_velocity() -> u8 {
        80
    }

    fn default_bass_velocity() -> u8 {
        68
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            tempo: Self::default_tempo(),
            velocity: Self::default_velocity(),
            bass_velocity: Self::default_bass_velocity(),
        }
    }
}

/// Audio download and chroma extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AudioConfig {
    /// Samples between analysis frames.
    /// Default: 512
    #[serde(default = "AudioConfig::default_hop_length")]
    pub hop_length: usize,

    /// FFT window length in samples.
    /// Default: 2048
    #[serde(default = "AudioConfig::default_n_fft")]
    pub n_fft: usize,

    /// yt-dlp executable, looked up on PATH when bare.
    /// Default: yt-dlp
    #[serde(default = "AudioConfig::default_yt_dlp")]
    pub yt_dlp: PathBuf,
}

impl AudioConfig {
    fn default_hop_length() -> usize {
        512
    }

    fn default_n_fft() -> usize {
        2048
    }

    fn default_yt_dlp() -> PathBuf {
        PathBuf::from("yt-dlp")
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            hop_length: Self::default_hop_length(),
            n_fft: Self::default_n_fft(),
            yt_dlp: Self::default_yt_dlp(),
        }
    }
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive string.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let audio: AudioConfig = toml::from_str("n_fft = 4096").unwrap();
        assert_eq!(audio.n_fft, 4096);
        assert_eq!(audio.hop_length, 512);
        assert_eq!(audio.yt_dlp, PathBuf::from("yt-dlp"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<ExportConfig>("tempo = 90\ntempi = 3").is_err());
    }
}
