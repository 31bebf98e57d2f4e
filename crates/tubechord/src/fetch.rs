//! Source resolution and audio download.
//!
//! URLs go through `yt-dlp` into a private temporary directory that lives
//! as long as the returned [`Download`]. Local WAV and MIDI files are used
//! in place.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Title used when none can be determined.
pub const FALLBACK_TITLE: &str = "output";

/// Where the music comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// An `http://` or `https://` page yt-dlp understands
    Url(String),
    /// A WAV file on disk
    Wav(PathBuf),
    /// A Standard MIDI File on disk
    Midi(PathBuf),
}

impl Source {
    /// Classify a command-line source argument.
    pub fn parse(arg: &str) -> Result<Self> {
        let lower = arg.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Source::Url(arg.to_string()));
        }

        let path = PathBuf::from(arg);
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("wav") | Some("wave") => Ok(Source::Wav(path)),
            Some("mid") | Some("midi") => Ok(Source::Midi(path)),
            _ => bail!(
                "unsupported source '{}': expected an http(s) URL, a .wav file or a .mid file",
                arg
            ),
        }
    }

    /// Title for a local file: its stem. URLs need a lookup.
    pub fn local_title(&self) -> Option<String> {
        match self {
            Source::Url(_) => None,
            Source::Wav(path) | Source::Midi(path) => path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string),
        }
    }
}

/// A WAV file fetched by yt-dlp. The directory is deleted on drop.
#[derive(Debug)]
pub struct Download {
    wav_path: PathBuf,
    _dir: TempDir,
}

impl Download {
    pub fn wav_path(&self) -> &Path {
        &self.wav_path
    }
}

/// Thin wrapper around the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Look up the video title without downloading media.
    ///
    /// Any failure (missing binary, network, empty output) is logged and
    /// yields `None`.
    pub fn title(&self, url: &str) -> Option<String> {
        let output = match Command::new(&self.program)
            .args(["--get-title", "--quiet", "--no-warnings", url])
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                warn!("could not run {}: {}", self.program.display(), e);
                return None;
            }
        };

        if !output.status.success() {
            warn!(
                "title lookup failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        let title = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty());
        debug!("title lookup: {:?}", title);
        title
    }

    /// Download the best audio stream of `url` and convert it to WAV.
    pub fn download(&self, url: &str) -> Result<Download> {
        let dir = tempfile::Builder::new()
            .prefix("tubechord_")
            .tempdir()
            .context("failed to create temporary directory")?;
        let template = dir.path().join("audio.%(ext)s");
        let wav_path = dir.path().join("audio.wav");

        info!("downloading audio from {}", url);
        let output = Command::new(&self.program)
            .arg("-f")
            .arg("bestaudio/best")
            .arg("-x")
            .arg("--audio-format")
            .arg("wav")
            .arg("-o")
            .arg(&template)
            .args(["--quiet", "--no-warnings", url])
            .output()
            .with_context(|| format!("failed to run {}", self.program.display()))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        if !wav_path.exists() {
            bail!(
                "expected WAV file not found at '{}'. Ensure ffmpeg is installed and accessible in your PATH.",
                wav_path.display()
            );
        }

        Ok(Download {
            wav_path,
            _dir: dir,
        })
    }
}
