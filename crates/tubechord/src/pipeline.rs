//! The extract flow: source → pitch-energy matrix → chords → MIDI (+ extras).
//!
//! Each step is a plain function so the binary can report progress between
//! them and stop early when nothing is detected.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chord_analysis::{
    beats_to_ticks, seconds_to_beats, ChordDetector, ChordEvent, PitchEnergyMatrix, VoicedChord,
    Voicing,
};
use chord_midi::{midi_to_matrix, write_midi_file, ExportOptions, DEFAULT_HOP_DURATION};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sheet::{render_midi, SheetFormat};
use tracing::{debug, info};

use crate::audio::{self, ChromaOptions};
use crate::fetch::{Source, YtDlp, FALLBACK_TITLE};

/// Default output name when a title sanitises to nothing.
pub const FALLBACK_FILENAME: &str = "output.mid";

/// A pitch-energy matrix plus the spacing of its columns.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub matrix: PitchEnergyMatrix,
    pub hop_duration: f64,
}

impl LoadedSource {
    pub fn duration_seconds(&self) -> f64 {
        self.matrix.duration_seconds(self.hop_duration)
    }
}

/// Title for naming outputs: file stem for local sources, a yt-dlp lookup
/// for URLs, [`FALLBACK_TITLE`] when neither works.
pub fn resolve_title(source: &Source, ytdlp: &YtDlp) -> String {
    if let Some(title) = source.local_title() {
        return title;
    }
    match source {
        Source::Url(url) => ytdlp
            .title(url)
            .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        _ => FALLBACK_TITLE.to_string(),
    }
}

/// Whether an extract run uses the title at all: it names the default output
/// file and heads the chord report and the sheet.
pub fn needs_title(output: Option<&Path>, json: bool, sheet: bool) -> bool {
    output.is_none() || json || sheet
}

/// Turn a title into a safe `.mid` file name.
///
/// Characters other than word characters, whitespace and `-` are removed,
/// then each whitespace run becomes a single `_`.
pub fn output_filename(title: &str) -> Result<PathBuf> {
    let unsafe_chars = Regex::new(r"[^\w\s-]").context("invalid filename pattern")?;
    let whitespace = Regex::new(r"\s+").context("invalid whitespace pattern")?;

    let stripped = unsafe_chars.replace_all(title, "");
    let sanitized = whitespace.replace_all(stripped.trim(), "_");

    if sanitized.is_empty() {
        return Ok(PathBuf::from(FALLBACK_FILENAME));
    }
    Ok(PathBuf::from(format!("{}.mid", sanitized)))
}

/// Produce the pitch-energy matrix for any source.
///
/// URLs are downloaded first; the temporary WAV is gone once this returns.
pub fn load_source(source: &Source, chroma: &ChromaOptions, ytdlp: &YtDlp) -> Result<LoadedSource> {
    match source {
        Source::Url(url) => {
            let download = ytdlp
                .download(url)
                .with_context(|| format!("could not download audio from {}", url))?;
            load_wav(download.wav_path(), chroma)
        }
        Source::Wav(path) => load_wav(path, chroma),
        Source::Midi(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let matrix = midi_to_matrix(&bytes, DEFAULT_HOP_DURATION)
                .with_context(|| format!("failed to rasterise {}", path.display()))?;
            info!("rasterised {} into {} frames", path.display(), matrix.n_frames());
            Ok(LoadedSource {
                matrix,
                hop_duration: DEFAULT_HOP_DURATION,
            })
        }
    }
}

fn load_wav(path: &Path, chroma: &ChromaOptions) -> Result<LoadedSource> {
    let decoded = audio::read_wav(path)?;
    info!(
        "decoded {:.1}s of audio at {} Hz",
        decoded.duration_seconds(),
        decoded.sample_rate
    );
    let (matrix, hop_duration) = audio::chroma(&decoded, chroma)?;
    Ok(LoadedSource {
        matrix,
        hop_duration,
    })
}

/// Run chord detection on a loaded source.
pub fn detect(loaded: &LoadedSource, detector: &ChordDetector) -> Result<Vec<ChordEvent>> {
    let events = detector
        .analyze(&loaded.matrix, loaded.hop_duration)
        .context("chord detection failed")?;
    debug!("{} chord events", events.len());
    Ok(events)
}

/// One chord in the JSON dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEntry {
    pub name: String,
    pub start_time: f64,
    pub duration: f64,
    pub start_beat: f64,
    pub duration_beats: f64,
    pub start_tick: u64,
    pub primary_notes: Vec<i32>,
    pub secondary_notes: Vec<i32>,
}

/// Everything `--json` writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordReport {
    pub title: String,
    pub grade: u8,
    pub tempo_bpm: u32,
    pub ppq: u16,
    pub hop_duration: f64,
    pub chords: Vec<ChordEntry>,
}

impl ChordReport {
    pub fn new(title: &str, voicing: Voicing, hop_duration: f64, chords: &[VoicedChord], export: &ExportOptions) -> Self {
        let tempo = export.tempo_bpm as f64;
        let chords = chords
            .iter()
            .map(|chord| {
                let start_beat = seconds_to_beats(chord.event.start_time, tempo);
                ChordEntry {
                    name: chord.event.name(),
                    start_time: chord.event.start_time,
                    duration: chord.event.duration,
                    start_beat,
                    duration_beats: seconds_to_beats(chord.event.duration, tempo),
                    start_tick: beats_to_ticks(start_beat, export.ppq),
                    primary_notes: chord.primary_notes.clone(),
                    secondary_notes: chord.secondary_notes.clone(),
                }
            })
            .collect();

        Self {
            title: title.to_string(),
            grade: voicing.grade(),
            tempo_bpm: export.tempo_bpm,
            ppq: export.ppq,
            hop_duration,
            chords,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialise chord report")?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote chord report to {}", path.display());
        Ok(())
    }
}

/// Write voiced chords as MIDI.
pub fn export_midi(path: &Path, chords: &[VoicedChord], export: &ExportOptions) -> Result<()> {
    write_midi_file(path, chords, export).context("could not write MIDI file")?;
    info!("wrote {} chords to {}", chords.len(), path.display());
    Ok(())
}

/// Path of the sheet that accompanies `midi_path` in `format`.
pub fn sheet_path_for(midi_path: &Path, format: SheetFormat) -> PathBuf {
    let extension = format.renderer().default_extension();
    midi_path.with_extension(extension.trim_start_matches('.'))
}

/// Render a MIDI file on disk to sheet music.
pub fn render_sheet(midi_path: &Path, output: &Path, title: &str, format: SheetFormat) -> Result<()> {
    let bytes = std::fs::read(midi_path)
        .with_context(|| format!("failed to read {}", midi_path.display()))?;
    let text = render_midi(&bytes, title, format)
        .with_context(|| format!("failed to render {}", midi_path.display()))?;
    std::fs::write(output, text).with_context(|| format!("failed to write {}", output.display()))?;
    info!("wrote {} sheet to {}", format, output.display());
    Ok(())
}

/// Text bar proportional to a chord's length, four marks per second.
pub fn duration_bar(duration: f64) -> String {
    "=".repeat((duration * 4.0).max(0.0) as usize)
}
