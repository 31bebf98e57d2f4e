//! tubechord - beginner piano chord charts from recordings
//!
//! - [`fetch`] resolves a source (URL, WAV or MIDI) and downloads audio via yt-dlp
//! - [`audio`] decodes WAV and computes the chromagram
//! - [`pipeline`] strings detection, voicing and export together for the CLI

pub mod audio;
pub mod fetch;
pub mod pipeline;

pub use audio::{chroma, decode_wav, read_wav, ChromaOptions, DecodedAudio};
pub use fetch::{Download, Source, YtDlp};
pub use pipeline::{
    detect, load_source, needs_title, output_filename, render_sheet, resolve_title, sheet_path_for,
    ChordReport, LoadedSource,
};
