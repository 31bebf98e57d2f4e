//! MIDI on both sides of the chord pipeline.
//!
//! - [`writer`] turns voiced chords into a two-hand Standard MIDI File.
//! - [`read`] pairs note-on/note-off events into [`TimedNote`]s with a tempo map.
//! - [`raster`] turns notes back into a pitch-energy matrix so an existing
//!   performance can be fed through the same chord detector as audio.

pub mod note;
pub mod raster;
pub mod read;
pub mod writer;

pub use note::TimedNote;
pub use raster::{midi_to_matrix, notes_to_matrix, DEFAULT_HOP_DURATION};
pub use read::{extract_notes, parse, MidiFileContext, TempoChange};
pub use writer::{voiced_chords_to_midi, write_midi_file, ExportOptions};

/// Errors from MIDI import and export.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
