//! Chord detection and graded voicing for beginner piano arrangements.
//!
//! The pipeline turns a 12 × N pitch-energy matrix (one row per pitch class,
//! one column per analysis frame) into a time-ordered list of major/minor
//! [`ChordEvent`]s, then maps each event onto concrete MIDI pitches with a
//! [`Voicing`] grade.
//!
//! # Example
//!
//! ```
//! use chord_analysis::{analyze, PitchEnergyMatrix, Voicing};
//!
//! // Two seconds of a C major triad at 0.5 s per frame.
//! let mut frame = [0.0_f32; 12];
//! frame[0] = 1.0;
//! frame[4] = 0.8;
//! frame[7] = 0.6;
//! let matrix = PitchEnergyMatrix::from_frames(vec![frame; 4]).unwrap();
//!
//! let events = analyze(&matrix, 0.5, 0.5, 1).unwrap();
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].name(), "C");
//!
//! let voiced = Voicing::Grade2.voice(&events[0]);
//! assert_eq!(voiced.primary_notes, vec![60, 64, 67]);
//! assert_eq!(voiced.secondary_notes, vec![48]);
//! ```
//!
//! All timing is kept in seconds. Conversion to beats happens at the export
//! boundary so that the analysis stays tempo independent.

pub mod detector;
pub mod matrix;
pub mod pitch;
pub mod smoothing;
pub mod types;
pub mod voicing;

pub use detector::{analyze, classify_frame, ChordDetector, DetectorConfig, FrameRun};
pub use matrix::{ChromaFrame, PitchEnergyMatrix, PITCH_CLASSES};
pub use pitch::{beats_to_ticks, pitch_class_to_absolute, seconds_to_beats, PitchClass};
pub use types::{ChordEvent, ChordQuality, VoicedChord};
pub use voicing::{Voicing, MAX_GRADE};

/// Errors from chord analysis.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed pitch-energy matrix: {0}")]
    Shape(String),
}

pub type Result<T> = std::result::Result<T, Error>;
