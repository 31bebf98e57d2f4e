//! Pitch-class and timing helpers shared by detection, voicing and export.

use serde::{Deserialize, Serialize};

pub const SEMITONES_PER_OCTAVE: i32 = 12;

const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One of the 12 chromatic pitch classes, C = 0 through B = 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PitchClass(u8);

impl PitchClass {
    pub const C: PitchClass = PitchClass(0);

    /// Returns `None` unless `value` is in 0..12.
    pub fn new(value: u8) -> Option<Self> {
        (value < 12).then_some(Self(value))
    }

    /// Pitch class of an index, wrapping modulo 12.
    pub fn wrapping(index: usize) -> Self {
        Self((index % 12) as u8)
    }

    /// Pitch class of a MIDI note number.
    pub fn from_midi(pitch: u8) -> Self {
        Self(pitch % 12)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Pitch class `semitones` above this one.
    pub fn up(self, semitones: u8) -> Self {
        Self::wrapping(self.index() + semitones as usize)
    }

    /// Sharp spelling: "C", "C#", ..., "B".
    pub fn name(self) -> &'static str {
        NOTE_NAMES_SHARP[self.index()]
    }
}

impl TryFrom<u8> for PitchClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PitchClass::new(value).ok_or_else(|| format!("pitch class out of range: {}", value))
    }
}

impl From<PitchClass> for u8 {
    fn from(pc: PitchClass) -> u8 {
        pc.0
    }
}

impl std::fmt::Display for PitchClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Absolute (MIDI-style) pitch of a pitch class in a scientific octave.
///
/// Octave 4 starts at middle C, so `(C, 4)` is 60 and `(A, 4)` is 69.
pub fn pitch_class_to_absolute(pitch_class: PitchClass, octave: i32) -> i32 {
    (octave + 1) * SEMITONES_PER_OCTAVE + pitch_class.value() as i32
}

/// Convert seconds to beats at a fixed tempo.
pub fn seconds_to_beats(seconds: f64, tempo_bpm: f64) -> f64 {
    seconds * (tempo_bpm / 60.0)
}

/// Convert beats to ticks, rounding to the nearest tick.
pub fn beats_to_ticks(beats: f64, ppq: u16) -> u64 {
    (beats * ppq as f64).round().max(0.0) as u64
}
