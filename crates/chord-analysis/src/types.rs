use serde::{Deserialize, Serialize};

use crate::pitch::PitchClass;

/// Triad quality recognised by the detector.
///
/// Only the third above the root is inspected, so diminished, augmented and
/// suspended sonorities fold into one of these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
}

impl ChordQuality {
    /// Suffix for chord symbol display
    pub fn suffix(&self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
        }
    }
}

impl std::fmt::Display for ChordQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChordQuality::Major => write!(f, "major"),
            ChordQuality::Minor => write!(f, "minor"),
        }
    }
}

/// A detected chord occupying `[start_time, start_time + duration)` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    pub root: PitchClass,
    pub quality: ChordQuality,
    /// Seconds from the start of the analysed signal
    pub start_time: f64,
    /// Seconds, always positive
    pub duration: f64,
}

impl ChordEvent {
    /// Chord symbol: "Am", "G", "F#".
    pub fn name(&self) -> String {
        format!("{}{}", self.root.name(), self.quality.suffix())
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// A chord event with concrete pitches for each hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicedChord {
    pub event: ChordEvent,
    /// Right hand, lowest pitch first
    pub primary_notes: Vec<i32>,
    /// Left hand; empty when the grade has no bass part
    pub secondary_notes: Vec<i32>,
}
