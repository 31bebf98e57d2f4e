//! Graded piano voicings for detected chords.
//!
//! Every chord is a root-position triad voiced on its own, with no voice
//! leading between neighbours.
//!
//! | grade | right hand                 | left hand             |
//! |-------|----------------------------|-----------------------|
//! | 1     | triad from the C4 octave   | none                  |
//! | 2     | triad from the C4 octave   | root one octave lower |

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pitch::{pitch_class_to_absolute, SEMITONES_PER_OCTAVE};
use crate::types::{ChordEvent, ChordQuality, VoicedChord};
use crate::{Error, Result};

/// Highest grade accepted on the command line (ABRSM scale).
pub const MAX_GRADE: u8 = 8;

/// Octave of the right-hand triad root: C4 = 60 through B4 = 71.
pub const PRIMARY_OCTAVE: i32 = 4;

const MAJOR_INTERVALS: [i32; 3] = [0, 4, 7];
const MINOR_INTERVALS: [i32; 3] = [0, 3, 7];

/// Semitone offsets of a root-position triad.
pub fn triad_intervals(quality: ChordQuality) -> &'static [i32; 3] {
    match quality {
        ChordQuality::Major => &MAJOR_INTERVALS,
        ChordQuality::Minor => &MINOR_INTERVALS,
    }
}

/// Difficulty tier deciding how a chord is split between the hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voicing {
    /// Right-hand triads only.
    #[default]
    Grade1,
    /// Right-hand triads over a single left-hand root.
    Grade2,
}

impl Voicing {
    /// Pick the voicing for a requested grade.
    ///
    /// Grades 2 through [`MAX_GRADE`] all share the grade 2 voicing; there is
    /// no harder material yet.
    pub fn for_grade(grade: u8) -> Result<Self> {
        match grade {
            1 => Ok(Voicing::Grade1),
            2 => Ok(Voicing::Grade2),
            3..=MAX_GRADE => {
                info!(grade, "no dedicated voicing for this grade, using grade 2");
                Ok(Voicing::Grade2)
            }
            _ => Err(Error::InvalidArgument(format!(
                "grade must be between 1 and {}, got {}",
                MAX_GRADE, grade
            ))),
        }
    }

    pub fn grade(&self) -> u8 {
        match self {
            Voicing::Grade1 => 1,
            Voicing::Grade2 => 2,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Voicing::Grade1 => "right-hand triads (middle C octave)",
            Voicing::Grade2 => "right-hand triads + left-hand root an octave lower",
        }
    }

    /// Assign concrete pitches to one chord event.
    pub fn voice(&self, event: &ChordEvent) -> VoicedChord {
        let root = pitch_class_to_absolute(event.root, PRIMARY_OCTAVE);
        let primary_notes = triad_intervals(event.quality)
            .iter()
            .map(|interval| root + interval)
            .collect();

        let secondary_notes = match self {
            Voicing::Grade1 => Vec::new(),
            Voicing::Grade2 => vec![root - SEMITONES_PER_OCTAVE],
        };

        VoicedChord {
            event: *event,
            primary_notes,
            secondary_notes,
        }
    }

    pub fn voice_all(&self, events: &[ChordEvent]) -> Vec<VoicedChord> {
        events.iter().map(|event| self.voice(event)).collect()
    }
}
