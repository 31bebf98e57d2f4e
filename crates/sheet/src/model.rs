use chord_analysis::PitchClass;
use serde::{Deserialize, Serialize};

/// Rest placeholder key on the treble staff (middle line).
pub const TREBLE_REST_KEY: &str = "b/4";
/// Rest placeholder key on the bass staff (middle line).
pub const BASS_REST_KEY: &str = "d/3";

/// Renderer-neutral score: a grand staff of equal-length measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDocument {
    pub title: String,
    pub time_signature: String,
    pub beats: u32,
    pub beat_value: u32,
    pub measures: Vec<Measure>,
}

impl ScoreDocument {
    /// Empty 4/4 score.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            time_signature: "4/4".to_string(),
            beats: 4,
            beat_value: 4,
            measures: Vec::new(),
        }
    }

    /// Whether any measure puts a note (not just rests) on the bass staff.
    pub fn has_bass_notes(&self) -> bool {
        self.measures
            .iter()
            .any(|m| m.bass.iter().any(|n| !n.is_rest()))
    }
}

/// One measure of both staves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub treble: Vec<StaffNote>,
    pub bass: Vec<StaffNote>,
}

/// A note, chord or rest on one staff, keyed the way VexFlow keys notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffNote {
    /// `"c#/4"` style keys, lowest first
    pub keys: Vec<String>,
    /// `"q"`, `"h"`, `"hd"`, `"w"`, with a trailing `r` for rests
    pub duration: String,
    /// Accidental per key, aligned with `keys`
    pub accidentals: Vec<Option<String>>,
}

/// Staff a note sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clef {
    Treble,
    Bass,
}

impl Clef {
    pub fn rest_key(self) -> &'static str {
        match self {
            Clef::Treble => TREBLE_REST_KEY,
            Clef::Bass => BASS_REST_KEY,
        }
    }
}

/// Duration token for a span of quarter-note beats. Spans outside 1..=4 have
/// no single token.
pub fn duration_token(beats: u32) -> Option<&'static str> {
    match beats {
        1 => Some("q"),
        2 => Some("h"),
        3 => Some("hd"),
        4 => Some("w"),
        _ => None,
    }
}

/// Number of quarter-note beats a duration token covers, rests included.
pub fn token_beats(duration: &str) -> Option<u32> {
    match duration.strip_suffix('r').unwrap_or(duration) {
        "q" => Some(1),
        "h" => Some(2),
        "hd" => Some(3),
        "w" => Some(4),
        _ => None,
    }
}

/// Sharp-spelled key for a MIDI pitch: 61 is `("c#/4", Some("#"))`.
pub fn pitch_key(pitch: u8) -> (String, Option<String>) {
    let name = PitchClass::from_midi(pitch).name();
    let octave = pitch as i32 / 12 - 1;
    let accidental = name.contains('#').then(|| "#".to_string());
    (format!("{}/{}", name.to_lowercase(), octave), accidental)
}

impl StaffNote {
    /// A chord (or single note) from MIDI pitches.
    pub fn chord(pitches: &[u8], beats: u32) -> Self {
        let mut sorted = pitches.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let (keys, accidentals): (Vec<_>, Vec<_>) = sorted.into_iter().map(pitch_key).unzip();
        Self {
            keys,
            duration: duration_token(beats).unwrap_or("q").to_string(),
            accidentals,
        }
    }

    pub fn rest(clef: Clef, beats: u32) -> Self {
        Self {
            keys: vec![clef.rest_key().to_string()],
            duration: format!("{}r", duration_token(beats).unwrap_or("q")),
            accidentals: vec![None],
        }
    }

    pub fn is_rest(&self) -> bool {
        self.duration.ends_with('r')
    }

    pub fn beats(&self) -> u32 {
        token_beats(&self.duration).unwrap_or(1)
    }
}
