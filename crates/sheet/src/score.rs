//! Quantise MIDI notes onto a quarter-note grand-staff grid.

use std::collections::{BTreeMap, BTreeSet};

use chord_midi::{MidiFileContext, TimedNote};
use tracing::debug;

use crate::model::{Clef, Measure, ScoreDocument, StaffNote};
use crate::Result;

/// Tracks averaging below middle C go to the bass staff.
const BASS_MEAN_PITCH: f64 = 60.0;

/// Parse SMF bytes into a grand-staff score.
pub fn score_from_midi(midi_bytes: &[u8], title: &str) -> Result<ScoreDocument> {
    let (notes, context) = chord_midi::parse(midi_bytes)?;
    Ok(score_from_notes(&notes, &context, title))
}

/// Lay pitched notes out as 4/4 measures of quarter-note beats.
///
/// Each track goes wholesale to one staff. Within a staff, the pitches
/// sounding during a beat form one chord; a beat with the same pitches as the
/// previous one and no fresh onset extends it instead.
pub fn score_from_notes(notes: &[TimedNote], context: &MidiFileContext, title: &str) -> ScoreDocument {
    let mut score = ScoreDocument::new(title);
    let ppq = context.ppq.max(1) as u64;
    let beats_per_measure = score.beats as usize;

    let pitched: Vec<&TimedNote> = notes.iter().filter(|n| !n.is_percussion()).collect();
    let Some(last_offset) = pitched.iter().map(|n| n.offset_tick).max() else {
        return score;
    };

    let clefs = classify_tracks(&pitched, context);
    let (treble, bass): (Vec<&TimedNote>, Vec<&TimedNote>) = pitched
        .iter()
        .copied()
        .partition(|n| clefs.get(&n.track_index) != Some(&Clef::Bass));

    let total_beats = last_offset.div_ceil(ppq) as usize;
    let n_measures = total_beats.div_ceil(beats_per_measure);
    let grid_beats = n_measures * beats_per_measure;

    let treble_slots = beat_slots(&treble, ppq, grid_beats);
    let bass_slots = beat_slots(&bass, ppq, grid_beats);

    for m in 0..n_measures {
        let span = m * beats_per_measure..(m + 1) * beats_per_measure;
        score.measures.push(Measure {
            treble: merge_beats(&treble_slots[span.clone()], Clef::Treble),
            bass: merge_beats(&bass_slots[span], Clef::Bass),
        });
    }

    debug!(
        notes = pitched.len(),
        treble_notes = treble.len(),
        bass_notes = bass.len(),
        measures = n_measures,
        "built score"
    );

    score
}

/// Pick a staff for every track that has notes.
///
/// A track named like a left-hand part, or whose mean pitch is below middle C,
/// is bass. Everything else is treble.
fn classify_tracks(notes: &[&TimedNote], context: &MidiFileContext) -> BTreeMap<usize, Clef> {
    let mut pitch_sums: BTreeMap<usize, (u64, u64)> = BTreeMap::new();
    for note in notes {
        let entry = pitch_sums.entry(note.track_index).or_default();
        entry.0 += note.pitch as u64;
        entry.1 += 1;
    }

    pitch_sums
        .into_iter()
        .map(|(track, (sum, count))| {
            let named_left = context
                .track_names
                .get(track)
                .and_then(|n| n.as_deref())
                .is_some_and(|n| n.contains("Left"));
            let mean = sum as f64 / count as f64;
            let clef = if named_left || mean < BASS_MEAN_PITCH {
                Clef::Bass
            } else {
                Clef::Treble
            };
            (track, clef)
        })
        .collect()
}

/// What one staff does during one beat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BeatSlot {
    pitches: BTreeSet<u8>,
    /// A note starts inside this beat
    onset: bool,
}

fn beat_slots(notes: &[&TimedNote], ppq: u64, grid_beats: usize) -> Vec<BeatSlot> {
    let mut slots = vec![BeatSlot::default(); grid_beats];

    for note in notes {
        if note.offset_tick <= note.onset_tick {
            continue;
        }
        let first = (note.onset_tick / ppq) as usize;
        let last = ((note.offset_tick - 1) / ppq) as usize;
        for slot in slots.iter_mut().take(last + 1).skip(first) {
            slot.pitches.insert(note.pitch);
        }
        if let Some(slot) = slots.get_mut(first) {
            slot.onset = true;
        }
    }

    slots
}

/// Collapse one measure of beat slots into staff notes.
fn merge_beats(slots: &[BeatSlot], clef: Clef) -> Vec<StaffNote> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < slots.len() {
        let mut len = 1;
        while i + len < slots.len()
            && slots[i + len].pitches == slots[i].pitches
            && !slots[i + len].onset
        {
            len += 1;
        }

        let beats = len as u32;
        let note = if slots[i].pitches.is_empty() {
            StaffNote::rest(clef, beats)
        } else {
            let pitches: Vec<u8> = slots[i].pitches.iter().copied().collect();
            StaffNote::chord(&pitches, beats)
        };
        out.push(note);
        i += len;
    }

    out
}
