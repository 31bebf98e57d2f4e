//! Rasterise MIDI notes into a pitch-energy matrix.

use chord_analysis::{PitchClass, PitchEnergyMatrix};
use tracing::debug;

use crate::note::TimedNote;
use crate::read::{parse, MidiFileContext};
use crate::{Error, Result};

/// Frame length matching a 512-sample hop at 22.05 kHz.
pub const DEFAULT_HOP_DURATION: f64 = 512.0 / 22050.0;

/// Parse SMF bytes and rasterise every pitched note.
pub fn midi_to_matrix(midi_bytes: &[u8], hop_duration: f64) -> Result<PitchEnergyMatrix> {
    let (notes, context) = parse(midi_bytes)?;
    notes_to_matrix(&notes, &context, hop_duration)
}

/// Accumulate `velocity / 127` into the pitch class of each sounding note,
/// for every frame whose centre falls inside the note. Percussion is skipped.
/// Frames are max-normalised afterwards.
pub fn notes_to_matrix(
    notes: &[TimedNote],
    context: &MidiFileContext,
    hop_duration: f64,
) -> Result<PitchEnergyMatrix> {
    if !hop_duration.is_finite() || hop_duration <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "hop_duration must be positive, got {}",
            hop_duration
        )));
    }

    let last_tick = notes
        .iter()
        .map(|n| n.offset_tick)
        .max()
        .unwrap_or(0)
        .max(context.total_ticks);
    let total_seconds = context.tick_to_seconds(last_tick);
    let n_frames = (total_seconds / hop_duration).ceil() as usize;

    let mut matrix = PitchEnergyMatrix::zeros(n_frames);
    let frames = matrix.frames_mut();
    let mut skipped = 0usize;

    for note in notes {
        if note.is_percussion() {
            skipped += 1;
            continue;
        }

        let onset = context.tick_to_seconds(note.onset_tick);
        let offset = context.tick_to_seconds(note.offset_tick);
        let energy = note.velocity as f32 / 127.0;
        let pc = PitchClass::from_midi(note.pitch).index();

        let first = ((onset / hop_duration - 0.5).ceil().max(0.0)) as usize;
        for (index, frame) in frames.iter_mut().enumerate().skip(first) {
            let centre = (index as f64 + 0.5) * hop_duration;
            if centre >= offset {
                break;
            }
            if centre >= onset {
                frame[pc] += energy;
            }
        }
    }

    matrix.normalize_frames();

    debug!(
        notes = notes.len(),
        percussion_skipped = skipped,
        frames = n_frames,
        seconds = total_seconds,
        "rasterised MIDI notes"
    );

    Ok(matrix)
}
