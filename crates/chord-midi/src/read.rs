use std::collections::HashMap;

use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use serde::{Deserialize, Serialize};

use crate::note::TimedNote;
use crate::{Error, Result};

/// 120 BPM, the SMF default when a file carries no tempo event.
pub const DEFAULT_MICROSECONDS_PER_BEAT: u32 = 500_000;

/// Parsed MIDI file context: timing, tempo map and track names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiFileContext {
    pub ppq: u16,
    pub tempo_changes: Vec<TempoChange>,
    pub total_ticks: u64,
    /// Track name meta event per track, if present
    pub track_names: Vec<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: u64,
    pub microseconds_per_beat: u32,
    pub bpm: f64,
}

impl MidiFileContext {
    /// Absolute time of a tick, honouring every tempo change before it.
    pub fn tick_to_seconds(&self, tick: u64) -> f64 {
        let ppq = self.ppq.max(1) as f64;
        let mut seconds = 0.0;
        let mut last_tick = 0u64;
        let mut usec_per_beat = DEFAULT_MICROSECONDS_PER_BEAT;

        for change in self.tempo_changes.iter().take_while(|c| c.tick <= tick) {
            seconds += (change.tick - last_tick) as f64 / ppq * usec_per_beat as f64 / 1e6;
            last_tick = change.tick;
            usec_per_beat = change.microseconds_per_beat;
        }

        seconds + (tick - last_tick) as f64 / ppq * usec_per_beat as f64 / 1e6
    }

    /// Tempo in effect at the start of the file.
    pub fn initial_bpm(&self) -> f64 {
        self.tempo_changes
            .iter()
            .find(|c| c.tick == 0)
            .map(|c| c.bpm)
            .unwrap_or(60_000_000.0 / DEFAULT_MICROSECONDS_PER_BEAT as f64)
    }

    pub fn total_beats(&self) -> f64 {
        self.total_ticks as f64 / self.ppq.max(1) as f64
    }
}

/// Parse SMF bytes and extract every note.
pub fn parse(midi_bytes: &[u8]) -> Result<(Vec<TimedNote>, MidiFileContext)> {
    let smf = Smf::parse(midi_bytes).map_err(|e| Error::MidiParse(e.to_string()))?;
    Ok(extract_notes(&smf))
}

/// Extract all notes from a parsed file, pairing note-on/note-off events.
///
/// A note-on with velocity 0 counts as a note-off. Overlapping notes on the
/// same channel and key close last-in-first-out, and notes still open at the
/// end of a track close on its final tick.
pub fn extract_notes(smf: &Smf) -> (Vec<TimedNote>, MidiFileContext) {
    let ppq = match smf.header.timing {
        midly::Timing::Metrical(ticks) => ticks.as_int(),
        midly::Timing::Timecode(_, _) => 480,
    };

    let mut all_notes = Vec::new();
    let mut tempo_changes = Vec::new();
    let mut track_names = Vec::with_capacity(smf.tracks.len());
    let mut total_ticks: u64 = 0;

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut current_tick: u64 = 0;
        let mut name = None;
        // (channel, pitch) → stack of (onset_tick, velocity)
        let mut pending: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();

        for event in track {
            current_tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                    name = String::from_utf8(bytes.to_vec()).ok();
                }
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    let usec = tempo.as_int();
                    tempo_changes.push(TempoChange {
                        tick: current_tick,
                        microseconds_per_beat: usec,
                        bpm: 60_000_000.0 / usec as f64,
                    });
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            pending
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push((current_tick, vel.as_int()));
                        }
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            let key = (ch, key.as_int());
                            if let Some((onset, velocity)) =
                                pending.get_mut(&key).and_then(|stack| stack.pop())
                            {
                                all_notes.push(TimedNote {
                                    onset_tick: onset,
                                    offset_tick: current_tick,
                                    pitch: key.1,
                                    velocity,
                                    channel: ch,
                                    track_index,
                                });
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }

            total_ticks = total_ticks.max(current_tick);
        }

        for ((channel, pitch), stack) in pending {
            for (onset, velocity) in stack {
                all_notes.push(TimedNote {
                    onset_tick: onset,
                    offset_tick: current_tick,
                    pitch,
                    velocity,
                    channel,
                    track_index,
                });
            }
        }

        track_names.push(name);
    }

    // Sort by onset, then pitch for determinism
    all_notes.sort_by(|a, b| {
        a.onset_tick
            .cmp(&b.onset_tick)
            .then(a.pitch.cmp(&b.pitch))
            .then(a.track_index.cmp(&b.track_index))
    });

    // Format 1 files may repeat the tempo map on several tracks
    tempo_changes.sort_by_key(|t| t.tick);
    tempo_changes.dedup_by(|a, b| a.tick == b.tick);

    let context = MidiFileContext {
        ppq,
        tempo_changes,
        total_ticks,
        track_names,
    };

    (all_notes, context)
}
