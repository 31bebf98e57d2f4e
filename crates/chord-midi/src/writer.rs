use std::path::Path;

use chord_analysis::{beats_to_ticks, seconds_to_beats, VoicedChord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

pub const RIGHT_HAND_TRACK_NAME: &str = "Right Hand (Chords)";
pub const LEFT_HAND_TRACK_NAME: &str = "Left Hand (Bass)";

pub const RIGHT_HAND_CHANNEL: u8 = 0;
pub const LEFT_HAND_CHANNEL: u8 = 1;

pub const DEFAULT_TEMPO_BPM: u32 = 80;
pub const DEFAULT_VELOCITY: u8 = 80;
pub const DEFAULT_BASS_VELOCITY: u8 = 68;
pub const DEFAULT_PPQ: u16 = 480;

pub const MIN_TEMPO_BPM: u32 = 20;
pub const MAX_TEMPO_BPM: u32 = 300;

/// Acoustic grand piano.
const PIANO_PROGRAM: u8 = 0;

/// Options for MIDI export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Playback tempo. Default: 80 BPM.
    pub tempo_bpm: u32,
    /// Right-hand note-on velocity. Default: 80.
    pub velocity: u8,
    /// Left-hand note-on velocity. Default: 68.
    pub bass_velocity: u8,
    /// Ticks per quarter note. Default: 480.
    pub ppq: u16,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            velocity: DEFAULT_VELOCITY,
            bass_velocity: DEFAULT_BASS_VELOCITY,
            ppq: DEFAULT_PPQ,
        }
    }
}

impl ExportOptions {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&self.tempo_bpm) {
            return Err(Error::InvalidArgument(format!(
                "tempo must be between {} and {} BPM, got {}",
                MIN_TEMPO_BPM, MAX_TEMPO_BPM, self.tempo_bpm
            )));
        }
        for (label, velocity) in [("velocity", self.velocity), ("bass_velocity", self.bass_velocity)] {
            if !(1..=127).contains(&velocity) {
                return Err(Error::InvalidArgument(format!(
                    "{} must be between 1 and 127, got {}",
                    label, velocity
                )));
            }
        }
        if self.ppq == 0 {
            return Err(Error::InvalidArgument("ppq must be positive".into()));
        }
        Ok(())
    }

    fn microseconds_per_beat(&self) -> u32 {
        60_000_000 / self.tempo_bpm
    }
}

/// A note already placed on the tick grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlacedNote {
    start: u64,
    end: u64,
    pitch: u8,
}

/// Write voiced chords to Standard MIDI File format 1 bytes.
///
/// Track 0: conductor (tempo + 4/4, never notes).
/// Track 1: right hand, primary notes on channel 0.
/// Track 2: left hand, secondary notes on channel 1. Empty for grade 1.
pub fn voiced_chords_to_midi(chords: &[VoicedChord], options: &ExportOptions) -> Result<Vec<u8>> {
    options.validate()?;

    let mut right_hand = Vec::new();
    let mut left_hand = Vec::new();

    for chord in chords {
        let (start, end) = chord_ticks(chord, options);
        for &pitch in &chord.primary_notes {
            right_hand.push(PlacedNote { start, end, pitch: midi_pitch(pitch)? });
        }
        for &pitch in &chord.secondary_notes {
            left_hand.push(PlacedNote { start, end, pitch: midi_pitch(pitch)? });
        }
    }

    let tracks = vec![
        build_conductor_track(options),
        build_hand_track(RIGHT_HAND_TRACK_NAME, RIGHT_HAND_CHANNEL, options.velocity, &right_hand),
        build_hand_track(LEFT_HAND_TRACK_NAME, LEFT_HAND_CHANNEL, options.bass_velocity, &left_hand),
    ];

    debug!(
        chords = chords.len(),
        right_hand_notes = right_hand.len(),
        left_hand_notes = left_hand.len(),
        tempo = options.tempo_bpm,
        "rendered MIDI"
    );

    Ok(build_midi_file(options.ppq, &tracks))
}

/// Render voiced chords and write them to `path`.
pub fn write_midi_file(path: &Path, chords: &[VoicedChord], options: &ExportOptions) -> Result<()> {
    let bytes = voiced_chords_to_midi(chords, options)?;
    std::fs::write(path, bytes).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Start and end tick of a chord. Every note lasts at least one tick.
fn chord_ticks(chord: &VoicedChord, options: &ExportOptions) -> (u64, u64) {
    let bpm = options.tempo_bpm as f64;
    let start = beats_to_ticks(seconds_to_beats(chord.event.start_time, bpm), options.ppq);
    let end = beats_to_ticks(seconds_to_beats(chord.event.end_time(), bpm), options.ppq);
    (start, end.max(start + 1))
}

fn midi_pitch(pitch: i32) -> Result<u8> {
    u8::try_from(pitch)
        .ok()
        .filter(|p| *p <= 127)
        .ok_or_else(|| Error::InvalidArgument(format!("pitch {} is outside MIDI range 0..=127", pitch)))
}

fn build_conductor_track(options: &ExportOptions) -> Vec<u8> {
    let usec = options.microseconds_per_beat();
    let events = vec![
        (0, vec![0xFF, 0x51, 0x03, (usec >> 16) as u8, (usec >> 8) as u8, usec as u8]),
        // 4/4, 24 clocks per click, 8 32nds per quarter
        (0, vec![0xFF, 0x58, 0x04, 4, 2, 0x18, 0x08]),
    ];
    encode_track(events)
}

fn build_hand_track(name: &str, channel: u8, velocity: u8, notes: &[PlacedNote]) -> Vec<u8> {
    let mut events: Vec<(u64, Vec<u8>)> = Vec::with_capacity(notes.len() * 2 + 2);

    let mut name_event = vec![0xFF, 0x03];
    write_vlq(&mut name_event, name.len() as u32);
    name_event.extend_from_slice(name.as_bytes());
    events.push((0, name_event));

    if !notes.is_empty() {
        events.push((0, vec![0xC0 | (channel & 0x0F), PIANO_PROGRAM]));
    }

    for note in notes {
        events.push((note.start, vec![0x90 | (channel & 0x0F), note.pitch, velocity]));
        events.push((note.end, vec![0x80 | (channel & 0x0F), note.pitch, 0]));
    }

    // Sort by tick, with note-offs before note-ons at the same tick. The sort
    // is stable so meta and program events keep their leading position.
    events.sort_by(|a, b| {
        a.0.cmp(&b.0).then_with(|| {
            let a_is_off = a.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            let b_is_off = b.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            b_is_off.cmp(&a_is_off)
        })
    });

    encode_track(events)
}

/// Delta-encode sorted events and append end of track.
fn encode_track(events: Vec<(u64, Vec<u8>)>) -> Vec<u8> {
    let mut track_data = Vec::new();
    let mut last_tick = 0u64;

    for (tick, data) in events {
        let delta = tick.saturating_sub(last_tick);
        write_vlq(&mut track_data, delta as u32);
        track_data.extend_from_slice(&data);
        last_tick = tick;
    }

    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    track_data
}

/// Assemble a complete format 1 file from track data blobs.
fn build_midi_file(ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ppq.to_be_bytes());

    for track_data in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buf.extend_from_slice(track_data);
    }

    buf
}

/// Write a variable-length quantity to a byte buffer.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buf.extend_from_slice(&bytes);
}
