use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matrix::{ChromaFrame, PitchEnergyMatrix};
use crate::pitch::PitchClass;
use crate::smoothing::smooth;
use crate::types::{ChordEvent, ChordQuality};
use crate::{Error, Result};

/// Semitones above the root for a minor third.
pub const MINOR_THIRD: u8 = 3;
/// Semitones above the root for a major third.
pub const MAJOR_THIRD: u8 = 4;

pub const DEFAULT_MIN_CHORD_DURATION: f64 = 0.5;
pub const DEFAULT_SMOOTHING_WINDOW: usize = 9;

/// Tuning knobs for chord detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Runs shorter than this many seconds are dropped as noise
    pub min_chord_duration: f64,
    /// Box-filter width in frames; larger is steadier but blurs fast changes
    pub smoothing_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_chord_duration: DEFAULT_MIN_CHORD_DURATION,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_chord_duration.is_finite() || self.min_chord_duration < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "min_chord_duration must be a non-negative number of seconds, got {}",
                self.min_chord_duration
            )));
        }
        if self.smoothing_window == 0 {
            return Err(Error::InvalidArgument(
                "smoothing_window must be at least 1 frame".into(),
            ));
        }
        Ok(())
    }
}

/// Maximal stretch of consecutive frames sharing one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRun {
    pub root: PitchClass,
    pub quality: ChordQuality,
    /// First frame of the run
    pub start_frame: usize,
    /// One past the last frame of the run
    pub end_frame: usize,
}

impl FrameRun {
    pub fn len(&self) -> usize {
        self.end_frame - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.end_frame == self.start_frame
    }
}

/// Chroma-driven major/minor chord detector.
#[derive(Debug, Clone, Default)]
pub struct ChordDetector {
    config: DetectorConfig,
}

impl ChordDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect chord events in `matrix`, whose columns are `hop_duration`
    /// seconds apart.
    ///
    /// 1. Each pitch-class row is box filtered to suppress one-frame spikes.
    /// 2. Every smoothed frame is classified by [`classify_frame`].
    /// 3. Consecutive frames with the same classification merge into runs.
    /// 4. Runs shorter than `min_chord_duration` are dropped outright; they
    ///    do not lengthen or shift their neighbours.
    ///
    /// The result is ordered by start time and never overlaps.
    pub fn analyze(&self, matrix: &PitchEnergyMatrix, hop_duration: f64) -> Result<Vec<ChordEvent>> {
        self.config.validate()?;
        if !hop_duration.is_finite() || hop_duration <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "hop_duration must be positive, got {}",
                hop_duration
            )));
        }

        if matrix.is_empty() {
            return Ok(Vec::new());
        }

        let smoothed = smooth(matrix, self.config.smoothing_window);
        let labels: Vec<_> = smoothed.frames().iter().map(classify_frame).collect();
        let runs = group_runs(&labels);
        let events = runs_to_events(&runs, hop_duration, self.config.min_chord_duration);

        debug!(
            frames = matrix.n_frames(),
            runs = runs.len(),
            events = events.len(),
            "chord detection complete"
        );

        Ok(events)
    }
}

/// Detect chord events with explicit parameters.
///
/// Shorthand for [`ChordDetector::analyze`] with a one-off [`DetectorConfig`].
pub fn analyze(
    matrix: &PitchEnergyMatrix,
    hop_duration: f64,
    min_chord_duration: f64,
    smoothing_window: usize,
) -> Result<Vec<ChordEvent>> {
    ChordDetector::new(DetectorConfig {
        min_chord_duration,
        smoothing_window,
    })
    .analyze(matrix, hop_duration)
}

/// Classify one chroma frame as `(root, quality)`.
///
/// The root is the loudest pitch class, lowest index winning ties, so a
/// silent frame resolves to C. The chord is minor only when the minor third
/// above the root is strictly louder than the major third.
pub fn classify_frame(frame: &ChromaFrame) -> (PitchClass, ChordQuality) {
    let mut root = 0;
    for (pc, &energy) in frame.iter().enumerate().skip(1) {
        if energy > frame[root] {
            root = pc;
        }
    }
    let root = PitchClass::wrapping(root);

    let minor_third = frame[root.up(MINOR_THIRD).index()];
    let major_third = frame[root.up(MAJOR_THIRD).index()];

    let quality = if minor_third > major_third {
        ChordQuality::Minor
    } else {
        ChordQuality::Major
    };

    (root, quality)
}

/// Merge consecutive identical labels into runs, left to right.
pub fn group_runs(labels: &[(PitchClass, ChordQuality)]) -> Vec<FrameRun> {
    let mut runs = Vec::new();
    let Some(&(first_root, first_quality)) = labels.first() else {
        return runs;
    };

    let mut current = FrameRun {
        root: first_root,
        quality: first_quality,
        start_frame: 0,
        end_frame: 1,
    };

    for (i, &(root, quality)) in labels.iter().enumerate().skip(1) {
        if root == current.root && quality == current.quality {
            current.end_frame = i + 1;
            continue;
        }

        runs.push(current);
        current = FrameRun {
            root,
            quality,
            start_frame: i,
            end_frame: i + 1,
        };
    }

    runs.push(current);
    runs
}

/// Turn runs into timed events, dropping runs shorter than `min_duration`.
pub fn runs_to_events(runs: &[FrameRun], hop_duration: f64, min_duration: f64) -> Vec<ChordEvent> {
    runs.iter()
        .filter_map(|run| {
            let duration = run.len() as f64 * hop_duration;
            (duration >= min_duration).then(|| ChordEvent {
                root: run.root,
                quality: run.quality,
                start_time: run.start_frame as f64 * hop_duration,
                duration,
            })
        })
        .collect()
}
