//! WAV decoding and chroma extraction.
//!
//! The chromagram is a short-time power spectrum folded onto the twelve
//! pitch classes, one column per hop. Frames are centred (the signal is
//! reflect-padded by half a window on each side) so frame `i` describes the
//! audio around `i * hop_length` samples.

use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chord_analysis::{ChromaFrame, PitchEnergyMatrix, PITCH_CLASSES};
use realfft::RealFftPlanner;
use tracing::debug;

/// Lowest frequency folded into the chromagram (A0).
pub const CHROMA_FMIN: f64 = 27.5;

/// Decoded audio, mixed down to mono.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1, 1]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// STFT parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaOptions {
    /// Samples between frames
    pub hop_length: usize,
    /// FFT window length in samples
    pub n_fft: usize,
}

impl Default for ChromaOptions {
    fn default() -> Self {
        Self {
            hop_length: 512,
            n_fft: 2048,
        }
    }
}

impl ChromaOptions {
    pub fn validate(&self) -> Result<()> {
        if self.hop_length == 0 {
            bail!("hop_length must be at least 1 sample");
        }
        if self.n_fft < 2 {
            bail!("n_fft must be at least 2 samples, got {}", self.n_fft);
        }
        Ok(())
    }

    /// Seconds covered by one hop at `sample_rate`.
    pub fn hop_duration(&self, sample_rate: u32) -> f64 {
        self.hop_length as f64 / sample_rate as f64
    }
}

/// Read and decode a WAV file.
pub fn read_wav(path: &Path) -> Result<DecodedAudio> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    decode_wav(&data).with_context(|| format!("failed to decode {}", path.display()))
}

/// Decode WAV bytes, scaling integer samples to [-1, 1] and averaging
/// interleaved channels to mono.
pub fn decode_wav(data: &[u8]) -> Result<DecodedAudio> {
    let reader = hound::WavReader::new(Cursor::new(data)).context("failed to parse WAV header")?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read float samples")?,
        hound::SampleFormat::Int => {
            let max_val = 2f32.powi(spec.bits_per_sample as i32 - 1);
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .context("failed to read int samples")?
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    debug!(
        "decoded {} samples at {} Hz ({} channel(s) mixed down)",
        samples.len(),
        spec.sample_rate,
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Pitch class for every bin of an `n_fft` spectrum, `None` outside
/// [`CHROMA_FMIN`], Nyquist) and for the DC bin.
fn bin_pitch_classes(n_fft: usize, sample_rate: u32) -> Vec<Option<usize>> {
    let nyquist = sample_rate as f64 / 2.0;
    (0..=n_fft / 2)
        .map(|k| {
            let freq = k as f64 * sample_rate as f64 / n_fft as f64;
            if k == 0 || freq < CHROMA_FMIN || freq >= nyquist {
                return None;
            }
            let midi = (12.0 * (freq / 440.0).log2() + 69.0).round() as i64;
            Some(midi.rem_euclid(PITCH_CLASSES as i64) as usize)
        })
        .collect()
}

/// Periodic Hann window.
fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / len as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Mirror an out-of-range index back into `0..len` without repeating the
/// edge sample.
fn reflect_index(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let folded = index.rem_euclid(period);
    if folded < len as isize {
        folded as usize
    } else {
        (period - folded) as usize
    }
}

/// Compute the max-normalised chromagram of `audio`.
///
/// Returns the matrix together with its hop duration in seconds. Silent
/// input yields all-zero frames; empty input yields an empty matrix.
pub fn chroma(audio: &DecodedAudio, options: &ChromaOptions) -> Result<(PitchEnergyMatrix, f64)> {
    options.validate()?;
    if audio.sample_rate == 0 {
        bail!("sample rate must be positive");
    }

    let hop_duration = options.hop_duration(audio.sample_rate);
    let samples = &audio.samples;
    if samples.is_empty() {
        return Ok((PitchEnergyMatrix::zeros(0), hop_duration));
    }

    let n_fft = options.n_fft;
    let pad = (n_fft / 2) as isize;
    let padded_len = samples.len() + 2 * (n_fft / 2);
    let n_frames = if padded_len < n_fft {
        0
    } else {
        1 + (padded_len - n_fft) / options.hop_length
    };

    let window = hann_window(n_fft);
    let bins = bin_pitch_classes(n_fft, audio.sample_rate);

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();

    let mut frames: Vec<ChromaFrame> = Vec::with_capacity(n_frames);
    for frame_index in 0..n_frames {
        let start = (frame_index * options.hop_length) as isize - pad;
        for (offset, slot) in input.iter_mut().enumerate() {
            let source = reflect_index(start + offset as isize, samples.len());
            *slot = samples[source] * window[offset];
        }

        fft.process(&mut input, &mut spectrum)
            .map_err(|e| anyhow!("FFT failed on frame {}: {}", frame_index, e))?;

        let mut frame = [0.0f32; PITCH_CLASSES];
        for (bin, value) in spectrum.iter().enumerate() {
            if let Some(Some(pc)) = bins.get(bin) {
                frame[*pc] += value.norm_sqr();
            }
        }
        frames.push(frame);
    }

    let mut matrix =
        PitchEnergyMatrix::from_frames(frames).context("audio produced invalid chroma energy")?;
    matrix.normalize_frames();

    debug!(
        "chroma: {} frames, hop {:.4}s, n_fft {}",
        matrix.n_frames(),
        hop_duration,
        n_fft
    );

    Ok((matrix, hop_duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sine(freqs: &[(f64, f32)], seconds: f64, sample_rate: u32) -> DecodedAudio {
        let n = (seconds * sample_rate as f64) as usize;
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                freqs
                    .iter()
                    .map(|(f, a)| a * (2.0 * std::f64::consts::PI * f * t).sin() as f32)
                    .sum()
            })
            .collect();
        DecodedAudio {
            samples,
            sample_rate,
        }
    }

    fn write_wav(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in samples {
                writer.write_sample(*s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_stereo_mixes_to_mono() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = write_wav(spec, &[16384, 0, -16384, -16384]);
        let audio = decode_wav(&bytes).unwrap();

        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.samples, vec![0.25, -0.5]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_wav(b"RIFF but not really").is_err());
    }

    #[test]
    fn test_reflect_index_matches_numpy_reflect() {
        // np.pad([0, 1, 2, 3], 3, mode="reflect") == [3, 2, 1, 0, 1, 2, 3, 2, 1, 0]
        let got: Vec<usize> = (-3..7).map(|i| reflect_index(i, 4)).collect();
        assert_eq!(got, vec![3, 2, 1, 0, 1, 2, 3, 2, 1, 0]);
        assert_eq!(reflect_index(-5, 1), 0);
    }

    #[test]
    fn test_bins_fold_onto_pitch_classes() {
        let bins = bin_pitch_classes(2048, 22050);
        assert_eq!(bins.len(), 1025);
        assert_eq!(bins[0], None);
        // Bin 1 is 10.8 Hz, below A0
        assert_eq!(bins[1], None);
        // Nyquist itself is excluded
        assert_eq!(bins[1024], None);
        // 441 Hz rounds to A
        assert_eq!(bins[41], Some(9));
    }

    #[test]
    fn test_a440_peaks_on_a() {
        let audio = sine(&[(440.0, 0.8)], 1.0, 22050);
        let (matrix, hop) = chroma(&audio, &ChromaOptions::default()).unwrap();

        assert!((hop - 512.0 / 22050.0).abs() < 1e-12);
        // Centred framing: 1 + len / hop
        assert_eq!(matrix.n_frames(), 1 + 22050 / 512);

        for frame in matrix.frames() {
            let peak = frame
                .iter()
                .enumerate()
                .fold(0, |best, (i, v)| if *v > frame[best] { i } else { best });
            assert_eq!(peak, 9);
            assert!((frame[9] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_silence_stays_zero() {
        let audio = DecodedAudio {
            samples: vec![0.0; 4096],
            sample_rate: 22050,
        };
        let (matrix, _) = chroma(&audio, &ChromaOptions::default()).unwrap();
        assert_eq!(matrix.n_frames(), 9);
        assert!(matrix.frames().iter().all(|f| f.iter().all(|v| *v == 0.0)));
    }

    #[test]
    fn test_empty_audio_gives_empty_matrix() {
        let audio = DecodedAudio {
            samples: Vec::new(),
            sample_rate: 44100,
        };
        let (matrix, _) = chroma(&audio, &ChromaOptions::default()).unwrap();
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_invalid_options() {
        let audio = sine(&[(440.0, 0.5)], 0.1, 8000);
        let bad_hop = ChromaOptions {
            hop_length: 0,
            n_fft: 2048,
        };
        assert!(chroma(&audio, &bad_hop).is_err());
    }
}
