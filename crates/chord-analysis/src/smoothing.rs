//! Temporal box filter over chroma rows.

use crate::matrix::{PitchEnergyMatrix, PITCH_CLASSES};

/// Convolve `signal` with a uniform kernel of width `window`, keeping the
/// centred, same-length slice of the full convolution.
///
/// Samples outside the signal count as zero, so the edges are attenuated.
/// Output index `n` averages inputs `n + s - window + 1 ..= n + s` where
/// `s = (window - 1) / 2`, which matches numpy's `convolve(mode="same")`.
/// A window of 0 is treated as 1.
///
/// Window sums come from an `f64` prefix sum, so the cost is linear in the
/// signal length whatever the window.
pub fn box_filter_same(signal: &[f32], window: usize) -> Vec<f32> {
    let window = window.max(1);
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let shift = (window - 1) / 2;
    let weight = 1.0 / window as f64;

    // prefix[k] = signal[0] + ... + signal[k - 1]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0_f64);
    let mut total = 0.0_f64;
    for &x in signal {
        total += x as f64;
        prefix.push(total);
    }

    (0..n)
        .map(|i| {
            let hi = (i + shift).min(n - 1);
            let lo = (i + shift + 1).saturating_sub(window);
            ((prefix[hi + 1] - prefix[lo]) * weight) as f32
        })
        .collect()
}

/// Smooth each pitch-class row of `matrix` independently.
///
/// The result always has the same shape as the input.
pub fn smooth(matrix: &PitchEnergyMatrix, window: usize) -> PitchEnergyMatrix {
    let mut smoothed = PitchEnergyMatrix::zeros(matrix.n_frames());
    if window <= 1 {
        smoothed.frames_mut().copy_from_slice(matrix.frames());
        return smoothed;
    }

    let mut row = Vec::with_capacity(matrix.n_frames());
    for pc in 0..PITCH_CLASSES {
        row.clear();
        row.extend(matrix.frames().iter().map(|f| f[pc]));

        for (frame, value) in smoothed
            .frames_mut()
            .iter_mut()
            .zip(box_filter_same(&row, window))
        {
            frame[pc] = value;
        }
    }

    smoothed
}
