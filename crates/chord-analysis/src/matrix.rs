use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const PITCH_CLASSES: usize = 12;

/// Energy per pitch class for one analysis frame, index 0 = C.
pub type ChromaFrame = [f32; PITCH_CLASSES];

/// A 12 × N pitch-energy (chroma) matrix, stored frame by frame.
///
/// Columns are uniformly spaced in time starting at t = 0; the spacing
/// (hop duration) travels separately with the matrix.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PitchEnergyMatrix {
    frames: Vec<ChromaFrame>,
}

impl PitchEnergyMatrix {
    /// Build from frame-major data, one 12-element frame per column.
    pub fn from_frames(frames: Vec<ChromaFrame>) -> Result<Self> {
        for (i, frame) in frames.iter().enumerate() {
            for (pc, &energy) in frame.iter().enumerate() {
                check_energy(energy, pc, i)?;
            }
        }
        Ok(Self { frames })
    }

    /// An all-zero matrix with `n_frames` columns.
    pub fn zeros(n_frames: usize) -> Self {
        Self {
            frames: vec![[0.0; PITCH_CLASSES]; n_frames],
        }
    }

    /// Build from row-major data: 12 rows of equal length, one per pitch class.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        if rows.len() != PITCH_CLASSES {
            return Err(Error::Shape(format!(
                "expected {} rows, got {}",
                PITCH_CLASSES,
                rows.len()
            )));
        }

        let n_frames = rows[0].as_ref().len();
        if let Some((pc, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.as_ref().len() != n_frames)
        {
            return Err(Error::Shape(format!(
                "row {} has {} frames, row 0 has {}",
                pc,
                row.as_ref().len(),
                n_frames
            )));
        }

        let mut matrix = Self::zeros(n_frames);
        for (pc, row) in rows.iter().enumerate() {
            for (i, &energy) in row.as_ref().iter().enumerate() {
                check_energy(energy, pc, i)?;
                matrix.frames[i][pc] = energy;
            }
        }

        Ok(matrix)
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[ChromaFrame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [ChromaFrame] {
        &mut self.frames
    }

    /// Total covered time for a given hop duration.
    pub fn duration_seconds(&self, hop_duration: f64) -> f64 {
        self.frames.len() as f64 * hop_duration
    }

    /// Scale every frame so its loudest pitch class is 1.0.
    ///
    /// Silent frames stay all-zero.
    pub fn normalize_frames(&mut self) {
        for frame in &mut self.frames {
            let peak = frame.iter().copied().fold(0.0_f32, f32::max);
            if peak > 0.0 {
                for energy in frame.iter_mut() {
                    *energy /= peak;
                }
            }
        }
    }
}

fn check_energy(energy: f32, pitch_class: usize, frame: usize) -> Result<()> {
    if !energy.is_finite() || energy < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "energy at pitch class {} frame {} is {}",
            pitch_class, frame, energy
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_rows_transposes() {
        let mut rows = vec![vec![0.0_f32; 3]; 12];
        rows[0] = vec![1.0, 0.0, 0.5];
        rows[7] = vec![0.0, 2.0, 0.0];

        let matrix = PitchEnergyMatrix::from_rows(&rows).unwrap();
        assert_eq!(matrix.n_frames(), 3);
        assert_eq!(matrix.frames()[1][7], 2.0);
        let c_row: Vec<f32> = matrix.frames().iter().map(|f| f[0]).collect();
        assert_eq!(c_row, vec![1.0, 0.0, 0.5]);
    }

    #[test]
    fn from_frames_matches_from_rows() {
        let mut rows = vec![vec![0.0_f32; 2]; 12];
        rows[4] = vec![0.5, 1.0];
        let mut frames = vec![[0.0_f32; 12]; 2];
        frames[0][4] = 0.5;
        frames[1][4] = 1.0;

        assert_eq!(
            PitchEnergyMatrix::from_frames(frames).unwrap(),
            PitchEnergyMatrix::from_rows(&rows).unwrap()
        );
    }

    #[test]
    fn from_frames_rejects_bad_energy() {
        let mut frame = [0.0_f32; 12];
        frame[11] = f32::NAN;
        assert!(matches!(
            PitchEnergyMatrix::from_frames(vec![[0.0; 12], frame]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(PitchEnergyMatrix::from_frames(vec![[-1.0; 12]]).is_err());
        assert!(PitchEnergyMatrix::from_frames(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn from_rows_rejects_wrong_row_count() {
        let rows = vec![vec![0.0_f32; 4]; 11];
        assert!(matches!(
            PitchEnergyMatrix::from_rows(&rows),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let mut rows = vec![vec![0.0_f32; 4]; 12];
        rows[5].push(1.0);
        assert!(matches!(
            PitchEnergyMatrix::from_rows(&rows),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn from_rows_rejects_negative_energy() {
        let mut rows = vec![vec![0.0_f32; 2]; 12];
        rows[3][1] = -0.1;
        assert!(matches!(
            PitchEnergyMatrix::from_rows(&rows),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_rows_make_empty_matrix() {
        let rows: Vec<Vec<f32>> = vec![Vec::new(); 12];
        let matrix = PitchEnergyMatrix::from_rows(&rows).unwrap();
        assert!(matrix.is_empty());
    }

    #[test]
    fn normalize_keeps_silence() {
        let mut frame = [0.0_f32; 12];
        frame[2] = 4.0;
        frame[9] = 1.0;
        let mut matrix = PitchEnergyMatrix::from_frames(vec![frame, [0.0; 12]]).unwrap();
        matrix.normalize_frames();

        assert_eq!(matrix.frames()[0][2], 1.0);
        assert_eq!(matrix.frames()[0][9], 0.25);
        assert_eq!(matrix.frames()[1], [0.0; 12]);
    }
}
