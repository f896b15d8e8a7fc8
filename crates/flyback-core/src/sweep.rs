//! Frequency sweeps and Bode data.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, Stage};
use crate::guard::Guard;
use crate::units::si;

/// Frequency sweep specification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SweepSpec {
    /// Evenly spaced points `start + i·step`.
    Linear {
        #[serde(deserialize_with = "si::deserialize")]
        start: f64,
        #[serde(deserialize_with = "si::deserialize")]
        stop: f64,
        #[serde(deserialize_with = "si::deserialize")]
        step: f64,
    },
    /// Logarithmically spaced points `start·10^(i/points_per_decade)`.
    Log {
        #[serde(deserialize_with = "si::deserialize")]
        start: f64,
        #[serde(deserialize_with = "si::deserialize")]
        stop: f64,
        points_per_decade: usize,
    },
}

impl SweepSpec {
    /// Linear sweep from `start` to `stop` in increments of `step`.
    pub fn linear(start: f64, stop: f64, step: f64) -> Self {
        SweepSpec::Linear { start, stop, step }
    }

    /// Logarithmic sweep from `start` to `stop`.
    pub fn log(start: f64, stop: f64, points_per_decade: usize) -> Self {
        SweepSpec::Log {
            start,
            stop,
            points_per_decade,
        }
    }

    /// Check the sweep bounds, attributing failures to `stage`.
    pub fn validate(&self, stage: Stage) -> Result<()> {
        let g = Guard::new(stage);
        let (start, stop) = match *self {
            SweepSpec::Linear { start, stop, step } => {
                g.positive("sweep step", step)?;
                (start, stop)
            }
            SweepSpec::Log {
                start,
                stop,
                points_per_decade,
            } => {
                if points_per_decade == 0 {
                    return Err(Error::domain(stage, "sweep points per decade", ">= 1", 0.0));
                }
                (start, stop)
            }
        };
        g.positive("sweep start", start)?;
        g.finite("sweep stop", stop)?;
        if stop <= start {
            return Err(Error::domain(
                stage,
                "sweep stop",
                format!("> sweep start ({})", start),
                stop,
            ));
        }
        Ok(())
    }

    /// Number of points the sweep produces.
    pub fn len(&self) -> usize {
        match *self {
            SweepSpec::Linear { start, stop, step } => {
                // Small slack so an exact multiple of `step` includes `stop`
                ((stop - start) / step + 1e-9).floor() as usize + 1
            }
            SweepSpec::Log {
                start,
                stop,
                points_per_decade,
            } => ((stop / start).log10() * points_per_decade as f64 + 1e-9).floor() as usize + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Generate the sweep frequencies (Hz), strictly increasing.
    pub fn frequencies(&self, stage: Stage) -> Result<Vec<f64>> {
        self.validate(stage)?;
        let n = self.len();
        let points = match *self {
            SweepSpec::Linear { start, step, .. } => {
                (0..n).map(|i| start + i as f64 * step).collect()
            }
            SweepSpec::Log {
                start,
                points_per_decade,
                ..
            } => (0..n)
                .map(|i| start * 10f64.powf(i as f64 / points_per_decade as f64))
                .collect(),
        };
        Ok(points)
    }
}

impl Default for SweepSpec {
    fn default() -> Self {
        SweepSpec::log(10.0, 1e6, 50)
    }
}

/// Magnitude and phase response sampled over a sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodePlot {
    /// Frequencies (Hz).
    pub frequency: Vec<f64>,
    /// Magnitude (dB).
    pub magnitude_db: Vec<f64>,
    /// Phase (degrees).
    pub phase_deg: Vec<f64>,
}

impl BodePlot {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    /// Iterate over `(frequency, magnitude_db, phase_deg)` triples.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.frequency
            .iter()
            .zip(&self.magnitude_db)
            .zip(&self.phase_deg)
            .map(|((&f, &m), &p)| (f, m, p))
    }

    /// Index of the first interval `[i, i+1]` where the magnitude falls through 0 dB.
    fn crossing_index(&self) -> Option<usize> {
        (0..self.len().saturating_sub(1))
            .find(|&i| self.magnitude_db[i] >= 0.0 && self.magnitude_db[i + 1] < 0.0)
    }

    /// Gain crossover frequency (Hz), interpolated in log-frequency.
    pub fn crossover(&self) -> Option<f64> {
        let i = self.crossing_index()?;
        let (m0, m1) = (self.magnitude_db[i], self.magnitude_db[i + 1]);
        let (l0, l1) = (self.frequency[i].log10(), self.frequency[i + 1].log10());
        if (m1 - m0).abs() < 1e-30 {
            return Some(self.frequency[i]);
        }
        let alpha = m0 / (m0 - m1);
        Some(10f64.powf(l0 + alpha * (l1 - l0)))
    }

    /// Phase margin (degrees): `180° + ∠T` at the gain crossover.
    pub fn phase_margin(&self) -> Option<f64> {
        let i = self.crossing_index()?;
        let (m0, m1) = (self.magnitude_db[i], self.magnitude_db[i + 1]);
        let alpha = if (m1 - m0).abs() < 1e-30 {
            0.0
        } else {
            m0 / (m0 - m1)
        };
        let phase = self.phase_deg[i] + alpha * (self.phase_deg[i + 1] - self.phase_deg[i]);
        Some(180.0 + phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_length_matches_step_count() {
        let sweep = SweepSpec::linear(10.0, 1e6, 100.0);
        let freqs = sweep.frequencies(Stage::OutputFilter).unwrap();
        assert_eq!(freqs.len(), 10_000);
        assert_eq!(freqs.len(), sweep.len());
        assert!((freqs[0] - 10.0).abs() < 1e-12);
        assert!(freqs.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_linear_includes_exact_stop() {
        let sweep = SweepSpec::linear(100.0, 1000.0, 100.0);
        let freqs = sweep.frequencies(Stage::OutputFilter).unwrap();
        assert_eq!(freqs.len(), 10);
        assert!((freqs[9] - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_points_per_decade() {
        let sweep = SweepSpec::log(10.0, 1e6, 10);
        let freqs = sweep.frequencies(Stage::OutputFilter).unwrap();
        assert_eq!(freqs.len(), 51);
        assert!((freqs[10] - 100.0).abs() < 1e-9);
        assert!((freqs[50] - 1e6).abs() < 1e-3);
        assert!(freqs.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_invalid_sweeps() {
        assert!(SweepSpec::linear(0.0, 100.0, 1.0).validate(Stage::OutputFilter).is_err());
        assert!(SweepSpec::linear(100.0, 10.0, 1.0).validate(Stage::OutputFilter).is_err());
        assert!(SweepSpec::linear(10.0, 100.0, 0.0).validate(Stage::OutputFilter).is_err());
        assert!(SweepSpec::log(10.0, 100.0, 0).validate(Stage::OutputFilter).is_err());
    }

    #[test]
    fn test_crossover_interpolation() {
        let plot = BodePlot {
            frequency: vec![100.0, 1000.0, 10000.0],
            magnitude_db: vec![20.0, 10.0, -10.0],
            phase_deg: vec![-90.0, -100.0, -120.0],
        };
        let fc = plot.crossover().unwrap();
        assert!((fc - 10f64.powf(3.5)).abs() < 1e-6, "crossover {}", fc);
        let pm = plot.phase_margin().unwrap();
        assert!((pm - 70.0).abs() < 1e-9, "phase margin {}", pm);
    }

    #[test]
    fn test_no_crossover() {
        let plot = BodePlot {
            frequency: vec![100.0, 1000.0],
            magnitude_db: vec![-3.0, -20.0],
            phase_deg: vec![0.0, -45.0],
        };
        assert!(plot.crossover().is_none());
        assert!(plot.phase_margin().is_none());
    }
}
