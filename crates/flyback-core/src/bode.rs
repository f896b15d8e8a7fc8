//! Pole/zero transfer functions.
//!
//! A [`TransferFunction`] is a product of first- and second-order factors.
//! Magnitude is the product of factor magnitudes; phase is the sum of factor
//! arguments, so it stays continuous across the sweep instead of wrapping
//! at ±180°.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{Error, Result, Stage};
use crate::guard::Guard;
use crate::sweep::{BodePlot, SweepSpec};

/// One factor of a transfer function. Corner frequencies are angular (rad/s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Factor {
    /// Constant gain `k`.
    Gain { k: f64 },
    /// Integrator `ω_i / s`.
    Integrator { omega: f64 },
    /// Left-half-plane zero `1 + s/ω`.
    Zero { omega: f64 },
    /// Real pole `1 / (1 + s/ω)`.
    Pole { omega: f64 },
    /// Right-half-plane zero `1 − s/ω`.
    RhpZero { omega: f64 },
    /// Complex pole pair `1 / (1 + s/(ω·Q) + s²/ω²)`.
    QuadraticPole { omega: f64, q: f64 },
}

impl Factor {
    /// Complex value of the factor at `s = jω`.
    pub fn at(&self, omega: f64) -> Complex64 {
        let s = Complex64::new(0.0, omega);
        let one = Complex64::new(1.0, 0.0);
        match *self {
            Factor::Gain { k } => Complex64::new(k, 0.0),
            Factor::Integrator { omega: wi } => Complex64::new(wi, 0.0) / s,
            Factor::Zero { omega: wz } => one + s / wz,
            Factor::Pole { omega: wp } => one / (one + s / wp),
            Factor::RhpZero { omega: wz } => one - s / wz,
            Factor::QuadraticPole { omega: wn, q } => one / (one + s / (wn * q) + s * s / (wn * wn)),
        }
    }

    fn validate(&self, guard: &Guard) -> Result<()> {
        match *self {
            Factor::Gain { k } => {
                guard.finite("gain", k)?;
            }
            Factor::Integrator { omega } => {
                guard.positive("integrator frequency", omega)?;
            }
            Factor::Zero { omega } | Factor::RhpZero { omega } => {
                guard.positive("zero frequency", omega)?;
            }
            Factor::Pole { omega } => {
                guard.positive("pole frequency", omega)?;
            }
            Factor::QuadraticPole { omega, q } => {
                guard.positive("resonant frequency", omega)?;
                guard.positive("quality factor", q)?;
            }
        }
        Ok(())
    }
}

/// Product of [`Factor`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferFunction {
    pub factors: Vec<Factor>,
}

impl TransferFunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a factor.
    pub fn with(mut self, factor: Factor) -> Self {
        self.factors.push(factor);
        self
    }

    /// Cascade two transfer functions (series connection).
    pub fn cascade(&self, other: &TransferFunction) -> TransferFunction {
        let mut factors = self.factors.clone();
        factors.extend_from_slice(&other.factors);
        TransferFunction { factors }
    }

    /// Complex response at `frequency` (Hz).
    pub fn response(&self, frequency: f64) -> Complex64 {
        let omega = 2.0 * PI * frequency;
        self.factors
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, f| acc * f.at(omega))
    }

    /// Magnitude at `frequency` (Hz), in dB.
    pub fn magnitude_db(&self, frequency: f64) -> f64 {
        let omega = 2.0 * PI * frequency;
        self.factors
            .iter()
            .map(|f| 20.0 * f.at(omega).norm().log10())
            .sum()
    }

    /// Phase at `frequency` (Hz), in degrees.
    pub fn phase_deg(&self, frequency: f64) -> f64 {
        let omega = 2.0 * PI * frequency;
        self.factors
            .iter()
            .map(|f| f.at(omega).arg())
            .sum::<f64>()
            .to_degrees()
    }

    /// Check every corner frequency and gain before sampling.
    pub fn validate(&self, stage: Stage) -> Result<()> {
        let guard = Guard::new(stage);
        self.factors.iter().try_for_each(|f| f.validate(&guard))
    }

    /// Sample the response over `sweep`.
    pub fn sweep(&self, sweep: &SweepSpec, stage: Stage) -> Result<BodePlot> {
        let frequency = sweep.frequencies(stage)?;
        self.evaluate(frequency, stage)
    }

    /// Sample the response at the given frequencies (Hz).
    ///
    /// Fails with [`Error::Domain`] if any point is non-finite.
    pub fn evaluate(&self, frequency: Vec<f64>, stage: Stage) -> Result<BodePlot> {
        self.validate(stage)?;

        let point = |&f: &f64| (self.magnitude_db(f), self.phase_deg(f));

        #[cfg(feature = "parallel")]
        let samples: Vec<(f64, f64)> = {
            use rayon::prelude::*;
            frequency.par_iter().map(point).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let samples: Vec<(f64, f64)> = frequency.iter().map(point).collect();

        for (f, (mag, phase)) in frequency.iter().zip(&samples) {
            if !mag.is_finite() {
                return Err(Error::domain(
                    stage,
                    format!("magnitude at {} Hz", f),
                    "finite",
                    *mag,
                ));
            }
            if !phase.is_finite() {
                return Err(Error::domain(
                    stage,
                    format!("phase at {} Hz", f),
                    "finite",
                    *phase,
                ));
            }
        }

        let (magnitude_db, phase_deg) = samples.into_iter().unzip();
        log::debug!(
            "{}: evaluated {} factors at {} points",
            stage,
            self.factors.len(),
            frequency.len()
        );
        Ok(BodePlot {
            frequency,
            magnitude_db,
            phase_deg,
        })
    }
}
