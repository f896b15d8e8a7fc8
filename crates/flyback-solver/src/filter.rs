//! Second-stage LC post filter on the main rail.
//!
//! A Butterworth (Q = 1/√2) low-pass designed against the rail's load
//! resistance: `L = R_L/(ω0·Q)`, `C = Q/(ω0·R_L)`. The filter is the
//! quadratic pole `1/(1 − ω²LC + jωL/R_L)`.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use flyback_core::{BodePlot, DesignInputs, Error, Factor, Guard, Result, Stage, TransferFunction};
use serde::{Deserialize, Serialize};

use crate::output::OutputResult;

/// Output filter stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    /// Corner frequency (Hz).
    pub cutoff_frequency: f64,
    /// Angular corner frequency (rad/s).
    pub omega: f64,
    /// Load resistance of the main rail (Ω).
    pub load_resistance: f64,
    /// Filter inductance (H).
    pub inductance: f64,
    /// Filter capacitance (F).
    pub capacitance: f64,
    /// Quality factor.
    pub q: f64,
    /// Damping ratio.
    pub damping: f64,
    /// Ripple ahead of the filter (V).
    pub ripple_in: f64,
    /// Attenuation at the switching frequency (dB).
    pub attenuation_db: f64,
    /// Ripple after the filter (V).
    pub ripple_out: f64,
    pub bode: BodePlot,
}

impl FilterResult {
    /// The filter's transfer function.
    pub fn transfer_function(&self) -> TransferFunction {
        TransferFunction::new().with(Factor::QuadraticPole {
            omega: self.omega,
            q: self.q,
        })
    }
}

/// Design the post filter and sweep its response.
pub fn run(inputs: &DesignInputs, output: &OutputResult) -> Result<FilterResult> {
    let stage = Stage::OutputFilter;
    inputs.validate(stage)?;
    let g = Guard::new(stage);

    let main = output.main().ok_or_else(|| {
        Error::domain(stage, "number of output rails", ">= 1", 0.0)
    })?;
    let load_resistance = g.divide("main rail current", main.voltage, main.current)?;

    let cutoff_frequency = g.positive("filter cutoff", inputs.filter_cutoff())?;
    let omega = 2.0 * PI * cutoff_frequency;
    let q = FRAC_1_SQRT_2;
    let inductance = load_resistance / (omega * q);
    let capacitance = q / (omega * load_resistance);
    let damping = 1.0 / (2.0 * q);

    let filter = TransferFunction::new().with(Factor::QuadraticPole { omega, q });
    let attenuation_db = filter.magnitude_db(inputs.freq_switch);
    let ripple_in = main.ripple_voltage;
    let ripple_out = ripple_in * filter.response(inputs.freq_switch).norm();

    if cutoff_frequency >= inputs.freq_switch {
        log::warn!(
            "{}: cutoff {:.0} Hz is not below the switching frequency",
            stage,
            cutoff_frequency
        );
    }

    let bode = filter.sweep(&inputs.filter_sweep, stage)?;

    log::info!(
        "{}: L={:.3e} H, C={:.3e} F, ripple {:.3e} -> {:.3e} V ({:.1} dB at f_sw)",
        stage,
        inductance,
        capacitance,
        ripple_in,
        ripple_out,
        attenuation_db
    );

    Ok(FilterResult {
        cutoff_frequency,
        omega,
        load_resistance,
        inductance,
        capacitance,
        q,
        damping,
        ripple_in,
        attenuation_db,
        ripple_out,
        bode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use flyback_core::SweepSpec;

    #[test]
    fn test_reference_filter() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let f = &chain.filter;
        assert!((f.cutoff_frequency - 6500.0).abs() < 1e-9);
        assert!((f.load_resistance - 6.0).abs() < 1e-12);
        assert!((f.inductance - 207.8e-6).abs() < 0.5e-6, "L {:.4e}", f.inductance);
        assert!((f.damping - FRAC_1_SQRT_2).abs() < 1e-12);
        // L and C resonate at the corner
        let w0 = 1.0 / (f.inductance * f.capacitance).sqrt();
        assert!((w0 - f.omega).abs() / f.omega < 1e-12);
    }

    #[test]
    fn test_attenuation_at_switching_frequency() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let f = &chain.filter;
        // Butterworth: |H| = 1/sqrt(1 + (f/fc)^4) with f/fc = 10
        let expected = 1.0 / (1.0 + 1e4f64).sqrt();
        assert!((f.ripple_out / f.ripple_in - expected).abs() < 1e-9);
        assert!((f.attenuation_db + 40.0).abs() < 0.01);
    }

    #[test]
    fn test_linear_sweep_length() {
        let mut inputs = DesignInputs::default();
        inputs.filter_sweep = SweepSpec::linear(10.0, 1e6, 100.0);
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let f = run(&inputs, &chain.output).unwrap();
        assert_eq!(f.bode.len(), 10_000);
        assert_eq!(f.bode.magnitude_db.len(), f.bode.phase_deg.len());
        assert!(f.bode.frequency.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_bode_matches_closed_form() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let f = &chain.filter;
        for (freq, mag, _) in f.bode.points().step_by(37) {
            let w = 2.0 * PI * freq;
            let re = 1.0 - w * w * f.inductance * f.capacitance;
            let im = w * f.inductance / f.load_resistance;
            let expected = -10.0 * (re * re + im * im).log10();
            assert!((mag - expected).abs() < 1e-6, "at {} Hz: {} vs {}", freq, mag, expected);
        }
    }
}
