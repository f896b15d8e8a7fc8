//! Output rectifier and capacitor sizing for every rail.
//!
//! The allowed ripple is split evenly between the capacitive term and the
//! ESR term, which fixes both the capacitance and the maximum ESR.

use std::f64::consts::PI;

use flyback_core::{DesignInputs, Guard, Result, Stage};
use serde::{Deserialize, Serialize};

use crate::electromagnetic::ElectromagneticResult;
use crate::primary::PrimaryResult;
use crate::winding::{WindingKind, WindingResult};

/// Output components for one rail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RailOutput {
    pub kind: WindingKind,
    /// Rail voltage (V).
    pub voltage: f64,
    /// Rail current (A).
    pub current: f64,
    /// Primary-to-rail turns ratio.
    pub turns_ratio: f64,
    /// Rectifier reverse voltage (V).
    pub diode_reverse_voltage: f64,
    /// Rectifier conduction loss (W).
    pub diode_loss: f64,
    /// Allowed peak-to-peak ripple (V).
    pub ripple_allowed: f64,
    /// Output capacitance (F).
    pub capacitance: f64,
    /// Maximum capacitor ESR (Ω).
    pub esr: f64,
    /// Peak secondary current (A).
    pub secondary_peak_current: f64,
    /// RMS secondary current (A).
    pub secondary_rms_current: f64,
    /// RMS capacitor ripple current (A).
    pub ripple_current_rms: f64,
    /// ESR zero frequency (Hz).
    pub esr_zero_frequency: f64,
    /// Resulting peak-to-peak ripple (V).
    pub ripple_voltage: f64,
    /// Capacitor ESR dissipation (W).
    pub capacitor_loss: f64,
}

/// Output stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputResult {
    /// Rails in winding order: secondaries, then auxiliary.
    pub rails: Vec<RailOutput>,
}

impl OutputResult {
    /// The main regulated rail.
    pub fn main(&self) -> Option<&RailOutput> {
        self.rails.first()
    }
}

/// Size rectifiers and capacitors for every rail.
pub fn run(
    inputs: &DesignInputs,
    primary: &PrimaryResult,
    em: &ElectromagneticResult,
    winding: &WindingResult,
) -> Result<OutputResult> {
    let stage = Stage::Output;
    inputs.validate(stage)?;
    let g = Guard::new(stage);
    let f_sw = inputs.freq_switch;
    let vf = inputs.diode_drop_secondary;
    let duty = g.open_unit("actual duty cycle", em.duty_actual)?;

    let mut rails = Vec::with_capacity(em.rail_turns.len());
    for ((rail, &ns), w) in inputs.rails().zip(&em.rail_turns).zip(winding.rails()) {
        let label = w.kind;
        let current = g.positive(&format!("{} output current", label), rail.current)?;
        let turns_ratio = em.primary_turns as f64 / ns as f64;

        let diode_reverse_voltage = rail.voltage + primary.volt_in_max / turns_ratio;
        let diode_loss = rail.power() * vf / rail.voltage;

        let ripple_allowed = inputs.output_ripple_ratio * rail.voltage;
        let half_ripple = ripple_allowed / 2.0;
        let capacitance = g.divide(
            &format!("{} capacitive ripple share", label),
            current * duty,
            f_sw * half_ripple,
        )?;
        let secondary_peak_current = primary.current_peak * turns_ratio * w.load_fraction;
        let esr = g.divide(
            &format!("{} secondary peak current", label),
            half_ripple,
            secondary_peak_current,
        )?;
        let secondary_rms_current = w.rms_current;
        let ripple_current_rms = (secondary_rms_current.powi(2) - current.powi(2))
            .max(0.0)
            .sqrt();
        let esr_zero_frequency = 1.0 / (2.0 * PI * esr * capacitance);
        let ripple_voltage = current * duty / (f_sw * capacitance) + secondary_peak_current * esr;
        let capacitor_loss = ripple_current_rms.powi(2) * esr;

        log::debug!(
            "{}: {} n={:.3} V_rev={:.1} V I_sec,pk={:.3} A",
            stage,
            label,
            turns_ratio,
            diode_reverse_voltage,
            secondary_peak_current
        );

        rails.push(RailOutput {
            kind: label,
            voltage: rail.voltage,
            current,
            turns_ratio,
            diode_reverse_voltage,
            diode_loss,
            ripple_allowed,
            capacitance,
            esr,
            secondary_peak_current,
            secondary_rms_current,
            ripple_current_rms,
            esr_zero_frequency,
            ripple_voltage,
            capacitor_loss,
        });
    }

    if let Some(main) = rails.first() {
        log::info!(
            "{}: main rail C={:.3e} F, ESR={:.3e} ohm, ripple={:.3e} V",
            stage,
            main.capacitance,
            main.esr,
            main.ripple_voltage
        );
    }

    Ok(OutputResult { rails })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixtures, winding};
    use flyback_core::OutputRail;

    #[test]
    fn test_reference_main_rail() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let main = chain.output.main().unwrap();
        assert!(
            (main.capacitance - 148e-6).abs() < 5e-6,
            "C_out {:.3e}",
            main.capacitance
        );
        assert!((main.esr - 10.5e-3).abs() < 1e-3, "ESR {:.3e}", main.esr);
        assert!((main.diode_loss - 1.0).abs() < 1e-12);
        assert!(main.diode_reverse_voltage > 12.0);
    }

    #[test]
    fn test_ripple_meets_allowance() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        for rail in &chain.output.rails {
            assert!(
                (rail.ripple_voltage - rail.ripple_allowed).abs() < 1e-12,
                "{} ripple {} vs {}",
                rail.kind,
                rail.ripple_voltage,
                rail.ripple_allowed
            );
        }
    }

    #[test]
    fn test_zero_current_rail_is_domain_error() {
        let good = fixtures::Chain::new(&DesignInputs::default().with_outputs(vec![
            OutputRail::new(12.0, 2.0),
            OutputRail::new(5.0, 1.0),
        ]));
        let inputs = DesignInputs::default().with_outputs(vec![
            OutputRail::new(12.0, 2.0),
            OutputRail::new(5.0, 0.0),
        ]);
        let core = fixtures::ee25();
        let w = winding::run(&inputs, &core, &good.primary, &good.electromagnetic).unwrap();
        let err = run(&inputs, &good.primary, &good.electromagnetic, &w).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Output));
        assert!(err.to_string().contains("secondary 2 output current"), "{}", err);
    }
}
