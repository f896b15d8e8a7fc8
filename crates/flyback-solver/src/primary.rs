//! Primary-side electrical design.
//!
//! Duty cycle from the reflected voltage at minimum input, magnetizing
//! inductance from the ripple factor, and the trapezoidal primary current
//! waveform it implies.

use flyback_core::{ConductionMode, DesignInputs, Guard, Result, Stage};
use serde::{Deserialize, Serialize};

use crate::bulk::BulkCapacitorResult;
use crate::rectifier::RectifierResult;

/// Primary electrical stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryResult {
    /// Minimum DC input to the converter (V).
    pub volt_in_min: f64,
    /// Maximum DC input to the converter (V).
    pub volt_in_max: f64,
    /// Maximum duty cycle at minimum input.
    pub duty_max: f64,
    /// Magnetizing inductance (H).
    pub inductance: f64,
    /// Average current during the on-time, I_EDC (A).
    pub current_edc: f64,
    /// Peak-to-peak current ripple (A).
    pub current_ripple: f64,
    /// Peak primary current (A).
    pub current_peak: f64,
    /// Primary current at turn-on (A); zero in DCM.
    pub current_valley: f64,
    /// Average input current (A).
    pub current_avg: f64,
    /// RMS primary current (A).
    pub current_rms: f64,
    /// Operating regime.
    pub mode: ConductionMode,
}

/// Compute the primary current waveform.
pub fn run(
    inputs: &DesignInputs,
    bulk: &BulkCapacitorResult,
    rectifier: &RectifierResult,
) -> Result<PrimaryResult> {
    let stage = Stage::PrimaryElectrical;
    inputs.validate(stage)?;
    let g = Guard::new(stage);

    let volt_in_min = g.positive(
        "minimum input voltage",
        bulk.volt_dc_min - 2.0 * inputs.diode_drop_bridge,
    )?;
    let volt_in_max = rectifier.volt_rect_max;
    let power_in = bulk.power_in;
    let f_sw = inputs.freq_switch;

    let duty_max = inputs.reflected_volt / (inputs.reflected_volt + volt_in_min);
    let mode = inputs.conduction_mode();

    let volt_second = volt_in_min * duty_max;
    let inductance = g.divide(
        "2 x P_in x f_sw x K_RF",
        volt_second.powi(2),
        2.0 * power_in * f_sw * inputs.ripple_factor,
    )?;
    let current_edc = g.divide("V_in,min x D_max", power_in, volt_second)?;
    let current_ripple = g.divide("L_m x f_sw", volt_second, inductance * f_sw)?;
    let current_peak = current_edc + current_ripple / 2.0;
    let current_valley = (current_edc - current_ripple / 2.0).max(0.0);
    let current_avg = power_in / volt_in_min;
    let current_rms =
        ((3.0 * current_edc.powi(2) + (current_ripple / 2.0).powi(2)) * duty_max / 3.0).sqrt();

    if mode == ConductionMode::Ccm && duty_max > 0.5 {
        log::warn!(
            "{}: duty cycle {:.3} exceeds 0.5 in CCM; slope compensation is required",
            stage,
            duty_max
        );
    }
    log::debug!(
        "{}: V_in={:.1}..{:.1} V, I_EDC={:.3} A, dI={:.3} A",
        stage,
        volt_in_min,
        volt_in_max,
        current_edc,
        current_ripple
    );
    log::info!(
        "{}: {} D={:.3}, L_m={:.3e} H, I_pk={:.3} A, I_rms={:.3} A",
        stage,
        mode,
        duty_max,
        inductance,
        current_peak,
        current_rms
    );

    Ok(PrimaryResult {
        volt_in_min,
        volt_in_max,
        duty_max,
        inductance,
        current_edc,
        current_ripple,
        current_peak,
        current_valley,
        current_avg,
        current_rms,
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bulk, rectifier};

    fn primary_for(inputs: &DesignInputs) -> PrimaryResult {
        let bulk = bulk::run(inputs).unwrap();
        let rect = rectifier::run(inputs, &bulk).unwrap();
        run(inputs, &bulk, &rect).unwrap()
    }

    #[test]
    fn test_reference_design() {
        let p = primary_for(&DesignInputs::default());
        assert_eq!(p.mode, ConductionMode::Ccm);
        assert!((p.duty_max - 0.2981).abs() < 1e-3, "duty {}", p.duty_max);
        assert!((p.inductance - 1.55e-3).abs() < 0.02e-3, "L_m {:.4e}", p.inductance);
        assert!((p.current_peak - 0.836).abs() < 0.01, "I_pk {}", p.current_peak);
        assert!((p.current_rms - 0.302).abs() < 0.005, "I_rms {}", p.current_rms);
        assert!(p.current_valley > 0.0);
    }

    #[test]
    fn test_ripple_matches_ripple_factor() {
        let p = primary_for(&DesignInputs::default());
        let krf = p.current_ripple / (2.0 * p.current_edc);
        assert!((krf - 0.6).abs() < 1e-9, "K_RF {}", krf);
    }

    #[test]
    fn test_dcm_boundary() {
        let p = primary_for(&DesignInputs::default().with_ripple_factor(1.0));
        assert_eq!(p.mode, ConductionMode::Dcm);
        assert!(p.current_valley.abs() < 1e-12);
        assert!((p.current_peak - 2.0 * p.current_edc).abs() < 1e-12);
    }

    #[test]
    fn test_duty_falls_with_higher_line() {
        let low = primary_for(&DesignInputs::default());
        let high = primary_for(&DesignInputs::default().with_line(230.0, 265.0, 50.0));
        assert!(high.duty_max < low.duty_max);
    }
}
