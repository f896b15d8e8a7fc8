//! Diode bridge current stresses.
//!
//! The bridge current is modelled as a triangle that starts at the peak
//! charging current plus load current and decays linearly over the charge
//! window.

use flyback_core::{DesignInputs, Guard, Result, Stage};
use serde::{Deserialize, Serialize};

use crate::bulk::BulkCapacitorResult;

/// Rectifier bridge stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectifierResult {
    /// Peak diode current (A).
    pub peak_current: f64,
    /// Decay slope of the diode current (A/s).
    pub current_slope: f64,
    /// Diode conduction time per half cycle (s).
    pub conduction_time: f64,
    /// Average current per diode (A).
    pub avg_current: f64,
    /// RMS current per diode (A).
    pub rms_current: f64,
    /// RMS current through the bridge (A).
    pub rms_current_total: f64,
    /// Rectified voltage at minimum line after two diode drops (V).
    pub volt_rect_min: f64,
    /// Rectified voltage at maximum line after two diode drops (V).
    pub volt_rect_max: f64,
}

/// Compute bridge diode stresses.
pub fn run(inputs: &DesignInputs, bulk: &BulkCapacitorResult) -> Result<RectifierResult> {
    let stage = Stage::RectifierBridge;
    inputs.validate(stage)?;
    let g = Guard::new(stage);

    let f = inputs.freq_line;
    let peak_current = bulk.cap_current_peak + bulk.load_current_max;
    let current_slope = g.divide(
        "charge time",
        peak_current - bulk.load_current_min,
        bulk.charge_time,
    )?;
    let conduction_time = g.divide("diode current slope", peak_current, current_slope)?;

    let avg_current = 0.5 * peak_current * conduction_time * f;
    let rms_current = peak_current * (conduction_time * f / 3.0).sqrt();
    let rms_current_total = peak_current * (2.0 * conduction_time * f / 3.0).sqrt();

    let drop = 2.0 * inputs.diode_drop_bridge;
    let volt_rect_min = g.positive("rectified minimum voltage", bulk.peak_volt_min - drop)?;
    let volt_rect_max = g.positive("rectified maximum voltage", bulk.peak_volt_max - drop)?;

    log::info!(
        "{}: I_pk={:.3} A, I_avg={:.3} A, I_rms={:.3} A",
        stage,
        peak_current,
        avg_current,
        rms_current
    );

    Ok(RectifierResult {
        peak_current,
        current_slope,
        conduction_time,
        avg_current,
        rms_current,
        rms_current_total,
        volt_rect_min,
        volt_rect_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk;

    #[test]
    fn test_reference_design() {
        let inputs = DesignInputs::default();
        let bulk = bulk::run(&inputs).unwrap();
        let rect = run(&inputs, &bulk).unwrap();

        let expected_peak = bulk.cap_current_peak + bulk.load_current_max;
        assert!((rect.peak_current - expected_peak).abs() < 1e-12);
        assert!(rect.conduction_time > 0.0);
        assert!((rect.volt_rect_max - (bulk.peak_volt_max - 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_total_rms_is_sqrt2_times_diode_rms() {
        let inputs = DesignInputs::default();
        let bulk = bulk::run(&inputs).unwrap();
        let rect = run(&inputs, &bulk).unwrap();
        let ratio = rect.rms_current_total / rect.rms_current;
        assert!((ratio - 2f64.sqrt()).abs() < 1e-12, "ratio {}", ratio);
    }
}
