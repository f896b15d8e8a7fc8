//! Bulk capacitor sizing after the diode bridge.
//!
//! The capacitor is sized so the rectified voltage sags to
//! `0.75·V_pk,min − 30 V` at the end of each half line cycle, with the
//! bridge conducting from the 75 % point of the sine up to the peak.

use std::f64::consts::PI;

use flyback_core::{DesignInputs, Guard, Result, Stage};
use serde::{Deserialize, Serialize};

/// Fraction of the line peak at which the bridge starts conducting.
const CONDUCTION_START: f64 = 0.75;

/// Headroom (V) below the conduction point allowed for the valley voltage.
const VALLEY_HEADROOM: f64 = 30.0;

/// Bulk capacitor stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkCapacitorResult {
    /// Total output power (W).
    pub power_out: f64,
    /// Output power including margin (W).
    pub power_out_max: f64,
    /// Input power (W).
    pub power_in: f64,
    /// Rectified peak at minimum line (V).
    pub peak_volt_min: f64,
    /// Rectified peak at maximum line (V).
    pub peak_volt_max: f64,
    /// Time from the conduction point to the line peak (s).
    pub rise_time: f64,
    /// Capacitor charging time per half cycle (s).
    pub charge_time: f64,
    /// Valley voltage at minimum line (V).
    pub valley_volt: f64,
    /// Required bulk capacitance (F).
    pub capacitance: f64,
    /// Average DC bus voltage at minimum line (V).
    pub volt_dc_min: f64,
    /// DC bus voltage at maximum line (V).
    pub volt_dc_max: f64,
    /// Load current at minimum line (A).
    pub load_current_max: f64,
    /// Load current at maximum line (A).
    pub load_current_min: f64,
    /// Peak capacitor charging current (A).
    pub cap_current_peak: f64,
    /// Fraction of the line period spent charging.
    pub charge_duty: f64,
    /// RMS capacitor ripple current (A).
    pub cap_current_rms: f64,
}

/// Size the bulk capacitor.
pub fn run(inputs: &DesignInputs) -> Result<BulkCapacitorResult> {
    let stage = Stage::BulkCapacitor;
    inputs.validate(stage)?;
    let g = Guard::new(stage);

    let power_out = inputs.power_out();
    let power_out_max = inputs.power_out_max();
    let power_in = inputs.power_in();

    let f = inputs.freq_line;
    let period = 1.0 / f;
    let peak_volt_min = 2f64.sqrt() * inputs.input_volt_ac_min;
    let peak_volt_max = 2f64.sqrt() * inputs.input_volt_ac_max;

    let rise_time = CONDUCTION_START.asin() / (2.0 * PI * f);
    let charge_time = period / 4.0 - rise_time;

    let valley_volt = g.positive(
        "valley voltage (0.75 x peak - 30 V)",
        CONDUCTION_START * peak_volt_min - VALLEY_HEADROOM,
    )?;
    if valley_volt < 0.5 * peak_volt_min {
        log::warn!(
            "{}: valley voltage {:.1} V is below half the line peak {:.1} V",
            stage,
            valley_volt,
            peak_volt_min
        );
    }

    let capacitance = g.divide(
        "efficiency x (peak^2 - valley^2)",
        2.0 * power_out_max * (period / 4.0 + rise_time),
        inputs.efficiency * (peak_volt_min.powi(2) - valley_volt.powi(2)),
    )?;

    let volt_dc_min = (peak_volt_min + valley_volt) / 2.0;
    let volt_dc_max = peak_volt_max;
    let load_current_max = g.divide("minimum DC bus voltage", power_in, volt_dc_min)?;
    let load_current_min = g.divide("maximum DC bus voltage", power_in, volt_dc_max)?;

    let cap_current_peak = 2.0 * PI * f * capacitance * peak_volt_min
        * (1.0 - CONDUCTION_START * CONDUCTION_START).sqrt();
    let charge_duty = 2.0 * charge_time * f;
    let cap_current_rms = g.sqrt(
        "capacitor ripple current squared",
        cap_current_peak.powi(2) * charge_duty / 3.0
            + load_current_max.powi(2) * (1.0 - charge_duty),
    )?;

    log::debug!(
        "{}: t_charge={:.3e} s, V_valley={:.2} V, I_cap,pk={:.3} A",
        stage,
        charge_time,
        valley_volt,
        cap_current_peak
    );
    log::info!(
        "{}: C={:.3e} F, V_dc,min={:.1} V, I_cap,rms={:.3} A",
        stage,
        capacitance,
        volt_dc_min,
        cap_current_rms
    );

    Ok(BulkCapacitorResult {
        power_out,
        power_out_max,
        power_in,
        peak_volt_min,
        peak_volt_max,
        rise_time,
        charge_time,
        valley_volt,
        capacitance,
        volt_dc_min,
        volt_dc_max,
        load_current_max,
        load_current_min,
        cap_current_peak,
        charge_duty,
        cap_current_rms,
    })
}
