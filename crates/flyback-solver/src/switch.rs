//! Primary MOSFET stresses, losses, RCD snubber and current-sense resistor.

use flyback_core::{DesignInputs, Guard, Result, Stage};
use serde::{Deserialize, Serialize};

use crate::electromagnetic::ElectromagneticResult;
use crate::primary::PrimaryResult;

/// RCD clamp across the primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnubberDesign {
    /// Clamp voltage (V).
    pub voltage: f64,
    /// Clamp capacitance (F).
    pub capacitance: f64,
    /// Clamp resistance (Ω).
    pub resistance: f64,
    /// Dissipation (W).
    pub power: f64,
}

/// Current-sense resistor in the source leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenseResistor {
    /// Resistance (Ω).
    pub resistance: f64,
    /// Dissipation (W).
    pub power: f64,
}

/// Switch stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchResult {
    /// Drain-source voltage without the leakage spike (V).
    pub volt_ds_nominal: f64,
    /// Drain-source voltage including the spike allowance (V).
    pub volt_ds_max: f64,
    /// Peak drain current (A).
    pub current_peak: f64,
    /// RMS drain current (A).
    pub current_rms: f64,
    /// On-resistance at ambient (Ω).
    pub rds_on_hot: f64,
    /// Drain current rise time (s).
    pub rise_time: f64,
    /// Drain current fall time (s).
    pub fall_time: f64,
    /// On-time per cycle (s).
    pub on_time: f64,
    /// Off-time per cycle (s).
    pub off_time: f64,
    /// Conduction loss (W).
    pub conduction_loss: f64,
    /// Gate drive loss (W).
    pub drive_loss: f64,
    /// Turn-on plus turn-off crossover loss (W).
    pub switching_loss: f64,
    /// Output capacitance discharge loss (W).
    pub coss_loss: f64,
    /// Sum of the four loss components (W).
    pub total_loss: f64,
    pub snubber: SnubberDesign,
    pub sense: SenseResistor,
}

/// Compute switch stresses and losses.
pub fn run(
    inputs: &DesignInputs,
    primary: &PrimaryResult,
    em: &ElectromagneticResult,
) -> Result<SwitchResult> {
    let stage = Stage::Switch;
    inputs.validate(stage)?;
    let g = Guard::new(stage);
    let sw = &inputs.switch;
    let f_sw = inputs.freq_switch;

    let vro = g.positive("actual reflected voltage", em.reflected_volt_actual)?;
    let duty = g.open_unit("actual duty cycle", em.duty_actual)?;
    let current_peak = g.positive("primary peak current", primary.current_peak)?;
    let current_rms = primary.current_rms;

    let volt_ds_nominal = primary.volt_in_max + vro;
    let volt_ds_max = volt_ds_nominal + inputs.volt_spike;
    let rds_on_hot = g.positive(
        "on-resistance at ambient",
        sw.rds_on * (1.0 + sw.rds_tempco * (inputs.temp_ambient - 25.0)),
    )?;

    let rg = g.non_negative("gate resistance", sw.gate_resistance)?;
    let v_pl = g.positive("Miller plateau voltage", sw.miller_voltage)?;
    // Charge moved between the end of the Miller plateau and full drive
    let q_tail = g.positive(
        "total gate charge - gate-source charge",
        sw.gate_charge - sw.gate_source_charge,
    )?;
    let rise_time = g.divide(
        "drive voltage - plateau",
        rg * sw.gate_drain_charge,
        sw.drive_voltage - v_pl,
    )? + g.divide("drive voltage - plateau", rg * q_tail, sw.drive_voltage - v_pl)?;
    let fall_time = rg * sw.gate_drain_charge / v_pl + rg * q_tail / v_pl;
    let on_time = duty / f_sw;
    let off_time = (1.0 - duty) / f_sw;

    let conduction_loss = current_rms.powi(2) * rds_on_hot;
    let drive_loss = sw.drive_voltage * sw.gate_charge * f_sw;
    let switching_loss = 0.5 * volt_ds_nominal * current_peak * (rise_time + fall_time) * f_sw;
    let coss_loss = 0.5 * sw.output_capacitance * volt_ds_max.powi(2) * f_sw;
    let total_loss = conduction_loss + drive_loss + switching_loss + coss_loss;

    let leakage_energy = inputs.leakage_inductance * current_peak.powi(2);
    let clamp = vro + inputs.volt_spike;
    let snubber_capacitance = g.divide(
        "clamp voltage^2 - reflected voltage^2",
        leakage_energy,
        clamp.powi(2) - vro.powi(2),
    )?;
    let snubber_resistance = g.divide(
        "C_sn x ln(V_sn / V_RO)",
        off_time,
        snubber_capacitance * (clamp / vro).ln(),
    )?;
    let snubber = SnubberDesign {
        voltage: clamp,
        capacitance: snubber_capacitance,
        resistance: snubber_resistance,
        power: clamp.powi(2) / snubber_resistance + 0.5 * leakage_energy * f_sw,
    };

    let sense_resistance = g.divide(
        "primary peak current",
        g.positive("sense voltage", sw.sense_voltage)?,
        current_peak,
    )?;
    let sense = SenseResistor {
        resistance: sense_resistance,
        power: current_rms.powi(2) * sense_resistance,
    };

    log::debug!(
        "{}: t_r={:.3e} s, t_f={:.3e} s, R_ds(T)={:.3} ohm",
        stage,
        rise_time,
        fall_time,
        rds_on_hot
    );
    log::info!(
        "{}: V_ds,max={:.1} V, P_total={:.3} W, snubber {:.3e} F / {:.3e} ohm, R_cs={:.3} ohm",
        stage,
        volt_ds_max,
        total_loss,
        snubber.capacitance,
        snubber.resistance,
        sense.resistance
    );

    Ok(SwitchResult {
        volt_ds_nominal,
        volt_ds_max,
        current_peak,
        current_rms,
        rds_on_hot,
        rise_time,
        fall_time,
        on_time,
        off_time,
        conduction_loss,
        drive_loss,
        switching_loss,
        coss_loss,
        total_loss,
        snubber,
        sense,
    })
}
