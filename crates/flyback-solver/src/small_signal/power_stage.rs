//! Control-to-output transfer function of a current-mode flyback.
//!
//! CCM:
//! `G(s) = K·(1+s/ω_z)(1−s/ω_rhpz) / ((1+s/ω_p)(1 + s/(ω_n·Q) + s²/ω_n²))`
//!
//! DCM:
//! `G(s) = K·(1+s/ω_z)(1−s/ω_rhpz) / ((1+s/ω_p)(1+s/ω_n))`
//!
//! The ω_n term models current-loop sampling at half the switching
//! frequency; Q depends on slope compensation.

use std::f64::consts::PI;

use flyback_core::{
    BodePlot, ConductionMode, DesignInputs, Error, Factor, Guard, Result, Stage, TransferFunction,
};
use serde::{Deserialize, Serialize};

use crate::electromagnetic::ElectromagneticResult;
use crate::output::OutputResult;
use crate::primary::PrimaryResult;
use crate::switch::SwitchResult;

/// Power stage small-signal result. Corner frequencies are angular (rad/s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerStageResult {
    pub mode: ConductionMode,
    /// Main rail load resistance (Ω).
    pub load_resistance: f64,
    /// Primary-to-main-rail turns ratio.
    pub turns_ratio: f64,
    /// DC control-to-output gain.
    pub gain: f64,
    /// Output pole.
    pub omega_p: f64,
    /// Output capacitor ESR zero.
    pub omega_z: f64,
    /// Right-half-plane zero.
    pub omega_rhpz: f64,
    /// Current-loop sampling pole pair (CCM) or pole (DCM).
    pub omega_n: f64,
    /// Compensation ramp factor m_c = 1 + Se/Sn (CCM only).
    pub slope_factor: Option<f64>,
    /// Quality factor of the sampling pole pair (CCM only).
    pub quality_factor: Option<f64>,
    pub bode: BodePlot,
}

impl PowerStageResult {
    /// The control-to-output transfer function.
    pub fn transfer_function(&self) -> TransferFunction {
        let tf = TransferFunction::new()
            .with(Factor::Gain { k: self.gain })
            .with(Factor::Zero {
                omega: self.omega_z,
            })
            .with(Factor::RhpZero {
                omega: self.omega_rhpz,
            })
            .with(Factor::Pole {
                omega: self.omega_p,
            });
        match self.quality_factor {
            Some(q) => tf.with(Factor::QuadraticPole {
                omega: self.omega_n,
                q,
            }),
            None => tf.with(Factor::Pole {
                omega: self.omega_n,
            }),
        }
    }

    /// Right-half-plane zero frequency (Hz).
    pub fn rhp_zero_frequency(&self) -> f64 {
        self.omega_rhpz / (2.0 * PI)
    }
}

/// Build the control-to-output model for the main rail and sweep it.
pub fn run(
    inputs: &DesignInputs,
    primary: &PrimaryResult,
    em: &ElectromagneticResult,
    switch: &SwitchResult,
    output: &OutputResult,
) -> Result<PowerStageResult> {
    let stage = Stage::PowerStageSmallSignal;
    inputs.validate(stage)?;
    let g = Guard::new(stage);

    let main = output
        .main()
        .ok_or_else(|| Error::domain(stage, "number of output rails", ">= 1", 0.0))?;
    let load_resistance = g.divide("main rail current", main.voltage, main.current)?;
    let n = main.turns_ratio;
    let d = g.open_unit("actual duty cycle", em.duty_actual)?;
    let r_cs = g.positive("sense resistance", switch.sense.resistance)?;
    let c_o = g.positive("output capacitance", main.capacitance)?;
    let esr = g.positive("output capacitor ESR", main.esr)?;
    let l_m = primary.inductance;
    let omega_z = 1.0 / (esr * c_o);

    let mode = primary.mode;
    let (gain, omega_p, omega_rhpz, omega_n, slope_factor, quality_factor) = match mode {
        ConductionMode::Ccm => {
            let gain = g.divide(
                "R_cs x (1 + D)",
                load_resistance * n * (1.0 - d),
                r_cs * (1.0 + d),
            )?;
            let omega_p = g.divide("R_L x C_o", 1.0 + d, load_resistance * c_o)?;
            let omega_rhpz = g.divide(
                "D x L_m",
                load_resistance * (1.0 - d).powi(2) * n * n,
                d * l_m,
            )?;
            let omega_n = PI * inputs.freq_switch;
            let mc = 1.0 + inputs.switch.slope_compensation;
            let q = g.divide(
                "pi x (m_c x (1 - D) - 0.5)",
                1.0,
                PI * (mc * (1.0 - d) - 0.5),
            )?;
            (gain, omega_p, omega_rhpz, omega_n, Some(mc), Some(q))
        }
        ConductionMode::Dcm => {
            let gain = g.divide("I_pk x R_cs", main.voltage, primary.current_peak * r_cs)?;
            let omega_p = g.divide("R_L x C_o", 2.0, load_resistance * c_o)?;
            let omega_rhpz = g.divide("D x L_m", load_resistance * n * n, d * l_m)?;
            let omega_n = PI * inputs.freq_switch;
            (gain, omega_p, omega_rhpz, omega_n, None, None)
        }
    };

    let mut result = PowerStageResult {
        mode,
        load_resistance,
        turns_ratio: n,
        gain,
        omega_p,
        omega_z,
        omega_rhpz,
        omega_n,
        slope_factor,
        quality_factor,
        bode: BodePlot::default(),
    };
    result.bode = result.transfer_function().sweep(&inputs.loop_sweep, stage)?;

    log::info!(
        "{}: {} K={:.3}, f_p={:.1} Hz, f_z={:.1} Hz, f_rhpz={:.1} Hz",
        stage,
        mode,
        gain,
        omega_p / (2.0 * PI),
        omega_z / (2.0 * PI),
        omega_rhpz / (2.0 * PI)
    );

    Ok(result)
}
