//! Opto-coupler feedback with a TL431 type-II compensator.
//!
//! The TL431 integrates through `R_upper·C_F` with a zero at `1/(R_F·C_F)`.
//! The opto-coupler's pull-up `R_B` and `C_B` add a pole placed on the
//! output capacitor's ESR zero. `C_F` is chosen so the loop gain is unity
//! at the target crossover, with the compensator zero a third of the way
//! below it.

use std::f64::consts::PI;

use flyback_core::{BodePlot, DesignInputs, Error, Factor, Guard, Result, Stage, TransferFunction};
use serde::{Deserialize, Serialize};

use crate::filter::FilterResult;
use crate::output::OutputResult;
use crate::small_signal::power_stage::PowerStageResult;

/// Phase margin below which the loop is reported as marginal (degrees).
const MIN_PHASE_MARGIN: f64 = 45.0;

/// Output sense divider into the TL431 reference pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividerDesign {
    /// Upper resistor (Ω).
    pub r_upper: f64,
    /// Lower resistor (Ω).
    pub r_lower: f64,
    /// Divider ratio V_ref / V_o.
    pub gain: f64,
}

/// Opto feedback stage result. Corner frequencies are angular (rad/s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptoFeedbackResult {
    pub divider: DividerDesign,
    /// TL431 bias resistor across the opto LED (Ω).
    pub r_bias: f64,
    /// Opto LED series resistor R_D (Ω).
    pub r_led: f64,
    /// Opto-coupler gain CTR·R_B/R_D.
    pub opto_gain: f64,
    /// Target crossover frequency (Hz).
    pub crossover_target: f64,
    /// Compensator zero.
    pub omega_zc: f64,
    /// Opto pull-up pole.
    pub omega_pc: f64,
    /// Pull-up capacitor C_B (F).
    pub c_pullup: f64,
    /// TL431 feedback capacitor C_F (F).
    pub c_comp: f64,
    /// TL431 feedback resistor R_F (Ω).
    pub r_comp: f64,
    /// Measured loop crossover (Hz).
    pub loop_crossover: Option<f64>,
    /// Phase margin at the measured crossover (degrees).
    pub phase_margin: Option<f64>,
    /// Loop gain T(s) = G(s)·H_LC(s)·G_c(s).
    pub bode: BodePlot,
}

impl OptoFeedbackResult {
    /// The compensator G_c(s).
    pub fn compensator(&self) -> TransferFunction {
        TransferFunction::new()
            .with(Factor::Gain { k: self.opto_gain })
            .with(Factor::Gain {
                k: self.divider.gain,
            })
            .with(Factor::Integrator {
                omega: 1.0 / (self.divider.r_upper * self.c_comp),
            })
            .with(Factor::Zero {
                omega: self.omega_zc,
            })
            .with(Factor::Pole {
                omega: self.omega_pc,
            })
    }

    /// The loop gain closed through `power_stage` and `filter`.
    pub fn loop_gain(&self, power_stage: &PowerStageResult, filter: &FilterResult) -> TransferFunction {
        power_stage
            .transfer_function()
            .cascade(&filter.transfer_function())
            .cascade(&self.compensator())
    }
}

/// Size the feedback network and sweep the loop gain.
pub fn run(
    inputs: &DesignInputs,
    output: &OutputResult,
    filter: &FilterResult,
    power_stage: &PowerStageResult,
) -> Result<OptoFeedbackResult> {
    let stage = Stage::OptoFeedback;
    inputs.validate(stage)?;
    let g = Guard::new(stage);
    let fb = &inputs.feedback;

    let main = output
        .main()
        .ok_or_else(|| Error::domain(stage, "number of output rails", ">= 1", 0.0))?;
    let vo = main.voltage;

    let v_ref = g.positive("reference voltage", fb.reference_voltage)?;
    let r_lower = g.divide("divider current", v_ref, fb.divider_current)?;
    let r_upper = g.divide(
        "divider current",
        g.positive("V_o - V_ref", vo - v_ref)?,
        fb.divider_current,
    )?;
    let divider = DividerDesign {
        r_upper,
        r_lower,
        gain: g.divide("main rail voltage", v_ref, vo)?,
    };

    let r_bias = g.divide("bias current", fb.led_forward_voltage, fb.bias_current)?;
    let ctr = g.positive("current transfer ratio", fb.ctr)?;
    let r_b = g.positive("pull-up resistance", fb.pullup_resistance)?;
    let headroom = g.positive(
        "V_o - V_led - V_KA,min",
        vo - fb.led_forward_voltage - fb.cathode_voltage_min,
    )?;
    let r_led = g.divide("pull-up voltage", headroom * r_b * ctr, fb.pullup_voltage)?;
    let opto_gain = ctr * r_b / r_led;

    let crossover_target = match fb.crossover_frequency {
        Some(f) => g.positive("crossover frequency", f)?,
        None => (inputs.freq_switch / 20.0).min(power_stage.rhp_zero_frequency() / 4.0),
    };
    let omega_c = 2.0 * PI * crossover_target;
    let omega_zc = omega_c / 3.0;
    let omega_pc = g.positive("output ESR zero", power_stage.omega_z)?;
    let c_pullup = 1.0 / (r_b * omega_pc);

    // Unity loop gain at the target crossover fixes C_F
    let plant = power_stage
        .transfer_function()
        .cascade(&filter.transfer_function());
    let shape = TransferFunction::new()
        .with(Factor::Zero { omega: omega_zc })
        .with(Factor::Pole { omega: omega_pc });
    let plant_gain = plant.response(crossover_target).norm();
    let shape_gain = shape.response(crossover_target).norm();
    let c_comp = g.divide(
        "omega_c x R_upper",
        g.positive(
            "plant gain at crossover",
            opto_gain * divider.gain * plant_gain * shape_gain,
        )?,
        omega_c * r_upper,
    )?;
    let r_comp = 1.0 / (omega_zc * c_comp);

    let mut result = OptoFeedbackResult {
        divider,
        r_bias,
        r_led,
        opto_gain,
        crossover_target,
        omega_zc,
        omega_pc,
        c_pullup,
        c_comp,
        r_comp,
        loop_crossover: None,
        phase_margin: None,
        bode: BodePlot::default(),
    };
    result.bode = result
        .loop_gain(power_stage, filter)
        .sweep(&inputs.loop_sweep, stage)?;
    result.loop_crossover = result.bode.crossover();
    result.phase_margin = result.bode.phase_margin();

    match result.phase_margin {
        Some(pm) if pm < MIN_PHASE_MARGIN => log::warn!(
            "{}: phase margin {:.1} deg is below {:.0} deg",
            stage,
            pm,
            MIN_PHASE_MARGIN
        ),
        None => log::warn!("{}: loop gain never crosses 0 dB in the sweep", stage),
        _ => {}
    }
    log::info!(
        "{}: f_c={:.0} Hz, C_F={:.3e} F, R_F={:.3e} ohm, C_B={:.3e} F, PM={:?}",
        stage,
        crossover_target,
        c_comp,
        r_comp,
        c_pullup,
        result.phase_margin
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_reference_network() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let o = &chain.opto;
        assert!((o.divider.r_lower - 2500.0).abs() < 1e-9);
        assert!((o.divider.r_upper - 9500.0).abs() < 1e-9);
        assert!((o.divider.gain - 2.5 / 12.0).abs() < 1e-12);
        assert!((o.r_bias - 1000.0).abs() < 1e-9);
        // (12 - 1 - 2.5) x 4.7k x 1 / 5
        assert!((o.r_led - 7990.0).abs() < 1e-9);
        assert!((o.opto_gain - 4700.0 / 7990.0).abs() < 1e-12);
        assert!((o.crossover_target - 3250.0).abs() < 1e-9);
    }

    #[test]
    fn test_loop_crosses_at_target() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let o = &chain.opto;
        let t = o.loop_gain(&chain.power_stage, &chain.filter);
        assert!(t.magnitude_db(o.crossover_target).abs() < 1e-9);
        let fc = o.loop_crossover.unwrap();
        assert!(
            (fc - o.crossover_target).abs() / o.crossover_target < 0.05,
            "crossover {} vs target {}",
            fc,
            o.crossover_target
        );
        assert!(o.phase_margin.is_some());
    }

    #[test]
    fn test_component_relations() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let o = &chain.opto;
        assert!((o.r_comp * o.c_comp * o.omega_zc - 1.0).abs() < 1e-12);
        assert!((o.c_pullup * 4700.0 * o.omega_pc - 1.0).abs() < 1e-12);
        assert!((o.omega_pc - chain.power_stage.omega_z).abs() < 1e-9);
        assert!(o.c_comp > 1e-9 && o.c_comp < 100e-9, "C_F {:.3e}", o.c_comp);
    }

    #[test]
    fn test_loop_gain_blends_opto_divider_and_filter() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let o = &chain.opto;
        let t = o.loop_gain(&chain.power_stage, &chain.filter);
        let g = chain.power_stage.transfer_function();
        let h = chain.filter.transfer_function();
        for f in [100.0, 1000.0, 10e3] {
            let s = num_complex::Complex64::new(0.0, 2.0 * PI * f);
            let gc = o.opto_gain * o.divider.gain / (s * o.divider.r_upper * o.c_comp)
                * (1.0 + s / o.omega_zc)
                / (1.0 + s / o.omega_pc);
            let expected = g.response(f) * h.response(f) * gc;
            let actual = t.response(f);
            assert!(
                (actual - expected).norm() / expected.norm() < 1e-9,
                "T at {} Hz: {} vs {}",
                f,
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_divider_gain_scales_loop() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let mut halved = chain.opto.clone();
        halved.divider.gain /= 2.0;
        let f = 1000.0;
        let full = chain.opto.loop_gain(&chain.power_stage, &chain.filter);
        let half = halved.loop_gain(&chain.power_stage, &chain.filter);
        let drop = full.magnitude_db(f) - half.magnitude_db(f);
        assert!((drop - 20.0 * 2f64.log10()).abs() < 1e-9, "drop {} dB", drop);
    }

    #[test]
    fn test_explicit_crossover() {
        let mut inputs = DesignInputs::default();
        inputs.feedback.crossover_frequency = Some(1000.0);
        let chain = fixtures::Chain::new(&inputs);
        assert!((chain.opto.crossover_target - 1000.0).abs() < 1e-12);
    }

    #[test]
    fn test_low_output_voltage_rejected() {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let mut inputs = DesignInputs::default();
        inputs.feedback.cathode_voltage_min = 11.5;
        let err = run(&inputs, &chain.output, &chain.filter, &chain.power_stage).unwrap_err();
        assert!(err.to_string().contains("V_KA,min"), "{}", err);
    }
}
