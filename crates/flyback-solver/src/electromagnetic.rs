//! Turns count, air gap and flux density.
//!
//! The primary turns search starts from a nominal estimate and adjusts the
//! count one turn at a time. Each candidate fixes the air gap that yields
//! the magnetizing inductance, the fringing flux at that gap lowers the
//! turns actually needed, and the resulting peak flux density decides
//! feasibility. The search returns the smallest feasible count reachable
//! from the seed, bounded by `TransformerLimits::max_iterations`.

use flyback_core::{DesignInputs, Error, Guard, Result, Stage, TurnsMethod};
use flyback_magnetics::{CoreSelection, GapPoint, evaluate_turns};
use serde::{Deserialize, Serialize};

use crate::core_area::CoreAreaResult;
use crate::primary::PrimaryResult;

/// Electromagnetic stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectromagneticResult {
    /// Nominal primary turns from the selected estimation method.
    pub turns_nominal: f64,
    /// Turns candidate the gap was computed for.
    pub turns_candidate: u32,
    /// Primary turns after fringing correction.
    pub primary_turns: u32,
    /// Air gap length (m).
    pub gap_length: f64,
    /// Fringing-flux factor at the gap.
    pub fringing_factor: f64,
    /// Peak flux density (T).
    pub flux_density: f64,
    /// Candidates evaluated by the turns search.
    pub iterations: usize,
    /// Turns per rail in winding order: secondaries, then the auxiliary rail.
    pub rail_turns: Vec<u32>,
    /// Duty cycle each secondary rail's turns ratio implies.
    pub rail_duty: Vec<f64>,
    /// Operating duty cycle after rounding turns.
    pub duty_actual: f64,
    /// Reflected voltage at the operating duty cycle (V).
    pub reflected_volt_actual: f64,
    /// Primary winding current density (A/m²).
    pub current_density: f64,
}

impl ElectromagneticResult {
    /// Primary-to-rail turns ratio `N_p / N_s` for rail `index`.
    pub fn turns_ratio(&self, index: usize) -> Option<f64> {
        self.rail_turns
            .get(index)
            .map(|&ns| self.primary_turns as f64 / ns as f64)
    }
}

/// Nominal primary turns before the gap search.
fn nominal_turns(
    inputs: &DesignInputs,
    core: &CoreSelection,
    primary: &PrimaryResult,
    g: &Guard,
) -> Result<f64> {
    let limits = &inputs.transformer;
    let turns = match limits.turns_method {
        TurnsMethod::PeakFlux => g.divide(
            "B_max x Ac",
            primary.inductance * primary.current_peak,
            limits.flux_density_max * core.cross_section_area,
        )?,
        TurnsMethod::InductanceFactor { al } => {
            let al = al.or(core.inductance_factor).ok_or_else(|| {
                Error::domain(
                    g.stage(),
                    "inductance factor",
                    "given by the turns method or the core record",
                    f64::NAN,
                )
            })?;
            g.divide("inductance factor", primary.inductance, al)?.sqrt()
        }
        TurnsMethod::WindowArea => g.divide(
            "primary RMS current",
            limits.window_utilization
                * core.window_area
                * limits.primary_window_fraction
                * limits.current_density_max,
            primary.current_rms,
        )?,
    };
    g.positive("nominal primary turns", turns)
}

/// Search for the smallest feasible primary turns count.
///
/// Returns the accepted gap point and the number of candidates evaluated.
fn search_turns(
    seed: u32,
    inductance: f64,
    peak_current: f64,
    b_max: f64,
    max_iterations: usize,
    core: &CoreSelection,
) -> Result<(GapPoint, usize)> {
    let stage = Stage::Electromagnetic;
    let mut n = seed;
    let mut iterations = 0;
    let mut last_flux = f64::INFINITY;

    // Step up until the flux density is within bounds
    let mut accepted = loop {
        if iterations >= max_iterations {
            return Err(Error::Convergence {
                stage,
                iterations,
                flux_density: last_flux,
                limit: b_max,
            });
        }
        iterations += 1;
        match evaluate_turns(n, inductance, peak_current, core) {
            Some(point) if point.is_feasible(b_max) => break point,
            Some(point) => {
                log::debug!(
                    "{}: n={} gap={:.3e} m F={:.4} n_act={} B={:.4} T (too high)",
                    stage,
                    n,
                    point.gap_length,
                    point.fringing_factor,
                    point.turns_actual,
                    point.flux_density
                );
                last_flux = point.flux_density;
            }
            None => log::debug!("{}: n={} needs no gap, adding a turn", stage, n),
        }
        n = n.checked_add(1).ok_or(Error::Convergence {
            stage,
            iterations,
            flux_density: last_flux,
            limit: b_max,
        })?;
    };

    // Feasible at the seed: walk down while the next count still fits
    if accepted.turns == seed {
        while accepted.turns > 1 && iterations < max_iterations {
            iterations += 1;
            match evaluate_turns(accepted.turns - 1, inductance, peak_current, core) {
                Some(point) if point.is_feasible(b_max) => accepted = point,
                _ => break,
            }
        }
    }

    Ok((accepted, iterations))
}

/// Compute turns, gap and the operating duty cycle.
pub fn run(
    inputs: &DesignInputs,
    core: &CoreSelection,
    primary: &PrimaryResult,
    core_area: &CoreAreaResult,
) -> Result<ElectromagneticResult> {
    let stage = Stage::Electromagnetic;
    inputs.validate(stage)?;
    core.validate(stage)?;
    let g = Guard::new(stage);
    let limits = &inputs.transformer;

    if !core_area.is_satisfied_by(core) {
        log::warn!(
            "{}: core {} is below the required area product {:.3e} m^4 or Kg {:.3e} m^5",
            stage,
            core.model,
            core_area.area_product,
            core_area.geometry_coefficient
        );
    }

    let turns_nominal = nominal_turns(inputs, core, primary, &g)?;
    let seed = (turns_nominal.ceil() as u32).max(1);
    let (point, iterations) = search_turns(
        seed,
        primary.inductance,
        primary.current_peak,
        limits.flux_density_max,
        limits.max_iterations,
        core,
    )?;
    let primary_turns = point.turns_actual;
    let np = primary_turns as f64;

    let vf = inputs.diode_drop_secondary;
    let rail_turns: Vec<u32> = inputs
        .rails()
        .map(|rail| {
            let ns = (np * (rail.voltage + vf) / inputs.reflected_volt).ceil();
            (ns as u32).max(1)
        })
        .collect();

    let volt_in_min = primary.volt_in_min;
    let rail_duty: Vec<f64> = inputs
        .outputs
        .iter()
        .zip(&rail_turns)
        .map(|(rail, &ns)| {
            let reflected = np / ns as f64 * (rail.voltage + vf);
            reflected / (reflected + volt_in_min)
        })
        .collect();
    // The rail needing the longest on-time sets the operating point
    let duty_actual = rail_duty.iter().copied().fold(f64::MIN, f64::max);
    let duty_actual = g.open_unit("actual duty cycle", duty_actual)?;
    let reflected_volt_actual = duty_actual * volt_in_min / (1.0 - duty_actual);

    let current_density = g.divide(
        "Ku x Wa x primary window fraction",
        primary.current_rms * np,
        limits.window_utilization * core.window_area * limits.primary_window_fraction,
    )?;
    if current_density > limits.current_density_max {
        log::warn!(
            "{}: primary current density {:.3e} A/m^2 exceeds {:.3e} A/m^2",
            stage,
            current_density,
            limits.current_density_max
        );
    }

    log::info!(
        "{}: N_p={} (candidate {}, {} iterations), gap={:.3e} m, B={:.3} T, D={:.3}",
        stage,
        primary_turns,
        point.turns,
        iterations,
        point.gap_length,
        point.flux_density,
        duty_actual
    );

    Ok(ElectromagneticResult {
        turns_nominal,
        turns_candidate: point.turns,
        primary_turns,
        gap_length: point.gap_length,
        fringing_factor: point.fringing_factor,
        flux_density: point.flux_density,
        iterations,
        rail_turns,
        rail_duty,
        duty_actual,
        reflected_volt_actual,
        current_density,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use flyback_core::{OutputRail, TransformerLimits};

    fn run_with(inputs: &DesignInputs, core: &CoreSelection) -> Result<ElectromagneticResult> {
        let chain = fixtures::Chain::new(&DesignInputs::default());
        run(inputs, core, &chain.primary, &chain.core_area)
    }

    #[test]
    fn test_reference_design_converges_below_limit() {
        let em = run_with(&DesignInputs::default(), &fixtures::ee25()).unwrap();
        assert!(em.flux_density <= 0.3, "B = {}", em.flux_density);
        assert!(em.gap_length > 0.0);
        assert!(em.fringing_factor > 1.0);
        assert!(em.primary_turns <= em.turns_candidate);
        assert!(
            (70..=100).contains(&em.primary_turns),
            "N_p = {}",
            em.primary_turns
        );
    }

    #[test]
    fn test_secondary_turns_from_reflected_voltage() {
        let em = run_with(&DesignInputs::default(), &fixtures::ee25()).unwrap();
        let expected = (em.primary_turns as f64 * 12.5 / 90.0).ceil() as u32;
        assert_eq!(em.rail_turns, vec![expected]);
        // Rounding secondary turns up lowers the reflected voltage
        assert!(em.reflected_volt_actual <= 90.0 + 1e-9);
    }

    #[test]
    fn test_duty_is_max_over_rails() {
        let inputs = DesignInputs::default().with_outputs(vec![
            OutputRail::new(12.0, 2.0),
            OutputRail::new(5.0, 1.0),
            OutputRail::new(3.3, 0.5),
        ]);
        let em = run_with(&inputs, &fixtures::ee25()).unwrap();
        assert_eq!(em.rail_duty.len(), 3);
        let max = em.rail_duty.iter().cloned().fold(0.0, f64::max);
        assert_eq!(em.duty_actual, max);
    }

    #[test]
    fn test_duty_tie_across_four_rails() {
        // Equal rail voltages get equal turns and so equal duty
        let inputs = DesignInputs::default().with_outputs(vec![
            OutputRail::new(12.0, 1.0),
            OutputRail::new(5.0, 1.0),
            OutputRail::new(12.0, 0.5),
            OutputRail::new(3.3, 0.5),
        ]);
        let em = run_with(&inputs, &fixtures::ee25()).unwrap();
        assert_eq!(em.rail_duty.len(), 4);
        assert_eq!(em.rail_turns.len(), 4);
        assert_eq!(em.rail_duty[0], em.rail_duty[2]);
        let max = em.rail_duty.iter().cloned().fold(0.0, f64::max);
        assert_eq!(em.duty_actual, max);
        assert!(em.rail_duty.iter().all(|&d| d <= em.duty_actual));
    }

    #[test]
    fn test_turns_overflow_reports_convergence_error() {
        // No gap is possible at any u32 turns count for this inductance
        let err = search_turns(u32::MAX, 1e30, 1.0, 0.3, 10, &fixtures::ee25()).unwrap_err();
        assert!(
            matches!(err, Error::Convergence { stage: Stage::Electromagnetic, iterations: 1, .. }),
            "{}",
            err
        );
    }

    #[test]
    fn test_aux_has_turns_but_no_duty() {
        let inputs = DesignInputs::default().with_aux(OutputRail::new(15.0, 0.05));
        let em = run_with(&inputs, &fixtures::ee25()).unwrap();
        assert_eq!(em.rail_turns.len(), 2);
        assert_eq!(em.rail_duty.len(), 1);
    }

    #[test]
    fn test_seed_above_answer_walks_down() {
        // The window-area estimate overshoots; the search must come back down
        let limits = TransformerLimits::default().with_turns_method(TurnsMethod::WindowArea);
        let inputs = DesignInputs::default().with_transformer(limits);
        let by_window = run_with(&inputs, &fixtures::ee25()).unwrap();
        let by_flux = run_with(&DesignInputs::default(), &fixtures::ee25()).unwrap();
        assert!(by_window.turns_nominal > by_flux.turns_nominal);
        assert_eq!(by_window.primary_turns, by_flux.primary_turns);
        assert!(by_window.flux_density <= 0.3);
    }

    #[test]
    fn test_inductance_factor_needs_a_value() {
        let limits = TransformerLimits::default()
            .with_turns_method(TurnsMethod::InductanceFactor { al: None });
        let inputs = DesignInputs::default().with_transformer(limits);
        let err = run_with(&inputs, &fixtures::ee25()).unwrap_err();
        assert!(err.to_string().contains("inductance factor"), "{}", err);
    }

    #[test]
    fn test_iteration_cap_reports_convergence_error() {
        let limits = TransformerLimits::default()
            .with_flux_density_max(0.01)
            .with_max_iterations(20);
        let inputs = DesignInputs::default().with_transformer(limits);
        let err = run_with(&inputs, &fixtures::ee25()).unwrap_err();
        match err {
            Error::Convergence {
                stage,
                iterations,
                limit,
                ..
            } => {
                assert_eq!(stage, Stage::Electromagnetic);
                assert_eq!(iterations, 20);
                assert_eq!(limit, 0.01);
            }
            other => panic!("expected convergence error, got {}", other),
        }
    }
}
