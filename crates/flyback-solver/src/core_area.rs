//! Core size requirements: area product and geometry coefficient.

use flyback_core::constants::copper_resistivity;
use flyback_core::{DesignInputs, Guard, Result, Stage};
use flyback_magnetics::CoreSelection;
use serde::{Deserialize, Serialize};

use crate::primary::PrimaryResult;

/// Core area stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreAreaResult {
    /// Peak energy stored in the magnetizing inductance (J).
    pub energy: f64,
    /// Required area product Ap = Ac·Wa (m⁴).
    pub area_product: f64,
    /// Copper resistivity at ambient (Ω·m).
    pub resistivity: f64,
    /// Copper loss budget (W).
    pub copper_loss: f64,
    /// Primary winding resistance budget (Ω).
    pub copper_resistance: f64,
    /// Required geometry coefficient Kg (m⁵).
    pub geometry_coefficient: f64,
}

impl CoreAreaResult {
    /// Whether `core` meets both the area-product and geometry-coefficient
    /// requirements.
    pub fn is_satisfied_by(&self, core: &CoreSelection) -> bool {
        core.area_product() >= self.area_product
            && core.geometry_coefficient() >= self.geometry_coefficient
    }
}

/// Compute the core size requirements.
pub fn run(inputs: &DesignInputs, primary: &PrimaryResult) -> Result<CoreAreaResult> {
    let stage = Stage::CoreArea;
    inputs.validate(stage)?;
    let g = Guard::new(stage);
    let limits = &inputs.transformer;

    let l = primary.inductance;
    let i_pk = primary.current_peak;
    let i_rms = primary.current_rms;

    let energy = 0.5 * l * i_pk.powi(2);
    let area_product = g.divide(
        "Ku x J_max x B_max",
        2.0 * energy,
        limits.window_utilization * limits.current_density_max * limits.flux_density_max,
    )?;

    let resistivity = g.positive(
        "copper resistivity at ambient",
        copper_resistivity(inputs.temp_ambient),
    )?;
    let copper_loss = (1.0 - inputs.transformer_efficiency) * inputs.power_in();
    // Half of the copper budget goes to the primary
    let copper_resistance = g.divide("primary RMS current squared", copper_loss, 2.0 * i_rms.powi(2))?;
    let geometry_coefficient = g.divide(
        "B_max^2 x R_cu x Ku",
        resistivity * l.powi(2) * i_pk.powi(2) * i_rms.powi(2),
        limits.flux_density_max.powi(2) * copper_resistance * limits.window_utilization,
    )?;

    log::info!(
        "{}: Ap={:.3e} m^4, Kg={:.3e} m^5",
        stage,
        area_product,
        geometry_coefficient
    );

    Ok(CoreAreaResult {
        energy,
        area_product,
        resistivity,
        copper_loss,
        copper_resistance,
        geometry_coefficient,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_reference_design() {
        let inputs = DesignInputs::default();
        let chain = fixtures::Chain::new(&inputs);
        let area = run(&inputs, &chain.primary).unwrap();

        let expected_energy = 0.5 * chain.primary.inductance * chain.primary.current_peak.powi(2);
        assert!((area.energy - expected_energy).abs() < 1e-15);
        assert!((area.area_product - 2.0 * expected_energy / (0.3 * 4e6 * 0.3)).abs() < 1e-18);
        assert!((area.copper_loss - 0.05 * 33.0).abs() < 1e-9);
    }

    #[test]
    fn test_ee25_is_large_enough() {
        let inputs = DesignInputs::default();
        let chain = fixtures::Chain::new(&inputs);
        let area = run(&inputs, &chain.primary).unwrap();
        assert!(area.is_satisfied_by(&fixtures::ee25()));
    }

    #[test]
    fn test_perfect_transformer_rejected() {
        let mut inputs = DesignInputs::default();
        inputs.transformer_efficiency = 1.0;
        let chain = fixtures::Chain::new(&DesignInputs::default());
        let err = run(&inputs, &chain.primary).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::CoreArea));
    }
}
