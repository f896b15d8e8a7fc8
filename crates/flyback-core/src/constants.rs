//! Physical constants.

/// Permeability of free space μ0 (H/m).
pub const MU_0: f64 = 4.0e-7 * std::f64::consts::PI;

/// Resistivity of annealed copper at 20 °C (Ω·m).
pub const COPPER_RESISTIVITY_20C: f64 = 1.72e-8;

/// Temperature coefficient of copper resistivity (1/°C).
pub const COPPER_TEMPCO: f64 = 0.00393;

/// Copper resistivity at `temp` °C (Ω·m).
pub fn copper_resistivity(temp: f64) -> f64 {
    COPPER_RESISTIVITY_20C * (1.0 + COPPER_TEMPCO * (temp - 20.0))
}
