//! Air-gap length, fringing flux and the per-turns gap evaluation.

use flyback_core::constants::MU_0;
use serde::{Deserialize, Serialize};

use crate::geometry::{CoreSelection, CoreShape};

/// Gap length (m) that sets `inductance` with `turns` on `core`.
///
/// `l_g = μ0·N²·Ac/L − le/μr`. A result at or below zero means the
/// ungapped core alone already exceeds the target inductance.
pub fn air_gap(inductance: f64, turns: f64, core: &CoreSelection) -> f64 {
    MU_0 * turns * turns * core.cross_section_area / inductance - core.core_reluctance_length()
}

/// Fringing-flux factor for a gap of length `gap` (m).
///
/// Fringing widens the effective gap cross-section, which raises the
/// inductance per turn² above the ungapped estimate.
pub fn fringing_factor(gap: f64, shape: &CoreShape) -> f64 {
    match *shape {
        CoreShape::Rectangular { c, f, .. } => (c + gap) * (f + gap) / (c * f),
        CoreShape::Round { diameter } => ((diameter + gap) / diameter).powi(2),
    }
}

/// Result of evaluating one candidate primary turns count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapPoint {
    /// Candidate turns count.
    pub turns: u32,
    /// Air gap (m).
    pub gap_length: f64,
    /// Fringing-flux factor at that gap.
    pub fringing_factor: f64,
    /// Turns needed once fringing is accounted for.
    pub turns_actual: u32,
    /// Peak flux density with `turns_actual` (T).
    pub flux_density: f64,
}

impl GapPoint {
    /// Whether the peak flux density stays within `b_max`.
    pub fn is_feasible(&self, b_max: f64) -> bool {
        self.flux_density <= b_max
    }
}

/// Evaluate `turns` against the target inductance and peak current.
///
/// Returns `None` when the required gap is not positive.
pub fn evaluate_turns(
    turns: u32,
    inductance: f64,
    peak_current: f64,
    core: &CoreSelection,
) -> Option<GapPoint> {
    let n = turns as f64;
    let gap_length = air_gap(inductance, n, core);
    if gap_length <= 0.0 {
        return None;
    }
    let fringing = fringing_factor(gap_length, &core.shape);
    let n_actual = (inductance * (gap_length + core.core_reluctance_length())
        / (MU_0 * core.cross_section_area * fringing))
        .sqrt()
        .ceil();
    let flux_density = inductance * peak_current / (n_actual * core.cross_section_area);
    Some(GapPoint {
        turns,
        gap_length,
        fringing_factor: fringing,
        turns_actual: n_actual as u32,
        flux_density,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fixtures::ee25;

    #[test]
    fn test_gap_inverts_inductance() {
        let core = ee25();
        let n = 90.0;
        let lg = air_gap(1.5e-3, n, &core);
        let l = MU_0 * n * n * core.cross_section_area / (lg + core.core_reluctance_length());
        assert!((l - 1.5e-3).abs() < 1e-12, "inductance {}", l);
    }

    #[test]
    fn test_fringing_factor_grows_with_gap() {
        let rect = ee25().shape;
        assert_eq!(fringing_factor(0.0, &rect), 1.0);
        assert!(fringing_factor(0.5e-3, &rect) > fringing_factor(0.2e-3, &rect));

        let round = CoreShape::Round { diameter: 10e-3 };
        assert!((fringing_factor(1e-3, &round) - 1.21).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_turns_gives_no_gap() {
        let core = ee25();
        assert!(evaluate_turns(5, 1.5e-3, 0.8, &core).is_none());
    }

    #[test]
    fn test_fringing_reduces_actual_turns() {
        let core = ee25();
        let point = evaluate_turns(86, 1.56e-3, 0.83, &core).unwrap();
        assert!(point.gap_length > 0.0);
        assert!(point.fringing_factor > 1.0);
        assert!(point.turns_actual < 86, "actual turns {}", point.turns_actual);
        let expected_b = 1.56e-3 * 0.83 / (point.turns_actual as f64 * core.cross_section_area);
        assert!((point.flux_density - expected_b).abs() < 1e-12);
    }
}
