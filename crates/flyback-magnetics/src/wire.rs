//! American Wire Gauge conversions.
//!
//! `AWG(d) = 36 − 39·log_92(d / 0.127 mm)` and its inverse
//! `d(AWG) = 0.127 mm·92^((36 − AWG)/39)`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Diameter of AWG 36 (m).
const AWG36_DIAMETER: f64 = 0.127e-3;

/// Continuous AWG number for a bare diameter (m).
pub fn awg_from_diameter(diameter: f64) -> f64 {
    36.0 - 39.0 * (diameter / AWG36_DIAMETER).ln() / 92f64.ln()
}

/// Bare diameter (m) of a continuous AWG number.
pub fn diameter_from_awg(awg: f64) -> f64 {
    AWG36_DIAMETER * 92f64.powf((36.0 - awg) / 39.0)
}

/// A standard wire gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Awg(pub i32);

impl Awg {
    /// Thinnest gauge in common magnet-wire production.
    pub const THINNEST: Awg = Awg(44);

    /// Thickest standard gauge whose bare diameter does not exceed `diameter` (m).
    pub fn for_diameter(diameter: f64) -> Self {
        // Tolerance keeps an exact gauge diameter from rounding to the next size
        Awg((awg_from_diameter(diameter) - 1e-9).ceil() as i32)
    }

    /// Thickest standard gauge that fits within an allotted copper `area` (m²).
    pub fn for_area(area: f64) -> Self {
        Self::for_diameter((4.0 * area / PI).sqrt())
    }

    /// Bare diameter (m).
    pub fn diameter(&self) -> f64 {
        diameter_from_awg(self.0 as f64)
    }

    /// Bare copper area (m²).
    pub fn area(&self) -> f64 {
        PI * self.diameter().powi(2) / 4.0
    }
}

impl std::fmt::Display for Awg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AWG {}", self.0)
    }
}
