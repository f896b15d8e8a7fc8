//! Core geometry records.

use flyback_core::units::si;
use flyback_core::{Guard, Result, Stage};
use serde::{Deserialize, Serialize};

/// Center-leg cross-section shape, used for the fringing-flux factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreShape {
    /// Rectangular center leg (EE, EI, EFD).
    ///
    /// `c` and `f` are the center-leg sides, `d` the window height and `e`
    /// the window span (m).
    Rectangular {
        #[serde(deserialize_with = "si::deserialize")]
        c: f64,
        #[serde(deserialize_with = "si::deserialize")]
        d: f64,
        #[serde(deserialize_with = "si::deserialize")]
        e: f64,
        #[serde(deserialize_with = "si::deserialize")]
        f: f64,
    },
    /// Round center leg (ETD, PQ, RM, pot cores).
    Round {
        #[serde(deserialize_with = "si::deserialize")]
        diameter: f64,
    },
}

/// A magnetic core with its bobbin, as supplied by the core catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreSelection {
    /// Part number, e.g. `EE25/13/7`.
    pub model: String,
    /// Effective cross-section area Ac (m²).
    #[serde(deserialize_with = "si::deserialize")]
    pub cross_section_area: f64,
    /// Bobbin window area Wa (m²).
    #[serde(deserialize_with = "si::deserialize")]
    pub window_area: f64,
    /// Effective core volume (m³).
    #[serde(deserialize_with = "si::deserialize")]
    pub volume: f64,
    /// Mean length per turn (m).
    #[serde(deserialize_with = "si::deserialize")]
    pub mean_turn_length: f64,
    /// Effective magnetic path length le (m).
    #[serde(deserialize_with = "si::deserialize")]
    pub path_length: f64,
    /// Relative permeability of the ungapped material.
    #[serde(deserialize_with = "si::deserialize")]
    pub permeability: f64,
    /// Usable bobbin winding width (m).
    #[serde(deserialize_with = "si::deserialize")]
    pub bobbin_width: f64,
    /// Inductance factor AL of the gapped core (H/turn²).
    #[serde(default, deserialize_with = "si::deserialize_option")]
    pub inductance_factor: Option<f64>,
    pub shape: CoreShape,
}

impl CoreSelection {
    /// Area product Ac·Wa (m⁴).
    pub fn area_product(&self) -> f64 {
        self.cross_section_area * self.window_area
    }

    /// Geometry coefficient Kg = Ac²·Wa/MLT (m⁵).
    pub fn geometry_coefficient(&self) -> f64 {
        self.cross_section_area.powi(2) * self.window_area / self.mean_turn_length
    }

    /// Magnetic path reluctance length of the ungapped core, le/μr (m).
    pub fn core_reluctance_length(&self) -> f64 {
        self.path_length / self.permeability
    }

    /// Check that every dimension is a positive finite number.
    pub fn validate(&self, stage: Stage) -> Result<()> {
        let g = Guard::new(stage);
        g.positive("core cross-section area", self.cross_section_area)?;
        g.positive("core window area", self.window_area)?;
        g.positive("core volume", self.volume)?;
        g.positive("core mean turn length", self.mean_turn_length)?;
        g.positive("core path length", self.path_length)?;
        g.positive("core permeability", self.permeability)?;
        g.positive("bobbin width", self.bobbin_width)?;
        if let Some(al) = self.inductance_factor {
            g.positive("core inductance factor", al)?;
        }
        match self.shape {
            CoreShape::Rectangular { c, d, e, f } => {
                g.positive("center leg width c", c)?;
                g.positive("window height d", d)?;
                g.positive("window span e", e)?;
                g.positive("center leg depth f", f)?;
            }
            CoreShape::Round { diameter } => {
                g.positive("center leg diameter", diameter)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// EE25-class core used across the unit tests.
    pub fn ee25() -> CoreSelection {
        CoreSelection {
            model: "EE25/13/7".to_string(),
            cross_section_area: 52.5e-6,
            window_area: 61.0e-6,
            volume: 2.99e-6,
            mean_turn_length: 52.0e-3,
            path_length: 57.5e-3,
            permeability: 2000.0,
            bobbin_width: 15.0e-3,
            inductance_factor: None,
            shape: CoreShape::Rectangular {
                c: 7.5e-3,
                d: 17.5e-3,
                e: 17.5e-3,
                f: 7.0e-3,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::ee25;
    use super::*;

    #[test]
    fn test_derived_geometry() {
        let core = ee25();
        assert!((core.area_product() - 52.5e-6 * 61.0e-6).abs() < 1e-20);
        assert!((core.core_reluctance_length() - 57.5e-3 / 2000.0).abs() < 1e-15);
    }

    #[test]
    fn test_validate_rejects_zero_area() {
        let mut core = ee25();
        core.cross_section_area = 0.0;
        let err = core.validate(Stage::Electromagnetic).unwrap_err();
        assert!(err.to_string().contains("cross-section"), "{}", err);
    }

    #[test]
    fn test_deserialize_with_suffixes() {
        let json = r#"{
            "model": "ETD29",
            "cross_section_area": "76u",
            "window_area": "95u",
            "volume": "5.47u",
            "mean_turn_length": "52m",
            "path_length": "72m",
            "permeability": 2000,
            "bobbin_width": "19.4m",
            "shape": { "type": "round", "diameter": "9.8m" }
        }"#;
        let core: CoreSelection = serde_json::from_str(json).unwrap();
        assert_eq!(core.inductance_factor, None);
        match core.shape {
            CoreShape::Round { diameter } => assert!((diameter - 9.8e-3).abs() < 1e-12),
            other => panic!("expected round center leg, got {:?}", other),
        }
        assert!(core.validate(Stage::Winding).is_ok());
    }
}
