//! Wire gauges and layer counts for every winding.

use std::f64::consts::PI;

use flyback_core::{DesignInputs, Error, Guard, Result, Stage};
use flyback_magnetics::{Awg, CoreSelection, awg_from_diameter};
use serde::{Deserialize, Serialize};

use crate::electromagnetic::ElectromagneticResult;
use crate::primary::PrimaryResult;

/// Which winding a [`WindingDesign`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindingKind {
    Primary,
    /// Secondary rail, zero-based.
    Secondary(usize),
    Auxiliary,
}

impl std::fmt::Display for WindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindingKind::Primary => write!(f, "primary"),
            WindingKind::Secondary(i) => write!(f, "secondary {}", i + 1),
            WindingKind::Auxiliary => write!(f, "auxiliary"),
        }
    }
}

/// Wire selection for one winding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindingDesign {
    pub kind: WindingKind,
    /// Turns count.
    pub turns: u32,
    /// Share of total output power (1 for the primary).
    pub load_fraction: f64,
    /// Share of the usable window.
    pub window_fraction: f64,
    /// RMS winding current (A).
    pub rms_current: f64,
    /// Copper area allotted per turn (m²).
    pub copper_area: f64,
    /// Continuous AWG number of the allotted area.
    pub awg_exact: f64,
    /// Standard gauge.
    pub gauge: Awg,
    /// Bare wire diameter of the gauge (m).
    pub wire_diameter: f64,
    /// Bare copper area of the gauge (m²).
    pub wire_area: f64,
    /// Current density in the chosen wire (A/m²).
    pub current_density: f64,
    /// Diameter including insulation (m).
    pub outer_diameter: f64,
    /// Turns that fit across the bobbin.
    pub turns_per_layer: u32,
    /// Layers needed (fractional).
    pub layers: f64,
}

/// Winding stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindingResult {
    pub primary: WindingDesign,
    pub secondaries: Vec<WindingDesign>,
    pub auxiliary: Option<WindingDesign>,
}

impl WindingResult {
    /// All windings: primary, secondaries, auxiliary.
    pub fn iter(&self) -> impl Iterator<Item = &WindingDesign> {
        std::iter::once(&self.primary)
            .chain(&self.secondaries)
            .chain(self.auxiliary.as_ref())
    }

    /// Rail windings in winding order: secondaries, then auxiliary.
    pub fn rails(&self) -> impl Iterator<Item = &WindingDesign> {
        self.secondaries.iter().chain(self.auxiliary.as_ref())
    }
}

/// Size the wire for one winding.
#[allow(clippy::too_many_arguments)]
fn design_winding(
    kind: WindingKind,
    turns: u32,
    load_fraction: f64,
    window_fraction: f64,
    rms_current: f64,
    inputs: &DesignInputs,
    core: &CoreSelection,
    g: &Guard,
) -> Result<WindingDesign> {
    let limits = &inputs.transformer;
    let copper_area = g.divide(
        &format!("{} turns", kind),
        limits.window_utilization * core.window_area * window_fraction,
        turns as f64,
    )?;
    let (awg_exact, gauge) = if copper_area > 0.0 {
        let bare_diameter = (4.0 * copper_area / PI).sqrt();
        (awg_from_diameter(bare_diameter), Awg::for_diameter(bare_diameter))
    } else {
        // No window share: the rail draws no current
        log::warn!(
            "{}: {} carries no load; using {}",
            g.stage(),
            kind,
            Awg::THINNEST
        );
        (Awg::THINNEST.0 as f64, Awg::THINNEST)
    };
    let wire_diameter = gauge.diameter();
    let wire_area = gauge.area();
    let current_density = rms_current / wire_area;
    let outer_diameter = wire_diameter + limits.insulation_build;

    let usable_width = core.bobbin_width - 2.0 * limits.margin_tape;
    let turns_per_layer = (usable_width / outer_diameter).floor();
    if turns_per_layer.is_nan() || turns_per_layer < 1.0 {
        return Err(Error::domain(
            g.stage(),
            format!("{} turns per layer", kind),
            ">= 1",
            turns_per_layer,
        ));
    }
    let turns_per_layer = turns_per_layer as u32;
    let layers = turns as f64 / turns_per_layer as f64;

    if current_density > limits.current_density_max {
        log::warn!(
            "{}: {} current density {:.3e} A/m^2 exceeds {:.3e} A/m^2",
            g.stage(),
            kind,
            current_density,
            limits.current_density_max
        );
    }
    log::debug!(
        "{}: {} N={} I_rms={:.3} A {} ({:.2}) {:.2} layers",
        g.stage(),
        kind,
        turns,
        rms_current,
        gauge,
        awg_exact,
        layers
    );

    Ok(WindingDesign {
        kind,
        turns,
        load_fraction,
        window_fraction,
        rms_current,
        copper_area,
        awg_exact,
        gauge,
        wire_diameter,
        wire_area,
        current_density,
        outer_diameter,
        turns_per_layer,
        layers,
    })
}

/// Select wire for the primary, every secondary and the auxiliary winding.
pub fn run(
    inputs: &DesignInputs,
    core: &CoreSelection,
    primary: &PrimaryResult,
    em: &ElectromagneticResult,
) -> Result<WindingResult> {
    let stage = Stage::Winding;
    inputs.validate(stage)?;
    core.validate(stage)?;
    let g = Guard::new(stage);

    let kp = inputs.transformer.primary_window_fraction;
    let duty = g.open_unit("actual duty cycle", em.duty_actual)?;
    let vf = inputs.diode_drop_secondary;

    let primary_winding = design_winding(
        WindingKind::Primary,
        em.primary_turns,
        1.0,
        kp,
        primary.current_rms,
        inputs,
        core,
        &g,
    )?;

    let n_secondaries = inputs.outputs.len();
    let mut secondaries = Vec::with_capacity(n_secondaries);
    let mut auxiliary = None;
    for (index, (rail, &turns)) in inputs.rails().zip(&em.rail_turns).enumerate() {
        let kind = if index < n_secondaries {
            WindingKind::Secondary(index)
        } else {
            WindingKind::Auxiliary
        };
        let load_fraction = inputs.load_fraction(rail);
        let rms_current = primary.current_rms
            * ((1.0 - duty) / duty).sqrt()
            * em.reflected_volt_actual
            * load_fraction
            / (rail.voltage + vf);
        let design = design_winding(
            kind,
            turns,
            load_fraction,
            (1.0 - kp) * load_fraction,
            rms_current,
            inputs,
            core,
            &g,
        )?;
        match kind {
            WindingKind::Auxiliary => auxiliary = Some(design),
            _ => secondaries.push(design),
        }
    }

    log::info!(
        "{}: primary {} x{}, {} secondary windings",
        stage,
        primary_winding.gauge,
        primary_winding.turns,
        secondaries.len()
    );

    Ok(WindingResult {
        primary: primary_winding,
        secondaries,
        auxiliary,
    })
}
