//! User-entered design constants.
//!
//! All quantities are SI base units. Every record deserializes with
//! defaults, so a design file only needs the fields that differ from the
//! reference 12 V / 2 A universal-input design.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, Stage};
use crate::guard::Guard;
use crate::sweep::SweepSpec;
use crate::units::si;

/// Maximum number of secondary output rails (auxiliary excluded).
pub const MAX_OUTPUTS: usize = 4;

/// One output rail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputRail {
    /// Regulated output voltage (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub voltage: f64,
    /// Full-load output current (A).
    #[serde(deserialize_with = "si::deserialize")]
    pub current: f64,
}

impl OutputRail {
    pub fn new(voltage: f64, current: f64) -> Self {
        Self { voltage, current }
    }

    /// Output power (W).
    pub fn power(&self) -> f64 {
        self.voltage * self.current
    }
}

/// How the nominal primary turns count is estimated before the gap iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TurnsMethod {
    /// `N = L·Ipk / (Bmax·Ac)`.
    #[default]
    PeakFlux,
    /// `N = √(L / AL)`; falls back to the core record's AL when `al` is absent.
    InductanceFactor {
        #[serde(default, deserialize_with = "si::deserialize_option")]
        al: Option<f64>,
    },
    /// Turns that fill the primary's share of the usable window at `Jmax`.
    WindowArea,
}

/// Converter operating regime, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConductionMode {
    /// Continuous conduction mode.
    Ccm,
    /// Discontinuous conduction mode.
    Dcm,
}

impl ConductionMode {
    /// A ripple factor of one puts the design at the DCM boundary.
    pub fn from_ripple_factor(ripple_factor: f64) -> Self {
        if ripple_factor >= 1.0 {
            ConductionMode::Dcm
        } else {
            ConductionMode::Ccm
        }
    }
}

impl std::fmt::Display for ConductionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConductionMode::Ccm => write!(f, "CCM"),
            ConductionMode::Dcm => write!(f, "DCM"),
        }
    }
}

/// Magnetic design limits and turns estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerLimits {
    /// Window utilization factor Ku.
    #[serde(deserialize_with = "si::deserialize")]
    pub window_utilization: f64,
    /// Maximum winding current density (A/m²).
    #[serde(deserialize_with = "si::deserialize")]
    pub current_density_max: f64,
    /// Saturation-limited peak flux density (T).
    #[serde(deserialize_with = "si::deserialize")]
    pub flux_density_max: f64,
    /// Nominal turns estimation method.
    pub turns_method: TurnsMethod,
    /// Insulation added to the bare wire diameter (m).
    #[serde(deserialize_with = "si::deserialize")]
    pub insulation_build: f64,
    /// Creepage margin tape on each side of the bobbin (m).
    #[serde(deserialize_with = "si::deserialize")]
    pub margin_tape: f64,
    /// Fraction of the usable window allocated to the primary.
    #[serde(deserialize_with = "si::deserialize")]
    pub primary_window_fraction: f64,
    /// Iteration cap for the turns search.
    pub max_iterations: usize,
}

impl Default for TransformerLimits {
    fn default() -> Self {
        Self {
            window_utilization: 0.3,
            current_density_max: 4e6,
            flux_density_max: 0.3,
            turns_method: TurnsMethod::PeakFlux,
            insulation_build: 0.05e-3,
            margin_tape: 0.0,
            primary_window_fraction: 0.5,
            max_iterations: 1000,
        }
    }
}

impl TransformerLimits {
    /// Set the flux density limit.
    pub fn with_flux_density_max(mut self, b_max: f64) -> Self {
        self.flux_density_max = b_max;
        self
    }

    /// Set the window utilization factor.
    pub fn with_window_utilization(mut self, ku: f64) -> Self {
        self.window_utilization = ku;
        self
    }

    /// Set the turns estimation method.
    pub fn with_turns_method(mut self, method: TurnsMethod) -> Self {
        self.turns_method = method;
        self
    }

    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Primary MOSFET, gate drive and current-sense parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchParams {
    /// On-resistance at 25 °C (Ω).
    #[serde(deserialize_with = "si::deserialize")]
    pub rds_on: f64,
    /// Relative on-resistance increase per °C above 25 °C.
    #[serde(deserialize_with = "si::deserialize")]
    pub rds_tempco: f64,
    /// Total gate charge Qg (C).
    #[serde(deserialize_with = "si::deserialize")]
    pub gate_charge: f64,
    /// Gate-source charge Qgs (C).
    #[serde(deserialize_with = "si::deserialize")]
    pub gate_source_charge: f64,
    /// Gate-drain (Miller) charge Qgd (C).
    #[serde(deserialize_with = "si::deserialize")]
    pub gate_drain_charge: f64,
    /// Output capacitance Coss (F).
    #[serde(deserialize_with = "si::deserialize")]
    pub output_capacitance: f64,
    /// Total gate resistance, driver plus internal (Ω).
    #[serde(deserialize_with = "si::deserialize")]
    pub gate_resistance: f64,
    /// Gate drive voltage (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub drive_voltage: f64,
    /// Miller plateau voltage (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub miller_voltage: f64,
    /// Current-sense comparator threshold (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub sense_voltage: f64,
    /// Slope compensation ratio Se/Sn.
    #[serde(deserialize_with = "si::deserialize")]
    pub slope_compensation: f64,
}

impl Default for SwitchParams {
    fn default() -> Self {
        Self {
            rds_on: 1.2,
            rds_tempco: 0.007,
            gate_charge: 20e-9,
            gate_source_charge: 4e-9,
            gate_drain_charge: 8e-9,
            output_capacitance: 50e-12,
            gate_resistance: 10.0,
            drive_voltage: 12.0,
            miller_voltage: 5.0,
            sense_voltage: 1.0,
            slope_compensation: 0.5,
        }
    }
}

/// Opto-coupler and shunt-regulator feedback parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackParams {
    /// Opto-coupler current transfer ratio.
    #[serde(deserialize_with = "si::deserialize")]
    pub ctr: f64,
    /// Pull-up resistor on the controller feedback pin, R_B (Ω).
    #[serde(deserialize_with = "si::deserialize")]
    pub pullup_resistance: f64,
    /// Feedback pin pull-up voltage (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub pullup_voltage: f64,
    /// Opto LED forward voltage (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub led_forward_voltage: f64,
    /// Shunt regulator reference voltage (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub reference_voltage: f64,
    /// Minimum shunt regulator cathode voltage (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub cathode_voltage_min: f64,
    /// Minimum shunt regulator bias current (A).
    #[serde(deserialize_with = "si::deserialize")]
    pub bias_current: f64,
    /// Sense divider current (A).
    #[serde(deserialize_with = "si::deserialize")]
    pub divider_current: f64,
    /// Target loop crossover frequency (Hz); derived when absent.
    #[serde(deserialize_with = "si::deserialize_option")]
    pub crossover_frequency: Option<f64>,
}

impl Default for FeedbackParams {
    fn default() -> Self {
        Self {
            ctr: 1.0,
            pullup_resistance: 4.7e3,
            pullup_voltage: 5.0,
            led_forward_voltage: 1.0,
            reference_voltage: 2.5,
            cathode_voltage_min: 2.5,
            bias_current: 1e-3,
            divider_current: 1e-3,
            crossover_frequency: None,
        }
    }
}

/// The complete set of user-entered design constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignInputs {
    /// Minimum AC line voltage (V RMS).
    #[serde(deserialize_with = "si::deserialize")]
    pub input_volt_ac_min: f64,
    /// Maximum AC line voltage (V RMS).
    #[serde(deserialize_with = "si::deserialize")]
    pub input_volt_ac_max: f64,
    /// Line frequency (Hz).
    #[serde(deserialize_with = "si::deserialize")]
    pub freq_line: f64,
    /// Switching frequency (Hz).
    #[serde(deserialize_with = "si::deserialize")]
    pub freq_switch: f64,
    /// Ambient temperature (°C).
    #[serde(deserialize_with = "si::deserialize")]
    pub temp_ambient: f64,
    /// Secondary output rails, main rail first.
    pub outputs: Vec<OutputRail>,
    /// Auxiliary (bias) winding rail.
    pub aux: Option<OutputRail>,
    /// Converter efficiency.
    #[serde(deserialize_with = "si::deserialize")]
    pub efficiency: f64,
    /// Output power margin as a fraction.
    #[serde(deserialize_with = "si::deserialize")]
    pub power_margin: f64,
    /// Reflected output voltage target V_RO (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub reflected_volt: f64,
    /// Leakage voltage spike allowance (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub volt_spike: f64,
    /// Current ripple factor K_RF = ΔI / (2·I_EDC).
    #[serde(deserialize_with = "si::deserialize")]
    pub ripple_factor: f64,
    /// Transformer efficiency; sets the copper-loss budget.
    #[serde(deserialize_with = "si::deserialize")]
    pub transformer_efficiency: f64,
    /// Output rectifier forward drop (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub diode_drop_secondary: f64,
    /// Bridge diode forward drop (V).
    #[serde(deserialize_with = "si::deserialize")]
    pub diode_drop_bridge: f64,
    /// Primary leakage inductance (H).
    #[serde(deserialize_with = "si::deserialize")]
    pub leakage_inductance: f64,
    /// Allowed output ripple as a fraction of the rail voltage.
    #[serde(deserialize_with = "si::deserialize")]
    pub output_ripple_ratio: f64,
    /// Post-filter cutoff frequency (Hz); f_sw/10 when absent.
    #[serde(deserialize_with = "si::deserialize_option")]
    pub filter_cutoff: Option<f64>,
    pub transformer: TransformerLimits,
    pub switch: SwitchParams,
    pub feedback: FeedbackParams,
    /// Frequency sweep for the post-filter response.
    pub filter_sweep: SweepSpec,
    /// Frequency sweep for the small-signal models.
    pub loop_sweep: SweepSpec,
}

impl Default for DesignInputs {
    fn default() -> Self {
        Self {
            input_volt_ac_min: 185.0,
            input_volt_ac_max: 265.0,
            freq_line: 50.0,
            freq_switch: 65e3,
            temp_ambient: 40.0,
            outputs: vec![OutputRail::new(12.0, 2.0)],
            aux: None,
            efficiency: 0.8,
            power_margin: 0.1,
            reflected_volt: 90.0,
            volt_spike: 100.0,
            ripple_factor: 0.6,
            transformer_efficiency: 0.95,
            diode_drop_secondary: 0.5,
            diode_drop_bridge: 1.0,
            leakage_inductance: 20e-6,
            output_ripple_ratio: 0.01,
            filter_cutoff: None,
            transformer: TransformerLimits::default(),
            switch: SwitchParams::default(),
            feedback: FeedbackParams::default(),
            filter_sweep: SweepSpec::log(10.0, 1e6, 50),
            loop_sweep: SweepSpec::log(10.0, 10e6, 50),
        }
    }
}

impl DesignInputs {
    /// Set the AC line range.
    pub fn with_line(mut self, volt_ac_min: f64, volt_ac_max: f64, freq_line: f64) -> Self {
        self.input_volt_ac_min = volt_ac_min;
        self.input_volt_ac_max = volt_ac_max;
        self.freq_line = freq_line;
        self
    }

    /// Replace the secondary rails.
    pub fn with_outputs(mut self, outputs: Vec<OutputRail>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Set the auxiliary rail.
    pub fn with_aux(mut self, aux: OutputRail) -> Self {
        self.aux = Some(aux);
        self
    }

    /// Set the converter efficiency.
    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = efficiency;
        self
    }

    /// Set the ripple factor.
    pub fn with_ripple_factor(mut self, ripple_factor: f64) -> Self {
        self.ripple_factor = ripple_factor;
        self
    }

    /// Set the transformer limits.
    pub fn with_transformer(mut self, transformer: TransformerLimits) -> Self {
        self.transformer = transformer;
        self
    }

    /// All rails in winding order: secondaries, then the auxiliary rail.
    pub fn rails(&self) -> impl Iterator<Item = &OutputRail> {
        self.outputs.iter().chain(self.aux.iter())
    }

    /// The main regulated rail.
    pub fn main_rail(&self) -> Option<&OutputRail> {
        self.outputs.first()
    }

    /// Total output power over all rails (W).
    pub fn power_out(&self) -> f64 {
        self.rails().map(OutputRail::power).sum()
    }

    /// Output power including margin (W).
    pub fn power_out_max(&self) -> f64 {
        self.power_out() * (1.0 + self.power_margin)
    }

    /// Input power at full load (W).
    pub fn power_in(&self) -> f64 {
        self.power_out_max() / self.efficiency
    }

    /// Share of total output power delivered by `rail`.
    pub fn load_fraction(&self, rail: &OutputRail) -> f64 {
        let total = self.power_out();
        if total > 0.0 { rail.power() / total } else { 0.0 }
    }

    /// Operating regime implied by the ripple factor.
    pub fn conduction_mode(&self) -> ConductionMode {
        ConductionMode::from_ripple_factor(self.ripple_factor)
    }

    /// Post-filter corner frequency (Hz).
    pub fn filter_cutoff(&self) -> f64 {
        self.filter_cutoff.unwrap_or(self.freq_switch / 10.0)
    }

    /// Check the invariants every stage relies on.
    ///
    /// Failures are attributed to `stage`, the stage that was about to run.
    pub fn validate(&self, stage: Stage) -> Result<()> {
        let g = Guard::new(stage);
        g.positive("input_volt_ac_min", self.input_volt_ac_min)?;
        g.positive("input_volt_ac_max", self.input_volt_ac_max)?;
        if self.input_volt_ac_max < self.input_volt_ac_min {
            return Err(Error::domain(
                stage,
                "input_volt_ac_max",
                format!(">= input_volt_ac_min ({})", self.input_volt_ac_min),
                self.input_volt_ac_max,
            ));
        }
        g.positive("freq_line", self.freq_line)?;
        g.positive("freq_switch", self.freq_switch)?;
        g.finite("temp_ambient", self.temp_ambient)?;
        g.open_unit("efficiency", self.efficiency)?;
        g.non_negative("power_margin", self.power_margin)?;
        g.positive("reflected_volt", self.reflected_volt)?;
        g.positive("volt_spike", self.volt_spike)?;
        g.unit("ripple_factor", self.ripple_factor)?;
        g.unit("transformer_efficiency", self.transformer_efficiency)?;
        g.non_negative("diode_drop_secondary", self.diode_drop_secondary)?;
        g.non_negative("diode_drop_bridge", self.diode_drop_bridge)?;
        g.positive("leakage_inductance", self.leakage_inductance)?;
        g.open_unit("output_ripple_ratio", self.output_ripple_ratio)?;
        g.positive("filter_cutoff", self.filter_cutoff())?;

        if self.outputs.is_empty() || self.outputs.len() > MAX_OUTPUTS {
            return Err(Error::domain(
                stage,
                "number of outputs",
                format!("between 1 and {}", MAX_OUTPUTS),
                self.outputs.len() as f64,
            ));
        }
        for (i, rail) in self.rails().enumerate() {
            g.positive(&format!("rail {} voltage", i + 1), rail.voltage)?;
            g.non_negative(&format!("rail {} current", i + 1), rail.current)?;
        }
        g.positive("total output power", self.power_out())?;

        let t = &self.transformer;
        g.unit("window_utilization", t.window_utilization)?;
        g.positive("current_density_max", t.current_density_max)?;
        g.positive("flux_density_max", t.flux_density_max)?;
        g.non_negative("insulation_build", t.insulation_build)?;
        g.non_negative("margin_tape", t.margin_tape)?;
        g.open_unit("primary_window_fraction", t.primary_window_fraction)?;
        if t.max_iterations == 0 {
            return Err(Error::domain(stage, "max_iterations", ">= 1", 0.0));
        }
        if let TurnsMethod::InductanceFactor { al: Some(al) } = t.turns_method {
            g.positive("inductance factor", al)?;
        }
        Ok(())
    }
}
