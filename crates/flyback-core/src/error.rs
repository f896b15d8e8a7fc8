//! Error types for the design pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stage of the design pipeline, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Rectified-input bulk capacitor sizing.
    BulkCapacitor,
    /// Diode bridge current stresses.
    RectifierBridge,
    /// Duty cycle, magnetizing inductance and primary current waveform.
    PrimaryElectrical,
    /// Area product and geometry coefficient.
    CoreArea,
    /// Turns count, air gap and actual flux density.
    Electromagnetic,
    /// Wire gauges and layer counts.
    Winding,
    /// MOSFET stresses, losses, snubber and sense resistor.
    Switch,
    /// Output rectifier and capacitor sizing.
    Output,
    /// Second-stage LC post filter.
    OutputFilter,
    /// Control-to-output transfer function.
    PowerStageSmallSignal,
    /// Opto-coupler / shunt-regulator compensation and loop gain.
    OptoFeedback,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 11] = [
        Stage::BulkCapacitor,
        Stage::RectifierBridge,
        Stage::PrimaryElectrical,
        Stage::CoreArea,
        Stage::Electromagnetic,
        Stage::Winding,
        Stage::Switch,
        Stage::Output,
        Stage::OutputFilter,
        Stage::PowerStageSmallSignal,
        Stage::OptoFeedback,
    ];

    /// Human-readable stage name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::BulkCapacitor => "bulk capacitor",
            Stage::RectifierBridge => "rectifier bridge",
            Stage::PrimaryElectrical => "primary electrical",
            Stage::CoreArea => "core area",
            Stage::Electromagnetic => "electromagnetic",
            Stage::Winding => "winding",
            Stage::Switch => "switch",
            Stage::Output => "output",
            Stage::OutputFilter => "output filter",
            Stage::PowerStageSmallSignal => "power stage small-signal",
            Stage::OptoFeedback => "opto feedback",
        }
    }

    /// Upstream stages whose results this stage consumes.
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Stage::BulkCapacitor => &[],
            Stage::RectifierBridge => &[Stage::BulkCapacitor],
            Stage::PrimaryElectrical => &[Stage::BulkCapacitor, Stage::RectifierBridge],
            Stage::CoreArea => &[Stage::PrimaryElectrical],
            Stage::Electromagnetic => &[Stage::PrimaryElectrical, Stage::CoreArea],
            Stage::Winding => &[Stage::PrimaryElectrical, Stage::Electromagnetic],
            Stage::Switch => &[Stage::PrimaryElectrical, Stage::Electromagnetic],
            Stage::Output => &[
                Stage::PrimaryElectrical,
                Stage::Electromagnetic,
                Stage::Winding,
            ],
            Stage::OutputFilter => &[Stage::PrimaryElectrical, Stage::Output],
            Stage::PowerStageSmallSignal => &[
                Stage::PrimaryElectrical,
                Stage::Electromagnetic,
                Stage::Switch,
                Stage::Output,
            ],
            Stage::OptoFeedback => &[
                Stage::Electromagnetic,
                Stage::Winding,
                Stage::Switch,
                Stage::Output,
                Stage::OutputFilter,
                Stage::PowerStageSmallSignal,
            ],
        }
    }

    /// Whether this stage reads the selected core geometry.
    pub fn uses_core(&self) -> bool {
        matches!(self, Stage::Electromagnetic | Stage::Winding)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by the design pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A formula precondition was violated.
    #[error("{stage}: {quantity} must be {requirement}, got {value}")]
    Domain {
        stage: Stage,
        quantity: String,
        requirement: String,
        value: f64,
    },

    /// The turns-count search did not satisfy the flux-density bound.
    #[error(
        "{stage}: flux density did not fall to {limit} T within {iterations} iterations (last {flux_density} T)"
    )]
    Convergence {
        stage: Stage,
        iterations: usize,
        flux_density: f64,
        limit: f64,
    },

    /// An upstream result changed after this stage's inputs were captured.
    #[error("{stage}: upstream {upstream} is stale; re-run it first")]
    StaleInput { stage: Stage, upstream: String },

    /// A required upstream stage has not been run.
    #[error("{stage}: requires {missing} to run first")]
    MissingStage { stage: Stage, missing: String },

    /// A value could not be parsed.
    #[error("invalid value '{text}': {reason}")]
    InvalidValue { text: String, reason: String },
}

impl Error {
    /// Construct a domain error.
    pub fn domain(
        stage: Stage,
        quantity: impl Into<String>,
        requirement: impl Into<String>,
        value: f64,
    ) -> Self {
        Error::Domain {
            stage,
            quantity: quantity.into(),
            requirement: requirement.into(),
            value,
        }
    }

    /// The stage that raised this error, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Domain { stage, .. }
            | Error::Convergence { stage, .. }
            | Error::StaleInput { stage, .. }
            | Error::MissingStage { stage, .. } => Some(*stage),
            Error::InvalidValue { .. } => None,
        }
    }
}

/// Result type for design operations.
pub type Result<T> = std::result::Result<T, Error>;
