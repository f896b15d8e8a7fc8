//! Core types for the flyback converter designer.
//!
//! This crate provides:
//! - Design inputs and parameter records with serde defaults
//! - The error taxonomy shared by every pipeline stage
//! - Stage-scoped input guards
//! - SI magnitude-suffix parsing
//! - Frequency sweeps, pole/zero transfer functions and Bode data

pub mod bode;
pub mod constants;
pub mod error;
pub mod guard;
pub mod inputs;
pub mod sweep;
pub mod units;

pub use bode::{Factor, TransferFunction};
pub use error::{Error, Result, Stage};
pub use guard::Guard;
pub use inputs::{
    ConductionMode, DesignInputs, FeedbackParams, MAX_OUTPUTS, OutputRail, SwitchParams,
    TransformerLimits, TurnsMethod,
};
pub use sweep::{BodePlot, SweepSpec};
pub use units::parse_value;
