//! Magnetic-core models for the flyback designer.
//!
//! This crate provides:
//! - Core geometry records (`CoreSelection`, `CoreShape`)
//! - Air-gap length and fringing-flux factor
//! - AWG wire-gauge conversions

pub mod gap;
pub mod geometry;
pub mod wire;

pub use geometry::{CoreSelection, CoreShape};
pub use gap::{GapPoint, air_gap, evaluate_turns, fringing_factor};
pub use wire::{Awg, awg_from_diameter, diameter_from_awg};
