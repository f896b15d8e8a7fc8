//! Flyback converter design stages.
//!
//! This crate provides:
//! - The eleven design stages, each a pure `run` function over its inputs
//!   and upstream results
//! - [`run_pipeline`] for a one-shot design on a chosen core
//! - [`DesignContext`] for interactive sessions with staleness tracking
//!
//! # Example
//!
//! ```
//! use flyback_core::DesignInputs;
//! use flyback_catalog::{CoreCatalog, MemoryCatalog};
//! use flyback_solver::run_pipeline;
//!
//! let catalog = MemoryCatalog::builtin().unwrap();
//! let core = catalog.lookup("EE25/13/7").unwrap();
//! let report = run_pipeline(&DesignInputs::default(), &core).unwrap();
//! assert!(report.is_complete());
//! ```

pub mod bulk;
pub mod context;
pub mod core_area;
pub mod electromagnetic;
pub mod filter;
pub mod output;
pub mod pipeline;
pub mod primary;
pub mod rectifier;
pub mod small_signal;
pub mod switch;
pub mod winding;

#[cfg(test)]
mod fixtures;

pub use bulk::BulkCapacitorResult;
pub use context::DesignContext;
pub use core_area::CoreAreaResult;
pub use electromagnetic::ElectromagneticResult;
pub use filter::FilterResult;
pub use output::{OutputResult, RailOutput};
pub use pipeline::{DesignReport, run_pipeline};
pub use primary::PrimaryResult;
pub use rectifier::RectifierResult;
pub use small_signal::{DividerDesign, OptoFeedbackResult, PowerStageResult};
pub use switch::{SenseResistor, SnubberDesign, SwitchResult};
pub use winding::{WindingDesign, WindingKind, WindingResult};
