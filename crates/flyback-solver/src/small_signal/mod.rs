//! Small-signal models of the regulation loop.
//!
//! - [`power_stage`] - control-to-output transfer function, CCM or DCM
//! - [`opto`] - TL431 type-II compensator behind an opto-coupler, and the
//!   loop gain it closes with the power stage and the post filter

pub mod opto;
pub mod power_stage;

pub use opto::{DividerDesign, OptoFeedbackResult};
pub use power_stage::PowerStageResult;
