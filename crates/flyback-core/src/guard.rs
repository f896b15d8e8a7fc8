//! Precondition checks that turn invalid quantities into domain errors.
//!
//! Every formula whose denominator or argument depends on user input goes
//! through a [`Guard`], so a bad combination surfaces as [`Error::Domain`]
//! naming the stage and quantity instead of leaking `NaN`/`Inf` downstream.

use crate::error::{Error, Result, Stage};

/// Stage-scoped precondition checker.
#[derive(Debug, Clone, Copy)]
pub struct Guard {
    stage: Stage,
}

impl Guard {
    /// Create a guard that attributes failures to `stage`.
    pub fn new(stage: Stage) -> Self {
        Self { stage }
    }

    /// The stage this guard reports against.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Require a finite value.
    pub fn finite(&self, quantity: &str, value: f64) -> Result<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::domain(self.stage, quantity, "finite", value))
        }
    }

    /// Require a finite value strictly greater than zero.
    pub fn positive(&self, quantity: &str, value: f64) -> Result<f64> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(Error::domain(self.stage, quantity, "> 0", value))
        }
    }

    /// Require a finite value greater than or equal to zero.
    pub fn non_negative(&self, quantity: &str, value: f64) -> Result<f64> {
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(Error::domain(self.stage, quantity, ">= 0", value))
        }
    }

    /// Require a value in the open interval (0, 1).
    pub fn open_unit(&self, quantity: &str, value: f64) -> Result<f64> {
        if value > 0.0 && value < 1.0 {
            Ok(value)
        } else {
            Err(Error::domain(self.stage, quantity, "in (0, 1)", value))
        }
    }

    /// Require a value in the half-open interval (0, 1].
    pub fn unit(&self, quantity: &str, value: f64) -> Result<f64> {
        if value > 0.0 && value <= 1.0 {
            Ok(value)
        } else {
            Err(Error::domain(self.stage, quantity, "in (0, 1]", value))
        }
    }

    /// Divide, failing if the denominator is zero, negative or non-finite.
    ///
    /// `quantity` names the denominator.
    pub fn divide(&self, quantity: &str, numerator: f64, denominator: f64) -> Result<f64> {
        let denominator = self.positive(quantity, denominator)?;
        self.finite(quantity, numerator / denominator)
    }

    /// Square root of a non-negative value.
    pub fn sqrt(&self, quantity: &str, value: f64) -> Result<f64> {
        Ok(self.non_negative(quantity, value)?.sqrt())
    }
}
