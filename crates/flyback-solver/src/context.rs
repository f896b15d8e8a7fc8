//! Interactive design session with staleness tracking.
//!
//! A [`DesignContext`] holds the inputs, the selected core and one slot per
//! stage. Each slot records the logical time at which it was computed;
//! editing the inputs or the core, or re-running an upstream stage, makes
//! downstream results stale without discarding them. Running a stage whose
//! upstream is missing or stale fails instead of silently mixing old and
//! new values.

use flyback_core::{DesignInputs, Error, Result, Stage};
use flyback_magnetics::CoreSelection;

use crate::bulk::{self, BulkCapacitorResult};
use crate::core_area::{self, CoreAreaResult};
use crate::electromagnetic::{self, ElectromagneticResult};
use crate::filter::{self, FilterResult};
use crate::output::{self, OutputResult};
use crate::pipeline::DesignReport;
use crate::primary::{self, PrimaryResult};
use crate::rectifier::{self, RectifierResult};
use crate::small_signal::opto::{self, OptoFeedbackResult};
use crate::small_signal::power_stage::{self, PowerStageResult};
use crate::switch::{self, SwitchResult};
use crate::winding::{self, WindingResult};

/// A stage result stamped with the logical time it was computed at.
#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    computed_at: u64,
}

/// A design session.
#[derive(Debug, Clone)]
pub struct DesignContext {
    inputs: DesignInputs,
    core: Option<CoreSelection>,
    clock: u64,
    inputs_changed_at: u64,
    core_changed_at: u64,
    bulk: Option<Slot<BulkCapacitorResult>>,
    rectifier: Option<Slot<RectifierResult>>,
    primary: Option<Slot<PrimaryResult>>,
    core_area: Option<Slot<CoreAreaResult>>,
    electromagnetic: Option<Slot<ElectromagneticResult>>,
    winding: Option<Slot<WindingResult>>,
    switch: Option<Slot<SwitchResult>>,
    output: Option<Slot<OutputResult>>,
    filter: Option<Slot<FilterResult>>,
    power_stage: Option<Slot<PowerStageResult>>,
    opto: Option<Slot<OptoFeedbackResult>>,
}

impl DesignContext {
    /// Start a session with `inputs` and no core selected.
    pub fn new(inputs: DesignInputs) -> Self {
        Self {
            inputs,
            core: None,
            clock: 0,
            inputs_changed_at: 0,
            core_changed_at: 0,
            bulk: None,
            rectifier: None,
            primary: None,
            core_area: None,
            electromagnetic: None,
            winding: None,
            switch: None,
            output: None,
            filter: None,
            power_stage: None,
            opto: None,
        }
    }

    /// Start a session with a core already selected.
    pub fn with_core(mut self, core: CoreSelection) -> Self {
        self.set_core(core);
        self
    }

    pub fn inputs(&self) -> &DesignInputs {
        &self.inputs
    }

    pub fn core(&self) -> Option<&CoreSelection> {
        self.core.as_ref()
    }

    /// Replace the design inputs. Every existing result becomes stale.
    pub fn set_inputs(&mut self, inputs: DesignInputs) {
        self.clock += 1;
        self.inputs_changed_at = self.clock;
        self.inputs = inputs;
        self.warn_stale("inputs changed");
    }

    /// Replace the core. Results of stages that read the core, and
    /// everything downstream of them, become stale.
    pub fn set_core(&mut self, core: CoreSelection) {
        self.clock += 1;
        self.core_changed_at = self.clock;
        log::debug!("core set to {}", core.model);
        self.core = Some(core);
        self.warn_stale("core changed");
    }

    fn warn_stale(&self, reason: &str) {
        let stale = self.stale_stages();
        if !stale.is_empty() {
            let names: Vec<&str> = stale.iter().map(Stage::name).collect();
            log::warn!("{}; stale results: {}", reason, names.join(", "));
        }
    }

    /// Logical time `stage` was last computed, if it has a result.
    fn computed_at(&self, stage: Stage) -> Option<u64> {
        match stage {
            Stage::BulkCapacitor => self.bulk.as_ref().map(|s| s.computed_at),
            Stage::RectifierBridge => self.rectifier.as_ref().map(|s| s.computed_at),
            Stage::PrimaryElectrical => self.primary.as_ref().map(|s| s.computed_at),
            Stage::CoreArea => self.core_area.as_ref().map(|s| s.computed_at),
            Stage::Electromagnetic => self.electromagnetic.as_ref().map(|s| s.computed_at),
            Stage::Winding => self.winding.as_ref().map(|s| s.computed_at),
            Stage::Switch => self.switch.as_ref().map(|s| s.computed_at),
            Stage::Output => self.output.as_ref().map(|s| s.computed_at),
            Stage::OutputFilter => self.filter.as_ref().map(|s| s.computed_at),
            Stage::PowerStageSmallSignal => self.power_stage.as_ref().map(|s| s.computed_at),
            Stage::OptoFeedback => self.opto.as_ref().map(|s| s.computed_at),
        }
    }

    /// Whether `stage` has a result.
    pub fn has_result(&self, stage: Stage) -> bool {
        self.computed_at(stage).is_some()
    }

    /// Whether `stage` has a result computed from superseded inputs.
    ///
    /// A stage without a result is not stale.
    pub fn is_stale(&self, stage: Stage) -> bool {
        let Some(at) = self.computed_at(stage) else {
            return false;
        };
        if self.inputs_changed_at > at || (stage.uses_core() && self.core_changed_at > at) {
            return true;
        }
        stage.dependencies().iter().any(|&dep| match self.computed_at(dep) {
            None => true,
            Some(dep_at) => dep_at > at || self.is_stale(dep),
        })
    }

    /// All stages whose results are stale, in execution order.
    pub fn stale_stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|&s| self.is_stale(s))
            .collect()
    }

    /// Check that every upstream result of `stage` is present and fresh.
    fn check_upstream(&self, stage: Stage) -> Result<()> {
        if stage.uses_core() && self.core.is_none() {
            return Err(Error::MissingStage {
                stage,
                missing: "core selection".to_string(),
            });
        }
        for &dep in stage.dependencies() {
            if !self.has_result(dep) {
                return Err(Error::MissingStage {
                    stage,
                    missing: dep.name().to_string(),
                });
            }
            if self.is_stale(dep) {
                return Err(Error::StaleInput {
                    stage,
                    upstream: dep.name().to_string(),
                });
            }
        }
        Ok(())
    }

    fn stamp<T>(&mut self, value: T) -> Slot<T> {
        self.clock += 1;
        Slot {
            value,
            computed_at: self.clock,
        }
    }

    fn missing(stage: Stage, what: Stage) -> Error {
        Error::MissingStage {
            stage,
            missing: what.name().to_string(),
        }
    }

    fn selected_core(&self, stage: Stage) -> Result<&CoreSelection> {
        self.core.as_ref().ok_or_else(|| Error::MissingStage {
            stage,
            missing: "core selection".to_string(),
        })
    }

    pub fn run_bulk_capacitor(&mut self) -> Result<&BulkCapacitorResult> {
        self.check_upstream(Stage::BulkCapacitor)?;
        let result = bulk::run(&self.inputs)?;
        let slot = self.stamp(result);
        Ok(&self.bulk.insert(slot).value)
    }

    pub fn run_rectifier_bridge(&mut self) -> Result<&RectifierResult> {
        let stage = Stage::RectifierBridge;
        self.check_upstream(stage)?;
        let result = {
            let bulk = self.bulk_capacitor().ok_or_else(|| Self::missing(stage, Stage::BulkCapacitor))?;
            rectifier::run(&self.inputs, bulk)?
        };
        let slot = self.stamp(result);
        Ok(&self.rectifier.insert(slot).value)
    }

    pub fn run_primary_electrical(&mut self) -> Result<&PrimaryResult> {
        let stage = Stage::PrimaryElectrical;
        self.check_upstream(stage)?;
        let result = {
            let bulk = self.bulk_capacitor().ok_or_else(|| Self::missing(stage, Stage::BulkCapacitor))?;
            let rect = self
                .rectifier_bridge()
                .ok_or_else(|| Self::missing(stage, Stage::RectifierBridge))?;
            primary::run(&self.inputs, bulk, rect)?
        };
        let slot = self.stamp(result);
        Ok(&self.primary.insert(slot).value)
    }

    pub fn run_core_area(&mut self) -> Result<&CoreAreaResult> {
        let stage = Stage::CoreArea;
        self.check_upstream(stage)?;
        let result = {
            let primary = self
                .primary_electrical()
                .ok_or_else(|| Self::missing(stage, Stage::PrimaryElectrical))?;
            core_area::run(&self.inputs, primary)?
        };
        let slot = self.stamp(result);
        Ok(&self.core_area.insert(slot).value)
    }

    pub fn run_electromagnetic(&mut self) -> Result<&ElectromagneticResult> {
        let stage = Stage::Electromagnetic;
        self.check_upstream(stage)?;
        let result = {
            let core = self.selected_core(stage)?;
            let primary = self
                .primary_electrical()
                .ok_or_else(|| Self::missing(stage, Stage::PrimaryElectrical))?;
            let area = self
                .core_area()
                .ok_or_else(|| Self::missing(stage, Stage::CoreArea))?;
            electromagnetic::run(&self.inputs, core, primary, area)?
        };
        let slot = self.stamp(result);
        Ok(&self.electromagnetic.insert(slot).value)
    }

    pub fn run_winding(&mut self) -> Result<&WindingResult> {
        let stage = Stage::Winding;
        self.check_upstream(stage)?;
        let result = {
            let core = self.selected_core(stage)?;
            let primary = self
                .primary_electrical()
                .ok_or_else(|| Self::missing(stage, Stage::PrimaryElectrical))?;
            let em = self
                .electromagnetic()
                .ok_or_else(|| Self::missing(stage, Stage::Electromagnetic))?;
            winding::run(&self.inputs, core, primary, em)?
        };
        let slot = self.stamp(result);
        Ok(&self.winding.insert(slot).value)
    }

    pub fn run_switch(&mut self) -> Result<&SwitchResult> {
        let stage = Stage::Switch;
        self.check_upstream(stage)?;
        let result = {
            let primary = self
                .primary_electrical()
                .ok_or_else(|| Self::missing(stage, Stage::PrimaryElectrical))?;
            let em = self
                .electromagnetic()
                .ok_or_else(|| Self::missing(stage, Stage::Electromagnetic))?;
            switch::run(&self.inputs, primary, em)?
        };
        let slot = self.stamp(result);
        Ok(&self.switch.insert(slot).value)
    }

    pub fn run_output(&mut self) -> Result<&OutputResult> {
        let stage = Stage::Output;
        self.check_upstream(stage)?;
        let result = {
            let primary = self
                .primary_electrical()
                .ok_or_else(|| Self::missing(stage, Stage::PrimaryElectrical))?;
            let em = self
                .electromagnetic()
                .ok_or_else(|| Self::missing(stage, Stage::Electromagnetic))?;
            let winding = self
                .winding()
                .ok_or_else(|| Self::missing(stage, Stage::Winding))?;
            output::run(&self.inputs, primary, em, winding)?
        };
        let slot = self.stamp(result);
        Ok(&self.output.insert(slot).value)
    }

    pub fn run_output_filter(&mut self) -> Result<&FilterResult> {
        let stage = Stage::OutputFilter;
        self.check_upstream(stage)?;
        let result = {
            let output = self
                .output()
                .ok_or_else(|| Self::missing(stage, Stage::Output))?;
            filter::run(&self.inputs, output)?
        };
        let slot = self.stamp(result);
        Ok(&self.filter.insert(slot).value)
    }

    pub fn run_power_stage(&mut self) -> Result<&PowerStageResult> {
        let stage = Stage::PowerStageSmallSignal;
        self.check_upstream(stage)?;
        let result = {
            let primary = self
                .primary_electrical()
                .ok_or_else(|| Self::missing(stage, Stage::PrimaryElectrical))?;
            let em = self
                .electromagnetic()
                .ok_or_else(|| Self::missing(stage, Stage::Electromagnetic))?;
            let switch = self
                .switch()
                .ok_or_else(|| Self::missing(stage, Stage::Switch))?;
            let output = self
                .output()
                .ok_or_else(|| Self::missing(stage, Stage::Output))?;
            power_stage::run(&self.inputs, primary, em, switch, output)?
        };
        let slot = self.stamp(result);
        Ok(&self.power_stage.insert(slot).value)
    }

    pub fn run_opto_feedback(&mut self) -> Result<&OptoFeedbackResult> {
        let stage = Stage::OptoFeedback;
        self.check_upstream(stage)?;
        let result = {
            let output = self
                .output()
                .ok_or_else(|| Self::missing(stage, Stage::Output))?;
            let filter = self
                .output_filter()
                .ok_or_else(|| Self::missing(stage, Stage::OutputFilter))?;
            let ps = self
                .power_stage()
                .ok_or_else(|| Self::missing(stage, Stage::PowerStageSmallSignal))?;
            opto::run(&self.inputs, output, filter, ps)?
        };
        let slot = self.stamp(result);
        Ok(&self.opto.insert(slot).value)
    }

    /// Run one stage by name.
    pub fn run(&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::BulkCapacitor => self.run_bulk_capacitor().map(|_| ()),
            Stage::RectifierBridge => self.run_rectifier_bridge().map(|_| ()),
            Stage::PrimaryElectrical => self.run_primary_electrical().map(|_| ()),
            Stage::CoreArea => self.run_core_area().map(|_| ()),
            Stage::Electromagnetic => self.run_electromagnetic().map(|_| ()),
            Stage::Winding => self.run_winding().map(|_| ()),
            Stage::Switch => self.run_switch().map(|_| ()),
            Stage::Output => self.run_output().map(|_| ()),
            Stage::OutputFilter => self.run_output_filter().map(|_| ()),
            Stage::PowerStageSmallSignal => self.run_power_stage().map(|_| ()),
            Stage::OptoFeedback => self.run_opto_feedback().map(|_| ()),
        }
    }

    /// Run every stage in order, stopping at the first failure.
    ///
    /// Results of stages that completed before the failure are kept.
    pub fn run_all(&mut self) -> Result<()> {
        for stage in Stage::ALL {
            self.run(stage)?;
        }
        Ok(())
    }

    pub fn bulk_capacitor(&self) -> Option<&BulkCapacitorResult> {
        self.bulk.as_ref().map(|s| &s.value)
    }

    pub fn rectifier_bridge(&self) -> Option<&RectifierResult> {
        self.rectifier.as_ref().map(|s| &s.value)
    }

    pub fn primary_electrical(&self) -> Option<&PrimaryResult> {
        self.primary.as_ref().map(|s| &s.value)
    }

    pub fn core_area(&self) -> Option<&CoreAreaResult> {
        self.core_area.as_ref().map(|s| &s.value)
    }

    pub fn electromagnetic(&self) -> Option<&ElectromagneticResult> {
        self.electromagnetic.as_ref().map(|s| &s.value)
    }

    pub fn winding(&self) -> Option<&WindingResult> {
        self.winding.as_ref().map(|s| &s.value)
    }

    pub fn switch(&self) -> Option<&SwitchResult> {
        self.switch.as_ref().map(|s| &s.value)
    }

    pub fn output(&self) -> Option<&OutputResult> {
        self.output.as_ref().map(|s| &s.value)
    }

    pub fn output_filter(&self) -> Option<&FilterResult> {
        self.filter.as_ref().map(|s| &s.value)
    }

    pub fn power_stage(&self) -> Option<&PowerStageResult> {
        self.power_stage.as_ref().map(|s| &s.value)
    }

    pub fn opto_feedback(&self) -> Option<&OptoFeedbackResult> {
        self.opto.as_ref().map(|s| &s.value)
    }

    /// Snapshot of the inputs, the core and every present result.
    ///
    /// Stale results are included; check [`is_stale`](Self::is_stale)
    /// before relying on them.
    pub fn report(&self) -> DesignReport {
        DesignReport {
            inputs: self.inputs.clone(),
            core: self.core.clone(),
            bulk_capacitor: self.bulk_capacitor().cloned(),
            rectifier_bridge: self.rectifier_bridge().cloned(),
            primary_electrical: self.primary_electrical().cloned(),
            core_area: self.core_area().cloned(),
            electromagnetic: self.electromagnetic().cloned(),
            winding: self.winding().cloned(),
            switch: self.switch().cloned(),
            output: self.output().cloned(),
            output_filter: self.output_filter().cloned(),
            power_stage: self.power_stage().cloned(),
            opto_feedback: self.opto_feedback().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use flyback_core::OutputRail;

    fn session() -> DesignContext {
        DesignContext::new(DesignInputs::default()).with_core(fixtures::ee25())
    }

    #[test]
    fn test_run_all_fills_every_slot() {
        let mut ctx = session();
        ctx.run_all().unwrap();
        assert!(ctx.report().is_complete());
        assert!(ctx.stale_stages().is_empty());
    }

    #[test]
    fn test_missing_upstream() {
        let mut ctx = session();
        let err = ctx.run_primary_electrical().unwrap_err();
        assert_eq!(
            err,
            Error::MissingStage {
                stage: Stage::PrimaryElectrical,
                missing: "bulk capacitor".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_core() {
        let mut ctx = DesignContext::new(DesignInputs::default());
        for stage in [
            Stage::BulkCapacitor,
            Stage::RectifierBridge,
            Stage::PrimaryElectrical,
            Stage::CoreArea,
        ] {
            ctx.run(stage).unwrap();
        }
        let err = ctx.run_electromagnetic().unwrap_err();
        assert!(matches!(err, Error::MissingStage { ref missing, .. } if missing == "core selection"));
    }

    #[test]
    fn test_input_edit_marks_everything_stale() {
        let mut ctx = session();
        ctx.run_all().unwrap();
        ctx.set_inputs(DesignInputs::default().with_efficiency(0.85));
        assert_eq!(ctx.stale_stages(), Stage::ALL.to_vec());

        let err = ctx.run_rectifier_bridge().unwrap_err();
        assert!(matches!(err, Error::StaleInput { stage: Stage::RectifierBridge, .. }));

        ctx.run_bulk_capacitor().unwrap();
        assert!(!ctx.is_stale(Stage::BulkCapacitor));
        ctx.run_rectifier_bridge().unwrap();
        assert!(!ctx.is_stale(Stage::RectifierBridge));
        assert!(ctx.is_stale(Stage::PrimaryElectrical));
    }

    #[test]
    fn test_core_edit_spares_core_independent_stages() {
        let mut ctx = session();
        ctx.run_all().unwrap();
        let mut core = fixtures::ee25();
        core.permeability = 2500.0;
        ctx.set_core(core);

        let stale = ctx.stale_stages();
        assert!(!stale.contains(&Stage::BulkCapacitor));
        assert!(!stale.contains(&Stage::CoreArea));
        assert!(stale.contains(&Stage::Electromagnetic));
        assert!(stale.contains(&Stage::OptoFeedback));

        ctx.run_all().unwrap();
        assert!(ctx.stale_stages().is_empty());
    }

    #[test]
    fn test_rerun_upstream_invalidates_downstream() {
        let mut ctx = session();
        ctx.run_all().unwrap();
        ctx.run_switch().unwrap();
        assert!(ctx.is_stale(Stage::PowerStageSmallSignal));
        assert!(ctx.is_stale(Stage::OptoFeedback));
        assert!(!ctx.is_stale(Stage::Output));
        let err = ctx.run_opto_feedback().unwrap_err();
        assert_eq!(
            err,
            Error::StaleInput {
                stage: Stage::OptoFeedback,
                upstream: "power stage small-signal".to_string(),
            }
        );
    }

    #[test]
    fn test_failure_keeps_earlier_results() {
        let inputs = DesignInputs::default().with_outputs(vec![
            OutputRail::new(12.0, 2.0),
            OutputRail::new(5.0, 0.0),
        ]);
        let mut ctx = DesignContext::new(inputs).with_core(fixtures::ee25());
        let err = ctx.run_all().unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Output));
        let report = ctx.report();
        assert!(report.has(Stage::Winding));
        assert!(!report.has(Stage::Output));
    }
}
