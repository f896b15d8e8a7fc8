//! One-shot pipeline and the combined design report.

use flyback_core::{DesignInputs, Result, Stage};
use flyback_magnetics::CoreSelection;
use serde::{Deserialize, Serialize};

use crate::bulk::{self, BulkCapacitorResult};
use crate::core_area::{self, CoreAreaResult};
use crate::electromagnetic::{self, ElectromagneticResult};
use crate::filter::{self, FilterResult};
use crate::output::{self, OutputResult};
use crate::primary::{self, PrimaryResult};
use crate::rectifier::{self, RectifierResult};
use crate::small_signal::opto::{self, OptoFeedbackResult};
use crate::small_signal::power_stage::{self, PowerStageResult};
use crate::switch::{self, SwitchResult};
use crate::winding::{self, WindingResult};

/// Every stage result available for a design.
///
/// Stages that have not run, or failed, are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignReport {
    pub inputs: DesignInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<CoreSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bulk_capacitor: Option<BulkCapacitorResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rectifier_bridge: Option<RectifierResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_electrical: Option<PrimaryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_area: Option<CoreAreaResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electromagnetic: Option<ElectromagneticResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winding: Option<WindingResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch: Option<SwitchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_filter: Option<FilterResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_stage: Option<PowerStageResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opto_feedback: Option<OptoFeedbackResult>,
}

impl DesignReport {
    /// An empty report for `inputs`.
    pub fn new(inputs: DesignInputs) -> Self {
        Self {
            inputs,
            core: None,
            bulk_capacitor: None,
            rectifier_bridge: None,
            primary_electrical: None,
            core_area: None,
            electromagnetic: None,
            winding: None,
            switch: None,
            output: None,
            output_filter: None,
            power_stage: None,
            opto_feedback: None,
        }
    }

    /// Whether `stage` has a result in this report.
    pub fn has(&self, stage: Stage) -> bool {
        match stage {
            Stage::BulkCapacitor => self.bulk_capacitor.is_some(),
            Stage::RectifierBridge => self.rectifier_bridge.is_some(),
            Stage::PrimaryElectrical => self.primary_electrical.is_some(),
            Stage::CoreArea => self.core_area.is_some(),
            Stage::Electromagnetic => self.electromagnetic.is_some(),
            Stage::Winding => self.winding.is_some(),
            Stage::Switch => self.switch.is_some(),
            Stage::Output => self.output.is_some(),
            Stage::OutputFilter => self.output_filter.is_some(),
            Stage::PowerStageSmallSignal => self.power_stage.is_some(),
            Stage::OptoFeedback => self.opto_feedback.is_some(),
        }
    }

    /// Stages with results, in execution order.
    pub fn completed_stages(&self) -> Vec<Stage> {
        Stage::ALL.into_iter().filter(|&s| self.has(s)).collect()
    }

    /// Whether all eleven stages have results.
    pub fn is_complete(&self) -> bool {
        Stage::ALL.iter().all(|&s| self.has(s))
    }
}

/// Run all eleven stages on `core` and collect the results.
///
/// Each stage receives its upstream results by reference; nothing is
/// mutated after it is produced.
pub fn run_pipeline(inputs: &DesignInputs, core: &CoreSelection) -> Result<DesignReport> {
    log::info!("running design pipeline on core {}", core.model);

    let bulk = bulk::run(inputs)?;
    let rectifier = rectifier::run(inputs, &bulk)?;
    let primary = primary::run(inputs, &bulk, &rectifier)?;
    let core_area = core_area::run(inputs, &primary)?;
    let em = electromagnetic::run(inputs, core, &primary, &core_area)?;
    let winding = winding::run(inputs, core, &primary, &em)?;
    let switch = switch::run(inputs, &primary, &em)?;
    let output = output::run(inputs, &primary, &em, &winding)?;

    // The filter and power-stage sweeps share no state
    #[cfg(feature = "parallel")]
    let (filter, power_stage) = rayon::join(
        || filter::run(inputs, &output),
        || power_stage::run(inputs, &primary, &em, &switch, &output),
    );
    #[cfg(not(feature = "parallel"))]
    let (filter, power_stage) = (
        filter::run(inputs, &output),
        power_stage::run(inputs, &primary, &em, &switch, &output),
    );
    let filter = filter?;
    let power_stage = power_stage?;

    let opto = opto::run(inputs, &output, &filter, &power_stage)?;

    Ok(DesignReport {
        inputs: inputs.clone(),
        core: Some(core.clone()),
        bulk_capacitor: Some(bulk),
        rectifier_bridge: Some(rectifier),
        primary_electrical: Some(primary),
        core_area: Some(core_area),
        electromagnetic: Some(em),
        winding: Some(winding),
        switch: Some(switch),
        output: Some(output),
        output_filter: Some(filter),
        power_stage: Some(power_stage),
        opto_feedback: Some(opto),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_pipeline_matches_stepwise_chain() {
        let inputs = DesignInputs::default();
        let report = run_pipeline(&inputs, &fixtures::ee25()).unwrap();
        let chain = fixtures::Chain::new(&inputs);
        assert!(report.is_complete());
        assert_eq!(report.electromagnetic.as_ref(), Some(&chain.electromagnetic));
        assert_eq!(report.opto_feedback.as_ref(), Some(&chain.opto));
    }

    #[test]
    fn test_empty_report() {
        let report = DesignReport::new(DesignInputs::default());
        assert!(report.completed_stages().is_empty());
        assert!(!report.is_complete());
    }

    #[test]
    fn test_report_json_skips_missing_stages() {
        let report = DesignReport::new(DesignInputs::default());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("inputs").is_some());
        assert!(json.get("bulk_capacitor").is_none());
    }
}
