//! Shared test fixtures: a reference core and a fully evaluated stage chain.

use flyback_core::{DesignInputs, Result};
use flyback_magnetics::{CoreSelection, CoreShape};

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

/// EE25/13/7 in a 2000-permeability material.
pub fn ee25() -> CoreSelection {
    CoreSelection {
        model: "EE25/13/7".to_string(),
        cross_section_area: 52.5e-6,
        window_area: 61.0e-6,
        volume: 2.99e-6,
        mean_turn_length: 52.0e-3,
        path_length: 57.5e-3,
        permeability: 2000.0,
        bobbin_width: 15.0e-3,
        inductance_factor: None,
        shape: CoreShape::Rectangular {
            c: 7.5e-3,
            d: 17.5e-3,
            e: 17.5e-3,
            f: 7.0e-3,
        },
    }
}

/// Every stage result for one design, computed in order.
#[derive(Debug)]
pub struct Chain {
    pub bulk: BulkCapacitorResult,
    pub rectifier: RectifierResult,
    pub primary: PrimaryResult,
    pub core_area: CoreAreaResult,
    pub electromagnetic: ElectromagneticResult,
    pub winding: WindingResult,
    pub switch: SwitchResult,
    pub output: OutputResult,
    pub filter: FilterResult,
    pub power_stage: PowerStageResult,
    pub opto: OptoFeedbackResult,
}

impl Chain {
    /// Run the chain on the EE25 core, panicking on failure.
    pub fn new(inputs: &DesignInputs) -> Self {
        match Self::try_new(inputs, &ee25()) {
            Ok(chain) => chain,
            Err(e) => panic!("reference chain failed: {}", e),
        }
    }

    pub fn try_new(inputs: &DesignInputs, core: &CoreSelection) -> Result<Self> {
        let bulk = bulk::run(inputs)?;
        let rectifier = rectifier::run(inputs, &bulk)?;
        let primary = primary::run(inputs, &bulk, &rectifier)?;
        let core_area = core_area::run(inputs, &primary)?;
        let electromagnetic = electromagnetic::run(inputs, core, &primary, &core_area)?;
        let winding = winding::run(inputs, core, &primary, &electromagnetic)?;
        let switch = switch::run(inputs, &primary, &electromagnetic)?;
        let output = output::run(inputs, &primary, &electromagnetic, &winding)?;
        let filter = filter::run(inputs, &output)?;
        let power_stage = power_stage::run(inputs, &primary, &electromagnetic, &switch, &output)?;
        let opto = opto::run(inputs, &output, &filter, &power_stage)?;
        Ok(Self {
            bulk,
            rectifier,
            primary,
            core_area,
            electromagnetic,
            winding,
            switch,
            output,
            filter,
            power_stage,
            opto,
        })
    }
}
