use std::collections::BTreeMap;

use pipeline_core::{Session, StepReport, PRESET_CATALOG};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

macro_rules! console_log {
    ($($t:tt)*) => (web_sys::console::log_1(&format!($($t)*).into()))
}

/// JS-compatible version of StepReport
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum WasmStepReport {
    Advanced { cycle: u32 },
    AlreadyComplete,
    SteppedBack { cycle: u32 },
    AtStart,
}

impl From<StepReport> for WasmStepReport {
    fn from(report: StepReport) -> Self {
        match report {
            StepReport::Advanced { cycle } => Self::Advanced { cycle },
            StepReport::AlreadyComplete => Self::AlreadyComplete,
            StepReport::SteppedBack { cycle } => Self::SteppedBack { cycle },
            StepReport::AtStart => Self::AtStart,
        }
    }
}

/// JS-compatible preset catalog entry
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct WasmPreset {
    pub id: String,
    pub display_label: String,
    pub program_text: String,
    pub explanatory_note: String,
}

/// Everything the diagram needs to render the current cycle
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct WasmCycleView {
    pub cycle: u32,
    pub max_cycle: u32,
    /// One highlight tag per instruction, in program order.
    pub stages: Vec<String>,
    pub branch_taken: Option<usize>,
    pub flushed: Option<usize>,
}

#[wasm_bindgen]
pub struct WasmSession {
    session: Session,
}

impl Default for WasmSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();
        Self {
            session: Session::new(),
        }
    }

    /// Loads program text, replacing all derived state atomically.
    pub fn load(&mut self, text: &str) -> Result<(), JsError> {
        self.session
            .load(text)
            .map_err(|err| JsError::new(&err.to_string()))?;
        console_log!(
            "Loaded {} instructions, {} cycles",
            self.session.program().len(),
            self.session.max_cycle()
        );
        Ok(())
    }

    /// Loads a preset from the catalog by id.
    pub fn load_preset(&mut self, id: &str) -> Result<(), JsError> {
        let preset = self
            .session
            .load_preset(id)
            .map_err(|err| JsError::new(&err.to_string()))?;
        console_log!("Loaded preset '{}'", preset.display_label);
        Ok(())
    }

    /// Advances one cycle. Returns the step report as a JSON object.
    ///
    /// A commit failure is reported with the cycle the display moved to,
    /// so the UI does not need to re-query after catching it.
    pub fn advance(&mut self) -> Result<JsValue, JsError> {
        match self.session.advance() {
            Ok(report) => Ok(serde_wasm_bindgen::to_value(&WasmStepReport::from(report)).unwrap()),
            Err(err) => {
                console_log!("Commit failed at cycle {}: {}", self.session.cycle(), err);
                Err(JsError::new(&format!(
                    "cycle {}: {err}",
                    self.session.cycle()
                )))
            }
        }
    }

    /// Steps one cycle backward. Returns the step report as a JSON object.
    pub fn retreat(&mut self) -> JsValue {
        let report = self.session.retreat();
        serde_wasm_bindgen::to_value(&WasmStepReport::from(report)).unwrap()
    }

    /// Returns to cycle 0 and the initial register snapshot.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    pub fn cycle(&self) -> u32 {
        self.session.cycle()
    }

    pub fn max_cycle(&self) -> u32 {
        self.session.max_cycle()
    }

    /// Stage highlights plus hazard indicators for the current cycle.
    pub fn view(&self) -> JsValue {
        let indicators = self.session.indicators();
        let view = WasmCycleView {
            cycle: self.session.cycle(),
            max_cycle: self.session.max_cycle(),
            stages: self
                .session
                .stage_map()
                .iter()
                .map(|slot| slot.highlight_tag().to_string())
                .collect(),
            branch_taken: indicators.branch_taken,
            flushed: indicators.flushed,
        };
        serde_wasm_bindgen::to_value(&view).unwrap()
    }

    /// Register-name to value snapshot for the register display.
    pub fn registers(&self) -> JsValue {
        let snapshot: BTreeMap<String, i32> = self
            .session
            .registers()
            .iter()
            .map(|(reg, value)| (reg.to_string(), value))
            .collect();
        serde_wasm_bindgen::to_value(&snapshot).unwrap()
    }

    /// The preset catalog for the preset picker.
    pub fn presets() -> JsValue {
        let catalog: Vec<WasmPreset> = PRESET_CATALOG
            .iter()
            .map(|preset| WasmPreset {
                id: preset.id.to_string(),
                display_label: preset.display_label.to_string(),
                program_text: preset.program_text.to_string(),
                explanatory_note: preset.explanatory_note.to_string(),
            })
            .collect();
        serde_wasm_bindgen::to_value(&catalog).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use pipeline_core::StepReport;
    use wasm_bindgen_test as _;

    use super::{WasmCycleView, WasmStepReport};

    #[test]
    fn step_reports_convert_losslessly() {
        assert_eq!(
            WasmStepReport::from(StepReport::Advanced { cycle: 3 }),
            WasmStepReport::Advanced { cycle: 3 }
        );
        assert_eq!(
            WasmStepReport::from(StepReport::AtStart),
            WasmStepReport::AtStart
        );
    }

    #[test]
    fn cycle_view_serializes_to_the_expected_shape() {
        let view = WasmCycleView {
            cycle: 3,
            max_cycle: 8,
            stages: vec!["MEM".to_string(), "EX".to_string(), "FLUSH".to_string()],
            branch_taken: Some(1),
            flushed: Some(2),
        };
        let json = serde_json::to_value(&view).expect("serializes");
        assert_eq!(json["cycle"], 3);
        assert_eq!(json["stages"][2], "FLUSH");
        assert_eq!(json["branch_taken"], 1);
    }
}
