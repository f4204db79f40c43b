//! Scenario handle and its JS-facing operations.

use captable_core::{RoundInvestor, Scenario};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmScenario {
    scenario: Scenario,
}

/// Largest integer a JS number holds exactly (2^53).
const MAX_SAFE_SHARE_COUNT: f64 = 9_007_199_254_740_992.0;

/// JS numbers arrive as f64; share counts must be whole and non-negative.
pub(crate) fn to_share_count(value: f64, field: &str) -> Result<u64, String> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > MAX_SAFE_SHARE_COUNT {
        return Err(format!("{field} must be a whole number of shares, got {value}"));
    }
    Ok(value as u64)
}

#[wasm_bindgen]
impl WasmScenario {
    #[wasm_bindgen(constructor)]
    pub fn new(
        name: String,
        founders_shares: f64,
        total_shares: f64,
        initial_valuation: f64,
    ) -> Result<WasmScenario, JsValue> {
        console_error_panic_hook::set_once();

        let founders_shares =
            to_share_count(founders_shares, "founders shares").map_err(|e| JsValue::from_str(&e))?;
        let total_shares =
            to_share_count(total_shares, "total shares").map_err(|e| JsValue::from_str(&e))?;
        let scenario =
            Scenario::setup_company(name, founders_shares, total_shares, initial_valuation)
                .map_err(|e| JsValue::from_str(&format!("Company setup failed: {}", e)))?;

        Ok(WasmScenario { scenario })
    }

    /// Restores a scenario saved with `to_json`, re-validating every input.
    pub fn from_json(json: &str) -> Result<WasmScenario, JsValue> {
        console_error_panic_hook::set_once();

        let scenario: Scenario = serde_json::from_str(json)
            .map_err(|e| JsValue::from_str(&format!("Invalid scenario: {}", e)))?;
        Ok(WasmScenario { scenario })
    }

    pub fn to_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.scenario)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn add_safe_note(
        &mut self,
        investor_name: String,
        amount: f64,
        discount_percent: f64,
        valuation_cap: Option<f64>,
    ) -> Result<(), JsValue> {
        self.scenario
            .add_safe_note(investor_name, amount, discount_percent, valuation_cap)
            .map(|_| ())
            .map_err(|e| JsValue::from_str(&format!("SAFE rejected: {}", e)))
    }

    /// `investors` is an array of `{ name, amount }` objects.
    pub fn add_priced_round(
        &mut self,
        name: String,
        pre_money_valuation: f64,
        investors: JsValue,
    ) -> Result<(), JsValue> {
        let investors: Vec<RoundInvestor> = from_value(investors)
            .map_err(|e| JsValue::from_str(&format!("Invalid investors: {}", e)))?;
        self.push_round(name, pre_money_valuation, investors)
            .map_err(|e| JsValue::from_str(&format!("Round rejected: {}", e)))
    }

    pub fn round_count(&self) -> usize {
        self.scenario.rounds().len()
    }

    pub fn pending_safe_count(&self) -> usize {
        self.scenario.pending_safe_notes().count()
    }

    pub fn ownership_snapshot(&self) -> Result<JsValue, JsValue> {
        let snapshot = self
            .scenario
            .ownership_snapshot()
            .map_err(|e| JsValue::from_str(&format!("Ownership projection failed: {}", e)))?;

        to_value(&snapshot).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Ownership after the first `round_count` rounds only.
    pub fn ownership_snapshot_through(&self, round_count: usize) -> Result<JsValue, JsValue> {
        let snapshot = captable_core::project_through(
            self.scenario.company(),
            self.scenario.safe_notes(),
            self.scenario.rounds(),
            round_count,
            self.scenario.settings(),
        )
        .map_err(|e| JsValue::from_str(&format!("Ownership projection failed: {}", e)))?;

        to_value(&snapshot).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn exit_projection(&self, exit_valuations: Vec<f64>) -> Result<JsValue, JsValue> {
        let exits = self
            .scenario
            .exit_projection(&exit_valuations)
            .map_err(|e| JsValue::from_str(&format!("Exit projection failed: {}", e)))?;

        to_value(&exits).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

impl WasmScenario {
    fn push_round(
        &mut self,
        name: String,
        pre_money_valuation: f64,
        investors: Vec<RoundInvestor>,
    ) -> captable_core::CapTableResult<()> {
        self.scenario
            .add_priced_round(name, pre_money_valuation, investors)
            .map(|_| ())
    }
}
