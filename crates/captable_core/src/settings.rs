use crate::error::{CapTableError, CapTableResult};
use serde::{Deserialize, Serialize};

/// Settings controlling how the projector replays a scenario.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectionSettings {
    /// Relative tolerance for the share-sum consistency check.
    pub consistency_tolerance: f64,
    /// Check that stakeholder shares sum to the outstanding total after every round.
    pub verify_consistency: bool,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            consistency_tolerance: 1e-6,
            verify_consistency: true,
        }
    }
}

impl ProjectionSettings {
    pub fn validate(&self) -> CapTableResult<()> {
        if !(self.consistency_tolerance.is_finite() && self.consistency_tolerance > 0.0) {
            return Err(CapTableError::validation(format!(
                "consistency_tolerance must be positive and finite, got {}",
                self.consistency_tolerance
            )));
        }
        Ok(())
    }
}

/// Relative comparison used by every consistency check in the crate.
pub fn approx_eq_relative(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tolerance * scale
}
