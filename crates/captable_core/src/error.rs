//! Error type shared by every cap table computation.

use thiserror::Error;

pub type CapTableResult<T> = Result<T, CapTableError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapTableError {
    /// Malformed user input: non-positive amounts, out-of-range percentages,
    /// founders exceeding the total share count.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A computed per-share price is zero, negative or not finite.
    #[error("Invalid valuation: {context} produced a price per share of {price}")]
    InvalidValuation { context: String, price: f64 },

    /// Converted SAFE investment leaves no positive effective pre-money.
    #[error(
        "Invalid round '{round}': SAFE investment {safe_investment} meets or exceeds pre-money valuation {pre_money}"
    )]
    InvalidRound {
        round: String,
        pre_money: f64,
        safe_investment: f64,
    },

    /// A derived view was requested before its inputs exist.
    #[error("Not computable: {0}")]
    NotComputable(String),

    /// Stakeholder shares no longer partition the outstanding total.
    #[error("Cap table inconsistent after '{stage}': stakeholder shares sum to {sum}, total is {total}")]
    Inconsistent { stage: String, sum: f64, total: f64 },
}

impl CapTableError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CapTableError::Validation(message.into())
    }
}
