//! Conversion of a single SAFE note at a priced round.
//!
//! The valuation cap is applied as a price bound: the cap is divided by the
//! same pre-round share count as the discount price, rather than through a
//! separate post-money share computation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CapTableResult;
use crate::scenario::SafeNote;
use crate::share_math::{ensure_positive_price, price_per_share, shares_from_investment};

/// Which bound set the conversion price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionBasis {
    Discount,
    Cap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeConversion {
    pub investor_name: String,
    pub amount: f64,
    pub discount_price: f64,
    /// `None` when the note has no valuation cap.
    pub cap_price: Option<f64>,
    pub conversion_price: f64,
    pub basis: ConversionBasis,
    pub shares: f64,
    /// Index of the round that triggered the conversion.
    pub round_index: usize,
}

pub fn convert_safe(
    note: &SafeNote,
    pre_money_valuation: f64,
    total_shares: f64,
    round_index: usize,
) -> CapTableResult<SafeConversion> {
    let round_price = price_per_share(pre_money_valuation, total_shares);
    let discount_price = round_price * (1.0 - note.discount_percent() / 100.0);
    let cap_price = note
        .valuation_cap()
        .map(|cap| price_per_share(cap, total_shares));

    // Ties go to the discount.
    let (conversion_price, basis) = match cap_price {
        Some(cap_price) if cap_price < discount_price => (cap_price, ConversionBasis::Cap),
        _ => (discount_price, ConversionBasis::Discount),
    };
    let conversion_price = ensure_positive_price(
        conversion_price,
        &format!("conversion of SAFE '{}'", note.investor_name()),
    )?;
    let shares = shares_from_investment(note.amount(), conversion_price);

    debug!(
        investor = note.investor_name(),
        discount_price,
        ?cap_price,
        conversion_price,
        ?basis,
        shares,
        "SAFE converted"
    );

    Ok(SafeConversion {
        investor_name: note.investor_name().to_string(),
        amount: note.amount(),
        discount_price,
        cap_price,
        conversion_price,
        basis,
        shares,
        round_index,
    })
}
