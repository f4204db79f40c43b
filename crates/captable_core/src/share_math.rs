//! Numeric primitives shared by the ownership and exit views.

use crate::error::{CapTableError, CapTableResult};

/// Valuation divided by share count. Callers guarantee `share_count > 0`;
/// use [`checked_price_per_share`] when that is not already established.
pub fn price_per_share(valuation: f64, share_count: f64) -> f64 {
    valuation / share_count
}

pub fn shares_from_investment(amount: f64, price_per_share: f64) -> f64 {
    amount / price_per_share
}

pub fn ownership_percent(shares: f64, total_shares: f64) -> f64 {
    100.0 * shares / total_shares
}

pub fn checked_price_per_share(
    valuation: f64,
    share_count: f64,
    context: &str,
) -> CapTableResult<f64> {
    if !(share_count > 0.0 && share_count.is_finite()) {
        return Err(CapTableError::validation(format!(
            "{context}: share count must be positive, got {share_count}"
        )));
    }
    ensure_positive_price(price_per_share(valuation, share_count), context)
}

/// Rejects zero, negative and non-finite prices instead of letting them
/// turn into infinite or negative share counts downstream.
pub fn ensure_positive_price(price: f64, context: &str) -> CapTableResult<f64> {
    if price > 0.0 && price.is_finite() {
        Ok(price)
    } else {
        Err(CapTableError::InvalidValuation {
            context: context.to_string(),
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_match_closed_forms() {
        assert_eq!(price_per_share(8_000_000.0, 10_000_000.0), 0.8);
        assert_eq!(shares_from_investment(250_000.0, 0.5), 500_000.0);
        assert_eq!(ownership_percent(8_000_000.0, 10_000_000.0), 80.0);
    }

    #[test]
    fn checked_price_rejects_non_positive_share_count() {
        let err = checked_price_per_share(1_000.0, 0.0, "setup").expect_err("zero shares");
        assert!(matches!(err, CapTableError::Validation(_)));
        let err = checked_price_per_share(1_000.0, -5.0, "setup").expect_err("negative shares");
        assert!(format!("{err}").contains("share count must be positive"));
    }

    #[test]
    fn checked_price_rejects_non_positive_valuation() {
        let err = checked_price_per_share(0.0, 100.0, "round").expect_err("zero valuation");
        assert!(matches!(
            err,
            CapTableError::InvalidValuation { price, .. } if price == 0.0
        ));
        assert!(checked_price_per_share(-10.0, 100.0, "round").is_err());
        assert_eq!(
            checked_price_per_share(50.0, 100.0, "round").expect("valid price"),
            0.5
        );
    }

    #[test]
    fn ensure_positive_price_rejects_infinity() {
        assert!(ensure_positive_price(f64::INFINITY, "cap").is_err());
        assert!(ensure_positive_price(f64::NAN, "cap").is_err());
    }
}
