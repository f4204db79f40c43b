//! Pari-passu exit payouts. Every share receives the same price, so payouts
//! partition the exit valuation exactly (up to rounding).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CapTableError, CapTableResult};
use crate::projector::OwnershipSnapshot;
use crate::round_processor::{CapTableState, StakeholderCategory};
use crate::share_math::{checked_price_per_share, ownership_percent};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderPayout {
    pub name: String,
    pub category: StakeholderCategory,
    pub shares: f64,
    pub ownership_percent: f64,
    pub invested_capital: f64,
    pub payout: f64,
    /// `None` for holders without invested capital.
    pub multiple: Option<f64>,
    /// `None` for holders without invested capital.
    pub roi_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitScenario {
    pub valuation: f64,
    pub price_per_share: f64,
    pub payouts: Vec<StakeholderPayout>,
    pub total_payouts: f64,
}

impl ExitScenario {
    pub fn category_payout(&self, category: StakeholderCategory) -> f64 {
        self.payouts
            .iter()
            .filter(|payout| payout.category == category)
            .map(|payout| payout.payout)
            .sum()
    }
}

/// Exit projection for an ownership snapshot; fails until a round exists.
pub fn exit_projection(
    snapshot: &OwnershipSnapshot,
    exit_valuations: &[f64],
) -> CapTableResult<Vec<ExitScenario>> {
    match snapshot.projection() {
        Some(projection) => project_exits(&projection.state, exit_valuations),
        None => Err(CapTableError::NotComputable(
            "exit projection needs at least one priced round".to_string(),
        )),
    }
}

/// One scenario per distinct valuation, in ascending order.
pub fn project_exits(
    state: &CapTableState,
    exit_valuations: &[f64],
) -> CapTableResult<Vec<ExitScenario>> {
    let valuations = normalize_valuations(exit_valuations)?;
    valuations
        .into_iter()
        .map(|valuation| project_exit(state, valuation))
        .collect()
}

fn normalize_valuations(exit_valuations: &[f64]) -> CapTableResult<Vec<f64>> {
    if let Some(bad) = exit_valuations
        .iter()
        .find(|value| !(value.is_finite() && **value > 0.0))
    {
        return Err(CapTableError::validation(format!(
            "exit valuations must be positive, got {bad}"
        )));
    }
    let mut valuations = exit_valuations.to_vec();
    valuations.sort_by(|a, b| a.total_cmp(b));
    valuations.dedup();
    Ok(valuations)
}

fn project_exit(state: &CapTableState, valuation: f64) -> CapTableResult<ExitScenario> {
    let total_shares = state.total_shares_outstanding;
    let price = checked_price_per_share(valuation, total_shares, "exit")?;

    let payouts: Vec<StakeholderPayout> = state
        .stakeholders
        .iter()
        .map(|holder| {
            let payout = holder.shares * price;
            let invested = holder.invested_capital;
            let (multiple, roi_percent) = if invested > 0.0 {
                (
                    Some(payout / invested),
                    Some(100.0 * (payout - invested) / invested),
                )
            } else {
                (None, None)
            };
            StakeholderPayout {
                name: holder.name.clone(),
                category: holder.category,
                shares: holder.shares,
                ownership_percent: ownership_percent(holder.shares, total_shares),
                invested_capital: invested,
                payout,
                multiple,
                roi_percent,
            }
        })
        .collect();
    let total_payouts = payouts.iter().map(|payout| payout.payout).sum();

    debug!(valuation, price, total_payouts, "exit projected");

    Ok(ExitScenario {
        valuation,
        price_per_share: price,
        payouts,
        total_payouts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::ownership_snapshot;
    use crate::scenario::{Company, PricedRound, RoundInvestor, SafeNote};
    use crate::settings::ProjectionSettings;

    fn snapshot() -> OwnershipSnapshot {
        let company = Company::new("Acme", 8_000_000, 10_000_000, 1_000_000.0).expect("company");
        let safes =
            vec![SafeNote::new("Angel", 250_000.0, 20.0, Some(5_000_000.0)).expect("safe")];
        let rounds = vec![PricedRound::from_investors(
            "Series A",
            8_000_000.0,
            vec![RoundInvestor::new("VC", 2_000_000.0)],
        )
        .expect("round")];
        ownership_snapshot(&company, &safes, &rounds, ProjectionSettings::default())
            .expect("snapshot")
    }

    #[test]
    fn payouts_sum_to_exit_valuation() {
        let exits = exit_projection(&snapshot(), &[50_000_000.0, 7_500_000.0, 1_234_567_890.0])
            .expect("exits");
        for exit in &exits {
            let relative = (exit.total_payouts - exit.valuation).abs() / exit.valuation;
            assert!(relative < 1e-6, "payouts drift at {}", exit.valuation);
        }
    }

    #[test]
    fn valuations_are_sorted_and_deduplicated() {
        let exits = exit_projection(&snapshot(), &[100_000_000.0, 20_000_000.0, 100_000_000.0])
            .expect("exits");
        let valuations: Vec<f64> = exits.iter().map(|exit| exit.valuation).collect();
        assert_eq!(valuations, vec![20_000_000.0, 100_000_000.0]);
    }

    #[test]
    fn founders_have_no_multiple_or_roi() {
        let exits = exit_projection(&snapshot(), &[100_000_000.0]).expect("exits");
        let exit = &exits[0];
        for payout in exit
            .payouts
            .iter()
            .filter(|payout| payout.invested_capital == 0.0)
        {
            assert!(payout.multiple.is_none());
            assert!(payout.roi_percent.is_none());
        }
        let founders = exit.category_payout(StakeholderCategory::Founder);
        assert!((founders / exit.valuation * 100.0 - 61.16).abs() < 0.01);
    }

    #[test]
    fn investor_multiple_and_roi() {
        let exits = exit_projection(&snapshot(), &[130_806_451.6]).expect("exits");
        let exit = &exits[0];
        assert!((exit.price_per_share - 10.0).abs() < 1e-6);

        let angel = exit
            .payouts
            .iter()
            .find(|payout| payout.name == "Angel")
            .expect("angel payout");
        assert!((angel.payout - 5_000_000.0).abs() < 1.0);
        assert!((angel.multiple.expect("multiple") - 20.0).abs() < 1e-5);
        assert!((angel.roi_percent.expect("roi") - 1_900.0).abs() < 1e-3);
    }

    #[test]
    fn exit_below_invested_capital_reports_negative_roi() {
        let exits = exit_projection(&snapshot(), &[5_000_000.0]).expect("exits");
        let vc = exits[0]
            .payouts
            .iter()
            .find(|payout| payout.name == "VC")
            .expect("vc payout");
        assert!(vc.multiple.expect("multiple") < 1.0);
        assert!(vc.roi_percent.expect("roi") < 0.0);
    }

    #[test]
    fn not_computable_without_rounds() {
        let err = exit_projection(&OwnershipSnapshot::NotComputable, &[1_000_000.0])
            .expect_err("no rounds");
        assert!(matches!(err, CapTableError::NotComputable(_)));
    }

    #[test]
    fn rejects_non_positive_valuations() {
        for bad in [0.0, -5.0, f64::NAN] {
            let err = exit_projection(&snapshot(), &[10.0, bad]).expect_err("bad valuation");
            assert!(matches!(err, CapTableError::Validation(_)));
        }
    }
}
