//! Cap table state and the application of one priced round to it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CapTableError, CapTableResult};
use crate::safe_converter::{convert_safe, SafeConversion};
use crate::scenario::{Company, PricedRound, SafeNote};
use crate::settings::approx_eq_relative;
use crate::share_math::{checked_price_per_share, ownership_percent, shares_from_investment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StakeholderCategory {
    Founder,
    /// Non-founder shares that already existed when the company was set up.
    Common,
    Safe,
    Investor,
}

impl StakeholderCategory {
    pub const ALL: [StakeholderCategory; 4] = [
        StakeholderCategory::Founder,
        StakeholderCategory::Common,
        StakeholderCategory::Safe,
        StakeholderCategory::Investor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StakeholderCategory::Founder => "Founders",
            StakeholderCategory::Common => "Common",
            StakeholderCategory::Safe => "SAFE",
            StakeholderCategory::Investor => "Investors",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub name: String,
    pub shares: f64,
    pub invested_capital: f64,
    pub category: StakeholderCategory,
    /// Round that created the position; `None` for setup positions.
    pub round_index: Option<usize>,
}

/// Same-name positions merged for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedHolding {
    pub name: String,
    pub category: StakeholderCategory,
    pub shares: f64,
    pub invested_capital: f64,
    pub ownership_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapTableState {
    pub total_shares_outstanding: f64,
    pub stakeholders: Vec<Stakeholder>,
}

impl CapTableState {
    /// State at company setup: founders plus any pre-existing common shares.
    pub fn from_company(company: &Company) -> Self {
        let mut stakeholders = vec![Stakeholder {
            name: format!("{} Founders", company.name()),
            shares: company.founders_shares() as f64,
            invested_capital: 0.0,
            category: StakeholderCategory::Founder,
            round_index: None,
        }];
        if company.common_shares() > 0 {
            stakeholders.push(Stakeholder {
                name: "Other Common".to_string(),
                shares: company.common_shares() as f64,
                invested_capital: 0.0,
                category: StakeholderCategory::Common,
                round_index: None,
            });
        }
        Self {
            total_shares_outstanding: company.total_shares() as f64,
            stakeholders,
        }
    }

    pub fn share_sum(&self) -> f64 {
        self.stakeholders.iter().map(|holder| holder.shares).sum()
    }

    pub fn category_shares(&self, category: StakeholderCategory) -> f64 {
        self.stakeholders
            .iter()
            .filter(|holder| holder.category == category)
            .map(|holder| holder.shares)
            .sum()
    }

    pub fn founder_percent(&self) -> f64 {
        ownership_percent(
            self.category_shares(StakeholderCategory::Founder),
            self.total_shares_outstanding,
        )
    }

    pub fn ownership_percent_of(&self, stakeholder: &Stakeholder) -> f64 {
        ownership_percent(stakeholder.shares, self.total_shares_outstanding)
    }

    pub fn check_consistency(&self, stage: &str, tolerance: f64) -> CapTableResult<()> {
        let sum = self.share_sum();
        if approx_eq_relative(sum, self.total_shares_outstanding, tolerance) {
            Ok(())
        } else {
            Err(CapTableError::Inconsistent {
                stage: stage.to_string(),
                sum,
                total: self.total_shares_outstanding,
            })
        }
    }

    /// Merges positions that share a name, keeping first-seen order and category.
    pub fn aggregate_by_name(&self) -> Vec<NamedHolding> {
        let mut holdings: Vec<NamedHolding> = Vec::new();
        for holder in &self.stakeholders {
            match holdings.iter_mut().find(|entry| entry.name == holder.name) {
                Some(entry) => {
                    entry.shares += holder.shares;
                    entry.invested_capital += holder.invested_capital;
                }
                None => holdings.push(NamedHolding {
                    name: holder.name.clone(),
                    category: holder.category,
                    shares: holder.shares,
                    invested_capital: holder.invested_capital,
                    ownership_percent: 0.0,
                }),
            }
        }
        for entry in &mut holdings {
            entry.ownership_percent = ownership_percent(entry.shares, self.total_shares_outstanding);
        }
        holdings
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round_index: usize,
    pub name: String,
    pub pre_money_valuation: f64,
    pub investment_amount: f64,
    pub post_money_valuation: f64,
    /// Sum of the SAFE amounts converted at this round.
    pub safe_investment: f64,
    pub effective_pre_money: f64,
    pub price_per_share: f64,
    pub safe_shares_issued: f64,
    pub investor_shares_issued: f64,
    pub total_shares_before: f64,
    pub total_shares_after: f64,
    pub founder_percent_after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub state: CapTableState,
    pub summary: RoundSummary,
    pub conversions: Vec<SafeConversion>,
}

/// Applies `round` to `state`, converting every note in `pending_safes` first.
/// The input state is left untouched; on error nothing is produced.
pub fn process_round(
    state: &CapTableState,
    round: &PricedRound,
    round_index: usize,
    pending_safes: &[&SafeNote],
) -> CapTableResult<RoundOutcome> {
    let total_before = state.total_shares_outstanding;
    if !(total_before > 0.0 && total_before.is_finite()) {
        return Err(CapTableError::validation(format!(
            "round '{}' applied to a cap table with {} shares outstanding",
            round.name(),
            total_before
        )));
    }

    let conversions = pending_safes
        .iter()
        .map(|note| convert_safe(note, round.pre_money_valuation(), total_before, round_index))
        .collect::<CapTableResult<Vec<_>>>()?;

    let safe_investment: f64 = conversions.iter().map(|conversion| conversion.amount).sum();
    let effective_pre_money = round.pre_money_valuation() - safe_investment;
    if effective_pre_money <= 0.0 {
        return Err(CapTableError::InvalidRound {
            round: round.name().to_string(),
            pre_money: round.pre_money_valuation(),
            safe_investment,
        });
    }
    let price = checked_price_per_share(
        effective_pre_money,
        total_before,
        &format!("round '{}'", round.name()),
    )?;

    let mut next = state.clone();
    let mut safe_shares_issued = 0.0;
    for conversion in &conversions {
        safe_shares_issued += conversion.shares;
        next.stakeholders.push(Stakeholder {
            name: conversion.investor_name.clone(),
            shares: conversion.shares,
            invested_capital: conversion.amount,
            category: StakeholderCategory::Safe,
            round_index: Some(round_index),
        });
    }

    let mut investor_shares_issued = 0.0;
    for investor in round.investors() {
        let shares = shares_from_investment(investor.amount, price);
        investor_shares_issued += shares;
        next.stakeholders.push(Stakeholder {
            name: investor.name.clone(),
            shares,
            invested_capital: investor.amount,
            category: StakeholderCategory::Investor,
            round_index: Some(round_index),
        });
    }

    next.total_shares_outstanding = total_before + safe_shares_issued + investor_shares_issued;

    let summary = RoundSummary {
        round_index,
        name: round.name().to_string(),
        pre_money_valuation: round.pre_money_valuation(),
        investment_amount: round.investment_amount(),
        post_money_valuation: round.post_money_valuation(),
        safe_investment,
        effective_pre_money,
        price_per_share: price,
        safe_shares_issued,
        investor_shares_issued,
        total_shares_before: total_before,
        total_shares_after: next.total_shares_outstanding,
        founder_percent_after: next.founder_percent(),
    };

    debug!(
        round = round.name(),
        round_index,
        conversions = conversions.len(),
        price,
        total_before,
        total_after = next.total_shares_outstanding,
        "round processed"
    );

    Ok(RoundOutcome {
        state: next,
        summary,
        conversions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::RoundInvestor;

    fn company() -> Company {
        Company::new("Acme", 8_000_000, 10_000_000, 1_000_000.0).expect("company")
    }

    fn series_a() -> PricedRound {
        PricedRound::from_investors(
            "Series A",
            8_000_000.0,
            vec![RoundInvestor::new("VC", 2_000_000.0)],
        )
        .expect("round")
    }

    #[test]
    fn setup_state_partitions_total_shares() {
        let state = CapTableState::from_company(&company());
        assert_eq!(state.stakeholders.len(), 2);
        assert_eq!(state.share_sum(), state.total_shares_outstanding);
        assert_eq!(state.founder_percent(), 80.0);
        assert_eq!(state.category_shares(StakeholderCategory::Common), 2_000_000.0);

        let all_founders = Company::new("Solo", 1_000, 1_000, 0.0).expect("company");
        let state = CapTableState::from_company(&all_founders);
        assert_eq!(state.stakeholders.len(), 1);
        assert_eq!(state.founder_percent(), 100.0);
    }

    #[test]
    fn series_a_with_capped_safe() {
        let state = CapTableState::from_company(&company());
        let safe = SafeNote::new("Angel", 250_000.0, 20.0, Some(5_000_000.0)).expect("safe");
        let outcome = process_round(&state, &series_a(), 0, &[&safe]).expect("round");

        assert_eq!(outcome.conversions.len(), 1);
        assert_eq!(outcome.conversions[0].shares, 500_000.0);

        let summary = &outcome.summary;
        assert_eq!(summary.safe_investment, 250_000.0);
        assert_eq!(summary.effective_pre_money, 7_750_000.0);
        assert!((summary.price_per_share - 0.775).abs() < 1e-12);
        assert!((summary.investor_shares_issued - 2_580_645.16).abs() < 0.01);
        assert!((summary.total_shares_after - 13_080_645.16).abs() < 0.01);
        assert!((summary.founder_percent_after - 61.16).abs() < 0.01);
        assert_eq!(summary.post_money_valuation, 10_000_000.0);

        outcome
            .state
            .check_consistency("Series A", 1e-6)
            .expect("shares partition the total");
        assert_eq!(state.total_shares_outstanding, 10_000_000.0);
        assert_eq!(state.stakeholders.len(), 2);
    }

    #[test]
    fn round_without_safes_prices_at_pre_money() {
        let state = CapTableState::from_company(&company());
        let outcome = process_round(&state, &series_a(), 0, &[]).expect("round");
        assert_eq!(outcome.summary.price_per_share, 0.8);
        assert_eq!(outcome.summary.safe_shares_issued, 0.0);
        assert!((outcome.state.total_shares_outstanding - 12_500_000.0).abs() < 1e-6);
    }

    #[test]
    fn safe_investment_at_pre_money_is_an_invalid_round() {
        let state = CapTableState::from_company(&company());
        let whale = SafeNote::new("Whale", 8_000_000.0, 0.0, None).expect("safe");
        let err = process_round(&state, &series_a(), 0, &[&whale]).expect_err("invalid round");
        assert!(matches!(
            err,
            CapTableError::InvalidRound { safe_investment, pre_money, .. }
                if safe_investment == 8_000_000.0 && pre_money == 8_000_000.0
        ));
    }

    #[test]
    fn founder_shares_never_change() {
        let state = CapTableState::from_company(&company());
        let safe = SafeNote::new("Angel", 250_000.0, 20.0, None).expect("safe");
        let outcome = process_round(&state, &series_a(), 0, &[&safe]).expect("round");
        assert_eq!(
            outcome.state.category_shares(StakeholderCategory::Founder),
            8_000_000.0
        );
        assert!(outcome.state.total_shares_outstanding > state.total_shares_outstanding);
    }

    #[test]
    fn aggregate_by_name_merges_repeat_investors() {
        let state = CapTableState::from_company(&company());
        let first = process_round(&state, &series_a(), 0, &[]).expect("series a");
        let series_b = PricedRound::from_investors(
            "Series B",
            20_000_000.0,
            vec![RoundInvestor::new("VC", 1_000_000.0), RoundInvestor::new("Growth", 4_000_000.0)],
        )
        .expect("round");
        let second = process_round(&first.state, &series_b, 1, &[]).expect("series b");

        let vc_entries = second
            .state
            .stakeholders
            .iter()
            .filter(|holder| holder.name == "VC")
            .count();
        assert_eq!(vc_entries, 2);

        let holdings = second.state.aggregate_by_name();
        assert_eq!(holdings.len(), 4);
        let vc = holdings.iter().find(|entry| entry.name == "VC").expect("vc");
        assert_eq!(vc.invested_capital, 3_000_000.0);
        let total_percent: f64 = holdings.iter().map(|entry| entry.ownership_percent).sum();
        assert!((total_percent - 100.0).abs() < 1e-9);
    }
}
