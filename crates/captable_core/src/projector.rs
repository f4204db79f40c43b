//! Replays a scenario's round history into ownership snapshots.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CapTableError, CapTableResult};
use crate::round_processor::{process_round, CapTableState, RoundSummary, StakeholderCategory};
use crate::safe_converter::SafeConversion;
use crate::scenario::{Company, PricedRound, SafeNote};
use crate::settings::ProjectionSettings;
use crate::share_math::ownership_percent;

/// Founder ownership after a point in the round history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DilutionPoint {
    /// `None` for the company setup point.
    pub round_index: Option<usize>,
    pub label: String,
    pub total_shares: f64,
    pub founder_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: StakeholderCategory,
    pub shares: f64,
    pub invested_capital: f64,
    pub ownership_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapTableProjection {
    pub state: CapTableState,
    pub trajectory: Vec<DilutionPoint>,
    pub categories: Vec<CategoryTotal>,
    pub rounds: Vec<RoundSummary>,
    pub conversions: Vec<SafeConversion>,
}

/// Ownership view of a scenario. Without any priced round there is nothing to
/// dilute or pay out against, which is distinct from a zero-dilution table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum OwnershipSnapshot {
    NotComputable,
    Computed(Box<CapTableProjection>),
}

impl OwnershipSnapshot {
    pub fn projection(&self) -> Option<&CapTableProjection> {
        match self {
            OwnershipSnapshot::NotComputable => None,
            OwnershipSnapshot::Computed(projection) => Some(projection),
        }
    }

    pub fn is_computable(&self) -> bool {
        matches!(self, OwnershipSnapshot::Computed(_))
    }
}

pub fn ownership_snapshot(
    company: &Company,
    safes: &[SafeNote],
    rounds: &[PricedRound],
    settings: ProjectionSettings,
) -> CapTableResult<OwnershipSnapshot> {
    project_through(company, safes, rounds, rounds.len(), settings)
}

/// Replays only the first `round_count` rounds. Notes issued after that
/// point stay pending.
pub fn project_through(
    company: &Company,
    safes: &[SafeNote],
    rounds: &[PricedRound],
    round_count: usize,
    settings: ProjectionSettings,
) -> CapTableResult<OwnershipSnapshot> {
    settings.validate()?;
    company.validate()?;
    for note in safes {
        note.validate()?;
    }
    for round in rounds {
        round.validate()?;
    }
    if round_count > rounds.len() {
        return Err(CapTableError::validation(format!(
            "cannot project through round {} of a {}-round history",
            round_count,
            rounds.len()
        )));
    }
    if round_count == 0 {
        return Ok(OwnershipSnapshot::NotComputable);
    }

    let mut state = CapTableState::from_company(company);
    let mut trajectory = vec![DilutionPoint {
        round_index: None,
        label: "Founding".to_string(),
        total_shares: state.total_shares_outstanding,
        founder_percent: company.founder_percent(),
    }];
    let mut summaries = Vec::with_capacity(round_count);
    let mut conversions = Vec::new();
    let mut converted = vec![false; safes.len()];

    for (round_index, round) in rounds.iter().take(round_count).enumerate() {
        let pending: Vec<&SafeNote> = safes
            .iter()
            .zip(converted.iter_mut())
            .filter(|(note, done)| !**done && note.issued_at() <= round_index)
            .map(|(note, done)| {
                *done = true;
                note
            })
            .collect();

        let outcome = process_round(&state, round, round_index, &pending)?;
        if settings.verify_consistency {
            outcome
                .state
                .check_consistency(round.name(), settings.consistency_tolerance)?;
        }

        trajectory.push(DilutionPoint {
            round_index: Some(round_index),
            label: round.name().to_string(),
            total_shares: outcome.state.total_shares_outstanding,
            founder_percent: outcome.state.founder_percent(),
        });
        summaries.push(outcome.summary);
        conversions.extend(outcome.conversions);
        state = outcome.state;
    }

    debug!(
        company = company.name(),
        rounds = round_count,
        total_shares = state.total_shares_outstanding,
        "cap table projected"
    );

    let categories = category_breakdown(&state);
    Ok(OwnershipSnapshot::Computed(Box::new(CapTableProjection {
        state,
        trajectory,
        categories,
        rounds: summaries,
        conversions,
    })))
}

/// Totals per category, in category order, omitting empty categories.
pub fn category_breakdown(state: &CapTableState) -> Vec<CategoryTotal> {
    StakeholderCategory::ALL
        .iter()
        .filter_map(|&category| {
            let (shares, invested_capital, count) = state
                .stakeholders
                .iter()
                .filter(|holder| holder.category == category)
                .fold((0.0, 0.0, 0usize), |(shares, invested, count), holder| {
                    (shares + holder.shares, invested + holder.invested_capital, count + 1)
                });
            (count > 0).then(|| CategoryTotal {
                category,
                shares,
                invested_capital,
                ownership_percent: ownership_percent(shares, state.total_shares_outstanding),
            })
        })
        .collect()
}
