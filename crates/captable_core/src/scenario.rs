//! Scenario inputs and the append-only scenario that owns them.
//!
//! A scenario is one company, the SAFE notes issued against it, and the
//! priced rounds in the order they were added. Every derived view is a pure
//! replay of these lists; the only mutations are appending a note, appending
//! a round, and recording the round at which pending notes converted.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CapTableError, CapTableResult};
use crate::exit_waterfall::{exit_projection, ExitScenario};
use crate::projector::{ownership_snapshot, OwnershipSnapshot};
use crate::settings::ProjectionSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    name: String,
    founders_shares: u64,
    total_shares: u64,
    initial_valuation: f64,
}

impl Company {
    pub fn new(
        name: impl Into<String>,
        founders_shares: u64,
        total_shares: u64,
        initial_valuation: f64,
    ) -> CapTableResult<Self> {
        let company = Self {
            name: name.into(),
            founders_shares,
            total_shares,
            initial_valuation,
        };
        company.validate()?;
        Ok(company)
    }

    pub fn validate(&self) -> CapTableResult<()> {
        if self.founders_shares == 0 {
            return Err(CapTableError::validation(
                "founders shares must be greater than zero",
            ));
        }
        if self.total_shares == 0 {
            return Err(CapTableError::validation(
                "total shares must be greater than zero",
            ));
        }
        if self.founders_shares > self.total_shares {
            return Err(CapTableError::validation(format!(
                "founders shares ({}) exceed total shares ({})",
                self.founders_shares, self.total_shares
            )));
        }
        if !(self.initial_valuation.is_finite() && self.initial_valuation >= 0.0) {
            return Err(CapTableError::validation(format!(
                "initial valuation must be a non-negative number, got {}",
                self.initial_valuation
            )));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn founders_shares(&self) -> u64 {
        self.founders_shares
    }

    pub fn total_shares(&self) -> u64 {
        self.total_shares
    }

    pub fn initial_valuation(&self) -> f64 {
        self.initial_valuation
    }

    /// Shares held at setup by anyone other than the founders.
    pub fn common_shares(&self) -> u64 {
        self.total_shares - self.founders_shares
    }

    pub fn founder_percent(&self) -> f64 {
        crate::share_math::ownership_percent(
            self.founders_shares as f64,
            self.total_shares as f64,
        )
    }

    /// `None` while the company has no initial valuation.
    pub fn initial_price_per_share(&self) -> Option<f64> {
        if self.initial_valuation > 0.0 {
            Some(crate::share_math::price_per_share(
                self.initial_valuation,
                self.total_shares as f64,
            ))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeNote {
    investor_name: String,
    amount: f64,
    discount_percent: f64,
    valuation_cap: Option<f64>,
    /// Number of rounds that existed when the note was issued. The note
    /// converts at the round with this index.
    issued_at: usize,
    /// Index of the round that converted the note.
    #[serde(default)]
    converted_at: Option<usize>,
}

impl SafeNote {
    pub fn new(
        investor_name: impl Into<String>,
        amount: f64,
        discount_percent: f64,
        valuation_cap: Option<f64>,
    ) -> CapTableResult<Self> {
        let note = Self {
            investor_name: investor_name.into(),
            amount,
            discount_percent,
            valuation_cap,
            issued_at: 0,
            converted_at: None,
        };
        note.validate()?;
        Ok(note)
    }

    pub fn with_issue_epoch(mut self, issued_at: usize) -> Self {
        self.issued_at = issued_at;
        self
    }

    pub fn validate(&self) -> CapTableResult<()> {
        if !(self.amount.is_finite() && self.amount > 0.0) {
            return Err(CapTableError::validation(format!(
                "SAFE amount for '{}' must be positive, got {}",
                self.investor_name, self.amount
            )));
        }
        if !(0.0..=100.0).contains(&self.discount_percent) {
            return Err(CapTableError::validation(format!(
                "SAFE discount for '{}' must be within [0, 100], got {}",
                self.investor_name, self.discount_percent
            )));
        }
        if let Some(cap) = self.valuation_cap {
            if !(cap.is_finite() && cap > 0.0) {
                return Err(CapTableError::validation(format!(
                    "SAFE valuation cap for '{}' must be positive, got {}",
                    self.investor_name, cap
                )));
            }
        }
        if let Some(round) = self.converted_at {
            if round != self.issued_at {
                return Err(CapTableError::validation(format!(
                    "SAFE '{}' issued before round {} cannot convert at round {}",
                    self.investor_name, self.issued_at, round
                )));
            }
        }
        Ok(())
    }

    pub fn investor_name(&self) -> &str {
        &self.investor_name
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn discount_percent(&self) -> f64 {
        self.discount_percent
    }

    pub fn valuation_cap(&self) -> Option<f64> {
        self.valuation_cap
    }

    pub fn issued_at(&self) -> usize {
        self.issued_at
    }

    pub fn converted_at(&self) -> Option<usize> {
        self.converted_at
    }

    pub fn is_converted(&self) -> bool {
        self.converted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundInvestor {
    pub name: String,
    pub amount: f64,
}

impl RoundInvestor {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedRound {
    name: String,
    pre_money_valuation: f64,
    investment_amount: f64,
    investors: Vec<RoundInvestor>,
}

impl PricedRound {
    /// Builds a round whose headline investment is tracked separately from
    /// the individual investor contributions.
    pub fn new(
        name: impl Into<String>,
        pre_money_valuation: f64,
        investment_amount: f64,
        investors: Vec<RoundInvestor>,
    ) -> CapTableResult<Self> {
        let round = Self {
            name: name.into(),
            pre_money_valuation,
            investment_amount,
            investors,
        };
        round.validate()?;
        Ok(round)
    }

    /// Builds a round whose headline investment is the sum of its investors.
    pub fn from_investors(
        name: impl Into<String>,
        pre_money_valuation: f64,
        investors: Vec<RoundInvestor>,
    ) -> CapTableResult<Self> {
        let investment_amount = investors.iter().map(|investor| investor.amount).sum();
        Self::new(name, pre_money_valuation, investment_amount, investors)
    }

    pub fn validate(&self) -> CapTableResult<()> {
        if !(self.pre_money_valuation.is_finite() && self.pre_money_valuation > 0.0) {
            return Err(CapTableError::validation(format!(
                "pre-money valuation for '{}' must be positive, got {}",
                self.name, self.pre_money_valuation
            )));
        }
        if self.investors.is_empty() {
            return Err(CapTableError::validation(format!(
                "round '{}' needs at least one investor",
                self.name
            )));
        }
        for investor in &self.investors {
            if !(investor.amount.is_finite() && investor.amount > 0.0) {
                return Err(CapTableError::validation(format!(
                    "investment from '{}' in round '{}' must be positive, got {}",
                    investor.name, self.name, investor.amount
                )));
            }
        }
        if !(self.investment_amount.is_finite() && self.investment_amount > 0.0) {
            return Err(CapTableError::validation(format!(
                "investment amount for '{}' must be positive, got {}",
                self.name, self.investment_amount
            )));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pre_money_valuation(&self) -> f64 {
        self.pre_money_valuation
    }

    pub fn investment_amount(&self) -> f64 {
        self.investment_amount
    }

    pub fn post_money_valuation(&self) -> f64 {
        self.pre_money_valuation + self.investment_amount
    }

    pub fn investors(&self) -> &[RoundInvestor] {
        &self.investors
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ScenarioParts {
    company: Company,
    #[serde(default)]
    safe_notes: Vec<SafeNote>,
    #[serde(default)]
    rounds: Vec<PricedRound>,
    #[serde(default)]
    settings: ProjectionSettings,
}

/// The append-only inputs behind every cap table view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ScenarioParts")]
pub struct Scenario {
    company: Company,
    safe_notes: Vec<SafeNote>,
    rounds: Vec<PricedRound>,
    settings: ProjectionSettings,
}

impl Scenario {
    pub fn new(company: Company) -> Self {
        Self {
            company,
            safe_notes: Vec::new(),
            rounds: Vec::new(),
            settings: ProjectionSettings::default(),
        }
    }

    pub fn setup_company(
        name: impl Into<String>,
        founders_shares: u64,
        total_shares: u64,
        initial_valuation: f64,
    ) -> CapTableResult<Self> {
        let company = Company::new(name, founders_shares, total_shares, initial_valuation)?;
        info!(
            company = company.name(),
            founders_shares, total_shares, "company set up"
        );
        Ok(Self::new(company))
    }

    pub fn with_settings(mut self, settings: ProjectionSettings) -> CapTableResult<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    /// Rebuilds a scenario from stored inputs, replaying notes and rounds in
    /// epoch order so every invariant is checked again.
    pub fn from_parts(
        company: Company,
        safe_notes: Vec<SafeNote>,
        rounds: Vec<PricedRound>,
        settings: ProjectionSettings,
    ) -> CapTableResult<Self> {
        company.validate()?;
        let mut scenario = Self::new(company).with_settings(settings)?;

        for note in &safe_notes {
            note.validate()?;
            if note.issued_at > rounds.len() {
                return Err(CapTableError::validation(format!(
                    "SAFE '{}' references round {} but only {} rounds exist",
                    note.investor_name,
                    note.issued_at,
                    rounds.len()
                )));
            }
        }

        let round_count = rounds.len();
        let mut rounds = rounds.into_iter();
        for epoch in 0..=round_count {
            for note in safe_notes.iter().filter(|note| note.issued_at == epoch) {
                scenario.add_safe_note(
                    note.investor_name.clone(),
                    note.amount,
                    note.discount_percent,
                    note.valuation_cap,
                )?;
            }
            if let Some(round) = rounds.next() {
                scenario.add_round(round)?;
            }
        }
        Ok(scenario)
    }

    /// Replaces the company. Notes and rounds were priced against the old
    /// share count, so they are discarded with it.
    pub fn replace_company(&mut self, company: Company) {
        info!(company = company.name(), "company replaced");
        self.company = company;
        self.safe_notes.clear();
        self.rounds.clear();
    }

    pub fn add_safe_note(
        &mut self,
        investor_name: impl Into<String>,
        amount: f64,
        discount_percent: f64,
        valuation_cap: Option<f64>,
    ) -> CapTableResult<&SafeNote> {
        let note = SafeNote::new(investor_name, amount, discount_percent, valuation_cap)?
            .with_issue_epoch(self.rounds.len());
        info!(
            investor = note.investor_name(),
            amount,
            epoch = note.issued_at,
            "SAFE note added"
        );
        self.safe_notes.push(note);
        Ok(&self.safe_notes[self.safe_notes.len() - 1])
    }

    pub fn add_priced_round(
        &mut self,
        name: impl Into<String>,
        pre_money_valuation: f64,
        investors: Vec<RoundInvestor>,
    ) -> CapTableResult<&PricedRound> {
        let round = PricedRound::from_investors(name, pre_money_valuation, investors)?;
        self.add_round(round)
    }

    /// Appends a round and converts every pending SAFE at it. The round is
    /// replayed against the current history first; if it cannot be processed
    /// the scenario is left untouched.
    pub fn add_round(&mut self, round: PricedRound) -> CapTableResult<&PricedRound> {
        round.validate()?;
        let round_index = self.rounds.len();

        let mut candidate = self.rounds.clone();
        candidate.push(round);
        if let Err(err) = ownership_snapshot(&self.company, &self.safe_notes, &candidate, self.settings) {
            warn!(round = candidate[round_index].name(), error = %err, "round rejected");
            return Err(err);
        }

        for note in self
            .safe_notes
            .iter_mut()
            .filter(|note| note.converted_at.is_none() && note.issued_at <= round_index)
        {
            note.converted_at = Some(round_index);
        }
        self.rounds = candidate;
        info!(round = self.rounds[round_index].name(), round_index, "priced round added");
        Ok(&self.rounds[round_index])
    }

    pub fn company(&self) -> &Company {
        &self.company
    }

    pub fn safe_notes(&self) -> &[SafeNote] {
        &self.safe_notes
    }

    pub fn rounds(&self) -> &[PricedRound] {
        &self.rounds
    }

    pub fn settings(&self) -> ProjectionSettings {
        self.settings
    }

    pub fn pending_safe_notes(&self) -> impl Iterator<Item = &SafeNote> {
        self.safe_notes.iter().filter(|note| !note.is_converted())
    }

    pub fn ownership_snapshot(&self) -> CapTableResult<OwnershipSnapshot> {
        ownership_snapshot(&self.company, &self.safe_notes, &self.rounds, self.settings)
    }

    pub fn exit_projection(&self, exit_valuations: &[f64]) -> CapTableResult<Vec<ExitScenario>> {
        exit_projection(&self.ownership_snapshot()?, exit_valuations)
    }
}

impl TryFrom<ScenarioParts> for Scenario {
    type Error = CapTableError;

    fn try_from(parts: ScenarioParts) -> Result<Self, Self::Error> {
        Scenario::from_parts(parts.company, parts.safe_notes, parts.rounds, parts.settings)
    }
}
