pub mod error;
pub mod exit_waterfall;
pub mod projector;
pub mod round_processor;
pub mod safe_converter;
pub mod scenario;
pub mod settings;
/// The `captable_core` crate is the computation engine behind the cap table views.
/// Every function is pure over an explicit scenario snapshot (company, SAFE list,
/// ordered round list), so any view can be recomputed from scratch on each edit.
///
/// Key components:
/// - **Share math**: price-per-share, shares-from-investment, ownership percentages.
/// - **SAFE conversion**: discount and valuation-cap pricing of convertible notes.
/// - **Round processing**: converts pending SAFEs and issues shares for one priced round.
/// - **Projection**: replays the round history into ownership snapshots and dilution trajectories.
/// - **Exit waterfall**: pro-rata payouts, multiples and ROI under hypothetical exits.
pub mod share_math;

pub use error::{CapTableError, CapTableResult};
pub use exit_waterfall::{exit_projection, project_exits, ExitScenario, StakeholderPayout};
pub use projector::{
    category_breakdown, ownership_snapshot, project_through, CapTableProjection, CategoryTotal,
    DilutionPoint, OwnershipSnapshot,
};
pub use round_processor::{
    process_round, CapTableState, NamedHolding, RoundOutcome, RoundSummary, Stakeholder,
    StakeholderCategory,
};
pub use safe_converter::{convert_safe, ConversionBasis, SafeConversion};
pub use scenario::{Company, PricedRound, RoundInvestor, SafeNote, Scenario};
pub use settings::ProjectionSettings;
