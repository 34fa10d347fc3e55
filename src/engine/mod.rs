//! Ledger engine: the rules relating people's point totals to events
//!
//! The balance invariant is that a person's stored `points` equals the sum of
//! the deltas of every event listing them. The engine keeps it by crediting
//! participants before recording an event and debiting them before deleting
//! one. Neither sequence is transactional across records; when one stops
//! partway the caller gets an [`EngineError::PartialApplication`] describing
//! the exact prefix that was written, and [`LedgerEngine::recompute_balance`]
//! is the repair tool.

mod error;
mod operations;
mod reports;

pub use error::{
    EngineError, LedgerOperation, ParticipantFailure, PartialFailure, Result,
};
pub use operations::LedgerEngine;
pub use reports::{
    BalanceCheck, ConsistencyWarning, EventSummary, EventView, PersonEntry, PersonRef,
    PersonReport, RankEntry,
};
