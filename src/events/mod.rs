//! Typed event records parsed from raw activity log lines.
//!
//! A [`RawLogLine`] is one unit fetched from the remote source. The
//! [`parser::EventParser`] classifies it into a [`LogEvent`] whose
//! [`Action`] is a sum type: one variant per recognized pattern, carrying
//! that pattern's extracted metadata. Events are immutable once parsed
//! and keep the remote-assigned id as their identity.

pub mod grouping;
pub mod parser;

pub use grouping::{group_consecutive, GroupedEvent};
pub use parser::EventParser;

use serde::{Deserialize, Serialize};

use crate::store::MergeRecord;

/// One unparsed log line as the remote delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLogLine {
    pub id: String,
    /// Epoch seconds.
    pub timestamp: u64,
    pub text: String,
}

/// An identity embedded in a log line: profile id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: u64,
    pub name: String,
}

/// What the event moved: an item name with a count, or the money ledger
/// with an amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub quantity: i64,
}

/// Percentage-cut payout metadata attached to a crime-cut event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeCut {
    pub crime_id: u64,
    pub scenario: String,
    pub role: String,
    pub percentage: f64,
    pub old_balance: i64,
    pub new_balance: i64,
}

/// Before/after balances on a direct balance adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    pub old_balance: i64,
    pub new_balance: i64,
}

/// Running total after a faction payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub new_balance: i64,
}

/// One variant per recognized log pattern.
///
/// Armory transfers use the bare verbs; fund movements carry the
/// metadata their patterns extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Deposited,
    Retrieved,
    Used,
    Filled,
    Gave,
    Loaned,
    Returned,
    CrimeCut(CrimeCut),
    BalanceIncreased(BalanceChange),
    BalanceDecreased(BalanceChange),
    Paid(Payout),
}

impl Action {
    /// Display label, also the grouping key: two events with the same
    /// label are the same kind of action regardless of metadata.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Deposited => "deposited",
            Self::Retrieved => "retrieved",
            Self::Used => "used",
            Self::Filled => "filled",
            Self::Gave => "gave",
            Self::Loaned => "loaned",
            Self::Returned => "returned",
            Self::CrimeCut(_) => "crime cut",
            Self::BalanceIncreased(_) => "increased",
            Self::BalanceDecreased(_) => "decreased",
            Self::Paid(_) => "paid",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One typed event. Immutable once parsed; `id` is the remote-assigned
/// stable identity and is never regenerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub id: String,
    /// Epoch seconds.
    pub timestamp: u64,
    pub actor: EntityRef,
    pub action: Action,
    pub subject: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterpart: Option<EntityRef>,
}

impl MergeRecord for LogEvent {
    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}
