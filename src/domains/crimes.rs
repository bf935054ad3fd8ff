//! The structured crimes domain.
//!
//! Crime records arrive already structured (no text parsing). Their
//! status fields change over time, so a later-fetched snapshot of the
//! same crime id must overwrite the cached one — which the merged
//! store's upsert semantics give us for free.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{DecodedPage, SyncDomain};
use crate::source::SourceError;
use crate::store::MergeRecord;

/// One member slot in an organized crime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeSlot {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub success_chance: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardItem {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeRewards {
    #[serde(default)]
    pub money: i64,
    #[serde(default)]
    pub respect: i64,
    #[serde(default)]
    pub items: Vec<RewardItem>,
}

/// One organized crime, as the remote reports it. Every field except
/// the id is defaulted so schema drift on the remote never fails a
/// sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeRecord {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub difficulty: u8,
    /// Outcome/state, e.g. "planning", "successful", "failed". Changes
    /// over a crime's lifetime.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub planning_at: Option<u64>,
    #[serde(default)]
    pub executed_at: Option<u64>,
    #[serde(default)]
    pub slots: Vec<CrimeSlot>,
    #[serde(default)]
    pub rewards: Option<CrimeRewards>,
}

impl MergeRecord for CrimeRecord {
    fn record_id(&self) -> String {
        self.id.to_string()
    }

    /// Execution time when the crime ran, otherwise the best-known
    /// lifecycle timestamp.
    fn timestamp(&self) -> u64 {
        self.executed_at
            .or(self.planning_at)
            .unwrap_or(self.created_at)
    }
}

/// Completed organized-crime history.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrimesDomain;

impl SyncDomain for CrimesDomain {
    type Record = CrimeRecord;

    fn key(&self) -> &'static str {
        "crimes"
    }

    fn selection(&self) -> &'static str {
        "crimes"
    }

    fn category(&self) -> Option<&'static str> {
        Some("completed")
    }

    fn decode_page(&self, payload: &Value) -> Result<DecodedPage<CrimeRecord>, SourceError> {
        // Exhausted history comes back as null or a missing key.
        if payload.is_null() {
            return Ok(DecodedPage::empty());
        }

        // The remote serves either an id-keyed map or a plain array.
        let entries: Vec<&Value> = match payload {
            Value::Object(map) => map.values().collect(),
            Value::Array(list) => list.iter().collect(),
            other => {
                return Err(SourceError::Malformed(format!(
                    "crimes payload is neither map nor array: {other}"
                )))
            }
        };

        let mut page = DecodedPage::empty();
        for entry in entries {
            match serde_json::from_value::<CrimeRecord>(entry.clone()) {
                Ok(record) => page.records.push(record),
                Err(err) => {
                    debug!(%err, "dropping undecodable crime record");
                    page.parse_misses += 1;
                }
            }
        }
        Ok(page)
    }
}
