//! Log-shaped news domains (armory, funds).
//!
//! Both arrive as a map of stable id → `{timestamp, news}` and differ
//! only in which pattern vocabulary classifies their lines.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{DecodedPage, SyncDomain};
use crate::events::{EventParser, LogEvent, RawLogLine};
use crate::source::SourceError;

#[derive(Debug, Deserialize)]
struct NewsEntry {
    news: String,
    timestamp: u64,
}

/// A log-shaped domain: raw lines through a pattern vocabulary.
pub struct NewsDomain {
    key: &'static str,
    selection: &'static str,
    parser: EventParser,
}

impl NewsDomain {
    /// Armory transfer log.
    #[must_use]
    pub fn armory() -> Self {
        Self {
            key: "armory",
            selection: "armorynews",
            parser: EventParser::armory(),
        }
    }

    /// Fund transfer log.
    #[must_use]
    pub fn funds() -> Self {
        Self {
            key: "funds",
            selection: "fundsnews",
            parser: EventParser::funds(),
        }
    }
}

impl SyncDomain for NewsDomain {
    type Record = LogEvent;

    fn key(&self) -> &'static str {
        self.key
    }

    fn selection(&self) -> &'static str {
        self.selection
    }

    fn decode_page(&self, payload: &Value) -> Result<DecodedPage<LogEvent>, SourceError> {
        if payload.is_null() {
            return Ok(DecodedPage::empty());
        }

        let Value::Object(map) = payload else {
            return Err(SourceError::Malformed(format!(
                "{} payload is not an id-keyed map",
                self.selection
            )));
        };

        let mut page = DecodedPage::empty();
        for (id, entry) in map {
            let entry = match serde_json::from_value::<NewsEntry>(entry.clone()) {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(domain = self.key, %id, %err, "dropping malformed news entry");
                    page.parse_misses += 1;
                    continue;
                }
            };

            let line = RawLogLine {
                id: id.clone(),
                timestamp: entry.timestamp,
                text: entry.news,
            };
            match self.parser.parse(&line) {
                Some(event) => page.records.push(event),
                None => page.parse_misses += 1,
            }
        }
        Ok(page)
    }
}
