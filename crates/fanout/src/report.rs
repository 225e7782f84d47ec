//! Aggregation and rendering of a completed run.
//!
//! Records are rebuilt from the accounts in scope order and, within an
//! account, resolved-region order. If any outcome is opaque, the whole
//! report switches to plain text.

use crate::types::{Account, Outcome};
use serde_json::{Map, Value};
use std::fmt;

pub const PROFILE_KEY: &str = "Profile";
pub const ACCOUNT_KEY: &str = "Account";
pub const REGION_KEY: &str = "Region";

/// Key holding a structured payload that is not a JSON object.
pub const RESULT_KEY: &str = "Result";

/// One outcome tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub profile: String,
    pub account: String,
    pub region: String,
    pub outcome: Outcome,
}

impl Record {
    /// The structured payload with provenance merged in.
    ///
    /// Object payloads gain `Profile`, `Account` and `Region` keys (replacing
    /// any of the same name); other payloads are nested under `Result`.
    /// Opaque text is kept under `Result` as a string.
    pub fn merged(&self) -> Value {
        let mut map = match &self.outcome {
            Outcome::Structured(Value::Object(object)) => object.clone(),
            Outcome::Structured(other) => {
                let mut map = Map::new();
                map.insert(RESULT_KEY.to_string(), other.clone());
                map
            }
            Outcome::Opaque(text) => {
                let mut map = Map::new();
                map.insert(RESULT_KEY.to_string(), Value::String(text.clone()));
                map
            }
        };
        map.insert(PROFILE_KEY.to_string(), Value::String(self.profile.clone()));
        map.insert(ACCOUNT_KEY.to_string(), Value::String(self.account.clone()));
        map.insert(REGION_KEY.to_string(), Value::String(self.region.clone()));
        Value::Object(map)
    }
}

/// Flatten accounts into provenance-tagged records in report order.
pub fn records(accounts: &[Account]) -> Vec<Record> {
    accounts
        .iter()
        .flat_map(|account| {
            account.outcomes().map(move |(region, outcome)| Record {
                profile: account.profile.clone(),
                account: account.account_id.clone(),
                region: region.to_string(),
                outcome: outcome.clone(),
            })
        })
        .collect()
}

/// The final report, in one of two global modes.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedReport {
    /// Every outcome was structured: one JSON array of merged records
    Document(Vec<Value>),
    /// At least one outcome was text: four-line blocks per record
    Plain(Vec<Record>),
}

impl RenderedReport {
    /// Check if the report is in plain-text mode
    pub fn is_plain(&self) -> bool {
        matches!(self, Self::Plain(_))
    }

    /// Number of records in the report
    pub fn len(&self) -> usize {
        match self {
            Self::Document(values) => values.len(),
            Self::Plain(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Render completed accounts into a report.
pub fn render(accounts: &[Account]) -> RenderedReport {
    let records = records(accounts);

    if accounts.iter().any(Account::is_opaque) {
        RenderedReport::Plain(records)
    } else {
        RenderedReport::Document(records.iter().map(Record::merged).collect())
    }
}

impl fmt::Display for RenderedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document(values) => {
                let json = serde_json::to_string_pretty(values).map_err(|_| fmt::Error)?;
                write!(f, "{json}")
            }
            Self::Plain(records) => {
                for record in records {
                    writeln!(f, "{PROFILE_KEY}: {}", record.profile)?;
                    writeln!(f, "{ACCOUNT_KEY}: {}", record.account)?;
                    writeln!(f, "{REGION_KEY}: {}", record.region)?;
                    match &record.outcome {
                        Outcome::Opaque(text) => writeln!(f, "{}", text.trim_end_matches('\n'))?,
                        Outcome::Structured(value) => {
                            let json =
                                serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
                            writeln!(f, "{json}")?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
