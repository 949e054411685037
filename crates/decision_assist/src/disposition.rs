//! Advisory review dispositions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AssistError;
use crate::extract::first_json_object;

/// The verdict the assist service recommends
///
/// Advisory only: the adjudication engine maps it into the request state
/// machine and may override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionStatus {
    Approved,
    Pending,
    Rejected,
}

impl FromStr for DispositionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" | "approve" => Ok(DispositionStatus::Approved),
            "pending" => Ok(DispositionStatus::Pending),
            "rejected" | "reject" | "denied" => Ok(DispositionStatus::Rejected),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DispositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispositionStatus::Approved => "approved",
            DispositionStatus::Pending => "pending",
            DispositionStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Reason attached when the advisory path degrades to manual review
pub const FALLBACK_REASON: &str = "Fallback logic used";

/// A parsed advisory verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disposition {
    pub status: DispositionStatus,
    pub reason: String,
    pub notes: Option<String>,
}

/// Wire shape of the verdict object inside the model reply
#[derive(Debug, Deserialize)]
struct RawDisposition {
    status: String,
    reason: Option<String>,
    ai_notes: Option<String>,
}

impl Disposition {
    /// The disposition used when the advisory path fails entirely
    pub fn fallback() -> Self {
        Disposition {
            status: DispositionStatus::Pending,
            reason: FALLBACK_REASON.to_string(),
            notes: None,
        }
    }

    /// Parses a disposition out of a free-form service reply
    ///
    /// Takes the first balanced JSON object in the reply; an object that
    /// parses but carries an unrecognized status is malformed, not pending.
    pub fn from_reply(reply: &str) -> Result<Self, AssistError> {
        let object = first_json_object(reply)
            .ok_or_else(|| AssistError::malformed("no JSON object in reply"))?;
        let raw: RawDisposition = serde_json::from_str(object)
            .map_err(|e| AssistError::malformed(format!("verdict does not parse: {e}")))?;
        let status = raw
            .status
            .parse::<DispositionStatus>()
            .map_err(|()| AssistError::malformed(format!("unknown status {:?}", raw.status)))?;
        Ok(Disposition {
            status,
            reason: raw.reason.unwrap_or_else(|| "No reason given".to_string()),
            notes: raw.ai_notes,
        })
    }
}
