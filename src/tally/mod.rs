//! The penalty domain: who missed which chore and when. A month of penalties is one
//! [PenaltyDocument], stored remotely as a JSON array at [document_path].
//!
//! Field names on the wire are `id`, `user`, `type` and `date`, with the users encoded as `me` and
//! `partner`, so documents stay compatible with ones written by the web version of the tracker.

pub mod progress;
pub mod score;

use std::fmt::{self, Display};

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::time::date_to_month_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum User {
    #[serde(rename = "me")]
    A,
    #[serde(rename = "partner")]
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyKind {
    Trash,
    Dishes,
    Stove,
}

impl PenaltyKind {
    pub fn label(self) -> &'static str {
        match self {
            PenaltyKind::Trash => "Didn't take out the trash",
            PenaltyKind::Dishes => "Didn't wash the dishes",
            PenaltyKind::Stove => "Didn't clean the stove",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            PenaltyKind::Trash => "🗑️",
            PenaltyKind::Dishes => "🍽️",
            PenaltyKind::Stove => "🔥",
        }
    }
}

impl Display for PenaltyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

/// A single missed chore. Never modified after creation, only removed again by an undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyRecord {
    pub id: String,
    pub user: User,
    #[serde(rename = "type")]
    pub kind: PenaltyKind,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
}

impl PenaltyRecord {
    pub fn new(user: User, kind: PenaltyKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user,
            kind,
            timestamp,
        }
    }

    /// Prefix of the id that is enough to tell records apart in a listing.
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

pub type PenaltyDocument = Vec<PenaltyRecord>;

/// Remote path of the document for the month `date` falls into.
pub fn document_path(date: NaiveDate) -> String {
    format!("data/{}.json", date_to_month_key(date))
}

pub fn add_penalty(document: &[PenaltyRecord], record: PenaltyRecord) -> PenaltyDocument {
    let mut next = document.to_vec();
    next.push(record);
    next
}

pub fn undo_penalty(document: &[PenaltyRecord], id: &str) -> PenaltyDocument {
    document.iter().filter(|v| v.id != id).cloned().collect()
}

/// Finds the record whose id is `prefix` or starts with it. Ambiguous prefixes are rejected.
pub fn find_penalty<'a>(document: &'a [PenaltyRecord], prefix: &str) -> Result<&'a PenaltyRecord> {
    if prefix.is_empty() {
        return Err(anyhow!("Penalty id can't be empty"));
    }
    if let Some(exact) = document.iter().find(|v| v.id == prefix) {
        return Ok(exact);
    }
    let mut matching = document.iter().filter(|v| v.id.starts_with(prefix));
    match (matching.next(), matching.next()) {
        (Some(found), None) => Ok(found),
        (Some(_), Some(_)) => Err(anyhow!("Id {prefix:?} matches several penalties")),
        (None, _) => Err(anyhow!("No penalty with id {prefix:?} this month")),
    }
}
