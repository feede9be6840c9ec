//! Persisted document shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// There is only ever one live session; every page load resets it.
pub const SESSION_ID: &str = "eve-response";

pub const INTERACTIONS: &str = "interactions";
pub const FINAL_RESPONSE: &str = "finalResponse";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionRecord {
    pub dodge_count: u32,
    pub points: u32,
    pub last_updated: DateTime<Utc>,
    pub sessions: Vec<DodgeEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DodgeEntry {
    pub timestamp: DateTime<Utc>,
    pub click_number: u32,
    pub points_at_time: u32,
}

impl InteractionRecord {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            last_updated: now,
            ..Self::default()
        }
    }

    pub fn push_dodge(&mut self, click_number: u32, points_at_time: u32, now: DateTime<Utc>) {
        self.dodge_count = click_number;
        self.last_updated = now;
        self.sessions.push(DodgeEntry {
            timestamp: now,
            click_number,
            points_at_time,
        });
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResponse {
    pub response: Answer,
    pub timestamp: DateTime<Utc>,
    pub dodge_count_before_yes: u32,
    pub final_points: u32,
}
