// Domain types served to clients, independent of the upstream wire format.
// All JSON is camelCase because the consumers are browser clients.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub url: Option<String>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub brackets: Vec<Bracket>,
    pub participants: Vec<Player>,
    pub current_matches: Vec<Match>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub id: String,
    pub name: String,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub round: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player1: Option<Player>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player2: Option<Player>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Player>,
    pub status: MatchStatus,
    pub bracket_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub p1: u32,
    pub p2: u32,
}

/// Tag-first identity. Synthesized placeholders carry the tag
/// "Unknown Player" and are kept out of participant sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
}

pub const UNKNOWN_PLAYER_TAG: &str = "Unknown Player";

impl Player {
    pub fn is_placeholder(&self) -> bool {
        self.tag == UNKNOWN_PLAYER_TAG
    }
}

// API response envelopes

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentResponse {
    pub data: Tournament,
    pub cached: bool,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    pub has_ongoing_matches: bool,
    pub has_recent_matches: bool,
    pub counts: MatchCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCounts {
    pub ongoing: usize,
    pub recently_completed: usize,
    pub pending: usize,
    pub old_completed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatusResponse {
    pub cached: bool,
    pub metadata: Option<crate::cache::CacheMetadata>,
}
