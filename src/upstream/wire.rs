/// Upstream GraphQL wire types — serde shapes for deserializing the bracket
/// API's responses. These map to our clean domain types in loader.rs.
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Query documents
// ---------------------------------------------------------------------------

/// Tier 1: tournament identity plus a bounded event list. Entrants are a
/// capped sample; the full participant set accretes from set slots later.
pub const TOURNAMENT_QUERY: &str = r#"
query TournamentBySlug($slug: String!) {
  tournament(slug: $slug) {
    id
    name
    slug
    url
    events(limit: 16) {
      id
      name
      slug
      entrants(query: { page: 1, perPage: 64 }) {
        nodes {
          id
          name
          participants { id gamerTag }
        }
      }
    }
  }
}
"#;

pub const EVENT_PHASE_GROUPS_QUERY: &str = r#"
query EventPhaseGroups($eventId: ID!) {
  event(id: $eventId) {
    id
    phaseGroups {
      id
      displayIdentifier
      phase { name }
    }
  }
}
"#;

/// One page of sets for a phase group. perPage is sized so the estimated
/// response object count stays well under the per-response object ceiling.
pub const PHASE_GROUP_SETS_QUERY: &str = r#"
query PhaseGroupSets($phaseGroupId: ID!, $page: Int!, $perPage: Int!) {
  phaseGroup(id: $phaseGroupId) {
    id
    sets(page: $page, perPage: $perPage, sortType: STANDARD) {
      nodes {
        id
        round
        fullRoundText
        state
        winnerId
        startedAt
        completedAt
        updatedAt
        slots {
          entrant {
            id
            name
            participants { id gamerTag }
          }
          standing {
            stats { score { value } }
          }
        }
        games { winnerId }
      }
    }
  }
}
"#;

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
pub struct TournamentData {
    pub tournament: Option<WireTournament>,
}

#[derive(Debug, Deserialize)]
pub struct WireTournament {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub url: Option<String>,
    pub events: Option<Vec<WireEvent>>,
}

#[derive(Debug, Deserialize)]
pub struct WireEvent {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub entrants: Option<WireEntrantPage>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WireEntrantPage {
    pub nodes: Option<Vec<WireEntrant>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WireEntrant {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub participants: Option<Vec<WireParticipant>>,
}

#[derive(Debug, Deserialize)]
pub struct WireParticipant {
    pub id: Option<i64>,
    #[serde(rename = "gamerTag")]
    pub gamer_tag: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EventData {
    pub event: Option<WireEventDetail>,
}

#[derive(Debug, Deserialize)]
pub struct WireEventDetail {
    pub id: Option<i64>,
    #[serde(rename = "phaseGroups")]
    pub phase_groups: Option<Vec<WirePhaseGroup>>,
}

#[derive(Debug, Deserialize)]
pub struct WirePhaseGroup {
    pub id: Option<i64>,
    #[serde(rename = "displayIdentifier")]
    pub display_identifier: Option<String>,
    pub phase: Option<WirePhase>,
}

#[derive(Debug, Deserialize)]
pub struct WirePhase {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PhaseGroupData {
    #[serde(rename = "phaseGroup")]
    pub phase_group: Option<WirePhaseGroupSets>,
}

#[derive(Debug, Deserialize)]
pub struct WirePhaseGroupSets {
    pub id: Option<i64>,
    pub sets: Option<WireSetPage>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WireSetPage {
    pub nodes: Option<Vec<WireSet>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WireSet {
    pub id: Option<i64>,
    pub round: Option<i64>,
    #[serde(rename = "fullRoundText")]
    pub full_round_text: Option<String>,
    /// Upstream state codes: 1 pending, 2 in progress, 3 completed.
    pub state: Option<i64>,
    #[serde(rename = "winnerId")]
    pub winner_id: Option<i64>,
    #[serde(rename = "startedAt")]
    pub started_at: Option<i64>,
    #[serde(rename = "completedAt")]
    pub completed_at: Option<i64>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<i64>,
    pub slots: Option<Vec<WireSlot>>,
    pub games: Option<Vec<WireGame>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WireSlot {
    pub entrant: Option<WireEntrant>,
    pub standing: Option<WireStanding>,
}

#[derive(Debug, Deserialize)]
pub struct WireStanding {
    pub stats: Option<WireStats>,
}

#[derive(Debug, Deserialize)]
pub struct WireStats {
    pub score: Option<WireScore>,
}

#[derive(Debug, Deserialize)]
pub struct WireScore {
    pub value: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WireGame {
    #[serde(rename = "winnerId")]
    pub winner_id: Option<i64>,
}
