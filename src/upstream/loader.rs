// Materializes a full Tournament from the upstream API: one identity
// request, then per event the phase groups and their paginated set pages.
// Assembly is progressive so a partially failed load still yields an
// internally consistent tournament.

use crate::config::Config;
use crate::models::{
    Bracket, Event, Match, MatchStatus, Player, Score, Tournament, UNKNOWN_PLAYER_TAG,
};
use crate::upstream::client::{ClientError, UpstreamClient};
use crate::upstream::wire::{
    EventData, PhaseGroupData, TournamentData, WireEntrant, WirePhaseGroup, WireSet,
    EVENT_PHASE_GROUPS_QUERY, PHASE_GROUP_SETS_QUERY, TOURNAMENT_QUERY,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub page_size: usize,
    pub page_limit: usize,
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            page_limit: config.page_limit,
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type BracketCallback = Arc<dyn Fn(&str, &Bracket) + Send + Sync>;

/// Optional observation hooks. Both are invoked inline between upstream
/// calls, so they see each bracket as it lands without touching the queue.
#[derive(Clone, Default)]
pub struct LoadHooks {
    pub on_progress: Option<ProgressCallback>,
    pub on_bracket_complete: Option<BracketCallback>,
}

pub async fn load_tournament(
    client: &UpstreamClient,
    slug: &str,
    options: &FetchOptions,
    hooks: &LoadHooks,
) -> Result<Tournament, ClientError> {
    let data = client
        .request(TOURNAMENT_QUERY, json!({ "slug": slug }))
        .await?;
    let parsed: TournamentData =
        serde_json::from_value(data).map_err(|e| ClientError::Parse(e.to_string()))?;
    let Some(wire) = parsed.tournament else {
        return Err(ClientError::NotFound(format!(
            "no tournament with slug '{}'",
            slug
        )));
    };

    let mut tournament = map_tournament(wire, slug);

    for event in &mut tournament.events {
        if let Err(e) = load_event(client, event, options, hooks).await {
            warn!(
                "Failed to load event '{}' ({}), continuing with siblings: {}",
                event.name, event.id, e
            );
        }
    }

    Ok(tournament)
}

async fn load_event(
    client: &UpstreamClient,
    event: &mut Event,
    options: &FetchOptions,
    hooks: &LoadHooks,
) -> Result<(), ClientError> {
    let data = client
        .request(EVENT_PHASE_GROUPS_QUERY, json!({ "eventId": event.id }))
        .await?;
    let parsed: EventData =
        serde_json::from_value(data).map_err(|e| ClientError::Parse(e.to_string()))?;
    let groups = parsed
        .event
        .and_then(|e| e.phase_groups)
        .unwrap_or_default();

    for group in groups {
        let Some(group_id) = group.id else {
            warn!("Skipping phase group without id in event '{}'", event.name);
            continue;
        };
        let name = bracket_name(&group);
        if let Some(progress) = &hooks.on_progress {
            progress(&format!("Loading {} / {}", event.name, name));
        }

        let sets = load_phase_group_sets(client, group_id, options).await;
        let matches: Vec<Match> = sets.iter().map(|s| map_set(s, &name)).collect();
        debug!(
            "Loaded phase group '{}' with {} sets for event '{}'",
            name,
            matches.len(),
            event.name
        );
        install_bracket(
            event,
            Bracket {
                id: group_id.to_string(),
                name,
                matches,
            },
            hooks,
        );
    }

    Ok(())
}

/// Page through a phase group's sets. A short page ends the loop, as does
/// the page ceiling; a failed page ends this group without failing the
/// event.
async fn load_phase_group_sets(
    client: &UpstreamClient,
    group_id: i64,
    options: &FetchOptions,
) -> Vec<WireSet> {
    let mut sets = Vec::new();
    let mut page = 1usize;

    while page <= options.page_limit {
        let result = client
            .request(
                PHASE_GROUP_SETS_QUERY,
                json!({
                    "phaseGroupId": group_id,
                    "page": page,
                    "perPage": options.page_size,
                }),
            )
            .await
            .and_then(|data| {
                serde_json::from_value::<PhaseGroupData>(data)
                    .map_err(|e| ClientError::Parse(e.to_string()))
            });

        let nodes = match result {
            Ok(parsed) => parsed
                .phase_group
                .and_then(|g| g.sets)
                .and_then(|s| s.nodes)
                .unwrap_or_default(),
            Err(e) => {
                warn!(
                    "Set page {} failed for phase group {}, ending pagination: {}",
                    page, group_id, e
                );
                break;
            }
        };

        let count = nodes.len();
        sets.extend(nodes);
        if count < options.page_size {
            break;
        }
        page += 1;
    }

    sets
}

/// Install a finished bracket on its event: union new players into the
/// participant set (placeholders excluded), append newly pending or
/// in-progress matches to current_matches deduped by id.
fn install_bracket(event: &mut Event, bracket: Bracket, hooks: &LoadHooks) {
    for m in &bracket.matches {
        for player in [m.player1.as_ref(), m.player2.as_ref()].into_iter().flatten() {
            if player.is_placeholder() {
                continue;
            }
            if !event.participants.iter().any(|p| p.id == player.id) {
                event.participants.push(player.clone());
            }
        }
        if matches!(m.status, MatchStatus::Pending | MatchStatus::InProgress)
            && !event.current_matches.iter().any(|c| c.id == m.id)
        {
            event.current_matches.push(m.clone());
        }
    }
    if let Some(done) = &hooks.on_bracket_complete {
        done(&event.name, &bracket);
    }
    event.brackets.push(bracket);
}

// ---------------------------------------------------------------------------
// Wire → domain mapping
// ---------------------------------------------------------------------------

fn map_tournament(wire: crate::upstream::wire::WireTournament, slug: &str) -> Tournament {
    let events = wire
        .events
        .unwrap_or_default()
        .into_iter()
        .filter_map(|event| {
            let Some(id) = event.id else {
                warn!("Skipping event without id in tournament '{}'", slug);
                return None;
            };
            let participants = event
                .entrants
                .and_then(|page| page.nodes)
                .unwrap_or_default()
                .iter()
                .map(map_entrant)
                .filter(|p| !p.is_placeholder())
                .collect();
            Some(Event {
                id: id.to_string(),
                name: event.name.unwrap_or_else(|| format!("Event {}", id)),
                slug: event.slug,
                brackets: Vec::new(),
                participants,
                current_matches: Vec::new(),
            })
        })
        .collect();

    Tournament {
        id: wire
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| slug.to_string()),
        name: wire.name.unwrap_or_else(|| slug.to_string()),
        slug: wire.slug.unwrap_or_else(|| slug.to_string()),
        url: wire.url,
        events,
    }
}

pub(crate) fn bracket_name(group: &WirePhaseGroup) -> String {
    let identifier = group
        .display_identifier
        .clone()
        .or_else(|| group.id.map(|id| id.to_string()))
        .unwrap_or_default();
    match group.phase.as_ref().and_then(|p| p.name.clone()) {
        Some(phase) if !phase.trim().is_empty() => format!("{} - {}", phase, identifier),
        _ => identifier,
    }
}

pub(crate) fn map_status(state: Option<i64>) -> MatchStatus {
    match state {
        Some(2) => MatchStatus::InProgress,
        Some(3) => MatchStatus::Completed,
        _ => MatchStatus::Pending,
    }
}

pub(crate) fn map_entrant(entrant: &WireEntrant) -> Player {
    let participant = entrant.participants.as_ref().and_then(|p| p.first());
    let tag = participant
        .and_then(|p| p.gamer_tag.clone())
        .or_else(|| entrant.name.clone())
        .filter(|t| !t.trim().is_empty());
    match (entrant.id, tag) {
        (Some(id), Some(tag)) => Player {
            id: id.to_string(),
            tag,
            name: entrant.name.clone(),
            participant_id: participant.and_then(|p| p.id).map(|id| id.to_string()),
        },
        _ => placeholder_player(),
    }
}

fn placeholder_player() -> Player {
    Player {
        id: format!("unknown-{}", Uuid::new_v4()),
        tag: UNKNOWN_PLAYER_TAG.to_string(),
        name: None,
        participant_id: None,
    }
}

pub(crate) fn map_set(set: &WireSet, bracket_name: &str) -> Match {
    let slots = set.slots.as_deref().unwrap_or_default();
    let entrant1 = slots.first().and_then(|s| s.entrant.as_ref());
    let entrant2 = slots.get(1).and_then(|s| s.entrant.as_ref());
    let entrant1_id = entrant1.and_then(|e| e.id);
    let entrant2_id = entrant2.and_then(|e| e.id);

    let player1 = entrant1.map(map_entrant);
    let player2 = entrant2.map(map_entrant);

    let status = map_status(set.state);

    let winner = match set.winner_id {
        Some(winner_id) if Some(winner_id) == entrant1_id => player1.clone(),
        Some(winner_id) if Some(winner_id) == entrant2_id => player2.clone(),
        _ => None,
    };

    let score = extract_score(set, entrant1_id, entrant2_id, status);

    let round = set
        .full_round_text
        .clone()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| format!("Round {}", set.round.unwrap_or(0)));

    Match {
        id: set
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("unknown-{}", Uuid::new_v4())),
        round,
        player1,
        player2,
        winner,
        status,
        bracket_name: bracket_name.to_string(),
        score,
        started_at: set.started_at,
        completed_at: set.completed_at,
        updated_at: set.updated_at,
    }
}

/// Score precedence: explicit slot scores, then per-game winner tallies,
/// then a synthesized 1-0 for completed sets with a known winner.
/// Negative slot scores (disqualifications) disqualify the explicit tier.
pub(crate) fn extract_score(
    set: &WireSet,
    entrant1_id: Option<i64>,
    entrant2_id: Option<i64>,
    status: MatchStatus,
) -> Option<Score> {
    let slots = set.slots.as_deref().unwrap_or_default();
    let slot_value = |index: usize| {
        slots
            .get(index)
            .and_then(|s| s.standing.as_ref())
            .and_then(|s| s.stats.as_ref())
            .and_then(|s| s.score.as_ref())
            .and_then(|s| s.value)
    };
    if let (Some(v1), Some(v2)) = (slot_value(0), slot_value(1)) {
        if v1 >= 0.0 && v2 >= 0.0 {
            return Some(Score {
                p1: v1 as u32,
                p2: v2 as u32,
            });
        }
    }

    let games = set.games.as_deref().unwrap_or_default();
    if !games.is_empty() {
        let mut p1 = 0u32;
        let mut p2 = 0u32;
        for game in games {
            match game.winner_id {
                Some(w) if Some(w) == entrant1_id => p1 += 1,
                Some(w) if Some(w) == entrant2_id => p2 += 1,
                _ => {}
            }
        }
        if p1 > 0 || p2 > 0 {
            return Some(Score { p1, p2 });
        }
    }

    if status == MatchStatus::Completed {
        match set.winner_id {
            Some(w) if Some(w) == entrant1_id => return Some(Score { p1: 1, p2: 0 }),
            Some(w) if Some(w) == entrant2_id => return Some(Score { p1: 0, p2: 1 }),
            _ => {}
        }
    }

    None
}
