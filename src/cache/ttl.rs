// Dynamic TTL policy. Freshness is derived from the current matches of a
// tournament: live sets demand a short TTL, a quiet bracket can idle.
//
// Only `events[*].current_matches` feeds this decision. Widening the input
// to other matches is a contract change for every cached response.

use crate::models::{MatchCounts, MatchStatus, Tournament};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const TTL_LIVE: Duration = Duration::from_secs(15);
pub const TTL_RECENTLY_COMPLETED: Duration = Duration::from_secs(120);
pub const TTL_PENDING: Duration = Duration::from_secs(600);
pub const TTL_IDLE: Duration = Duration::from_secs(1800);

/// A completed match counts as recent for this many seconds.
pub const RECENT_WINDOW_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, Default)]
pub struct MatchActivity {
    pub counts: MatchCounts,
    pub has_ongoing_matches: bool,
    pub has_recent_matches: bool,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn summarize_activity(tournament: &Tournament) -> MatchActivity {
    summarize_activity_at(tournament, now_secs())
}

pub fn summarize_activity_at(tournament: &Tournament, now: i64) -> MatchActivity {
    let mut counts = MatchCounts::default();
    for event in &tournament.events {
        for m in &event.current_matches {
            match m.status {
                MatchStatus::InProgress => counts.ongoing += 1,
                MatchStatus::Pending => counts.pending += 1,
                MatchStatus::Completed => {
                    let recent = m
                        .completed_at
                        .map(|done| now - done < RECENT_WINDOW_SECS)
                        .unwrap_or(false);
                    if recent {
                        counts.recently_completed += 1;
                    } else {
                        counts.old_completed += 1;
                    }
                }
            }
        }
    }
    MatchActivity {
        counts,
        has_ongoing_matches: counts.ongoing > 0,
        has_recent_matches: counts.recently_completed > 0,
    }
}

/// First matching row wins: live → 15s, recently completed → 120s,
/// pending → 600s, otherwise idle at 1800s.
pub fn calculate_ttl(tournament: &Tournament) -> Duration {
    ttl_for_activity(&summarize_activity(tournament))
}

pub fn ttl_for_activity(activity: &MatchActivity) -> Duration {
    if activity.counts.ongoing > 0 {
        TTL_LIVE
    } else if activity.counts.recently_completed > 0 {
        TTL_RECENTLY_COMPLETED
    } else if activity.counts.pending > 0 {
        TTL_PENDING
    } else {
        TTL_IDLE
    }
}
