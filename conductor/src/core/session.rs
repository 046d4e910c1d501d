//! Supervising-session liveness.
//!
//! All stamps are epoch milliseconds and never move backwards: a stamp is the
//! later of the previous value and the caller's clock.

use chrono::{DateTime, Utc};

use crate::core::state::SessionRecord;

pub fn epoch_ms(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis()
}

fn stamp(previous: Option<i64>, now_ms: i64) -> i64 {
    previous.map_or(now_ms, |prev| prev.max(now_ms))
}

/// Start (or restart) a session.
pub fn activate(session: &mut SessionRecord, session_id: &str, workflow_id: &str, now_ms: i64) {
    let at = stamp(session.last_activity, now_ms);
    *session = SessionRecord {
        active: true,
        session_id: session_id.to_string(),
        workflow_id: workflow_id.to_string(),
        activated_at: Some(at),
        last_activity: Some(at),
    };
}

/// Refresh `last_activity` of an active session. Returns whether anything changed.
pub fn heartbeat(session: &mut SessionRecord, now_ms: i64) -> bool {
    if !session.active {
        return false;
    }
    session.last_activity = Some(stamp(session.last_activity, now_ms));
    true
}

/// End an active session. Returns `false` (and touches nothing) if already inactive.
pub fn deactivate(session: &mut SessionRecord, now_ms: i64) -> bool {
    if !session.active {
        return false;
    }
    session.active = false;
    session.last_activity = Some(stamp(session.last_activity, now_ms));
    true
}

/// Milliseconds since the last recorded activity.
pub fn idle_ms(session: &SessionRecord, now_ms: i64) -> Option<i64> {
    session
        .last_activity
        .map(|last| now_ms.saturating_sub(last).max(0))
}

/// An active session whose last activity is older than the threshold.
pub fn is_stale(session: &SessionRecord, now_ms: i64, stale_after_ms: i64) -> bool {
    session.active && idle_ms(session, now_ms).is_some_and(|idle| idle > stale_after_ms)
}
