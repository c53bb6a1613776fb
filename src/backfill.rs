use std::collections::BTreeMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{ActivityRecord, BackfillSummary, Category, StreakState};
use crate::streak;

pub fn group_events(
    events: Vec<ActivityRecord>,
) -> BTreeMap<(Uuid, Category), Vec<ActivityRecord>> {
    let mut groups: BTreeMap<(Uuid, Category), Vec<ActivityRecord>> = BTreeMap::new();
    for event in events {
        groups
            .entry((event.user_id, event.category))
            .or_default()
            .push(event);
    }
    groups
}

/// Replays one key's events oldest-first through the transition function,
/// from empty state. The result depends only on the event log.
pub fn replay(events: &[ActivityRecord]) -> Option<StreakState> {
    let mut ordered: Vec<&ActivityRecord> = events.iter().collect();
    ordered.sort_by_key(|event| event.occurred_at);

    let mut state: Option<StreakState> = None;
    for event in ordered {
        state = Some(streak::advance(
            state.as_ref(),
            event.occurred_at.date_naive(),
        ));
    }
    state
}

/// Recomputes every streak from the complete historical log. Dry-run reports
/// counts without writing. A failed key is logged and counted; the pass
/// continues, and a re-run completes the remainder.
pub async fn run(pool: &PgPool, dry_run: bool) -> anyhow::Result<BackfillSummary> {
    let events = db::fetch_activity_log(pool).await?;
    let mut summary = BackfillSummary {
        events: events.len(),
        ..BackfillSummary::default()
    };

    let groups = group_events(events);
    summary.groups = groups.len();

    if dry_run {
        return Ok(summary);
    }

    for ((user_id, category), group) in &groups {
        let Some(state) = replay(group) else {
            continue;
        };

        match db::overwrite_streak(pool, *user_id, *category, &state).await {
            Ok(true) => summary.written += 1,
            Ok(false) => summary.unchanged += 1,
            Err(err) => {
                tracing::warn!("backfill write failed for {user_id}/{category}: {err:#}");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
