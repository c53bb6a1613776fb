use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{Category, StreakState};
use crate::streak;

const MAX_ATTEMPTS: usize = 3;

/// Applies one qualifying activity event to its (user, category) streak.
/// Optimistic loop: read, run the transition, insert-if-absent or
/// compare-and-set against the snapshot that was read; retry on a lost race.
pub async fn record_activity(
    pool: &PgPool,
    user_id: Uuid,
    category: Category,
    occurred_at: DateTime<Utc>,
) -> anyhow::Result<StreakState> {
    let day = occurred_at.date_naive();

    for _ in 0..MAX_ATTEMPTS {
        let existing = db::get_streak(pool, user_id, category).await?;
        let next = streak::advance(existing.as_ref(), day);

        match existing {
            None => {
                if db::insert_streak(pool, user_id, category, &next).await? {
                    return Ok(next);
                }
            }
            Some(previous) => {
                if next == previous {
                    return Ok(previous);
                }
                if db::update_streak(pool, user_id, category, &previous, &next).await? {
                    return Ok(next);
                }
            }
        }
    }

    anyhow::bail!("streak write for {user_id}/{category} kept losing to concurrent updates")
}
