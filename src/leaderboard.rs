use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{Category, CategoryLeaderboard, LeaderboardEntry, StreakRow, UserSummary};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 50;

pub fn clamp_limit(limit: Option<i64>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as usize
}

/// Orders a category's rows and keeps the top `limit`. Malformed rows are
/// dropped, never fatal. The `updated_at` / `user_id` tail of the sort key
/// means no two rows compare equal.
pub fn top_rows(mut rows: Vec<StreakRow>, limit: usize) -> Vec<StreakRow> {
    rows.retain(|row| {
        let well_formed = row.current_streak >= 0 && row.current_streak <= row.longest_streak;
        if !well_formed {
            tracing::warn!(
                "dropping malformed streak row for user {}: current {}, longest {}",
                row.user_id,
                row.current_streak,
                row.longest_streak
            );
        }
        well_formed
    });

    rows.sort_by(|a, b| {
        b.longest_streak
            .cmp(&a.longest_streak)
            .then_with(|| b.current_streak.cmp(&a.current_streak))
            .then_with(|| b.updated_at.cmp(&a.updated_at))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    rows.truncate(limit);
    rows
}

pub fn build_entries(
    rows: &[StreakRow],
    profiles: &HashMap<Uuid, UserSummary>,
) -> Vec<LeaderboardEntry> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| LeaderboardEntry {
            rank: index + 1,
            current_streak: row.current_streak,
            longest_streak: row.longest_streak,
            last_active_date: row.last_active_date,
            user: profiles
                .get(&row.user_id)
                .cloned()
                .unwrap_or_else(|| UserSummary::placeholder(row.user_id)),
        })
        .collect()
}

pub async fn get_leaderboards(
    pool: &PgPool,
    limit: Option<i64>,
    categories: &[Category],
) -> anyhow::Result<Vec<CategoryLeaderboard>> {
    let limit = clamp_limit(limit);
    let categories: Vec<Category> = if categories.is_empty() {
        Category::ALL.to_vec()
    } else {
        categories.to_vec()
    };

    let mut ranked: Vec<(Category, Vec<StreakRow>)> = Vec::new();
    let mut user_ids: Vec<Uuid> = Vec::new();

    for category in categories {
        let rows = top_rows(db::fetch_category_streaks(pool, category).await?, limit);
        user_ids.extend(rows.iter().map(|row| row.user_id));
        ranked.push((category, rows));
    }

    user_ids.sort();
    user_ids.dedup();
    let profiles = db::fetch_user_summaries(pool, &user_ids).await?;

    Ok(ranked
        .into_iter()
        .map(|(category, rows)| CategoryLeaderboard {
            category,
            entries: build_entries(&rows, &profiles),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};

    fn row(user_id: Uuid, current: i32, longest: i32, updated_secs_ago: i64) -> StreakRow {
        StreakRow {
            user_id,
            current_streak: current,
            longest_streak: longest,
            last_active_date: NaiveDate::from_ymd_opt(2026, 7, 5),
            updated_at: Utc::now() - Duration::seconds(updated_secs_ago),
        }
    }

    #[test]
    fn limit_is_clamped_to_valid_range() {
        assert_eq!(clamp_limit(None), 10);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(25)), 25);
        assert_eq!(clamp_limit(Some(1000)), 50);
    }

    #[test]
    fn rows_order_by_longest_then_current_then_recency() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();
        let rows = vec![
            row(a, 2, 5, 100),
            row(b, 4, 9, 100),
            row(c, 3, 5, 100),
            row(d, 2, 5, 10),
        ];

        let ordered = top_rows(rows, 10);
        let ids: Vec<Uuid> = ordered.iter().map(|row| row.user_id).collect();
        assert_eq!(ids, vec![b, c, d, a]);
    }

    #[test]
    fn equal_counters_fall_back_to_user_id_order() {
        let mut users = [Uuid::new_v4(), Uuid::new_v4()];
        users.sort();
        let stamp = Utc::now();
        let rows = vec![
            StreakRow {
                user_id: users[1],
                current_streak: 3,
                longest_streak: 3,
                last_active_date: None,
                updated_at: stamp,
            },
            StreakRow {
                user_id: users[0],
                current_streak: 3,
                longest_streak: 3,
                last_active_date: None,
                updated_at: stamp,
            },
        ];

        let ordered = top_rows(rows, 10);
        assert_eq!(ordered[0].user_id, users[0]);
        assert_eq!(ordered[1].user_id, users[1]);
    }

    #[test]
    fn malformed_rows_are_dropped_not_fatal() {
        let good = Uuid::new_v4();
        let rows = vec![row(good, 2, 4, 0), row(Uuid::new_v4(), 7, 3, 0)];
        let ordered = top_rows(rows, 10);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].user_id, good);
    }

    #[test]
    fn truncates_to_limit() {
        let rows = (0..5).map(|n| row(Uuid::new_v4(), n, n, 0)).collect();
        assert_eq!(top_rows(rows, 2).len(), 2);
    }

    #[test]
    fn ranks_are_contiguous_from_one() {
        let rows = vec![
            row(Uuid::new_v4(), 1, 8, 0),
            row(Uuid::new_v4(), 2, 6, 0),
            row(Uuid::new_v4(), 3, 4, 0),
        ];
        let ordered = top_rows(rows, 10);
        let entries = build_entries(&ordered, &HashMap::new());
        let ranks: Vec<usize> = entries.iter().map(|entry| entry.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn missing_profile_gets_a_placeholder() {
        let known = Uuid::new_v4();
        let unknown = Uuid::new_v4();
        let mut profiles = HashMap::new();
        profiles.insert(
            known,
            UserSummary {
                id: known,
                name: "Avery Chen".to_string(),
                username: "avery".to_string(),
                avatar: None,
            },
        );

        let ordered = top_rows(vec![row(known, 2, 9, 0), row(unknown, 1, 4, 0)], 10);
        let entries = build_entries(&ordered, &profiles);
        assert_eq!(entries[0].user.username, "avery");
        assert_eq!(entries[1].user.id, unknown);
        assert_eq!(entries[1].user.name, "Founder");
        assert!(entries[1].user.avatar.is_none());
    }
}
