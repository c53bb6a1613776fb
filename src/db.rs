use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{ActivityRecord, Category, StreakRow, StreakState, UserSummary};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let users = vec![
        (
            Uuid::parse_str("7b1e9c64-52da-4a3e-9f25-8a4c1d6e0b11")?,
            "Avery Chen",
            "avery",
            Some("https://cdn.founderhub.dev/avatars/avery.png"),
        ),
        (
            Uuid::parse_str("2f8d4a10-6c3b-4e7f-b2a9-d15e08c97f42")?,
            "Jules Moreno",
            "jules",
            Some("https://cdn.founderhub.dev/avatars/jules.png"),
        ),
        (
            Uuid::parse_str("c94b2e7d-1f60-48a5-8c3d-72a9b5e4d016")?,
            "Kiara Patel",
            "kiara",
            None,
        ),
    ];

    for (id, full_name, username, avatar_url) in users {
        sqlx::query(
            r#"
            INSERT INTO founderhub.users (id, full_name, username, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (username) DO UPDATE
            SET full_name = EXCLUDED.full_name, avatar_url = EXCLUDED.avatar_url
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(username)
        .bind(avatar_url)
        .execute(pool)
        .await?;
    }

    let events = vec![
        ("seed-101", "avery", Some(Category::Workout), (2026, 7, 1, 7)),
        ("seed-102", "avery", Some(Category::Workout), (2026, 7, 2, 6)),
        ("seed-103", "avery", Some(Category::Workout), (2026, 7, 3, 8)),
        ("seed-104", "avery", Some(Category::DeepWork), (2026, 7, 3, 14)),
        ("seed-105", "jules", Some(Category::DeepWork), (2026, 7, 1, 9)),
        ("seed-106", "jules", Some(Category::DeepWork), (2026, 7, 4, 10)),
        ("seed-107", "jules", Some(Category::StartupTask), (2026, 7, 4, 16)),
        ("seed-108", "kiara", Some(Category::Networking), (2026, 7, 2, 18)),
        ("seed-109", "kiara", None, (2026, 7, 2, 19)),
        ("seed-110", "kiara", Some(Category::Recharge), (2026, 7, 5, 20)),
    ];

    for (source_key, username, category, (year, month, day, hour)) in events {
        let occurred_at = Utc
            .with_ymd_and_hms(year, month, day, hour, 0, 0)
            .single()
            .context("invalid timestamp")?;

        let user_id: Uuid = sqlx::query("SELECT id FROM founderhub.users WHERE username = $1")
            .bind(username)
            .fetch_one(pool)
            .await?
            .get("id");

        sqlx::query(
            r#"
            INSERT INTO founderhub.activity_events
            (id, user_id, category, occurred_at, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(category.map(|category| category.as_str()))
        .bind(occurred_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        username: String,
        category: Option<String>,
        occurred_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let category = match row.category.as_deref() {
            Some(value) => Some(
                value
                    .parse::<Category>()
                    .with_context(|| format!("bad category for {}", row.username))?,
            ),
            None => None,
        };

        let user_id: Uuid = sqlx::query(
            r#"
            INSERT INTO founderhub.users (id, full_name, username)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO UPDATE
            SET full_name = EXCLUDED.full_name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(&row.username)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO founderhub.activity_events
            (id, user_id, category, occurred_at, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(category.map(|category| category.as_str()))
        .bind(row.occurred_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn get_streak(
    pool: &PgPool,
    user_id: Uuid,
    category: Category,
) -> anyhow::Result<Option<StreakState>> {
    let row = sqlx::query(
        "SELECT current_streak, longest_streak, last_active_date \
         FROM founderhub.streak_states \
         WHERE user_id = $1 AND category = $2",
    )
    .bind(user_id)
    .bind(category.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| StreakState {
        current_streak: row.get("current_streak"),
        longest_streak: row.get("longest_streak"),
        last_active_date: row.get("last_active_date"),
    }))
}

pub async fn insert_streak(
    pool: &PgPool,
    user_id: Uuid,
    category: Category,
    state: &StreakState,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO founderhub.streak_states
        (user_id, category, current_streak, longest_streak, last_active_date, updated_at)
        VALUES ($1, $2, $3, $4, $5, now())
        ON CONFLICT (user_id, category) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(category.as_str())
    .bind(state.current_streak)
    .bind(state.longest_streak)
    .bind(state.last_active_date)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Compare-and-set write: applies `next` only if the stored row still matches
/// the `expected` snapshot the caller computed from. Returns false when a
/// concurrent writer got there first.
pub async fn update_streak(
    pool: &PgPool,
    user_id: Uuid,
    category: Category,
    expected: &StreakState,
    next: &StreakState,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE founderhub.streak_states
        SET current_streak = $3, longest_streak = $4, last_active_date = $5, updated_at = now()
        WHERE user_id = $1 AND category = $2
          AND current_streak = $6
          AND longest_streak = $7
          AND last_active_date IS NOT DISTINCT FROM $8
        "#,
    )
    .bind(user_id)
    .bind(category.as_str())
    .bind(next.current_streak)
    .bind(next.longest_streak)
    .bind(next.last_active_date)
    .bind(expected.current_streak)
    .bind(expected.longest_streak)
    .bind(expected.last_active_date)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Authoritative upsert for the backfill job: overwrites whatever is stored.
/// Returns false when the stored row already equals the recomputed state, so
/// a repeat run over an unchanged log reports zero writes.
pub async fn overwrite_streak(
    pool: &PgPool,
    user_id: Uuid,
    category: Category,
    state: &StreakState,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO founderhub.streak_states
        (user_id, category, current_streak, longest_streak, last_active_date, updated_at)
        VALUES ($1, $2, $3, $4, $5, now())
        ON CONFLICT (user_id, category) DO UPDATE
        SET current_streak = EXCLUDED.current_streak,
            longest_streak = EXCLUDED.longest_streak,
            last_active_date = EXCLUDED.last_active_date,
            updated_at = now()
        WHERE (streak_states.current_streak, streak_states.longest_streak, streak_states.last_active_date)
              IS DISTINCT FROM
              (EXCLUDED.current_streak, EXCLUDED.longest_streak, EXCLUDED.last_active_date)
        "#,
    )
    .bind(user_id)
    .bind(category.as_str())
    .bind(state.current_streak)
    .bind(state.longest_streak)
    .bind(state.last_active_date)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_category_streaks(
    pool: &PgPool,
    category: Category,
) -> anyhow::Result<Vec<StreakRow>> {
    let rows = sqlx::query(
        "SELECT user_id, current_streak, longest_streak, last_active_date, updated_at \
         FROM founderhub.streak_states \
         WHERE category = $1",
    )
    .bind(category.as_str())
    .fetch_all(pool)
    .await?;

    let mut streaks = Vec::new();
    for row in rows {
        streaks.push(StreakRow {
            user_id: row.get("user_id"),
            current_streak: row.get("current_streak"),
            longest_streak: row.get("longest_streak"),
            last_active_date: row.get("last_active_date"),
            updated_at: row.get("updated_at"),
        });
    }

    Ok(streaks)
}

pub async fn fetch_user_summaries(
    pool: &PgPool,
    ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, UserSummary>> {
    let mut summaries = HashMap::new();
    if ids.is_empty() {
        return Ok(summaries);
    }

    let rows = sqlx::query(
        "SELECT id, full_name, username, avatar_url \
         FROM founderhub.users \
         WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    for row in rows {
        let id: Uuid = row.get("id");
        summaries.insert(
            id,
            UserSummary {
                id,
                name: row.get("full_name"),
                username: row.get("username"),
                avatar: row.get("avatar_url"),
            },
        );
    }

    Ok(summaries)
}

pub async fn fetch_activity_log(pool: &PgPool) -> anyhow::Result<Vec<ActivityRecord>> {
    let rows = sqlx::query(
        "SELECT id, user_id, category, occurred_at \
         FROM founderhub.activity_events \
         WHERE category IS NOT NULL \
         ORDER BY occurred_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::new();
    for row in rows {
        let id: Uuid = row.get("id");
        let raw: String = row.get("category");
        let category = match raw.parse::<Category>() {
            Ok(category) => category,
            Err(_) => {
                tracing::warn!("skipping event {id} with unknown category {raw:?}");
                continue;
            }
        };

        records.push(ActivityRecord {
            id,
            user_id: row.get("user_id"),
            category,
            occurred_at: row.get("occurred_at"),
        });
    }

    Ok(records)
}
