use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Activity categories that participate in streak tracking. Events without a
/// category (freeform replies and the like) never reach this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    DeepWork,
    StartupTask,
    Workout,
    Recharge,
    Networking,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::DeepWork,
        Category::StartupTask,
        Category::Workout,
        Category::Recharge,
        Category::Networking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::DeepWork => "deep-work",
            Category::StartupTask => "startup-task",
            Category::Workout => "workout",
            Category::Recharge => "recharge",
            Category::Networking => "networking",
        }
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "deep-work" => Ok(Category::DeepWork),
            "startup-task" => Ok(Category::StartupTask),
            "workout" => Ok(Category::Workout),
            "recharge" => Ok(Category::Recharge),
            "networking" => Ok(Category::Networking),
            other => Err(anyhow::anyhow!("unknown activity category: {other}")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Streak counters for one (user, category) key. `last_active_date` is None
/// for a key that has never had a qualifying day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakState {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active_date: Option<NaiveDate>,
}

/// A stored streak row as the leaderboard reads it. `updated_at` is stamped
/// on every write and breaks ordering ties.
#[derive(Debug, Clone)]
pub struct StreakRow {
    pub user_id: Uuid,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

/// One categorized entry from the historical activity log.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: Category,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub avatar: Option<String>,
}

impl UserSummary {
    /// Stand-in for a user id with no matching profile row.
    pub fn placeholder(id: Uuid) -> Self {
        UserSummary {
            id,
            name: "Founder".to_string(),
            username: id.to_string(),
            avatar: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active_date: Option<NaiveDate>,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryLeaderboard {
    pub category: Category,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct BackfillSummary {
    pub groups: usize,
    pub events: usize,
    pub written: u64,
    pub unchanged: u64,
    pub failed: usize,
}
