//! SQLite backing store
//!
//! Manages the `~/.bubble-quest/bubble.db` database with automatic schema
//! migration. Timestamps are stored as UTC milliseconds, dates as
//! `YYYY-MM-DD`, identifiers as hyphenated UUID text.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use super::{BackingStore, StoreError, StoreResult, TemplateFilter, advance_streak};
use crate::domain::{
    ChallengeInstance, ChallengeStatus, ChallengeTemplate, ChallengeType, ChallengeUpdate,
    OwnedReward, Profile, ProfileUpdate, RewardKind, RewardStatus, RewardTemplate, RewardUpdate,
    RuleKind, UserChallenge, UserId, UserReward,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    xp INTEGER NOT NULL DEFAULT 0 CHECK (xp >= 0),
    level INTEGER NOT NULL DEFAULT 1,
    streak_days INTEGER NOT NULL DEFAULT 0,
    last_activity_date TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS challenge_templates (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    type TEXT NOT NULL,
    reward_xp INTEGER NOT NULL DEFAULT 0 CHECK (reward_xp >= 0),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user_challenges (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id),
    challenge_id TEXT NOT NULL REFERENCES challenge_templates(id),
    status TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
    assigned_at INTEGER NOT NULL,
    completed_at INTEGER,
    auto_assigned INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_user_challenges_user ON user_challenges(user_id, status);

CREATE TABLE IF NOT EXISTS reward_templates (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    cost_xp INTEGER NOT NULL DEFAULT 0,
    is_available INTEGER NOT NULL DEFAULT 1,
    icon TEXT,
    type TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user_rewards (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id),
    reward_id TEXT NOT NULL REFERENCES reward_templates(id),
    status TEXT NOT NULL,
    claimed_at INTEGER NOT NULL,
    used_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_user_rewards_user ON user_rewards(user_id);
"#;

const CHALLENGE_COLUMNS: &str = "c.id, c.user_id, c.challenge_id, c.status, c.progress, \
     c.assigned_at, c.completed_at, c.auto_assigned, \
     t.id, t.title, t.description, t.type, t.reward_xp, t.is_active, t.rule";

const TEMPLATE_COLUMNS: &str = "id, title, description, type, reward_xp, is_active, rule";

const REWARD_TEMPLATE_COLUMNS: &str = "id, title, description, cost_xp, is_available, icon, type";

/// SQLite-backed [`BackingStore`].
///
/// The session user is fixed at construction; a store without one reports
/// no authenticated user.
///
/// Meant for one local session at CLI volumes: every call runs rusqlite
/// synchronously on the calling task while holding the connection mutex.
/// A multi-user server should move calls onto `tokio::task::spawn_blocking`.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    session: Option<UserId>,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened gamification database");
        Self::from_connection(conn)
    }

    /// A private in-memory database, for tests and dry runs
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            session: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Use `user_id` as the authenticated session user
    pub fn with_session(mut self, user_id: UserId) -> Self {
        self.session = Some(user_id);
        self
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        conn.execute("INSERT OR IGNORE INTO schema_version VALUES (1)", [])?;
        drop(conn);
        self.run_migrations()
    }

    /// Run any pending migrations
    fn run_migrations(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);

        // Migration 2: explicit completion rules on challenge templates
        if version < 2 {
            let has_rule: bool = conn
                .prepare("SELECT COUNT(*) FROM pragma_table_info('challenge_templates') WHERE name = 'rule'")
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_rule {
                conn.execute_batch("ALTER TABLE challenge_templates ADD COLUMN rule TEXT;")?;
            }
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
            tracing::info!("migrated gamification schema to version 2");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn parse_uuid(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("bad uuid {:?}: {}", raw, e)))
}

fn parse_millis(ms: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", ms)))
}

fn parse_date(raw: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| StoreError::Corrupt(format!("bad date {:?}: {}", raw, e)))
}

fn parse_rule(raw: Option<String>) -> StoreResult<Option<RuleKind>> {
    raw.filter(|r| !r.trim().is_empty())
        .map(|r| serde_json::from_str(&r))
        .transpose()
        .map_err(StoreError::from)
}

fn encode_rule(rule: &Option<RuleKind>) -> StoreResult<Option<String>> {
    rule.as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::from)
}

struct RawProfile {
    id: String,
    xp: i64,
    level: i64,
    streak_days: i64,
    last_activity_date: Option<String>,
}

impl RawProfile {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            xp: row.get(1)?,
            level: row.get(2)?,
            streak_days: row.get(3)?,
            last_activity_date: row.get(4)?,
        })
    }

    fn decode(self) -> StoreResult<Profile> {
        Ok(Profile {
            id: parse_uuid(&self.id)?,
            xp: self.xp,
            level: u32::try_from(self.level.max(1)).unwrap_or(u32::MAX),
            streak_days: u32::try_from(self.streak_days.max(0)).unwrap_or(u32::MAX),
            last_activity_date: self.last_activity_date.as_deref().map(parse_date).transpose()?,
        })
    }
}

struct RawTemplate {
    id: String,
    title: String,
    description: String,
    kind: String,
    reward_xp: i64,
    is_active: bool,
    rule: Option<String>,
}

impl RawTemplate {
    fn from_row_at(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            title: row.get(offset + 1)?,
            description: row.get(offset + 2)?,
            kind: row.get(offset + 3)?,
            reward_xp: row.get(offset + 4)?,
            is_active: row.get(offset + 5)?,
            rule: row.get(offset + 6)?,
        })
    }

    fn decode(self) -> StoreResult<ChallengeTemplate> {
        Ok(ChallengeTemplate {
            id: parse_uuid(&self.id)?,
            title: self.title,
            description: self.description,
            kind: ChallengeType::parse(&self.kind),
            reward_xp: self.reward_xp,
            is_active: self.is_active,
            rule: parse_rule(self.rule)?,
        })
    }
}

struct RawChallenge {
    id: String,
    user_id: String,
    challenge_id: String,
    status: String,
    progress: i64,
    assigned_at: i64,
    completed_at: Option<i64>,
    auto_assigned: bool,
    template: Option<RawTemplate>,
}

impl RawChallenge {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let template_id: Option<String> = row.get(8)?;
        let template = match template_id {
            Some(_) => Some(RawTemplate::from_row_at(row, 8)?),
            None => None,
        };
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            challenge_id: row.get(2)?,
            status: row.get(3)?,
            progress: row.get(4)?,
            assigned_at: row.get(5)?,
            completed_at: row.get(6)?,
            auto_assigned: row.get(7)?,
            template,
        })
    }

    fn decode(self) -> StoreResult<ChallengeInstance> {
        let status = ChallengeStatus::from_str(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown challenge status {:?}", self.status)))?;
        let challenge = UserChallenge {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            challenge_id: parse_uuid(&self.challenge_id)?,
            status,
            progress: self.progress.clamp(0, 100) as u8,
            assigned_at: parse_millis(self.assigned_at)?,
            completed_at: self.completed_at.map(parse_millis).transpose()?,
            auto_assigned: self.auto_assigned,
        };
        Ok(ChallengeInstance {
            challenge,
            template: self.template.map(RawTemplate::decode).transpose()?,
        })
    }
}

struct RawRewardTemplate {
    id: String,
    title: String,
    description: String,
    cost_xp: i64,
    is_available: bool,
    icon: Option<String>,
    kind: String,
}

impl RawRewardTemplate {
    fn from_row_at(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            title: row.get(offset + 1)?,
            description: row.get(offset + 2)?,
            cost_xp: row.get(offset + 3)?,
            is_available: row.get(offset + 4)?,
            icon: row.get(offset + 5)?,
            kind: row.get(offset + 6)?,
        })
    }

    fn decode(self) -> StoreResult<RewardTemplate> {
        let kind = RewardKind::from_str(&self.kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown reward type {:?}", self.kind)))?;
        Ok(RewardTemplate {
            id: parse_uuid(&self.id)?,
            title: self.title,
            description: self.description,
            cost_xp: self.cost_xp,
            is_available: self.is_available,
            icon: self.icon,
            kind,
        })
    }
}

struct RawUserReward {
    id: String,
    user_id: String,
    reward_id: String,
    status: String,
    claimed_at: i64,
    used_at: Option<i64>,
}

impl RawUserReward {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            reward_id: row.get(2)?,
            status: row.get(3)?,
            claimed_at: row.get(4)?,
            used_at: row.get(5)?,
        })
    }

    fn decode(self) -> StoreResult<UserReward> {
        let status = RewardStatus::from_str(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown reward status {:?}", self.status)))?;
        Ok(UserReward {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            reward_id: parse_uuid(&self.reward_id)?,
            status,
            claimed_at: parse_millis(self.claimed_at)?,
            used_at: self.used_at.map(parse_millis).transpose()?,
        })
    }
}

fn load_profile(conn: &Connection, user_id: UserId) -> StoreResult<Option<Profile>> {
    conn.query_row(
        "SELECT id, xp, level, streak_days, last_activity_date FROM profiles WHERE id = ?1",
        params![user_id.to_string()],
        RawProfile::from_row,
    )
    .optional()?
    .map(RawProfile::decode)
    .transpose()
}

// ---------------------------------------------------------------------------
// BackingStore
// ---------------------------------------------------------------------------

#[async_trait]
impl BackingStore for SqliteStore {
    async fn current_user(&self) -> StoreResult<Option<UserId>> {
        Ok(self.session)
    }

    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<Profile>> {
        let conn = self.conn()?;
        load_profile(&conn, user_id)
    }

    async fn ensure_profile(&self, user_id: UserId) -> StoreResult<Profile> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO profiles (id, created_at) VALUES (?1, ?2)",
            params![user_id.to_string(), Utc::now().timestamp_millis()],
        )?;
        load_profile(&conn, user_id)?.ok_or_else(|| StoreError::missing("profiles", user_id))
    }

    async fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE profiles SET
                level = COALESCE(?2, level),
                streak_days = COALESCE(?3, streak_days),
                last_activity_date = COALESCE(?4, last_activity_date)
             WHERE id = ?1",
            params![
                user_id.to_string(),
                update.level,
                update.streak_days,
                update.last_activity_date.map(|d| d.format(DATE_FORMAT).to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::missing("profiles", user_id));
        }
        Ok(())
    }

    async fn adjust_xp(&self, user_id: UserId, delta: i64) -> StoreResult<i64> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE profiles SET xp = xp + ?2 WHERE id = ?1 AND xp + ?2 >= 0",
            params![user_id.to_string(), delta],
        )?;
        let balance: Option<i64> = conn
            .query_row(
                "SELECT xp FROM profiles WHERE id = ?1",
                params![user_id.to_string()],
                |r| r.get(0),
            )
            .optional()?;

        match (changed, balance) {
            (_, None) => Err(StoreError::missing("profiles", user_id)),
            (0, Some(current)) => Err(StoreError::Constraint(format!(
                "xp would drop to {} for {}",
                current.saturating_add(delta),
                user_id
            ))),
            (_, Some(new_xp)) => Ok(new_xp),
        }
    }

    async fn refresh_streak(&self, user_id: UserId) -> StoreResult<()> {
        let today = Local::now().date_naive();
        let conn = self.conn()?;
        let profile = load_profile(&conn, user_id)?.ok_or_else(|| StoreError::missing("profiles", user_id))?;
        let streak = advance_streak(profile.streak_days, profile.last_activity_date, today);
        conn.execute(
            "UPDATE profiles SET streak_days = ?2, last_activity_date = ?3 WHERE id = ?1",
            params![user_id.to_string(), streak, today.format(DATE_FORMAT).to_string()],
        )?;
        Ok(())
    }

    async fn challenge_templates(&self, filter: &TemplateFilter) -> StoreResult<Vec<ChallengeTemplate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM challenge_templates WHERE (?1 = 0 OR is_active = 1) ORDER BY created_at DESC",
            TEMPLATE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![filter.active_only], |r| RawTemplate::from_row_at(r, 0))?;

        let mut templates = Vec::new();
        let limit = filter.limit.unwrap_or(usize::MAX);
        for row in rows {
            if templates.len() >= limit {
                break;
            }
            let template = row?.decode()?;
            if filter.matches(&template) {
                templates.push(template);
            }
        }
        Ok(templates)
    }

    async fn challenge_template(&self, id: Uuid) -> StoreResult<Option<ChallengeTemplate>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM challenge_templates WHERE id = ?1", TEMPLATE_COLUMNS),
            params![id.to_string()],
            |r| RawTemplate::from_row_at(r, 0),
        )
        .optional()?
        .map(RawTemplate::decode)
        .transpose()
    }

    async fn insert_challenge_template(&self, template: &ChallengeTemplate) -> StoreResult<()> {
        let rule = encode_rule(&template.rule)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO challenge_templates
                (id, title, description, type, reward_xp, is_active, rule, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                title = ?2, description = ?3, type = ?4, reward_xp = ?5, is_active = ?6, rule = ?7",
            params![
                template.id.to_string(),
                template.title,
                template.description,
                template.kind.as_str(),
                template.reward_xp,
                template.is_active,
                rule,
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    async fn challenge_instances(
        &self,
        user_id: UserId,
        statuses: &[ChallengeStatus],
    ) -> StoreResult<Vec<ChallengeInstance>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM user_challenges c
             LEFT JOIN challenge_templates t ON t.id = c.challenge_id
             WHERE c.user_id = ?1
             ORDER BY c.assigned_at DESC",
            CHALLENGE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id.to_string()], RawChallenge::from_row)?;

        let mut instances = Vec::new();
        for row in rows {
            let instance = row?.decode()?;
            if statuses.is_empty() || statuses.contains(&instance.challenge.status) {
                instances.push(instance);
            }
        }
        Ok(instances)
    }

    async fn challenge_instance(&self, id: Uuid) -> StoreResult<Option<ChallengeInstance>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM user_challenges c
                 LEFT JOIN challenge_templates t ON t.id = c.challenge_id
                 WHERE c.id = ?1",
                CHALLENGE_COLUMNS
            ),
            params![id.to_string()],
            RawChallenge::from_row,
        )
        .optional()?
        .map(RawChallenge::decode)
        .transpose()
    }

    async fn update_challenge_instance(&self, id: Uuid, update: &ChallengeUpdate) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE user_challenges SET progress = ?2, status = ?3, completed_at = ?4 WHERE id = ?1",
            params![
                id.to_string(),
                update.progress,
                update.status.as_str(),
                update.completed_at.map(|t| t.timestamp_millis()),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::missing("user_challenges", id));
        }
        Ok(())
    }

    async fn insert_challenge_instance(
        &self,
        user_id: UserId,
        template_id: Uuid,
        status: ChallengeStatus,
        auto_assigned: bool,
    ) -> StoreResult<UserChallenge> {
        let challenge = UserChallenge::new(user_id, template_id, status, auto_assigned);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_challenges
                (id, user_id, challenge_id, status, progress, assigned_at, completed_at, auto_assigned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
            params![
                challenge.id.to_string(),
                user_id.to_string(),
                template_id.to_string(),
                status.as_str(),
                challenge.progress,
                challenge.assigned_at.timestamp_millis(),
                auto_assigned,
            ],
        )?;
        Ok(challenge)
    }

    async fn reward_templates(&self, available_only: bool) -> StoreResult<Vec<RewardTemplate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reward_templates WHERE (?1 = 0 OR is_available = 1) ORDER BY created_at DESC",
            REWARD_TEMPLATE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![available_only], |r| RawRewardTemplate::from_row_at(r, 0))?;

        let mut templates = Vec::new();
        for row in rows {
            templates.push(row?.decode()?);
        }
        Ok(templates)
    }

    async fn reward_template(&self, id: Uuid) -> StoreResult<Option<RewardTemplate>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM reward_templates WHERE id = ?1", REWARD_TEMPLATE_COLUMNS),
            params![id.to_string()],
            |r| RawRewardTemplate::from_row_at(r, 0),
        )
        .optional()?
        .map(RawRewardTemplate::decode)
        .transpose()
    }

    async fn insert_reward_template(&self, template: &RewardTemplate) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reward_templates
                (id, title, description, cost_xp, is_available, icon, type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                title = ?2, description = ?3, cost_xp = ?4, is_available = ?5, icon = ?6, type = ?7",
            params![
                template.id.to_string(),
                template.title,
                template.description,
                template.cost_xp,
                template.is_available,
                template.icon,
                template.kind.as_str(),
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    async fn insert_user_reward(
        &self,
        user_id: UserId,
        reward_id: Uuid,
        status: RewardStatus,
    ) -> StoreResult<UserReward> {
        let reward = UserReward::new(user_id, reward_id, status);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_rewards (id, user_id, reward_id, status, claimed_at, used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
            params![
                reward.id.to_string(),
                user_id.to_string(),
                reward_id.to_string(),
                status.as_str(),
                reward.claimed_at.timestamp_millis(),
            ],
        )?;
        Ok(reward)
    }

    async fn user_rewards(&self, user_id: UserId) -> StoreResult<Vec<OwnedReward>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.user_id, r.reward_id, r.status, r.claimed_at, r.used_at,
                    t.id, t.title, t.description, t.cost_xp, t.is_available, t.icon, t.type
             FROM user_rewards r
             LEFT JOIN reward_templates t ON t.id = r.reward_id
             WHERE r.user_id = ?1
             ORDER BY r.claimed_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            let template_id: Option<String> = row.get(6)?;
            let template = match template_id {
                Some(_) => Some(RawRewardTemplate::from_row_at(row, 6)?),
                None => None,
            };
            Ok((RawUserReward::from_row(row)?, template))
        })?;

        let mut owned = Vec::new();
        for row in rows {
            let (reward, template) = row?;
            owned.push(OwnedReward {
                reward: reward.decode()?,
                template: template.map(RawRewardTemplate::decode).transpose()?,
            });
        }
        Ok(owned)
    }

    async fn user_reward(&self, id: Uuid) -> StoreResult<Option<UserReward>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, user_id, reward_id, status, claimed_at, used_at FROM user_rewards WHERE id = ?1",
            params![id.to_string()],
            RawUserReward::from_row,
        )
        .optional()?
        .map(RawUserReward::decode)
        .transpose()
    }

    async fn update_user_reward(&self, id: Uuid, update: &RewardUpdate) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE user_rewards SET status = ?2, used_at = ?3 WHERE id = ?1",
            params![
                id.to_string(),
                update.status.as_str(),
                update.used_at.map(|t| t.timestamp_millis()),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::missing("user_rewards", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_user() -> (SqliteStore, UserId) {
        let user = Uuid::new_v4();
        let store = SqliteStore::open_in_memory().unwrap().with_session(user);
        (store, user)
    }

    #[tokio::test]
    async fn test_open_creates_schema_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bubble.db");
        let store = SqliteStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.current_user().await.unwrap(), None);

        // Re-opening runs migrations idempotently
        drop(store);
        SqliteStore::open(&path).unwrap();
    }

    #[tokio::test]
    async fn test_profile_xp_and_level() {
        let (store, user) = store_with_user();
        let profile = store.ensure_profile(user).await.unwrap();
        assert_eq!(profile.xp, 0);
        assert_eq!(profile.level, 1);

        assert_eq!(store.adjust_xp(user, 450).await.unwrap(), 450);
        assert!(matches!(
            store.adjust_xp(user, -451).await,
            Err(StoreError::Constraint(_))
        ));
        store.update_profile(user, &ProfileUpdate::level(3)).await.unwrap();

        let profile = store.get_profile(user).await.unwrap().unwrap();
        assert_eq!(profile.xp, 450);
        assert_eq!(profile.level, 3);
    }

    #[tokio::test]
    async fn test_adjust_xp_missing_profile() {
        let (store, user) = store_with_user();
        assert!(matches!(
            store.adjust_xp(user, 10).await,
            Err(StoreError::MissingRow { .. })
        ));
    }

    #[tokio::test]
    async fn test_streak_refresh() {
        let (store, user) = store_with_user();
        store.ensure_profile(user).await.unwrap();
        let yesterday = Local::now().date_naive().pred_opt().unwrap();
        store
            .update_profile(
                user,
                &ProfileUpdate {
                    streak_days: Some(6),
                    last_activity_date: Some(yesterday),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();

        store.refresh_streak(user).await.unwrap();
        store.refresh_streak(user).await.unwrap();
        let profile = store.get_profile(user).await.unwrap().unwrap();
        assert_eq!(profile.streak_days, 7);
        assert_eq!(profile.last_activity_date, Some(Local::now().date_naive()));
    }

    #[tokio::test]
    async fn test_challenge_round_trip_with_rule() {
        let (store, user) = store_with_user();
        store.ensure_profile(user).await.unwrap();
        let template = ChallengeTemplate::new("Racha de 7 días", ChallengeType::Weekly, 70)
            .with_rule(RuleKind::Streak { days: 7 });
        store.insert_challenge_template(&template).await.unwrap();

        let inserted = store
            .insert_challenge_instance(user, template.id, ChallengeStatus::Active, true)
            .await
            .unwrap();
        let loaded = store.challenge_instance(inserted.id).await.unwrap().unwrap();
        assert_eq!(loaded.template.as_ref(), Some(&template));
        assert!(loaded.challenge.auto_assigned);

        let done = ChallengeUpdate {
            progress: 100,
            status: ChallengeStatus::Completed,
            completed_at: Some(Utc::now()),
        };
        store.update_challenge_instance(inserted.id, &done).await.unwrap();

        let open = store
            .challenge_instances(user, &ChallengeStatus::OPEN)
            .await
            .unwrap();
        assert!(open.is_empty());
        let all = store.challenge_instances(user, &[]).await.unwrap();
        assert_eq!(all[0].challenge.status, ChallengeStatus::Completed);
        assert_eq!(all[0].challenge.progress, 100);
    }

    #[tokio::test]
    async fn test_update_missing_challenge() {
        let (store, _) = store_with_user();
        let update = ChallengeUpdate {
            progress: 10,
            status: ChallengeStatus::Active,
            completed_at: None,
        };
        assert!(matches!(
            store.update_challenge_instance(Uuid::new_v4(), &update).await,
            Err(StoreError::MissingRow { .. })
        ));
    }

    #[tokio::test]
    async fn test_reward_ledger_rows() {
        let (store, user) = store_with_user();
        store.ensure_profile(user).await.unwrap();
        let available = RewardTemplate::new("Fondo de pantalla", 200, RewardKind::Permanent).with_icon("🖼️");
        let hidden = RewardTemplate::new("Sesión guiada", 300, RewardKind::Consumable).unavailable();
        store.insert_reward_template(&available).await.unwrap();
        store.insert_reward_template(&hidden).await.unwrap();

        assert_eq!(store.reward_templates(true).await.unwrap().len(), 1);
        assert_eq!(store.reward_templates(false).await.unwrap().len(), 2);

        let record = store
            .insert_user_reward(user, available.id, RewardStatus::Claimed)
            .await
            .unwrap();
        let used_at = Utc::now();
        store
            .update_user_reward(
                record.id,
                &RewardUpdate {
                    status: RewardStatus::Used,
                    used_at: Some(used_at),
                },
            )
            .await
            .unwrap();

        let owned = store.user_rewards(user).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].reward.status, RewardStatus::Used);
        assert_eq!(owned[0].title(), "Fondo de pantalla");
        assert_eq!(
            owned[0].reward.used_at.map(|t| t.timestamp_millis()),
            Some(used_at.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn test_user_reward_requires_known_template() {
        let (store, user) = store_with_user();
        store.ensure_profile(user).await.unwrap();
        assert!(matches!(
            store
                .insert_user_reward(user, Uuid::new_v4(), RewardStatus::Claimed)
                .await,
            Err(StoreError::Sqlite(_))
        ));
    }
}
