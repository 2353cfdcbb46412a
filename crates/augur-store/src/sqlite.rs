use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use augur_models::decision::{Decision, RiskLevel, Signal, StoredDecision};
use augur_models::profile::{ActiveUser, UserConfig};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use crate::error::StoreError;

/// SQLite-backed store for agent configs, watchlists, squads and the decision feed.
///
/// `rusqlite::Connection` is not `Sync`, so access is serialized behind a `Mutex`.
/// Every call holds the lock for a single statement or transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file. Creates the schema and enables WAL.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(augur_models::schema::STORE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database with the schema applied. Useful for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(augur_models::schema::STORE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    /// The user's agent configuration, or `None` if they never saved one.
    pub fn agent_config(&self, user_id: &str) -> Result<Option<UserConfig>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT risk_profile, focus_sectors, sources, alert_frequency, is_active \
             FROM agent_configs WHERE user_id = ?1",
        )?;

        let row = stmt
            .query_row(rusqlite::params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            })
            .optional()?;

        let Some((risk_profile, focus_sectors, sources, alert_frequency, is_active)) = row else {
            return Ok(None);
        };

        Ok(Some(UserConfig {
            risk_profile: risk_profile.parse().unwrap_or_default(),
            focus_sectors: serde_json::from_str(&focus_sectors)?,
            sources: serde_json::from_str(&sources)?,
            alert_frequency,
            is_active,
        }))
    }

    /// Market ids and slugs across all of the user's watchlists, de-duplicated in
    /// first-seen order.
    pub fn watchlist_ids(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT market_ids FROM watchlists WHERE user_id = ?1 ORDER BY created_at, id",
        )?;
        let columns = stmt
            .query_map(rusqlite::params![user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut ids: Vec<String> = Vec::new();
        for column in columns {
            let market_ids: Vec<String> = serde_json::from_str(&column)?;
            for id in market_ids {
                if !id.is_empty() && !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    /// Wallet addresses tracked through the user's active squads, de-duplicated.
    pub fn tracked_wallets(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT t.wallet_address FROM tracked_targets t \
             JOIN squads s ON s.id = t.squad_id \
             WHERE s.user_id = ?1 AND s.is_active = 1 \
             GROUP BY t.wallet_address ORDER BY MIN(t.id)",
        )?;
        let wallets = stmt
            .query_map(rusqlite::params![user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(wallets)
    }

    /// Every user whose agent configuration is active.
    pub fn active_configs(&self) -> Result<Vec<ActiveUser>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, risk_profile, focus_sectors, sources \
             FROM agent_configs WHERE is_active = 1 ORDER BY created_at, user_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // One user's corrupt JSON column must not hide every other user.
        let defaults = UserConfig::default();
        Ok(rows
            .into_iter()
            .map(|(user_id, risk_profile, focus_sectors, sources)| {
                let focus_sectors = json_column_or(
                    &user_id,
                    "focus_sectors",
                    &focus_sectors,
                    defaults.focus_sectors.clone(),
                );
                let sources =
                    json_column_or(&user_id, "sources", &sources, defaults.sources.clone());
                ActiveUser {
                    risk_profile: risk_profile.parse().unwrap_or_default(),
                    focus_sectors,
                    sources,
                    user_id,
                }
            })
            .collect())
    }

    /// Append a decision to the user's feed. Decisions are never updated.
    pub fn insert_decision(&self, user_id: &str, decision: &Decision) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO agent_decisions \
             (id, user_id, market_question, market_slug, signal, confidence, reasoning, \
              key_factors, risk_level, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                id.to_string(),
                user_id,
                decision.market_question,
                decision.market_slug,
                decision.signal.as_str(),
                decision.confidence.to_string(),
                decision.reasoning,
                serde_json::to_string(&decision.key_factors)?,
                decision.risk_level.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    /// The user's most recent feed entries, newest first.
    pub fn recent_decisions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredDecision>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, user_id, market_question, market_slug, signal, confidence, reasoning, \
             key_factors, risk_level, created_at \
             FROM agent_decisions WHERE user_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![user_id, limit as i64], |row| {
                Ok(DecisionRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    market_question: row.get(2)?,
                    market_slug: row.get(3)?,
                    signal: row.get(4)?,
                    confidence: row.get(5)?,
                    reasoning: row.get(6)?,
                    key_factors: row.get(7)?,
                    risk_level: row.get(8)?,
                    created_at: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(DecisionRow::into_stored).collect()
    }

    /// The Telegram chat linked to a user, if any.
    pub fn telegram_chat_id(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let chat_id = conn
            .query_row(
                "SELECT telegram_chat_id FROM users WHERE id = ?1",
                rusqlite::params![user_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten()
            .filter(|c| !c.trim().is_empty());
        Ok(chat_id)
    }

    /// Create or update a user record.
    pub fn upsert_user(&self, user_id: &str, telegram_chat_id: Option<&str>) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id, telegram_chat_id) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET telegram_chat_id = excluded.telegram_chat_id",
            rusqlite::params![user_id, telegram_chat_id],
        )?;
        Ok(())
    }

    /// Create or replace a user's agent configuration.
    pub fn upsert_agent_config(&self, user_id: &str, config: &UserConfig) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO agent_configs \
             (user_id, risk_profile, focus_sectors, sources, alert_frequency, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
             ON CONFLICT(user_id) DO UPDATE SET \
             risk_profile = excluded.risk_profile, focus_sectors = excluded.focus_sectors, \
             sources = excluded.sources, alert_frequency = excluded.alert_frequency, \
             is_active = excluded.is_active, updated_at = excluded.updated_at",
            rusqlite::params![
                user_id,
                config.risk_profile.as_str(),
                serde_json::to_string(&config.focus_sectors)?,
                serde_json::to_string(&config.sources)?,
                config.alert_frequency,
                config.is_active,
                now,
            ],
        )?;
        Ok(())
    }

    /// Add a watchlist of market ids or slugs. Returns the watchlist id.
    pub fn add_watchlist(
        &self,
        user_id: &str,
        name: &str,
        market_ids: &[&str],
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO watchlists (id, user_id, name, market_ids, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                id,
                user_id,
                name,
                serde_json::to_string(market_ids)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    /// Add a squad with its tracked wallets. Returns the squad id.
    pub fn add_squad(
        &self,
        user_id: &str,
        name: &str,
        is_active: bool,
        wallets: &[&str],
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO squads (id, user_id, name, is_active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, user_id, name, is_active, Utc::now().to_rfc3339()],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO tracked_targets (squad_id, wallet_address) VALUES (?1, ?2)",
            )?;
            for wallet in wallets {
                stmt.execute(rusqlite::params![id, wallet])?;
            }
        }
        tx.commit()?;
        Ok(id)
    }
}

struct DecisionRow {
    id: String,
    user_id: String,
    market_question: String,
    market_slug: String,
    signal: String,
    confidence: String,
    reasoning: String,
    key_factors: String,
    risk_level: String,
    created_at: String,
}

impl DecisionRow {
    fn into_stored(self) -> Result<StoredDecision, StoreError> {
        let invalid = |column: &'static str, value: &str| StoreError::InvalidValue {
            column,
            value: value.to_string(),
        };

        let id = Uuid::parse_str(&self.id).map_err(|_| invalid("id", &self.id))?;
        let signal = Signal::parse(&self.signal).ok_or_else(|| invalid("signal", &self.signal))?;
        let confidence = Decimal::from_str(&self.confidence)
            .map_err(|_| invalid("confidence", &self.confidence))?;
        let risk_level = RiskLevel::parse(&self.risk_level)
            .ok_or_else(|| invalid("risk_level", &self.risk_level))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|_| invalid("created_at", &self.created_at))?
            .with_timezone(&Utc);

        Ok(StoredDecision {
            id,
            user_id: self.user_id,
            decision: Decision {
                market_question: self.market_question,
                market_slug: self.market_slug,
                signal,
                confidence,
                reasoning: self.reasoning,
                key_factors: serde_json::from_str(&self.key_factors)?,
                risk_level,
            },
            created_at,
        })
    }
}

fn json_column_or<T: DeserializeOwned>(user_id: &str, column: &str, raw: &str, fallback: T) -> T {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(user_id, column, error = %e, "Malformed JSON column, using default");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_models::profile::{RiskProfile, Source};
    use rust_decimal_macros::dec;

    fn decision(slug: &str, confidence: Decimal) -> Decision {
        Decision {
            market_question: format!("{slug}?"),
            market_slug: slug.to_string(),
            signal: Signal::BuyYes,
            confidence,
            reasoning: "Smart money piling in".to_string(),
            key_factors: vec!["Whale buys".to_string(), "Fresh catalyst".to_string()],
            risk_level: RiskLevel::High,
        }
    }

    #[test]
    fn missing_config_returns_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.agent_config("nobody").unwrap().is_none());
    }

    #[test]
    fn config_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let config = UserConfig {
            risk_profile: RiskProfile::Degen,
            sources: vec![Source::Watchlists, Source::Squads],
            focus_sectors: vec!["crypto".to_string()],
            alert_frequency: "high".to_string(),
            is_active: true,
        };
        store.upsert_agent_config("user-1", &config).unwrap();

        assert_eq!(store.agent_config("user-1").unwrap(), Some(config.clone()));

        let updated = UserConfig {
            risk_profile: RiskProfile::Conservative,
            ..config
        };
        store.upsert_agent_config("user-1", &updated).unwrap();
        assert_eq!(
            store.agent_config("user-1").unwrap().unwrap().risk_profile,
            RiskProfile::Conservative
        );
    }

    #[test]
    fn watchlist_ids_are_flattened_and_deduplicated() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .add_watchlist("user-1", "Politics", &["0xaaa", "fed-cut-march"])
            .unwrap();
        store
            .add_watchlist("user-1", "Macro", &["fed-cut-march", "btc-100k"])
            .unwrap();
        store.add_watchlist("user-2", "Other", &["nba-finals"]).unwrap();

        let ids = store.watchlist_ids("user-1").unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&"0xaaa".to_string()));
        assert!(ids.contains(&"btc-100k".to_string()));
        assert!(!ids.contains(&"nba-finals".to_string()));
    }

    #[test]
    fn tracked_wallets_only_from_active_squads() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .add_squad("user-1", "Whales", true, &["0xw1", "0xw2"])
            .unwrap();
        store
            .add_squad("user-1", "Degens", true, &["0xw2", "0xw3"])
            .unwrap();
        store.add_squad("user-1", "Retired", false, &["0xw9"]).unwrap();

        let wallets = store.tracked_wallets("user-1").unwrap();
        assert_eq!(wallets, vec!["0xw1", "0xw2", "0xw3"]);
        assert!(store.tracked_wallets("user-2").unwrap().is_empty());
    }

    #[test]
    fn active_configs_skip_inactive_users() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_agent_config("active", &UserConfig::default())
            .unwrap();
        store
            .upsert_agent_config(
                "paused",
                &UserConfig {
                    is_active: false,
                    ..UserConfig::default()
                },
            )
            .unwrap();

        let users = store.active_configs().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user_id, "active");
        assert_eq!(users[0].risk_profile, RiskProfile::Moderate);
        assert_eq!(users[0].sources, vec![Source::Watchlists, Source::News]);
    }

    #[test]
    fn corrupt_json_columns_fall_back_per_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_agent_config(
                "user-good",
                &UserConfig {
                    risk_profile: RiskProfile::Degen,
                    sources: vec![Source::Squads],
                    ..UserConfig::default()
                },
            )
            .unwrap();
        store
            .upsert_agent_config("user-bad", &UserConfig::default())
            .unwrap();
        {
            let conn = store.conn().unwrap();
            conn.execute(
                "UPDATE agent_configs SET sources = 'watchlists,news', focus_sectors = '[crypto' \
                 WHERE user_id = 'user-bad'",
                [],
            )
            .unwrap();
        }

        let users = store.active_configs().unwrap();
        assert_eq!(users.len(), 2);
        let good = users.iter().find(|u| u.user_id == "user-good").unwrap();
        assert_eq!(good.risk_profile, RiskProfile::Degen);
        assert_eq!(good.sources, vec![Source::Squads]);
        let bad = users.iter().find(|u| u.user_id == "user-bad").unwrap();
        assert_eq!(bad.sources, vec![Source::Watchlists, Source::News]);
        assert!(bad.focus_sectors.is_empty());
    }

    #[test]
    fn unknown_stored_profile_reads_as_unknown() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let conn = store.conn().unwrap();
            conn.execute(
                "INSERT INTO agent_configs (user_id, risk_profile, created_at, updated_at) \
                 VALUES ('user-x', 'whale', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }
        let users = store.active_configs().unwrap();
        assert_eq!(users[0].risk_profile, RiskProfile::Unknown);
        let config = store.agent_config("user-x").unwrap().unwrap();
        assert_eq!(config.sources, vec![Source::Watchlists, Source::News]);
    }

    #[test]
    fn decisions_are_appended_and_read_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_decision("user-1", &decision("first", dec!(0.7)))
            .unwrap();
        store
            .insert_decision("user-1", &decision("second", dec!(0.91)))
            .unwrap();
        store
            .insert_decision("user-2", &decision("elsewhere", dec!(0.5)))
            .unwrap();

        let feed = store.recent_decisions("user-1", 20).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].decision.market_slug, "second");
        assert_eq!(feed[0].decision.confidence, dec!(0.91));
        assert_eq!(feed[0].decision.key_factors.len(), 2);
        assert_eq!(feed[0].decision.risk_level, RiskLevel::High);
        assert_eq!(feed[1].decision.market_slug, "first");

        let limited = store.recent_decisions("user-1", 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn telegram_chat_lookup() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_user("linked", Some("123456")).unwrap();
        store.upsert_user("unlinked", None).unwrap();

        assert_eq!(
            store.telegram_chat_id("linked").unwrap().as_deref(),
            Some("123456")
        );
        assert_eq!(store.telegram_chat_id("unlinked").unwrap(), None);
        assert_eq!(store.telegram_chat_id("missing").unwrap(), None);
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("augur.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).unwrap();
            store
                .insert_decision("user-1", &decision("persisted", dec!(0.8)))
                .unwrap();
        }

        let reopened = SqliteStore::open(path).unwrap();
        let feed = reopened.recent_decisions("user-1", 5).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].decision.market_slug, "persisted");
    }
}
