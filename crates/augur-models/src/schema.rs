/// Tables the pipeline reads (agent configs, watchlists, squads, users) and the
/// decision feed it appends to.
///
/// JSON-valued columns (`focus_sectors`, `sources`, `market_ids`, `key_factors`)
/// hold serialized arrays. `confidence` is stored as a decimal string.
pub const STORE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id                TEXT PRIMARY KEY,
    telegram_chat_id  TEXT
);
CREATE TABLE IF NOT EXISTS agent_configs (
    user_id          TEXT PRIMARY KEY,
    risk_profile     TEXT NOT NULL DEFAULT 'moderate',
    focus_sectors    TEXT NOT NULL DEFAULT '[]',
    sources          TEXT NOT NULL DEFAULT '[\"watchlists\",\"news\"]',
    alert_frequency  TEXT NOT NULL DEFAULT 'medium',
    is_active        INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS watchlists (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    name        TEXT NOT NULL,
    market_ids  TEXT NOT NULL DEFAULT '[]',
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS squads (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    name        TEXT NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tracked_targets (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    squad_id        TEXT NOT NULL,
    wallet_address  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS agent_decisions (
    id               TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL,
    market_question  TEXT NOT NULL DEFAULT '',
    market_slug      TEXT NOT NULL DEFAULT '',
    signal           TEXT NOT NULL DEFAULT 'HOLD',
    confidence       TEXT NOT NULL DEFAULT '0',
    reasoning        TEXT NOT NULL DEFAULT '',
    key_factors      TEXT NOT NULL DEFAULT '[]',
    risk_level       TEXT NOT NULL DEFAULT 'medium',
    created_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_watchlists_user ON watchlists(user_id);
CREATE INDEX IF NOT EXISTS idx_squads_user ON squads(user_id);
CREATE INDEX IF NOT EXISTS idx_tracked_targets_squad ON tracked_targets(squad_id);
CREATE INDEX IF NOT EXISTS idx_agent_decisions_user_created ON agent_decisions(user_id, created_at DESC);
";
