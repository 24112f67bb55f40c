// ==========================================
// 运动员名册导入系统 - SQLite 连接与建表
// ==========================================
// 目标:
// - 统一所有连接的 PRAGMA 行为（外键、busy_timeout）
// - 集中维护参考实现的建表语句（幂等）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "ROSTER_IMPORT_DB_PATH";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys 与 busy_timeout 都是连接级设置,每个连接都要执行
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;

    if let Some(v) = read_schema_version(conn)? {
        if v > CURRENT_SCHEMA_VERSION {
            tracing::warn!(
                db_version = v,
                expected = CURRENT_SCHEMA_VERSION,
                "database schema is newer than this build"
            );
        }
    }
    Ok(())
}

/// 默认数据库路径
///
/// 优先级: 环境变量 → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./roster_import.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("roster-import");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("roster_import.db");
        } else {
            tracing::warn!(dir = %dir.display(), "cannot create data dir, using working directory");
        }
    }

    path.to_string_lossy().to_string()
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id    TEXT NOT NULL DEFAULT 'global',
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS person (
    person_id          TEXT PRIMARY KEY,
    created_seq        INTEGER NOT NULL UNIQUE,
    first_name         TEXT NOT NULL,
    last_name          TEXT NOT NULL,
    first_name_norm    TEXT NOT NULL,
    last_name_norm     TEXT NOT NULL,
    phone_numbers_json TEXT NOT NULL DEFAULT '[]',
    birth_date         TEXT,
    birth_year         INTEGER,
    gender             TEXT,
    graduation_year    INTEGER,
    sports             TEXT,
    height             REAL,
    weight             REAL,
    school             TEXT,
    competitive_level  INTEGER,
    created_by         TEXT NOT NULL,
    created_at         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_person_last_name ON person(last_name_norm);
CREATE INDEX IF NOT EXISTS idx_person_first_name ON person(first_name_norm);

CREATE TABLE IF NOT EXISTS person_email (
    email      TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES person(person_id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_person_email_person ON person_email(person_id);

CREATE TABLE IF NOT EXISTS person_team (
    person_id  TEXT NOT NULL REFERENCES person(person_id) ON DELETE CASCADE,
    team_name  TEXT NOT NULL,
    PRIMARY KEY (person_id, team_name)
);

CREATE TABLE IF NOT EXISTS invitation (
    invitation_id        TEXT PRIMARY KEY,
    email                TEXT NOT NULL,
    team_name            TEXT,
    status               TEXT NOT NULL DEFAULT 'PENDING',
    created_at           TEXT NOT NULL,
    closed_at            TEXT,
    closed_by_person_id  TEXT REFERENCES person(person_id)
);
CREATE INDEX IF NOT EXISTS idx_invitation_email ON invitation(email, status);

CREATE TABLE IF NOT EXISTS measurement (
    measurement_id   TEXT PRIMARY KEY,
    person_id        TEXT NOT NULL REFERENCES person(person_id) ON DELETE CASCADE,
    metric           TEXT NOT NULL,
    value            REAL NOT NULL,
    units            TEXT NOT NULL,
    measured_on      TEXT NOT NULL,
    age              INTEGER,
    fly_in_distance  REAL,
    notes            TEXT,
    team_name        TEXT,
    created_by       TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    UNIQUE (person_id, metric, measured_on, value)
);

CREATE TABLE IF NOT EXISTS import_review_item (
    id                      TEXT PRIMARY KEY,
    batch_id                TEXT NOT NULL,
    import_kind             TEXT NOT NULL,
    row_index               INTEGER NOT NULL,
    original_data_json      TEXT NOT NULL,
    matching_criteria_json  TEXT NOT NULL,
    suggested_match_json    TEXT,
    alternatives_json       TEXT NOT NULL DEFAULT '[]',
    status                  TEXT NOT NULL DEFAULT 'PENDING',
    resolved_entity_id      TEXT,
    created_at              TEXT NOT NULL,
    created_by              TEXT NOT NULL,
    reviewed_at             TEXT,
    reviewed_by             TEXT,
    review_notes            TEXT,
    applied_at              TEXT
);
CREATE INDEX IF NOT EXISTS idx_review_item_status ON import_review_item(status, created_at);
CREATE INDEX IF NOT EXISTS idx_review_item_batch ON import_review_item(batch_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
