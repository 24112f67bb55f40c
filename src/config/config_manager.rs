// ==========================================
// 运动员名册导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (scope_id + key → value)
// 规则: 缺失或格式错误的键回落默认值并 warn,不中断导入
// ==========================================

use crate::config::import_config::{
    ImportConfig, MatchWeights, MatcherConfig, ParserMode, ValidationRanges,
};
use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 按路径打开数据库创建 ConfigManager
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager（与仓储共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        tracing::info!(config_key = key, "config value updated");
        Ok(())
    }

    /// 全部 global 配置快照（排查用）
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    /// 读取可解析的标量配置,失败回落默认值
    fn get_parsed_or<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr,
    {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, "config value malformed, using default");
                Ok(default)
            }
        }
    }

    /// 读取 JSON 配置,失败回落默认值
    fn get_json_or<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: DeserializeOwned,
    {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!(config_key = key, raw_value = %raw, error = %e, "config json malformed, using default");
                Ok(default)
            }
        }
    }

    fn read_matcher_config(&self) -> RepositoryResult<MatcherConfig> {
        let defaults = MatcherConfig::default();
        let config = MatcherConfig {
            high_confidence: self
                .get_parsed_or(config_keys::MATCH_HIGH_CONFIDENCE, defaults.high_confidence)?,
            low_floor: self.get_parsed_or(config_keys::MATCH_LOW_FLOOR, defaults.low_floor)?,
            ambiguity_margin: self
                .get_parsed_or(config_keys::MATCH_AMBIGUITY_MARGIN, defaults.ambiguity_margin)?,
            weights: self.get_json_or::<MatchWeights>(config_keys::MATCH_WEIGHTS, defaults.weights)?,
        };

        if let Err(reason) = config.validate() {
            tracing::warn!(%reason, "matcher config rejected, using defaults");
            return Ok(defaults);
        }
        Ok(config)
    }

    fn read_import_config(&self) -> RepositoryResult<ImportConfig> {
        let defaults = ImportConfig::default();

        let parser_mode = match self.get_global_config_value(config_keys::PARSER_MODE)? {
            Some(raw) => ParserMode::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(raw_value = %raw, "unknown parser mode, using default");
                defaults.parser_mode
            }),
            None => defaults.parser_mode,
        };

        Ok(ImportConfig {
            max_rows: self.get_parsed_or(config_keys::MAX_ROWS, defaults.max_rows)?,
            max_file_bytes: self.get_parsed_or(config_keys::MAX_FILE_BYTES, defaults.max_file_bytes)?,
            preview_row_limit: self
                .get_parsed_or(config_keys::PREVIEW_ROW_LIMIT, defaults.preview_row_limit)?,
            store_timeout_ms: self
                .get_parsed_or(config_keys::STORE_TIMEOUT_MS, defaults.store_timeout_ms)?,
            match_concurrency: self
                .get_parsed_or(config_keys::MATCH_CONCURRENCY, defaults.match_concurrency)?
                .max(1),
            parser_mode,
            matcher: self.read_matcher_config()?,
            ranges: self.get_json_or::<ValidationRanges>(config_keys::VALIDATION_RANGES, defaults.ranges)?,
        })
    }
}

// ==========================================
// ImportConfigReader 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_rows(&self) -> RepositoryResult<usize> {
        self.get_parsed_or(config_keys::MAX_ROWS, ImportConfig::default().max_rows)
    }

    async fn get_max_file_bytes(&self) -> RepositoryResult<usize> {
        self.get_parsed_or(config_keys::MAX_FILE_BYTES, ImportConfig::default().max_file_bytes)
    }

    async fn get_preview_row_limit(&self) -> RepositoryResult<usize> {
        self.get_parsed_or(
            config_keys::PREVIEW_ROW_LIMIT,
            ImportConfig::default().preview_row_limit,
        )
    }

    async fn get_matcher_config(&self) -> RepositoryResult<MatcherConfig> {
        self.read_matcher_config()
    }

    async fn load_import_config(&self) -> RepositoryResult<ImportConfig> {
        self.read_import_config()
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 上传上限
    pub const MAX_ROWS: &str = "import.max_rows";
    pub const MAX_FILE_BYTES: &str = "import.max_file_bytes";

    // 预览与执行
    pub const PREVIEW_ROW_LIMIT: &str = "import.preview_row_limit";
    pub const STORE_TIMEOUT_MS: &str = "import.store_timeout_ms";
    pub const MATCH_CONCURRENCY: &str = "import.match_concurrency";
    pub const PARSER_MODE: &str = "import.parser_mode";

    // 实体匹配
    pub const MATCH_HIGH_CONFIDENCE: &str = "matcher.high_confidence";
    pub const MATCH_LOW_FLOOR: &str = "matcher.low_floor";
    pub const MATCH_AMBIGUITY_MARGIN: &str = "matcher.ambiguity_margin";
    pub const MATCH_WEIGHTS: &str = "matcher.weights"; // JSON

    // 校验区间 (JSON)
    pub const VALIDATION_RANGES: &str = "validation.ranges";
}
