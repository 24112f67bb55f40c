// ==========================================
// 运动员名册导入系统 - 配置层
// ==========================================
// 职责: 导入配置模型、config_kv 覆写、配置读取接口
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config;
pub mod import_config_trait;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use import_config::{ImportConfig, MatchWeights, MatcherConfig, ParserMode, ValidationRanges};
pub use import_config_trait::ImportConfigReader;
