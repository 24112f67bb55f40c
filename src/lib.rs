// ==========================================
// 运动员名册导入系统 - 核心库
// ==========================================
// 职责: CSV 名册/测试成绩导入、实体去重匹配、人工复核队列
// 技术栈: Rust + SQLite
// 系统定位: 导入前可预览,疑似重复交人工决定
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 流水线
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ImportAction, ImportKind, MatchStatus, ReviewStatus, SystemField, ValidationStatus,
};

// 领域实体
pub use domain::{
    FieldMapping, ImportResult, ImportReviewItem, PreviewResult, PreviewRow, RawRow,
    ReviewDecision,
};

// 导入器
pub use importer::{RosterImporter, RosterImporterImpl};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "roster-import";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
