// ==========================================
// 运动员名册导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义流水线所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::import_config::{ImportConfig, MatcherConfig};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者:
// - ConfigManager（从 config_kv 表读取,缺失键回落默认值）
// - ImportConfig（固定配置,测试与命令行使用）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 单次上传最大数据行数（超出则整体拒绝）
    async fn get_max_rows(&self) -> RepositoryResult<usize>;

    /// 单次上传最大字节数
    async fn get_max_file_bytes(&self) -> RepositoryResult<usize>;

    /// 预览展示行数上限（只影响展示,不影响汇总与提交）
    async fn get_preview_row_limit(&self) -> RepositoryResult<usize>;

    async fn get_matcher_config(&self) -> RepositoryResult<MatcherConfig>;

    /// 读取完整导入配置
    async fn load_import_config(&self) -> RepositoryResult<ImportConfig>;
}

#[async_trait]
impl ImportConfigReader for ImportConfig {
    async fn get_max_rows(&self) -> RepositoryResult<usize> {
        Ok(self.max_rows)
    }

    async fn get_max_file_bytes(&self) -> RepositoryResult<usize> {
        Ok(self.max_file_bytes)
    }

    async fn get_preview_row_limit(&self) -> RepositoryResult<usize> {
        Ok(self.preview_row_limit)
    }

    async fn get_matcher_config(&self) -> RepositoryResult<MatcherConfig> {
        Ok(self.matcher)
    }

    async fn load_import_config(&self) -> RepositoryResult<ImportConfig> {
        Ok(self.clone())
    }
}
