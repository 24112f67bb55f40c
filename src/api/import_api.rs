// ==========================================
// 名册导入API
// ==========================================
// 职责: 封装导入流水线的五个对外操作
// - parse_csv: 解析上传文本 + 列映射建议
// - preview: 生成预览（展示行数受 preview_row_limit 限制,汇总覆盖全部行）
// - commit: 提交导入（基于全部原始行重新预览后执行）
// - list_review_queue / decide_review_item: 复核队列
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::import_result::ImportResult;
use crate::domain::import_row::{FieldMapping, RawRow};
use crate::domain::preview::{PreviewRow, PreviewSummary};
use crate::domain::review::{ImportReviewItem, ReviewDecision, ReviewDecisionRef, ReviewFilter};
use crate::domain::types::ImportKind;
use crate::importer::{RosterImporter, RosterImporterImpl};
use crate::repository::{
    PersonRepositoryImpl, PersonStore, RepositoryError, ReviewQueueRepository,
    ReviewQueueRepositoryImpl,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::instrument;

/// parse_csv 返回的样例行数
pub const SAMPLE_ROW_COUNT: usize = 5;

/// 解析响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseCsvResponse {
    pub headers: Vec<String>,
    /// 前几行样例（供映射界面展示）
    pub sample_rows: Vec<RawRow>,
    /// 全部解析行（预览/提交时原样回传）
    pub rows: Vec<RawRow>,
    pub total_rows: usize,
    pub suggested_mappings: Vec<FieldMapping>,
}

/// 预览请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub kind: ImportKind,
    pub rows: Vec<RawRow>,
    pub mapping: Vec<FieldMapping>,
}

/// 预览响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    /// 展示行（可能被截断）
    pub preview_rows: Vec<PreviewRow>,
    /// 汇总（始终覆盖全部行）
    pub summary: PreviewSummary,
    /// 展示行是否被截断
    pub truncated: bool,
}

/// 提交请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub kind: ImportKind,
    pub rows: Vec<RawRow>,
    pub mapping: Vec<FieldMapping>,
    #[serde(default)]
    pub review_decisions: Vec<ReviewDecisionRef>,
    pub created_by: String,
}

/// 导入API
pub struct ImportApi<S, Q, C>
where
    S: PersonStore,
    Q: ReviewQueueRepository,
    C: ImportConfigReader,
{
    importer: RosterImporterImpl<S, Q, C>,
}

impl ImportApi<PersonRepositoryImpl, ReviewQueueRepositoryImpl, ConfigManager> {
    /// 基于 SQLite 数据库创建 ImportApi（各仓储与配置共享同一连接）
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("打开数据库失败: {}", e)))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(format!("初始化表结构失败: {}", e)))?;
        let conn = Arc::new(Mutex::new(conn));

        let config = ConfigManager::from_connection(conn.clone())?;
        let importer = RosterImporterImpl::new(
            Arc::new(PersonRepositoryImpl::from_connection(conn.clone())),
            Arc::new(ReviewQueueRepositoryImpl::from_connection(conn)),
            config,
        );
        Ok(Self { importer })
    }
}

impl<S, Q, C> ImportApi<S, Q, C>
where
    S: PersonStore,
    Q: ReviewQueueRepository,
    C: ImportConfigReader,
{
    pub fn from_importer(importer: RosterImporterImpl<S, Q, C>) -> Self {
        Self { importer }
    }

    /// 解析上传文本
    ///
    /// # 错误
    /// - ApiError::ImportError: 空文件 / 无表头 / 超出大小或行数上限
    pub async fn parse_csv(&self, text: &str, kind: ImportKind) -> ApiResult<ParseCsvResponse> {
        let parsed = self.importer.parse_upload(text, kind).await?;
        Ok(ParseCsvResponse {
            headers: parsed.headers,
            sample_rows: parsed.rows.iter().take(SAMPLE_ROW_COUNT).cloned().collect(),
            total_rows: parsed.rows.len(),
            rows: parsed.rows,
            suggested_mappings: parsed.suggested_mappings,
        })
    }

    /// 生成预览
    pub async fn preview(&self, request: &PreviewRequest) -> ApiResult<PreviewResponse> {
        let limit = self.importer.config_reader().get_preview_row_limit().await?;
        let result = self
            .importer
            .preview(request.kind, &request.rows, &request.mapping)
            .await?;

        let rendered = result.rendered(limit).to_vec();
        Ok(PreviewResponse {
            truncated: rendered.len() < result.rows.len(),
            preview_rows: rendered,
            summary: result.summary,
        })
    }

    /// 提交导入
    ///
    /// # 错误
    /// - ApiError::InvalidInput: created_by 为空
    /// - ApiError::ImportError: 必填字段未映射 / 映射非法 / 超出上限
    pub async fn commit(&self, request: &CommitRequest) -> ApiResult<ImportResult> {
        if request.created_by.trim().is_empty() {
            return Err(ApiError::InvalidInput("created_by 不能为空".to_string()));
        }
        let result = self
            .importer
            .commit(
                request.kind,
                &request.rows,
                &request.mapping,
                &request.review_decisions,
                request.created_by.trim(),
            )
            .await?;
        Ok(result)
    }

    /// 待复核列表
    pub async fn list_review_queue(&self, filter: &ReviewFilter) -> ApiResult<Vec<ImportReviewItem>> {
        Ok(self.importer.review_queue().list_pending(filter).await?)
    }

    /// 记录复核决定
    ///
    /// # 错误
    /// - ApiError::NotFound: 复核项不存在
    /// - ApiError::Conflict: 已被决定（重复提交或并发竞争）
    /// - ApiError::ValidationError: 所选实体不在候选中
    #[instrument(skip(self, decision))]
    pub async fn decide_review_item(&self, id: &str, decision: &ReviewDecision) -> ApiResult<ImportReviewItem> {
        if id.trim().is_empty() {
            return Err(ApiError::InvalidInput("复核项ID不能为空".to_string()));
        }
        if decision.reviewed_by.trim().is_empty() {
            return Err(ApiError::InvalidInput("reviewed_by 不能为空".to_string()));
        }
        match self.importer.review_queue().decide(id, decision).await {
            Ok(item) => Ok(item),
            Err(RepositoryError::NotFound { .. }) => {
                Err(ApiError::NotFound(format!("复核项不存在: {}", id)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
