// ==========================================
// 运动员名册导入系统 - 导入器实现
// ==========================================
// 职责: 串联流水线各阶段,对外提供 解析 / 预览 / 提交
// 流程: 上限检查 → 解析 → 映射建议 → 校验 → 匹配 → 预览 → 执行
// 配置: 每次调用读取一次配置（config_kv 覆写无需重启即生效）
// ==========================================

use crate::config::{ImportConfig, ImportConfigReader};
use crate::domain::import_result::ImportResult;
use crate::domain::import_row::{FieldMapping, RawRow};
use crate::domain::preview::PreviewResult;
use crate::domain::review::ReviewDecisionRef;
use crate::domain::types::ImportKind;
use crate::importer::entity_matcher::EntityMatcher;
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::field_mapper::{check_mapping, ensure_required_mapped, HeaderFieldMapper};
use crate::importer::file_parser::CsvFileParser;
use crate::importer::import_executor::ImportExecutor;
use crate::importer::importer_trait::{FieldMapper, FileParser, ParsedUpload, RosterImporter};
use crate::importer::preview_builder::PreviewBuilder;
use crate::importer::review_queue::ReviewQueue;
use crate::importer::row_validator::RowValidatorImpl;
use crate::repository::person_repo::PersonStore;
use crate::repository::review_queue_repo::ReviewQueueRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// RosterImporterImpl - 导入器实现
// ==========================================
pub struct RosterImporterImpl<S, Q, C>
where
    S: PersonStore,
    Q: ReviewQueueRepository,
    C: ImportConfigReader,
{
    // 实体存储
    store: Arc<S>,

    // 复核队列
    review_queue: ReviewQueue<Q>,

    // 配置读取器
    config: C,

    // 列映射器
    field_mapper: Box<dyn FieldMapper>,
}

impl<S, Q, C> RosterImporterImpl<S, Q, C>
where
    S: PersonStore,
    Q: ReviewQueueRepository,
    C: ImportConfigReader,
{
    pub fn new(store: Arc<S>, review_repo: Arc<Q>, config: C) -> Self {
        Self::with_field_mapper(store, review_repo, config, Box::new(HeaderFieldMapper))
    }

    pub fn with_field_mapper(
        store: Arc<S>,
        review_repo: Arc<Q>,
        config: C,
        field_mapper: Box<dyn FieldMapper>,
    ) -> Self {
        Self {
            store,
            review_queue: ReviewQueue::new(review_repo),
            config,
            field_mapper,
        }
    }

    pub fn review_queue(&self) -> &ReviewQueue<Q> {
        &self.review_queue
    }

    pub fn config_reader(&self) -> &C {
        &self.config
    }

    fn preview_builder(config: &ImportConfig) -> PreviewBuilder {
        PreviewBuilder::new(
            Box::new(RowValidatorImpl::new(config.ranges)),
            EntityMatcher::new(config.matcher, config.store_timeout()),
            config.match_concurrency,
        )
    }

    fn check_row_ceiling(rows: usize, config: &ImportConfig) -> PipelineResult<()> {
        if rows > config.max_rows {
            warn!(rows, limit = config.max_rows, "行数超出上限");
            return Err(ImportError::TooManyRows {
                actual: rows,
                limit: config.max_rows,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<S, Q, C> RosterImporter for RosterImporterImpl<S, Q, C>
where
    S: PersonStore,
    Q: ReviewQueueRepository,
    C: ImportConfigReader,
{
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    async fn parse_upload(&self, text: &str, kind: ImportKind) -> PipelineResult<ParsedUpload> {
        let config = self.config.load_import_config().await?;

        // === 步骤 1: 上传上限 ===
        if text.len() > config.max_file_bytes {
            warn!(limit = config.max_file_bytes, "文件大小超出上限");
            return Err(ImportError::FileTooLarge {
                actual: text.len(),
                limit: config.max_file_bytes,
            });
        }
        if text.trim_start_matches('\u{feff}').trim().is_empty() {
            return Err(ImportError::EmptyFile);
        }

        // === 步骤 2: 解析 ===
        let parsed = CsvFileParser::new(config.parser_mode).parse_text(text)?;
        if parsed.headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeader);
        }
        Self::check_row_ceiling(parsed.rows.len(), &config)?;

        // === 步骤 3: 映射建议 ===
        let suggested_mappings = self.field_mapper.suggest_mappings(&parsed.headers, kind);
        info!(
            headers = parsed.headers.len(),
            rows = parsed.rows.len(),
            mapped = suggested_mappings.len(),
            "文件解析完成"
        );

        Ok(ParsedUpload {
            headers: parsed.headers,
            rows: parsed.rows,
            suggested_mappings,
        })
    }

    #[instrument(skip(self, rows, mapping), fields(rows = rows.len()))]
    async fn preview(
        &self,
        kind: ImportKind,
        rows: &[RawRow],
        mapping: &[FieldMapping],
    ) -> PipelineResult<PreviewResult> {
        let config = self.config.load_import_config().await?;
        Self::check_row_ceiling(rows.len(), &config)?;

        let headers: Vec<String> = rows
            .first()
            .map(|r| r.headers().cloned().collect())
            .unwrap_or_default();
        check_mapping(kind, mapping, &headers)?;

        debug!(mappings = mapping.len(), "开始生成预览");
        let builder = Self::preview_builder(&config);
        Ok(builder.build(self.store.as_ref(), kind, rows, mapping).await)
    }

    #[instrument(skip(self, rows, mapping, decisions), fields(rows = rows.len(), decisions = decisions.len()))]
    async fn commit(
        &self,
        kind: ImportKind,
        rows: &[RawRow],
        mapping: &[FieldMapping],
        decisions: &[ReviewDecisionRef],
        created_by: &str,
    ) -> PipelineResult<ImportResult> {
        ensure_required_mapped(kind, mapping)?;

        // 提交总是基于全部行重新生成预览（展示截断不影响提交）
        let preview = self.preview(kind, rows, mapping).await?;

        let executor = ImportExecutor::new(self.store.as_ref(), &self.review_queue, created_by);
        let result = executor.execute(kind, &preview, decisions).await;
        info!(
            batch_id = %result.batch_id,
            total = result.total_rows,
            errors = result.summary.errors,
            "导入提交完成"
        );
        Ok(result)
    }
}
