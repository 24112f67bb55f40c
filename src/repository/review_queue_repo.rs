// ==========================================
// 运动员名册导入系统 - 复核队列 Repository Trait
// ==========================================
// 职责: 复核项持久化接口（唯一跨请求存活的导入实体）
// 并发: decide 必须在存储层原子完成（条件更新 status = 'PENDING'）
// ==========================================

use crate::domain::review::{ImportReviewItem, NewReviewItem, ReviewDecision, ReviewFilter};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

#[async_trait]
pub trait ReviewQueueRepository: Send + Sync {
    /// 入队,返回已持久化的复核项（状态 PENDING）
    async fn enqueue(&self, item: NewReviewItem) -> RepositoryResult<ImportReviewItem>;

    async fn get(&self, id: &str) -> RepositoryResult<Option<ImportReviewItem>>;

    /// 记录复核决定
    ///
    /// # 错误
    /// - NotFound: 复核项不存在
    /// - ValidationError: 所选实体不在候选中,或无建议可接受
    /// - DecisionConflict: 复核项已被决定（含并发竞争失败方）
    async fn decide(&self, id: &str, decision: &ReviewDecision) -> RepositoryResult<ImportReviewItem>;

    /// 待复核列表（按创建时间升序）
    async fn list_pending(&self, filter: &ReviewFilter) -> RepositoryResult<Vec<ImportReviewItem>>;

    /// 标记已落实,返回 false 表示此前已被落实或尚未决定
    async fn mark_applied(&self, id: &str) -> RepositoryResult<bool>;
}
