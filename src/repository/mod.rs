// ==========================================
// 运动员名册导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供实体存储与复核队列的数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod person_repo;
pub mod person_repo_impl;
pub mod review_queue_repo;
pub mod review_queue_repo_impl;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use person_repo::PersonStore;
pub use person_repo_impl::PersonRepositoryImpl;
pub use review_queue_repo::ReviewQueueRepository;
pub use review_queue_repo_impl::ReviewQueueRepositoryImpl;
