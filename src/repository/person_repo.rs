// ==========================================
// 运动员名册导入系统 - 人员存储 Trait
// ==========================================
// 职责: 定义实体存储的数据访问接口（不包含业务逻辑）
// 实现者: PersonRepositoryImpl（rusqlite）,测试中的内存替身
// 红线: Repository 不含业务规则,只做数据 CRUD
// ==========================================

use crate::domain::person::{MatchingCriteria, NewMeasurement, NewPerson, PersonRecord, PersonWrite};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

#[async_trait]
pub trait PersonStore: Send + Sync {
    // ===== 查询 =====

    /// 按身份条件检索可能的候选人员
    ///
    /// 只做粗筛（姓、名、邮箱任一命中）,评分由实体匹配器负责
    /// 姓名全部命中的人员必须返回,不受粗筛上限影响
    async fn find_candidates(&self, criteria: &MatchingCriteria) -> RepositoryResult<Vec<PersonRecord>>;

    async fn get_person(&self, person_id: &str) -> RepositoryResult<Option<PersonRecord>>;

    // ===== 写入 =====

    /// 新建人员（邮箱唯一约束冲突时返回 UniqueConstraintViolation）
    async fn create_person(&self, person: &NewPerson) -> RepositoryResult<PersonRecord>;

    /// 将导入行补充到已有人员
    ///
    /// 只填补空字段、追加缺失的邮箱/电话/队伍；重复执行结果不变
    async fn merge_into_person(&self, person_id: &str, incoming: &NewPerson) -> RepositoryResult<PersonRecord>;

    /// 新建人员并写入成绩
    ///
    /// 同一事务: 任一步失败时人员与成绩都不落库
    async fn record_new_person(
        &self,
        person: &NewPerson,
        measurement: Option<&NewMeasurement>,
    ) -> RepositoryResult<PersonWrite>;

    /// 合并到已有人员,关闭其邮箱对应的待处理邀请,并写入成绩
    ///
    /// 同一事务: 任一步失败时合并与邀请关闭一并回滚
    async fn record_matched_person(
        &self,
        person_id: &str,
        incoming: &NewPerson,
        measurement: Option<&NewMeasurement>,
    ) -> RepositoryResult<PersonWrite>;
}
