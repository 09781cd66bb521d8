// ==========================================
// 配方主数据批量导入 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 基于实体描述符提供通用数据访问,屏蔽数据库细节
// 约束: 所有查询使用参数化; 列名只来自静态描述符
// ==========================================

pub mod entity_repo;
pub mod error;

// 重导出核心仓储
pub use entity_repo::EntityRepository;
pub use error::{RepositoryError, RepositoryResult};
