// ==========================================
// 配方主数据批量导入 - 应用层
// ==========================================
// 职责: 启动装配（连接、配置、缓存、API）
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
