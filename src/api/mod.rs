// ==========================================
// 配方主数据批量导入 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供 CLI 或宿主应用调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{ForceSaveApiResponse, ImportApi, ImportApiResponse};
