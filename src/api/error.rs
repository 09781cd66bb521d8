// ==========================================
// 配方主数据批量导入 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，将仓储层/导入层错误转换为可定位的用户消息
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须能定位到文件、行号与字段
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 源文件错误（需用户修正后重新上传）
    // ==========================================
    #[error("引用完整性错误: {0}")]
    IntegrityViolation(String),

    #[error("文件内重复记录: {0}")]
    DuplicateRecord(String),

    #[error("记录无法唯一匹配: {0}")]
    AmbiguousRecord(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 冲突确认
    // ==========================================
    /// 批次已暂存，等待 force_save / clear_transaction
    #[error("{filename}: {collisions} 条记录与现有数据冲突，等待确认")]
    CollisionPending {
        filename: String,
        collisions: usize,
        skipped_files: Vec<String>,
    },

    #[error("没有待确认的导入事务: {0}")]
    NoOngoingTransaction(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否为等待用户确认的冲突（而非失败）
    pub fn is_collision(&self) -> bool {
        matches!(self, ApiError::CollisionPending { .. })
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, key } => {
                ApiError::NotFound(format!("{}(key={})不存在", entity, key))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            err @ (RepositoryError::UnknownField { .. } | RepositoryError::Decode(_)) => {
                ApiError::InternalError(err.to_string())
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::CollisionOccurred {
                filename,
                collisions,
                skipped_files,
            } => ApiError::CollisionPending {
                filename,
                collisions,
                skipped_files,
            },
            ImportError::NoOngoingTransaction(key) => ApiError::NoOngoingTransaction(key),
            ImportError::Repository(err) => ApiError::from(err),
            ImportError::Other(err) => ApiError::Other(err),
            err @ ImportError::Integrity { .. } => ApiError::IntegrityViolation(err.to_string()),
            err @ ImportError::Duplicate { .. } => ApiError::DuplicateRecord(err.to_string()),
            err @ ImportError::AmbiguousRecord { .. } => ApiError::AmbiguousRecord(err.to_string()),
            err @ ImportError::Validation { .. } => ApiError::ValidationError(err.to_string()),
            err @ (ImportError::HeaderMismatch { .. }
            | ImportError::Encoding { .. }
            | ImportError::Csv { .. }
            | ImportError::NotBound(_)) => ApiError::ImportError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
