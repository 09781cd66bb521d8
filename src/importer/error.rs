// ==========================================
// 配方主数据批量导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 文件内冲突（Collision）不是错误，见 ImportOutcome::Collided；
//       CollisionOccurred 只在批次编排层暂存后返回
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 行级致命错误（整个文件中止） =====
    #[error(
        "{filename}:{line_num}: 无法导入 {referring}: 引用的 {referred} 不存在 ({field} = '{value}')"
    )]
    Integrity {
        filename: String,
        line_num: usize,
        referring: String,
        referred: String,
        field: String,
        value: String,
    },

    #[error(
        "{filename}:{line_num}: 与第 {first_line} 行重复 (字段 {fields} = {values})"
    )]
    Duplicate {
        filename: String,
        first_line: usize,
        line_num: usize,
        fields: String,
        values: String,
    },

    #[error(
        "{filename}:{line_num}: {model} 记录无法唯一匹配现有数据: {}",
        .candidates.join("; ")
    )]
    AmbiguousRecord {
        filename: String,
        line_num: usize,
        model: String,
        candidates: Vec<String>,
    },

    #[error("{filename}:{line_num}: 列 '{column}' 的值 '{value}' 无效: {message}")]
    Validation {
        filename: String,
        line_num: usize,
        column: String,
        value: String,
        message: String,
    },

    // ===== 文件相关错误 =====
    #[error("{filename}: 表头不匹配，期望 [{expected}]，实际 [{actual}]")]
    HeaderMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    #[error("{filename}: 文件编码必须为 UTF-8: {message}")]
    Encoding { filename: String, message: String },

    #[error("{filename}: CSV 解析失败: {message}")]
    Csv { filename: String, message: String },

    // ===== 暂存事务相关 =====
    #[error("导入器未绑定 (文件 {0})，请重新导入。错误码: ENOTBOUND")]
    NotBound(String),

    #[error("会话 {0} 没有待确认的导入事务")]
    NoOngoingTransaction(String),

    #[error(
        "{filename}: 检测到 {collisions} 条记录与现有数据冲突，批次已暂存等待确认{}",
        skipped_suffix(.skipped_files)
    )]
    CollisionOccurred {
        filename: String,
        collisions: usize,
        skipped_files: Vec<String>,
    },

    // ===== 数据库错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn skipped_suffix(skipped: &[String]) -> String {
    if skipped.is_empty() {
        String::new()
    } else {
        format!("（未处理文件: {}）", skipped.join(", "))
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

impl ImportError {
    /// 是否为冲突信号（而非需要修正源文件的错误）
    pub fn is_collision(&self) -> bool {
        matches!(self, ImportError::CollisionOccurred { .. })
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_locate_the_row() {
        let err = ImportError::Duplicate {
            filename: "skus.csv".to_string(),
            first_line: 2,
            line_num: 5,
            fields: "Case UPC".to_string(),
            values: "036000291452".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("skus.csv:5:"));
        assert!(msg.contains("第 2 行"));

        let err = ImportError::AmbiguousRecord {
            filename: "ingredients.csv".to_string(),
            line_num: 3,
            model: "Ingredient".to_string(),
            candidates: vec!["X".to_string(), "Y".to_string()],
        };
        assert!(err.to_string().ends_with("X; Y"));
    }

    #[test]
    fn test_collision_lists_skipped_files() {
        let err = ImportError::CollisionOccurred {
            filename: "formulas.csv".to_string(),
            collisions: 1,
            skipped_files: vec!["skus.csv".to_string()],
        };
        assert!(err.is_collision());
        assert!(err.to_string().contains("skus.csv"));
    }
}
