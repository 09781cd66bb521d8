// ==========================================
// 配方主数据批量导入 - 字段映射器
// ==========================================
// 职责: 按列名读取原始行 + 类型转换，错误附带文件名/行号/列名
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRow;
use crate::importer::registry::EntityRegistration;

/// 单行读取器
pub struct RowReader<'a> {
    filename: &'a str,
    registration: &'static EntityRegistration,
    row: &'a RawRow,
}

impl<'a> RowReader<'a> {
    pub fn new(filename: &'a str, registration: &'static EntityRegistration, row: &'a RawRow) -> Self {
        Self {
            filename,
            registration,
            row,
        }
    }

    pub fn filename(&self) -> &'a str {
        self.filename
    }

    pub fn line_num(&self) -> usize {
        self.row.line_num
    }

    /// 原始单元格（已去空白；列不存在时为空串）
    pub fn cell(&self, column: &str) -> &'a str {
        self.registration
            .column_index(column)
            .and_then(|idx| self.row.cells.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// 空单元格返回 None
    pub fn get_string(&self, column: &str) -> Option<&'a str> {
        Some(self.cell(column)).filter(|v| !v.is_empty())
    }

    /// 必填文本
    pub fn required_string(&self, column: &str) -> ImportResult<String> {
        self.get_string(column)
            .map(str::to_string)
            .ok_or_else(|| self.validation(column, "不能为空"))
    }

    /// 解析整数（空单元格为 None）
    pub fn parse_i64(&self, column: &str) -> ImportResult<Option<i64>> {
        match self.get_string(column) {
            None => Ok(None),
            Some(value) => value
                .parse::<i64>()
                .map(Some)
                .map_err(|_| self.validation(column, "无法解析为整数")),
        }
    }

    pub fn required_i64(&self, column: &str) -> ImportResult<i64> {
        self.parse_i64(column)?
            .ok_or_else(|| self.validation(column, "不能为空"))
    }

    /// 解析浮点数（空单元格为 None）
    pub fn parse_f64(&self, column: &str) -> ImportResult<Option<f64>> {
        match self.get_string(column) {
            None => Ok(None),
            Some(value) => match value.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Some(v)),
                _ => Err(self.validation(column, "无法解析为数值")),
            },
        }
    }

    /// 正数；空单元格取默认值（无默认值时为必填）
    pub fn positive_f64(&self, column: &str, default: Option<f64>) -> ImportResult<f64> {
        let value = match (self.parse_f64(column)?, default) {
            (Some(v), _) => v,
            (None, Some(d)) => return Ok(d),
            (None, None) => return Err(self.validation(column, "不能为空")),
        };
        if value <= 0.0 {
            return Err(self.validation(column, "必须为正数"));
        }
        Ok(value)
    }

    // ===== 错误构造 =====

    pub fn validation(&self, column: &str, message: impl Into<String>) -> ImportError {
        ImportError::Validation {
            filename: self.filename.to_string(),
            line_num: self.row.line_num,
            column: column.to_string(),
            value: self.cell(column).to_string(),
            message: message.into(),
        }
    }

    /// 外键不存在
    pub fn integrity(&self, referred: &str, column: &str, value: impl Into<String>) -> ImportError {
        ImportError::Integrity {
            filename: self.filename.to_string(),
            line_num: self.row.line_num,
            referring: self.registration.model_name.to_string(),
            referred: referred.to_string(),
            field: column.to_string(),
            value: value.into(),
        }
    }
}
