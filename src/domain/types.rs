// ==========================================
// 配方主数据批量导入 - 领域类型定义
// ==========================================
// 职责: 字段值、字段描述符、文件类型等基础类型
// 红线: 不含数据访问逻辑
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ==========================================
// FieldValue - 统一字段值
// ==========================================
// 用途: 转换后行数据、唯一键比较、仓储读写
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn from_opt_i64(value: Option<i64>) -> Self {
        value.map(FieldValue::Integer).unwrap_or(FieldValue::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// 整数值同样可以按浮点读取（SQLite REAL 列可能存为 INTEGER）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Real(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "NULL",
            FieldValue::Integer(_) => "INTEGER",
            FieldValue::Real(_) => "REAL",
            FieldValue::Text(_) => "TEXT",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Real(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

// ==========================================
// FieldDef - 字段描述符
// ==========================================
/// 实体字段描述符
///
/// 由每个实体在编译期静态声明，取代运行时反射。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub verbose_name: &'static str,
    pub primary_key: bool,
    pub unique: bool,
    /// 为空时由仓储在插入时自动分配（MAX + 1）
    pub auto_assign: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str, verbose_name: &'static str) -> Self {
        Self {
            name,
            verbose_name,
            primary_key: false,
            unique: false,
            auto_assign: false,
        }
    }

    /// 主键隐含唯一
    pub const fn primary_key(self) -> Self {
        Self {
            primary_key: true,
            unique: true,
            ..self
        }
    }

    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    pub const fn auto_assign(self) -> Self {
        Self {
            auto_assign: true,
            ..self
        }
    }
}

// ==========================================
// FieldDecodeError - 字段解码错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldDecodeError {
    #[error("{model} 缺少字段: {field}")]
    MissingField { model: &'static str, field: String },

    #[error("{model}.{field} 类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        model: &'static str,
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// 按字段名从有序值列表中读取类型化字段
pub struct ValueReader<'a> {
    model: &'static str,
    fields: &'static [FieldDef],
    values: &'a [FieldValue],
}

impl<'a> ValueReader<'a> {
    pub fn new(model: &'static str, fields: &'static [FieldDef], values: &'a [FieldValue]) -> Self {
        Self {
            model,
            fields,
            values,
        }
    }

    fn get(&self, field: &str) -> Result<&'a FieldValue, FieldDecodeError> {
        self.fields
            .iter()
            .position(|f| f.name == field)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| FieldDecodeError::MissingField {
                model: self.model,
                field: field.to_string(),
            })
    }

    fn mismatch(&self, field: &str, expected: &'static str, actual: &FieldValue) -> FieldDecodeError {
        FieldDecodeError::TypeMismatch {
            model: self.model,
            field: field.to_string(),
            expected,
            actual: actual.type_name(),
        }
    }

    pub fn opt_text(&self, field: &str) -> Result<Option<String>, FieldDecodeError> {
        match self.get(field)? {
            FieldValue::Null => Ok(None),
            FieldValue::Text(v) => Ok(Some(v.clone())),
            other => Err(self.mismatch(field, "TEXT", other)),
        }
    }

    /// NULL 读作空字符串
    pub fn text(&self, field: &str) -> Result<String, FieldDecodeError> {
        Ok(self.opt_text(field)?.unwrap_or_default())
    }

    pub fn opt_i64(&self, field: &str) -> Result<Option<i64>, FieldDecodeError> {
        match self.get(field)? {
            FieldValue::Null => Ok(None),
            FieldValue::Integer(v) => Ok(Some(*v)),
            other => Err(self.mismatch(field, "INTEGER", other)),
        }
    }

    pub fn i64(&self, field: &str) -> Result<i64, FieldDecodeError> {
        let value = self.get(field)?;
        self.opt_i64(field)?
            .ok_or_else(|| self.mismatch(field, "INTEGER", value))
    }

    pub fn f64(&self, field: &str) -> Result<f64, FieldDecodeError> {
        let value = self.get(field)?;
        value
            .as_f64()
            .ok_or_else(|| self.mismatch(field, "REAL", value))
    }
}

// ==========================================
// FileType - 导入文件类型
// ==========================================
// 声明顺序即拓扑顺序（父实体在前）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    ProductLines,
    Ingredients,
    Formulas,
    Skus,
}

impl FileType {
    /// 外键方向决定的处理顺序: 产品线 → 原料 → 配方 → SKU
    pub const TOPOLOGICAL_ORDER: [FileType; 4] = [
        FileType::ProductLines,
        FileType::Ingredients,
        FileType::Formulas,
        FileType::Skus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::ProductLines => "product_lines",
            FileType::Ingredients => "ingredients",
            FileType::Formulas => "formulas",
            FileType::Skus => "skus",
        }
    }

    /// 面向用户的实体名称（用于统计与错误信息）
    pub fn entity_name(&self) -> &'static str {
        match self {
            FileType::ProductLines => "Product Line",
            FileType::Ingredients => "Ingredient",
            FileType::Formulas => "Formula",
            FileType::Skus => "SKU",
        }
    }

    /// 根据上传文件名识别类型（product_lines*.csv / ingredients*.csv / formula*.csv / skus*.csv）
    pub fn detect_from_filename(filename: &str) -> Option<FileType> {
        let base = filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(filename)
            .to_ascii_lowercase();
        if !base.ends_with(".csv") || base.chars().any(char::is_whitespace) {
            return None;
        }

        // formula 前缀同时覆盖 formulas*.csv
        [
            ("product_lines", FileType::ProductLines),
            ("ingredients", FileType::Ingredients),
            ("formula", FileType::Formulas),
            ("skus", FileType::Skus),
        ]
        .into_iter()
        .find(|(prefix, _)| base.starts_with(prefix))
        .map(|(_, file_type)| file_type)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "product_lines" => Ok(FileType::ProductLines),
            "ingredients" => Ok(FileType::Ingredients),
            "formulas" | "formula" => Ok(FileType::Formulas),
            "skus" => Ok(FileType::Skus),
            other => Err(format!("未知文件类型: {}", other)),
        }
    }
}
