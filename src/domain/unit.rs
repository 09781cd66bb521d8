// ==========================================
// 配方主数据批量导入 - 计量单位
// ==========================================
// 职责: 解析混合单位表达式（如 "10 lb"、"2.5 fl. oz."）
// 分类: 质量 / 体积 / 计数，同类单位间才可换算
// ==========================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Mass,
    Volume,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub symbol: &'static str,
    pub verbose_name: &'static str,
    pub unit_type: UnitType,
    /// 乘以该系数换算为同类基准单位
    pub scale_factor: f64,
    pub is_base: bool,
    /// 归一化后（去点、去空格、小写、去尾部 s）可接受的写法
    accepted_forms: &'static [&'static str],
}

pub const UNITS: &[Unit] = &[
    // ===== 质量 =====
    Unit {
        symbol: "kg",
        verbose_name: "Kilogram",
        unit_type: UnitType::Mass,
        scale_factor: 1.0,
        is_base: true,
        accepted_forms: &["kg", "kilogram"],
    },
    Unit {
        symbol: "g",
        verbose_name: "Gram",
        unit_type: UnitType::Mass,
        scale_factor: 0.001,
        is_base: false,
        accepted_forms: &["g", "gram"],
    },
    Unit {
        symbol: "lb.",
        verbose_name: "Pound",
        unit_type: UnitType::Mass,
        scale_factor: 0.453592,
        is_base: false,
        accepted_forms: &["lb", "pound"],
    },
    Unit {
        symbol: "oz.",
        verbose_name: "Ounce",
        unit_type: UnitType::Mass,
        scale_factor: 0.0283495,
        is_base: false,
        accepted_forms: &["oz", "ounce"],
    },
    Unit {
        symbol: "ton",
        verbose_name: "Imperial Ton",
        unit_type: UnitType::Mass,
        scale_factor: 1016.04608,
        is_base: false,
        accepted_forms: &["ton"],
    },
    // ===== 体积 =====
    Unit {
        symbol: "fl. oz.",
        verbose_name: "Fluid Ounce",
        unit_type: UnitType::Volume,
        scale_factor: 2.95735e-5,
        is_base: false,
        accepted_forms: &["floz", "fluidounce"],
    },
    Unit {
        symbol: "pt.",
        verbose_name: "Pint",
        unit_type: UnitType::Volume,
        scale_factor: 0.000473176,
        is_base: false,
        accepted_forms: &["pt", "pint"],
    },
    Unit {
        symbol: "qt.",
        verbose_name: "Quart",
        unit_type: UnitType::Volume,
        scale_factor: 0.000946352,
        is_base: false,
        accepted_forms: &["qt", "quart"],
    },
    Unit {
        symbol: "gal.",
        verbose_name: "U.S. Liquid Gallon",
        unit_type: UnitType::Volume,
        scale_factor: 0.003785408,
        is_base: false,
        accepted_forms: &["gal", "gallon"],
    },
    Unit {
        symbol: "mL",
        verbose_name: "Milliliter",
        unit_type: UnitType::Volume,
        scale_factor: 1e-6,
        is_base: false,
        accepted_forms: &["ml", "milliliter", "millilitre"],
    },
    Unit {
        symbol: "L",
        verbose_name: "Liter",
        unit_type: UnitType::Volume,
        scale_factor: 1e-3,
        is_base: false,
        accepted_forms: &["l", "liter", "litre"],
    },
    Unit {
        symbol: "m3",
        verbose_name: "Cubic meter",
        unit_type: UnitType::Volume,
        scale_factor: 1.0,
        is_base: true,
        accepted_forms: &["m3", "cubicmeter"],
    },
    // ===== 计数 =====
    Unit {
        symbol: "ct",
        verbose_name: "Count",
        unit_type: UnitType::Count,
        scale_factor: 1.0,
        is_base: true,
        accepted_forms: &["ct", "count"],
    },
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitParseError {
    #[error("无效的单位表达式: '{0}'")]
    Invalid(String),

    #[error("单位表达式 '{0}' 缺少数值部分")]
    MissingNumber(String),

    #[error("单位表达式 '{0}' 缺少单位部分")]
    MissingUnit(String),

    #[error("无法识别的单位 '{unit}'，可接受: {accepted}")]
    Unrecognized { unit: String, accepted: String },
}

/// 按符号查找单位
pub fn find_unit(symbol: &str) -> Option<&'static Unit> {
    UNITS.iter().find(|u| u.symbol == symbol)
}

fn normalize_unit(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .trim_end_matches('s')
        .to_string()
}

/// 解析混合单位表达式，返回 (数值, 单位)
///
/// # 示例
/// - "10 lb" → (10.0, lb.)
/// - "2.5fl. oz." → (2.5, fl. oz.)
pub fn parse_quantity(expression: &str) -> Result<(f64, &'static Unit), UnitParseError> {
    let exp = expression.trim();
    if exp.is_empty() {
        return Err(UnitParseError::Invalid(expression.to_string()));
    }

    let split_at = exp
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(exp.len());
    let (number_part, unit_part) = exp.split_at(split_at);

    if number_part.is_empty() {
        return Err(UnitParseError::MissingNumber(expression.to_string()));
    }
    if unit_part.trim().is_empty() {
        return Err(UnitParseError::MissingUnit(expression.to_string()));
    }

    let number = number_part
        .parse::<f64>()
        .map_err(|_| UnitParseError::Invalid(expression.to_string()))?;

    let normalized = normalize_unit(unit_part);
    UNITS
        .iter()
        .find(|u| u.accepted_forms.contains(&normalized.as_str()))
        .map(|unit| (number, unit))
        .ok_or_else(|| UnitParseError::Unrecognized {
            unit: normalized,
            accepted: UNITS
                .iter()
                .map(|u| u.symbol)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// 格式化为可被 `parse_quantity` 重新解析的表达式
pub fn format_quantity(number: f64, unit: &str) -> String {
    format!("{} {}", number, unit)
}
