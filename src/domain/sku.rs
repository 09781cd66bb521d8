// ==========================================
// 配方主数据批量导入 - SKU
// ==========================================
// 对齐: sku 表
// 主键: number（为空时插入时自动分配）
// 唯一: case_upc
// 外键: product_line → product_line.name, formula → formula.number
// 多对多: sku_manufacturing_line（不在字段列表中，由导入器单独维护）
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::types::{FieldDecodeError, FieldDef, FieldValue, ValueReader};
use serde::{Deserialize, Serialize};

const FIELDS: &[FieldDef] = &[
    FieldDef::new("number", "SKU#")
        .primary_key()
        .auto_assign(),
    FieldDef::new("name", "Name"),
    FieldDef::new("case_upc", "Case UPC").unique(),
    FieldDef::new("unit_upc", "Unit UPC"),
    FieldDef::new("unit_size", "Unit size"),
    FieldDef::new("count", "Count per case"),
    FieldDef::new("product_line", "Product Line"),
    FieldDef::new("formula", "Formula#"),
    FieldDef::new("formula_scale", "Formula factor"),
    FieldDef::new("manufacturing_rate", "Rate"),
    FieldDef::new("comment", "Comment"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    // ===== 主键 =====
    pub number: Option<i64>,

    // ===== 基础信息 =====
    pub name: String,
    pub case_upc: String,
    pub unit_upc: String,
    pub unit_size: String,
    pub count: i64, // 每箱件数

    // ===== 引用 =====
    pub product_line: String,
    pub formula: i64,
    pub formula_scale: f64,

    // ===== 生产 =====
    pub manufacturing_rate: f64, // 箱/小时

    pub comment: String,
}

impl Entity for Sku {
    const TABLE: &'static str = "sku";
    const MODEL_NAME: &'static str = "SKU";

    fn fields() -> &'static [FieldDef] {
        FIELDS
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::from_opt_i64(self.number),
            FieldValue::text(&self.name),
            FieldValue::text(&self.case_upc),
            FieldValue::text(&self.unit_upc),
            FieldValue::text(&self.unit_size),
            FieldValue::Integer(self.count),
            FieldValue::text(&self.product_line),
            FieldValue::Integer(self.formula),
            FieldValue::Real(self.formula_scale),
            FieldValue::Real(self.manufacturing_rate),
            FieldValue::text(&self.comment),
        ]
    }

    fn from_values(values: &[FieldValue]) -> Result<Self, FieldDecodeError> {
        let reader = ValueReader::new(Self::MODEL_NAME, FIELDS, values);
        Ok(Self {
            number: reader.opt_i64("number")?,
            name: reader.text("name")?,
            case_upc: reader.text("case_upc")?,
            unit_upc: reader.text("unit_upc")?,
            unit_size: reader.text("unit_size")?,
            count: reader.i64("count")?,
            product_line: reader.text("product_line")?,
            formula: reader.i64("formula")?,
            formula_scale: reader.f64("formula_scale")?,
            manufacturing_rate: reader.f64("manufacturing_rate")?,
            comment: reader.text("comment")?,
        })
    }

    fn set_primary_key(&mut self, value: FieldValue) {
        self.number = value.as_i64();
    }

    fn describe(&self) -> String {
        match self.number {
            Some(number) => format!("SKU #{} ({})", number, self.name),
            None => format!("SKU <待分配> ({})", self.name),
        }
    }
}
