// ==========================================
// 配方主数据批量导入 - 原料
// ==========================================
// 对齐: ingredient 表
// 主键: number（为空时插入时自动分配）
// 唯一: name
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::types::{FieldDecodeError, FieldDef, FieldValue, ValueReader};
use serde::{Deserialize, Serialize};

const FIELDS: &[FieldDef] = &[
    FieldDef::new("number", "Ingr#")
        .primary_key()
        .auto_assign(),
    FieldDef::new("name", "Name").unique(),
    FieldDef::new("vendor_info", "Vendor Info"),
    FieldDef::new("size", "Size"),
    FieldDef::new("unit", "Unit"),
    FieldDef::new("cost", "Cost"),
    FieldDef::new("comment", "Comment"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    // ===== 主键 =====
    pub number: Option<i64>, // Ingr#（None 表示待分配）

    // ===== 基础信息 =====
    pub name: String,
    pub vendor_info: String,

    // ===== 包装规格 =====
    pub size: f64,    // 包装数量
    pub unit: String, // 单位符号（见 unit::UNITS）
    pub cost: f64,    // 单包成本

    pub comment: String,
}

impl Entity for Ingredient {
    const TABLE: &'static str = "ingredient";
    const MODEL_NAME: &'static str = "Ingredient";

    fn fields() -> &'static [FieldDef] {
        FIELDS
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::from_opt_i64(self.number),
            FieldValue::text(&self.name),
            FieldValue::text(&self.vendor_info),
            FieldValue::Real(self.size),
            FieldValue::text(&self.unit),
            FieldValue::Real(self.cost),
            FieldValue::text(&self.comment),
        ]
    }

    fn from_values(values: &[FieldValue]) -> Result<Self, FieldDecodeError> {
        let reader = ValueReader::new(Self::MODEL_NAME, FIELDS, values);
        Ok(Self {
            number: reader.opt_i64("number")?,
            name: reader.text("name")?,
            vendor_info: reader.text("vendor_info")?,
            size: reader.f64("size")?,
            unit: reader.text("unit")?,
            cost: reader.f64("cost")?,
            comment: reader.text("comment")?,
        })
    }

    fn set_primary_key(&mut self, value: FieldValue) {
        self.number = value.as_i64();
    }

    fn describe(&self) -> String {
        match self.number {
            Some(number) => format!("Ingredient #{} ({})", number, self.name),
            None => format!("Ingredient <待分配> ({})", self.name),
        }
    }
}
