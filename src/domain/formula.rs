// ==========================================
// 配方主数据批量导入 - 配方与配方原料关联
// ==========================================
// formula:            主键 number（可自动分配），唯一 name
// formula_ingredient: 关联表，(formula, ingredient) 联合唯一
//                     按父配方整组替换，不逐行落库
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::types::{FieldDecodeError, FieldDef, FieldValue, ValueReader};
use serde::{Deserialize, Serialize};

// ==========================================
// Formula - 配方
// ==========================================
const FORMULA_FIELDS: &[FieldDef] = &[
    FieldDef::new("number", "Formula#")
        .primary_key()
        .auto_assign(),
    FieldDef::new("name", "Name").unique(),
    FieldDef::new("comment", "Comment"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub number: Option<i64>,
    pub name: String,
    pub comment: String,
}

impl Entity for Formula {
    const TABLE: &'static str = "formula";
    const MODEL_NAME: &'static str = "Formula";

    fn fields() -> &'static [FieldDef] {
        FORMULA_FIELDS
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::from_opt_i64(self.number),
            FieldValue::text(&self.name),
            FieldValue::text(&self.comment),
        ]
    }

    fn from_values(values: &[FieldValue]) -> Result<Self, FieldDecodeError> {
        let reader = ValueReader::new(Self::MODEL_NAME, FORMULA_FIELDS, values);
        Ok(Self {
            number: reader.opt_i64("number")?,
            name: reader.text("name")?,
            comment: reader.text("comment")?,
        })
    }

    fn set_primary_key(&mut self, value: FieldValue) {
        self.number = value.as_i64();
    }

    fn describe(&self) -> String {
        match self.number {
            Some(number) => format!("Formula #{} ({})", number, self.name),
            None => format!("Formula <待分配> ({})", self.name),
        }
    }
}

// ==========================================
// FormulaIngredient - 配方原料关联
// ==========================================
const LINK_FIELDS: &[FieldDef] = &[
    FieldDef::new("formula", "Formula#"),
    FieldDef::new("ingredient", "Ingr#"),
    FieldDef::new("quantity", "Quantity"),
    FieldDef::new("unit", "Unit"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaIngredient {
    pub formula: i64,
    pub ingredient: i64,
    pub quantity: f64,
    pub unit: String,
}

impl Entity for FormulaIngredient {
    const TABLE: &'static str = "formula_ingredient";
    const MODEL_NAME: &'static str = "Formula Ingredient";

    fn fields() -> &'static [FieldDef] {
        LINK_FIELDS
    }

    fn unique_together() -> &'static [&'static [&'static str]] {
        &[&["formula", "ingredient"]]
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Integer(self.formula),
            FieldValue::Integer(self.ingredient),
            FieldValue::Real(self.quantity),
            FieldValue::text(&self.unit),
        ]
    }

    fn from_values(values: &[FieldValue]) -> Result<Self, FieldDecodeError> {
        let reader = ValueReader::new(Self::MODEL_NAME, LINK_FIELDS, values);
        Ok(Self {
            formula: reader.i64("formula")?,
            ingredient: reader.i64("ingredient")?,
            quantity: reader.f64("quantity")?,
            unit: reader.text("unit")?,
        })
    }

    // 关联表无独立主键
    fn set_primary_key(&mut self, _value: FieldValue) {}
}
