// ==========================================
// 配方主数据批量导入 - 产线
// ==========================================
// 说明: 产线不通过批量导入维护，只作为 SKU 的引用目标
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::types::{FieldDecodeError, FieldDef, FieldValue, ValueReader};
use serde::{Deserialize, Serialize};

const FIELDS: &[FieldDef] = &[
    FieldDef::new("shortname", "Shortname").primary_key(),
    FieldDef::new("name", "Name"),
    FieldDef::new("comment", "Comment"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingLine {
    pub shortname: String,
    pub name: String,
    pub comment: String,
}

impl ManufacturingLine {
    pub fn new(shortname: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            shortname: shortname.into(),
            name: name.into(),
            comment: String::new(),
        }
    }
}

impl Entity for ManufacturingLine {
    const TABLE: &'static str = "manufacturing_line";
    const MODEL_NAME: &'static str = "Manufacturing Line";

    fn fields() -> &'static [FieldDef] {
        FIELDS
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::text(&self.shortname),
            FieldValue::text(&self.name),
            FieldValue::text(&self.comment),
        ]
    }

    fn from_values(values: &[FieldValue]) -> Result<Self, FieldDecodeError> {
        let reader = ValueReader::new(Self::MODEL_NAME, FIELDS, values);
        Ok(Self {
            shortname: reader.text("shortname")?,
            name: reader.text("name")?,
            comment: reader.text("comment")?,
        })
    }

    fn set_primary_key(&mut self, value: FieldValue) {
        if let FieldValue::Text(shortname) = value {
            self.shortname = shortname;
        }
    }
}

/// SKU ↔ 产线 多对多关联
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuManufacturingLine {
    pub sku: i64,
    pub line: String,
}

const LINK_FIELDS: &[FieldDef] = &[
    FieldDef::new("sku", "SKU"),
    FieldDef::new("line", "Manufacturing Line"),
];

impl Entity for SkuManufacturingLine {
    const TABLE: &'static str = "sku_manufacturing_line";
    const MODEL_NAME: &'static str = "SKU Manufacturing Line";

    fn fields() -> &'static [FieldDef] {
        LINK_FIELDS
    }

    fn unique_together() -> &'static [&'static [&'static str]] {
        &[&["sku", "line"]]
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![FieldValue::Integer(self.sku), FieldValue::text(&self.line)]
    }

    fn from_values(values: &[FieldValue]) -> Result<Self, FieldDecodeError> {
        let reader = ValueReader::new(Self::MODEL_NAME, LINK_FIELDS, values);
        Ok(Self {
            sku: reader.i64("sku")?,
            line: reader.text("line")?,
        })
    }

    fn set_primary_key(&mut self, _value: FieldValue) {}
}
