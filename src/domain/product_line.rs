// ==========================================
// 配方主数据批量导入 - 产品线
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::types::{FieldDecodeError, FieldDef, FieldValue, ValueReader};
use serde::{Deserialize, Serialize};

const FIELDS: &[FieldDef] = &[FieldDef::new("name", "Name").primary_key()];

/// 产品线（名称即主键）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLine {
    pub name: String,
}

impl ProductLine {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Entity for ProductLine {
    const TABLE: &'static str = "product_line";
    const MODEL_NAME: &'static str = "Product Line";

    fn fields() -> &'static [FieldDef] {
        FIELDS
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![FieldValue::text(&self.name)]
    }

    fn from_values(values: &[FieldValue]) -> Result<Self, FieldDecodeError> {
        let reader = ValueReader::new(Self::MODEL_NAME, FIELDS, values);
        Ok(Self {
            name: reader.text("name")?,
        })
    }

    fn set_primary_key(&mut self, value: FieldValue) {
        if let FieldValue::Text(name) = value {
            self.name = name;
        }
    }

    fn describe(&self) -> String {
        format!("Product Line '{}'", self.name)
    }
}
