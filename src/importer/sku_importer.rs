// ==========================================
// 配方主数据批量导入 - SKU 导入
// ==========================================
// 表头: SKU#,Name,Case UPC,Unit UPC,Unit size,Count per case,PL Name,
//       Formula#,Formula factor,ML Shortnames,Rate,Comment
// 规则:
// - Case UPC / Unit UPC 必须为合法 UPC-A
// - 产品线、配方、产线必须存在（否则 IntegrityError）
// - Formula factor / Rate 为空取默认值，须为正数
// - 每次保存 SKU 后整组替换其产线关联
// ==========================================

use crate::domain::formula::Formula;
use crate::domain::manufacturing_line::{ManufacturingLine, SkuManufacturingLine};
use crate::domain::product_line::ProductLine;
use crate::domain::sku::Sku;
use crate::domain::types::{FieldValue, FileType};
use crate::domain::upc::is_valid_upc;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::RowReader;
use crate::importer::importer_trait::RowConverter;
use crate::repository::entity_repo::EntityRepository;

/// 产线未填时的默认生产速率
pub const DEFAULT_MANUFACTURING_RATE: f64 = 1.0;

#[derive(Debug)]
pub struct SkuConverter {
    default_scale: f64,
}

impl SkuConverter {
    pub fn new(default_scale: f64) -> Self {
        Self { default_scale }
    }

    fn upc(row: &RowReader<'_>, column: &str) -> ImportResult<String> {
        let raw = row.required_string(column)?;
        if !is_valid_upc(&raw) {
            return Err(row.validation(column, format!("{} 不是有效的 UPC-A 编码", raw)));
        }
        Ok(raw)
    }

    /// 拆分产线简称（逗号分隔，去重保序）
    pub fn split_shortnames(raw: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

impl RowConverter for SkuConverter {
    type Entity = Sku;
    /// 产线简称
    type Extra = Vec<String>;

    const FILE_TYPE: FileType = FileType::Skus;

    fn convert(
        &mut self,
        repo: &EntityRepository<'_>,
        row: &RowReader<'_>,
    ) -> ImportResult<Option<(Sku, Vec<String>)>> {
        let number = row.parse_i64("SKU#")?;

        // ===== 引用: 配方 =====
        let formula = row.required_i64("Formula#")?;
        if !repo.exists::<Formula>(&[("number", FieldValue::Integer(formula))])? {
            return Err(row.integrity("Formula", "Formula#", formula.to_string()));
        }

        let case_upc = Self::upc(row, "Case UPC")?;
        let unit_upc = Self::upc(row, "Unit UPC")?;

        // ===== 引用: 产品线 =====
        let product_line = row.required_string("PL Name")?;
        if !repo.exists::<ProductLine>(&[("name", FieldValue::text(&product_line))])? {
            return Err(row.integrity("Product Line", "PL Name", product_line));
        }

        // ===== 引用: 产线 =====
        let shortnames = Self::split_shortnames(row.cell("ML Shortnames"));
        let mut missing = Vec::new();
        for shortname in &shortnames {
            if !repo.exists::<ManufacturingLine>(&[("shortname", FieldValue::text(shortname))])? {
                missing.push(shortname.as_str());
            }
        }
        if !missing.is_empty() {
            return Err(row.integrity("Manufacturing Line", "ML Shortnames", missing.join(", ")));
        }

        let count = row.required_i64("Count per case")?;
        if count <= 0 {
            return Err(row.validation("Count per case", "必须为正整数"));
        }

        let sku = Sku {
            number,
            name: row.required_string("Name")?,
            case_upc,
            unit_upc,
            unit_size: row.required_string("Unit size")?,
            count,
            product_line,
            formula,
            formula_scale: row.positive_f64("Formula factor", Some(self.default_scale))?,
            manufacturing_rate: row.positive_f64("Rate", Some(DEFAULT_MANUFACTURING_RATE))?,
            comment: row.cell("Comment").to_string(),
        };
        Ok(Some((sku, shortnames)))
    }

    /// 整组替换产线关联
    fn after_save(
        &self,
        repo: &EntityRepository<'_>,
        saved: &Sku,
        shortnames: &Vec<String>,
    ) -> ImportResult<()> {
        let Some(number) = saved.number else {
            return Ok(());
        };
        repo.delete_where::<SkuManufacturingLine>(&[("sku", FieldValue::Integer(number))])?;
        let links: Vec<SkuManufacturingLine> = shortnames
            .iter()
            .map(|line| SkuManufacturingLine {
                sku: number,
                line: line.clone(),
            })
            .collect();
        repo.bulk_insert(&links)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_shortnames_folds_duplicates() {
        assert_eq!(
            SkuConverter::split_shortnames("L1, L2,L1 ,, "),
            vec!["L1".to_string(), "L2".to_string()]
        );
        assert!(SkuConverter::split_shortnames("").is_empty());
    }
}
