// ==========================================
// 配方主数据批量导入 - CSV 导出
// ==========================================
// 职责: 将一种实体的当前数据按导入表头格式写出（可直接重新导入）
// 说明: 配方按原料关联逐行展开，无原料的配方不导出
// ==========================================

use crate::domain::formula::{Formula, FormulaIngredient};
use crate::domain::ingredient::Ingredient;
use crate::domain::manufacturing_line::SkuManufacturingLine;
use crate::domain::product_line::ProductLine;
use crate::domain::sku::Sku;
use crate::domain::types::FileType;
use crate::domain::unit::format_quantity;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::registry;
use crate::repository::entity_repo::EntityRepository;
use csv::Writer;
use rusqlite::Connection;
use std::collections::BTreeMap;
use tracing::info;

fn opt_number(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// 导出指定类型的全部记录
///
/// # 返回
/// - Ok(Vec<u8>): UTF-8 CSV（含表头）
pub fn export(conn: &Connection, file_type: FileType) -> ImportResult<Vec<u8>> {
    let repo = EntityRepository::new(conn);
    let filename = format!("{}.csv", file_type);
    let csv_error = |e: csv::Error| ImportError::Csv {
        filename: filename.clone(),
        message: e.to_string(),
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    match file_type {
        FileType::ProductLines => {
            for pl in repo.list_all::<ProductLine>()? {
                rows.push(vec![pl.name]);
            }
        }
        FileType::Ingredients => {
            for i in repo.list_all::<Ingredient>()? {
                rows.push(vec![
                    opt_number(i.number),
                    i.name,
                    i.vendor_info,
                    format_quantity(i.size, &i.unit),
                    i.cost.to_string(),
                    i.comment,
                ]);
            }
        }
        FileType::Formulas => {
            let mut links: BTreeMap<i64, Vec<FormulaIngredient>> = BTreeMap::new();
            for link in repo.list_all::<FormulaIngredient>()? {
                links.entry(link.formula).or_default().push(link);
            }
            for formula in repo.list_all::<Formula>()? {
                let Some(children) = formula.number.and_then(|n| links.get(&n)) else {
                    continue;
                };
                for link in children {
                    rows.push(vec![
                        opt_number(formula.number),
                        formula.name.clone(),
                        link.ingredient.to_string(),
                        format_quantity(link.quantity, &link.unit),
                        formula.comment.clone(),
                    ]);
                }
            }
        }
        FileType::Skus => {
            let mut lines: BTreeMap<i64, Vec<String>> = BTreeMap::new();
            for link in repo.list_all::<SkuManufacturingLine>()? {
                lines.entry(link.sku).or_default().push(link.line);
            }
            for sku in repo.list_all::<Sku>()? {
                let shortnames = sku
                    .number
                    .and_then(|n| lines.get(&n))
                    .map(|l| l.join(", "))
                    .unwrap_or_default();
                rows.push(vec![
                    opt_number(sku.number),
                    sku.name,
                    sku.case_upc,
                    sku.unit_upc,
                    sku.unit_size,
                    sku.count.to_string(),
                    sku.product_line,
                    sku.formula.to_string(),
                    sku.formula_scale.to_string(),
                    shortnames,
                    sku.manufacturing_rate.to_string(),
                    sku.comment,
                ]);
            }
        }
    }

    let mut writer = Writer::from_writer(Vec::new());
    writer
        .write_record(registry::registration(file_type).header)
        .map_err(csv_error)?;
    for row in &rows {
        writer.write_record(row).map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("{}: 写出 CSV 失败: {}", filename, e))?;

    info!(file_type = %file_type, rows = rows.len(), "导出完成");
    Ok(bytes)
}
