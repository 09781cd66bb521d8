// ==========================================
// 配方主数据批量导入 - 配方导入
// ==========================================
// 表头: Formula#,Name,Ingr#,Quantity,Comment
// 规则:
// - 每行一个 (配方, 原料)；同名配方的后续行并入首行，编号不一致报错
// - 原料必须存在；数量单位须与原料单位同类
// - 配方原料关联按配方整组替换（先删后插），文件未提及的配方不受影响
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::formula::{Formula, FormulaIngredient};
use crate::domain::ingredient::Ingredient;
use crate::domain::types::{FieldValue, FileType};
use crate::domain::unit::{find_unit, parse_quantity};
use crate::importer::duplicate_detector::DuplicateDetector;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::RowReader;
use crate::importer::importer_trait::RowConverter;
use crate::repository::entity_repo::EntityRepository;
use std::collections::HashMap;
use tracing::debug;

/// 待写入的配方原料（配方编号在 post_process 时按名称解析）
#[derive(Debug, Clone, PartialEq)]
struct PendingLink {
    formula_name: String,
    ingredient: i64,
    quantity: f64,
    unit: String,
}

#[derive(Debug, Default)]
pub struct FormulaConverter {
    /// 配方名称 → (首次出现行号, 首行编号)
    first_seen: HashMap<String, (usize, Option<i64>)>,
    links: Vec<PendingLink>,
    link_detector: DuplicateDetector,
}

impl FormulaConverter {
    fn convert_link(
        &mut self,
        repo: &EntityRepository<'_>,
        row: &RowReader<'_>,
        formula_name: &str,
    ) -> ImportResult<()> {
        let ingredient_number = row.required_i64("Ingr#")?;
        let ingredient = repo
            .find_by_primary_key::<Ingredient>(&FieldValue::Integer(ingredient_number))?
            .ok_or_else(|| row.integrity("Ingredient", "Ingr#", ingredient_number.to_string()))?;

        let (quantity, unit) = parse_quantity(row.cell("Quantity"))
            .map_err(|e| row.validation("Quantity", e.to_string()))?;
        if quantity <= 0.0 {
            return Err(row.validation("Quantity", "数量必须为正数"));
        }
        let compatible = find_unit(&ingredient.unit)
            .map(|u| u.unit_type == unit.unit_type)
            .unwrap_or(false);
        if !compatible {
            return Err(row.validation(
                "Quantity",
                format!(
                    "单位 '{}' 与原料 '{}' 使用的单位 '{}' 不兼容",
                    unit.symbol, ingredient.name, ingredient.unit
                ),
            ));
        }

        if let Some(hit) = self.link_detector.check_key(
            &["formula", "ingredient"],
            &["Name", "Ingr#"],
            &[
                FieldValue::text(formula_name),
                FieldValue::Integer(ingredient_number),
            ],
            row.line_num(),
        ) {
            return Err(ImportError::Duplicate {
                filename: row.filename().to_string(),
                first_line: hit.first_line,
                line_num: row.line_num(),
                fields: hit.fields,
                values: hit.values,
            });
        }

        self.links.push(PendingLink {
            formula_name: formula_name.to_string(),
            ingredient: ingredient_number,
            quantity,
            unit: unit.symbol.to_string(),
        });
        Ok(())
    }
}

impl RowConverter for FormulaConverter {
    type Entity = Formula;
    type Extra = ();

    const FILE_TYPE: FileType = FileType::Formulas;

    fn convert(
        &mut self,
        repo: &EntityRepository<'_>,
        row: &RowReader<'_>,
    ) -> ImportResult<Option<(Formula, ())>> {
        let name = row.required_string("Name")?;
        let number = row.parse_i64("Formula#")?;

        // 同名配方的后续行: 只贡献原料
        if let Some((first_line, first_number)) = self.first_seen.get(&name).copied() {
            if number.is_some() && number != first_number {
                return Err(row.validation(
                    "Formula#",
                    format!(
                        "配方名称 '{}' 与编号不一致，应与第 {} 行的记录一致",
                        name, first_line
                    ),
                ));
            }
            self.convert_link(repo, row, &name)?;
            return Ok(None);
        }

        self.convert_link(repo, row, &name)?;
        self.first_seen.insert(name.clone(), (row.line_num(), number));

        Ok(Some((
            Formula {
                number,
                name,
                comment: row.cell("Comment").to_string(),
            },
            (),
        )))
    }

    /// 按配方整组替换原料关联
    fn post_process(&mut self, repo: &EntityRepository<'_>) -> ImportResult<()> {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&PendingLink>> = HashMap::new();
        for link in &self.links {
            let group = groups.entry(link.formula_name.as_str()).or_insert_with(|| {
                order.push(link.formula_name.as_str());
                Vec::new()
            });
            group.push(link);
        }

        for name in order {
            let formula = repo
                .find_one_by_field::<Formula>("name", &FieldValue::text(name))?
                .ok_or_else(|| anyhow::anyhow!("配方 '{}' 未落库，无法写入原料关联", name))?;
            let number = formula
                .number
                .ok_or_else(|| anyhow::anyhow!("配方 '{}' 缺少编号", name))?;

            let removed = repo.delete_where::<FormulaIngredient>(&[(
                "formula",
                FieldValue::Integer(number),
            )])?;
            let children: Vec<FormulaIngredient> = groups
                .get(name)
                .map(|links| {
                    links
                        .iter()
                        .map(|link| FormulaIngredient {
                            formula: number,
                            ingredient: link.ingredient,
                            quantity: link.quantity,
                            unit: link.unit.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            let inserted = repo.bulk_insert(&children)?;
            debug!(
                formula = %formula.describe(),
                removed,
                inserted,
                "配方原料关联已替换"
            );
        }
        Ok(())
    }
}
