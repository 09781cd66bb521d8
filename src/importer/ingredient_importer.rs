// ==========================================
// 配方主数据批量导入 - 原料导入
// ==========================================
// 表头: Ingr#,Name,Vendor Info,Size,Cost,Comment
// 规则: Size 为混合单位表达式（"10 lb"），Cost 为正数，Ingr# 可为空
// ==========================================

use crate::domain::ingredient::Ingredient;
use crate::domain::types::FileType;
use crate::domain::unit::parse_quantity;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::RowReader;
use crate::importer::importer_trait::RowConverter;
use crate::repository::entity_repo::EntityRepository;

#[derive(Debug, Default)]
pub struct IngredientConverter;

impl RowConverter for IngredientConverter {
    type Entity = Ingredient;
    type Extra = ();

    const FILE_TYPE: FileType = FileType::Ingredients;

    fn convert(
        &mut self,
        _repo: &EntityRepository<'_>,
        row: &RowReader<'_>,
    ) -> ImportResult<Option<(Ingredient, ())>> {
        let (size, unit) =
            parse_quantity(row.cell("Size")).map_err(|e| row.validation("Size", e.to_string()))?;
        if size <= 0.0 {
            return Err(row.validation("Size", "包装数量必须为正数"));
        }

        let ingredient = Ingredient {
            number: row.parse_i64("Ingr#")?,
            name: row.required_string("Name")?,
            vendor_info: row.cell("Vendor Info").to_string(),
            size,
            unit: unit.symbol.to_string(),
            cost: row.positive_f64("Cost", None)?,
            comment: row.cell("Comment").to_string(),
        };
        Ok(Some((ingredient, ())))
    }
}
