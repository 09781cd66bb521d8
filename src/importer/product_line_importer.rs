// ==========================================
// 配方主数据批量导入 - 产品线导入
// ==========================================
// 表头: Name
// 说明: 名称即主键，已存在即视为相同（无其他字段可冲突）
// ==========================================

use crate::domain::product_line::ProductLine;
use crate::domain::types::FileType;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::RowReader;
use crate::importer::importer_trait::RowConverter;
use crate::repository::entity_repo::EntityRepository;

#[derive(Debug, Default)]
pub struct ProductLineConverter;

impl RowConverter for ProductLineConverter {
    type Entity = ProductLine;
    type Extra = ();

    const FILE_TYPE: FileType = FileType::ProductLines;

    fn convert(
        &mut self,
        _repo: &EntityRepository<'_>,
        row: &RowReader<'_>,
    ) -> ImportResult<Option<(ProductLine, ())>> {
        Ok(Some((ProductLine::new(row.required_string("Name")?), ())))
    }
}
