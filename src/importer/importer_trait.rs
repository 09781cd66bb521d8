// ==========================================
// 配方主数据批量导入 - 导入器 Trait
// ==========================================
// 职责: 定义单文件导入器与行转换器接口（不包含实现）
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::types::FileType;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::RowReader;
use crate::importer::file_parser::RawRow;
use crate::repository::entity_repo::EntityRepository;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 导入结果
// ==========================================

/// 单文件计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    pub inserted: usize,
    pub updated: usize,
    pub ignored: usize,
}

impl ImportCounts {
    pub fn add(&mut self, other: ImportCounts) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.ignored += other.ignored;
    }
}

/// 单字段差异
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDifference {
    pub field: String,
    pub existing: String,
    pub proposed: String,
}

/// 冲突描述（供“是否覆盖现有记录”确认使用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionRecord {
    pub filename: String,
    pub line_num: usize,
    pub model: String,
    pub existing: String,
    pub proposed: String,
    pub differences: Vec<FieldDifference>,
}

/// 单文件导入结果
///
/// 冲突不是错误：文件内其余行照常处理，结束后以 Collided 返回。
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Completed(ImportCounts),
    Collided {
        counts: ImportCounts,
        collisions: Vec<CollisionRecord>,
    },
}

impl ImportOutcome {
    pub fn counts(&self) -> ImportCounts {
        match self {
            ImportOutcome::Completed(counts) => *counts,
            ImportOutcome::Collided { counts, .. } => *counts,
        }
    }
}

// ==========================================
// Importer Trait
// ==========================================
// 用途: 单文件导入主接口（可暂存到待确认事务缓存）
// 实现者: EntityImporter<C>
pub trait Importer: Send + fmt::Debug {
    fn file_type(&self) -> FileType;

    fn filename(&self) -> &str;

    /// do_import 是否已执行过
    fn is_bound(&self) -> bool;

    /// 导入一个文件的全部数据行
    ///
    /// # 返回
    /// - Ok(Completed): 全部落库（调用方事务内）
    /// - Ok(Collided): 存在冲突，调用方应回滚并暂存本导入器
    /// - Err: 外键缺失 / 文件内重复 / 歧义 / 校验失败，整个文件中止
    fn do_import(
        &mut self,
        repo: &EntityRepository<'_>,
        rows: &[RawRow],
    ) -> ImportResult<ImportOutcome>;

    /// 强制提交已暂存的全部记录（冲突行覆盖现有记录）
    ///
    /// # 返回
    /// - Err(NotBound): 未执行过 do_import
    fn commit(&mut self, repo: &EntityRepository<'_>) -> ImportResult<ImportCounts>;

    fn counts(&self) -> ImportCounts;

    fn collisions(&self) -> Vec<CollisionRecord>;
}

// ==========================================
// RowConverter Trait
// ==========================================
// 用途: 每种实体的行转换（外键解析、类型转换）与保存钩子
// 实现者: ProductLineConverter, IngredientConverter, FormulaConverter, SkuConverter
pub trait RowConverter: Send + fmt::Debug + 'static {
    type Entity: Entity;
    /// 随行携带、不属于实体字段的数据（如 SKU 的产线列表）
    type Extra: Clone + Send + fmt::Debug + 'static;

    const FILE_TYPE: FileType;

    /// 转换一行
    ///
    /// # 返回
    /// - Ok(Some): 待判定的实体
    /// - Ok(None): 本行已并入更早的行（不再单独判定）
    fn convert(
        &mut self,
        repo: &EntityRepository<'_>,
        row: &RowReader<'_>,
    ) -> ImportResult<Option<(Self::Entity, Self::Extra)>>;

    /// 实体新增或覆盖后调用
    fn after_save(
        &self,
        _repo: &EntityRepository<'_>,
        _saved: &Self::Entity,
        _extra: &Self::Extra,
    ) -> ImportResult<()> {
        Ok(())
    }

    /// 文件全部行处理完且无冲突（或强制提交）后调用
    fn post_process(&mut self, _repo: &EntityRepository<'_>) -> ImportResult<()> {
        Ok(())
    }
}
