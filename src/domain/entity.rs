// ==========================================
// 配方主数据批量导入 - 实体 Schema Trait
// ==========================================
// 职责: 以静态描述符声明每种实体的字段、主键、唯一约束
// 红线: 不含数据访问逻辑（SQL 由仓储层根据描述符生成）
// ==========================================

use crate::domain::types::{FieldDecodeError, FieldDef, FieldValue};
use std::fmt;

/// 可持久化实体
///
/// `values()` 与 `fields()` 一一对应，顺序一致。
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// 表名
    const TABLE: &'static str;

    /// 面向用户的模型名称
    const MODEL_NAME: &'static str;

    /// 有序字段列表
    fn fields() -> &'static [FieldDef];

    /// 联合唯一约束（单字段唯一在 FieldDef 中声明）
    fn unique_together() -> &'static [&'static [&'static str]] {
        &[]
    }

    /// 按 `fields()` 顺序输出字段值
    fn values(&self) -> Vec<FieldValue>;

    /// 按 `fields()` 顺序从字段值重建实体
    fn from_values(values: &[FieldValue]) -> Result<Self, FieldDecodeError>;

    /// 写入主键（自动分配或强制覆盖时使用）
    fn set_primary_key(&mut self, value: FieldValue);

    // ===== 以下为基于描述符的默认实现 =====

    fn primary_key_field() -> Option<&'static FieldDef> {
        Self::fields().iter().find(|f| f.primary_key)
    }

    fn field(name: &str) -> Option<&'static FieldDef> {
        Self::fields().iter().find(|f| f.name == name)
    }

    /// 所有唯一字段组：单字段唯一（含主键）+ 联合唯一
    fn unique_sets() -> Vec<Vec<&'static str>> {
        let mut sets: Vec<Vec<&'static str>> = Self::fields()
            .iter()
            .filter(|f| f.unique)
            .map(|f| vec![f.name])
            .collect();
        sets.extend(Self::unique_together().iter().map(|set| set.to_vec()));
        sets
    }

    fn value_of(&self, field: &str) -> FieldValue {
        Self::fields()
            .iter()
            .position(|f| f.name == field)
            .and_then(|idx| self.values().into_iter().nth(idx))
            .unwrap_or(FieldValue::Null)
    }

    fn primary_key_value(&self) -> FieldValue {
        Self::primary_key_field()
            .map(|pk| self.value_of(pk.name))
            .unwrap_or(FieldValue::Null)
    }

    /// 比较除主键外的所有字段
    fn same_values(&self, other: &Self) -> bool {
        Self::fields()
            .iter()
            .zip(self.values().iter().zip(other.values().iter()))
            .filter(|(def, _)| !def.primary_key)
            .all(|(_, (a, b))| a == b)
    }

    /// 非主键字段差异: (字段显示名, 旧值, 新值)
    fn differences(&self, other: &Self) -> Vec<(String, String, String)> {
        Self::fields()
            .iter()
            .zip(self.values().into_iter().zip(other.values()))
            .filter(|(def, (a, b))| !def.primary_key && a != b)
            .map(|(def, (a, b))| (def.verbose_name.to_string(), a.to_string(), b.to_string()))
            .collect()
    }

    /// 简短描述，用于歧义/冲突提示
    fn describe(&self) -> String {
        let key = self.primary_key_value();
        if key.is_null() {
            format!("{} <待分配>", Self::MODEL_NAME)
        } else {
            format!("{} #{}", Self::MODEL_NAME, key)
        }
    }
}
