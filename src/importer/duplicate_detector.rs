// ==========================================
// 配方主数据批量导入 - 文件内重复检测
// ==========================================
// 职责: 按唯一字段组记录同一文件内已出现的键值，发现重复即报告
// 规则: 键中任一部分为 NULL（待分配主键）时不参与比较
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::types::FieldValue;
use std::collections::HashMap;

/// 一次重复命中
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateHit {
    pub first_line: usize,
    /// 字段显示名（逗号连接）
    pub fields: String,
    /// 冲突的值（逗号连接）
    pub values: String,
}

#[derive(Debug, Default)]
pub struct DuplicateDetector {
    seen: HashMap<Vec<&'static str>, HashMap<Vec<String>, usize>>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 检查并登记一组键值
    ///
    /// # 返回
    /// - None: 首次出现（已登记）
    /// - Some(DuplicateHit): 与更早行重复
    pub fn check_key(
        &mut self,
        fields: &[&'static str],
        display: &[&str],
        key: &[FieldValue],
        line_num: usize,
    ) -> Option<DuplicateHit> {
        if key.iter().any(FieldValue::is_null) {
            return None;
        }
        let values: Vec<String> = key.iter().map(FieldValue::to_string).collect();
        let seen = self.seen.entry(fields.to_vec()).or_default();
        if let Some(first_line) = seen.get(&values) {
            return Some(DuplicateHit {
                first_line: *first_line,
                fields: display.join(", "),
                values: values.join(", "),
            });
        }
        seen.insert(values, line_num);
        None
    }

    /// 按实体声明的全部唯一字段组检查
    ///
    /// 在第一处重复时返回；未重复的组会被登记。
    pub fn check<E: Entity>(&mut self, entity: &E, line_num: usize) -> Option<DuplicateHit> {
        for set in E::unique_sets() {
            let key: Vec<FieldValue> = set.iter().map(|f| entity.value_of(f)).collect();
            let display: Vec<&str> = set
                .iter()
                .map(|f| E::field(f).map(|d| d.verbose_name).unwrap_or(*f))
                .collect();
            if let Some(hit) = self.check_key(&set, &display, &key, line_num) {
                return Some(hit);
            }
        }
        None
    }
}
