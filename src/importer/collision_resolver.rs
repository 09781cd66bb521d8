// ==========================================
// 配方主数据批量导入 - 冲突判定
// ==========================================
// 职责: 新记录 vs 已持久化记录 → 新增 / 相同 / 冲突 / 歧义
// 规则:
// 1. 逐个非主键唯一字段组查找现有记录，得到候选；不同候选 > 1 即歧义
// 2. 主键有值时按主键查找（值 0 视为有值）
// 3. 唯一候选 + 主键无匹配: 主键待分配时采纳候选，否则歧义
// 4. 唯一候选 + 主键匹配不同行: 歧义
// 5. 有匹配时比较非主键字段: 全等为相同，否则冲突
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::types::FieldValue;
use crate::repository::entity_repo::EntityRepository;
use crate::repository::error::RepositoryResult;
use tracing::debug;

/// 判定结果
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<E> {
    /// 无任何匹配
    New,
    /// 与现有记录完全一致（返回现有记录）
    Identical(E),
    /// 与现有记录字段不一致（返回现有记录）
    Collision(E),
    /// 多条现有记录分别认领该行（字段显示名, 记录描述）
    Ambiguous(Vec<(String, String)>),
}

pub struct CollisionResolver;

impl CollisionResolver {
    /// 两个已持久化实体是否为同一行
    fn same_row<E: Entity>(a: &E, b: &E) -> bool {
        match E::primary_key_field() {
            Some(_) => a.primary_key_value() == b.primary_key_value(),
            None => a.values() == b.values(),
        }
    }

    pub fn resolve<E: Entity>(
        repo: &EntityRepository<'_>,
        transient: &E,
    ) -> RepositoryResult<Resolution<E>> {
        let pk_field = E::primary_key_field();

        // ===== 1. 非主键唯一字段候选 =====
        let mut candidates: Vec<(String, E)> = Vec::new();
        for set in E::unique_sets() {
            let skip = set.iter().any(|name| {
                E::field(name)
                    .map(|def| def.primary_key || def.auto_assign)
                    .unwrap_or(false)
            });
            if skip {
                continue;
            }

            let criteria: Vec<(&str, FieldValue)> = set
                .iter()
                .map(|name| (*name, transient.value_of(name)))
                .collect();
            if criteria.iter().any(|(_, v)| v.is_null()) {
                continue;
            }

            let Some(existing) = repo.find_by_fields::<E>(&criteria)?.into_iter().next() else {
                continue;
            };
            if candidates.iter().any(|(_, c)| Self::same_row(c, &existing)) {
                continue;
            }

            let display = set
                .iter()
                .map(|name| E::field(name).map(|d| d.verbose_name).unwrap_or(*name))
                .collect::<Vec<_>>()
                .join(", ");
            candidates.push((display, existing));

            if candidates.len() > 1 {
                return Ok(Resolution::Ambiguous(
                    candidates
                        .iter()
                        .map(|(field, c)| (field.clone(), c.describe()))
                        .collect(),
                ));
            }
        }

        // ===== 2. 主键匹配 =====
        let key = transient.primary_key_value();
        let primary_match = match pk_field {
            Some(_) if !key.is_null() => repo.find_by_primary_key::<E>(&key)?,
            _ => None,
        };

        // ===== 3/4. 候选与主键匹配对账 =====
        let matched = match (candidates.pop(), primary_match) {
            (None, None) => return Ok(Resolution::New),
            (None, Some(primary)) => primary,
            (Some((_, candidate)), None) => {
                let assignable = pk_field.map(|pk| pk.auto_assign).unwrap_or(false) && key.is_null();
                if !assignable {
                    let pk_name = pk_field.map(|pk| pk.verbose_name).unwrap_or("主键");
                    return Ok(Resolution::Ambiguous(vec![
                        (
                            candidate_field(&candidate, transient),
                            candidate.describe(),
                        ),
                        (pk_name.to_string(), format!("{} {} 不存在", E::MODEL_NAME, key)),
                    ]));
                }
                debug!(model = E::MODEL_NAME, existing = %candidate.describe(), "主键待分配，采纳唯一字段匹配");
                candidate
            }
            (Some((field, candidate)), Some(primary)) => {
                if !Self::same_row(&candidate, &primary) {
                    let pk_name = pk_field.map(|pk| pk.verbose_name).unwrap_or("主键");
                    return Ok(Resolution::Ambiguous(vec![
                        (field, candidate.describe()),
                        (pk_name.to_string(), primary.describe()),
                    ]));
                }
                primary
            }
        };

        // ===== 5. 值比较 =====
        if transient.same_values(&matched) {
            Ok(Resolution::Identical(matched))
        } else {
            Ok(Resolution::Collision(matched))
        }
    }
}

/// 候选命中的字段显示名（用于歧义说明）
fn candidate_field<E: Entity>(candidate: &E, transient: &E) -> String {
    E::fields()
        .iter()
        .filter(|def| def.unique && !def.primary_key)
        .find(|def| candidate.value_of(def.name) == transient.value_of(def.name))
        .map(|def| def.verbose_name.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Ingredient, ProductLine};
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn
    }

    fn ingredient(number: Option<i64>, name: &str, cost: f64) -> Ingredient {
        Ingredient {
            number,
            name: name.to_string(),
            vendor_info: "Acme".to_string(),
            size: 10.0,
            unit: "lb.".to_string(),
            cost,
            comment: String::new(),
        }
    }

    #[test]
    fn test_new_identical_collision() {
        let conn = setup();
        let repo = EntityRepository::new(&conn);
        repo.insert(&ingredient(Some(1), "Salt", 2.0)).unwrap();

        assert_eq!(
            CollisionResolver::resolve(&repo, &ingredient(Some(2), "Pepper", 2.0)).unwrap(),
            Resolution::New
        );
        assert!(matches!(
            CollisionResolver::resolve(&repo, &ingredient(Some(1), "Salt", 2.0)).unwrap(),
            Resolution::Identical(_)
        ));
        assert!(matches!(
            CollisionResolver::resolve(&repo, &ingredient(Some(1), "Salt", 3.0)).unwrap(),
            Resolution::Collision(_)
        ));
        // 主键一致、名称改变
        assert!(matches!(
            CollisionResolver::resolve(&repo, &ingredient(Some(1), "Sea Salt", 2.0)).unwrap(),
            Resolution::Collision(_)
        ));
    }

    #[test]
    fn test_blank_key_adopts_secondary_match() {
        let conn = setup();
        let repo = EntityRepository::new(&conn);
        repo.insert(&ingredient(Some(1), "Salt", 2.0)).unwrap();

        match CollisionResolver::resolve(&repo, &ingredient(None, "Salt", 2.0)).unwrap() {
            Resolution::Identical(existing) => assert_eq!(existing.number, Some(1)),
            other => panic!("unexpected: {:?}", other),
        }
        match CollisionResolver::resolve(&repo, &ingredient(None, "Salt", 5.0)).unwrap() {
            Resolution::Collision(existing) => assert_eq!(existing.number, Some(1)),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_explicit_unknown_key_with_secondary_match_is_ambiguous() {
        let conn = setup();
        let repo = EntityRepository::new(&conn);
        repo.insert(&ingredient(Some(1), "Salt", 2.0)).unwrap();

        for key in [0, 2] {
            match CollisionResolver::resolve(&repo, &ingredient(Some(key), "Salt", 2.0)).unwrap() {
                Resolution::Ambiguous(candidates) => {
                    assert_eq!(candidates.len(), 2);
                    assert_eq!(candidates[0].0, "Name");
                }
                other => panic!("unexpected for key {}: {:?}", key, other),
            }
        }
    }

    #[test]
    fn test_primary_and_secondary_point_to_different_rows() {
        let conn = setup();
        let repo = EntityRepository::new(&conn);
        repo.insert(&ingredient(Some(1), "Salt", 2.0)).unwrap();
        repo.insert(&ingredient(Some(2), "Pepper", 2.0)).unwrap();

        match CollisionResolver::resolve(&repo, &ingredient(Some(2), "Salt", 2.0)).unwrap() {
            Resolution::Ambiguous(candidates) => {
                let described: Vec<&str> = candidates.iter().map(|(_, d)| d.as_str()).collect();
                assert!(described[0].contains("Salt"));
                assert!(described[1].contains("Pepper"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_name_keyed_entity() {
        let conn = setup();
        let repo = EntityRepository::new(&conn);
        repo.insert(&ProductLine::new("Soups")).unwrap();

        assert!(matches!(
            CollisionResolver::resolve(&repo, &ProductLine::new("Soups")).unwrap(),
            Resolution::Identical(_)
        ));
        assert_eq!(
            CollisionResolver::resolve(&repo, &ProductLine::new("Breads")).unwrap(),
            Resolution::New
        );
    }
}
