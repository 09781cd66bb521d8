// ==========================================
// 配方主数据批量导入 - 通用实体导入器
// ==========================================
// 职责: 组合 行转换 + 文件内重复检测 + 冲突判定，执行单文件导入循环
// 流程(每行): 转换 → 重复检测 → 判定 → 新增落库 / 忽略 / 冲突暂存
// 说明: 每个导入器只执行一次 do_import；暂存后可由 commit 强制提交
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::types::FileType;
use crate::importer::collision_resolver::{CollisionResolver, Resolution};
use crate::importer::duplicate_detector::DuplicateDetector;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::RowReader;
use crate::importer::file_parser::RawRow;
use crate::importer::importer_trait::{
    CollisionRecord, FieldDifference, ImportCounts, ImportOutcome, Importer, RowConverter,
};
use crate::importer::registry;
use crate::repository::entity_repo::EntityRepository;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, instrument};

/// 已新增的行（保留已分配的主键，供强制提交时重放）
#[derive(Debug)]
struct StagedRow<E, X> {
    entity: E,
    extra: X,
}

/// 冲突行
#[derive(Debug)]
struct StagedCollision<E, X> {
    line_num: usize,
    existing: E,
    proposed: E,
    extra: X,
}

pub struct EntityImporter<C: RowConverter> {
    filename: String,
    converter: C,
    detector: DuplicateDetector,
    instances: Vec<StagedRow<C::Entity, C::Extra>>,
    collisions: Vec<StagedCollision<C::Entity, C::Extra>>,
    ignored: Vec<C::Entity>,
    /// 已被本文件某行认领的现有记录: 主键 → 行号
    claimed: HashMap<String, usize>,
    is_bound: bool,
}

impl<C: RowConverter> EntityImporter<C> {
    pub fn new(filename: &str, converter: C) -> Self {
        let filename = if filename.trim().is_empty() {
            "<unknown file>".to_string()
        } else {
            filename.to_string()
        };
        Self {
            filename,
            converter,
            detector: DuplicateDetector::new(),
            instances: Vec::new(),
            collisions: Vec::new(),
            ignored: Vec::new(),
            claimed: HashMap::new(),
            is_bound: false,
        }
    }

    /// 登记一行对现有记录的认领
    ///
    /// 同一现有记录被两行认领时，两行都无法确定最终值，按歧义处理。
    fn claim(&mut self, existing: &C::Entity, line_num: usize) -> ImportResult<()> {
        let key = existing.primary_key_value().to_string();
        if let Some(first_line) = self.claimed.get(&key) {
            let record = existing.describe();
            return Err(ImportError::AmbiguousRecord {
                filename: self.filename.clone(),
                line_num,
                model: <C::Entity as Entity>::MODEL_NAME.to_string(),
                candidates: vec![
                    format!("第 {} 行 → {}", first_line, record),
                    format!("第 {} 行 → {}", line_num, record),
                ],
            });
        }
        self.claimed.insert(key, line_num);
        Ok(())
    }
}

impl<C: RowConverter> fmt::Debug for EntityImporter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityImporter")
            .field("file_type", &C::FILE_TYPE)
            .field("filename", &self.filename)
            .field("is_bound", &self.is_bound)
            .field("instances", &self.instances.len())
            .field("collisions", &self.collisions.len())
            .field("ignored", &self.ignored.len())
            .finish()
    }
}

impl<C: RowConverter> Importer for EntityImporter<C> {
    fn file_type(&self) -> FileType {
        C::FILE_TYPE
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn is_bound(&self) -> bool {
        self.is_bound
    }

    #[instrument(skip(self, repo, rows), fields(file_type = %C::FILE_TYPE, filename = %self.filename))]
    fn do_import(
        &mut self,
        repo: &EntityRepository<'_>,
        rows: &[RawRow],
    ) -> ImportResult<ImportOutcome> {
        let registration = registry::registration(C::FILE_TYPE);

        for raw in rows {
            let reader = RowReader::new(&self.filename, registration, raw);

            // 1. 转换（外键缺失即中止整个文件）
            let Some((entity, extra)) = self.converter.convert(repo, &reader)? else {
                debug!(line_num = raw.line_num, "行已合并，跳过");
                continue;
            };

            // 2. 文件内重复
            if let Some(hit) = self.detector.check(&entity, raw.line_num) {
                return Err(ImportError::Duplicate {
                    filename: self.filename.clone(),
                    first_line: hit.first_line,
                    line_num: raw.line_num,
                    fields: hit.fields,
                    values: hit.values,
                });
            }

            // 3. 与已持久化数据对账
            match CollisionResolver::resolve(repo, &entity)? {
                Resolution::New => {
                    let saved = repo.insert(&entity)?;
                    // 自动分配的主键也要登记，后续显式引用该键的行按文件内重复处理
                    if entity.primary_key_value().is_null() {
                        if let Some(pk) = <C::Entity as Entity>::primary_key_field() {
                            self.detector.check_key(
                                &[pk.name],
                                &[pk.verbose_name],
                                &[saved.primary_key_value()],
                                raw.line_num,
                            );
                        }
                    }
                    self.converter.after_save(repo, &saved, &extra)?;
                    self.instances.push(StagedRow {
                        entity: saved,
                        extra,
                    });
                }
                Resolution::Identical(existing) => {
                    self.claim(&existing, raw.line_num)?;
                    self.ignored.push(existing);
                }
                Resolution::Collision(existing) => {
                    self.claim(&existing, raw.line_num)?;
                    debug!(line_num = raw.line_num, existing = %existing.describe(), "检测到冲突");
                    self.collisions.push(StagedCollision {
                        line_num: raw.line_num,
                        existing,
                        proposed: entity,
                        extra,
                    });
                }
                Resolution::Ambiguous(candidates) => {
                    return Err(ImportError::AmbiguousRecord {
                        filename: self.filename.clone(),
                        line_num: raw.line_num,
                        model: <C::Entity as Entity>::MODEL_NAME.to_string(),
                        candidates: candidates
                            .into_iter()
                            .map(|(field, record)| format!("{} → {}", field, record))
                            .collect(),
                    });
                }
            }
        }

        self.is_bound = true;
        let counts = self.counts();
        info!(
            inserted = counts.inserted,
            ignored = counts.ignored,
            collisions = self.collisions.len(),
            "文件处理完成"
        );

        if self.collisions.is_empty() {
            self.converter.post_process(repo)?;
            Ok(ImportOutcome::Completed(counts))
        } else {
            Ok(ImportOutcome::Collided {
                counts,
                collisions: self.collisions(),
            })
        }
    }

    #[instrument(skip(self, repo), fields(file_type = %C::FILE_TYPE, filename = %self.filename))]
    fn commit(&mut self, repo: &EntityRepository<'_>) -> ImportResult<ImportCounts> {
        if !self.is_bound {
            return Err(ImportError::NotBound(self.filename.clone()));
        }

        for staged in &self.instances {
            let saved = repo.insert(&staged.entity)?;
            self.converter.after_save(repo, &saved, &staged.extra)?;
        }

        // 冲突行: 保留现有记录的主键，覆盖其余字段
        for collision in &self.collisions {
            let mut proposed = collision.proposed.clone();
            proposed.set_primary_key(collision.existing.primary_key_value());
            repo.update(&proposed)?;
            self.converter.after_save(repo, &proposed, &collision.extra)?;
        }

        self.converter.post_process(repo)?;

        let counts = self.counts();
        info!(
            inserted = counts.inserted,
            updated = counts.updated,
            ignored = counts.ignored,
            "强制提交完成"
        );
        Ok(counts)
    }

    fn counts(&self) -> ImportCounts {
        ImportCounts {
            inserted: self.instances.len(),
            updated: self.collisions.len(),
            ignored: self.ignored.len(),
        }
    }

    fn collisions(&self) -> Vec<CollisionRecord> {
        self.collisions
            .iter()
            .map(|c| CollisionRecord {
                filename: self.filename.clone(),
                line_num: c.line_num,
                model: <C::Entity as Entity>::MODEL_NAME.to_string(),
                existing: c.existing.describe(),
                proposed: c.proposed.describe(),
                differences: c
                    .existing
                    .differences(&c.proposed)
                    .into_iter()
                    .map(|(field, existing, proposed)| FieldDifference {
                        field,
                        existing,
                        proposed,
                    })
                    .collect(),
            })
            .collect()
    }
}
