// ==========================================
// 配方主数据批量导入 - 批次编排器
// ==========================================
// 职责: 按拓扑顺序（产品线 → 原料 → 配方 → SKU）在单个事务内导入多个文件
// 规则:
// - 任一文件出错: 整批回滚，不暂存
// - 任一文件冲突: 整批回滚，已构建的导入器按顺序暂存到待确认事务缓存
// - 强制提交: 原子取出暂存批次，在单个事务内按顺序重放各导入器的 commit
// ==========================================

use crate::config::ImportConfig;
use crate::domain::types::FileType;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::CsvParser;
use crate::importer::importer_trait::{ImportCounts, ImportOutcome, Importer};
use crate::importer::pending_cache::{PendingBatch, PendingBatchSummary, TransactionCache};
use crate::importer::registry;
use crate::repository::entity_repo::EntityRepository;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 上传文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    fn is_blank(&self) -> bool {
        self.content.iter().all(u8::is_ascii_whitespace)
    }
}

/// 批次导入结果（实体名 → 数量）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub inserted: BTreeMap<String, usize>,
    pub ignored: BTreeMap<String, usize>,
}

/// 强制提交结果（实体名 → 数量）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceSaveSummary {
    pub inserted: BTreeMap<String, usize>,
    pub updated: BTreeMap<String, usize>,
    pub ignored: BTreeMap<String, usize>,
}

impl ForceSaveSummary {
    fn record(&mut self, file_type: FileType, counts: ImportCounts) {
        let name = file_type.entity_name().to_string();
        *self.inserted.entry(name.clone()).or_default() += counts.inserted;
        *self.updated.entry(name.clone()).or_default() += counts.updated;
        *self.ignored.entry(name).or_default() += counts.ignored;
    }

    pub fn total_updated(&self) -> usize {
        self.updated.values().sum()
    }
}

// ==========================================
// BatchImporter - 批次编排器
// ==========================================
pub struct BatchImporter {
    cache: Arc<dyn TransactionCache>,
    config: ImportConfig,
    parser: CsvParser,
}

impl BatchImporter {
    /// # 参数
    /// - cache: 宿主应用持有的待确认事务缓存
    /// - config: 导入配置
    pub fn new(cache: Arc<dyn TransactionCache>, config: ImportConfig) -> Self {
        Self {
            cache,
            config,
            parser: CsvParser,
        }
    }

    pub fn cache(&self) -> &Arc<dyn TransactionCache> {
        &self.cache
    }

    /// 导入一批文件
    ///
    /// # 参数
    /// - conn: 数据库连接（本方法内开启并结束事务）
    /// - files: 文件类型 → 上传文件；缺失类型或空文件跳过
    /// - session_key: 会话键，冲突时以此暂存
    ///
    /// # 返回
    /// - Ok(BatchSummary): 全部提交
    /// - Err(CollisionOccurred): 已回滚并暂存，等待 force_save / clear_transaction
    /// - Err(其他): 已回滚，不暂存
    #[instrument(skip(self, conn, files), fields(session_key = %session_key))]
    pub fn process(
        &self,
        conn: &Connection,
        files: &HashMap<FileType, UploadedFile>,
        session_key: &str,
    ) -> ImportResult<BatchSummary> {
        // 新的导入取代该会话尚未确认的批次
        if self.cache.delete(session_key) {
            info!("已丢弃该会话之前暂存的批次");
        }

        let tx = conn.unchecked_transaction()?;
        let repo = EntityRepository::new(&tx);

        let mut summary = BatchSummary::default();
        let mut built: Vec<Box<dyn Importer>> = Vec::new();
        let present: Vec<FileType> = FileType::TOPOLOGICAL_ORDER
            .into_iter()
            .filter(|ft| files.get(ft).map(|f| !f.is_blank()).unwrap_or(false))
            .collect();

        for (idx, file_type) in present.iter().copied().enumerate() {
            let Some(file) = files.get(&file_type) else {
                continue;
            };
            info!(file_type = %file_type, filename = %file.filename, "开始导入文件");

            let rows = self
                .parser
                .parse(registry::registration(file_type), &file.filename, &file.content)?;
            let mut importer = registry::create_importer(file_type, &file.filename, &self.config);

            match importer.do_import(&repo, &rows)? {
                ImportOutcome::Completed(counts) => {
                    let name = file_type.entity_name().to_string();
                    *summary.inserted.entry(name.clone()).or_default() += counts.inserted;
                    *summary.ignored.entry(name).or_default() += counts.ignored;
                    built.push(importer);
                }
                ImportOutcome::Collided { collisions, .. } => {
                    let skipped_files: Vec<String> = present[idx + 1..]
                        .iter()
                        .filter_map(|ft| files.get(ft).map(|f| f.filename.clone()))
                        .collect();
                    let filename = importer.filename().to_string();
                    built.push(importer);

                    tx.rollback()?;
                    warn!(
                        filename = %filename,
                        collisions = collisions.len(),
                        skipped = ?skipped_files,
                        "检测到冲突，批次已回滚并暂存"
                    );
                    self.cache
                        .put(session_key, PendingBatch::new(session_key, built));

                    return Err(ImportError::CollisionOccurred {
                        filename,
                        collisions: collisions.len(),
                        skipped_files,
                    });
                }
            }
        }

        tx.commit()?;
        info!(
            inserted = ?summary.inserted,
            ignored = ?summary.ignored,
            "批次导入完成"
        );
        Ok(summary)
    }

    /// 处理暂存批次
    ///
    /// # 参数
    /// - force: true 强制提交（冲突行覆盖现有记录）；false 放弃
    ///
    /// # 返回
    /// - Err(NoOngoingTransaction): 会话无暂存批次（已过期、已处理或被并发调用取走）
    ///
    /// 无论成功与否，暂存条目都已被移除。
    #[instrument(skip(self, conn), fields(session_key = %session_key))]
    pub fn force_save(
        &self,
        conn: &Connection,
        session_key: &str,
        force: bool,
    ) -> ImportResult<ForceSaveSummary> {
        let batch = self
            .cache
            .take(session_key)
            .ok_or_else(|| ImportError::NoOngoingTransaction(session_key.to_string()))?;

        if !force {
            info!(batch_id = %batch.batch_id, "用户放弃暂存批次");
            return Ok(ForceSaveSummary::default());
        }

        let tx = conn.unchecked_transaction()?;
        let repo = EntityRepository::new(&tx);
        let mut summary = ForceSaveSummary::default();
        for mut importer in batch.into_importers() {
            let counts = importer.commit(&repo)?;
            summary.record(importer.file_type(), counts);
        }
        tx.commit()?;

        info!(
            inserted = ?summary.inserted,
            updated = ?summary.updated,
            ignored = ?summary.ignored,
            "暂存批次已强制提交"
        );
        Ok(summary)
    }

    pub fn has_ongoing_transaction(&self, session_key: &str) -> bool {
        self.cache.contains(session_key)
    }

    /// 放弃暂存批次，返回是否存在
    pub fn clear_transaction(&self, session_key: &str) -> bool {
        self.cache.delete(session_key)
    }

    pub fn get_transaction(&self, session_key: &str) -> Option<PendingBatchSummary> {
        self.cache.summary(session_key)
    }
}
