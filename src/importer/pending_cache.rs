// ==========================================
// 配方主数据批量导入 - 待确认事务缓存
// ==========================================
// 职责: 按会话键暂存发生冲突的批次（各文件导入器），等待强制提交或放弃
// 规则:
// - 条目自插入起 ttl 后过期（默认 1800 秒），每次操作时惰性清理
// - 容量满时淘汰最早插入的条目
// - take 为原子取出：并发强制提交时至多一个调用方拿到批次
// 并发: 单把 Mutex 保护内部结构，各会话条目互相独立
// ==========================================

use crate::domain::types::FileType;
use crate::importer::importer_trait::{CollisionRecord, ImportCounts, Importer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

// ==========================================
// PendingBatch - 暂存批次
// ==========================================
#[derive(Debug)]
pub struct PendingBatch {
    pub batch_id: String,
    pub session_key: String,
    pub created_at: DateTime<Utc>,
    /// 按拓扑顺序排列；文件名唯一
    importers: Vec<Box<dyn Importer>>,
}

impl PendingBatch {
    pub fn new(session_key: &str, importers: Vec<Box<dyn Importer>>) -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            session_key: session_key.to_string(),
            created_at: Utc::now(),
            importers,
        }
    }

    pub fn into_importers(self) -> Vec<Box<dyn Importer>> {
        self.importers
    }

    pub fn summary(&self) -> PendingBatchSummary {
        PendingBatchSummary {
            batch_id: self.batch_id.clone(),
            session_key: self.session_key.clone(),
            created_at: self.created_at.to_rfc3339(),
            files: self
                .importers
                .iter()
                .map(|i| PendingFileSummary {
                    filename: i.filename().to_string(),
                    file_type: i.file_type(),
                    counts: i.counts(),
                    collisions: i.collisions(),
                })
                .collect(),
        }
    }
}

/// 暂存文件概要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingFileSummary {
    pub filename: String,
    pub file_type: FileType,
    pub counts: ImportCounts,
    pub collisions: Vec<CollisionRecord>,
}

/// 暂存批次概要（“是否覆盖现有记录”确认页使用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBatchSummary {
    pub batch_id: String,
    pub session_key: String,
    pub created_at: String,
    pub files: Vec<PendingFileSummary>,
}

impl PendingBatchSummary {
    pub fn total_collisions(&self) -> usize {
        self.files.iter().map(|f| f.collisions.len()).sum()
    }
}

// ==========================================
// TransactionCache Trait
// ==========================================
// 用途: 由宿主应用创建并注入批次编排器
// 实现者: TtlTransactionCache
pub trait TransactionCache: Send + Sync {
    /// 写入（覆盖同键旧条目）
    fn put(&self, session_key: &str, batch: PendingBatch);

    /// 原子取出并删除
    fn take(&self, session_key: &str) -> Option<PendingBatch>;

    fn contains(&self, session_key: &str) -> bool;

    /// 删除，返回是否存在
    fn delete(&self, session_key: &str) -> bool;

    fn summary(&self, session_key: &str) -> Option<PendingBatchSummary>;

    /// 清理过期条目，返回清理数量
    fn sweep_expired(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ==========================================
// TtlTransactionCache - 定长 + 过期缓存
// ==========================================
#[derive(Debug)]
struct CacheEntry {
    inserted_at: Instant,
    seq: u64,
    batch: PendingBatch,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
}

#[derive(Debug)]
pub struct TtlTransactionCache {
    ttl: Duration,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl TtlTransactionCache {
    pub const DEFAULT_TTL_SECS: u64 = 1800;
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 锁中毒时沿用内部数据
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn sweep_locked(&self, state: &mut CacheState) -> usize {
        let ttl = self.ttl;
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        let swept = before - state.entries.len();
        if swept > 0 {
            debug!(swept, "清理过期的待确认事务");
        }
        swept
    }
}

impl Default for TtlTransactionCache {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(Self::DEFAULT_TTL_SECS),
            Self::DEFAULT_CAPACITY,
        )
    }
}

impl TransactionCache for TtlTransactionCache {
    fn put(&self, session_key: &str, batch: PendingBatch) {
        let mut state = self.lock();
        self.sweep_locked(&mut state);
        state.entries.remove(session_key);

        while state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    info!(session_key = %key, "缓存已满，淘汰最早的待确认事务");
                    state.entries.remove(&key);
                }
                None => break,
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            session_key.to_string(),
            CacheEntry {
                inserted_at: Instant::now(),
                seq,
                batch,
            },
        );
    }

    fn take(&self, session_key: &str) -> Option<PendingBatch> {
        let mut state = self.lock();
        self.sweep_locked(&mut state);
        state.entries.remove(session_key).map(|entry| entry.batch)
    }

    fn contains(&self, session_key: &str) -> bool {
        let mut state = self.lock();
        self.sweep_locked(&mut state);
        state.entries.contains_key(session_key)
    }

    fn delete(&self, session_key: &str) -> bool {
        let mut state = self.lock();
        self.sweep_locked(&mut state);
        state.entries.remove(session_key).is_some()
    }

    fn summary(&self, session_key: &str) -> Option<PendingBatchSummary> {
        let mut state = self.lock();
        self.sweep_locked(&mut state);
        state.entries.get(session_key).map(|entry| entry.batch.summary())
    }

    fn sweep_expired(&self) -> usize {
        let mut state = self.lock();
        self.sweep_locked(&mut state)
    }

    fn len(&self) -> usize {
        let mut state = self.lock();
        self.sweep_locked(&mut state);
        state.entries.len()
    }
}
