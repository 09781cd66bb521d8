// ==========================================
// 配方主数据批量导入 - 导入API
// ==========================================
// 职责: 在共享连接上封装批次导入、冲突确认与导出
// 调用流程:
// 1. process_files / process_paths
// 2. 返回 CollisionPending 时: get_transaction 展示冲突明细
// 3. force_save(force=true) 覆盖，或 clear_transaction 放弃
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ImportConfig;
use crate::domain::types::FileType;
use crate::importer::batch::{BatchImporter, BatchSummary, ForceSaveSummary, UploadedFile};
use crate::importer::exporter;
use crate::importer::pending_cache::{PendingBatchSummary, TransactionCache};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{info, warn};

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    pub session_key: String,
    /// 实体名 → 新增数量
    pub inserted: BTreeMap<String, usize>,
    /// 实体名 → 与现有记录完全一致而忽略的数量
    pub ignored: BTreeMap<String, usize>,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

/// 冲突确认响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceSaveApiResponse {
    pub session_key: String,
    /// false 表示用户放弃，计数均为空
    pub committed: bool,
    #[serde(flatten)]
    pub summary: ForceSaveSummary,
}

/// 导入API
pub struct ImportApi {
    conn: Arc<Mutex<Connection>>,
    batch: BatchImporter,
}

impl ImportApi {
    /// # 参数
    /// - conn: 进程内共享连接
    /// - cache: 宿主应用创建的待确认事务缓存
    /// - config: 导入配置
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        cache: Arc<dyn TransactionCache>,
        config: ImportConfig,
    ) -> Self {
        Self {
            conn,
            batch: BatchImporter::new(cache, config),
        }
    }

    fn lock_conn(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("锁获取失败: {}", e)))
    }

    /// 导入一批文件
    ///
    /// # 返回
    /// - Ok(ImportApiResponse): 全部提交
    /// - Err(ApiError::CollisionPending): 批次已暂存，等待确认
    /// - Err(其他): 批次已回滚
    pub fn process_files(
        &self,
        files: &HashMap<FileType, UploadedFile>,
        session_key: &str,
    ) -> ApiResult<ImportApiResponse> {
        if session_key.trim().is_empty() {
            return Err(ApiError::InvalidInput("session_key 不能为空".to_string()));
        }

        let started = Instant::now();
        let conn = self.lock_conn()?;
        let BatchSummary { inserted, ignored } = self.batch.process(&conn, files, session_key)?;

        Ok(ImportApiResponse {
            session_key: session_key.to_string(),
            inserted,
            ignored,
            elapsed_ms: started.elapsed().as_millis() as i64,
        })
    }

    /// 从磁盘读取文件并按文件名识别类型后导入
    ///
    /// # 说明
    /// - 无法识别的文件名跳过并告警
    /// - 同一类型出现多个文件视为无效输入
    pub fn process_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        session_key: &str,
    ) -> ApiResult<ImportApiResponse> {
        let mut files: HashMap<FileType, UploadedFile> = HashMap::new();
        for path in paths {
            let path = path.as_ref();
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());

            let Some(file_type) = FileType::detect_from_filename(&filename) else {
                warn!(filename = %filename, "无法识别的文件名，已跳过");
                continue;
            };

            let content = std::fs::read(path).map_err(|e| {
                ApiError::InvalidInput(format!("读取文件 {} 失败: {}", path.display(), e))
            })?;
            if let Some(previous) = files.insert(file_type, UploadedFile::new(&filename, content)) {
                return Err(ApiError::InvalidInput(format!(
                    "文件 {} 与 {} 属于同一类型 {}",
                    previous.filename, filename, file_type
                )));
            }
        }

        if files.is_empty() {
            return Err(ApiError::InvalidInput("没有可导入的文件".to_string()));
        }
        self.process_files(&files, session_key)
    }

    /// 处理暂存批次
    ///
    /// # 参数
    /// - force: true 覆盖现有记录；false 放弃
    pub fn force_save(&self, session_key: &str, force: bool) -> ApiResult<ForceSaveApiResponse> {
        let conn = self.lock_conn()?;
        let summary = self.batch.force_save(&conn, session_key, force)?;
        info!(session_key = %session_key, force, "待确认事务已处理");
        Ok(ForceSaveApiResponse {
            session_key: session_key.to_string(),
            committed: force,
            summary,
        })
    }

    pub fn has_ongoing_transaction(&self, session_key: &str) -> bool {
        self.batch.has_ongoing_transaction(session_key)
    }

    /// 放弃暂存批次，返回是否存在
    pub fn clear_transaction(&self, session_key: &str) -> bool {
        self.batch.clear_transaction(session_key)
    }

    /// 冲突明细（确认页使用）
    pub fn get_transaction(&self, session_key: &str) -> ApiResult<PendingBatchSummary> {
        self.batch
            .get_transaction(session_key)
            .ok_or_else(|| ApiError::NoOngoingTransaction(session_key.to_string()))
    }

    /// 清理过期的暂存批次，返回清理数量
    pub fn sweep_expired(&self) -> usize {
        self.batch.cache().sweep_expired()
    }

    /// 导出一种实体的当前数据（导入表头格式）
    pub fn export(&self, file_type: FileType) -> ApiResult<String> {
        let conn = self.lock_conn()?;
        let bytes = exporter::export(&conn, file_type)?;
        String::from_utf8(bytes)
            .map_err(|e| ApiError::InternalError(format!("导出内容不是 UTF-8: {}", e)))
    }
}
