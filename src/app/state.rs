// ==========================================
// 配方主数据批量导入 - 应用状态
// ==========================================
// 职责: 启动时装配共享连接、配置、待确认事务缓存与 API 实例
// 说明: 缓存的生命周期与 AppState 一致，由宿主应用持有
// ==========================================

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::ImportApi;
use crate::config::{ConfigManager, ImportConfig, ImportConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::pending_cache::{TransactionCache, TtlTransactionCache};

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生效的导入配置
    pub import_config: ImportConfig,

    /// 配置管理器（与 API 共用连接）
    pub config_manager: Arc<ConfigManager>,

    /// 待确认事务缓存
    pub transaction_cache: Arc<dyn TransactionCache>,

    /// 导入API
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库结构初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建配置管理器: {}", e))?,
        );
        let import_config = config_manager.load_import_config().unwrap_or_else(|e| {
            tracing::warn!("读取导入配置失败，使用默认值: {}", e);
            ImportConfig::default()
        });

        let transaction_cache: Arc<dyn TransactionCache> = Arc::new(TtlTransactionCache::new(
            Duration::from_secs(import_config.pending_ttl_secs),
            import_config.pending_capacity,
        ));

        let import_api = Arc::new(ImportApi::new(
            conn,
            transaction_cache.clone(),
            import_config.clone(),
        ));

        tracing::info!(
            pending_ttl_secs = import_config.pending_ttl_secs,
            pending_capacity = import_config.pending_capacity,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            import_config,
            config_manager,
            transaction_cache,
            import_api,
        })
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 MEALS_IMPORT_DB_PATH（非空时）
/// - 否则: 用户数据目录/meals-bulk-import/meals.db
/// - 无法获取用户数据目录时: ./meals.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("MEALS_IMPORT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./meals.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("meals-bulk-import");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("meals.db");
        }
    }

    path.to_string_lossy().to_string()
}
