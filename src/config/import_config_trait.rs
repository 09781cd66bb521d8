// ==========================================
// 配方主数据批量导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;

/// 导入配置快照（启动时读取一次）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub pending_ttl_secs: u64,
    pub pending_capacity: usize,
    pub formula_default_scale: f64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: 1800,
            pending_capacity: 10,
            formula_default_scale: 1.0,
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait ImportConfigReader: Send + Sync {
    /// 待确认事务的过期时间（秒）
    ///
    /// # 默认值
    /// - 1800
    fn get_pending_ttl_secs(&self) -> Result<u64, Box<dyn Error>>;

    /// 同时暂存的批次上限
    ///
    /// # 默认值
    /// - 10
    fn get_pending_capacity(&self) -> Result<usize, Box<dyn Error>>;

    /// SKU 文件 Formula factor 为空时的默认值
    ///
    /// # 默认值
    /// - 1.0
    fn get_formula_default_scale(&self) -> Result<f64, Box<dyn Error>>;

    /// 读取全部导入配置
    fn load_import_config(&self) -> Result<ImportConfig, Box<dyn Error>> {
        Ok(ImportConfig {
            pending_ttl_secs: self.get_pending_ttl_secs()?,
            pending_capacity: self.get_pending_capacity()?,
            formula_default_scale: self.get_formula_default_scale()?,
        })
    }
}
