// ==========================================
// 配方主数据批量导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)，缺失或无法解析时回退默认值
// ==========================================

use crate::config::import_config_trait::{ImportConfig, ImportConfigReader};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置，缺失或解析失败时使用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy,
    {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(config_key = key, value = %raw, "配置值无法解析，使用默认值");
                    Ok(default)
                }
            },
        }
    }
}

impl ImportConfigReader for ConfigManager {
    fn get_pending_ttl_secs(&self) -> Result<u64, Box<dyn Error>> {
        let value = self.get_parsed_or_default(
            config_keys::PENDING_TTL_SECS,
            ImportConfig::default().pending_ttl_secs,
        )?;
        Ok(value.max(1))
    }

    fn get_pending_capacity(&self) -> Result<usize, Box<dyn Error>> {
        let value = self.get_parsed_or_default(
            config_keys::PENDING_CAPACITY,
            ImportConfig::default().pending_capacity,
        )?;
        Ok(value.max(1))
    }

    fn get_formula_default_scale(&self) -> Result<f64, Box<dyn Error>> {
        let default = ImportConfig::default().formula_default_scale;
        let value = self.get_parsed_or_default(config_keys::FORMULA_DEFAULT_SCALE, default)?;
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            warn!(value, "Formula factor 默认值必须为正数，使用 {}", default);
            Ok(default)
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 待确认事务缓存
    pub const PENDING_TTL_SECS: &str = "import.pending_ttl_secs";
    pub const PENDING_CAPACITY: &str = "import.pending_capacity";

    // SKU 默认值
    pub const FORMULA_DEFAULT_SCALE: &str = "import.formula_default_scale";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_missing() {
        let config = manager().load_import_config().unwrap();
        assert_eq!(config, ImportConfig::default());
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let manager = manager();
        manager
            .set_global_config_value(config_keys::PENDING_TTL_SECS, "60")
            .unwrap();
        manager
            .set_global_config_value(config_keys::PENDING_CAPACITY, "not-a-number")
            .unwrap();
        manager
            .set_global_config_value(config_keys::FORMULA_DEFAULT_SCALE, "-2")
            .unwrap();

        let config = manager.load_import_config().unwrap();
        assert_eq!(config.pending_ttl_secs, 60);
        assert_eq!(config.pending_capacity, 10);
        assert_eq!(config.formula_default_scale, 1.0);
    }
}
