// ==========================================
// 配方主数据批量导入 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 提供幂等建表（CREATE TABLE IF NOT EXISTS）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS product_line (
    name TEXT PRIMARY KEY NOT NULL
);

CREATE TABLE IF NOT EXISTS ingredient (
    number INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    vendor_info TEXT NOT NULL DEFAULT '',
    size REAL NOT NULL,
    unit TEXT NOT NULL,
    cost REAL NOT NULL,
    comment TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS formula (
    number INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    comment TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS formula_ingredient (
    formula INTEGER NOT NULL REFERENCES formula(number) ON DELETE CASCADE,
    ingredient INTEGER NOT NULL REFERENCES ingredient(number) ON DELETE CASCADE,
    quantity REAL NOT NULL,
    unit TEXT NOT NULL,
    UNIQUE (formula, ingredient)
);

CREATE TABLE IF NOT EXISTS manufacturing_line (
    shortname TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    comment TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS sku (
    number INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    case_upc TEXT NOT NULL UNIQUE,
    unit_upc TEXT NOT NULL,
    unit_size TEXT NOT NULL,
    count INTEGER NOT NULL,
    product_line TEXT NOT NULL REFERENCES product_line(name),
    formula INTEGER NOT NULL REFERENCES formula(number),
    formula_scale REAL NOT NULL DEFAULT 1.0,
    manufacturing_rate REAL NOT NULL DEFAULT 1.0,
    comment TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS sku_manufacturing_line (
    sku INTEGER NOT NULL REFERENCES sku(number) ON DELETE CASCADE,
    line TEXT NOT NULL REFERENCES manufacturing_line(shortname),
    UNIQUE (sku, line)
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表并登记 schema_version（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO sku (name, case_upc, unit_upc, unit_size, count, product_line, formula)
             VALUES ('x', '036000291452', '036000291452', '1 lb', 1, 'Missing', 1)",
            [],
        );
        assert!(result.is_err());
    }
}
