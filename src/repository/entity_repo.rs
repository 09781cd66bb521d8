// ==========================================
// 配方主数据批量导入 - 通用实体 Repository
// ==========================================
// 职责: 依据 Entity 描述符生成参数化 SQL，完成 CRUD
// 红线: Repository 不含业务规则（冲突判定、唯一性语义在导入层）
// 说明: 借用调用方的 Connection / Transaction，事务边界由调用方控制
// ==========================================

use crate::domain::entity::Entity;
use crate::domain::types::FieldValue;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};

// ==========================================
// FieldValue <-> SQLite 值
// ==========================================
impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::from(rusqlite::types::Null),
            FieldValue::Integer(v) => ToSqlOutput::from(*v),
            FieldValue::Real(v) => ToSqlOutput::from(*v),
            FieldValue::Text(v) => ToSqlOutput::from(v.as_str()),
        })
    }
}

impl FromSql for FieldValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(FieldValue::Null),
            ValueRef::Integer(v) => Ok(FieldValue::Integer(v)),
            ValueRef::Real(v) => Ok(FieldValue::Real(v)),
            ValueRef::Text(_) => value.as_str().map(FieldValue::text),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

// ==========================================
// EntityRepository
// ==========================================
pub struct EntityRepository<'a> {
    conn: &'a Connection,
}

impl<'a> EntityRepository<'a> {
    /// # 参数
    /// - conn: 连接或事务（`Transaction` 可解引用为 `Connection`）
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn column_list<E: Entity>() -> String {
        E::fields()
            .iter()
            .map(|f| f.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn check_field<E: Entity>(field: &str) -> RepositoryResult<&'static str> {
        E::field(field)
            .map(|def| def.name)
            .ok_or_else(|| RepositoryError::UnknownField {
                model: E::MODEL_NAME,
                field: field.to_string(),
            })
    }

    /// 生成 WHERE 子句（`IS` 比较，NULL 安全）
    fn where_clause<E: Entity>(criteria: &[(&str, FieldValue)]) -> RepositoryResult<String> {
        if criteria.is_empty() {
            return Ok("1 = 1".to_string());
        }
        let parts = criteria
            .iter()
            .enumerate()
            .map(|(idx, (field, _))| {
                Self::check_field::<E>(field).map(|name| format!("{} IS ?{}", name, idx + 1))
            })
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(parts.join(" AND "))
    }

    fn decode_row<E: Entity>(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vec<FieldValue>> {
        (0..E::fields().len())
            .map(|idx| row.get::<_, FieldValue>(idx))
            .collect()
    }

    fn query<E: Entity>(&self, sql: &str, params: &[FieldValue]) -> RepositoryResult<Vec<E>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| Self::decode_row::<E>(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.iter()
            .map(|values| E::from_values(values).map_err(RepositoryError::from))
            .collect()
    }

    // ===== 查询 =====

    /// 按多个字段等值查询
    pub fn find_by_fields<E: Entity>(
        &self,
        criteria: &[(&str, FieldValue)],
    ) -> RepositoryResult<Vec<E>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            Self::column_list::<E>(),
            E::TABLE,
            Self::where_clause::<E>(criteria)?
        );
        let params: Vec<FieldValue> = criteria.iter().map(|(_, v)| v.clone()).collect();
        self.query::<E>(&sql, &params)
    }

    /// 按单字段查询第一条
    pub fn find_one_by_field<E: Entity>(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> RepositoryResult<Option<E>> {
        Ok(self
            .find_by_fields::<E>(&[(field, value.clone())])?
            .into_iter()
            .next())
    }

    pub fn find_by_primary_key<E: Entity>(&self, key: &FieldValue) -> RepositoryResult<Option<E>> {
        match E::primary_key_field() {
            Some(pk) => self.find_one_by_field::<E>(pk.name, key),
            None => Ok(None),
        }
    }

    pub fn exists<E: Entity>(&self, criteria: &[(&str, FieldValue)]) -> RepositoryResult<bool> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} LIMIT 1",
            E::TABLE,
            Self::where_clause::<E>(criteria)?
        );
        let params: Vec<FieldValue> = criteria.iter().map(|(_, v)| v.clone()).collect();
        let found = self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |_row| Ok(true))
            .optional()?;
        Ok(found.unwrap_or(false))
    }

    /// 全表读取（按主键排序；无主键时按 rowid）
    pub fn list_all<E: Entity>(&self) -> RepositoryResult<Vec<E>> {
        let order = E::primary_key_field().map(|f| f.name).unwrap_or("rowid");
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            Self::column_list::<E>(),
            E::TABLE,
            order
        );
        self.query::<E>(&sql, &[])
    }

    pub fn count<E: Entity>(&self) -> RepositoryResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", E::TABLE);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ===== 写入 =====

    /// 插入实体；自增主键为空时由 SQLite 分配并回填
    ///
    /// # 返回
    /// - 已持久化的实体（主键已确定）
    pub fn insert<E: Entity>(&self, entity: &E) -> RepositoryResult<E> {
        let placeholders = (1..=E::fields().len())
            .map(|idx| format!("?{}", idx))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            E::TABLE,
            Self::column_list::<E>(),
            placeholders
        );
        let values = entity.values();
        self.conn.execute(&sql, params_from_iter(values.iter()))?;

        let mut saved = entity.clone();
        if let Some(pk) = E::primary_key_field() {
            if pk.auto_assign && entity.primary_key_value().is_null() {
                saved.set_primary_key(FieldValue::Integer(self.conn.last_insert_rowid()));
            }
        }
        Ok(saved)
    }

    /// 批量插入（调用方负责事务）
    pub fn bulk_insert<E: Entity>(&self, entities: &[E]) -> RepositoryResult<usize> {
        for entity in entities {
            self.insert(entity)?;
        }
        Ok(entities.len())
    }

    /// 按主键覆盖所有非主键字段
    pub fn update<E: Entity>(&self, entity: &E) -> RepositoryResult<()> {
        let pk = E::primary_key_field().ok_or_else(|| {
            RepositoryError::InternalError(format!("{} 无主键，不支持按主键更新", E::MODEL_NAME))
        })?;
        let key = entity.primary_key_value();
        if key.is_null() {
            return Err(RepositoryError::InternalError(format!(
                "{} 主键为空，无法更新",
                E::MODEL_NAME
            )));
        }

        let mut params = Vec::new();
        let mut assignments = Vec::new();
        for (def, value) in E::fields().iter().zip(entity.values()) {
            if def.primary_key {
                continue;
            }
            params.push(value);
            assignments.push(format!("{} = ?{}", def.name, params.len()));
        }
        params.push(key.clone());
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            E::TABLE,
            assignments.join(", "),
            pk.name,
            params.len()
        );

        let affected = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: E::MODEL_NAME.to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// 按条件删除，返回删除行数
    pub fn delete_where<E: Entity>(&self, criteria: &[(&str, FieldValue)]) -> RepositoryResult<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            E::TABLE,
            Self::where_clause::<E>(criteria)?
        );
        let params: Vec<FieldValue> = criteria.iter().map(|(_, v)| v.clone()).collect();
        Ok(self.conn.execute(&sql, params_from_iter(params.iter()))?)
    }
}
