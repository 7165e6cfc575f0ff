//! Record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and name lookup over the per-variant record tables.
//! - Keep SQL details and row mapping inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Record::validate()` before SQL mutations.
//! - Insert with `id == 0` lets SQLite assign a fresh, never reused id.
//! - Insert with a non-zero id restores that exact id (undo path).
//! - Deleting an absent id is a no-op, not an error.

use crate::db::DbError;
use crate::model::record::{
    Item, ProtectMode, Record, RecordId, RecordValidationError, Stuck, Stueck,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(RecordValidationError),
    Db(DbError),
    NotFound(RecordId),
    DuplicateId(RecordId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::DuplicateId(id) => write!(f, "record id already in use: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::DuplicateId(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Table mapping for a record variant.
///
/// Every table has `id`, `name` and `update_day`; `EXTRA_COLUMNS` lists the
/// variant columns in the order produced by `extra_values`.
pub trait SqlRecord: Record {
    const TABLE: &'static str;
    const EXTRA_COLUMNS: &'static [&'static str];

    fn extra_values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// Repository interface for record CRUD operations.
pub trait RecordRepository<E: Record> {
    /// Persists `record` and returns its id.
    fn insert_record(&self, record: &E) -> RepoResult<RecordId>;
    /// Overwrites every mutable column of an existing record.
    fn update_record(&self, record: &E) -> RepoResult<()>;
    /// Deletes by id. Returns whether a row was removed.
    fn delete_record(&self, id: RecordId) -> RepoResult<bool>;
    fn get_record(&self, id: RecordId) -> RepoResult<Option<E>>;
    /// All records whose name equals `name` exactly.
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<E>>;
    /// All records in id order.
    fn list_records(&self) -> RepoResult<Vec<E>>;
}

/// SQLite-backed record repository for one variant.
pub struct SqliteRecordRepository<'conn, E> {
    conn: &'conn Connection,
    _variant: PhantomData<fn() -> E>,
}

impl<'conn, E: SqlRecord> SqliteRecordRepository<'conn, E> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _variant: PhantomData,
        }
    }

    fn select_sql() -> String {
        format!(
            "SELECT id, name, update_day{} FROM {}",
            E::EXTRA_COLUMNS
                .iter()
                .map(|column| format!(", {column}"))
                .collect::<String>(),
            E::TABLE
        )
    }

    fn query_records(&self, sql: &str, bind: Vec<Value>) -> RepoResult<Vec<E>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(E::from_row(row)?);
        }
        Ok(records)
    }

    fn id_exists(&self, id: RecordId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1;", E::TABLE),
                [id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

impl<E: SqlRecord> RecordRepository<E> for SqliteRecordRepository<'_, E> {
    fn insert_record(&self, record: &E) -> RepoResult<RecordId> {
        record.validate()?;

        let mut columns = vec!["name", "update_day"];
        columns.extend_from_slice(E::EXTRA_COLUMNS);
        let mut values = vec![
            Value::Text(record.name().to_string()),
            Value::Text(record.update_day().to_string()),
        ];
        values.extend(record.extra_values());

        match record.id() {
            0 => {}
            id if id < 0 => {
                return Err(RepoError::InvalidData(format!(
                    "cannot insert negative id `{id}` into {}",
                    E::TABLE
                )));
            }
            id => {
                if self.id_exists(id)? {
                    return Err(RepoError::DuplicateId(id));
                }
                columns.insert(0, "id");
                values.insert(0, Value::Integer(id));
            }
        }

        let placeholders = (1..=values.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                E::TABLE,
                columns.join(", ")
            ),
            params_from_iter(values),
        )?;

        Ok(match record.id() {
            0 => self.conn.last_insert_rowid(),
            id => id,
        })
    }

    fn update_record(&self, record: &E) -> RepoResult<()> {
        record.validate()?;

        let mut assignments = vec!["name = ?1".to_string(), "update_day = ?2".to_string()];
        for (offset, column) in E::EXTRA_COLUMNS.iter().enumerate() {
            assignments.push(format!("{column} = ?{}", offset + 3));
        }
        let mut values = vec![
            Value::Text(record.name().to_string()),
            Value::Text(record.update_day().to_string()),
        ];
        values.extend(record.extra_values());
        values.push(Value::Integer(record.id()));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE id = ?{};",
                E::TABLE,
                assignments.join(", "),
                values.len()
            ),
            params_from_iter(values),
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(record.id()));
        }
        Ok(())
    }

    fn delete_record(&self, id: RecordId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?1;", E::TABLE), [id])?;
        Ok(changed > 0)
    }

    fn get_record(&self, id: RecordId) -> RepoResult<Option<E>> {
        let sql = format!("{} WHERE id = ?1;", Self::select_sql());
        Ok(self
            .query_records(&sql, vec![Value::Integer(id)])?
            .into_iter()
            .next())
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<E>> {
        let sql = format!("{} WHERE name = ?1 ORDER BY id ASC;", Self::select_sql());
        self.query_records(&sql, vec![Value::Text(name.to_string())])
    }

    fn list_records(&self) -> RepoResult<Vec<E>> {
        let sql = format!("{} ORDER BY id ASC;", Self::select_sql());
        self.query_records(&sql, Vec::new())
    }
}

impl SqlRecord for Item {
    const TABLE: &'static str = "items";
    const EXTRA_COLUMNS: &'static [&'static str] =
        &["value", "category", "comments", "protect_mode"];

    fn extra_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.value.clone()),
            Value::Text(self.category.clone()),
            Value::Text(self.comments.clone()),
            Value::Integer(self.protect_mode.code()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let code: i64 = row.get("protect_mode")?;
        let protect_mode = ProtectMode::from_code(code).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid protect mode `{code}` in items.protect_mode"))
        })?;

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            value: row.get("value")?,
            category: row.get("category")?,
            comments: row.get("comments")?,
            update_day: row.get("update_day")?,
            protect_mode,
        })
    }
}

impl SqlRecord for Stuck {
    const TABLE: &'static str = "stucks";
    const EXTRA_COLUMNS: &'static [&'static str] = &["bool_fields"];

    fn extra_values(&self) -> Vec<Value> {
        vec![Value::Text(self.bool_fields.clone())]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            update_day: row.get("update_day")?,
            bool_fields: row.get("bool_fields")?,
        })
    }
}

impl SqlRecord for Stueck {
    const TABLE: &'static str = "stuecks";
    const EXTRA_COLUMNS: &'static [&'static str] = &["bool_fields"];

    fn extra_values(&self) -> Vec<Value> {
        vec![Value::Text(self.bool_fields.clone())]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            update_day: row.get("update_day")?,
            bool_fields: row.get("bool_fields")?,
        })
    }
}

/// Counts rows of one variant table. Used by diagnostics and the CLI probe.
pub fn count_records<E: SqlRecord>(conn: &Connection) -> RepoResult<u64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {};", E::TABLE),
        params![],
        |row| row.get(0),
    )?;
    u64::try_from(count)
        .map_err(|_| RepoError::InvalidData(format!("negative row count in {}", E::TABLE)))
}
