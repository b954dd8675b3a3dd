//! # Storage Bridge
//!
//! The three raw storage primitives the renderer reaches over IPC.
//!
//! ## Channels
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Renderer                       Host                    Store           │
//! │                                                                         │
//! │  invoke("db:query", sql, params) ──► BridgeRequest::Query ──► query_rows│
//! │                                  ◄── [ {col: val, ...}, ... ]           │
//! │                                                                         │
//! │  invoke("db:run", sql, params)   ──► BridgeRequest::Run   ──► execute   │
//! │                                  ◄── { affected_count, generated_id }   │
//! │                                                                         │
//! │  invoke("db:get", sql, params)   ──► BridgeRequest::Get   ──► query_one │
//! │                                  ◄── {col: val, ...} | null             │
//! │                                                                         │
//! │  failure                         ◄── { kind: "NOT_FOUND", message }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Parameters are always bound positionally, never spliced into the SQL
//! text. Column values come back with their SQLite storage class:
//! INTEGER → number, REAL → number, TEXT → string, BLOB → array of bytes,
//! NULL → null.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use thiserror::Error;
use tracing::debug;

use crate::error::{DbError, DbResult, ErrorKind};
use inventory_core::ValidationError;

/// One result row: column name → value, in select-list order.
pub type Record = Map<String, Value>;

type BridgeQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

// =============================================================================
// Parameters
// =============================================================================

/// A positional SQL parameter.
///
/// Deserialized from plain JSON: `null`, integers, floats, strings, and
/// byte arrays. Booleans become `0` / `1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "JsonParam")]
pub enum SqlParam {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonParam {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<JsonParam> for SqlParam {
    fn from(param: JsonParam) -> Self {
        match param {
            JsonParam::Null => SqlParam::Null,
            JsonParam::Bool(flag) => SqlParam::Integer(i64::from(flag)),
            JsonParam::Integer(v) => SqlParam::Integer(v),
            JsonParam::Real(v) => SqlParam::Real(v),
            JsonParam::Text(v) => SqlParam::Text(v),
            JsonParam::Blob(v) => SqlParam::Blob(v),
        }
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Integer(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Real(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlParam::Null, Into::into)
    }
}

fn bind_params<'q>(mut query: BridgeQuery<'q>, params: &'q [SqlParam]) -> BridgeQuery<'q> {
    for param in params {
        query = match param {
            SqlParam::Null => query.bind(None::<i64>),
            SqlParam::Integer(v) => query.bind(*v),
            SqlParam::Real(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.as_str()),
            SqlParam::Blob(v) => query.bind(v.as_slice()),
        };
    }
    query
}

// =============================================================================
// Requests and Responses
// =============================================================================

/// What `db:run` reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub affected_count: u64,
    /// Row id of the inserted row, for INSERT / REPLACE statements that
    /// wrote something.
    pub generated_id: Option<i64>,
}

/// An IPC storage call, tagged by its channel name.
///
/// ```json
/// { "channel": "db:get", "sql": "SELECT * FROM products WHERE id = ?", "params": [7] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel")]
pub enum BridgeRequest {
    #[serde(rename = "db:query")]
    Query {
        sql: String,
        #[serde(default)]
        params: Vec<SqlParam>,
    },
    #[serde(rename = "db:run")]
    Run {
        sql: String,
        #[serde(default)]
        params: Vec<SqlParam>,
    },
    #[serde(rename = "db:get")]
    Get {
        sql: String,
        #[serde(default)]
        params: Vec<SqlParam>,
    },
}

impl BridgeRequest {
    pub fn channel(&self) -> &'static str {
        match self {
            BridgeRequest::Query { .. } => "db:query",
            BridgeRequest::Run { .. } => "db:run",
            BridgeRequest::Get { .. } => "db:get",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BridgeResponse {
    Rows(Vec<Record>),
    Executed(ExecuteResult),
    Row(Option<Record>),
}

/// Error forwarded to the renderer: the taxonomy kind plus the original
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct BridgeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<DbError> for BridgeError {
    fn from(err: DbError) -> Self {
        BridgeError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Raw SQL access over the shared pool.
///
/// ## Usage
/// ```rust,ignore
/// let rows = db.store()
///     .query_rows("SELECT * FROM products WHERE name LIKE ?", &["%cable%".into()])
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Store { pool }
    }

    /// Runs a query and returns every row.
    pub async fn query_rows(&self, sql: &str, params: &[SqlParam]) -> DbResult<Vec<Record>> {
        ensure_sql(sql)?;
        debug!(sql = %sql, params = params.len(), "db:query");

        let rows = bind_params(sqlx::query(sql), params).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Runs a statement and reports affected rows and the generated row id.
    pub async fn execute(&self, sql: &str, params: &[SqlParam]) -> DbResult<ExecuteResult> {
        ensure_sql(sql)?;
        debug!(sql = %sql, params = params.len(), "db:run");

        let result = bind_params(sqlx::query(sql), params).execute(&self.pool).await?;
        let affected_count = result.rows_affected();
        let generated_id = (affected_count > 0 && is_insert(sql)).then(|| result.last_insert_rowid());

        Ok(ExecuteResult {
            affected_count,
            generated_id,
        })
    }

    /// Runs a query and returns the first row, if any.
    pub async fn query_one(&self, sql: &str, params: &[SqlParam]) -> DbResult<Option<Record>> {
        ensure_sql(sql)?;
        debug!(sql = %sql, params = params.len(), "db:get");

        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    /// Routes an IPC request to its primitive.
    pub async fn dispatch(&self, request: BridgeRequest) -> Result<BridgeResponse, BridgeError> {
        let response = match &request {
            BridgeRequest::Query { sql, params } => self.query_rows(sql, params).await.map(BridgeResponse::Rows),
            BridgeRequest::Run { sql, params } => self.execute(sql, params).await.map(BridgeResponse::Executed),
            BridgeRequest::Get { sql, params } => self.query_one(sql, params).await.map(BridgeResponse::Row),
        };

        response.map_err(|err| {
            debug!(channel = request.channel(), error = %err, "Bridge call failed");
            BridgeError::from(err)
        })
    }
}

fn ensure_sql(sql: &str) -> DbResult<()> {
    if sql.trim().is_empty() {
        return Err(ValidationError::required("sql").into());
    }
    Ok(())
}

fn is_insert(sql: &str) -> bool {
    let head: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    matches!(head.as_str(), "INSERT" | "REPLACE")
}

// =============================================================================
// Row Decoding
// =============================================================================

enum StorageClass {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

fn storage_class(row: &SqliteRow, index: usize) -> DbResult<StorageClass> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(StorageClass::Null);
    }

    let class = match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => StorageClass::Integer,
        "REAL" | "NUMERIC" => StorageClass::Real,
        "BLOB" => StorageClass::Blob,
        _ => StorageClass::Text,
    };
    Ok(class)
}

fn row_to_record(row: &SqliteRow) -> DbResult<Record> {
    let mut record = Record::new();

    for (index, column) in row.columns().iter().enumerate() {
        let value = match storage_class(row, index)? {
            StorageClass::Null => Value::Null,
            StorageClass::Integer => Value::from(row.try_get_unchecked::<i64, _>(index)?),
            StorageClass::Real => {
                let v: f64 = row.try_get_unchecked(index)?;
                Number::from_f64(v).map_or(Value::Null, Value::Number)
            }
            StorageClass::Text => Value::String(row.try_get_unchecked(index)?),
            StorageClass::Blob => {
                let bytes: Vec<u8> = row.try_get_unchecked(index)?;
                Value::Array(bytes.into_iter().map(Value::from).collect())
            }
        };
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_db;
    use serde_json::json;

    #[test]
    fn test_params_from_json() {
        let params: Vec<SqlParam> = serde_json::from_value(json!([null, 7, 2.5, "x", true, false, [1, 2]])).unwrap();
        assert_eq!(
            params,
            vec![
                SqlParam::Null,
                SqlParam::Integer(7),
                SqlParam::Real(2.5),
                SqlParam::Text("x".to_string()),
                SqlParam::Integer(1),
                SqlParam::Integer(0),
                SqlParam::Blob(vec![1, 2]),
            ]
        );
    }

    #[test]
    fn test_request_channels() {
        let request: BridgeRequest = serde_json::from_value(json!({
            "channel": "db:get",
            "sql": "SELECT 1",
            "params": [1]
        }))
        .unwrap();
        assert_eq!(request.channel(), "db:get");

        let request: BridgeRequest =
            serde_json::from_value(json!({ "channel": "db:run", "sql": "DELETE FROM users" })).unwrap();
        assert!(matches!(request, BridgeRequest::Run { ref params, .. } if params.is_empty()));

        assert!(serde_json::from_value::<BridgeRequest>(json!({ "channel": "db:drop", "sql": "" })).is_err());
    }

    #[test]
    fn test_is_insert() {
        assert!(is_insert("  insert into x values (1)"));
        assert!(is_insert("REPLACE INTO x VALUES (1)"));
        assert!(!is_insert("UPDATE x SET a = 1"));
    }

    #[tokio::test]
    async fn test_execute_and_query() {
        let db = memory_db().await;
        let store = db.store();

        let inserted = store
            .execute(
                "INSERT INTO suppliers (name, email, created_at, updated_at) VALUES (?, ?, ?, ?)",
                &["Herat Mobile".into(), SqlParam::Null, "2026-01-01".into(), "2026-01-01".into()],
            )
            .await
            .unwrap();
        assert_eq!(inserted.affected_count, 1);
        let id = inserted.generated_id.unwrap();

        let rows = store
            .query_rows("SELECT id, name, email FROM suppliers WHERE id = ?", &[id.into()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Herat Mobile"));
        assert_eq!(rows[0]["email"], Value::Null);
        let keys: Vec<_> = rows[0].keys().cloned().collect();
        assert_eq!(keys, vec!["id", "name", "email"]);

        let updated = store
            .execute("UPDATE suppliers SET address = ? WHERE id = ?", &["Herat".into(), id.into()])
            .await
            .unwrap();
        assert_eq!(updated.affected_count, 1);
        assert_eq!(updated.generated_id, None);
    }

    #[tokio::test]
    async fn test_query_one_and_value_types() {
        let db = memory_db().await;
        let store = db.store();

        let row = store
            .query_one("SELECT 1 AS i, 2.5 AS r, 'a' AS t, x'0102' AS b, NULL AS n", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row["i"], json!(1));
        assert_eq!(row["r"], json!(2.5));
        assert_eq!(row["t"], json!("a"));
        assert_eq!(row["b"], json!([1, 2]));
        assert_eq!(row["n"], Value::Null);

        let none = store
            .query_one("SELECT * FROM products WHERE id = ?", &[42.into()])
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_injection_is_stored_literally() {
        let db = memory_db().await;
        let store = db.store();
        let hostile = "x'); DROP TABLE suppliers; --";

        store
            .execute(
                "INSERT INTO suppliers (name, created_at, updated_at) VALUES (?, '', '')",
                &[hostile.into()],
            )
            .await
            .unwrap();

        let row = store
            .query_one("SELECT name FROM suppliers WHERE name = ?", &[hostile.into()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row["name"], json!(hostile));
    }

    #[tokio::test]
    async fn test_dispatch_maps_errors() {
        let db = memory_db().await;
        let store = db.store();

        let insert = |email: &str| BridgeRequest::Run {
            sql: "INSERT INTO users (first_name, email, password_hash, created_at, updated_at) VALUES ('a', ?, 'h', '', '')"
                .to_string(),
            params: vec![email.into()],
        };

        let ok = store.dispatch(insert("a@shop.af")).await.unwrap();
        assert!(matches!(ok, BridgeResponse::Executed(ExecuteResult { affected_count: 1, .. })));

        let err = store.dispatch(insert("a@shop.af")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);
        assert!(err.message.contains("users.email"));

        let err = store
            .dispatch(BridgeRequest::Query {
                sql: "SELECT * FROM no_such_table".to_string(),
                params: vec![],
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Persistence);

        let err = store
            .dispatch(BridgeRequest::Get {
                sql: "   ".to_string(),
                params: vec![],
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_response_json_shape() {
        let db = memory_db().await;
        let response = db
            .store()
            .dispatch(BridgeRequest::Get {
                sql: "SELECT 1 AS one".to_string(),
                params: vec![],
            })
            .await
            .unwrap();
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "one": 1 }));
    }
}
