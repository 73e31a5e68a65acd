//! Connection pool and transaction interface

use std::future::Future;

use reginald_core::{Error, QueryResult, Result, Value};

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    /// First generated key of the statement, when the driver reports one
    pub last_insert_id: Option<i64>,
}

/// Trait for database connection pools
pub trait ConnectionPool: Send + Sync + Clone {
    /// The connection type for this pool
    type Connection;

    /// Acquire a connection from the pool
    fn acquire(&self) -> impl Future<Output = Result<Self::Connection>> + Send;

    /// Execute a statement that returns no rows (INSERT, UPDATE, DELETE, DDL)
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<ExecuteResult>> + Send;

    /// Execute a statement and buffer every returned row
    fn fetch(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<QueryResult>> + Send;

    /// Execute a modifying statement that yields rows, such as
    /// `INSERT … RETURNING`
    fn execute_returning(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<QueryResult>> + Send;
}

/// Trait for database transactions
///
/// A transaction binds one connection for its lifetime; statements executed
/// through it reuse that connection. Commit and rollback consume the value.
pub trait Transaction: Send {
    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<ExecuteResult>> + Send;

    fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<QueryResult>> + Send;

    fn execute_returning(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<QueryResult>> + Send;

    /// Commit the transaction
    fn commit(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;

    /// Rollback the transaction
    fn rollback(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}

/// Extension trait for connection pools that support transactions
pub trait TransactionalPool: ConnectionPool {
    type Transaction: Transaction;

    fn begin_transaction(&self) -> impl Future<Output = Result<Self::Transaction>> + Send;
}

/// Run `f` inside a transaction, committing on `Ok` and rolling back on `Err`
pub async fn transaction<P, F, Fut, T, E>(pool: &P, f: F) -> Result<T>
where
    P: TransactionalPool,
    F: FnOnce(&mut P::Transaction) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>> + Send,
    E: Into<Error>,
{
    let mut txn = pool.begin_transaction().await?;

    match f(&mut txn).await {
        Ok(result) => {
            txn.commit().await?;
            Ok(result)
        }
        Err(e) => {
            let _ = txn.rollback().await; // Ignore rollback errors
            Err(e.into())
        }
    }
}

/// SQLx-backed PostgreSQL pool
#[cfg(feature = "postgres")]
pub mod postgres {
    use super::*;
    use reginald_core::QueryResultEntry;
    use sqlx::postgres::{PgArguments, PgPool, PgRow};
    use sqlx::{Column, Row, TypeInfo};

    #[derive(Clone)]
    pub struct PostgresPool {
        inner: PgPool,
    }

    impl PostgresPool {
        /// Connect a new pool from a connection string
        pub async fn new(database_url: &str) -> Result<Self> {
            let pool = PgPool::connect(database_url).await?;
            tracing::info!(backend = "postgres", "connection pool opened");
            Ok(Self { inner: pool })
        }

        /// Wrap an existing PgPool
        pub fn from_pool(pool: PgPool) -> Self {
            Self { inner: pool }
        }
    }

    impl ConnectionPool for PostgresPool {
        type Connection = sqlx::pool::PoolConnection<sqlx::Postgres>;

        async fn acquire(&self) -> Result<Self::Connection> {
            Ok(self.inner.acquire().await?)
        }

        async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecuteResult> {
            let query = bind_values(sqlx::query(sql), params);
            let done = query.execute(&self.inner).await?;
            Ok(ExecuteResult {
                rows_affected: done.rows_affected(),
                // PostgreSQL reports generated keys through RETURNING instead
                last_insert_id: None,
            })
        }

        async fn fetch(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            let query = bind_values(sqlx::query(sql), params);
            let rows = query.fetch_all(&self.inner).await?;
            rows.iter().map(decode_row).collect()
        }

        async fn execute_returning(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            self.fetch(sql, params).await
        }
    }

    pub struct PostgresTransaction {
        inner: sqlx::Transaction<'static, sqlx::Postgres>,
    }

    impl Transaction for PostgresTransaction {
        async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecuteResult> {
            let query = bind_values(sqlx::query(sql), params);
            let done = query.execute(&mut *self.inner).await?;
            Ok(ExecuteResult {
                rows_affected: done.rows_affected(),
                last_insert_id: None,
            })
        }

        async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            let query = bind_values(sqlx::query(sql), params);
            let rows = query.fetch_all(&mut *self.inner).await?;
            rows.iter().map(decode_row).collect()
        }

        async fn execute_returning(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            self.fetch(sql, params).await
        }

        async fn commit(self) -> Result<()> {
            self.inner
                .commit()
                .await
                .map_err(|e| Error::transaction(e.to_string()))
        }

        async fn rollback(self) -> Result<()> {
            self.inner
                .rollback()
                .await
                .map_err(|e| Error::transaction(e.to_string()))
        }
    }

    impl TransactionalPool for PostgresPool {
        type Transaction = PostgresTransaction;

        async fn begin_transaction(&self) -> Result<Self::Transaction> {
            let txn = self
                .inner
                .begin()
                .await
                .map_err(|e| Error::transaction(e.to_string()))?;
            Ok(PostgresTransaction { inner: txn })
        }
    }

    fn bind_values<'q>(
        mut query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
        params: &'q [Value],
    ) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<i32>),
                Value::Bool(b) => query.bind(*b),
                Value::I32(i) => query.bind(*i),
                Value::I64(i) => query.bind(*i),
                Value::F32(f) => query.bind(*f),
                Value::F64(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
                Value::Json(j) => query.bind(j),
                Value::Array(arr) => {
                    let json = serde_json::Value::Array(arr.iter().map(Value::to_json).collect());
                    query.bind(json)
                }
            };
        }
        query
    }

    /// Decode one row column-by-column, keyed by the driver's type name
    fn decode_row(row: &PgRow) -> Result<QueryResultEntry> {
        let mut entry = QueryResultEntry::new();
        for (index, column) in row.columns().iter().enumerate() {
            let value = match column.type_info().name() {
                "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
                "INT2" => row
                    .try_get::<Option<i16>, _>(index)?
                    .map(|v| Value::I32(i32::from(v))),
                "INT4" => row.try_get::<Option<i32>, _>(index)?.map(Value::I32),
                "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::I64),
                "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map(Value::F32),
                "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(Value::F64),
                "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(index)?.map(Value::Bytes),
                "JSON" | "JSONB" => row
                    .try_get::<Option<serde_json::Value>, _>(index)?
                    .map(Value::Json),
                _ => row.try_get::<Option<String>, _>(index)?.map(Value::String),
            };
            entry.push(column.name(), value.unwrap_or(Value::Null));
        }
        Ok(entry)
    }
}

/// SQLx-backed MySQL/MariaDB pool
#[cfg(feature = "mysql")]
pub mod mysql {
    use super::*;
    use reginald_core::QueryResultEntry;
    use sqlx::mysql::{MySqlArguments, MySqlPool as SqlxMySqlPool, MySqlRow};
    use sqlx::{Column, Row, TypeInfo};

    #[derive(Clone)]
    pub struct MySqlPool {
        inner: SqlxMySqlPool,
    }

    impl MySqlPool {
        /// Connect a new pool from a connection string
        pub async fn new(database_url: &str) -> Result<Self> {
            let pool = SqlxMySqlPool::connect(database_url).await?;
            tracing::info!(backend = "mysql", "connection pool opened");
            Ok(Self { inner: pool })
        }

        /// Wrap an existing sqlx pool
        pub fn from_pool(pool: SqlxMySqlPool) -> Self {
            Self { inner: pool }
        }
    }

    impl ConnectionPool for MySqlPool {
        type Connection = sqlx::pool::PoolConnection<sqlx::MySql>;

        async fn acquire(&self) -> Result<Self::Connection> {
            Ok(self.inner.acquire().await?)
        }

        async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecuteResult> {
            let query = bind_values(sqlx::query(sql), params);
            let done = query.execute(&self.inner).await?;
            let last = done.last_insert_id();
            Ok(ExecuteResult {
                rows_affected: done.rows_affected(),
                last_insert_id: (last != 0).then_some(last as i64),
            })
        }

        async fn fetch(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            let query = bind_values(sqlx::query(sql), params);
            let rows = query.fetch_all(&self.inner).await?;
            rows.iter().map(decode_row).collect()
        }

        async fn execute_returning(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            self.fetch(sql, params).await
        }
    }

    pub struct MySqlTransaction {
        inner: sqlx::Transaction<'static, sqlx::MySql>,
    }

    impl Transaction for MySqlTransaction {
        async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecuteResult> {
            let query = bind_values(sqlx::query(sql), params);
            let done = query.execute(&mut *self.inner).await?;
            let last = done.last_insert_id();
            Ok(ExecuteResult {
                rows_affected: done.rows_affected(),
                last_insert_id: (last != 0).then_some(last as i64),
            })
        }

        async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            let query = bind_values(sqlx::query(sql), params);
            let rows = query.fetch_all(&mut *self.inner).await?;
            rows.iter().map(decode_row).collect()
        }

        async fn execute_returning(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            self.fetch(sql, params).await
        }

        async fn commit(self) -> Result<()> {
            self.inner
                .commit()
                .await
                .map_err(|e| Error::transaction(e.to_string()))
        }

        async fn rollback(self) -> Result<()> {
            self.inner
                .rollback()
                .await
                .map_err(|e| Error::transaction(e.to_string()))
        }
    }

    impl TransactionalPool for MySqlPool {
        type Transaction = MySqlTransaction;

        async fn begin_transaction(&self) -> Result<Self::Transaction> {
            let txn = self
                .inner
                .begin()
                .await
                .map_err(|e| Error::transaction(e.to_string()))?;
            Ok(MySqlTransaction { inner: txn })
        }
    }

    fn bind_values<'q>(
        mut query: sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>,
        params: &'q [Value],
    ) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<i32>),
                Value::Bool(b) => query.bind(*b),
                Value::I32(i) => query.bind(*i),
                Value::I64(i) => query.bind(*i),
                Value::F32(f) => query.bind(*f),
                Value::F64(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
                Value::Json(j) => query.bind(j),
                Value::Array(arr) => {
                    let json = serde_json::Value::Array(arr.iter().map(Value::to_json).collect());
                    query.bind(json)
                }
            };
        }
        query
    }

    fn decode_row(row: &MySqlRow) -> Result<QueryResultEntry> {
        let mut entry = QueryResultEntry::new();
        for (index, column) in row.columns().iter().enumerate() {
            let value = match column.type_info().name() {
                "BOOLEAN" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
                "TINYINT" => row
                    .try_get::<Option<i8>, _>(index)?
                    .map(|v| Value::I32(i32::from(v))),
                "SMALLINT" => row
                    .try_get::<Option<i16>, _>(index)?
                    .map(|v| Value::I32(i32::from(v))),
                "MEDIUMINT" | "INT" => row.try_get::<Option<i32>, _>(index)?.map(Value::I32),
                "BIGINT" => row.try_get::<Option<i64>, _>(index)?.map(Value::I64),
                "FLOAT" => row.try_get::<Option<f32>, _>(index)?.map(Value::F32),
                "DOUBLE" => row.try_get::<Option<f64>, _>(index)?.map(Value::F64),
                "BIT" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
                "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                    row.try_get::<Option<Vec<u8>>, _>(index)?.map(Value::Bytes)
                }
                "JSON" => row
                    .try_get::<Option<serde_json::Value>, _>(index)?
                    .map(Value::Json),
                _ => row.try_get::<Option<String>, _>(index)?.map(Value::String),
            };
            entry.push(column.name(), value.unwrap_or(Value::Null));
        }
        Ok(entry)
    }
}
