//! Reginald - a fluent multi-dialect database abstraction
//!
//! Builders from `reginald-core` describe queries against storage-neutral
//! collections; this crate executes them. A [`Driver`] couples one connection
//! pool with one dialect, hands out [`Database`] and [`Collection`] handles,
//! and turns translated statements into buffered [`QueryResult`]s.
//!
//! ```no_run
//! use reginald::{Dialect, Driver, SearchOps};
//! # async fn demo<P: reginald::ConnectionPool>(pool: P) -> reginald::Result<()> {
//! let driver = Driver::new(pool, Dialect::mysql());
//! let users = driver.database("app").collection("user");
//!
//! let adults = users.find().where_higher("age", 17).order_by("name", reginald::Direction::Asc);
//! let rows = driver.fetch(adults, &[]).await?;
//! for row in &rows {
//!     println!("{}", row.get_string("name")?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod pool;
pub mod schema;
pub mod worker;

// Re-export the core query layer
pub use reginald_core::{
    AdapterRegistry, Aggregation, AggregationBuilder, ArithmeticOperator, Backend, CollectionKind,
    CollectionRef, CreateQuery, DataType, DataTypeAdapter, DeleteQuery, Dialect, DialectRegistry,
    Direction, Environment, Error, FieldDefinition, FieldOption, FieldRef, FindQuery, ForeignKey,
    ForeignKeyOption, InsertQuery, JoinKind, MongoStatement, Operand, Pattern, QueryResult,
    QueryResultEntry, ReplaceQuery, Result, SearchOps, SqlStatement, Statement, UpdateQuery, Value,
};

pub use config::DriverConfig;
pub use driver::{Collection, Database, Driver};
pub use pool::{
    transaction, ConnectionPool, ExecuteResult, Transaction, TransactionalPool,
};
pub use worker::{TaskHandle, WorkerPool};

#[cfg(feature = "postgres")]
pub use pool::postgres::PostgresPool;

#[cfg(feature = "mysql")]
pub use pool::mysql::MySqlPool;
