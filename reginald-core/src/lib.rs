//! Reginald Core - the storage-neutral query layer
//!
//! Fluent builders accumulate an immutable entry tree; a [`Dialect`] then
//! translates that tree into a backend-native statement (parameterized SQL
//! for the relational family, stage documents for MongoDB). Translation is
//! pure and deterministic; execution lives in the `reginald` facade.

pub mod aggregation;
pub mod datatype;
pub mod dialect;
pub mod entry;
pub mod error;
pub mod pattern;
pub mod query;
pub mod result;
pub mod value;

// Re-export main types
pub use aggregation::{AggregationBuilder, ArithmeticOperator};
pub use datatype::{AdapterRegistry, DataType, DataTypeAdapter};
pub use dialect::{
    Backend, Dialect, DialectRegistry, Environment, MongoStatement, SqlStatement, Statement,
};
pub use entry::{
    Aggregation, CollectionKind, CollectionRef, Direction, FieldDefinition, FieldOption,
    FieldRef, ForeignKey, ForeignKeyOption, JoinKind, Operand,
};
pub use error::{Error, Result};
pub use pattern::Pattern;
pub use query::{
    CreateQuery, DeleteQuery, FindQuery, InsertQuery, ReplaceQuery, SearchOps, UpdateQuery,
};
pub use result::{QueryResult, QueryResultEntry};
pub use value::Value;

/// Start a find query against the given collection
pub fn find(database: &str, collection: &str) -> FindQuery {
    FindQuery::new(CollectionRef::new(database, collection))
}
