//! Dialect registry and statement translation
//!
//! A `Dialect` bundles the metadata and translation rules of one backend.
//! Translation is a pure function of the builder's entry tree and the
//! positional values slice; translating the same query twice yields
//! byte-identical output.

mod mongo;
mod rules;
mod sql;

pub use rules::{
    AutoIncrementStyle, DataTypeInfo, DefaultValueStyle, GeneratedKeysStyle, IndexStyle,
    LimitStyle, PlaceholderStyle, RelationalRules,
};

use crate::error::{Error, Result};
use crate::query::{CreateQuery, DeleteQuery, FindQuery, InsertQuery, ReplaceQuery, UpdateQuery};
use crate::value::Value;

/// Left-to-right consumer of the positional values passed to execute,
/// resolving `Prepared` operands in builder-call order
pub(crate) struct ValueCursor<'v> {
    values: &'v [Value],
    consumed: usize,
}

impl<'v> ValueCursor<'v> {
    pub(crate) fn new(values: &'v [Value]) -> Self {
        Self {
            values,
            consumed: 0,
        }
    }

    fn next(&mut self) -> Result<Value> {
        let value = self
            .values
            .get(self.consumed)
            .cloned()
            .ok_or_else(|| Error::invalid_query("no prepared value left for placeholder"))?;
        self.consumed += 1;
        Ok(value)
    }

    pub(crate) fn resolve(&mut self, operand: &crate::entry::Operand) -> Result<Value> {
        match operand {
            crate::entry::Operand::Literal(value) => Ok(value.clone()),
            crate::entry::Operand::Prepared => self.next(),
            crate::entry::Operand::Subquery(_) => Err(Error::translation(
                "subquery operand is not valid in this position",
            )),
        }
    }
}

/// Whether queries qualify collection names with the database name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// `db.collection` qualification, used by server backends
    Remote,
    /// Unqualified names, used by the embedded H2
    Local,
}

/// Translation backend of a dialect
#[derive(Debug, Clone)]
pub enum Backend {
    Relational(RelationalRules),
    Mongo,
}

/// A parameterized SQL statement with its bind values
///
/// `additional` carries statements that must run after the main one, such as
/// PostgreSQL's separate index creations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlStatement {
    pub sql: String,
    pub binds: Vec<Value>,
    pub additional: Vec<SqlStatement>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, binds: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            binds,
            additional: Vec::new(),
        }
    }
}

/// A MongoDB operation built from `serde_json` stage documents
#[derive(Debug, Clone, PartialEq)]
pub enum MongoStatement {
    Find {
        collection: String,
        pipeline: Vec<serde_json::Value>,
    },
    Insert {
        collection: String,
        documents: Vec<serde_json::Value>,
    },
    Update {
        collection: String,
        filter: serde_json::Value,
        update: serde_json::Value,
        upsert: bool,
    },
    Delete {
        collection: String,
        filter: serde_json::Value,
    },
    Create {
        collection: String,
        options: serde_json::Value,
    },
}

/// A translated, backend-native statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Sql(SqlStatement),
    Mongo(MongoStatement),
}

impl Statement {
    /// Unwrap the relational form, for callers that only speak SQL
    pub fn into_sql(self) -> Result<SqlStatement> {
        match self {
            Statement::Sql(sql) => Ok(sql),
            Statement::Mongo(_) => Err(Error::translation(
                "statement was translated for MongoDB, not SQL",
            )),
        }
    }
}

/// Stateless description of one backend
#[derive(Debug, Clone)]
pub struct Dialect {
    pub name: &'static str,
    pub protocol: &'static str,
    pub default_port: Option<u16>,
    pub environment: Environment,
    pub backend: Backend,
}

impl Dialect {
    pub fn mysql() -> Self {
        Self {
            name: "MySQL",
            protocol: "mysql",
            default_port: Some(3306),
            environment: Environment::Remote,
            backend: Backend::Relational(RelationalRules::mysql_family()),
        }
    }

    pub fn mariadb() -> Self {
        Self {
            name: "MariaDB",
            protocol: "mariadb",
            default_port: Some(3306),
            environment: Environment::Remote,
            backend: Backend::Relational(RelationalRules::mysql_family()),
        }
    }

    /// Embedded file-backed H2; speaks the MySQL surface but never
    /// qualifies names with a database
    pub fn h2_portable() -> Self {
        Self {
            name: "H2Portable",
            protocol: "h2",
            default_port: None,
            environment: Environment::Local,
            backend: Backend::Relational(RelationalRules::mysql_family()),
        }
    }

    pub fn postgresql() -> Self {
        Self {
            name: "PostgreSQL",
            protocol: "postgresql",
            default_port: Some(5432),
            environment: Environment::Remote,
            backend: Backend::Relational(RelationalRules::postgres()),
        }
    }

    pub fn mssql() -> Self {
        Self {
            name: "MsSQL",
            protocol: "sqlserver",
            default_port: Some(1433),
            environment: Environment::Remote,
            backend: Backend::Relational(RelationalRules::mssql()),
        }
    }

    pub fn mongodb() -> Self {
        Self {
            name: "MongoDB",
            protocol: "mongodb",
            default_port: Some(27017),
            environment: Environment::Remote,
            backend: Backend::Mongo,
        }
    }

    pub fn translate_find(&self, query: &FindQuery, values: &[Value]) -> Result<Statement> {
        match &self.backend {
            Backend::Relational(rules) => sql::SqlTranslator::new(self, rules)
                .find(query, values)
                .map(Statement::Sql),
            Backend::Mongo => mongo::find(query, values).map(Statement::Mongo),
        }
    }

    pub fn translate_delete(&self, query: &DeleteQuery, values: &[Value]) -> Result<Statement> {
        match &self.backend {
            Backend::Relational(rules) => sql::SqlTranslator::new(self, rules)
                .delete(query, values)
                .map(Statement::Sql),
            Backend::Mongo => mongo::delete(query, values).map(Statement::Mongo),
        }
    }

    pub fn translate_update(&self, query: &UpdateQuery, values: &[Value]) -> Result<Statement> {
        match &self.backend {
            Backend::Relational(rules) => sql::SqlTranslator::new(self, rules)
                .update(query, values)
                .map(Statement::Sql),
            Backend::Mongo => mongo::update(query, values).map(Statement::Mongo),
        }
    }

    pub fn translate_replace(&self, query: &ReplaceQuery, values: &[Value]) -> Result<Statement> {
        match &self.backend {
            Backend::Relational(rules) => sql::SqlTranslator::new(self, rules)
                .replace(query, values)
                .map(Statement::Sql),
            Backend::Mongo => mongo::replace(query, values).map(Statement::Mongo),
        }
    }

    /// `key_columns` names the generated keys the caller wants back;
    /// dialects with `Returning` style append the clause here
    pub fn translate_insert(
        &self,
        query: &InsertQuery,
        values: &[Value],
        key_columns: &[&str],
    ) -> Result<Statement> {
        match &self.backend {
            Backend::Relational(rules) => sql::SqlTranslator::new(self, rules)
                .insert(query, values, key_columns)
                .map(Statement::Sql),
            Backend::Mongo => mongo::insert(query, values).map(Statement::Mongo),
        }
    }

    pub fn translate_create(&self, query: &CreateQuery) -> Result<Statement> {
        match &self.backend {
            Backend::Relational(rules) => sql::SqlTranslator::new(self, rules)
                .create(query)
                .map(Statement::Sql),
            Backend::Mongo => mongo::create(query).map(Statement::Mongo),
        }
    }
}

/// Explicit dialect lookup by case-insensitive name
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    dialects: Vec<Dialect>,
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every built-in dialect
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Dialect::mysql());
        registry.register(Dialect::mariadb());
        registry.register(Dialect::h2_portable());
        registry.register(Dialect::postgresql());
        registry.register(Dialect::mssql());
        registry.register(Dialect::mongodb());
        registry
    }

    /// Later registrations under the same name win
    pub fn register(&mut self, dialect: Dialect) {
        self.dialects
            .retain(|d| !d.name.eq_ignore_ascii_case(dialect.name));
        self.dialects.push(dialect);
    }

    pub fn get(&self, name: &str) -> Result<&Dialect> {
        self.dialects
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::unknown_dialect(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.dialects.iter().map(|d| d.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let registry = DialectRegistry::with_builtins();
        assert_eq!(registry.get("mysql").unwrap().name, "MySQL");
        assert_eq!(registry.get("POSTGRESQL").unwrap().name, "PostgreSQL");
        assert_eq!(registry.get("MongoDb").unwrap().name, "MongoDB");
    }

    #[test]
    fn test_unknown_dialect_errors() {
        let registry = DialectRegistry::with_builtins();
        assert!(matches!(
            registry.get("oracle"),
            Err(Error::UnknownDialect { .. })
        ));
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = DialectRegistry::with_builtins();
        let count = registry.names().count();
        registry.register(Dialect::mysql());
        assert_eq!(registry.names().count(), count);
    }

    #[test]
    fn test_default_ports() {
        let registry = DialectRegistry::with_builtins();
        assert_eq!(registry.get("MariaDB").unwrap().default_port, Some(3306));
        assert_eq!(registry.get("MsSQL").unwrap().default_port, Some(1433));
        assert_eq!(registry.get("H2Portable").unwrap().default_port, None);
    }
}
