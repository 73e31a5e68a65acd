//! Driver facade coupling a connection pool with one dialect
//!
//! `Driver` owns the pool, the dialect and the adapter registry;
//! `Database` and `Collection` handles seed builders with qualified
//! collection references and hand them back for fluent chaining.

use std::sync::Arc;

use reginald_core::dialect::GeneratedKeysStyle;
use reginald_core::query::{
    CreateQuery, DeleteQuery, FindQuery, InsertQuery, ReplaceQuery, UpdateQuery,
};
use reginald_core::{
    AdapterRegistry, Backend, CollectionRef, Dialect, Error, QueryResult, QueryResultEntry,
    Result, SqlStatement, Value,
};

use crate::pool::{ConnectionPool, Transaction};

/// One configured backend: pool + dialect + adapters
#[derive(Clone)]
pub struct Driver<P> {
    pool: P,
    dialect: Arc<Dialect>,
    adapters: Arc<AdapterRegistry>,
}

impl<P: ConnectionPool> Driver<P> {
    pub fn new(pool: P, dialect: Dialect) -> Self {
        Self::with_adapters(pool, dialect, AdapterRegistry::with_builtins())
    }

    pub fn with_adapters(pool: P, dialect: Dialect, adapters: AdapterRegistry) -> Self {
        Self {
            pool,
            dialect: Arc::new(dialect),
            adapters: Arc::new(adapters),
        }
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn database(&self, name: impl Into<String>) -> Database<P> {
        Database {
            driver: self.clone(),
            name: name.into(),
        }
    }

    /// Execute a find query and buffer every row
    pub async fn fetch(&self, query: FindQuery, values: &[Value]) -> Result<QueryResult> {
        let statement = self.dialect.translate_find(&query, values)?.into_sql()?;
        self.run_fetch(&statement).await
    }

    pub async fn execute_update(&self, query: UpdateQuery, values: &[Value]) -> Result<u64> {
        let statement = self.dialect.translate_update(&query, values)?.into_sql()?;
        self.run_execute(&statement).await
    }

    pub async fn execute_replace(&self, query: ReplaceQuery, values: &[Value]) -> Result<u64> {
        let statement = self.dialect.translate_replace(&query, values)?.into_sql()?;
        self.run_execute(&statement).await
    }

    pub async fn execute_delete(&self, query: DeleteQuery, values: &[Value]) -> Result<u64> {
        let statement = self.dialect.translate_delete(&query, values)?.into_sql()?;
        self.run_execute(&statement).await
    }

    pub async fn execute_insert(&self, query: InsertQuery, values: &[Value]) -> Result<u64> {
        let statement = self
            .dialect
            .translate_insert(&query, values, &[])?
            .into_sql()?;
        self.run_execute(&statement).await
    }

    /// Insert and return the requested generated key columns, one row per
    /// inserted record
    pub async fn execute_insert_and_get_keys(
        &self,
        query: InsertQuery,
        values: &[Value],
        key_columns: &[&str],
    ) -> Result<QueryResult> {
        let statement = self
            .dialect
            .translate_insert(&query, values, key_columns)?
            .into_sql()?;

        match self.generated_keys_style()? {
            GeneratedKeysStyle::Returning => {
                tracing::debug!(sql = %statement.sql, binds = statement.binds.len(), "executing");
                self.pool
                    .execute_returning(&statement.sql, &statement.binds)
                    .await
            }
            GeneratedKeysStyle::LastInsertId => {
                tracing::debug!(sql = %statement.sql, binds = statement.binds.len(), "executing");
                let outcome = self.pool.execute(&statement.sql, &statement.binds).await?;
                let first = outcome.last_insert_id.ok_or_else(|| {
                    Error::translation("driver reported no generated key for insert")
                })?;
                // the driver reports the first key of the batch
                let mut result = QueryResult::new();
                for offset in 0..outcome.rows_affected {
                    let mut row = QueryResultEntry::new();
                    for column in key_columns {
                        row.push(*column, Value::I64(first + offset as i64));
                    }
                    result.push(row);
                }
                Ok(result)
            }
        }
    }

    /// Single-key convenience over [`Self::execute_insert_and_get_keys`]
    pub async fn execute_insert_and_get_key_as_long(
        &self,
        query: InsertQuery,
        values: &[Value],
        key_column: &str,
    ) -> Result<i64> {
        let keys = self
            .execute_insert_and_get_keys(query, values, &[key_column])
            .await?;
        keys.first()?.get_long(key_column)
    }

    pub async fn execute_insert_and_get_key_as_int(
        &self,
        query: InsertQuery,
        values: &[Value],
        key_column: &str,
    ) -> Result<i32> {
        let keys = self
            .execute_insert_and_get_keys(query, values, &[key_column])
            .await?;
        keys.first()?.get_int(key_column)
    }

    /// Execute a create query, including any trailing statements the
    /// dialect split off (separate index creations)
    pub async fn execute_create(&self, query: CreateQuery) -> Result<()> {
        let statement = self.dialect.translate_create(&query)?.into_sql()?;
        self.run_execute(&statement).await?;
        for additional in &statement.additional {
            self.run_execute(additional).await?;
        }
        Ok(())
    }

    /// Transaction-scoped variants reuse the transaction's connection

    pub async fn fetch_tx<T: Transaction>(
        &self,
        query: FindQuery,
        values: &[Value],
        txn: &mut T,
    ) -> Result<QueryResult> {
        let statement = self.dialect.translate_find(&query, values)?.into_sql()?;
        tracing::debug!(sql = %statement.sql, binds = statement.binds.len(), "executing");
        txn.fetch(&statement.sql, &statement.binds).await
    }

    pub async fn execute_update_tx<T: Transaction>(
        &self,
        query: UpdateQuery,
        values: &[Value],
        txn: &mut T,
    ) -> Result<u64> {
        let statement = self.dialect.translate_update(&query, values)?.into_sql()?;
        tracing::debug!(sql = %statement.sql, binds = statement.binds.len(), "executing");
        Ok(txn.execute(&statement.sql, &statement.binds).await?.rows_affected)
    }

    pub async fn execute_delete_tx<T: Transaction>(
        &self,
        query: DeleteQuery,
        values: &[Value],
        txn: &mut T,
    ) -> Result<u64> {
        let statement = self.dialect.translate_delete(&query, values)?.into_sql()?;
        tracing::debug!(sql = %statement.sql, binds = statement.binds.len(), "executing");
        Ok(txn.execute(&statement.sql, &statement.binds).await?.rows_affected)
    }

    pub async fn execute_insert_tx<T: Transaction>(
        &self,
        query: InsertQuery,
        values: &[Value],
        txn: &mut T,
    ) -> Result<u64> {
        let statement = self
            .dialect
            .translate_insert(&query, values, &[])?
            .into_sql()?;
        tracing::debug!(sql = %statement.sql, binds = statement.binds.len(), "executing");
        Ok(txn.execute(&statement.sql, &statement.binds).await?.rows_affected)
    }

    fn generated_keys_style(&self) -> Result<GeneratedKeysStyle> {
        match &self.dialect.backend {
            Backend::Relational(rules) => Ok(rules.generated_keys),
            Backend::Mongo => Err(Error::unsupported("generated keys", self.dialect.name)),
        }
    }

    async fn run_fetch(&self, statement: &SqlStatement) -> Result<QueryResult> {
        tracing::debug!(sql = %statement.sql, binds = statement.binds.len(), "executing");
        self.pool.fetch(&statement.sql, &statement.binds).await
    }

    async fn run_execute(&self, statement: &SqlStatement) -> Result<u64> {
        tracing::debug!(sql = %statement.sql, binds = statement.binds.len(), "executing");
        let outcome = self.pool.execute(&statement.sql, &statement.binds).await?;
        Ok(outcome.rows_affected)
    }
}

/// Handle to one named database of a driver
#[derive(Clone)]
pub struct Database<P> {
    driver: Driver<P>,
    name: String,
}

impl<P: ConnectionPool> Database<P> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver(&self) -> &Driver<P> {
        &self.driver
    }

    pub fn collection(&self, name: impl Into<String>) -> Collection<P> {
        Collection {
            driver: self.driver.clone(),
            database: self.name.clone(),
            name: name.into(),
        }
    }

    /// Execute the create query and hand back the new collection's handle
    pub async fn create(&self, query: CreateQuery) -> Result<Collection<P>> {
        let name = query.collection().name.clone();
        self.driver.execute_create(query).await?;
        Ok(self.collection(name))
    }
}

/// Handle to one collection; seeds builders with its qualified reference
#[derive(Clone)]
pub struct Collection<P> {
    driver: Driver<P>,
    database: String,
    name: String,
}

impl<P: ConnectionPool> Collection<P> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> CollectionRef {
        CollectionRef::new(&self.database, &self.name)
    }

    pub fn find(&self) -> FindQuery {
        FindQuery::new(self.reference())
    }

    pub fn update(&self) -> UpdateQuery {
        UpdateQuery::new(self.reference())
    }

    pub fn replace(&self) -> ReplaceQuery {
        ReplaceQuery::new(self.reference())
    }

    pub fn delete(&self) -> DeleteQuery {
        DeleteQuery::new(self.reference())
    }

    pub fn insert(&self) -> InsertQuery {
        InsertQuery::new(self.reference())
    }

    pub fn create(&self) -> CreateQuery {
        CreateQuery::new(self.reference())
    }

    pub fn driver(&self) -> &Driver<P> {
        &self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ExecuteResult;
    use reginald_core::SearchOps;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockPool {
        executed: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
        rows_affected: u64,
        last_insert_id: Option<i64>,
        fetch_rows: Arc<Mutex<Vec<QueryResultEntry>>>,
    }

    impl MockPool {
        fn new() -> Self {
            Self {
                rows_affected: 1,
                last_insert_id: Some(7),
                ..Default::default()
            }
        }

        fn statements(&self) -> Vec<String> {
            self.executed
                .lock()
                .unwrap()
                .iter()
                .map(|(sql, _)| sql.clone())
                .collect()
        }
    }

    impl ConnectionPool for MockPool {
        type Connection = ();

        async fn acquire(&self) -> Result<Self::Connection> {
            Ok(())
        }

        async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecuteResult> {
            self.executed
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(ExecuteResult {
                rows_affected: self.rows_affected,
                last_insert_id: self.last_insert_id,
            })
        }

        async fn fetch(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            self.executed
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(QueryResult::from_rows(self.fetch_rows.lock().unwrap().clone()))
        }

        async fn execute_returning(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            self.fetch(sql, params).await
        }
    }

    fn mysql_driver(pool: MockPool) -> Driver<MockPool> {
        Driver::new(pool, Dialect::mysql())
    }

    #[tokio::test]
    async fn test_fetch_translates_and_runs() {
        let pool = MockPool::new();
        let driver = mysql_driver(pool.clone());
        let users = driver.database("testdb").collection("user");

        let query = users.find().where_("age", 30);
        driver.fetch(query, &[]).await.unwrap();

        let statements = pool.statements();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0],
            "SELECT * FROM `testdb`.`user` WHERE `age` = ?"
        );
        assert_eq!(pool.executed.lock().unwrap()[0].1, vec![Value::I32(30)]);
    }

    #[tokio::test]
    async fn test_insert_keys_synthesized_from_last_insert_id() {
        let mut pool = MockPool::new();
        pool.rows_affected = 2;
        pool.last_insert_id = Some(40);
        let driver = mysql_driver(pool.clone());
        let users = driver.database("testdb").collection("user");

        let query = users.insert().set("name", "peter").set("number", 1);
        let keys = driver
            .execute_insert_and_get_keys(query, &[], &["id"])
            .await
            .unwrap();

        assert_eq!(keys.len(), 2);
        assert_eq!(keys.get(0).unwrap().get_long("id").unwrap(), 40);
        assert_eq!(keys.get(1).unwrap().get_long("id").unwrap(), 41);
        // only the requested key column comes back
        assert_eq!(keys.first().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_keys_returned_by_postgres() {
        let pool = MockPool::new();
        pool.fetch_rows
            .lock()
            .unwrap()
            .push(QueryResultEntry::from_fields(vec![(
                "id".to_string(),
                Value::I64(9),
            )]));
        let driver = Driver::new(pool.clone(), Dialect::postgresql());
        let users = driver.database("testdb").collection("user");

        let query = users.insert().set("name", "peter");
        let key = driver
            .execute_insert_and_get_key_as_long(query, &[], "id")
            .await
            .unwrap();

        assert_eq!(key, 9);
        let statements = pool.statements();
        assert!(statements[0].ends_with("RETURNING \"id\""), "{}", statements[0]);
    }

    #[tokio::test]
    async fn test_create_runs_additional_statements() {
        let pool = MockPool::new();
        let driver = Driver::new(pool.clone(), Dialect::postgresql());
        let db = driver.database("testdb");

        let query = db.collection("user").create().field(
            reginald_core::FieldDefinition::new("name", reginald_core::DataType::String)
                .with_options([reginald_core::FieldOption::Index]),
        );
        let users = db.create(query).await.unwrap();

        assert_eq!(users.name(), "user");
        let statements = pool.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS"));
        assert!(statements[1].starts_with("CREATE INDEX IF NOT EXISTS"));
    }

    #[tokio::test]
    async fn test_update_affected_rows() {
        let mut pool = MockPool::new();
        pool.rows_affected = 3;
        let driver = mysql_driver(pool.clone());
        let users = driver.database("testdb").collection("user");

        let query = users.update().set("name", "anna").where_("id", 1);
        let affected = driver.execute_update(query, &[]).await.unwrap();
        assert_eq!(affected, 3);
    }

    #[tokio::test]
    async fn test_mongo_dialect_is_not_executable() {
        let pool = MockPool::new();
        let driver = Driver::new(pool, Dialect::mongodb());
        let users = driver.database("testdb").collection("user");

        let result = driver.fetch(users.find(), &[]).await;
        assert!(matches!(result, Err(Error::Translation { .. })));
    }
}
