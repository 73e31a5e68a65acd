//! Declarative schema document loader
//!
//! Reads a JSON document describing collections and drives the create-query
//! API. Enum names are case-insensitive; unknown names and malformed
//! foreign-key references fail before anything executes.

use reginald_core::query::CreateQuery;
use reginald_core::{
    CollectionKind, DataType, Error, FieldDefinition, FieldOption, ForeignKey, ForeignKeyOption,
    Result, Value,
};

use crate::driver::{Collection, Database};
use crate::pool::ConnectionPool;

/// Build the create queries described by `document` and execute them,
/// returning the handles of the created collections
pub async fn create_collections<P: ConnectionPool>(
    database: &Database<P>,
    document: &serde_json::Value,
) -> Result<Vec<Collection<P>>> {
    let queries = parse_collections(database, document)?;
    let mut collections = Vec::with_capacity(queries.len());
    for query in queries {
        collections.push(database.create(query).await?);
    }
    Ok(collections)
}

/// Parse `document` into create queries without executing anything
pub fn parse_collections<P: ConnectionPool>(
    database: &Database<P>,
    document: &serde_json::Value,
) -> Result<Vec<CreateQuery>> {
    let entries = document
        .get("collections")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| Error::invalid_query("schema document has no 'collections' array"))?;

    entries
        .iter()
        .map(|entry| parse_collection(database.name(), entry))
        .collect()
}

fn parse_collection(database: &str, entry: &serde_json::Value) -> Result<CreateQuery> {
    let name = required_str(entry, "name")?;
    let mut query = CreateQuery::new(reginald_core::CollectionRef::new(database, name));

    if let Some(kind) = optional_str(entry, "type") {
        query = query.collection_type(CollectionKind::from_name(kind)?);
    }
    if let Some(engine) = optional_str(entry, "engine") {
        query = query.engine(engine);
    }

    if let Some(fields) = entry.get("fields").and_then(serde_json::Value::as_array) {
        for field in fields {
            query = query.field(parse_field(field)?);
        }
    }

    if let Some(keys) = entry.get("foreignKeys").and_then(serde_json::Value::as_array) {
        for key in keys {
            let field = required_str(key, "field")?;
            query = query.foreign_key(field, parse_foreign_key(key)?);
        }
    }

    Ok(query)
}

fn parse_field(entry: &serde_json::Value) -> Result<FieldDefinition> {
    let name = required_str(entry, "name")?;
    let data_type = DataType::from_name(required_str(entry, "type")?)?;
    let mut definition = FieldDefinition::new(name, data_type);

    // size 0 means engine default
    if let Some(size) = entry.get("size").and_then(serde_json::Value::as_u64) {
        if size > 0 {
            definition = definition.with_size(size as u32);
        }
    }
    if let Some(default) = entry.get("default") {
        definition = definition.with_default(json_to_value(default));
    }
    if let Some(options) = entry.get("options").and_then(serde_json::Value::as_array) {
        for option in options {
            let name = option
                .as_str()
                .ok_or_else(|| Error::invalid_query("field option must be a string"))?;
            definition = definition.with_options([FieldOption::from_name(name)?]);
        }
    }
    if let Some(key) = entry.get("foreignKey") {
        definition = definition.with_foreign_key(parse_foreign_key(key)?);
    }

    Ok(definition)
}

fn parse_foreign_key(entry: &serde_json::Value) -> Result<ForeignKey> {
    let reference = required_str(entry, "reference")?;
    let parts: Vec<&str> = reference.split('.').collect();
    let [database, collection, field] = parts.as_slice() else {
        return Err(Error::invalid_query(format!(
            "foreign key reference '{reference}' must be 'database.collection.field'"
        )));
    };

    let mut key = ForeignKey::new(*database, *collection, *field);
    if let Some(option) = optional_str(entry, "deleteOption") {
        key = key.on_delete(ForeignKeyOption::from_name(option)?);
    }
    if let Some(option) = optional_str(entry, "updateOption") {
        key = key.on_update(ForeignKeyOption::from_name(option)?);
    }
    Ok(key)
}

fn required_str<'a>(entry: &'a serde_json::Value, key: &str) -> Result<&'a str> {
    entry
        .get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| Error::invalid_query(format!("schema entry is missing '{key}'")))
}

fn optional_str<'a>(entry: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(serde_json::Value::as_str)
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if let Ok(small) = i32::try_from(i) {
                    Value::I32(small)
                } else {
                    Value::I64(i)
                }
            } else {
                Value::F64(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        other => Value::Json(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Driver;
    use crate::pool::ExecuteResult;
    use reginald_core::entry::CreateEntry;
    use reginald_core::{Dialect, QueryResult};
    use serde_json::json;

    #[derive(Clone, Default)]
    struct NoopPool;

    impl ConnectionPool for NoopPool {
        type Connection = ();

        async fn acquire(&self) -> Result<Self::Connection> {
            Ok(())
        }

        async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<ExecuteResult> {
            Ok(ExecuteResult::default())
        }

        async fn fetch(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
            Ok(QueryResult::default())
        }

        async fn execute_returning(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
            Ok(QueryResult::default())
        }
    }

    fn testdb() -> Database<NoopPool> {
        Driver::new(NoopPool, Dialect::mysql()).database("testdb")
    }

    fn sample_document() -> serde_json::Value {
        json!({
            "collections": [
                {
                    "name": "user",
                    "type": "normal",
                    "engine": "InnoDB",
                    "fields": [
                        {
                            "name": "id",
                            "type": "integer",
                            "options": ["PRIMARY_KEY", "AUTO_INCREMENT"]
                        },
                        {
                            "name": "name",
                            "type": "string",
                            "size": 64,
                            "default": "guest"
                        },
                        {
                            "name": "level",
                            "type": "integer",
                            "size": 0
                        }
                    ]
                },
                {
                    "name": "orders",
                    "fields": [
                        { "name": "user_id", "type": "long" }
                    ],
                    "foreignKeys": [
                        {
                            "field": "user_id",
                            "reference": "testdb.user.id",
                            "deleteOption": "cascade"
                        }
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_parses_collections_in_order() {
        let queries = parse_collections(&testdb(), &sample_document()).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].collection().name, "user");
        assert_eq!(queries[0].engine_name(), Some("InnoDB"));
        assert_eq!(queries[1].collection().name, "orders");
    }

    #[test]
    fn test_field_details() {
        let queries = parse_collections(&testdb(), &sample_document()).unwrap();
        let CreateEntry::Field(name_field) = &queries[0].entries()[1] else {
            panic!("expected a field entry");
        };
        assert_eq!(name_field.data_type, DataType::String);
        assert_eq!(name_field.size, Some(64));
        assert_eq!(
            name_field.default_value,
            Some(Value::String("guest".to_string()))
        );

        // size 0 falls back to the engine default
        let CreateEntry::Field(level_field) = &queries[0].entries()[2] else {
            panic!("expected a field entry");
        };
        assert_eq!(level_field.size, None);
    }

    #[test]
    fn test_collection_level_foreign_key() {
        let queries = parse_collections(&testdb(), &sample_document()).unwrap();
        let CreateEntry::ForeignKey { field, key } = &queries[1].entries()[1] else {
            panic!("expected a foreign key entry");
        };
        assert_eq!(field, "user_id");
        assert_eq!(key.collection, "user");
        assert_eq!(key.delete_option, ForeignKeyOption::Cascade);
    }

    #[test]
    fn test_unknown_option_fails_fast() {
        let document = json!({
            "collections": [{
                "name": "user",
                "fields": [
                    { "name": "id", "type": "integer", "options": ["SHINY"] }
                ]
            }]
        });
        assert!(matches!(
            parse_collections(&testdb(), &document),
            Err(Error::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_malformed_reference_fails() {
        let document = json!({
            "collections": [{
                "name": "orders",
                "foreignKeys": [
                    { "field": "user_id", "reference": "user.id" }
                ]
            }]
        });
        assert!(matches!(
            parse_collections(&testdb(), &document),
            Err(Error::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_missing_collections_array() {
        assert!(parse_collections(&testdb(), &json!({})).is_err());
    }

    #[tokio::test]
    async fn test_create_collections_returns_handles() {
        let database = testdb();
        let collections = create_collections(&database, &sample_document())
            .await
            .unwrap();
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].name(), "user");
        assert_eq!(collections[1].name(), "orders");
    }
}
