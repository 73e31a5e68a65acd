//! Create-collection query builder

use crate::entry::{CollectionKind, CollectionRef, CreateEntry, FieldDefinition, ForeignKey};
use crate::query::FindQuery;

/// Fluent create-collection builder
#[derive(Debug, Clone, PartialEq)]
pub struct CreateQuery {
    collection: CollectionRef,
    entries: Vec<CreateEntry>,
    engine: Option<String>,
    kind: CollectionKind,
    include: Option<Box<FindQuery>>,
}

impl CreateQuery {
    pub fn new(collection: CollectionRef) -> Self {
        Self {
            collection,
            entries: Vec::new(),
            engine: None,
            kind: CollectionKind::Normal,
            include: None,
        }
    }

    pub fn field(mut self, definition: FieldDefinition) -> Self {
        self.entries.push(CreateEntry::Field(definition));
        self
    }

    /// Standalone foreign-key constraint on an already declared field
    pub fn foreign_key(mut self, field: impl Into<String>, key: ForeignKey) -> Self {
        self.entries.push(CreateEntry::ForeignKey {
            field: field.into(),
            key,
        });
        self
    }

    /// Storage engine hint; only the MySQL family honors it
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn collection_type(mut self, kind: CollectionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Create-as-select
    pub fn include(mut self, query: FindQuery) -> Self {
        self.include = Some(Box::new(query));
        self
    }

    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    pub fn entries(&self) -> &[CreateEntry] {
        &self.entries
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn included_query(&self) -> Option<&FindQuery> {
        self.include.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::entry::{FieldOption, ForeignKeyOption};

    #[test]
    fn test_create_accumulates_fields_in_order() {
        let query = CreateQuery::new(CollectionRef::new("testdb", "user"))
            .field(
                FieldDefinition::new("id", DataType::Integer)
                    .with_options([FieldOption::PrimaryKey, FieldOption::AutoIncrement]),
            )
            .field(FieldDefinition::new("name", DataType::String).with_size(255));
        assert_eq!(query.entries().len(), 2);
        match &query.entries()[0] {
            CreateEntry::Field(field) => assert_eq!(field.name, "id"),
            other => panic!("expected field, got {other:?}"),
        }
    }

    #[test]
    fn test_standalone_foreign_key() {
        let query = CreateQuery::new(CollectionRef::new("testdb", "orders")).foreign_key(
            "user_id",
            ForeignKey::new("testdb", "user", "id").on_delete(ForeignKeyOption::Cascade),
        );
        match &query.entries()[0] {
            CreateEntry::ForeignKey { field, key } => {
                assert_eq!(field, "user_id");
                assert_eq!(key.delete_option, ForeignKeyOption::Cascade);
            }
            other => panic!("expected foreign key, got {other:?}"),
        }
    }

    #[test]
    fn test_engine_and_type() {
        let query = CreateQuery::new(CollectionRef::new("testdb", "log"))
            .engine("InnoDB")
            .collection_type(CollectionKind::View);
        assert_eq!(query.engine_name(), Some("InnoDB"));
        assert_eq!(query.kind(), CollectionKind::View);
    }
}
