//! The query intermediate representation
//!
//! Builders accumulate `Entry` nodes in call order; dialect translators walk
//! the resulting tree and emit a backend-native statement. Entry order is
//! semantically significant: bind parameters, insert field/value pairing and
//! join placement all follow the order the application made its calls in.

use crate::datatype::DataType;
use crate::query::FindQuery;
use crate::value::Value;

/// A computed scalar function over a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl Aggregation {
    pub fn sql_name(&self) -> &'static str {
        match self {
            Aggregation::Sum => "SUM",
            Aggregation::Avg => "AVG",
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
            Aggregation::Count => "COUNT",
        }
    }

    /// Accumulator operator name used in `$group` stages. COUNT also maps
    /// to `$sum`, applied to the literal 1 rather than the field path.
    pub fn mongo_name(&self) -> &'static str {
        match self {
            Aggregation::Sum | Aggregation::Count => "$sum",
            Aggregation::Avg => "$avg",
            Aggregation::Min => "$min",
            Aggregation::Max => "$max",
        }
    }
}

/// A storage-neutral reference to a collection within a database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub database: String,
    pub name: String,
}

impl CollectionRef {
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
        }
    }
}

/// A field reference, optionally qualified with a collection and database
///
/// Parsed right-to-left from `"field"`, `"collection.field"` or
/// `"database.collection.field"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub database: Option<String>,
    pub collection: Option<String>,
    pub field: String,
}

impl FieldRef {
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.rsplitn(3, '.');
        let field = parts.next().unwrap_or_default().to_string();
        let collection = parts.next().map(str::to_string);
        let database = parts.next().map(str::to_string);
        Self {
            database,
            collection,
            field,
        }
    }

    pub fn bare(field: impl Into<String>) -> Self {
        Self {
            database: None,
            collection: None,
            field: field.into(),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(raw: &str) -> Self {
        FieldRef::parse(raw)
    }
}

/// A condition value: a literal, a positional placeholder resolved from the
/// values slice passed to execute, or a sub-select
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Prepared,
    Subquery(Box<FindQuery>),
}

impl Operand {
    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }
}

macro_rules! impl_operand_from {
    ($($t:ty),* $(,)?) => {
        $(impl From<$t> for Operand {
            fn from(val: $t) -> Self {
                Operand::Literal(val.into())
            }
        })*
    };
}

impl_operand_from!(bool, i32, i64, u32, f32, f64, String, &str, Value);

impl<T> From<Vec<T>> for Operand
where
    T: Into<Value>,
{
    fn from(vals: Vec<T>) -> Self {
        Operand::Literal(Value::from(vals))
    }
}

impl From<FindQuery> for Operand {
    fn from(query: FindQuery) -> Self {
        Operand::Subquery(Box::new(query))
    }
}

/// Comparison kind of a condition entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Equals,
    Like,
    Lower,
    Higher,
    Null,
    Empty,
    In,
    Between,
}

/// Boolean composition kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    pub fn sql_name(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Outer => "FULL OUTER",
        }
    }
}

/// One equality pair of a join's ON clause
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOn {
    pub left: FieldRef,
    pub right: FieldRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn sql_name(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Assignment operator of an update/replace set entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl SetOperator {
    /// Arithmetic symbol, `None` for the plain assignment
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            SetOperator::Assign => None,
            SetOperator::Add => Some("+"),
            SetOperator::Subtract => Some("-"),
            SetOperator::Multiply => Some("*"),
            SetOperator::Divide => Some("/"),
        }
    }
}

/// One node of the query IR
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Condition {
        kind: ConditionKind,
        field: FieldRef,
        value: Operand,
        /// Upper bound of a BETWEEN condition
        second: Option<Operand>,
        aggregation: Option<Aggregation>,
    },
    /// Boolean composition; children are owned by the operation node and are
    /// therefore never emitted independently at the top level
    Operation {
        kind: OperationKind,
        children: Vec<Entry>,
    },
    Join {
        collection: CollectionRef,
        kind: JoinKind,
        on: Vec<JoinOn>,
    },
    Limit {
        limit: u64,
        offset: u64,
    },
    OrderBy {
        field: FieldRef,
        direction: Direction,
        aggregation: Option<Aggregation>,
    },
    GroupBy {
        field: FieldRef,
        aggregation: Option<Aggregation>,
    },
    /// Update/replace assignment, kept in the shared entry list so SET and
    /// WHERE calls preserve their relative order
    Set {
        field: FieldRef,
        value: Operand,
        operator: SetOperator,
    },
}

impl Entry {
    pub fn condition(kind: ConditionKind, field: &str, value: Operand) -> Self {
        Entry::Condition {
            kind,
            field: FieldRef::parse(field),
            value,
            second: None,
            aggregation: None,
        }
    }
}

/// Referential action of a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyOption {
    Default,
    Cascade,
    SetNull,
}

impl ForeignKeyOption {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ForeignKeyOption::Default => "",
            ForeignKeyOption::Cascade => "CASCADE",
            ForeignKeyOption::SetNull => "SET NULL",
        }
    }

    /// Case-insensitive lookup by name, used by the schema loader
    pub fn from_name(name: &str) -> crate::Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(ForeignKeyOption::Default),
            "CASCADE" => Ok(ForeignKeyOption::Cascade),
            "SET_NULL" => Ok(ForeignKeyOption::SetNull),
            _ => Err(crate::Error::invalid_query(format!(
                "unknown foreign key option '{name}'"
            ))),
        }
    }
}

/// A declarative reference from one field to another collection's field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub database: String,
    pub collection: String,
    pub field: String,
    pub delete_option: ForeignKeyOption,
    pub update_option: ForeignKeyOption,
}

impl ForeignKey {
    pub fn new(
        database: impl Into<String>,
        collection: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            field: field.into(),
            delete_option: ForeignKeyOption::Default,
            update_option: ForeignKeyOption::Default,
        }
    }

    pub fn on_delete(mut self, option: ForeignKeyOption) -> Self {
        self.delete_option = option;
        self
    }

    pub fn on_update(mut self, option: ForeignKeyOption) -> Self {
        self.update_option = option;
        self
    }
}

/// Column option of a create-field entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOption {
    PrimaryKey,
    Unique,
    AutoIncrement,
    NotNull,
    Index,
    UniqueIndex,
}

impl FieldOption {
    /// Case-insensitive lookup by name, used by the schema loader
    pub fn from_name(name: &str) -> crate::Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "PRIMARY_KEY" => Ok(FieldOption::PrimaryKey),
            "UNIQUE" => Ok(FieldOption::Unique),
            "AUTO_INCREMENT" => Ok(FieldOption::AutoIncrement),
            "NOT_NULL" => Ok(FieldOption::NotNull),
            "INDEX" => Ok(FieldOption::Index),
            "UNIQUE_INDEX" => Ok(FieldOption::UniqueIndex),
            _ => Err(crate::Error::invalid_query(format!(
                "unknown field option '{name}'"
            ))),
        }
    }
}

/// Kind of a created collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Normal,
    Edge,
    View,
}

impl CollectionKind {
    pub fn name(&self) -> &'static str {
        match self {
            CollectionKind::Normal => "NORMAL",
            CollectionKind::Edge => "EDGE",
            CollectionKind::View => "VIEW",
        }
    }

    pub fn from_name(name: &str) -> crate::Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(CollectionKind::Normal),
            "EDGE" => Ok(CollectionKind::Edge),
            "VIEW" => Ok(CollectionKind::View),
            _ => Err(crate::Error::invalid_query(format!(
                "unknown collection type '{name}'"
            ))),
        }
    }
}

/// Column definition accumulated by a create query
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub data_type: DataType,
    pub size: Option<u32>,
    pub default_value: Option<Value>,
    pub foreign_key: Option<ForeignKey>,
    pub options: Vec<FieldOption>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            size: None,
            default_value: None,
            foreign_key: None,
            options: Vec::new(),
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_foreign_key(mut self, key: ForeignKey) -> Self {
        self.foreign_key = Some(key);
        self
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = FieldOption>) -> Self {
        self.options.extend(options);
        self
    }
}

/// One node of a create query
#[derive(Debug, Clone, PartialEq)]
pub enum CreateEntry {
    Field(FieldDefinition),
    ForeignKey { field: String, key: ForeignKey },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_ref_parsing() {
        assert_eq!(FieldRef::parse("age"), FieldRef::bare("age"));

        let qualified = FieldRef::parse("user.age");
        assert_eq!(qualified.collection.as_deref(), Some("user"));
        assert_eq!(qualified.field, "age");
        assert!(qualified.database.is_none());

        let full = FieldRef::parse("app.user.age");
        assert_eq!(full.database.as_deref(), Some("app"));
        assert_eq!(full.collection.as_deref(), Some("user"));
        assert_eq!(full.field, "age");
    }

    #[test]
    fn test_field_option_lookup_is_case_insensitive() {
        assert_eq!(
            FieldOption::from_name("primary_key").unwrap(),
            FieldOption::PrimaryKey
        );
        assert_eq!(
            FieldOption::from_name("AUTO_INCREMENT").unwrap(),
            FieldOption::AutoIncrement
        );
        assert!(FieldOption::from_name("sparse").is_err());
    }

    #[test]
    fn test_foreign_key_builder() {
        let key = ForeignKey::new("app", "user", "id")
            .on_delete(ForeignKeyOption::Cascade)
            .on_update(ForeignKeyOption::SetNull);
        assert_eq!(key.delete_option, ForeignKeyOption::Cascade);
        assert_eq!(key.update_option, ForeignKeyOption::SetNull);
    }

    #[test]
    fn test_field_definition_builder() {
        let field = FieldDefinition::new("name", DataType::String)
            .with_size(255)
            .with_default("unknown")
            .with_options([FieldOption::NotNull]);
        assert_eq!(field.size, Some(255));
        assert_eq!(field.default_value, Some(Value::from("unknown")));
        assert_eq!(field.options, vec![FieldOption::NotNull]);
    }
}
