//! Uniform result model shared by every backend
//!
//! Executors materialize all rows once; a [`QueryResult`] is never a lazy
//! cursor, so it can be indexed and iterated any number of times.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::value::Value;

/// An ordered, fully buffered sequence of result rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    rows: Vec<QueryResultEntry>,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<QueryResultEntry>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: QueryResultEntry) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row, failing with [`Error::RowOutOfRange`] when empty
    pub fn first(&self) -> Result<&QueryResultEntry> {
        self.get(0)
    }

    pub fn first_or_none(&self) -> Option<&QueryResultEntry> {
        self.rows.first()
    }

    /// Last row, failing with [`Error::RowOutOfRange`] when empty
    pub fn last(&self) -> Result<&QueryResultEntry> {
        if self.rows.is_empty() {
            return Err(Error::RowOutOfRange { index: 0, len: 0 });
        }
        self.get(self.rows.len() - 1)
    }

    pub fn last_or_none(&self) -> Option<&QueryResultEntry> {
        self.rows.last()
    }

    pub fn get(&self, index: usize) -> Result<&QueryResultEntry> {
        self.rows.get(index).ok_or(Error::RowOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    pub fn get_or_none(&self, index: usize) -> Option<&QueryResultEntry> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryResultEntry> {
        self.rows.iter()
    }

    /// Deserialize every row into `T` via its JSON representation
    pub fn to_objects<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.rows.iter().map(QueryResultEntry::to_object).collect()
    }
}

impl IntoIterator for QueryResult {
    type Item = QueryResultEntry;
    type IntoIter = std::vec::IntoIter<QueryResultEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a QueryResultEntry;
    type IntoIter = std::slice::Iter<'a, QueryResultEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<QueryResultEntry> for QueryResult {
    fn from_iter<I: IntoIterator<Item = QueryResultEntry>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// One result row: an ordered field→value mapping with case-insensitive
/// name lookup and typed coercion getters
///
/// Field order matches the translator's column emission order, so positional
/// access lines up with the statement that produced the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResultEntry {
    fields: Vec<(String, Value)>,
}

impl QueryResultEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields
            .iter()
            .any(|(field, _)| field.eq_ignore_ascii_case(name))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Raw value by case-insensitive field name
    pub fn value(&self, name: &str) -> Result<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
            .ok_or_else(|| Error::column_not_found(name))
    }

    /// Raw value by position within the row
    pub fn value_at(&self, index: usize) -> Result<&Value> {
        self.fields
            .get(index)
            .map(|(_, value)| value)
            .ok_or(Error::RowOutOfRange {
                index,
                len: self.fields.len(),
            })
    }

    pub fn get_string(&self, name: &str) -> Result<String> {
        match self.value(name)? {
            Value::String(s) => Ok(s.clone()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::I32(i) => Ok(i.to_string()),
            Value::I64(i) => Ok(i.to_string()),
            Value::F32(f) => Ok(f.to_string()),
            Value::F64(f) => Ok(f.to_string()),
            Value::Json(j) => Ok(j.to_string()),
            other => Err(Error::conversion(other.type_name(), "TEXT")),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i32> {
        match self.value(name)? {
            Value::I32(i) => Ok(*i),
            Value::I64(i) => i32::try_from(*i).map_err(|_| Error::conversion("BIGINT", "INTEGER")),
            Value::Bool(b) => Ok(i32::from(*b)),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::conversion("TEXT", "INTEGER")),
            other => Err(Error::conversion(other.type_name(), "INTEGER")),
        }
    }

    pub fn get_long(&self, name: &str) -> Result<i64> {
        match self.value(name)? {
            Value::I32(i) => Ok(i64::from(*i)),
            Value::I64(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::String(s) => s.parse().map_err(|_| Error::conversion("TEXT", "BIGINT")),
            other => Err(Error::conversion(other.type_name(), "BIGINT")),
        }
    }

    pub fn get_double(&self, name: &str) -> Result<f64> {
        match self.value(name)? {
            Value::F64(f) => Ok(*f),
            Value::F32(f) => Ok(f64::from(*f)),
            Value::I32(i) => Ok(f64::from(*i)),
            Value::I64(i) => Ok(*i as f64),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::conversion("TEXT", "DOUBLE PRECISION")),
            other => Err(Error::conversion(other.type_name(), "DOUBLE PRECISION")),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f32> {
        match self.value(name)? {
            Value::F32(f) => Ok(*f),
            Value::F64(f) => Ok(*f as f32),
            Value::I32(i) => Ok(*i as f32),
            Value::String(s) => s.parse().map_err(|_| Error::conversion("TEXT", "REAL")),
            other => Err(Error::conversion(other.type_name(), "REAL")),
        }
    }

    pub fn get_byte(&self, name: &str) -> Result<u8> {
        match self.value(name)? {
            Value::I32(i) => u8::try_from(*i).map_err(|_| Error::conversion("INTEGER", "BYTE")),
            Value::I64(i) => u8::try_from(*i).map_err(|_| Error::conversion("BIGINT", "BYTE")),
            Value::Bytes(b) if b.len() == 1 => Ok(b[0]),
            other => Err(Error::conversion(other.type_name(), "BYTE")),
        }
    }

    pub fn get_boolean(&self, name: &str) -> Result<bool> {
        match self.value(name)? {
            Value::Bool(b) => Ok(*b),
            Value::I32(i) => Ok(*i != 0),
            Value::I64(i) => Ok(*i != 0),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(Error::conversion("TEXT", "BOOLEAN")),
            },
            other => Err(Error::conversion(other.type_name(), "BOOLEAN")),
        }
    }

    pub fn get_bytes(&self, name: &str) -> Result<Vec<u8>> {
        match self.value(name)? {
            Value::Bytes(b) => Ok(b.clone()),
            Value::String(s) => Ok(s.clone().into_bytes()),
            other => Err(Error::conversion(other.type_name(), "BYTEA")),
        }
    }

    #[cfg(feature = "uuid-support")]
    pub fn get_uuid(&self, name: &str) -> Result<uuid::Uuid> {
        use crate::datatype::{DataTypeAdapter, UuidAdapter};
        UuidAdapter.read(self.value(name)?)
    }

    /// Deserialize the row into any `DeserializeOwned` type
    pub fn to_object<T: DeserializeOwned>(&self) -> Result<T> {
        let mut object = serde_json::Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            object.insert(name.clone(), value.to_json());
        }
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }
}

impl<'a> IntoIterator for &'a QueryResultEntry {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn sample_row() -> QueryResultEntry {
        QueryResultEntry::from_fields(vec![
            ("Id".to_string(), Value::I64(7)),
            ("Name".to_string(), Value::String("peter".to_string())),
            ("Score".to_string(), Value::F64(12.5)),
            ("Active".to_string(), Value::Bool(true)),
        ])
    }

    #[test]
    fn test_empty_result() {
        let result = QueryResult::default();
        assert!(result.is_empty());
        assert_eq!(result.first_or_none(), None);
        assert!(matches!(result.first(), Err(Error::RowOutOfRange { .. })));
        assert!(matches!(result.last(), Err(Error::RowOutOfRange { .. })));
    }

    #[test]
    fn test_row_access_by_index() {
        let mut result = QueryResult::new();
        result.push(sample_row());
        result.push(QueryResultEntry::from_fields(vec![(
            "Id".to_string(),
            Value::I64(8),
        )]));

        assert_eq!(result.len(), 2);
        assert_eq!(result.get(1).unwrap().get_long("id").unwrap(), 8);
        assert_eq!(result.last().unwrap().get_long("id").unwrap(), 8);
        assert!(matches!(result.get(2), Err(Error::RowOutOfRange { .. })));
        assert_eq!(result.get_or_none(2), None);
    }

    #[test]
    fn test_case_insensitive_field_lookup() {
        let row = sample_row();
        assert_eq!(row.get_long("ID").unwrap(), 7);
        assert_eq!(row.get_string("name").unwrap(), "peter");
        assert!(matches!(
            row.get_string("missing"),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_positional_access_matches_declaration_order() {
        let row = sample_row();
        assert_eq!(row.value_at(0).unwrap(), &Value::I64(7));
        assert_eq!(row.value_at(1).unwrap(), &Value::String("peter".to_string()));
        assert!(matches!(
            row.value_at(4),
            Err(Error::RowOutOfRange { .. })
        ));
    }

    #[test]
    fn test_numeric_coercion() {
        let row = sample_row();
        assert_eq!(row.get_int("id").unwrap(), 7);
        assert_eq!(row.get_double("id").unwrap(), 7.0);
        assert_eq!(row.get_float("score").unwrap(), 12.5);
        assert_eq!(row.get_string("score").unwrap(), "12.5");
    }

    #[test]
    fn test_conversion_error_names_both_types() {
        let row = sample_row();
        let err = row.get_int("name").unwrap_err();
        match err {
            Error::Conversion { from, to } => {
                assert_eq!(from, "TEXT");
                assert_eq!(to, "INTEGER");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_boolean_coercion() {
        let row = QueryResultEntry::from_fields(vec![
            ("bit".to_string(), Value::I64(1)),
            ("word".to_string(), Value::String("false".to_string())),
        ]);
        assert!(row.get_boolean("bit").unwrap());
        assert!(!row.get_boolean("word").unwrap());
    }

    #[test]
    fn test_int_range_check() {
        let row = QueryResultEntry::from_fields(vec![(
            "big".to_string(),
            Value::I64(i64::from(i32::MAX) + 1),
        )]);
        assert!(matches!(
            row.get_int("big"),
            Err(Error::Conversion { .. })
        ));
        assert_eq!(row.get_long("big").unwrap(), i64::from(i32::MAX) + 1);
    }

    #[test]
    fn test_to_object() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct User {
            id: i64,
            name: String,
            active: bool,
        }

        let row = QueryResultEntry::from_fields(vec![
            ("id".to_string(), Value::I64(7)),
            ("name".to_string(), Value::String("peter".to_string())),
            ("active".to_string(), Value::Bool(true)),
        ]);
        let user: User = row.to_object().unwrap();
        assert_eq!(
            user,
            User {
                id: 7,
                name: "peter".to_string(),
                active: true,
            }
        );
    }

    #[test]
    fn test_result_is_reiterable() {
        let mut result = QueryResult::new();
        result.push(sample_row());
        let first_pass: Vec<_> = result.iter().collect();
        let second_pass: Vec<_> = result.iter().collect();
        assert_eq!(first_pass, second_pass);
    }
}
