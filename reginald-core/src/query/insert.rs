//! Insert query builder

use crate::entry::{CollectionRef, Operand};
use crate::query::FindQuery;

/// Fluent insert builder accumulating per-field value lists
///
/// Both styles append to the same column lists: `set`/`set_all` grow one
/// field at a time, `fields` + `values` add whole rows positionally. Columns
/// with several values produce a multi-row insert; all lists must end up the
/// same length.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    collection: CollectionRef,
    columns: Vec<(String, Vec<Operand>)>,
    source: Option<Box<FindQuery>>,
    pending_error: Option<String>,
}

impl InsertQuery {
    pub fn new(collection: CollectionRef) -> Self {
        Self {
            collection,
            columns: Vec::new(),
            source: None,
            pending_error: None,
        }
    }

    fn column_mut(&mut self, field: &str) -> &mut Vec<Operand> {
        if let Some(index) = self.columns.iter().position(|(name, _)| name == field) {
            return &mut self.columns[index].1;
        }
        self.columns.push((field.to_string(), Vec::new()));
        &mut self.columns.last_mut().unwrap().1
    }

    pub fn set(mut self, field: &str, value: impl Into<Operand>) -> Self {
        self.column_mut(field).push(value.into());
        self
    }

    pub fn set_all(
        mut self,
        field: &str,
        values: impl IntoIterator<Item = impl Into<Operand>>,
    ) -> Self {
        let column = self.column_mut(field);
        column.extend(values.into_iter().map(Into::into));
        self
    }

    /// Declare the column list for positional `values` rows
    pub fn fields(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for name in names {
            let name = name.into();
            if !self.columns.iter().any(|(existing, _)| *existing == name) {
                self.columns.push((name, Vec::new()));
            }
        }
        self
    }

    /// Append one positional row; arity must match the declared field count
    pub fn values(mut self, row: impl IntoIterator<Item = impl Into<Operand>>) -> Self {
        let row: Vec<Operand> = row.into_iter().map(Into::into).collect();
        if self.columns.is_empty() {
            self.record_error("values requires a preceding fields declaration");
            return self;
        }
        if row.len() != self.columns.len() {
            self.record_error(format!(
                "expected {} values per row, got {}",
                self.columns.len(),
                row.len()
            ));
            return self;
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.1.push(value);
        }
        self
    }

    /// Insert-from-select
    pub fn query(mut self, source: FindQuery) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    fn record_error(&mut self, message: impl Into<String>) {
        if self.pending_error.is_none() {
            self.pending_error = Some(message.into());
        }
    }

    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    pub fn columns(&self) -> &[(String, Vec<Operand>)] {
        &self.columns
    }

    pub fn source(&self) -> Option<&FindQuery> {
        self.source.as_deref()
    }

    pub fn pending_error(&self) -> Option<&str> {
        self.pending_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn insert() -> InsertQuery {
        InsertQuery::new(CollectionRef::new("testdb", "user"))
    }

    #[test]
    fn test_set_accumulates_batch_columns() {
        let query = insert()
            .set("name", "peter")
            .set("number", 1)
            .set("name", "paula")
            .set("number", 2);
        assert_eq!(query.columns().len(), 2);
        assert_eq!(query.columns()[0].0, "name");
        assert_eq!(query.columns()[0].1.len(), 2);
        assert_eq!(
            query.columns()[1].1[1],
            Operand::Literal(Value::I32(2))
        );
    }

    #[test]
    fn test_positional_rows() {
        let query = insert()
            .fields(["name", "number"])
            .values(["peter".into(), Operand::literal(1)])
            .values(["paula".into(), Operand::literal(2)]);
        assert!(query.pending_error().is_none());
        assert_eq!(query.columns()[0].1.len(), 2);
        assert_eq!(query.columns()[1].1.len(), 2);
    }

    #[test]
    fn test_arity_mismatch_records_error() {
        let query = insert().fields(["a", "b"]).values([1]);
        assert!(query.pending_error().is_some());
    }

    #[test]
    fn test_values_without_fields_records_error() {
        let query = insert().values([1, 2]);
        assert!(query.pending_error().is_some());
    }
}
