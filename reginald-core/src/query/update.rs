//! Update and replace query builders

use crate::entry::{CollectionRef, Entry, FieldRef, Operand, SetOperator};
use crate::query::{SearchBody, SearchOps};

/// Fluent update builder; assignments and conditions share one entry list so
/// their relative order is preserved
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    body: SearchBody,
}

impl UpdateQuery {
    pub fn new(collection: CollectionRef) -> Self {
        Self {
            body: SearchBody::new(collection),
        }
    }

    fn push_set(mut self, field: &str, value: impl Into<Operand>, operator: SetOperator) -> Self {
        self.body.push(Entry::Set {
            field: FieldRef::parse(field),
            value: value.into(),
            operator,
        });
        self
    }

    pub fn set(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_set(field, value, SetOperator::Assign)
    }

    pub fn add(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_set(field, value, SetOperator::Add)
    }

    pub fn subtract(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_set(field, value, SetOperator::Subtract)
    }

    pub fn multiply(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_set(field, value, SetOperator::Multiply)
    }

    pub fn divide(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_set(field, value, SetOperator::Divide)
    }
}

impl SearchOps for UpdateQuery {
    fn body(&self) -> &SearchBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut SearchBody {
        &mut self.body
    }

    fn child(&self) -> Self {
        UpdateQuery::new(self.body.collection.clone())
    }

    fn into_body(self) -> SearchBody {
        self.body
    }
}

/// Fluent replace builder; writes the given assignments as a whole record,
/// inserting when no match exists
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceQuery {
    body: SearchBody,
}

impl ReplaceQuery {
    pub fn new(collection: CollectionRef) -> Self {
        Self {
            body: SearchBody::new(collection),
        }
    }

    fn push_set(mut self, field: &str, value: impl Into<Operand>, operator: SetOperator) -> Self {
        self.body.push(Entry::Set {
            field: FieldRef::parse(field),
            value: value.into(),
            operator,
        });
        self
    }

    pub fn set(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_set(field, value, SetOperator::Assign)
    }

    pub fn add(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_set(field, value, SetOperator::Add)
    }

    pub fn subtract(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_set(field, value, SetOperator::Subtract)
    }

    pub fn multiply(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_set(field, value, SetOperator::Multiply)
    }

    pub fn divide(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_set(field, value, SetOperator::Divide)
    }
}

impl SearchOps for ReplaceQuery {
    fn body(&self) -> &SearchBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut SearchBody {
        &mut self.body
    }

    fn child(&self) -> Self {
        ReplaceQuery::new(self.body.collection.clone())
    }

    fn into_body(self) -> SearchBody {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_set_and_where_keep_relative_order() {
        let body = UpdateQuery::new(CollectionRef::new("testdb", "user"))
            .set("name", "peter")
            .where_("id", 1)
            .add("logins", 1)
            .into_body();
        assert!(matches!(body.entries[0], Entry::Set { .. }));
        assert!(matches!(body.entries[1], Entry::Condition { .. }));
        match &body.entries[2] {
            Entry::Set {
                operator, value, ..
            } => {
                assert_eq!(*operator, SetOperator::Add);
                assert_eq!(*value, Operand::Literal(Value::I32(1)));
            }
            other => panic!("expected set, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic_operators() {
        let body = UpdateQuery::new(CollectionRef::new("testdb", "stats"))
            .subtract("stock", 2)
            .multiply("price", 3)
            .divide("score", 4)
            .into_body();
        let operators: Vec<SetOperator> = body
            .entries
            .iter()
            .map(|e| match e {
                Entry::Set { operator, .. } => *operator,
                other => panic!("expected set, got {other:?}"),
            })
            .collect();
        assert_eq!(
            operators,
            vec![
                SetOperator::Subtract,
                SetOperator::Multiply,
                SetOperator::Divide
            ]
        );
    }
}
