//! Fluent per-operation query builders
//!
//! Each builder appends entries to a shared [`SearchBody`] in call order and
//! returns `self` for chaining. Nothing is validated here beyond argument
//! shape; illegal combinations surface at translation time. Builders are
//! single-use: execution and translation consume them by value.

mod create;
mod delete;
mod find;
mod insert;
mod update;

pub use create::CreateQuery;
pub use delete::DeleteQuery;
pub use find::{FindQuery, Projection};
pub use insert::InsertQuery;
pub use update::{ReplaceQuery, UpdateQuery};

use crate::entry::{
    Aggregation, CollectionRef, ConditionKind, Direction, Entry, FieldRef, JoinKind, JoinOn,
    Operand, OperationKind,
};

/// Shared accumulator of the search-query family
///
/// Argument errors discovered while chaining are recorded here (first error
/// wins) and surfaced as an invalid-query error at translation time, keeping
/// the fluent API infallible.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchBody {
    pub collection: CollectionRef,
    pub entries: Vec<Entry>,
    pub pending_error: Option<String>,
}

impl SearchBody {
    pub fn new(collection: CollectionRef) -> Self {
        Self {
            collection,
            entries: Vec::new(),
            pending_error: None,
        }
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        if self.pending_error.is_none() {
            self.pending_error = Some(message.into());
        }
    }

    /// Resolve a collection name relative to this body's database;
    /// `"other"` inherits the database, `"db.other"` is explicit
    pub fn sibling(&self, raw: &str) -> CollectionRef {
        match raw.split_once('.') {
            Some((database, name)) => CollectionRef::new(database, name),
            None => CollectionRef::new(self.collection.database.clone(), raw),
        }
    }
}

/// Fluent composition shared by Find, Update, Replace and Delete
pub trait SearchOps: Sized {
    fn body(&self) -> &SearchBody;

    fn body_mut(&mut self) -> &mut SearchBody;

    /// Fresh builder of the same type bound to the same collection, handed
    /// to `not`/`and`/`or` closures
    fn child(&self) -> Self;

    fn into_body(self) -> SearchBody;

    #[doc(hidden)]
    fn push_condition(
        mut self,
        kind: ConditionKind,
        field: &str,
        value: Operand,
        second: Option<Operand>,
        aggregation: Option<Aggregation>,
    ) -> Self {
        self.body_mut().push(Entry::Condition {
            kind,
            field: FieldRef::parse(field),
            value,
            second,
            aggregation,
        });
        self
    }

    fn where_(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_condition(ConditionKind::Equals, field, value.into(), None, None)
    }

    /// Equality wrapped in a NOT operation entry
    fn where_not(mut self, field: &str, value: impl Into<Operand>) -> Self {
        let condition = Entry::condition(ConditionKind::Equals, field, value.into());
        self.body_mut().push(Entry::Operation {
            kind: OperationKind::Not,
            children: vec![condition],
        });
        self
    }

    /// Pattern match; accepts a literal wildcard string or a [`Pattern`]
    ///
    /// [`Pattern`]: crate::Pattern
    fn where_like(self, field: &str, pattern: impl Into<String>) -> Self {
        let pattern: String = pattern.into();
        self.push_condition(
            ConditionKind::Like,
            field,
            Operand::literal(pattern),
            None,
            None,
        )
    }

    fn where_lower(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_condition(ConditionKind::Lower, field, value.into(), None, None)
    }

    fn where_higher(self, field: &str, value: impl Into<Operand>) -> Self {
        self.push_condition(ConditionKind::Higher, field, value.into(), None, None)
    }

    fn where_is_null(self, field: &str) -> Self {
        self.push_condition(
            ConditionKind::Null,
            field,
            Operand::Literal(crate::Value::Null),
            None,
            None,
        )
    }

    /// Matches the empty string
    fn where_is_empty(self, field: &str) -> Self {
        self.push_condition(ConditionKind::Equals, field, Operand::literal(""), None, None)
    }

    /// Membership test; the operand may be a literal list, a prepared
    /// placeholder or a sub-select
    fn where_in(self, field: &str, values: impl Into<Operand>) -> Self {
        self.push_condition(ConditionKind::In, field, values.into(), None, None)
    }

    fn where_between(
        self,
        field: &str,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        self.push_condition(
            ConditionKind::Between,
            field,
            low.into(),
            Some(high.into()),
            None,
        )
    }

    fn where_aggregated(
        self,
        aggregation: Aggregation,
        field: &str,
        value: impl Into<Operand>,
    ) -> Self {
        self.push_condition(
            ConditionKind::Equals,
            field,
            value.into(),
            None,
            Some(aggregation),
        )
    }

    fn where_lower_aggregated(
        self,
        aggregation: Aggregation,
        field: &str,
        value: impl Into<Operand>,
    ) -> Self {
        self.push_condition(
            ConditionKind::Lower,
            field,
            value.into(),
            None,
            Some(aggregation),
        )
    }

    fn where_higher_aggregated(
        self,
        aggregation: Aggregation,
        field: &str,
        value: impl Into<Operand>,
    ) -> Self {
        self.push_condition(
            ConditionKind::Higher,
            field,
            value.into(),
            None,
            Some(aggregation),
        )
    }

    fn where_between_aggregated(
        self,
        aggregation: Aggregation,
        field: &str,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        self.push_condition(
            ConditionKind::Between,
            field,
            low.into(),
            Some(high.into()),
            Some(aggregation),
        )
    }

    #[doc(hidden)]
    fn operation(mut self, kind: OperationKind, f: impl FnOnce(Self) -> Self) -> Self {
        let child = f(self.child()).into_body();
        let body = self.body_mut();
        if let Some(error) = child.pending_error {
            body.record_error(error);
        }
        body.push(Entry::Operation {
            kind,
            children: child.entries,
        });
        self
    }

    /// All entries built by the closure are ANDed and grouped
    fn and(self, f: impl FnOnce(Self) -> Self) -> Self {
        self.operation(OperationKind::And, f)
    }

    /// All entries built by the closure are ORed and grouped
    fn or(self, f: impl FnOnce(Self) -> Self) -> Self {
        self.operation(OperationKind::Or, f)
    }

    /// Entries built by the closure are negated at the leaf level
    fn not(self, f: impl FnOnce(Self) -> Self) -> Self {
        self.operation(OperationKind::Not, f)
    }

    fn limit(mut self, limit: u64) -> Self {
        if limit == 0 {
            self.body_mut().record_error("limit must be at least 1");
        } else {
            self.body_mut().push(Entry::Limit { limit, offset: 0 });
        }
        self
    }

    /// Adjusts the offset of the previously declared limit
    fn offset(mut self, offset: u64) -> Self {
        let body = self.body_mut();
        let limit = body.entries.iter_mut().rev().find_map(|e| match e {
            Entry::Limit { offset, .. } => Some(offset),
            _ => None,
        });
        match limit {
            Some(slot) => *slot = offset,
            None => body.record_error("offset requires a limit"),
        }
        self
    }

    fn only_one(self) -> Self {
        self.limit(1)
    }

    /// Inclusive 1-based element range; `index(11, 20)` selects the
    /// eleventh through twentieth matching element
    fn index(mut self, start: u64, end: u64) -> Self {
        if start == 0 || end < start {
            self.body_mut()
                .record_error("index range must satisfy 1 <= start <= end");
            return self;
        }
        self.body_mut().push(Entry::Limit {
            limit: end - start + 1,
            offset: start - 1,
        });
        self
    }

    /// 1-indexed pagination; `page(1, n)` selects the first `n` elements
    fn page(mut self, page: u64, size: u64) -> Self {
        if page == 0 || size == 0 {
            self.body_mut()
                .record_error("page and size must be at least 1");
            return self;
        }
        self.body_mut().push(Entry::Limit {
            limit: size,
            offset: (page - 1) * size,
        });
        self
    }

    fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.body_mut().push(Entry::OrderBy {
            field: FieldRef::parse(field),
            direction,
            aggregation: None,
        });
        self
    }

    fn order_by_aggregated(
        mut self,
        aggregation: Aggregation,
        field: &str,
        direction: Direction,
    ) -> Self {
        self.body_mut().push(Entry::OrderBy {
            field: FieldRef::parse(field),
            direction,
            aggregation: Some(aggregation),
        });
        self
    }

    fn group_by(mut self, field: &str) -> Self {
        self.body_mut().push(Entry::GroupBy {
            field: FieldRef::parse(field),
            aggregation: None,
        });
        self
    }

    fn group_by_aggregated(mut self, aggregation: Aggregation, field: &str) -> Self {
        self.body_mut().push(Entry::GroupBy {
            field: FieldRef::parse(field),
            aggregation: Some(aggregation),
        });
        self
    }

    fn join(self, collection: &str) -> Self {
        self.join_with(collection, JoinKind::Inner)
    }

    fn join_with(mut self, collection: &str, kind: JoinKind) -> Self {
        let collection = self.body().sibling(collection);
        self.body_mut().push(Entry::Join {
            collection,
            kind,
            on: Vec::new(),
        });
        self
    }

    /// Adds an equality pair to the most recent join; either side may be
    /// qualified as `"collection.field"`
    fn on(mut self, left: &str, right: &str) -> Self {
        let pair = JoinOn {
            left: FieldRef::parse(left),
            right: FieldRef::parse(right),
        };
        let body = self.body_mut();
        let join = body.entries.iter_mut().rev().find_map(|e| match e {
            Entry::Join { on, .. } => Some(on),
            _ => None,
        });
        match join {
            Some(on) => on.push(pair),
            None => body.record_error("on requires a preceding join"),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ConditionKind;
    use crate::value::Value;

    fn find() -> FindQuery {
        FindQuery::new(CollectionRef::new("testdb", "user"))
    }

    #[test]
    fn test_entries_keep_call_order() {
        let query = find().where_("a", 1).where_("b", 2);
        let body = query.into_body();
        assert_eq!(body.entries.len(), 2);
        match &body.entries[0] {
            Entry::Condition { field, value, .. } => {
                assert_eq!(field.field, "a");
                assert_eq!(*value, Operand::Literal(Value::I32(1)));
            }
            other => panic!("expected condition, got {other:?}"),
        }
    }

    #[test]
    fn test_closure_entries_move_into_operation() {
        let query = find().and(|q| q.where_("a", 1).where_("b", 2));
        let body = query.into_body();
        assert_eq!(body.entries.len(), 1);
        match &body.entries[0] {
            Entry::Operation { kind, children } => {
                assert_eq!(*kind, OperationKind::And);
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected operation, got {other:?}"),
        }
    }

    #[test]
    fn test_where_not_wraps_in_not_operation() {
        let body = find().where_not("age", 30).into_body();
        match &body.entries[0] {
            Entry::Operation { kind, children } => {
                assert_eq!(*kind, OperationKind::Not);
                assert_eq!(children.len(), 1);
            }
            other => panic!("expected operation, got {other:?}"),
        }
    }

    #[test]
    fn test_where_is_empty_matches_empty_string() {
        let body = find().where_is_empty("name").into_body();
        match &body.entries[0] {
            Entry::Condition { kind, value, .. } => {
                assert_eq!(*kind, ConditionKind::Equals);
                assert_eq!(*value, Operand::Literal(Value::String(String::new())));
            }
            other => panic!("expected condition, got {other:?}"),
        }
    }

    #[test]
    fn test_page_matches_index_and_limit_offset() {
        let by_page = find().page(2, 10).into_body();
        let by_index = find().index(11, 20).into_body();
        let by_limit = find().limit(10).offset(10).into_body();
        let expected = Entry::Limit {
            limit: 10,
            offset: 10,
        };
        assert_eq!(by_page.entries[0], expected);
        assert_eq!(by_index.entries[0], expected);
        assert_eq!(by_limit.entries[0], expected);
    }

    #[test]
    fn test_first_page_starts_at_offset_zero() {
        let body = find().page(1, 25).into_body();
        assert_eq!(
            body.entries[0],
            Entry::Limit {
                limit: 25,
                offset: 0
            }
        );
    }

    #[test]
    fn test_zero_limit_records_error() {
        let body = find().limit(0).into_body();
        assert!(body.pending_error.is_some());
        assert!(body.entries.is_empty());
    }

    #[test]
    fn test_offset_without_limit_records_error() {
        let body = find().offset(5).into_body();
        assert!(body.pending_error.is_some());
    }

    #[test]
    fn test_on_without_join_records_error() {
        let body = find().on("id", "other.user_id").into_body();
        assert!(body.pending_error.is_some());
    }

    #[test]
    fn test_join_collects_on_pairs() {
        let body = find()
            .join("orders")
            .on("id", "orders.user_id")
            .on("tenant", "orders.tenant")
            .into_body();
        match &body.entries[0] {
            Entry::Join {
                collection,
                kind,
                on,
            } => {
                assert_eq!(collection, &CollectionRef::new("testdb", "orders"));
                assert_eq!(*kind, JoinKind::Inner);
                assert_eq!(on.len(), 2);
            }
            other => panic!("expected join, got {other:?}"),
        }
    }

    #[test]
    fn test_child_error_propagates_to_parent() {
        let body = find().or(|q| q.limit(0)).into_body();
        assert!(body.pending_error.is_some());
    }
}
