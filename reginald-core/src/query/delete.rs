//! Delete query builder

use crate::entry::CollectionRef;
use crate::query::{SearchBody, SearchOps};

/// Fluent delete builder; the full search composition applies
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    body: SearchBody,
}

impl DeleteQuery {
    pub fn new(collection: CollectionRef) -> Self {
        Self {
            body: SearchBody::new(collection),
        }
    }
}

impl SearchOps for DeleteQuery {
    fn body(&self) -> &SearchBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut SearchBody {
        &mut self.body
    }

    fn child(&self) -> Self {
        DeleteQuery::new(self.body.collection.clone())
    }

    fn into_body(self) -> SearchBody {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;

    #[test]
    fn test_delete_accumulates_conditions() {
        let body = DeleteQuery::new(CollectionRef::new("testdb", "user"))
            .where_("id", 7)
            .into_body();
        assert_eq!(body.entries.len(), 1);
        assert!(matches!(body.entries[0], Entry::Condition { .. }));
    }
}
