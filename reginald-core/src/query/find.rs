//! Find (select) query builder

use crate::aggregation::AggregationBuilder;
use crate::entry::{Aggregation, CollectionRef, FieldRef};
use crate::query::{SearchBody, SearchOps};

/// One projected column of a find query
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Field(FieldRef),
    FieldAs(FieldRef, String),
    Aggregated {
        aggregation: Aggregation,
        field: FieldRef,
        alias: Option<String>,
    },
    /// Computed column built from an aggregation expression
    Function {
        builder: AggregationBuilder,
        alias: String,
    },
}

/// Fluent select builder; no projection means `*`
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    body: SearchBody,
    projections: Vec<Projection>,
}

impl FindQuery {
    pub fn new(collection: CollectionRef) -> Self {
        Self {
            body: SearchBody::new(collection),
            projections: Vec::new(),
        }
    }

    pub fn get(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for field in fields {
            self.projections
                .push(Projection::Field(FieldRef::parse(&field.into())));
        }
        self
    }

    pub fn get_as(mut self, field: &str, alias: impl Into<String>) -> Self {
        self.projections
            .push(Projection::FieldAs(FieldRef::parse(field), alias.into()));
        self
    }

    pub fn get_aggregated(mut self, aggregation: Aggregation, field: &str) -> Self {
        self.projections.push(Projection::Aggregated {
            aggregation,
            field: FieldRef::parse(field),
            alias: None,
        });
        self
    }

    pub fn get_aggregated_as(
        mut self,
        aggregation: Aggregation,
        field: &str,
        alias: impl Into<String>,
    ) -> Self {
        self.projections.push(Projection::Aggregated {
            aggregation,
            field: FieldRef::parse(field),
            alias: Some(alias.into()),
        });
        self
    }

    pub fn get_function(mut self, builder: AggregationBuilder, alias: impl Into<String>) -> Self {
        self.projections.push(Projection::Function {
            builder,
            alias: alias.into(),
        });
        self
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub fn into_parts(self) -> (SearchBody, Vec<Projection>) {
        (self.body, self.projections)
    }
}

impl SearchOps for FindQuery {
    fn body(&self) -> &SearchBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut SearchBody {
        &mut self.body
    }

    fn child(&self) -> Self {
        FindQuery::new(self.body.collection.clone())
    }

    fn into_body(self) -> SearchBody {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find() -> FindQuery {
        FindQuery::new(CollectionRef::new("testdb", "user"))
    }

    #[test]
    fn test_no_projection_means_star() {
        assert!(find().projections().is_empty());
    }

    #[test]
    fn test_projection_accumulation() {
        let query = find()
            .get(["id", "name"])
            .get_as("created", "since")
            .get_aggregated_as(Aggregation::Count, "id", "total");
        assert_eq!(query.projections().len(), 4);
        assert_eq!(
            query.projections()[2],
            Projection::FieldAs(FieldRef::bare("created"), "since".to_string())
        );
    }

    #[test]
    fn test_qualified_projection_field() {
        let query = find().get(["orders.amount"]);
        match &query.projections()[0] {
            Projection::Field(field) => {
                assert_eq!(field.collection.as_deref(), Some("orders"));
                assert_eq!(field.field, "amount");
            }
            other => panic!("expected field, got {other:?}"),
        }
    }
}
