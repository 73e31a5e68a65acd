//! Builder for computed-column expressions
//!
//! An `AggregationBuilder` collects an ordered expression list (fields,
//! arithmetic operators, aggregation calls, nested groups, values) that the
//! SQL translators render into a projection or condition context.

pub use crate::entry::Aggregation;
use crate::entry::{FieldRef, Operand};

/// Arithmetic operator between two expression parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl ArithmeticOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Power => "^",
        }
    }
}

/// One part of an aggregation expression, emitted in call order
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationExpr {
    Field(FieldRef),
    Operator(ArithmeticOperator),
    Aggregation { kind: Aggregation, field: FieldRef },
    /// Nested expression, emitted parenthesized
    Group(Box<AggregationBuilder>),
    Value(Operand),
}

/// Fluent builder for a computed-column expression
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationBuilder {
    parts: Vec<AggregationExpr>,
    alias: Option<String>,
    aliasable: bool,
}

impl AggregationBuilder {
    /// Top-level builder; `alias` is honored
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            alias: None,
            aliasable: true,
        }
    }

    /// Nested builder; aliases make no sense inside an expression and are
    /// silently ignored
    fn nested() -> Self {
        Self {
            parts: Vec::new(),
            alias: None,
            aliasable: false,
        }
    }

    pub fn field(mut self, field: &str) -> Self {
        self.parts.push(AggregationExpr::Field(FieldRef::parse(field)));
        self
    }

    pub fn operator(mut self, operator: ArithmeticOperator) -> Self {
        self.parts.push(AggregationExpr::Operator(operator));
        self
    }

    pub fn aggregation(mut self, kind: Aggregation, field: &str) -> Self {
        self.parts.push(AggregationExpr::Aggregation {
            kind,
            field: FieldRef::parse(field),
        });
        self
    }

    /// Nested parenthesized expression
    pub fn builder(mut self, f: impl FnOnce(AggregationBuilder) -> AggregationBuilder) -> Self {
        let child = f(AggregationBuilder::nested());
        self.parts.push(AggregationExpr::Group(Box::new(child)));
        self
    }

    /// Literal value; `Operand::Prepared` marks a late-bound placeholder
    /// filled from the positional values passed to execute
    pub fn value(mut self, value: impl Into<Operand>) -> Self {
        self.parts.push(AggregationExpr::Value(value.into()));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        if self.aliasable {
            self.alias = Some(alias.into());
        }
        self
    }

    pub fn parts(&self) -> &[AggregationExpr] {
        &self.parts
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

impl Default for AggregationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_parts_keep_call_order() {
        let builder = AggregationBuilder::new()
            .aggregation(Aggregation::Sum, "amount")
            .operator(ArithmeticOperator::Divide)
            .value(100);
        assert_eq!(builder.parts().len(), 3);
        assert!(matches!(
            builder.parts()[0],
            AggregationExpr::Aggregation {
                kind: Aggregation::Sum,
                ..
            }
        ));
        assert!(matches!(
            builder.parts()[2],
            AggregationExpr::Value(Operand::Literal(Value::I32(100)))
        ));
    }

    #[test]
    fn test_alias_on_top_level_builder() {
        let builder = AggregationBuilder::new().field("age").alias("years");
        assert_eq!(builder.alias_name(), Some("years"));
    }

    #[test]
    fn test_alias_ignored_on_nested_builder() {
        let builder = AggregationBuilder::new()
            .builder(|b| b.field("a").alias("inner"));
        match &builder.parts()[0] {
            AggregationExpr::Group(child) => assert_eq!(child.alias_name(), None),
            other => panic!("expected group, got {other:?}"),
        }
    }
}
