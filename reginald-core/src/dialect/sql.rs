//! Shared SQL walker for the relational dialects
//!
//! Walks a builder's entry list once, writing each entry into its clause
//! segment (join, where, group, order, limit). Segments carry their own bind
//! lists and are concatenated in emitted order, so bind positions always
//! match placeholder positions even when builder calls arrive out of clause
//! order. Positional prepared values are still consumed in call order.

use crate::aggregation::{AggregationBuilder, AggregationExpr};
use crate::dialect::rules::{
    AutoIncrementStyle, DefaultValueStyle, GeneratedKeysStyle, IndexStyle, LimitStyle,
    PlaceholderStyle, RelationalRules,
};
use crate::dialect::{Dialect, Environment, SqlStatement};
use crate::entry::{
    Aggregation, CollectionRef, ConditionKind, CreateEntry, Entry, FieldDefinition, FieldOption,
    FieldRef, ForeignKey, ForeignKeyOption, Operand, OperationKind,
};
use crate::error::{Error, Result};
use crate::query::{
    CreateQuery, DeleteQuery, FindQuery, InsertQuery, Projection, ReplaceQuery, SearchBody,
    SearchOps, UpdateQuery,
};
use crate::value::Value;

const MAX_IDENTIFIER_LEN: usize = 64;

/// A piece of SQL text with the binds its placeholders consume
#[derive(Debug, Default)]
struct Fragment {
    sql: String,
    binds: Vec<Value>,
}

use crate::dialect::ValueCursor as Cursor;

/// Clause segments of one search query, filled in entry order
#[derive(Debug, Default)]
struct Segments {
    join: Fragment,
    clause: Fragment,
    group: Fragment,
    order: Fragment,
    limit: Fragment,
    where_started: bool,
}

impl Segments {
    fn append_to(self, out: &mut Fragment) {
        for segment in [self.join, self.clause, self.group, self.order, self.limit] {
            out.sql.push_str(&segment.sql);
            out.binds.extend(segment.binds);
        }
    }
}

/// Position of an entry within the boolean clause structure
#[derive(Clone, Copy)]
struct ClauseCtx<'c> {
    connector: &'c str,
    first_in_group: bool,
    top_level: bool,
    negate: bool,
}

impl ClauseCtx<'_> {
    fn top() -> Self {
        ClauseCtx {
            connector: "AND",
            first_in_group: false,
            top_level: true,
            negate: false,
        }
    }
}

pub(crate) struct SqlTranslator<'a> {
    dialect: &'a Dialect,
    rules: &'a RelationalRules,
}

impl<'a> SqlTranslator<'a> {
    pub(crate) fn new(dialect: &'a Dialect, rules: &'a RelationalRules) -> Self {
        Self { dialect, rules }
    }

    pub(crate) fn find(&self, query: &FindQuery, values: &[Value]) -> Result<SqlStatement> {
        let mut cursor = Cursor::new(values);
        let fragment = self.select_fragment(query, &mut cursor)?;
        Ok(self.finish(fragment, Vec::new()))
    }

    pub(crate) fn delete(&self, query: &DeleteQuery, values: &[Value]) -> Result<SqlStatement> {
        let body = query.body();
        check_pending(body)?;
        let mut cursor = Cursor::new(values);
        let mut segments = Segments::default();
        self.walk(&body.entries, &mut segments, &mut cursor)?;

        let mut fragment = Fragment::default();
        fragment.sql = format!("DELETE FROM {}", self.collection_name(&body.collection));
        segments.append_to(&mut fragment);
        Ok(self.finish(fragment, Vec::new()))
    }

    pub(crate) fn update(&self, query: &UpdateQuery, values: &[Value]) -> Result<SqlStatement> {
        let body = query.body();
        check_pending(body)?;
        let mut cursor = Cursor::new(values);
        let mut set = Fragment::default();
        let mut segments = Segments::default();

        for entry in &body.entries {
            match entry {
                Entry::Set {
                    field,
                    value,
                    operator,
                } => {
                    if set.sql.is_empty() {
                        set.sql.push_str(" SET ");
                    } else {
                        set.sql.push(',');
                    }
                    let quoted = self.quoted_field(field);
                    set.sql.push_str(&quoted);
                    set.sql.push_str(" = ");
                    if let Some(symbol) = operator.symbol() {
                        set.sql.push_str(&quoted);
                        set.sql.push(' ');
                        set.sql.push_str(symbol);
                        set.sql.push(' ');
                    }
                    set.sql.push('?');
                    set.binds.push(cursor.resolve(value)?);
                }
                other => self.walk_entry(other, &mut segments, &mut cursor, ClauseCtx::top())?,
            }
        }
        if set.sql.is_empty() {
            return Err(Error::invalid_query("update requires at least one set"));
        }

        let mut fragment = Fragment::default();
        fragment.sql = format!("UPDATE {}", self.collection_name(&body.collection));
        // joins sit between the table and SET
        let join = std::mem::take(&mut segments.join);
        fragment.sql.push_str(&join.sql);
        fragment.binds.extend(join.binds);
        fragment.sql.push_str(&set.sql);
        fragment.binds.extend(set.binds);
        segments.append_to(&mut fragment);
        Ok(self.finish(fragment, Vec::new()))
    }

    pub(crate) fn replace(&self, query: &ReplaceQuery, values: &[Value]) -> Result<SqlStatement> {
        if !self.rules.supports_replace {
            return Err(Error::unsupported("replace", self.dialect.name));
        }
        let body = query.body();
        check_pending(body)?;
        let mut cursor = Cursor::new(values);
        let mut fields = Vec::new();
        let mut binds = Vec::new();
        for entry in &body.entries {
            match entry {
                Entry::Set {
                    field,
                    value,
                    operator,
                } => {
                    if operator.symbol().is_some() {
                        return Err(Error::invalid_query(
                            "arithmetic assignments are not valid in replace",
                        ));
                    }
                    fields.push(self.quoted_field(field));
                    binds.push(cursor.resolve(value)?);
                }
                _ => {
                    return Err(Error::invalid_query(
                        "replace matches by key and supports only set entries",
                    ))
                }
            }
        }
        if fields.is_empty() {
            return Err(Error::invalid_query("replace requires at least one set"));
        }
        let placeholders = vec!["?"; fields.len()].join(",");
        let sql = format!(
            "REPLACE INTO {} ({}) VALUES ({})",
            self.collection_name(&body.collection),
            fields.join(","),
            placeholders
        );
        Ok(self.finish(
            Fragment { sql, binds },
            Vec::new(),
        ))
    }

    pub(crate) fn insert(
        &self,
        query: &InsertQuery,
        values: &[Value],
        key_columns: &[&str],
    ) -> Result<SqlStatement> {
        if let Some(error) = query.pending_error() {
            return Err(Error::invalid_query(error));
        }
        let mut cursor = Cursor::new(values);
        let collection = self.collection_name(query.collection());
        let columns = query.columns();
        let field_list = columns
            .iter()
            .map(|(name, _)| self.rules.quote(name))
            .collect::<Vec<_>>()
            .join(",");

        let mut fragment = Fragment::default();
        if let Some(source) = query.source() {
            let select = self.select_fragment(source, &mut cursor)?;
            if columns.is_empty() {
                fragment.sql = format!("INSERT INTO {} {}", collection, select.sql);
            } else {
                fragment.sql = format!("INSERT INTO {} ({}) {}", collection, field_list, select.sql);
            }
            fragment.binds = select.binds;
        } else {
            if columns.is_empty() {
                return Err(Error::invalid_query("insert requires at least one field"));
            }
            let rows = columns[0].1.len();
            if rows == 0 {
                return Err(Error::invalid_query("insert requires at least one value"));
            }
            if columns.iter().any(|(_, list)| list.len() != rows) {
                return Err(Error::invalid_query(
                    "insert value lists must all have the same length",
                ));
            }
            // resolve in call order, emit row-major
            let mut resolved: Vec<Vec<Value>> = Vec::with_capacity(columns.len());
            for (_, operands) in columns {
                let mut list = Vec::with_capacity(rows);
                for operand in operands {
                    list.push(cursor.resolve(operand)?);
                }
                resolved.push(list);
            }
            let row_placeholders = format!("({})", vec!["?"; columns.len()].join(","));
            let all_rows = vec![row_placeholders; rows].join(",");
            fragment.sql = format!(
                "INSERT INTO {} ({}) VALUES {}",
                collection, field_list, all_rows
            );
            for row in 0..rows {
                for column in &resolved {
                    fragment.binds.push(column[row].clone());
                }
            }
        }

        if !key_columns.is_empty()
            && self.rules.generated_keys == GeneratedKeysStyle::Returning
        {
            let keys = key_columns
                .iter()
                .map(|key| self.rules.quote(key))
                .collect::<Vec<_>>()
                .join(",");
            fragment.sql.push_str(" RETURNING ");
            fragment.sql.push_str(&keys);
        }
        Ok(self.finish(fragment, Vec::new()))
    }

    pub(crate) fn create(&self, query: &CreateQuery) -> Result<SqlStatement> {
        let mut definitions: Vec<String> = Vec::new();
        let mut binds = Vec::new();
        let mut additional = Vec::new();
        for entry in query.entries() {
            match entry {
                CreateEntry::Field(field) => {
                    // index and constraint fragments follow the column that
                    // produced them
                    let mut extras = Vec::new();
                    let definition = self.field_definition(
                        field,
                        query.collection(),
                        &mut binds,
                        &mut extras,
                        &mut additional,
                    )?;
                    definitions.push(definition);
                    definitions.append(&mut extras);
                }
                CreateEntry::ForeignKey { field, key } => {
                    definitions.push(self.foreign_key_constraint(query.collection(), field, key));
                }
            }
        }
        if definitions.is_empty() && query.included_query().is_none() {
            return Err(Error::invalid_query("create requires at least one field"));
        }

        let mut fragment = Fragment::default();
        fragment.sql = format!(
            "CREATE TABLE IF NOT EXISTS {}",
            self.collection_name(query.collection())
        );
        // a pure create-as-select has no column list of its own
        if !definitions.is_empty() {
            fragment.sql.push_str(" (");
            fragment.sql.push_str(&definitions.join(","));
            fragment.sql.push(')');
        }
        fragment.binds = binds;
        if let Some(engine) = query.engine_name() {
            if self.rules.supports_engine {
                fragment.sql.push_str(" ENGINE=");
                fragment.sql.push_str(engine);
            }
        }
        if let Some(included) = query.included_query() {
            let mut cursor = Cursor::new(&[]);
            let select = self.select_fragment(included, &mut cursor)?;
            fragment.sql.push_str(" AS ");
            fragment.sql.push_str(&select.sql);
            fragment.binds.extend(select.binds);
        }
        Ok(self.finish(fragment, additional))
    }

    fn select_fragment(&self, query: &FindQuery, cursor: &mut Cursor) -> Result<Fragment> {
        let body = query.body();
        check_pending(body)?;

        let mut projection = Fragment::default();
        if query.projections().is_empty() {
            projection.sql.push('*');
        } else {
            for (i, entry) in query.projections().iter().enumerate() {
                if i > 0 {
                    projection.sql.push(',');
                }
                self.projection(entry, &mut projection, cursor)?;
            }
        }

        let mut segments = Segments::default();
        self.walk(&body.entries, &mut segments, cursor)?;

        let mut fragment = Fragment::default();
        fragment.sql = format!(
            "SELECT {} FROM {}",
            projection.sql,
            self.collection_name(&body.collection)
        );
        fragment.binds = projection.binds;
        segments.append_to(&mut fragment);
        Ok(fragment)
    }

    fn projection(
        &self,
        projection: &Projection,
        out: &mut Fragment,
        cursor: &mut Cursor,
    ) -> Result<()> {
        match projection {
            Projection::Field(field) => out.sql.push_str(&self.quoted_field(field)),
            Projection::FieldAs(field, alias) => {
                out.sql.push_str(&self.quoted_field(field));
                out.sql.push_str(" AS ");
                out.sql.push_str(alias);
            }
            Projection::Aggregated {
                aggregation,
                field,
                alias,
            } => {
                out.sql
                    .push_str(&self.aggregated_field(*aggregation, field));
                if let Some(alias) = alias {
                    out.sql.push_str(" AS ");
                    out.sql.push_str(alias);
                }
            }
            Projection::Function { builder, alias } => {
                self.aggregation_expr(builder, out, cursor)?;
                out.sql.push_str(" AS ");
                out.sql.push_str(alias);
            }
        }
        Ok(())
    }

    fn aggregation_expr(
        &self,
        builder: &AggregationBuilder,
        out: &mut Fragment,
        cursor: &mut Cursor,
    ) -> Result<()> {
        for (i, part) in builder.parts().iter().enumerate() {
            if i > 0 {
                out.sql.push(' ');
            }
            match part {
                AggregationExpr::Field(field) => out.sql.push_str(&self.quoted_field(field)),
                AggregationExpr::Operator(operator) => out.sql.push_str(operator.symbol()),
                AggregationExpr::Aggregation { kind, field } => {
                    out.sql.push_str(&self.aggregated_field(*kind, field))
                }
                AggregationExpr::Group(inner) => {
                    out.sql.push('(');
                    self.aggregation_expr(inner, out, cursor)?;
                    out.sql.push(')');
                }
                AggregationExpr::Value(operand) => {
                    out.sql.push('?');
                    out.binds.push(cursor.resolve(operand)?);
                }
            }
        }
        Ok(())
    }

    fn walk(&self, entries: &[Entry], segments: &mut Segments, cursor: &mut Cursor) -> Result<()> {
        for entry in entries {
            self.walk_entry(entry, segments, cursor, ClauseCtx::top())?;
        }
        Ok(())
    }

    fn walk_entry(
        &self,
        entry: &Entry,
        segments: &mut Segments,
        cursor: &mut Cursor,
        ctx: ClauseCtx,
    ) -> Result<()> {
        match entry {
            Entry::Condition {
                kind,
                field,
                value,
                second,
                aggregation,
            } => {
                self.clause_separator(segments, ctx);
                self.condition(
                    *kind,
                    field,
                    value,
                    second.as_ref(),
                    *aggregation,
                    ctx.negate,
                    segments,
                    cursor,
                )
            }
            Entry::Operation { kind, children } => match kind {
                OperationKind::Not => {
                    for (i, child) in children.iter().enumerate() {
                        let child_ctx = ClauseCtx {
                            first_in_group: ctx.first_in_group && i == 0,
                            negate: !ctx.negate,
                            ..ctx
                        };
                        self.walk_entry(child, segments, cursor, child_ctx)?;
                    }
                    Ok(())
                }
                OperationKind::And | OperationKind::Or => {
                    self.clause_separator(segments, ctx);
                    if ctx.negate {
                        segments.clause.sql.push_str("NOT ");
                    }
                    segments.clause.sql.push('(');
                    let symbol = if *kind == OperationKind::And {
                        "AND"
                    } else {
                        "OR"
                    };
                    for (i, child) in children.iter().enumerate() {
                        let child_ctx = ClauseCtx {
                            connector: symbol,
                            first_in_group: i == 0,
                            top_level: false,
                            negate: false,
                        };
                        self.walk_entry(child, segments, cursor, child_ctx)?;
                    }
                    segments.clause.sql.push(')');
                    Ok(())
                }
            },
            Entry::Join {
                collection,
                kind,
                on,
            } => {
                let join = &mut segments.join;
                join.sql.push(' ');
                join.sql.push_str(kind.sql_name());
                join.sql.push_str(" JOIN ");
                join.sql.push_str(&self.collection_name(collection));
                for (i, pair) in on.iter().enumerate() {
                    join.sql.push_str(if i == 0 { " ON " } else { " AND " });
                    join.sql.push_str(&self.quoted_field(&pair.left));
                    join.sql.push_str(" = ");
                    join.sql.push_str(&self.quoted_field(&pair.right));
                }
                Ok(())
            }
            Entry::Limit { limit, offset } => {
                if !segments.limit.sql.is_empty() {
                    return Err(Error::invalid_query(
                        "query can't have more than one limit and offset",
                    ));
                }
                match self.rules.limit_style {
                    LimitStyle::LimitOffset => {
                        segments.limit.sql.push_str(" LIMIT ? OFFSET ?");
                        segments.limit.binds.push(Value::I64(*limit as i64));
                        segments.limit.binds.push(Value::I64(*offset as i64));
                    }
                    LimitStyle::OffsetFetch => {
                        segments
                            .limit
                            .sql
                            .push_str(" OFFSET ? ROWS FETCH NEXT ? ROWS ONLY");
                        segments.limit.binds.push(Value::I64(*offset as i64));
                        segments.limit.binds.push(Value::I64(*limit as i64));
                    }
                }
                Ok(())
            }
            Entry::OrderBy {
                field,
                direction,
                aggregation,
            } => {
                let order = &mut segments.order;
                order
                    .sql
                    .push_str(if order.sql.is_empty() { " ORDER BY " } else { "," });
                match aggregation {
                    Some(aggregation) => order
                        .sql
                        .push_str(&self.aggregated_field(*aggregation, field)),
                    None => order.sql.push_str(&self.quoted_field(field)),
                }
                order.sql.push(' ');
                order.sql.push_str(direction.sql_name());
                Ok(())
            }
            Entry::GroupBy { field, aggregation } => {
                let group = &mut segments.group;
                group
                    .sql
                    .push_str(if group.sql.is_empty() { " GROUP BY " } else { "," });
                match aggregation {
                    Some(aggregation) => group
                        .sql
                        .push_str(&self.aggregated_field(*aggregation, field)),
                    None => group.sql.push_str(&self.quoted_field(field)),
                }
                Ok(())
            }
            Entry::Set { .. } => Err(Error::translation(
                "assignment entry outside an update or replace query",
            )),
        }
    }

    fn clause_separator(&self, segments: &mut Segments, ctx: ClauseCtx) {
        if ctx.top_level {
            if segments.where_started {
                segments.clause.sql.push_str(" AND ");
            } else {
                segments.clause.sql.push_str(" WHERE ");
                segments.where_started = true;
            }
        } else if !ctx.first_in_group {
            segments.clause.sql.push(' ');
            segments.clause.sql.push_str(ctx.connector);
            segments.clause.sql.push(' ');
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn condition(
        &self,
        kind: ConditionKind,
        field: &FieldRef,
        value: &Operand,
        second: Option<&Operand>,
        aggregation: Option<Aggregation>,
        negate: bool,
        segments: &mut Segments,
        cursor: &mut Cursor,
    ) -> Result<()> {
        let clause = &mut segments.clause;
        let field_part = match aggregation {
            Some(aggregation) => self.aggregated_field(aggregation, field),
            None => self.quoted_field(field),
        };
        match kind {
            ConditionKind::Equals
            | ConditionKind::Empty
            | ConditionKind::Like
            | ConditionKind::Lower
            | ConditionKind::Higher => {
                if negate {
                    clause.sql.push_str("NOT ");
                }
                clause.sql.push_str(&field_part);
                clause.sql.push_str(compare_symbol(kind));
                match value {
                    Operand::Subquery(sub) => {
                        let select = self.select_fragment(sub, cursor)?;
                        clause.sql.push('(');
                        clause.sql.push_str(&select.sql);
                        clause.sql.push(')');
                        clause.binds.extend(select.binds);
                    }
                    other => {
                        clause.sql.push('?');
                        clause.binds.push(cursor.resolve(other)?);
                    }
                }
            }
            ConditionKind::Null => {
                clause.sql.push_str(&field_part);
                clause
                    .sql
                    .push_str(if negate { " IS NOT NULL" } else { " IS NULL" });
            }
            ConditionKind::In => {
                if negate {
                    clause.sql.push_str("NOT ");
                }
                clause.sql.push_str(&field_part);
                clause.sql.push_str(" IN (");
                match value {
                    Operand::Subquery(sub) => {
                        let select = self.select_fragment(sub, cursor)?;
                        clause.sql.push_str(&select.sql);
                        clause.binds.extend(select.binds);
                    }
                    other => {
                        let resolved = cursor.resolve(other)?;
                        let elements = match resolved {
                            Value::Array(elements) => elements,
                            single => vec![single],
                        };
                        if elements.is_empty() {
                            return Err(Error::invalid_query("IN requires at least one value"));
                        }
                        let placeholders = vec!["?"; elements.len()].join(",");
                        clause.sql.push_str(&placeholders);
                        clause.binds.extend(elements);
                    }
                }
                clause.sql.push(')');
            }
            ConditionKind::Between => {
                if negate {
                    clause.sql.push_str("NOT ");
                }
                clause.sql.push_str(&field_part);
                clause.sql.push_str(" BETWEEN ? AND ?");
                let low = cursor.resolve(value)?;
                let high = cursor.resolve(second.ok_or_else(|| {
                    Error::translation("between condition is missing its upper bound")
                })?)?;
                clause.binds.push(low);
                clause.binds.push(high);
            }
        }
        Ok(())
    }

    fn field_definition(
        &self,
        field: &FieldDefinition,
        collection: &CollectionRef,
        binds: &mut Vec<Value>,
        inline_indexes: &mut Vec<String>,
        additional: &mut Vec<SqlStatement>,
    ) -> Result<String> {
        let auto_increment = field.options.contains(&FieldOption::AutoIncrement);
        let info = (self.rules.type_info)(field.data_type);

        let mut def = self.rules.quote(&field.name);
        def.push(' ');
        if auto_increment && self.rules.auto_increment == AutoIncrementStyle::Serial {
            def.push_str("SERIAL");
        } else {
            def.push_str(info.name);
            if info.sizeable {
                if let Some(size) = field.size.or(info.default_size) {
                    def.push('(');
                    def.push_str(&size.to_string());
                    def.push(')');
                }
            }
        }

        if let Some(default) = &field.default_value {
            match self.rules.default_values {
                DefaultValueStyle::Bind => {
                    def.push_str(" DEFAULT ?");
                    binds.push(default.clone());
                }
                DefaultValueStyle::Inline => {
                    def.push_str(" DEFAULT ");
                    def.push_str(&default.to_sql_literal());
                }
            }
        }

        if auto_increment {
            match self.rules.auto_increment {
                AutoIncrementStyle::Keyword => def.push_str(" AUTO_INCREMENT"),
                AutoIncrementStyle::Identity => def.push_str(" IDENTITY(1,1)"),
                AutoIncrementStyle::Serial => {}
            }
        }
        let primary = field.options.contains(&FieldOption::PrimaryKey);
        if primary {
            def.push_str(" PRIMARY KEY");
        }
        if field.options.contains(&FieldOption::Unique)
            || (primary && self.rules.primary_key_implies_unique)
        {
            def.push_str(" UNIQUE");
        }
        if field.options.contains(&FieldOption::NotNull) {
            def.push_str(" NOT NULL");
        }

        for option in &field.options {
            let unique = match option {
                FieldOption::Index => false,
                FieldOption::UniqueIndex => true,
                _ => continue,
            };
            let name = index_name(collection, &field.name);
            match self.rules.index_style {
                IndexStyle::Inline => {
                    let keyword = if unique { "UNIQUE INDEX" } else { "INDEX" };
                    inline_indexes.push(format!(
                        "{} {}({})",
                        keyword,
                        self.rules.quote(&name),
                        self.rules.quote(&field.name)
                    ));
                }
                IndexStyle::SeparateStatement => {
                    let keyword = if unique {
                        "CREATE UNIQUE INDEX IF NOT EXISTS"
                    } else {
                        "CREATE INDEX IF NOT EXISTS"
                    };
                    additional.push(SqlStatement::new(
                        format!(
                            "{} {} ON {}({})",
                            keyword,
                            self.rules.quote(&name),
                            self.collection_name(collection),
                            self.rules.quote(&field.name)
                        ),
                        Vec::new(),
                    ));
                }
            }
        }

        if let Some(key) = &field.foreign_key {
            inline_indexes.push(self.foreign_key_constraint(collection, &field.name, key));
        }
        Ok(def)
    }

    fn foreign_key_constraint(
        &self,
        collection: &CollectionRef,
        field: &str,
        key: &ForeignKey,
    ) -> String {
        let name = index_name(collection, field);
        let target = CollectionRef::new(key.database.clone(), key.collection.clone());
        let mut constraint = format!(
            "CONSTRAINT {} FOREIGN KEY({}) REFERENCES {}({})",
            self.rules.quote(&name),
            self.rules.quote(field),
            self.collection_name(&target),
            self.rules.quote(&key.field)
        );
        if key.delete_option != ForeignKeyOption::Default {
            constraint.push_str(" ON DELETE ");
            constraint.push_str(key.delete_option.sql_name());
        }
        if key.update_option != ForeignKeyOption::Default {
            constraint.push_str(" ON UPDATE ");
            constraint.push_str(key.update_option.sql_name());
        }
        constraint
    }

    fn aggregated_field(&self, aggregation: Aggregation, field: &FieldRef) -> String {
        format!("{}({})", aggregation.sql_name(), self.quoted_field(field))
    }

    fn quoted_field(&self, field: &FieldRef) -> String {
        let mut parts = Vec::with_capacity(3);
        if self.dialect.environment == Environment::Remote {
            if let Some(database) = &field.database {
                parts.push(self.rules.quote(database));
            }
        }
        if let Some(collection) = &field.collection {
            parts.push(self.rules.quote(collection));
        }
        parts.push(self.rules.quote(&field.field));
        parts.join(".")
    }

    fn collection_name(&self, collection: &CollectionRef) -> String {
        match self.dialect.environment {
            Environment::Remote => format!(
                "{}.{}",
                self.rules.quote(&collection.database),
                self.rules.quote(&collection.name)
            ),
            Environment::Local => self.rules.quote(&collection.name),
        }
    }

    fn finish(&self, fragment: Fragment, additional: Vec<SqlStatement>) -> SqlStatement {
        let renumber = self.rules.placeholders == PlaceholderStyle::Dollar;
        SqlStatement {
            sql: if renumber {
                number_placeholders(&fragment.sql)
            } else {
                fragment.sql
            },
            binds: fragment.binds,
            additional: additional
                .into_iter()
                .map(|statement| SqlStatement {
                    sql: if renumber {
                        number_placeholders(&statement.sql)
                    } else {
                        statement.sql
                    },
                    ..statement
                })
                .collect(),
        }
    }
}

fn check_pending(body: &SearchBody) -> Result<()> {
    match &body.pending_error {
        Some(error) => Err(Error::invalid_query(error.clone())),
        None => Ok(()),
    }
}

fn compare_symbol(kind: ConditionKind) -> &'static str {
    match kind {
        ConditionKind::Equals | ConditionKind::Empty => " = ",
        ConditionKind::Like => " LIKE ",
        ConditionKind::Lower => " < ",
        ConditionKind::Higher => " > ",
        _ => unreachable!("no compare symbol for {kind:?}"),
    }
}

/// Deterministic index/constraint name, truncated to the common 64-char
/// identifier limit
fn index_name(collection: &CollectionRef, field: &str) -> String {
    let mut name = format!("{}{}{}", collection.database, collection.name, field);
    name.truncate(MAX_IDENTIFIER_LEN);
    name
}

/// Renumbers `?` placeholders to `$1…$n`, skipping string literals
fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0u32;
    let mut in_string = false;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_string = !in_string;
                out.push(ch);
            }
            '?' if !in_string => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(ch),
        }
    }
    out
}
