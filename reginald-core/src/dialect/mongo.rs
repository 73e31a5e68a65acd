//! Entry-tree translation to MongoDB filter documents and pipeline stages
//!
//! Conditions map to filter documents, boolean operations to `$and`/`$or`
//! with negation threaded down to leaf-level `$not`, joins to `$lookup`
//! stages with let-bound local fields, and result windows to the
//! `$limit(limit+offset)` + `$skip(offset)` idiom.

use serde_json::{json, Map, Value as Json};

use crate::dialect::{MongoStatement, ValueCursor};
use crate::entry::{
    Aggregation, CollectionRef, ConditionKind, Direction, Entry, FieldRef, JoinOn, Operand,
    OperationKind, SetOperator,
};
use crate::error::{Error, Result};
use crate::query::{
    CreateQuery, DeleteQuery, FindQuery, InsertQuery, ReplaceQuery, SearchOps, UpdateQuery,
};
use crate::value::Value;

const DIALECT: &str = "MongoDB";

/// Accumulated pieces of one search-family translation
#[derive(Default)]
struct Search {
    filters: Vec<Json>,
    lookups: Vec<Json>,
    sort: Map<String, Json>,
    /// `$unwind`/`$group`/`$sort` triples for aggregated order-by entries
    aggregated_sorts: Vec<Json>,
    groups: Vec<(String, Option<Aggregation>)>,
    limit: Option<(u64, u64)>,
}

impl Search {
    fn filter_doc(&mut self) -> Option<Json> {
        match self.filters.len() {
            0 => None,
            1 => Some(self.filters.remove(0)),
            _ => Some(json!({ "$and": std::mem::take(&mut self.filters) })),
        }
    }
}

pub(super) fn find(query: &FindQuery, values: &[Value]) -> Result<MongoStatement> {
    let body = query.body();
    check_pending(&body.pending_error)?;
    let mut cursor = ValueCursor::new(values);
    let mut search = Search::default();
    walk(&body.entries, &mut search, &mut cursor, false)?;

    let mut pipeline = Vec::new();
    pipeline.extend(std::mem::take(&mut search.lookups));
    if let Some(filter) = search.filter_doc() {
        pipeline.push(json!({ "$match": filter }));
    }
    if !search.groups.is_empty() {
        pipeline.push(group_stage(&search.groups));
    }
    pipeline.extend(std::mem::take(&mut search.aggregated_sorts));
    if !search.sort.is_empty() {
        pipeline.push(json!({ "$sort": Json::Object(std::mem::take(&mut search.sort)) }));
    }
    if let Some((limit, offset)) = search.limit {
        pipeline.push(json!({ "$limit": limit + offset }));
        if offset > 0 {
            pipeline.push(json!({ "$skip": offset }));
        }
    }
    if !query.projections().is_empty() {
        pipeline.push(projection_stage(query)?);
    }
    Ok(MongoStatement::Find {
        collection: body.collection.name.clone(),
        pipeline,
    })
}

pub(super) fn delete(query: &DeleteQuery, values: &[Value]) -> Result<MongoStatement> {
    let body = query.body();
    check_pending(&body.pending_error)?;
    let mut cursor = ValueCursor::new(values);
    let filters = filters_only(&body.entries, &mut cursor)?;
    Ok(MongoStatement::Delete {
        collection: body.collection.name.clone(),
        filter: combine(filters),
    })
}

pub(super) fn update(query: &UpdateQuery, values: &[Value]) -> Result<MongoStatement> {
    let body = query.body();
    check_pending(&body.pending_error)?;
    let mut cursor = ValueCursor::new(values);
    let (filter, update) = split_update(&body.entries, &mut cursor)?;
    Ok(MongoStatement::Update {
        collection: body.collection.name.clone(),
        filter,
        update,
        upsert: false,
    })
}

pub(super) fn replace(query: &ReplaceQuery, values: &[Value]) -> Result<MongoStatement> {
    let body = query.body();
    check_pending(&body.pending_error)?;
    let mut cursor = ValueCursor::new(values);
    let (filter, update) = split_update(&body.entries, &mut cursor)?;
    Ok(MongoStatement::Update {
        collection: body.collection.name.clone(),
        filter,
        update,
        upsert: true,
    })
}

pub(super) fn insert(query: &InsertQuery, values: &[Value]) -> Result<MongoStatement> {
    if let Some(error) = query.pending_error() {
        return Err(Error::invalid_query(error));
    }
    if query.source().is_some() {
        return Err(Error::unsupported("insert from select", DIALECT));
    }
    let columns = query.columns();
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
    let mut cursor = ValueCursor::new(values);
    let mut resolved: Vec<Vec<Value>> = Vec::with_capacity(columns.len());
    for (_, operands) in columns {
        let mut list = Vec::with_capacity(rows);
        for operand in operands {
            list.push(cursor.resolve(operand)?);
        }
        resolved.push(list);
    }
    let mut documents = Vec::with_capacity(rows);
    for row in 0..rows {
        let mut document = Map::new();
        for (index, (name, _)) in columns.iter().enumerate() {
            document.insert(name.clone(), resolved[index][row].to_json());
        }
        documents.push(Json::Object(document));
    }
    Ok(MongoStatement::Insert {
        collection: query.collection().name.clone(),
        documents,
    })
}

pub(super) fn create(query: &CreateQuery) -> Result<MongoStatement> {
    if query.included_query().is_some() {
        return Err(Error::unsupported("create from select", DIALECT));
    }
    // collections are schemaless; field declarations carry no options
    Ok(MongoStatement::Create {
        collection: query.collection().name.clone(),
        options: json!({ "type": query.kind().name() }),
    })
}

fn walk(
    entries: &[Entry],
    search: &mut Search,
    cursor: &mut ValueCursor,
    negate: bool,
) -> Result<()> {
    for entry in entries {
        match entry {
            Entry::Condition {
                kind,
                field,
                value,
                second,
                aggregation,
            } => {
                if aggregation.is_some() {
                    return Err(Error::unsupported("aggregated condition", DIALECT));
                }
                search.filters.push(condition_doc(
                    *kind,
                    field,
                    value,
                    second.as_ref(),
                    negate,
                    cursor,
                )?);
            }
            Entry::Operation { kind, children } => {
                search.filters.push(operation_doc(*kind, children, cursor, negate)?)
            }
            Entry::Join { collection, on, .. } => {
                search.lookups.push(lookup_stage(collection, on))
            }
            Entry::Limit { limit, offset } => {
                if search.limit.is_some() {
                    return Err(Error::invalid_query(
                        "query can't have more than one limit and offset",
                    ));
                }
                search.limit = Some((*limit, *offset));
            }
            Entry::OrderBy {
                field,
                direction,
                aggregation,
            } => {
                let order = match direction {
                    Direction::Asc => 1,
                    Direction::Desc => -1,
                };
                let path = field_path(field);
                match aggregation {
                    Some(aggregation) => {
                        // unwind the field, re-accumulate, then sort the result
                        search.aggregated_sorts.push(json!({ "$unwind": format!("${path}") }));
                        search.aggregated_sorts.push(json!({
                            "$group": {
                                "_id": "$_id",
                                path.clone(): accumulator_doc(*aggregation, &path)
                            }
                        }));
                        search
                            .aggregated_sorts
                            .push(json!({ "$sort": { path: order } }));
                    }
                    None => {
                        search.sort.insert(path, json!(order));
                    }
                }
            }
            Entry::GroupBy { field, aggregation } => {
                search.groups.push((field_path(field), *aggregation));
            }
            Entry::Set { .. } => {
                return Err(Error::translation(
                    "assignment entry outside an update or replace query",
                ))
            }
        }
    }
    Ok(())
}

/// Filter documents only; anything else is invalid in this position
fn filters_only(entries: &[Entry], cursor: &mut ValueCursor) -> Result<Vec<Json>> {
    let mut filters = Vec::new();
    for entry in entries {
        match entry {
            Entry::Condition {
                kind,
                field,
                value,
                second,
                aggregation,
            } => {
                if aggregation.is_some() {
                    return Err(Error::unsupported("aggregated condition", DIALECT));
                }
                filters.push(condition_doc(*kind, field, value, second.as_ref(), false, cursor)?);
            }
            Entry::Operation { kind, children } => {
                filters.push(operation_doc(*kind, children, cursor, false)?)
            }
            Entry::Join { .. } => return Err(Error::unsupported("join in delete", DIALECT)),
            other => {
                return Err(Error::translation(format!(
                    "entry is not valid in a delete: {other:?}"
                )))
            }
        }
    }
    Ok(filters)
}

fn operation_doc(
    kind: OperationKind,
    children: &[Entry],
    cursor: &mut ValueCursor,
    negate: bool,
) -> Result<Json> {
    match kind {
        OperationKind::Not => {
            let docs = child_filters(children, cursor, !negate)?;
            Ok(combine(docs))
        }
        OperationKind::And => {
            let docs = child_filters(children, cursor, negate)?;
            Ok(json!({ "$and": docs }))
        }
        OperationKind::Or => {
            let docs = child_filters(children, cursor, negate)?;
            Ok(json!({ "$or": docs }))
        }
    }
}

fn child_filters(children: &[Entry], cursor: &mut ValueCursor, negate: bool) -> Result<Vec<Json>> {
    let mut docs = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Entry::Condition {
                kind,
                field,
                value,
                second,
                aggregation,
            } => {
                if aggregation.is_some() {
                    return Err(Error::unsupported("aggregated condition", DIALECT));
                }
                docs.push(condition_doc(*kind, field, value, second.as_ref(), negate, cursor)?);
            }
            Entry::Operation { kind, children } => {
                docs.push(operation_doc(*kind, children, cursor, negate)?)
            }
            other => {
                return Err(Error::translation(format!(
                    "only conditions can be grouped in a boolean operation, found {other:?}"
                )))
            }
        }
    }
    Ok(docs)
}

fn condition_doc(
    kind: ConditionKind,
    field: &FieldRef,
    value: &Operand,
    second: Option<&Operand>,
    negate: bool,
    cursor: &mut ValueCursor,
) -> Result<Json> {
    let path = field_path(field);
    let doc = match kind {
        ConditionKind::Equals | ConditionKind::Empty => {
            let value = resolve_json(value, cursor)?;
            if negate {
                json!({ path: { "$not": { "$eq": value } } })
            } else {
                json!({ path: value })
            }
        }
        ConditionKind::Like => {
            let pattern = match cursor.resolve(value)? {
                Value::String(pattern) => pattern,
                other => {
                    return Err(Error::conversion(other.type_name(), "LIKE pattern"));
                }
            };
            let regex = like_to_regex(&pattern);
            wrap_not(path, json!({ "$regex": regex }), negate)
        }
        ConditionKind::Lower => {
            wrap_not(path, json!({ "$lt": resolve_json(value, cursor)? }), negate)
        }
        ConditionKind::Higher => {
            wrap_not(path, json!({ "$gt": resolve_json(value, cursor)? }), negate)
        }
        ConditionKind::Null => {
            if negate {
                json!({ path: { "$not": { "$eq": Json::Null } } })
            } else {
                json!({ path: Json::Null })
            }
        }
        ConditionKind::In => {
            let elements = match cursor.resolve(value)? {
                Value::Array(elements) => elements,
                single => vec![single],
            };
            let elements: Vec<Json> = elements.iter().map(Value::to_json).collect();
            wrap_not(path, json!({ "$in": elements }), negate)
        }
        ConditionKind::Between => {
            let low = resolve_json(value, cursor)?;
            let high = resolve_json(
                second.ok_or_else(|| {
                    Error::translation("between condition is missing its upper bound")
                })?,
                cursor,
            )?;
            wrap_not(path, json!({ "$gte": low, "$lte": high }), negate)
        }
    };
    Ok(doc)
}

fn wrap_not(path: String, operator_doc: Json, negate: bool) -> Json {
    if negate {
        json!({ path: { "$not": operator_doc } })
    } else {
        json!({ path: operator_doc })
    }
}

fn resolve_json(operand: &Operand, cursor: &mut ValueCursor) -> Result<Json> {
    match operand {
        Operand::Subquery(_) => Err(Error::unsupported("subquery", DIALECT)),
        other => Ok(cursor.resolve(other)?.to_json()),
    }
}

/// `$lookup` with let-bound local fields and an `$expr`/`$and` equality
/// pipeline over the declared on-pairs
fn lookup_stage(joined: &CollectionRef, on: &[JoinOn]) -> Json {
    let mut bindings = Map::new();
    let mut equalities = Vec::with_capacity(on.len());
    for pair in on {
        let (local, foreign) = if pair.right.collection.as_deref() == Some(joined.name.as_str()) {
            (&pair.left, &pair.right)
        } else {
            (&pair.right, &pair.left)
        };
        let local_field = local.field.clone();
        bindings.insert(local_field.clone(), json!(format!("${local_field}")));
        equalities.push(json!({
            "$eq": [format!("$${local_field}"), format!("${}", foreign.field)]
        }));
    }
    json!({
        "$lookup": {
            "from": joined.name,
            "let": Json::Object(bindings),
            "pipeline": [{ "$match": { "$expr": { "$and": equalities } } }],
            "as": joined.name
        }
    })
}

/// Accumulator document applied to one field. COUNT counts occurrences, so
/// it sums the literal 1 instead of folding the field's values.
fn accumulator_doc(aggregation: Aggregation, path: &str) -> Json {
    match aggregation {
        Aggregation::Count => json!({ "$sum": 1 }),
        other => json!({ other.mongo_name(): format!("${path}") }),
    }
}

fn group_stage(groups: &[(String, Option<Aggregation>)]) -> Json {
    let plain: Vec<&String> = groups
        .iter()
        .filter(|(_, aggregation)| aggregation.is_none())
        .map(|(path, _)| path)
        .collect();
    let id = match plain.as_slice() {
        [] => Json::Null,
        [single] => json!(format!("${single}")),
        many => {
            let mut id = Map::new();
            for path in many {
                id.insert((*path).clone(), json!(format!("${path}")));
            }
            Json::Object(id)
        }
    };
    let mut stage = Map::new();
    stage.insert("_id".to_string(), id);
    for (path, aggregation) in groups {
        if let Some(aggregation) = aggregation {
            stage.insert(path.clone(), accumulator_doc(*aggregation, path));
        }
    }
    json!({ "$group": Json::Object(stage) })
}

fn projection_stage(query: &FindQuery) -> Result<Json> {
    use crate::query::Projection;
    let mut projection = Map::new();
    for entry in query.projections() {
        match entry {
            Projection::Field(field) => {
                projection.insert(field_path(field), json!(1));
            }
            Projection::FieldAs(field, alias) => {
                projection.insert(alias.clone(), json!(format!("${}", field_path(field))));
            }
            Projection::Aggregated { .. } | Projection::Function { .. } => {
                return Err(Error::unsupported("aggregated projection", DIALECT));
            }
        }
    }
    Ok(json!({ "$project": Json::Object(projection) }))
}

fn split_update(entries: &[Entry], cursor: &mut ValueCursor) -> Result<(Json, Json)> {
    let mut filters = Vec::new();
    let mut set = Map::new();
    let mut inc = Map::new();
    let mut mul = Map::new();
    for entry in entries {
        match entry {
            Entry::Set {
                field,
                value,
                operator,
            } => {
                let path = field_path(field);
                let resolved = cursor.resolve(value)?;
                match operator {
                    SetOperator::Assign => {
                        set.insert(path, resolved.to_json());
                    }
                    SetOperator::Add => {
                        inc.insert(path, numeric(&resolved)?);
                    }
                    SetOperator::Subtract => {
                        let amount = as_f64(&resolved)?;
                        inc.insert(path, json!(-amount));
                    }
                    SetOperator::Multiply => {
                        mul.insert(path, numeric(&resolved)?);
                    }
                    SetOperator::Divide => {
                        let divisor = as_f64(&resolved)?;
                        if divisor == 0.0 {
                            return Err(Error::invalid_query("division by zero"));
                        }
                        mul.insert(path, json!(1.0 / divisor));
                    }
                }
            }
            Entry::Condition {
                kind,
                field,
                value,
                second,
                aggregation,
            } => {
                if aggregation.is_some() {
                    return Err(Error::unsupported("aggregated condition", DIALECT));
                }
                filters.push(condition_doc(*kind, field, value, second.as_ref(), false, cursor)?);
            }
            Entry::Operation { kind, children } => {
                filters.push(operation_doc(*kind, children, cursor, false)?)
            }
            other => {
                return Err(Error::translation(format!(
                    "entry is not valid in an update: {other:?}"
                )))
            }
        }
    }
    if set.is_empty() && inc.is_empty() && mul.is_empty() {
        return Err(Error::invalid_query("update requires at least one set"));
    }
    let mut update = Map::new();
    if !set.is_empty() {
        update.insert("$set".to_string(), Json::Object(set));
    }
    if !inc.is_empty() {
        update.insert("$inc".to_string(), Json::Object(inc));
    }
    if !mul.is_empty() {
        update.insert("$mul".to_string(), Json::Object(mul));
    }
    Ok((combine(filters), Json::Object(update)))
}

fn combine(mut filters: Vec<Json>) -> Json {
    match filters.len() {
        0 => json!({}),
        1 => filters.remove(0),
        _ => json!({ "$and": filters }),
    }
}

/// Dotted document path; the database part never applies to a document
fn field_path(field: &FieldRef) -> String {
    match &field.collection {
        Some(collection) => format!("{}.{}", collection, field.field),
        None => field.field.clone(),
    }
}

fn numeric(value: &Value) -> Result<Json> {
    Ok(match value {
        Value::I32(v) => json!(v),
        Value::I64(v) => json!(v),
        Value::F32(v) => json!(v),
        Value::F64(v) => json!(v),
        other => return Err(Error::conversion(other.type_name(), "numeric amount")),
    })
}

fn as_f64(value: &Value) -> Result<f64> {
    Ok(match value {
        Value::I32(v) => f64::from(*v),
        Value::I64(v) => *v as f64,
        Value::F32(v) => f64::from(*v),
        Value::F64(v) => *v,
        other => return Err(Error::conversion(other.type_name(), "numeric amount")),
    })
}

/// Converts a `%`-wildcard LIKE pattern into an anchored regular expression
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => regex.push_str(".*"),
            '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|'
            | '\\' => {
                regex.push('\\');
                regex.push(ch);
            }
            other => regex.push(other),
        }
    }
    regex.push('$');
    regex
}

fn check_pending(pending: &Option<String>) -> Result<()> {
    match pending {
        Some(error) => Err(Error::invalid_query(error.clone())),
        None => Ok(()),
    }
}
