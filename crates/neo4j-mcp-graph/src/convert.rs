//! Conversions between JSON tool arguments/results and Bolt values.

use std::collections::HashMap;

use neo4rs::{BoltMap, BoltNull, BoltType, Query, Row};
use serde_json::{Map, Number, Value};

use crate::error::{GraphError, Result};
use crate::runner::{Record, Statement};

/// Convert a JSON argument into a Bolt parameter value.
pub fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or(f64::NAN).into(),
        },
        Value::String(s) => s.clone().into(),
        Value::Array(items) => items.iter().map(json_to_bolt).collect::<Vec<_>>().into(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), json_to_bolt(v)))
            .collect::<HashMap<String, BoltType>>()
            .into(),
    }
}

/// Convert a Bolt result value into JSON.
///
/// Nodes and relationships become maps with `id`, `labels`/`type`, and
/// `properties`. Temporal and spatial values fall back to their debug text.
pub fn bolt_to_json(value: &BoltType) -> Value {
    match value {
        BoltType::Null(_) => Value::Null,
        BoltType::Boolean(b) => Value::Bool(b.value),
        BoltType::Integer(i) => Value::from(i.value),
        BoltType::Float(f) => Number::from_f64(f.value).map_or(Value::Null, Value::Number),
        BoltType::String(s) => Value::String(s.value.clone()),
        BoltType::List(list) => Value::Array(list.value.iter().map(bolt_to_json).collect()),
        BoltType::Map(map) => Value::Object(bolt_map_to_json(&map.value)),
        BoltType::Node(node) => {
            let mut out = Map::new();
            out.insert("id".into(), Value::from(node.id.value));
            out.insert("labels".into(), bolt_to_json(&BoltType::List(node.labels.clone())));
            out.insert(
                "properties".into(),
                Value::Object(bolt_map_to_json(&node.properties.value)),
            );
            Value::Object(out)
        }
        BoltType::Relation(rel) => {
            let mut out = Map::new();
            out.insert("id".into(), Value::from(rel.id.value));
            out.insert("type".into(), Value::String(rel.typ.value.clone()));
            out.insert("start".into(), Value::from(rel.start_node_id.value));
            out.insert("end".into(), Value::from(rel.end_node_id.value));
            out.insert(
                "properties".into(),
                Value::Object(bolt_map_to_json(&rel.properties.value)),
            );
            Value::Object(out)
        }
        other => Value::String(format!("{other:?}")),
    }
}

fn bolt_map_to_json(map: &HashMap<neo4rs::BoltString, BoltType>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.value.clone(), bolt_to_json(v)))
        .collect()
}

/// Convert a result row into a JSON record keyed by column name.
pub fn row_to_record(row: &Row) -> Result<Record> {
    let columns: BoltMap = row
        .to_strict()
        .map_err(|e| GraphError::Serialization(format!("Failed to read row: {e}")))?;
    Ok(bolt_map_to_json(&columns.value))
}

/// Build a driver query from a statement, binding every parameter.
pub fn to_query(statement: &Statement) -> Query {
    statement
        .params
        .iter()
        .fold(neo4rs::query(&statement.text), |q, (k, v)| {
            q.param(k, json_to_bolt(v))
        })
}
