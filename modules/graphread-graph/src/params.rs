use std::collections::BTreeMap;

use neo4rs::{BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType};
use serde::Serialize;

use graphread_common::QueryError;

use crate::cypher::QueryShape;

/// A value bound to a query placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Parse a command-line literal: integers, floats, booleans and `null`
    /// are recognized, anything else is a string.
    pub fn parse_literal(raw: &str) -> Self {
        if raw == "null" {
            return ParamValue::Null;
        }
        if let Ok(b) = raw.parse::<bool>() {
            return ParamValue::Boolean(b);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return ParamValue::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return ParamValue::Float(f);
            }
        }
        ParamValue::String(raw.to_string())
    }

    pub(crate) fn to_bolt(&self) -> BoltType {
        match self {
            ParamValue::Null => BoltType::Null(BoltNull),
            ParamValue::Boolean(b) => BoltType::Boolean(BoltBoolean::new(*b)),
            ParamValue::Integer(i) => BoltType::Integer(BoltInteger::new(*i)),
            ParamValue::Float(f) => BoltType::Float(BoltFloat::new(*f)),
            ParamValue::String(s) => BoltType::String(BoltString::new(s)),
            ParamValue::List(items) => {
                let mut list = BoltList::with_capacity(items.len());
                for item in items {
                    list.push(item.to_bolt());
                }
                BoltType::List(list)
            }
            ParamValue::Map(entries) => {
                let mut map = BoltMap::with_capacity(entries.len());
                for (key, value) in entries {
                    map.put(BoltString::new(key), value.to_bolt());
                }
                BoltType::Map(map)
            }
        }
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Integer(i),
                None => ParamValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => ParamValue::String(s),
            Value::Array(items) => ParamValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(entries) => {
                ParamValue::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Integer(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        ParamValue::Integer(i.into())
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Boolean(b)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

/// A query template plus the values for its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub template: String,
    pub parameters: BTreeMap<String, ParamValue>,
}

impl QueryRequest {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Bind every entry of a JSON object. Non-object JSON is rejected.
    pub fn params_json(mut self, json: serde_json::Value) -> Result<Self, String> {
        match json {
            serde_json::Value::Object(entries) => {
                for (name, value) in entries {
                    self.parameters.insert(name, value.into());
                }
                Ok(self)
            }
            other => Err(format!("parameters must be a JSON object, got {other}")),
        }
    }

    /// Placeholders of `shape` that have no bound value, sorted.
    pub fn missing_parameters(&self, shape: &QueryShape) -> Vec<String> {
        shape
            .placeholders
            .iter()
            .filter(|name| !self.parameters.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Analyze the template and check every placeholder is bound.
    pub fn validate(&self) -> Result<QueryShape, QueryError> {
        let shape = QueryShape::parse(&self.template)?;
        let missing = self.missing_parameters(&shape);
        if !missing.is_empty() {
            return Err(QueryError::MissingParameters(missing));
        }
        Ok(shape)
    }

    pub(crate) fn to_query(&self) -> neo4rs::Query {
        self.parameters
            .iter()
            .fold(neo4rs::query(&self.template), |q, (name, value)| {
                q.param(name, value.to_bolt())
            })
    }
}

/// Split a `name=value` argument. The value is parsed with [`ParamValue::parse_literal`].
pub fn parse_assignment(arg: &str) -> Result<(String, ParamValue), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{arg}`"))?;
    let name = name.trim().trim_start_matches('$');
    if name.is_empty() {
        return Err(format!("missing parameter name in `{arg}`"));
    }
    Ok((name.to_string(), ParamValue::parse_literal(raw)))
}
