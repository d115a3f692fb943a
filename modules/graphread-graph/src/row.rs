use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use neo4rs::BoltType;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use graphread_common::QueryError;

/// A value read back from the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<GraphValue>),
    Map(BTreeMap<String, GraphValue>),
    Node {
        id: i64,
        labels: Vec<String>,
        properties: BTreeMap<String, GraphValue>,
    },
    Relationship {
        id: i64,
        start: i64,
        end: i64,
        #[serde(rename = "type")]
        rel_type: String,
        properties: BTreeMap<String, GraphValue>,
    },
    /// Dates, times and datetimes as ISO 8601 text.
    Temporal(String),
    Point {
        srid: i64,
        x: f64,
        y: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        z: Option<f64>,
    },
    /// Durations, paths and byte arrays, kept in the driver's debug form.
    Other(String),
}

impl GraphValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GraphValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GraphValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GraphValue::Integer(i) => Some(*i as f64),
            GraphValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, GraphValue::Null)
    }
}

impl From<&BoltType> for GraphValue {
    fn from(value: &BoltType) -> Self {
        match value {
            BoltType::Null(_) => GraphValue::Null,
            BoltType::Boolean(b) => GraphValue::Boolean(b.value),
            BoltType::Integer(i) => GraphValue::Integer(i.value),
            BoltType::Float(f) => GraphValue::Float(f.value),
            BoltType::String(s) => GraphValue::String(s.value.clone()),
            BoltType::List(list) => GraphValue::List(list.value.iter().map(Into::into).collect()),
            BoltType::Map(map) => GraphValue::Map(properties(&map.value)),
            BoltType::Node(node) => GraphValue::Node {
                id: node.id.value,
                labels: node
                    .labels
                    .value
                    .iter()
                    .map(|label| match label {
                        BoltType::String(s) => s.value.clone(),
                        other => format!("{other:?}"),
                    })
                    .collect(),
                properties: properties(&node.properties.value),
            },
            BoltType::Relation(rel) => GraphValue::Relationship {
                id: rel.id.value,
                start: rel.start_node_id.value,
                end: rel.end_node_id.value,
                rel_type: rel.typ.value.clone(),
                properties: properties(&rel.properties.value),
            },
            BoltType::Point2D(p) => GraphValue::Point {
                srid: p.sr_id.value,
                x: p.x.value,
                y: p.y.value,
                z: None,
            },
            BoltType::Point3D(p) => GraphValue::Point {
                srid: p.sr_id.value,
                x: p.x.value,
                y: p.y.value,
                z: Some(p.z.value),
            },
            other => temporal(other).unwrap_or_else(|| GraphValue::Other(format!("{other:?}"))),
        }
    }
}

const LOCAL_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// ISO 8601 text for temporal values; `None` for anything else or values chrono cannot hold.
fn temporal(value: &BoltType) -> Option<GraphValue> {
    let text = match value {
        BoltType::Date(d) => NaiveDate::try_from(d).ok()?.to_string(),
        BoltType::Time(t) => {
            let (time, offset): (NaiveTime, FixedOffset) = t.into();
            format!("{time}{offset}")
        }
        BoltType::LocalTime(t) => NaiveTime::from(t).to_string(),
        BoltType::DateTime(dt) => DateTime::<FixedOffset>::try_from(dt).ok()?.to_rfc3339(),
        BoltType::LocalDateTime(dt) => NaiveDateTime::try_from(dt)
            .ok()?
            .format(LOCAL_DATETIME)
            .to_string(),
        BoltType::DateTimeZoneId(dt) => {
            let at = DateTime::<FixedOffset>::try_from(dt).ok()?;
            let (_, zone): (NaiveDateTime, String) = dt.clone().try_into().ok()?;
            format!("{}[{zone}]", at.to_rfc3339())
        }
        _ => return None,
    };
    Some(GraphValue::Temporal(text))
}

fn properties(
    entries: &std::collections::HashMap<neo4rs::BoltString, BoltType>,
) -> BTreeMap<String, GraphValue> {
    entries
        .iter()
        .map(|(key, value)| (key.value.clone(), value.into()))
        .collect()
}

impl fmt::Display for GraphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValue::Null => write!(f, "null"),
            GraphValue::Boolean(b) => write!(f, "{b}"),
            GraphValue::Integer(i) => write!(f, "{i}"),
            GraphValue::Float(x) => write!(f, "{x}"),
            GraphValue::String(s) => write!(f, "{s}"),
            GraphValue::Temporal(s) | GraphValue::Other(s) => write!(f, "{s}"),
            GraphValue::Point { x, y, z: None, .. } => write!(f, "POINT({x} {y})"),
            GraphValue::Point { x, y, z: Some(z), .. } => write!(f, "POINT Z({x} {y} {z})"),
            structured => match serde_json::to_string(structured) {
                Ok(json) => write!(f, "{json}"),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

/// One result record: column name to value, in projection order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultRow {
    entries: Vec<(String, GraphValue)>,
}

impl ResultRow {
    pub fn new(entries: Vec<(String, GraphValue)>) -> Self {
        Self { entries }
    }

    /// Read `columns` out of a driver row, in the given order.
    pub(crate) fn from_driver(row: &neo4rs::Row, columns: &[String]) -> Result<Self, QueryError> {
        let mut entries = Vec::with_capacity(columns.len());
        for column in columns {
            let value: BoltType = row
                .get(column)
                .map_err(|_| QueryError::MissingColumn(column.clone()))?;
            entries.push((column.clone(), GraphValue::from(&value)));
        }
        Ok(Self { entries })
    }

    pub fn get(&self, column: &str) -> Option<&GraphValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &GraphValue> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GraphValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use neo4rs::{
        BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltPoint2D, BoltPoint3D, BoltString,
    };

    use super::*;

    fn genre_row(genre: &str, freq: i64) -> ResultRow {
        ResultRow::new(vec![
            ("genre".to_string(), GraphValue::String(genre.to_string())),
            ("freq".to_string(), GraphValue::Integer(freq)),
        ])
    }

    #[test]
    fn row_lookup_by_column() {
        let row = genre_row("Drama", 12);
        assert_eq!(row.get("genre").and_then(GraphValue::as_str), Some("Drama"));
        assert_eq!(row.get("freq").and_then(GraphValue::as_i64), Some(12));
        assert!(row.get("missing").is_none());
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["genre", "freq"]);
    }

    #[test]
    fn json_keeps_projection_order() {
        let row = ResultRow::new(vec![
            ("zeta".to_string(), GraphValue::Integer(1)),
            ("alpha".to_string(), GraphValue::Null),
        ]);
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"zeta":1,"alpha":null}"#
        );
    }

    #[test]
    fn bolt_values_convert() {
        let mut list = BoltList::new();
        list.push(BoltType::Integer(BoltInteger::new(7)));
        list.push(BoltType::Null(BoltNull));
        assert_eq!(
            GraphValue::from(&BoltType::List(list)),
            GraphValue::List(vec![GraphValue::Integer(7), GraphValue::Null])
        );

        let mut map = BoltMap::new();
        map.put(
            BoltString::new("name"),
            BoltType::String(BoltString::new("Comedy")),
        );
        let mut expected = BTreeMap::new();
        expected.insert("name".to_string(), GraphValue::String("Comedy".into()));
        assert_eq!(GraphValue::from(&BoltType::Map(map)), GraphValue::Map(expected));
    }

    #[test]
    fn display_is_plain_for_scalars() {
        assert_eq!(GraphValue::String("Drama".into()).to_string(), "Drama");
        assert_eq!(GraphValue::Float(0.5).to_string(), "0.5");
        assert_eq!(
            GraphValue::List(vec![GraphValue::Integer(1), GraphValue::String("a".into())]).to_string(),
            r#"[1,"a"]"#
        );
    }

    #[test]
    fn temporal_values_render_as_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            GraphValue::from(&BoltType::from(date)),
            GraphValue::Temporal("2024-03-09".into())
        );

        let local = date.and_hms_opt(10, 15, 30).unwrap();
        assert_eq!(
            GraphValue::from(&BoltType::from(local)).to_string(),
            "2024-03-09T10:15:30"
        );

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let zoned = offset.from_local_datetime(&local).unwrap();
        assert_eq!(
            GraphValue::from(&BoltType::from(zoned)).to_string(),
            "2024-03-09T10:15:30+02:00"
        );

        let time = NaiveTime::from_hms_opt(7, 5, 0).unwrap();
        assert_eq!(
            GraphValue::from(&BoltType::from(time)),
            GraphValue::Temporal("07:05:00".into())
        );
    }

    #[test]
    fn points_render_as_wkt() {
        let flat = BoltType::Point2D(BoltPoint2D {
            sr_id: BoltInteger::new(4326),
            x: BoltFloat::new(-97.5),
            y: BoltFloat::new(30.25),
        });
        let value = GraphValue::from(&flat);
        assert_eq!(value.to_string(), "POINT(-97.5 30.25)");
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"srid":4326,"x":-97.5,"y":30.25}"#
        );

        let solid = BoltType::Point3D(BoltPoint3D {
            sr_id: BoltInteger::new(9157),
            x: BoltFloat::new(1.0),
            y: BoltFloat::new(2.0),
            z: BoltFloat::new(3.5),
        });
        assert_eq!(GraphValue::from(&solid).to_string(), "POINT Z(1 2 3.5)");
    }
}
