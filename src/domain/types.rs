//! Column values and the entity contract shared by stores and the query model.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// A typed column value carried by predicates and projected rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Orders two values of compatible kinds.
    ///
    /// `Int` and `Float` compare numerically with each other; every other
    /// mix of kinds is incomparable and yields `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(left), Value::Bool(right)) => Some(left.cmp(right)),
            (Value::Int(left), Value::Int(right)) => Some(left.cmp(right)),
            (Value::Float(left), Value::Float(right)) => left.partial_cmp(right),
            (Value::Int(left), Value::Float(right)) => (*left as f64).partial_cmp(right),
            (Value::Float(left), Value::Int(right)) => left.partial_cmp(&(*right as f64)),
            (Value::Text(left), Value::Text(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

/// A queryable column of an entity.
pub trait FieldName: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Column name used by persistent adapters.
    fn column(self) -> &'static str;
}

/// A record that stores can filter, sort and project without knowing its
/// concrete shape.
pub trait Entity: Clone + Send + Sync + 'static {
    type Field: FieldName;

    /// Every field of the entity, id first.
    fn fields() -> &'static [Self::Field];

    fn id(&self) -> &str;

    fn value(&self, field: Self::Field) -> Value;
}

/// A row narrowed to a projection list, in projection order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow<F> {
    values: Vec<(F, Value)>,
}

impl<F: FieldName> ProjectedRow<F> {
    pub fn new(values: Vec<(F, Value)>) -> Self {
        Self { values }
    }

    pub fn from_entity<E>(entity: &E, fields: &[F]) -> Self
    where
        E: Entity<Field = F>,
    {
        Self {
            values: fields
                .iter()
                .map(|field| (*field, entity.value(*field)))
                .collect(),
        }
    }

    pub fn get(&self, field: F) -> Option<&Value> {
        self.values
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .map(|(_, value)| value)
    }

    pub fn text(&self, field: F) -> Option<&str> {
        self.get(field).and_then(Value::as_text)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
