use crate::error::HeraldError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, HeraldError> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Atomic field-level mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Set(String, Value),
    /// Remove the field entirely.
    Delete(String),
    /// Remove every element equal to the value; other elements keep their order.
    ArrayRemove(String, Value),
    /// Add to a numeric field; a missing field counts as zero.
    Increment(String, i64),
}

impl FieldOp {
    /// Applies the operation to an in-memory document body.
    pub fn apply(&self, fields: &mut Map<String, Value>) -> Result<(), HeraldError> {
        match self {
            FieldOp::Set(field, value) => {
                fields.insert(field.clone(), value.clone());
            }
            FieldOp::Delete(field) => {
                fields.remove(field);
            }
            FieldOp::ArrayRemove(field, value) => {
                if let Some(Value::Array(items)) = fields.get_mut(field) {
                    items.retain(|item| item != value);
                }
            }
            FieldOp::Increment(field, by) => {
                let current = match fields.get(field) {
                    None | Some(Value::Null) => 0,
                    Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                        HeraldError::InvalidRequest(format!("{field} is not an integer"))
                    })?,
                    Some(other) => {
                        return Err(HeraldError::InvalidRequest(format!(
                            "cannot increment non-numeric {field}: {other}"
                        )));
                    }
                };
                fields.insert(field.clone(), Value::from(current.saturating_add(*by)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOp {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Conjunction of filters, ordered by document id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    /// Only documents whose id sorts after this cursor.
    pub start_after: Option<String>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn start_after(mut self, cursor: Option<String>) -> Self {
        self.start_after = cursor;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Merge of fields into one document.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchWrite {
    pub id: String,
    pub fields: Map<String, Value>,
}
