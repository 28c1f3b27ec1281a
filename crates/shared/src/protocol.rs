use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{CashflowType, StructureSeat},
    error::ProtocolError,
};

/// Opaque resume token handed out by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the `cursor` field of a list payload. Null, blank strings and the
    /// number zero all mean "no further pages".
    pub fn from_wire(value: &Value) -> Option<Self> {
        match value {
            Value::String(token) if !token.trim().is_empty() => Some(Self(token.clone())),
            Value::Number(number) if number.as_f64() != Some(0.0) => {
                Some(Self(number.to_string()))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregates arrive either as decimal strings or as plain numbers.
pub fn aggregate_text(aggregates: &Map<String, Value>, key: &str) -> Option<String> {
    match aggregates.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Option<Cursor>,
    pub aggregates: Map<String, Value>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, cursor: Option<Cursor>) -> Self {
        Self {
            items,
            cursor,
            aggregates: Map::new(),
        }
    }

    pub fn with_aggregate(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.aggregates.insert(key.into(), value.into());
        self
    }

    pub fn has_next(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn aggregate_text(&self, key: &str) -> Option<String> {
        aggregate_text(&self.aggregates, key)
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Decodes `{"data": {"cursor": .., "<items_key>": [..], ..aggregates}}`.
    pub fn from_list_body(body: Value, items_key: &str) -> Result<Self, ProtocolError> {
        let Value::Object(mut envelope) = body else {
            return Err(ProtocolError::MissingData);
        };
        let Some(Value::Object(mut data)) = envelope.remove("data") else {
            return Err(ProtocolError::MissingData);
        };
        let items = data
            .remove(items_key)
            .ok_or_else(|| ProtocolError::MissingItems {
                key: items_key.to_string(),
            })?;
        let items = match items {
            Value::Null => Vec::new(),
            other => serde_json::from_value(other)?,
        };
        let cursor = data
            .remove("cursor")
            .as_ref()
            .and_then(Cursor::from_wire);

        Ok(Self {
            items,
            cursor,
            aggregates: data,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashflowInput {
    pub date: NaiveDate,
    /// Decimal text with two fraction digits, e.g. `"150000.75"`.
    pub idr_amount: String,
    pub note: String,
    #[serde(rename = "type")]
    pub kind: CashflowType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInput {
    pub name: String,
    pub level: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(default)]
    pub structure: Vec<StructureSeat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogInput {
    pub title: String,
    pub summary: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomestayInput {
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
