//! Wire shapes exchanged between an instrumented page and the observer.
//!
//! Requests are JSON arrays `[method, args...]`; the reply to
//! `["getVariables"]` is the JSON array of [`VariableSnapshot`] records in
//! declaration order.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::unit::DurationUnit;

pub const GET_VARIABLES: &str = "getVariables";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    GetVariables,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("empty request")]
    Empty,
    #[error("unknown method {0:?}")]
    UnknownMethod(String),
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Request::GetVariables => GET_VARIABLES,
        }
    }

    pub fn encode(&self) -> String {
        Value::Array(vec![Value::String(self.method().to_string())]).to_string()
    }

    pub fn decode(text: &str) -> Result<Self, RequestError> {
        let parts: Vec<Value> = serde_json::from_str(text)?;
        match parts.first() {
            None => Err(RequestError::Empty),
            Some(Value::String(method)) if method == GET_VARIABLES => Ok(Request::GetVariables),
            Some(Value::String(method)) => Err(RequestError::UnknownMethod(method.clone())),
            Some(other) => Err(RequestError::UnknownMethod(other.to_string())),
        }
    }
}

/// The closed set of variable kinds a page can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    Counter,
    Timer,
    /// A kind this observer doesn't know; displayed like a duration.
    #[serde(other)]
    Unknown,
}

impl VariableType {
    pub fn type_name(&self) -> &'static str {
        match self {
            VariableType::Counter => "Counter",
            VariableType::Timer => "Timer",
            VariableType::Unknown => "Unknown",
        }
    }

    pub fn default_unit(&self) -> DurationUnit {
        match self {
            VariableType::Counter => DurationUnit::seconds(1.0),
            VariableType::Timer | VariableType::Unknown => DurationUnit::millis(1.0),
        }
    }

    /// Whether absolute values of this kind are durations in milliseconds,
    /// and so get scaled into the variable's unit for display.
    pub fn is_duration_valued(&self) -> bool {
        !matches!(self, VariableType::Counter)
    }
}

/// A declarative filter, e.g. `{"rate": "5m"}`. Each key names an entry of the
/// filter table; its value holds that filter's parameters. Keys keep their
/// declared order, which is the order the filters run in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec(Map<String, Value>);

impl FilterSpec {
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        let mut map = Map::new();
        map.insert(name.into(), params);
        Self(map)
    }

    pub fn rate() -> Self {
        Self::new("rate", Value::Bool(true))
    }

    pub fn rate_over(unit: DurationUnit) -> Self {
        Self::new("rate", serde_json::to_value(unit).unwrap_or(Value::Bool(true)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, params)| (name.as_str(), params))
    }
}

/// Canonical JSON record of one variable at the instant it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSnapshot {
    #[serde(rename = "type")]
    pub kind: VariableType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(deserialize_with = "number_or_nan")]
    pub value: f64,
    #[serde(default = "missing_unit")]
    pub unit: DurationUnit,
}

fn missing_unit() -> DurationUnit {
    DurationUnit::millis(1.0)
}

// serde_json writes non-finite floats as `null`.
fn number_or_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
