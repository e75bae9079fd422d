use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use super::vector::{Vector, VectorEntry};
use crate::protocol::FilterSpec;
use crate::unit::{DurationUnit, ParseError};

/// A filter maps a vector and the filter's JSON parameters to a new vector.
pub type FilterFn = fn(&Vector, &Value) -> Result<Vector, ParseError>;

/// Resolves filter names to their implementation.
#[derive(Clone)]
pub struct FilterTable {
    filters: HashMap<String, FilterFn>,
}

impl FilterTable {
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// The built-in filters: `rate`.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register("rate", rate);
        table
    }

    pub fn register(&mut self, name: impl Into<String>, filter: FilterFn) -> &mut Self {
        self.filters.insert(name.into(), filter);
        self
    }

    pub fn get(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).copied()
    }

    /// Applies every filter named in `spec`. Names missing from the table are
    /// skipped.
    pub fn apply(&self, vector: Vector, spec: &FilterSpec) -> Result<Vector, ParseError> {
        let mut result = vector;
        for (name, params) in spec.iter() {
            if let Some(filter) = self.get(name) {
                result = filter(&result, params)?;
            }
        }
        Ok(result)
    }

    pub fn apply_all<'a>(
        &self,
        vector: Vector,
        specs: impl IntoIterator<Item = &'a FilterSpec>,
    ) -> Result<Vector, ParseError> {
        specs
            .into_iter()
            .try_fold(vector, |vector, spec| self.apply(vector, spec))
    }
}

impl fmt::Debug for FilterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FilterTable").field("filters", &names).finish()
    }
}

impl Default for FilterTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Two-point slope between the oldest and newest entries, per `params`
/// (`true` for per-millisecond, or a duration spec such as `"5m"`).
///
/// Fewer than two entries, or no elapsed time between them, yields an empty
/// vector.
pub fn rate(vector: &Vector, params: &Value) -> Result<Vector, ParseError> {
    let period = rate_period(params)?;
    let period_millis = period.to_millis();
    if !period_millis.is_finite() || period_millis <= 0.0 {
        return Err(ParseError::UnexpectedValue(format!(
            "rate period {} has no length",
            params
        )));
    }

    let (Some(oldest), Some(newest)) = (vector.oldest(), vector.newest()) else {
        return Ok(Vector::empty());
    };
    if vector.len() < 2 || newest.timestamp <= oldest.timestamp {
        return Ok(Vector::empty());
    }

    let elapsed = (newest.timestamp - oldest.timestamp) as f64 / period_millis;
    let value = (newest.value - oldest.value) / elapsed;

    let suffix = period.display_suffix();
    let unit = if suffix.is_empty() {
        "/ms".to_string()
    } else {
        format!("/{}", suffix)
    };

    Ok(Vector::new(vec![VectorEntry::new(newest.timestamp, value)]).with_unit(unit))
}

fn rate_period(params: &Value) -> Result<DurationUnit, ParseError> {
    let unit = match params {
        Value::Bool(_) | Value::Null => DurationUnit::millis(1.0),
        Value::String(text) => text.parse()?,
        Value::Object(_) => serde_json::from_value(params.clone())
            .map_err(|_| ParseError::UnexpectedValue(params.to_string()))?,
        other => return Err(ParseError::UnexpectedValue(other.to_string())),
    };
    // "/5m" and "5m" both mean "per five minutes" here.
    Ok(unit.period())
}
