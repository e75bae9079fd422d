use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MILLIS_PER_MILLI: f64 = 1.0;
pub const MILLIS_PER_SECOND: f64 = 1_000.0;
pub const MILLIS_PER_MINUTE: f64 = 60_000.0;
pub const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("couldn't parse duration {spec:?}: unknown unit {unit:?} (expected s, m or h)")]
    UnknownUnit { spec: String, unit: char },

    #[error("couldn't parse duration {spec:?}: invalid count {count:?}")]
    InvalidCount { spec: String, count: String },

    #[error("couldn't parse duration {0:?}: missing count and unit")]
    Empty(String),

    #[error("expected a duration string or unit object, got {0}")]
    UnexpectedValue(String),
}

/// A time magnitude used both as a display divisor and as a rate denominator.
///
/// Structurally a weighted sum of its populated components; in practice the
/// parser only ever populates one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationUnit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milli: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reciprocal: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl DurationUnit {
    pub fn millis(count: f64) -> Self {
        Self { milli: Some(count), ..Self::default() }
    }

    pub fn seconds(count: f64) -> Self {
        Self { second: Some(count), ..Self::default() }
    }

    pub fn minutes(count: f64) -> Self {
        Self { minute: Some(count), ..Self::default() }
    }

    pub fn hours(count: f64) -> Self {
        Self { hour: Some(count), ..Self::default() }
    }

    /// The "per unit" form of this duration, e.g. `5m` becomes `/5m`.
    pub fn per(self) -> Self {
        Self { reciprocal: true, ..self }
    }

    /// The plain period this unit describes, with the reciprocal flag cleared.
    pub fn period(self) -> Self {
        Self { reciprocal: false, ..self }
    }

    /// Resolves a unit spec: structured units pass through, strings are parsed.
    pub fn parse(spec: impl Into<UnitSpec>) -> Result<Self, ParseError> {
        match spec.into() {
            UnitSpec::Structured(unit) => Ok(unit),
            UnitSpec::Text(text) => text.parse(),
        }
    }

    pub fn to_millis(&self) -> f64 {
        let total = [
            (self.milli, MILLIS_PER_MILLI),
            (self.second, MILLIS_PER_SECOND),
            (self.minute, MILLIS_PER_MINUTE),
            (self.hour, MILLIS_PER_HOUR),
        ]
        .into_iter()
        .map(|(count, multiplier)| count.map_or(0.0, |c| c * multiplier))
        .sum::<f64>();

        if self.reciprocal {
            1.0 / total
        } else {
            total
        }
    }

    /// Renders the unit as a compact suffix: `5m`, `s`, `/h`. Bare
    /// milliseconds have no letter, so `{milli: 1}` renders as the empty string.
    pub fn display_suffix(&self) -> String {
        let mut suffix = String::new();
        for (count, letter) in [
            (self.milli, ""),
            (self.second, "s"),
            (self.minute, "m"),
            (self.hour, "h"),
        ] {
            match count {
                Some(c) if c == 1.0 => suffix.push_str(letter),
                Some(c) if c != 0.0 => {
                    suffix.push_str(&c.to_string());
                    suffix.push_str(letter);
                }
                _ => {}
            }
        }

        if self.reciprocal && !suffix.is_empty() {
            suffix.insert(0, '/');
        }
        suffix
    }
}

impl FromStr for DurationUnit {
    type Err = ParseError;

    /// Grammar: `[/]<count><s|m|h>`, or `[/]<count>` for milliseconds.
    /// The empty string means one second; a missing count means one.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        if spec.is_empty() {
            return Ok(Self::seconds(1.0));
        }

        let (reciprocal, body) = match spec.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };

        let last = body
            .chars()
            .last()
            .ok_or_else(|| ParseError::Empty(spec.to_string()))?;

        let unit = if last.is_ascii_digit() {
            Self::millis(parse_count(spec, body)?)
        } else {
            let count_text = &body[..body.len() - last.len_utf8()];
            let count = if count_text.is_empty() {
                1.0
            } else {
                parse_count(spec, count_text)?
            };
            match last {
                's' => Self::seconds(count),
                'm' => Self::minutes(count),
                'h' => Self::hours(count),
                other => {
                    return Err(ParseError::UnknownUnit {
                        spec: spec.to_string(),
                        unit: other,
                    })
                }
            }
        };

        Ok(Self { reciprocal, ..unit })
    }
}

fn parse_count(spec: &str, text: &str) -> Result<f64, ParseError> {
    match text.parse::<f64>() {
        Ok(count) if count.is_finite() && count >= 0.0 => Ok(count),
        _ => Err(ParseError::InvalidCount {
            spec: spec.to_string(),
            count: text.to_string(),
        }),
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_suffix())
    }
}

/// Either an already-structured unit or its compact string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitSpec {
    Structured(DurationUnit),
    Text(String),
}

impl From<DurationUnit> for UnitSpec {
    fn from(unit: DurationUnit) -> Self {
        UnitSpec::Structured(unit)
    }
}

impl From<&str> for UnitSpec {
    fn from(text: &str) -> Self {
        UnitSpec::Text(text.to_string())
    }
}

impl From<String> for UnitSpec {
    fn from(text: String) -> Self {
        UnitSpec::Text(text)
    }
}
