use std::fmt;

/// Shown in place of a value while there isn't enough data for it yet.
pub const PENDING: &str = "...";

/// The single displayable number-plus-unit a variable reduces to.
/// A NaN value means "not enough data yet".
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub value: f64,
    pub unit: String,
}

impl Scalar {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn pending() -> Self {
        Self::new(f64::NAN, "")
    }

    pub fn is_pending(&self) -> bool {
        self.value.is_nan()
    }

    pub fn render(&self) -> String {
        if self.is_pending() {
            return PENDING.to_string();
        }
        format!("{}{}", format_number(self.value), self.unit)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Integers print as plain digits, everything else with two decimals.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        // Adding zero folds -0 into 0.
        format!("{}", value + 0.0)
    } else {
        format!("{:.2}", value)
    }
}
