use std::collections::HashMap;

use super::filter::FilterTable;
use super::scalar::Scalar;
use super::vector::{Vector, VectorEntry};
use crate::observer::history::HistoryEntry;
use crate::protocol::VariableSnapshot;
use crate::unit::ParseError;

/// Every buffered sample of one variable, oldest first.
#[derive(Debug, Clone)]
pub struct VariableHistory {
    name: String,
    samples: Vec<(u64, VariableSnapshot)>,
}

impl VariableHistory {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The newest sample. Description, unit and filters are read from here.
    pub fn latest(&self) -> Option<&VariableSnapshot> {
        self.samples.last().map(|(_, snapshot)| snapshot)
    }

    pub fn vector(&self) -> Vector {
        self.samples
            .iter()
            .map(|(timestamp, snapshot)| VectorEntry::new(*timestamp, snapshot.value))
            .collect()
    }

    /// Runs the latest filter chain over the series and reduces it to the
    /// displayed scalar. Unfiltered durations are scaled into their unit.
    pub fn value(&self, filters: &FilterTable) -> Result<Scalar, ParseError> {
        let Some(latest) = self.latest() else {
            return Ok(Scalar::pending());
        };

        let vector = filters.apply_all(self.vector(), &latest.filters)?;
        let scalar = vector.to_scalar();
        if scalar.is_pending() || !scalar.unit.is_empty() || !latest.kind.is_duration_valued() {
            return Ok(scalar);
        }

        let divisor = latest.unit.to_millis();
        if !divisor.is_finite() || divisor == 0.0 {
            return Ok(scalar);
        }
        Ok(Scalar::new(scalar.value / divisor, latest.unit.display_suffix()))
    }
}

/// Splits buffered snapshots into one history per variable, in the order the
/// variables were first seen.
pub fn group_by_variable<'a>(entries: impl IntoIterator<Item = &'a HistoryEntry>) -> Vec<VariableHistory> {
    let mut histories: Vec<VariableHistory> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        for snapshot in &entry.snapshot {
            let slot = *index.entry(snapshot.name.clone()).or_insert_with(|| {
                histories.push(VariableHistory {
                    name: snapshot.name.clone(),
                    samples: Vec::new(),
                });
                histories.len() - 1
            });
            histories[slot].samples.push((entry.timestamp, snapshot.clone()));
        }
    }

    for history in &mut histories {
        history.samples.sort_by_key(|(timestamp, _)| *timestamp);
    }
    histories
}
