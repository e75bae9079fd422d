//! Turns buffered snapshots into display-ready values.
//!
//! Each variable's samples become a [`Vector`], the variable's filter chain is
//! applied left to right through a [`FilterTable`], and the result is reduced
//! to a [`Scalar`].

pub mod filter;
pub mod scalar;
pub mod variable_history;
pub mod vector;

use std::fmt;

use tracing::warn;

pub use filter::{FilterFn, FilterTable};
pub use scalar::{format_number, Scalar, PENDING};
pub use variable_history::{group_by_variable, VariableHistory};
pub use vector::{Vector, VectorEntry};

use crate::observer::history::HistoryEntry;
use crate::protocol::VariableType;
use crate::transport::PageId;

const NO_DESCRIPTION: &str = "(No description)";

#[derive(Debug, Clone, PartialEq)]
pub struct VariableReport {
    pub name: String,
    pub kind: VariableType,
    pub description: String,
    pub scalar: Scalar,
}

/// Everything the display shows for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub page: PageId,
    pub samples: usize,
    pub stale: bool,
    pub variables: Vec<VariableReport>,
}

impl PageReport {
    pub fn variable(&self, name: &str) -> Option<&VariableReport> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Reduces every variable in `entries`. A variable whose filters can't be
/// evaluated shows as pending.
pub fn reduce<'a>(
    entries: impl IntoIterator<Item = &'a HistoryEntry>,
    filters: &FilterTable,
) -> Vec<VariableReport> {
    group_by_variable(entries)
        .into_iter()
        .filter_map(|history| {
            let latest = history.latest()?;
            let scalar = history.value(filters).unwrap_or_else(|e| {
                warn!(variable = history.name(), "filter failed: {}", e);
                Scalar::pending()
            });
            Some(VariableReport {
                name: history.name().to_string(),
                kind: latest.kind,
                description: latest.description.clone(),
                scalar,
            })
        })
        .collect()
}

impl fmt::Display for PageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.stale { " (stale)" } else { "" };
        writeln!(f, "{}{}", self.page, marker)?;
        if self.variables.is_empty() {
            return writeln!(f, "  No variables exported yet.");
        }

        let width = self.variables.iter().map(|v| v.name.len()).max().unwrap_or(0);
        for variable in &self.variables {
            let description = if variable.description.is_empty() {
                NO_DESCRIPTION
            } else {
                &variable.description
            };
            writeln!(
                f,
                "  {:<width$}  {:>12}  {}",
                variable.name,
                variable.scalar.render(),
                description,
                width = width
            )?;
        }
        Ok(())
    }
}
