use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use super::variable::{Metric, Variable, VariableCell};
use crate::protocol::VariableSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("variable {0:?} is already registered")]
    DuplicateName(String),
}

/// Every variable created in one page, in declaration order. Append-only:
/// variables live as long as the page does.
#[derive(Debug, Default)]
pub struct Registry {
    variables: Mutex<Vec<Arc<VariableCell>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, name: &str, metric: Metric) -> Result<Variable, RegistryError> {
        let mut variables = self.variables.lock().unwrap_or_else(PoisonError::into_inner);
        if variables.iter().any(|cell| cell.name() == name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let cell = Arc::new(VariableCell::new(name.to_string(), metric));
        variables.push(Arc::clone(&cell));
        Ok(Variable::from_cell(cell))
    }

    pub fn len(&self) -> usize {
        self.cells().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        self.cells().iter().map(|cell| cell.name().to_string()).collect()
    }

    /// Captures every variable in declaration order. Timers are reset by this.
    pub fn snapshot(&self) -> Vec<VariableSnapshot> {
        self.cells().iter().map(|cell| cell.capture()).collect()
    }

    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }

    // Capturing happens outside the registry lock.
    fn cells(&self) -> Vec<Arc<VariableCell>> {
        self.variables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
