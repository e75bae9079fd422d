//! The instrumented side: variables, the page registry, and the bridge that
//! answers the observer's requests.

pub mod bridge;
pub mod registry;
pub mod variable;

use std::sync::Arc;

pub use bridge::PageHandle;
pub use registry::{Registry, RegistryError};
pub use variable::{Counter, Timer, Variable};

use crate::transport::{self, PageConnection, PageId};
use variable::Metric;

/// One instrumented page context. Owns the registry every variable created
/// through it is registered into.
#[derive(Debug, Clone, Default)]
pub struct Page {
    registry: Arc<Registry>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> Result<Counter, RegistryError> {
        let variable = self.registry.register(name, Metric::Counter { value: 0.0 })?;
        Ok(Counter::new(variable))
    }

    pub fn timer(&self, name: &str) -> Result<Timer, RegistryError> {
        let variable = self.registry.register(
            name,
            Metric::Timer {
                total: 0.0,
                samples: 0,
            },
        )?;
        Ok(Timer::new(variable))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Opens a connection the observer can poll. Must be called inside a
    /// Tokio runtime; the bridge runs as a spawned task.
    pub fn connect(&self, page: PageId) -> (PageConnection, PageHandle) {
        let (connection, requests) = transport::channel(page);
        let handle = bridge::spawn(page, Arc::clone(&self.registry), requests);
        (connection, handle)
    }
}
