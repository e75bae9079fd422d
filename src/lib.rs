pub mod config;
pub mod observer;
pub mod page;
pub mod protocol;
pub mod query;
pub mod transport;
pub mod unit;

// Re-export specific items for convenient access
pub use config::ObserverConfig;
pub use observer::Observer;
pub use page::{Counter, Page, Timer, Variable};
pub use query::{PageReport, Scalar};
pub use unit::{DurationUnit, ParseError};
