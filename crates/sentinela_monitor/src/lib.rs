//! The `Monitor` capability set, `MonitorContext`, `MonitorRegistry`, and
//! the `MonitorLoader` collaborator interface (`spec.md` §4.6).

pub mod context;
pub mod loader;
pub mod monitor;
pub mod registry;
pub mod validation;

pub use context::MonitorContext;
pub use loader::{check_monitor, register_monitor, RegisterError};
pub use monitor::{Monitor, SearchResult};
pub use registry::MonitorRegistry;
pub use validation::{MonitorValidationError, ValidationIssue};
