mod types;

pub use types::{BackoffConfig, ControllerConfig};
