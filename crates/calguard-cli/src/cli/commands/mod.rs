//! CLI command handlers, one file per command.

mod backoff;
mod config;
mod simulate;

pub use backoff::run_backoff;
pub use config::run_config;
pub use simulate::{run_simulate, SimulateOptions};
