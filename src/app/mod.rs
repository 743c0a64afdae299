//! Application orchestration module

pub mod initialization;
pub mod execution;

pub use initialization::{load_configuration, configure_logging};
pub use execution::{build_context, run_command, AppContext};
