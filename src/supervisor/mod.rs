pub mod config;
pub mod controller;
pub mod state;

pub use config::RunConfig;
pub use controller::{ProcessSupervisor, RunOutcome};
pub use state::{RunStatus, ABNORMAL_EXIT_CODE, TIMEOUT_EXIT_CODE};
