//! The research loop: a supervisor that talks to the model and a driver that
//! alternates it with tool execution.

mod driver;
mod supervisor;

pub use driver::{Driver, DriverConfig, Node, Outcome, TraceEvent};
pub use supervisor::{Supervisor, SupervisorConfig};
