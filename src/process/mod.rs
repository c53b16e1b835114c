pub mod manager;
pub mod ports;

pub use manager::{ProcessError, ProcessManager};
pub use ports::PortPool;
