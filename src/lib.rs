pub mod bridge;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod memory;
pub mod responder;
pub mod scheduler;
pub mod server;
pub mod shutdown;
pub mod supervisor;
pub mod telemetry;

pub use config::Config;
pub use error::{NovaError, Result};
pub use supervisor::Supervisor;
