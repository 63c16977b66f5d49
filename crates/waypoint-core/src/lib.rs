pub mod config;
pub mod consistency;
pub mod constraint;
pub mod coverage;
pub mod error;
pub mod io;
pub mod methodology;
pub mod paths;
pub mod phase;
pub mod pivot;
pub mod roadmap;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod types;

pub use error::{Result, WaypointError};
