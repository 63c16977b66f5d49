pub mod config;
pub mod consistency;
pub mod coverage;
pub mod init;
pub mod methodology;
pub mod pivot;
pub mod roadmap;
pub mod session;
