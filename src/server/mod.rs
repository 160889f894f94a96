//! Server module for Crewrelay
//!
//! - `config`: configuration structures
//! - `loader`: configuration loading from files and environment
//! - `providers`: completion engine resolution
//! - `validation`: startup checks
//! - `init`: component wiring and the run loop

pub mod config;
pub mod init;
mod loader;
mod providers;
mod validation;

pub use init::run;
