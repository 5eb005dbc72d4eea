//! # Observability
//!
//! Structured logging for the client and the command line front end.

pub mod logging;

pub use logging::init_logging;
