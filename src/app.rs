//! HTTP host: routing, the export queue and its runner.

pub mod queue;
pub mod runner;
pub mod server;
