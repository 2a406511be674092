pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod server;
