pub mod cli;
pub mod config;
pub mod error;
pub mod pretty;
pub mod server;
pub mod store;
