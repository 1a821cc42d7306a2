//! HTTP front end for the vendor probe.

pub mod config;
pub mod server;

pub use config::Config;
