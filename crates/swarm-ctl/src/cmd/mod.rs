//! CLI command modules.

pub mod config;
pub mod http;
pub mod mock;
pub mod run;
pub mod stats;
