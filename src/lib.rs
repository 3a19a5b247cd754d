pub mod cli;
pub mod common;
pub mod config_loader;
pub mod core;
pub mod device;
pub mod download;
pub mod errors;
pub mod hub_config;
pub mod operations;
