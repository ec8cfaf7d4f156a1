pub mod analyzers;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod records;
pub mod services;
