pub mod collector;
pub mod config;
pub mod directory;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod gate;
pub mod infra;
pub mod output;
pub mod parser;
pub mod poller;
pub mod schedule;
pub mod services;
pub mod stats;
pub mod store;
pub mod timestamp;
