//! Client for the Champaign-Urbana MTD developer API.

pub mod client;

pub use client::{CumtdClient, DEFAULT_BASE_URL};
