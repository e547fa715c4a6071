//! Outbound adapters: persistence and caching.

pub mod cache;
pub mod persistence;
