//! Tire-code catalog backend.
//!
//! Maps short public tire codes (e.g. `"100"`) to normalized tire-size
//! strings (e.g. `"205/55R16"`), with optional load/speed-index variants,
//! admin mapping management, CSV bulk import, and search analytics logging.
//!
//! The crate is organised hexagonally: `domain` holds transport-agnostic
//! types and services behind collaborator ports, `outbound` holds the
//! Diesel/PostgreSQL and Redis adapters, and `worker` drives queued CSV
//! import jobs.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
