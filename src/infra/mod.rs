//! Infrastructure adapters and runtime bootstrap.

pub mod bootstrap;
pub mod db;
pub mod error;
pub mod memory;
pub mod redis_store;
pub mod telemetry;
