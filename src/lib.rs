//! Collegium: an institution and admission-cutoff catalog served through a
//! cache-aside read path over a document store.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
