//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the ProgressStore port
//! - Local JSON files for the IdentityProvider port (simulated accounts)
//! - Supabase GoTrue HTTP client for the IdentityProvider port

pub mod duckdb;
pub mod local;
pub mod supabase;

#[cfg(test)]
pub mod supabase_mock;
