//! Store implementations.
//!
//! `postgres` is the production store; `memory` keeps the same unit-of-work
//! guarantees in process for tests and embedding.

pub mod memory;
pub mod postgres;

pub use memory::MemoryAdapter;
pub use postgres::PostgresAdapter;
