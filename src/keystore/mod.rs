//! KeyStore Module
//!
//! In-memory table holding the authoritative key → value mapping.
//!
//! ## Responsibilities
//! - Point reads, inserts/overwrites, and removals
//! - Full iteration for checkpoint snapshots
//!
//! ## Data Structure Choice
//! A plain `HashMap<String, Bytes>`:
//! - No range queries, so no ordering is needed
//! - `Bytes` values make snapshot clones reference-counted, not deep copies
//! - No internal locking: the engine decides who may touch which key

mod store;

pub use store::KeyStore;
