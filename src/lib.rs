//! # EmberKV
//!
//! A durable key-value store with:
//! - Per-key reader/writer locks (unrelated keys never contend)
//! - A write-ahead journal, appended before every in-memory mutation
//! - Versioned checkpoints committed by a single atomic rename
//! - Deterministic crash recovery (checkpoint + log replay)
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │                  (Multiple Clients)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                               │
//! │        get / set / delete          checkpoint loop          │
//! └──────┬──────────────────┬──────────────────────┬────────────┘
//!        │                  │                      │
//!        ▼                  ▼                      ▼
//!  ┌───────────┐     ┌─────────────┐        ┌─────────────┐
//!  │ LockTable │     │   Journal   │        │  KeyStore   │
//!  │ (per key) │     │ log + ckpt  │        │ (in memory) │
//!  └───────────┘     └─────────────┘        └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod engine;
pub mod journal;
pub mod keystore;
pub mod locktable;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::{CheckpointLoop, Engine};
pub use error::{EmberError, Result};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
