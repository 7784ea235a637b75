//! LockTable Module
//!
//! Per-key reader/writer locks so that unrelated keys never contend.
//!
//! ## Structure
//! ```text
//!   entries: RwLock<HashMap<String, Arc<RwLock<()>>>>
//!            └─ structural lock, held only for lookup/insert
//!                                    └─ per-key lock, held across one
//!                                       journal append + store access
//! ```
//!
//! Entries are created on first write and shared through an `Arc`; guards
//! are owned (`ArcRwLock*Guard`) so a guard keeps its entry alive even if
//! the table sweeps it.

mod table;

pub use table::{KeyLock, KeyReadGuard, KeyWriteGuard, LockTable};
