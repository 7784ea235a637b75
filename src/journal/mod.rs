//! Journal Module
//!
//! Durability and crash recovery: an append-only operation log per
//! generation, full checkpoints, and a version pointer naming the current
//! generation.
//!
//! ## Responsibilities
//! - Append an operation before it is applied in memory
//! - CRC32 checksums on every record, checkpoint, and pointer
//! - Crash-safe checkpoint commit (single rename)
//! - Deterministic replay on startup
//!
//! ## Log File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Header: Magic "EKVL" | Format | Gen     │
//! ├─────────────────────────────────────────┤
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! `Data` is the bincode encoding of an [`Operation`].

mod checkpoint;
mod entry;
mod layout;
mod manager;
mod pointer;
mod reader;
mod recovery;
mod writer;

pub use checkpoint::{read_checkpoint, write_checkpoint, CheckpointInfo, CheckpointWriter};
pub use entry::{LogEntry, Operation, FORMAT_VERSION, HEADER_SIZE, LOG_HEADER_SIZE};
pub use layout::{DataLayout, FileKind, PENDING_VERSION_FILENAME, VERSION_FILENAME};
pub use manager::{Journal, JournalOptions};
pub use pointer::VersionPointer;
pub use reader::{LogReader, ReadEntry};
pub use recovery::{replay_log, RecoveryResult, ReplayStats};
pub use writer::LogWriter;
