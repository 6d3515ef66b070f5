//! # Archive Module
//!
//! Keeps cumulative copies of playlists. For each configured source the
//! engine reads the source, finds the archive playlist by name (or creates it),
//! appends the tracks the archive does not have yet and reports the outcome.
//!
//! ```text
//! BatchRunner ── one config at a time, in order
//!     ↓
//! ReconciliationEngine
//!     ├── CollectionReader  (paginated reads)
//!     ├── locator           (name + owner lookup over the full listing)
//!     ├── ArchiveWriter     (create private playlist, append in batches of 100)
//!     └── classify          (remote failure → Failed outcome)
//!     ↓
//! ArchiveResult → SessionRecord
//! ```
//!
//! Archive names are `"<custom name or source name> (Cumulative)"`; there is no
//! stored mapping between a source and its archive.

pub mod classify;
pub mod engine;
pub mod locator;
pub mod reader;
pub mod runner;
pub mod writer;

pub use engine::ReconciliationEngine;
pub use reader::CollectionReader;
pub use runner::{BatchReport, BatchRunner, HaltReason};
pub use writer::ArchiveWriter;
