//! Learned-pattern memory.
//!
//! - `entry`: records, on-disk formats and query types
//! - `manager`: size-bounded durable store with rotation
//! - `file_adapter`: first-party `PatternMemoryAdapter` over the manager

pub mod entry;
pub mod error;
pub mod file_adapter;
pub mod manager;

pub use entry::{
    Correction, LegacyMemoryEntry, MemoryEntry, MemoryFileFormat, PatternQuery, PatternQueryResult,
};
pub use error::{MemoryError, MemoryResult};
pub use file_adapter::FilePatternMemory;
pub use manager::{
    apply_correction, rotate, MemoryConfig, MemoryManager, MemoryStats, RotationReport, SaveReport,
};
