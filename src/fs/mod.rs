// src/fs/mod.rs
//! Filesystem module - file type detection and library scanning.

pub mod detection;
pub mod library;

// Re-export commonly used types
pub use detection::{MediaKind, MediaType, detect_media};
pub use library::{Album, Track, merge_album, scan_incremental, scan_library, spawn_scan};
