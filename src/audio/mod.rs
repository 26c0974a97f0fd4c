// src/audio/mod.rs
//! Audio module - playback, metadata, and the spectrum visualizer feed.

pub mod analyzer;
pub mod bridge;
pub mod metadata;
pub mod player;
pub mod sample_capture;
pub mod tap;

// Re-export commonly used types
pub use analyzer::SpectrumAnalyzer;
pub use bridge::VisualizerBridge;
pub use metadata::{TrackMetadata, load_metadata};
pub use player::{MusicPlayer, PlayerTap};
pub use sample_capture::SampleCapture;
pub use tap::{AudioBuffer, AudioFormat, AudioTap, BufferCallback, SampleType};
