// src/lib.rs
//! Flowtune - a terminal music player built around a cover flow carousel.
//!
//! The library holds the carousel scene, the audio pipeline feeding the
//! spectrum visualizer, the album scanner and the terminal front end.

pub mod app;
pub mod audio;
pub mod config;
pub mod flow;
pub mod fs;
pub mod ui;
