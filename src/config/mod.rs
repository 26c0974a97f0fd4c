// src/config/mod.rs
//! Configuration for the carousel, the visualizer and the terminal host.
//!
//! Every tunable has a default matching the classic cover flow look; the
//! binary can override a subset through `FLOWTUNE_*` environment variables.

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use tracing::Level;

/// Geometry and timing of the cover flow carousel.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Logical edge length of an item (front face area plus border).
    pub item_size: f32,
    /// Side length of the square the cover art is scaled into.
    pub image_side: u32,
    /// Vertical pivot of the perspective rotation, as a fraction of `item_size`.
    pub perspective: f32,
    /// Rotation of side items in degrees.
    pub angle: f32,
    /// Scale of side items.
    pub side_scale: f32,
    /// Horizontal distance between neighbouring side items.
    pub spacing: f32,
    /// Gap between the scrub bar and the bottom of the viewport.
    pub bottom_margin: f32,
    /// Requests further away than this are shortened by direct jumps.
    pub fast_jump_threshold: usize,
    /// Duration of a single-row transition.
    pub step_duration: Duration,
    /// Tick cadence of the animation clock.
    pub frame_interval: Duration,
    pub scrub_height: f32,
    pub caption_height: f32,
    /// Alpha of the reflection where it touches the cover.
    pub reflection_alpha: u8,
    pub background: [u8; 3],
    /// Initial viewport size, replaced by the first `resize`.
    pub viewport: (u32, u32),
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            item_size: 258.0,
            image_side: 256,
            perspective: 0.6,
            angle: 66.0,
            side_scale: 0.8,
            spacing: 48.0,
            bottom_margin: 8.0,
            fast_jump_threshold: 10,
            step_duration: Duration::from_millis(250),
            frame_interval: Duration::from_millis(17),
            scrub_height: 14.0,
            caption_height: 20.0,
            reflection_alpha: 90,
            background: [232, 236, 240],
            viewport: (960, 516),
        }
    }
}

/// Spectrum analysis and level publishing.
#[derive(Debug, Clone)]
pub struct VisualizerConfig {
    /// Number of output levels per frame.
    pub bins: usize,
    /// Multiplier applied after square-root compression.
    pub gain: f32,
    /// Cadence of the synthetic fallback generator.
    pub fallback_interval: Duration,
    pub fallback_phase_step: f32,
    pub fallback_bin_offset: f32,
    /// Capacity of the audio thread to UI hand-off queue.
    pub queue_len: usize,
    /// Frames collected from the playback stream before a buffer is delivered.
    pub tap_frames: usize,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            bins: 32,
            gain: 1.5,
            fallback_interval: Duration::from_millis(33),
            fallback_phase_step: 0.08,
            fallback_bin_offset: 0.3,
            queue_len: 8,
            tap_frames: 1024,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub flow: FlowConfig,
    pub visualizer: VisualizerConfig,
    /// Directory scanned for albums.
    pub library_dir: PathBuf,
    /// Log destination; the terminal is owned by the UI.
    pub log_file: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Build the configuration from defaults and `FLOWTUNE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let library_dir = env::current_dir().context("reading current directory")?;
        Self::from_lookup(library_dir, |key| env::var(key).ok())
    }

    /// Build the configuration with an arbitrary variable source.
    pub fn from_lookup<F>(library_dir: PathBuf, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            flow: FlowConfig::default(),
            visualizer: VisualizerConfig::default(),
            library_dir,
            log_file: env::temp_dir().join("flowtune.log"),
            log_level: Level::INFO,
        };

        if let Some(dir) = lookup("FLOWTUNE_LIBRARY") {
            config.library_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup("FLOWTUNE_LOG") {
            config.log_file = PathBuf::from(file);
        }
        if let Some(level) = parse_var::<Level, _>(&lookup, "FLOWTUNE_LOG_LEVEL")? {
            config.log_level = level;
        }
        if let Some(bins) = parse_var::<usize, _>(&lookup, "FLOWTUNE_BINS")? {
            config.visualizer.bins = bins.max(1);
        }
        if let Some(threshold) = parse_var::<usize, _>(&lookup, "FLOWTUNE_FAST_JUMP")? {
            config.flow.fast_jump_threshold = threshold.max(1);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "FLOWTUNE_STEP_MS")? {
            config.flow.step_duration = Duration::from_millis(ms.max(1));
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value {raw:?} for {key}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = Config::from_lookup(PathBuf::from("/music"), |_| None).unwrap();
        assert_eq!(config.library_dir, PathBuf::from("/music"));
        assert_eq!(config.visualizer.bins, 32);
        assert_eq!(config.flow.fast_jump_threshold, 10);
        assert_eq!(config.flow.step_duration, Duration::from_millis(250));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn overrides_are_applied() {
        let env = vars(&[
            ("FLOWTUNE_LIBRARY", "/srv/albums"),
            ("FLOWTUNE_BINS", "64"),
            ("FLOWTUNE_FAST_JUMP", "4"),
            ("FLOWTUNE_STEP_MS", "100"),
            ("FLOWTUNE_LOG_LEVEL", "debug"),
        ]);
        let config =
            Config::from_lookup(PathBuf::from("/music"), |key| env.get(key).cloned()).unwrap();
        assert_eq!(config.library_dir, PathBuf::from("/srv/albums"));
        assert_eq!(config.visualizer.bins, 64);
        assert_eq!(config.flow.fast_jump_threshold, 4);
        assert_eq!(config.flow.step_duration, Duration::from_millis(100));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn malformed_number_is_an_error() {
        let env = vars(&[("FLOWTUNE_BINS", "lots")]);
        let err = Config::from_lookup(PathBuf::from("/music"), |key| env.get(key).cloned())
            .unwrap_err();
        assert!(err.to_string().contains("FLOWTUNE_BINS"));
    }
}
