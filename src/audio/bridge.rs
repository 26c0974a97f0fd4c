// src/audio/bridge.rs
//! Feeds spectrum levels from the playback thread to the UI thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use ringbuf::{HeapCons, HeapProd, HeapRb, traits::*};
use tracing::{debug, info, warn};

use super::analyzer::SpectrumAnalyzer;
use super::tap::{AudioBuffer, AudioTap, BufferCallback, downmix};
use crate::config::VisualizerConfig;

/// Levels of the synthetic animation at `phase`.
pub fn synthetic_levels(phase: f32, bins: usize, bin_offset: f32) -> Vec<f32> {
    (0..bins)
        .map(|i| 0.5 + 0.5 * (phase + i as f32 * bin_offset).sin())
        .collect()
}

/// Background generator used when the engine cannot be tapped.
struct Fallback {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Owns the analysis side of the visualizer.
///
/// Levels travel through a single-producer single-consumer ring: the
/// producer lives in the tap callback (or the fallback thread), the
/// consumer here. [`VisualizerBridge::poll_levels`] drains it from the UI loop.
pub struct VisualizerBridge {
    consumer: HeapCons<Vec<f32>>,
    levels: Vec<f32>,
    tap: Option<Box<dyn AudioTap>>,
    fallback: Option<Fallback>,
}

impl VisualizerBridge {
    /// Attach to `tap`, or fall back to synthetic levels when there is none
    /// or attaching fails.
    pub fn new(tap: Option<Box<dyn AudioTap>>, config: &VisualizerConfig) -> Self {
        let (producer, consumer) = HeapRb::<Vec<f32>>::new(config.queue_len.max(1)).split();
        let mut bridge = Self {
            consumer,
            levels: vec![0.0; config.bins],
            tap: None,
            fallback: None,
        };

        let Some(mut tap) = tap else {
            info!("no audio tap, visualizer runs on synthetic levels");
            bridge.start_fallback(config);
            return bridge;
        };

        match tap.attach(analysis_callback(producer, config)) {
            Ok(()) => {
                info!(bins = config.bins, "visualizer attached to audio tap");
                bridge.tap = Some(tap);
            }
            Err(err) => {
                warn!("audio tap unavailable, visualizer runs on synthetic levels: {err:#}");
                bridge.start_fallback(config);
            }
        }
        bridge
    }

    /// True when levels come from the generator rather than real audio.
    pub fn is_synthetic(&self) -> bool {
        self.fallback.is_some()
    }

    /// Drain everything published since the last call and keep the newest.
    pub fn poll_levels(&mut self) -> &[f32] {
        while let Some(levels) = self.consumer.try_pop() {
            self.levels = levels;
        }
        &self.levels
    }

    /// The most recently polled levels.
    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    fn start_fallback(&mut self, config: &VisualizerConfig) {
        let (mut producer, consumer) = HeapRb::<Vec<f32>>::new(config.queue_len.max(1)).split();
        self.consumer = consumer;

        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let bins = config.bins;
        let step = config.fallback_phase_step;
        let offset = config.fallback_bin_offset;
        let interval = config.fallback_interval;

        let handle = thread::spawn(move || {
            let mut phase = 0.0f32;
            while !flag.load(Ordering::Relaxed) {
                // a full queue means the UI is behind; it only wants the newest anyway
                let _ = producer.try_push(synthetic_levels(phase, bins, offset));
                phase += step;
                thread::sleep(interval);
            }
        });
        self.fallback = Some(Fallback {
            stop,
            handle: Some(handle),
        });
    }
}

impl Drop for VisualizerBridge {
    fn drop(&mut self) {
        if let Some(mut tap) = self.tap.take() {
            tap.detach();
        }
        if let Some(mut fallback) = self.fallback.take() {
            fallback.stop.store(true, Ordering::Relaxed);
            if let Some(handle) = fallback.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

/// Per-buffer work done on the engine's thread: downmix, analyze, publish.
fn analysis_callback(mut producer: HeapProd<Vec<f32>>, config: &VisualizerConfig) -> BufferCallback {
    let mut analyzer = SpectrumAnalyzer::new(config.bins, config.gain);
    let mut reported = false;
    Box::new(move |buffer: &AudioBuffer| {
        let Some(mono) = downmix(buffer) else {
            if !reported {
                debug!(format = ?buffer.format, "unsupported sample format, buffers skipped");
                reported = true;
            }
            return;
        };
        let _ = producer.try_push(analyzer.analyze(&mono));
    })
}
