// src/audio/analyzer.rs
//! FFT magnitude spectrum reduced to a fixed number of display levels.

use rustfft::{FftPlanner, num_complex::Complex};

/// Turns mono sample blocks into `bins` levels in [0, 1].
pub struct SpectrumAnalyzer {
    /// FFT planner, caching plans across calls of the same size
    fft_planner: FftPlanner<f32>,
    /// Number of output levels
    bins: usize,
    /// Multiplier applied after the square-root compression
    gain: f32,
}

impl SpectrumAnalyzer {
    pub fn new(bins: usize, gain: f32) -> Self {
        Self {
            fft_planner: FftPlanner::new(),
            bins,
            gain,
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Compute the levels of `samples`. Always returns `bins` values.
    pub fn analyze(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut levels = vec![0.0f32; self.bins];
        if samples.is_empty() || self.bins == 0 {
            return levels;
        }

        // Zero-pad to the next power of two
        let fft_size = samples.len().next_power_of_two();
        let half = fft_size / 2;
        if half == 0 {
            return levels;
        }
        let mut buffer: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        buffer.resize(fft_size, Complex::new(0.0, 0.0));

        let fft = self.fft_planner.plan_fft_forward(fft_size);
        fft.process(&mut buffer);

        // Linear bucket mapping over the first half, keeping the loudest bin per bucket
        let scale = 1.0 / half as f32;
        for (i, c) in buffer.iter().take(half).enumerate() {
            let magnitude = c.norm() * scale;
            let bucket = (i * self.bins / half).min(self.bins - 1);
            levels[bucket] = levels[bucket].max(magnitude);
        }

        for level in &mut levels {
            *level = (level.sqrt() * self.gain).clamp(0.0, 1.0);
        }
        levels
    }
}
