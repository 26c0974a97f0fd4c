// src/audio/sample_capture.rs
//! A wrapper source that hands batches of played samples to an attached tap callback.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::Source;

use super::tap::{AudioBuffer, BufferCallback};

/// Callback slot shared between the player handle and its playing sources.
pub type CallbackSlot = Arc<Mutex<Option<BufferCallback>>>;

/// Passes samples through unchanged while collecting them into buffers of
/// `frames` frames for the callback in `slot`.
pub struct SampleCapture<S> {
    source: S,
    slot: CallbackSlot,
    pending: Vec<f32>,
    batch: usize,
}

impl<S> SampleCapture<S>
where
    S: Source<Item = f32>,
{
    pub fn new(source: S, slot: CallbackSlot, frames: usize) -> Self {
        let batch = frames.max(1) * usize::from(source.channels().max(1));
        Self {
            source,
            slot,
            pending: Vec::with_capacity(batch),
            batch,
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(callback) = slot.as_mut() {
                let buffer = AudioBuffer::from_f32(
                    self.source.channels(),
                    self.source.sample_rate(),
                    &self.pending,
                );
                callback(&buffer);
            }
        }
        self.pending.clear();
    }
}

impl<S> Iterator for SampleCapture<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        match self.source.next() {
            Some(sample) => {
                self.pending.push(sample);
                if self.pending.len() >= self.batch {
                    self.flush();
                }
                Some(sample)
            }
            None => {
                self.flush();
                None
            }
        }
    }
}

impl<S> Source for SampleCapture<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.source.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.source.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.source.total_duration()
    }
}

#[cfg(test)]
mod tests {
    use rodio::buffer::SamplesBuffer;

    use super::*;

    #[test]
    fn samples_are_batched_by_frames() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = frames.clone();
        let callback: BufferCallback = Box::new(move |buffer: &AudioBuffer| {
            if let Ok(mut frames) = sink.lock() {
                frames.push(buffer.frame_count());
            }
        });
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(callback)));

        let source = SamplesBuffer::new(2, 44_100, vec![0.1f32; 20]);
        let played: Vec<f32> = SampleCapture::new(source, slot, 4).collect();

        assert_eq!(played.len(), 20);
        assert_eq!(*frames.lock().unwrap(), vec![4, 4, 2]);
    }

    #[test]
    fn without_callback_samples_pass_through() {
        let slot: CallbackSlot = Arc::new(Mutex::new(None));
        let source = SamplesBuffer::new(1, 8_000, vec![0.5f32, -0.5]);
        let played: Vec<f32> = SampleCapture::new(source, slot, 1).collect();
        assert_eq!(played, vec![0.5, -0.5]);
    }
}
