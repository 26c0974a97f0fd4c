// src/audio/tap.rs
//! Raw PCM buffers observed from a playback engine, and the hook to receive them.

use anyhow::Result;

/// Encoding of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    SignedInt,
    UnsignedInt,
    Float,
    Unknown,
}

/// Layout of the interleaved samples in an [`AudioBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_type: SampleType,
    /// Bits per sample.
    pub sample_size: u16,
}

impl AudioFormat {
    pub fn f32(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
            sample_type: SampleType::Float,
            sample_size: 32,
        }
    }

    fn bytes_per_sample(&self) -> usize {
        usize::from(self.sample_size / 8)
    }
}

/// Interleaved native-endian PCM bytes.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub format: AudioFormat,
    pub data: Vec<u8>,
}

impl AudioBuffer {
    pub fn from_f32(channels: u16, sample_rate: u32, samples: &[f32]) -> Self {
        Self {
            format: AudioFormat::f32(channels, sample_rate),
            data: samples.iter().flat_map(|s| s.to_ne_bytes()).collect(),
        }
    }

    /// Number of frames (one sample per channel each).
    pub fn frame_count(&self) -> usize {
        let frame = self.format.bytes_per_sample() * usize::from(self.format.channels);
        if frame == 0 { 0 } else { self.data.len() / frame }
    }
}

/// Receives every buffer the engine plays, on the engine's thread.
pub type BufferCallback = Box<dyn FnMut(&AudioBuffer) + Send>;

/// A playback engine that can report the buffers it plays.
pub trait AudioTap: Send {
    /// Start delivering buffers to `callback`, replacing any previous one.
    fn attach(&mut self, callback: BufferCallback) -> Result<()>;

    fn detach(&mut self);
}

/// Average the channels of every frame into one float in [-1, 1].
///
/// Returns `None` for encodings that are not understood.
pub fn downmix(buffer: &AudioBuffer) -> Option<Vec<f32>> {
    let format = buffer.format;
    let channels = usize::from(format.channels);
    if channels == 0 {
        return None;
    }
    let width = format.bytes_per_sample();
    let decode: fn(&[u8]) -> f32 = match (format.sample_type, format.sample_size) {
        (SampleType::SignedInt, 8) => |b: &[u8]| f32::from(b[0] as i8) / 128.0,
        (SampleType::SignedInt, 16) => |b: &[u8]| f32::from(i16::from_ne_bytes([b[0], b[1]])) / 32768.0,
        (SampleType::SignedInt, 32) => {
            |b: &[u8]| i32::from_ne_bytes([b[0], b[1], b[2], b[3]]) as f32 / 2_147_483_648.0
        }
        (SampleType::UnsignedInt, 8) => |b: &[u8]| (f32::from(b[0]) - 128.0) / 128.0,
        (SampleType::Float, 32) => |b: &[u8]| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]),
        _ => return None,
    };

    let mono = buffer
        .data
        .chunks_exact(width * channels)
        .map(|frame| {
            let sum: f32 = frame.chunks_exact(width).map(decode).sum();
            sum / channels as f32
        })
        .collect();
    Some(mono)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm16(samples: &[i16], channels: u16) -> AudioBuffer {
        AudioBuffer {
            format: AudioFormat {
                channels,
                sample_rate: 44_100,
                sample_type: SampleType::SignedInt,
                sample_size: 16,
            },
            data: samples.iter().flat_map(|s| s.to_ne_bytes()).collect(),
        }
    }

    #[test]
    fn stereo_frames_are_averaged() {
        let buffer = pcm16(&[16384, 0, -32768, -32768], 2);
        assert_eq!(downmix(&buffer), Some(vec![0.25, -1.0]));
        assert_eq!(buffer.frame_count(), 2);
    }

    #[test]
    fn unsigned_bytes_are_centred() {
        let buffer = AudioBuffer {
            format: AudioFormat {
                channels: 1,
                sample_rate: 8_000,
                sample_type: SampleType::UnsignedInt,
                sample_size: 8,
            },
            data: vec![128, 0, 192],
        };
        assert_eq!(downmix(&buffer), Some(vec![0.0, -1.0, 0.5]));
    }

    #[test]
    fn float_buffers_pass_through() {
        let buffer = AudioBuffer::from_f32(1, 48_000, &[0.5, -0.25]);
        assert_eq!(downmix(&buffer), Some(vec![0.5, -0.25]));
    }

    #[test]
    fn unknown_formats_are_skipped() {
        let mut buffer = pcm16(&[1, 2], 1);
        buffer.format.sample_size = 24;
        assert_eq!(downmix(&buffer), None);
        buffer.format.sample_type = SampleType::Unknown;
        buffer.format.sample_size = 16;
        assert_eq!(downmix(&buffer), None);
    }
}
