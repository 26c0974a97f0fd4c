// src/audio/metadata.rs
//! Track metadata extraction using Lofty.

use std::path::Path;

use anyhow::{Context, Result};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Accessor;

/// Tags and audio properties of one file.
#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
    /// Total track length in seconds.
    pub duration_secs: u64,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    /// Audio bitrate in kbps.
    pub bitrate: Option<u32>,
    /// Raw image bytes (PNG/JPEG) of the first embedded picture.
    pub artwork: Option<Vec<u8>>,
}

impl TrackMetadata {
    /// Key/value lines for display.
    pub fn properties(&self) -> Vec<(String, String)> {
        let mut lines = Vec::new();
        if let Some(n) = self.track_number {
            lines.push(("Track".into(), n.to_string()));
        }
        if let Some(b) = self.bitrate {
            lines.push(("Bitrate (kbps)".into(), b.to_string()));
        }
        if let Some(sr) = self.sample_rate {
            lines.push(("Sample Rate (Hz)".into(), sr.to_string()));
        }
        if let Some(ch) = self.channels {
            lines.push(("Channels".into(), ch.to_string()));
        }
        lines
    }
}

/// Load metadata for a file path. Safe to call from a background thread.
pub fn load_metadata(path: &Path) -> Result<TrackMetadata> {
    let tagged_file = Probe::open(path)
        .and_then(|probe| probe.read())
        .with_context(|| format!("reading tags of {}", path.display()))?;

    let props = tagged_file.properties();
    let mut meta = TrackMetadata {
        duration_secs: props.duration().as_secs(),
        sample_rate: props.sample_rate(),
        channels: props.channels(),
        bitrate: props.audio_bitrate(),
        ..TrackMetadata::default()
    };

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return Ok(meta);
    };
    meta.title = tag.title().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    meta.artist = tag.artist().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    meta.album = tag.album().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    meta.track_number = tag.track();
    meta.artwork = tag.pictures().first().map(|pic| pic.data().to_vec());
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_skip_missing_fields() {
        let meta = TrackMetadata {
            track_number: Some(3),
            sample_rate: Some(44_100),
            ..TrackMetadata::default()
        };
        let lines = meta.properties();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], ("Track".to_string(), "3".to_string()));
    }

    #[test]
    fn unreadable_file_reports_path() {
        let err = load_metadata(Path::new("/nonexistent/flowtune/track.flac")).unwrap_err();
        assert!(format!("{err:#}").contains("track.flac"));
    }
}
