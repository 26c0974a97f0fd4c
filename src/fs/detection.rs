// src/fs/detection.rs
//! Media type detection by magic number, with an extension-based fallback.

use std::{fmt, path::Path};

use anyhow::{Context, Result};
use infer::{Infer, MatcherType};
use mime_guess::MimeGuess;

/// What the library cares about in a file.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MediaKind {
    Audio,
    Image,
    Other,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
            MediaKind::Other => "other",
        })
    }
}

/// A detected MIME type and the kind it maps to.
#[derive(Debug, Clone)]
pub struct MediaType {
    pub mime: String,
    pub kind: MediaKind,
}

/// Sniff the file's header; fall back to its extension when the header is unknown.
pub fn detect_media(path: &Path) -> Result<MediaType> {
    let sniffed = Infer::new()
        .get_from_path(path)
        .with_context(|| format!("reading header of {}", path.display()))?;
    if let Some(kind) = sniffed {
        let media = match kind.matcher_type() {
            MatcherType::Audio => MediaKind::Audio,
            MatcherType::Image => MediaKind::Image,
            _ => MediaKind::Other,
        };
        return Ok(MediaType {
            mime: kind.mime_type().to_string(),
            kind: media,
        });
    }
    Ok(guess_from_extension(path))
}

/// Classification from the file name alone.
pub fn guess_from_extension(path: &Path) -> MediaType {
    let mime = MimeGuess::from_path(path).first_or_octet_stream();
    let kind = match mime.type_().as_str() {
        "audio" => MediaKind::Audio,
        "image" => MediaKind::Image,
        _ => MediaKind::Other,
    };
    MediaType {
        mime: mime.to_string(),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_map_to_kinds() {
        assert_eq!(guess_from_extension(Path::new("a/b.flac")).kind, MediaKind::Audio);
        assert_eq!(guess_from_extension(Path::new("cover.jpg")).kind, MediaKind::Image);
        assert_eq!(guess_from_extension(Path::new("notes.txt")).kind, MediaKind::Other);
        assert_eq!(
            guess_from_extension(Path::new("noext")).mime,
            "application/octet-stream"
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(detect_media(Path::new("/nonexistent/flowtune.ogg")).is_err());
    }
}
