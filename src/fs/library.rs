// src/fs/library.rs
//! Music library scanning: audio files grouped into albums.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
    thread,
};

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::detection::{MediaKind, detect_media};
use crate::{
    audio::{TrackMetadata, load_metadata},
    flow::StandardItem,
};

/// Column of an album row holding the album title.
pub const ALBUM_COLUMN: usize = 0;
/// Column of an album row holding the artist.
pub const ARTIST_COLUMN: usize = 1;
/// Column of a track row holding the file path.
pub const PATH_COLUMN: usize = 1;

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const COVER_STEMS: [&str; 4] = ["cover", "folder", "front", "album"];

/// One playable file.
#[derive(Debug, Clone)]
pub struct Track {
    pub title: String,
    pub path: PathBuf,
    pub number: Option<u32>,
    pub duration_secs: u64,
}

/// Tracks sharing an album title and artist.
#[derive(Debug, Clone)]
pub struct Album {
    pub title: String,
    pub artist: String,
    pub cover: Option<DynamicImage>,
    pub tracks: Vec<Track>,
}

impl Album {
    /// Row for a [`crate::flow::StandardModel`]: `[album, artist]` with one
    /// child `[title, path]` per track.
    pub fn into_item(self) -> StandardItem {
        let children = self
            .tracks
            .into_iter()
            .map(|t| StandardItem::new([t.title, t.path.to_string_lossy().into_owned()]))
            .collect();
        let item = StandardItem::new([self.title, self.artist]).with_children(children);
        match self.cover {
            Some(cover) => item.with_decoration(cover),
            None => item,
        }
    }
}

/// A scanned audio file before grouping.
#[derive(Debug, Clone)]
pub struct ScannedTrack {
    pub path: PathBuf,
    pub meta: TrackMetadata,
}

impl Album {
    /// Grouping key: artist and title, case-insensitive.
    pub fn key(&self) -> (String, String) {
        album_key(&self.artist, &self.title)
    }
}

/// Audio files and cover candidate of one directory, held until the walk leaves it.
#[derive(Default)]
struct PendingDir {
    tracks: Vec<ScannedTrack>,
    cover: Option<PathBuf>,
}

impl PendingDir {
    fn into_albums(self) -> Vec<Album> {
        let mut albums = group_albums(self.tracks);
        let Some(cover) = self.cover else {
            return albums;
        };
        if albums.iter().all(|a| a.cover.is_some()) {
            return albums;
        }
        if let Some(image) = decode_cover_file(&cover) {
            for album in albums.iter_mut().filter(|a| a.cover.is_none()) {
                album.cover = Some(image.clone());
            }
        }
        albums
    }
}

/// Scan `root` on a background thread. The albums of each directory are
/// sent as soon as the walk has read all of its files.
pub fn spawn_scan(root: PathBuf) -> Receiver<Album> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut sent = 0usize;
        let result = scan_incremental(&root, |album| {
            sent += 1;
            tx.send(album).is_ok()
        });
        match result {
            Ok(()) => info!(root = %root.display(), albums = sent, "library scanned"),
            Err(err) => warn!("library scan failed: {err:#}"),
        }
    });
    rx
}

/// Walk `root` depth first and hand every directory's albums to `on_album`
/// once the directory is finished. Symlinks are followed; links back into
/// an ancestor are skipped. Stops early when `on_album` returns false.
///
/// An album spread over several directories arrives once per directory;
/// [`merge_album`] folds the parts together.
pub fn scan_incremental<F>(root: &Path, mut on_album: F) -> Result<()>
where
    F: FnMut(Album) -> bool,
{
    let mut pending: HashMap<PathBuf, PendingDir> = HashMap::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .contents_first(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(err).with_context(|| format!("scanning {}", root.display()));
            }
            Err(err) => {
                warn!("skipping library entry: {err}");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_dir() {
            let Some(dir) = pending.remove(path) else {
                continue;
            };
            for album in dir.into_albums() {
                if !on_album(album) {
                    return Ok(());
                }
            }
            continue;
        }

        let Some(dir) = path.parent() else {
            continue;
        };
        let Ok(media) = detect_media(path) else {
            continue;
        };
        match media.kind {
            MediaKind::Audio => match load_metadata(path) {
                Ok(meta) => pending.entry(dir.to_path_buf()).or_default().tracks.push(ScannedTrack {
                    path: path.to_path_buf(),
                    meta,
                }),
                Err(err) => debug!("no tags for {}: {err:#}", path.display()),
            },
            MediaKind::Image if is_cover_name(path) => {
                pending
                    .entry(dir.to_path_buf())
                    .or_default()
                    .cover
                    .get_or_insert_with(|| path.to_path_buf());
            }
            _ => {}
        }
    }
    Ok(())
}

/// Walk `root` and return every album, merged across directories.
pub fn scan_library(root: &Path) -> Result<Vec<Album>> {
    let mut albums = Vec::new();
    scan_incremental(root, |album| {
        merge_album(&mut albums, album);
        true
    })?;
    albums.sort_by_cached_key(Album::key);
    Ok(albums)
}

/// Fold `album` into the entry with the same key, or append it.
pub fn merge_album(albums: &mut Vec<Album>, album: Album) {
    let key = album.key();
    match albums.iter_mut().find(|a| a.key() == key) {
        Some(existing) => {
            if existing.cover.is_none() {
                existing.cover = album.cover;
            }
            existing.tracks.extend(album.tracks);
            sort_tracks(&mut existing.tracks);
        }
        None => albums.push(album),
    }
}

/// Group tracks by (album, artist), ordering albums by artist then title
/// and tracks by number then file name.
pub fn group_albums(tracks: Vec<ScannedTrack>) -> Vec<Album> {
    let mut groups: BTreeMap<(String, String), Album> = BTreeMap::new();
    for scanned in tracks {
        let ScannedTrack { path, meta } = scanned;
        let title = meta
            .album
            .clone()
            .or_else(|| dir_name(&path))
            .unwrap_or_else(|| "Unknown Album".to_string());
        let artist = meta.artist.clone().unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        let album = groups
            .entry(album_key(&artist, &title))
            .or_insert_with(|| Album {
                title,
                artist,
                cover: None,
                tracks: Vec::new(),
            });
        if album.cover.is_none() {
            album.cover = meta.artwork.as_deref().and_then(|bytes| decode_cover(bytes, &path));
        }
        album.tracks.push(Track {
            title: meta.title.clone().unwrap_or_else(|| file_stem(&path)),
            number: meta.track_number,
            duration_secs: meta.duration_secs,
            path,
        });
    }

    groups
        .into_values()
        .map(|mut album| {
            sort_tracks(&mut album.tracks);
            album
        })
        .collect()
}

fn album_key(artist: &str, title: &str) -> (String, String) {
    (artist.to_lowercase(), title.to_lowercase())
}

fn sort_tracks(tracks: &mut [Track]) {
    tracks.sort_by(|a, b| (a.number, &a.path).cmp(&(b.number, &b.path)));
}

fn is_cover_name(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| COVER_STEMS.iter().any(|c| stem.eq_ignore_ascii_case(c)))
}

fn decode_cover(bytes: &[u8], source: &Path) -> Option<DynamicImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => Some(img),
        Err(err) => {
            warn!("unreadable artwork in {}: {err}", source.display());
            None
        }
    }
}

fn decode_cover_file(path: &Path) -> Option<DynamicImage> {
    match image::open(path) {
        Ok(img) => Some(img),
        Err(err) => {
            warn!("unreadable cover {}: {err}", path.display());
            None
        }
    }
}

fn dir_name(path: &Path) -> Option<String> {
    path.parent()?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::flow::{ListModel, ModelIndex, StandardModel};

    fn scanned(path: &str, album: Option<&str>, artist: Option<&str>, number: Option<u32>) -> ScannedTrack {
        ScannedTrack {
            path: PathBuf::from(path),
            meta: TrackMetadata {
                album: album.map(str::to_string),
                artist: artist.map(str::to_string),
                track_number: number,
                ..TrackMetadata::default()
            },
        }
    }

    #[test]
    fn tracks_group_by_album_and_artist() {
        let albums = group_albums(vec![
            scanned("/m/b/02.flac", Some("Blue"), Some("Zed"), Some(2)),
            scanned("/m/a/01.flac", Some("Red"), Some("Amy"), Some(1)),
            scanned("/m/b/01.flac", Some("blue"), Some("zed"), Some(1)),
        ]);
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].title, "Red");
        assert_eq!(albums[1].artist, "Zed");
        let titles: Vec<_> = albums[1].tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["01", "02"]);
    }

    #[test]
    fn untagged_tracks_fall_back_to_directory() {
        let albums = group_albums(vec![scanned("/music/Live Set/track.mp3", None, None, None)]);
        assert_eq!(albums[0].title, "Live Set");
        assert_eq!(albums[0].artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn album_rows_carry_tracks_as_children() {
        let album = group_albums(vec![scanned("/m/x/a.ogg", Some("X"), Some("Y"), None)])
            .remove(0);
        let model = StandardModel::from_rows(vec![album.into_item()]);
        assert_eq!(model.display_text(&ModelIndex::new(&[], 0, ARTIST_COLUMN)).as_deref(), Some("Y"));
        assert_eq!(model.row_count(&[0]), 1);
        assert_eq!(
            model.display_text(&ModelIndex::new(&[0], 0, PATH_COLUMN)).as_deref(),
            Some("/m/x/a.ogg")
        );
    }

    #[test]
    fn cover_names_are_recognised() {
        assert!(is_cover_name(Path::new("/a/Cover.JPG")));
        assert!(is_cover_name(Path::new("/a/folder.png")));
        assert!(!is_cover_name(Path::new("/a/booklet.png")));
    }

    #[test]
    fn scanning_missing_directory_fails() {
        assert!(scan_library(Path::new("/nonexistent/flowtune/library")).is_err());
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("flowtune-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Short silent mono 16-bit PCM file.
    fn write_wav(path: &Path) {
        let data_len = 1600u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&8000u32.to_le_bytes());
        bytes.extend_from_slice(&16000u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(bytes.len() + data_len as usize, 0);
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn albums_split_over_directories_merge() {
        let mut albums = group_albums(vec![scanned("/m/cd1/02.flac", Some("Set"), Some("Band"), Some(2))]);
        let second = group_albums(vec![scanned("/m/cd2/01.flac", Some("set"), Some("BAND"), Some(1))]);
        for album in second {
            merge_album(&mut albums, album);
        }
        assert_eq!(albums.len(), 1);
        let numbers: Vec<_> = albums[0].tracks.iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![Some(1), Some(2)]);
    }

    #[test]
    fn albums_arrive_before_later_directories_are_read() {
        let root = scratch_dir("stream");
        for name in ["A", "B"] {
            fs::create_dir(root.join(name)).unwrap();
            write_wav(&root.join(name).join("01.wav"));
        }

        let mut seen = Vec::new();
        scan_incremental(&root, |album| {
            if album.title == "A" {
                // B has not been opened yet, so this file is still picked up
                write_wav(&root.join("B").join("02.wav"));
            }
            seen.push((album.title, album.tracks.len()));
            true
        })
        .unwrap();

        assert_eq!(seen, vec![("A".to_string(), 1), ("B".to_string(), 2)]);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn scan_stops_when_receiver_declines() {
        let root = scratch_dir("stop");
        for name in ["A", "B", "C"] {
            fs::create_dir(root.join(name)).unwrap();
            write_wav(&root.join(name).join("01.wav"));
        }
        let mut count = 0;
        scan_incremental(&root, |_| {
            count += 1;
            false
        })
        .unwrap();
        assert_eq!(count, 1);
        fs::remove_dir_all(&root).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn symlink_back_to_root_is_not_rescanned() {
        let root = scratch_dir("loop");
        let album = root.join("Album");
        fs::create_dir(&album).unwrap();
        write_wav(&album.join("01.wav"));
        std::os::unix::fs::symlink(&root, album.join("loop")).unwrap();

        let albums = scan_library(&root).unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].tracks.len(), 1);
        fs::remove_dir_all(&root).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_album_directories_are_followed() {
        let outside = scratch_dir("outside");
        let root = scratch_dir("linked");
        fs::create_dir(outside.join("Live")).unwrap();
        write_wav(&outside.join("Live").join("01.wav"));
        std::os::unix::fs::symlink(outside.join("Live"), root.join("Live")).unwrap();

        let albums = scan_library(&root).unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].title, "Live");
        fs::remove_dir_all(&root).unwrap();
        fs::remove_dir_all(&outside).unwrap();
    }
}
