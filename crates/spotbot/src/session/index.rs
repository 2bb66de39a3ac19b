//! Library directory scan, track ids and links.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::decode::probe_duration_ms;
use super::{PlaylistEntry, PlaylistKind, Track, TrackId};

const LINK_PREFIX: &str = "library:track:";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Clone, Debug)]
pub struct IndexedTrack {
    pub track: Track,
    pub path: PathBuf,
}

/// Snapshot of the library taken at login.
#[derive(Clone, Debug, Default)]
pub struct LibraryIndex {
    /// Sorted by lowercase name, then relative path.
    tracks: Vec<IndexedTrack>,
    by_id: HashMap<TrackId, usize>,
    playlists: Vec<PlaylistEntry>,
}

impl LibraryIndex {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: TrackId) -> Option<&IndexedTrack> {
        self.by_id.get(&id).map(|&i| &self.tracks[i])
    }

    /// Case-insensitive substring match on track names, in name order.
    pub fn matching<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a IndexedTrack> + 'a {
        let needle = query.to_lowercase();
        self.tracks
            .iter()
            .filter(move |t| t.track.name.to_lowercase().contains(&needle))
    }

    pub fn playlists(&self) -> &[PlaylistEntry] {
        &self.playlists
    }
}

pub fn scan_library(root: &Path) -> Result<LibraryIndex> {
    let root = root
        .canonicalize()
        .with_context(|| format!("canonicalize root {:?}", root))?;
    if !root.is_dir() {
        return Err(anyhow::anyhow!("root is not a directory: {:?}", root));
    }

    let mut found = Vec::new();
    let mut visited = HashSet::from([root.clone()]);
    scan_dir(&root, &root, &mut visited, &mut found)?;
    let mut tracks = found
        .into_iter()
        .map(|(rel, path)| {
            let id = track_id_for(&rel);
            let name = path
                .file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or("<unknown>")
                .to_string();
            IndexedTrack {
                track: Track {
                    id,
                    name,
                    link: format_link(id),
                    duration_ms: probe_duration_ms(&path),
                },
                path,
            }
        })
        .collect::<Vec<_>>();
    tracks.sort_by(|a, b| {
        a.track
            .name
            .to_lowercase()
            .cmp(&b.track.name.to_lowercase())
            .then_with(|| a.path.cmp(&b.path))
    });

    let by_id = tracks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.track.id, i))
        .collect();

    Ok(LibraryIndex {
        tracks,
        by_id,
        playlists: scan_playlists(&root)?,
    })
}

/// Collects `(relative path with '/' separators, absolute path)` for every audio file.
fn scan_dir(
    root: &Path,
    dir: &Path,
    visited: &mut HashSet<PathBuf>,
    out: &mut Vec<(String, PathBuf)>,
) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("read_dir {:?}", dir))? {
        let entry = entry.context("read_dir entry")?;
        let path = entry.path();
        if path.is_dir() {
            let canon = path
                .canonicalize()
                .with_context(|| format!("canonicalize {:?}", path))?;
            if canon.starts_with(root) && visited.insert(canon.clone()) {
                scan_dir(root, &canon, visited, out)?;
            }
            continue;
        }
        if !path.is_file() || !is_audio_file(&path) {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        out.push((rel, path));
    }
    Ok(())
}

/// Top-level directories: with audio files directly inside they are playlists,
/// with only subdirectories they are folders. Anything else is not listed.
fn scan_playlists(root: &Path) -> Result<Vec<PlaylistEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("read_dir {:?}", root))? {
        let entry = entry.context("read_dir entry")?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or("<unknown>")
            .to_string();

        let mut has_audio = false;
        let mut has_dirs = false;
        for child in fs::read_dir(&path).with_context(|| format!("read_dir {:?}", path))? {
            let child = child.context("read_dir entry")?.path();
            if child.is_dir() {
                has_dirs = true;
            } else if child.is_file() && is_audio_file(&child) {
                has_audio = true;
            }
        }
        let kind = match (has_audio, has_dirs) {
            (true, _) => PlaylistKind::Playlist,
            (false, true) => PlaylistKind::Folder,
            (false, false) => continue,
        };
        entries.push(PlaylistEntry { name, kind });
    }
    entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(entries)
}

pub fn is_audio_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or("")
        .to_ascii_lowercase();
    matches!(
        ext.as_str(),
        "flac" | "wav" | "mp3" | "m4a" | "aac" | "ogg" | "aif" | "aiff"
    )
}

/// 64-bit FNV-1a over the library-relative path.
pub fn track_id_for(relative_path: &str) -> TrackId {
    let hash = relative_path
        .bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME));
    TrackId(hash)
}

pub fn format_link(id: TrackId) -> String {
    format!("{LINK_PREFIX}{:016x}", id.0)
}

/// Parse `library:track:<16 hex digits>`.
pub fn parse_track_link(link: &str) -> Option<TrackId> {
    let hex = link.strip_prefix(LINK_PREFIX)?;
    if hex.len() != 16 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(hex, 16).ok().map(TrackId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::decode::tests::{temp_dir, wav_bytes};

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(track_id_for(""), TrackId(0xcbf29ce484222325));
        assert_eq!(track_id_for("a"), TrackId(0xaf63dc4c8601ec8c));
        assert_eq!(track_id_for("foobar"), TrackId(0x85944171f73967e8));
    }

    #[test]
    fn link_round_trips_through_parse() {
        let id = TrackId(0x00ab_cdef_0123_4567);
        let link = format_link(id);
        assert_eq!(link, "library:track:00abcdef01234567");
        assert_eq!(parse_track_link(&link), Some(id));
    }

    #[test]
    fn parse_rejects_malformed_links() {
        assert_eq!(parse_track_link("library:track:123"), None);
        assert_eq!(parse_track_link("library:track:zzzzzzzzzzzzzzzz"), None);
        assert_eq!(parse_track_link("spotify:track:00abcdef01234567"), None);
        assert_eq!(parse_track_link("library:track:+0abcdef01234567"), None);
        assert_eq!(parse_track_link(""), None);
    }

    #[test]
    fn is_audio_file_checks_extension() {
        assert!(is_audio_file(Path::new("a/b.FLAC")));
        assert!(is_audio_file(Path::new("b.wav")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("README")));
    }

    #[test]
    fn scan_library_indexes_tracks_and_playlists() {
        let root = temp_dir("index");
        let wav = wav_bytes(1, 8_000, &[0; 80]);
        fs::create_dir_all(root.join("Road Trip")).unwrap();
        fs::create_dir_all(root.join("Archive/2019")).unwrap();
        fs::create_dir_all(root.join("Empty")).unwrap();
        fs::write(root.join("Road Trip/Highway.wav"), &wav).unwrap();
        fs::write(root.join("Road Trip/notes.txt"), b"x").unwrap();
        fs::write(root.join("Archive/2019/apple.wav"), &wav).unwrap();
        fs::write(root.join("loose.wav"), &wav).unwrap();

        let index = scan_library(&root).unwrap();
        assert_eq!(index.len(), 3);

        let names = index.matching("").map(|t| t.track.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["apple", "Highway", "loose"]);

        let id = track_id_for("Road Trip/Highway.wav");
        let hit = index.get(id).expect("track by id");
        assert_eq!(hit.track.link, format_link(id));
        assert_eq!(hit.track.duration_ms, Some(10));

        assert_eq!(
            index.playlists(),
            &[
                PlaylistEntry {
                    name: "Archive".into(),
                    kind: PlaylistKind::Folder
                },
                PlaylistEntry {
                    name: "Road Trip".into(),
                    kind: PlaylistKind::Playlist
                },
            ]
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let root = temp_dir("match");
        let wav = wav_bytes(1, 8_000, &[0; 8]);
        fs::write(root.join("Blue Monday.wav"), &wav).unwrap();
        fs::write(root.join("Red.wav"), &wav).unwrap();

        let index = scan_library(&root).unwrap();
        let hits = index.matching("MON").map(|t| t.track.name.clone()).collect::<Vec<_>>();
        assert_eq!(hits, vec!["Blue Monday".to_string()]);
    }

    #[test]
    fn scan_library_fails_for_missing_root() {
        let root = temp_dir("gone").join("missing");
        assert!(scan_library(&root).is_err());
    }
}
