use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::Builder;
use walkdir::WalkDir;

use crate::errors::SyncError;

// @module: File discovery, pairing and atomic writes

// @const: Digit run
static DIGITS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Video container extensions picked up in a directory
pub const VIDEO_EXTENSIONS: [&str; 8] = ["mkv", "mp4", "avi", "mov", "webm", "m4v", "ts", "m2ts"];

/// Name prefix of in-flight output files
pub const TEMP_FILE_PREFIX: &str = ".subsync-";

/// A video and the external subtitle file to sync against it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPair {
    pub video: PathBuf,
    pub subtitle: PathBuf,
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Files directly inside `dir` with one of the extensions (case-insensitive)
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy();
                    if extensions.iter().any(|wanted| ext.eq_ignore_ascii_case(wanted)) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        Self::sort_naturally(&mut result);
        Ok(result)
    }

    /// Ordering key: whitespace removed, lower-cased, digit runs padded to five digits
    pub fn natural_sort_key(name: &str) -> String {
        let compact: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        DIGITS_REGEX
            .replace_all(&compact, |caps: &regex::Captures| format!("{:0>5}", &caps[0]))
            .into_owned()
    }

    /// Sort paths by the natural key of their file names
    pub fn sort_naturally(paths: &mut [PathBuf]) {
        paths.sort_by_cached_key(|path| {
            let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            Self::natural_sort_key(&name)
        });
    }

    /// Pair the videos of a directory with its subtitle files, in natural order
    ///
    /// `.srt` files come first; when their count does not match the videos and
    /// `include_ass` is set, `.ass`/`.ssa` files are added. Counts that still
    /// differ are an error.
    pub fn discover_pairs<P: AsRef<Path>>(dir: P, include_ass: bool) -> Result<Vec<MediaPair>> {
        let dir = dir.as_ref();
        let videos = Self::find_files(dir, &VIDEO_EXTENSIONS)?;
        let mut subtitles = Self::find_files(dir, &["srt"])?;

        if subtitles.len() != videos.len() && include_ass {
            debug!("{} videos but {} srt files, adding ass/ssa files", videos.len(), subtitles.len());
            subtitles.extend(Self::find_files(dir, &["ass", "ssa"])?);
            Self::sort_naturally(&mut subtitles);
        }

        if subtitles.len() != videos.len() {
            return Err(anyhow!(
                "Found {} videos but {} subtitle files in {:?}",
                videos.len(),
                subtitles.len(),
                dir
            ));
        }

        info!("Found {} video/subtitle pairs in {:?}", videos.len(), dir);
        Ok(videos
            .into_iter()
            .zip(subtitles)
            .map(|(video, subtitle)| MediaPair { video, subtitle })
            .collect())
    }

    /// `<video stem>.<subtitle extension>` inside `output_dir`
    pub fn output_path<P1: AsRef<Path>, P2: AsRef<Path>, P3: AsRef<Path>>(
        video: P1,
        subtitle: P2,
        output_dir: P3,
    ) -> PathBuf {
        let stem = video.as_ref().file_stem().unwrap_or_default().to_string_lossy().to_string();
        let extension = subtitle
            .as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_else(|| "srt".to_string());

        output_dir.as_ref().join(format!("{}.{}", stem, extension))
    }

    /// Write through a temporary file in the target directory, then rename
    ///
    /// A failure before the rename leaves any existing file untouched. The
    /// temporary file is removed on error, but a killed process leaves it
    /// behind as `.subsync-*.tmp`; see [`FileManager::remove_stale_temp_files`].
    pub fn write_atomically<P: AsRef<Path>>(path: P, content: &str) -> Result<(), SyncError> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut temp = Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&parent)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path)?;

        debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Delete temporary files an interrupted earlier run left in `dir`
    ///
    /// Returns how many were removed.
    pub fn remove_stale_temp_files<P: AsRef<Path>>(dir: P) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(dir.as_ref())? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(TEMP_FILE_PREFIX) || !entry.file_type()?.is_file() {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!("Removed stale temporary file {}", name);
                    removed += 1;
                }
                Err(e) => warn!("Could not remove stale temporary file {}: {}", name, e),
            }
        }
        Ok(removed)
    }
}
