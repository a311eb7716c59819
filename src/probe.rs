/*!
 * Media probing.
 *
 * Listing and extracting the subtitle tracks of a video container is done by
 * ffprobe and ffmpeg. Both sit behind the `MediaProbe` trait so the pipeline
 * can run against a fake in tests.
 */

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;

use crate::app_config::ToolsConfig;
use crate::errors::SyncError;
use crate::selection::TrackSignature;
use crate::subtitle_processor::SubtitleFormat;

/// Subtitle track metadata as reported by the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrackInfo {
    /// The index/id of the stream in the container
    pub index: usize,
    /// The codec name of the subtitle track
    pub codec_name: String,
    /// The language code (ISO 639-1 or ISO 639-2)
    pub language: Option<String>,
    /// The title of the subtitle track if available
    pub title: Option<String>,
}

impl SubtitleTrackInfo {
    /// Bitmap subtitles cannot be turned into text events
    pub fn is_bitmap(&self) -> bool {
        matches!(
            self.codec_name.as_str(),
            "hdmv_pgs_subtitle" | "dvd_subtitle" | "dvb_subtitle" | "xsub"
        )
    }

    /// Format the track is extracted to
    pub fn format(&self) -> SubtitleFormat {
        SubtitleFormat::for_codec(&self.codec_name)
    }

    /// Title, else language, else "unknown"
    pub fn display_name(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.language.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn signature(&self) -> TrackSignature {
        TrackSignature {
            language: self.language.clone(),
            title: self.title.clone(),
            codec: Some(self.codec_name.clone()),
        }
    }
}

/// Access to the subtitle tracks of a video container
#[async_trait]
pub trait MediaProbe: Send + Sync + Debug {
    /// Subtitle tracks of the container, in stream order
    async fn list_subtitle_tracks(&self, video: &Path) -> Result<Vec<SubtitleTrackInfo>, SyncError>;

    /// Extract one track into `directory`, returning the written file
    async fn extract_track(&self, video: &Path, track: &SubtitleTrackInfo, directory: &Path) -> Result<PathBuf, SyncError>;
}

/// ffprobe/ffmpeg backed prober
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    ffprobe_path: String,
    ffmpeg_path: String,
    probe_timeout: Duration,
    extract_timeout: Duration,
}

impl FfmpegProbe {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            ffprobe_path: tools.ffprobe_path.clone(),
            ffmpeg_path: tools.ffmpeg_path.clone(),
            probe_timeout: Duration::from_secs(tools.probe_timeout_secs),
            extract_timeout: Duration::from_secs(tools.extract_timeout_secs),
        }
    }

    /// Parse the JSON printed by `ffprobe -show_streams -select_streams s`
    pub fn parse_ffprobe_output(stdout: &str) -> Result<Vec<SubtitleTrackInfo>, SyncError> {
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }

        let json: Value = serde_json::from_str(stdout)
            .map_err(|e| SyncError::Probe(format!("Failed to parse ffprobe JSON output: {}", e)))?;

        let Some(streams) = json.get("streams").and_then(|s| s.as_array()) else {
            return Ok(Vec::new());
        };

        let tracks = streams
            .iter()
            .map(|stream| {
                let tag = |name: &str| {
                    stream.get("tags")
                        .and_then(|t| t.get(name))
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                };

                SubtitleTrackInfo {
                    index: stream.get("index").and_then(|v| v.as_u64()).map(|v| v as usize).unwrap_or(0),
                    codec_name: stream.get("codec_name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                    language: tag("language"),
                    title: tag("title"),
                }
            })
            .collect();

        Ok(tracks)
    }

    /// Keep the meaningful lines of ffmpeg's stderr
    fn filter_ffmpeg_stderr(stderr: &str) -> String {
        let noise_prefixes = [
            "ffmpeg version",
            "built with",
            "configuration:",
            "lib",
            "Input #",
            "Metadata:",
            "Duration:",
            "Chapter",
            "Stream #",
            "Output #",
            "Stream mapping:",
            "Press [q]",
        ];

        let meaningful: Vec<&str> = stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p)))
            .collect();

        if meaningful.is_empty() {
            "unknown ffmpeg error".to_string()
        } else {
            meaningful.join("\n")
        }
    }
}

#[async_trait]
impl MediaProbe for FfmpegProbe {
    async fn list_subtitle_tracks(&self, video: &Path) -> Result<Vec<SubtitleTrackInfo>, SyncError> {
        if !video.exists() {
            return Err(SyncError::Probe(format!("Video file not found: {}", video.display())));
        }

        let ffprobe_future = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-select_streams", "s"])
            .arg(video)
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = ffprobe_future => {
                result.map_err(|e| SyncError::Probe(format!("Failed to execute ffprobe: {}", e)))?
            },
            _ = tokio::time::sleep(self.probe_timeout) => {
                return Err(SyncError::Probe(format!(
                    "ffprobe timed out after {} seconds", self.probe_timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("ffprobe failed on {}: {}", video.display(), stderr.trim());
            return Err(SyncError::Probe(format!("ffprobe failed: {}", stderr.trim())));
        }

        let tracks = Self::parse_ffprobe_output(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Found {} subtitle tracks in {}", tracks.len(), video.display());
        Ok(tracks)
    }

    async fn extract_track(&self, video: &Path, track: &SubtitleTrackInfo, directory: &Path) -> Result<PathBuf, SyncError> {
        if track.is_bitmap() {
            return Err(SyncError::Probe(format!(
                "Track {} uses bitmap codec {} and cannot be extracted as text",
                track.index, track.codec_name
            )));
        }

        let format = track.format();
        let stem = video.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "video".to_string());
        let output_path = directory.join(format!("{}.track{}.{}", stem, track.index, format.extension()));

        let ffmpeg_future = Command::new(&self.ffmpeg_path)
            .args(["-y", "-nostdin", "-i"])
            .arg(video)
            .args(["-map", &format!("0:{}", track.index), "-c:s", format.extension()])
            .arg(&output_path)
            .kill_on_drop(true)
            .output();

        let result = tokio::select! {
            result = ffmpeg_future => {
                result.map_err(|e| SyncError::Probe(format!("Failed to execute ffmpeg: {}", e)))?
            },
            _ = tokio::time::sleep(self.extract_timeout) => {
                return Err(SyncError::Probe(format!(
                    "ffmpeg timed out after {} seconds", self.extract_timeout.as_secs()
                )));
            }
        };

        if !result.status.success() {
            let filtered = Self::filter_ffmpeg_stderr(&String::from_utf8_lossy(&result.stderr));
            error!("Subtitle extraction failed: {}", filtered);
            return Err(SyncError::Probe(format!("ffmpeg extraction failed: {}", filtered)));
        }

        let size = std::fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            warn!("Track {} of {} extracted to an empty file", track.index, video.display());
            return Err(SyncError::Probe(format!("Extracted track {} is empty", track.index)));
        }

        Ok(output_path)
    }
}
