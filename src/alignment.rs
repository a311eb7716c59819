/*!
 * Alignment boundary.
 *
 * The cleaned external stream and the reference stream are written to a
 * scratch directory and handed to an external aligner. The aligner's output
 * is only used to derive a timing transform; the transform is then applied
 * to the original, uncleaned stream so no line is lost in the final file.
 */

use std::fmt::Debug;
use std::fs;
use std::path::Path;
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::process::Command;

use crate::app_config::ToolsConfig;
use crate::errors::{AlignmentFailure, FormatParseError, SyncError};
use crate::file_utils::FileManager;
use crate::subtitle_processor::{parse_ass_string, parse_srt_string, StreamOrigin, SubtitleEvent, SubtitleFormat, SubtitleStream};

/// External re-timing tool
#[async_trait]
pub trait Aligner: Send + Sync + Debug {
    /// Tool name for logs
    fn name(&self) -> &str;

    /// Retime `target` against `reference`, writing the result to `output`
    async fn align(&self, reference: &Path, target: &Path, output: &Path) -> Result<(), AlignmentFailure>;
}

/// `alass <reference> <target> <output>`
#[derive(Debug, Clone)]
pub struct AlassAligner {
    path: String,
    args: Vec<String>,
    timeout: Duration,
}

impl AlassAligner {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            path: tools.aligner_path.clone(),
            args: tools.aligner_args.clone(),
            timeout: Duration::from_secs(tools.aligner_timeout_secs),
        }
    }
}

#[async_trait]
impl Aligner for AlassAligner {
    fn name(&self) -> &str {
        &self.path
    }

    async fn align(&self, reference: &Path, target: &Path, output: &Path) -> Result<(), AlignmentFailure> {
        let alass_future = Command::new(&self.path)
            .arg(reference)
            .arg(target)
            .arg(output)
            .args(&self.args)
            .kill_on_drop(true)
            .output();

        let result = tokio::select! {
            result = alass_future => {
                result.map_err(|e| AlignmentFailure::Spawn(format!("{}: {}", self.path, e)))?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(AlignmentFailure::TimedOut { secs: self.timeout.as_secs() });
            }
        };

        let stdout = String::from_utf8_lossy(&result.stdout);
        for line in stdout.lines().filter(|line| line.contains("shifted block")) {
            info!("{}", line.trim());
        }

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(AlignmentFailure::ExitStatus {
                code: result.status.code(),
                stderr: tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
            });
        }

        Ok(())
    }
}

/// Offset measured at one point of the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Original start of a cleaned event
    pub source_ms: u64,
    /// Shift the aligner applied to it
    pub offset_ms: i64,
}

/// Piecewise-constant retiming derived from the aligner output
#[derive(Debug, Clone, PartialEq)]
pub struct TimingTransform {
    anchors: Vec<Anchor>,
}

impl TimingTransform {
    /// Pair each cleaned event with its aligned counterpart
    ///
    /// The aligner keeps event order and count; anything else is malformed.
    pub fn from_pairs(cleaned: &[SubtitleEvent], aligned: &[SubtitleEvent]) -> Result<Self, AlignmentFailure> {
        if cleaned.len() != aligned.len() {
            return Err(AlignmentFailure::MalformedOutput(format!(
                "aligner returned {} events for {} input events",
                aligned.len(),
                cleaned.len()
            )));
        }
        if cleaned.is_empty() {
            return Err(AlignmentFailure::EmptyInput { side: StreamOrigin::External });
        }

        let mut anchors: Vec<Anchor> = cleaned
            .iter()
            .zip(aligned)
            .map(|(before, after)| Anchor {
                source_ms: before.start_ms,
                offset_ms: after.start_ms as i64 - before.start_ms as i64,
            })
            .collect();
        anchors.sort_by_key(|anchor| anchor.source_ms);
        anchors.dedup_by_key(|anchor| anchor.source_ms);

        Ok(Self { anchors })
    }

    /// Transform shifting everything by one offset
    pub fn constant(offset_ms: i64) -> Self {
        Self {
            anchors: vec![Anchor { source_ms: 0, offset_ms }],
        }
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Offset of the nearest anchor, the earlier one on ties
    pub fn offset_at(&self, ms: u64) -> i64 {
        let next = self.anchors.partition_point(|anchor| anchor.source_ms <= ms);
        let before = next.checked_sub(1).map(|i| self.anchors[i]);
        let after = self.anchors.get(next).copied();

        match (before, after) {
            (Some(before), Some(after)) => {
                if ms - before.source_ms <= after.source_ms - ms {
                    before.offset_ms
                } else {
                    after.offset_ms
                }
            }
            (Some(anchor), None) | (None, Some(anchor)) => anchor.offset_ms,
            (None, None) => 0,
        }
    }

    fn shift(ms: u64, offset: i64) -> u64 {
        (ms as i64 + offset).max(0) as u64
    }

    /// Retime every event of `stream` by the offset at its start
    pub fn apply(&self, stream: &SubtitleStream) -> Result<SubtitleStream, FormatParseError> {
        let events = stream
            .events()
            .iter()
            .map(|event| {
                let offset = self.offset_at(event.start_ms);
                event.retimed(Self::shift(event.start_ms, offset), Self::shift(event.end_ms, offset))
            })
            .collect();
        stream.derive(events)
    }
}

/// Runs the aligner on cleaned streams and retimes the original stream
pub struct AlignmentInvoker<'a> {
    aligner: &'a dyn Aligner,
}

impl<'a> AlignmentInvoker<'a> {
    pub fn new(aligner: &'a dyn Aligner) -> Self {
        Self { aligner }
    }

    /// Derive the timing transform of `cleaned` against `reference`
    pub async fn compute_transform(
        &self,
        reference: &SubtitleStream,
        cleaned: &SubtitleStream,
    ) -> Result<TimingTransform, SyncError> {
        if reference.event_count() == 0 {
            return Err(AlignmentFailure::EmptyInput { side: StreamOrigin::Embedded }.into());
        }
        if cleaned.event_count() == 0 {
            return Err(AlignmentFailure::EmptyInput { side: StreamOrigin::External }.into());
        }

        let scratch = tempfile::tempdir()?;
        let reference_path = scratch.path().join(format!("reference.{}", reference.format.extension()));
        let target_path = scratch.path().join(format!("target.{}", cleaned.format.extension()));
        let output_path = scratch.path().join(format!("aligned.{}", cleaned.format.extension()));

        fs::write(&reference_path, reference.serialize())?;
        fs::write(&target_path, cleaned.serialize())?;

        debug!(
            "Running {} on {} reference and {} target events",
            self.aligner.name(),
            reference.event_count(),
            cleaned.event_count()
        );
        self.aligner.align(&reference_path, &target_path, &output_path).await?;

        let bytes = fs::read(&output_path)
            .map_err(|e| AlignmentFailure::MalformedOutput(format!("cannot read aligner output: {}", e)))?;
        let content = String::from_utf8_lossy(&bytes);

        // File order, not start order: pairing relies on the aligner keeping it
        let aligned = match cleaned.format {
            SubtitleFormat::Srt => parse_srt_string(&content),
            SubtitleFormat::Ass => parse_ass_string(&content).map(|(_, events)| events),
        }
        .map_err(|e| AlignmentFailure::MalformedOutput(e.to_string()))?;

        let transform = TimingTransform::from_pairs(cleaned.events(), &aligned)?;
        debug!("Derived timing transform with {} anchors", transform.anchors().len());
        Ok(transform)
    }

    /// Align and return the retimed original stream
    pub async fn align(
        &self,
        reference: &SubtitleStream,
        cleaned: &SubtitleStream,
        original: &SubtitleStream,
    ) -> Result<SubtitleStream, SyncError> {
        let transform = self.compute_transform(reference, cleaned).await?;
        let retimed = transform.apply(original)?;

        if retimed.event_count() != original.event_count() {
            warn!("Retimed stream lost events, refusing to write it");
            return Err(AlignmentFailure::MalformedOutput("event count changed while retiming".to_string()).into());
        }
        Ok(retimed)
    }

    /// Align and write the retimed original stream atomically to `output`
    pub async fn align_to_file(
        &self,
        reference: &SubtitleStream,
        cleaned: &SubtitleStream,
        original: &SubtitleStream,
        output: &Path,
    ) -> Result<SubtitleStream, SyncError> {
        let retimed = self.align(reference, cleaned, original).await?;
        FileManager::write_atomically(output, &retimed.serialize())?;
        info!("Wrote synced subtitles to {}", output.display());
        Ok(retimed)
    }
}
