/*!
 * Fake collaborators for testing
 *
 * The prober hands out canned tracks, the aligner shifts the target by a
 * fixed offset and the decider answers from a script. None of them start a
 * process, and each records what it was asked.
 */

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;

use subsync::alignment::{Aligner, TimingTransform};
use subsync::errors::{AlignmentFailure, SelectionError, SyncError};
use subsync::interaction::DecisionProvider;
use subsync::probe::{MediaProbe, SubtitleTrackInfo};
use subsync::scrubber::{ScrubCategory, ScrubDecisionRequest};
use subsync::selection::AmbiguousSide;
use subsync::subtitle_processor::{StreamOrigin, SubtitleStream};
use subsync::tag_rules::{TagDecision, TagDecisionRequest, TagRef};

/// Track metadata shorthand
pub fn track(index: usize, codec: &str, language: Option<&str>, title: Option<&str>) -> SubtitleTrackInfo {
    SubtitleTrackInfo {
        index,
        codec_name: codec.to_string(),
        language: language.map(|l| l.to_string()),
        title: title.map(|t| t.to_string()),
    }
}

/// Every video has the same canned tracks
#[derive(Debug, Default)]
pub struct FakeProbe {
    tracks: Vec<(SubtitleTrackInfo, String)>,
    extracted: Arc<Mutex<Vec<usize>>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, info: SubtitleTrackInfo, content: &str) -> Self {
        self.tracks.push((info, content.to_string()));
        self
    }

    /// Indexes of the tracks extracted so far
    pub fn extracted(&self) -> Arc<Mutex<Vec<usize>>> {
        self.extracted.clone()
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn list_subtitle_tracks(&self, _video: &Path) -> Result<Vec<SubtitleTrackInfo>, SyncError> {
        Ok(self.tracks.iter().map(|(info, _)| info.clone()).collect())
    }

    async fn extract_track(&self, video: &Path, track: &SubtitleTrackInfo, directory: &Path) -> Result<PathBuf, SyncError> {
        let (_, content) = self.tracks
            .iter()
            .find(|(info, _)| info.index == track.index)
            .ok_or_else(|| SyncError::Probe(format!("no track {}", track.index)))?;

        let stem = video.file_stem().unwrap_or_default().to_string_lossy();
        let path = directory.join(format!("{}.track{}.{}", stem, track.index, track.format().extension()));
        fs::write(&path, content)?;
        self.extracted.lock().unwrap().push(track.index);
        Ok(path)
    }
}

/// What the aligner was handed
#[derive(Debug, Clone, PartialEq)]
pub struct AlignCall {
    pub reference_events: usize,
    pub reference_texts: Vec<String>,
    pub target_events: usize,
    pub target_texts: Vec<String>,
}

/// Shifts every target event by a constant offset
#[derive(Debug, Default)]
pub struct FakeAligner {
    shift_ms: i64,
    fail: bool,
    drop_last: bool,
    calls: Arc<Mutex<Vec<AlignCall>>>,
}

impl FakeAligner {
    pub fn shifting(shift_ms: i64) -> Self {
        Self { shift_ms, ..Self::default() }
    }

    /// Exits with a non-zero status
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Loses the last event, which no real aligner does
    pub fn lossy(shift_ms: i64) -> Self {
        Self { shift_ms, drop_last: true, ..Self::default() }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<AlignCall>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl Aligner for FakeAligner {
    fn name(&self) -> &str {
        "fake-aligner"
    }

    async fn align(&self, reference: &Path, target: &Path, output: &Path) -> Result<(), AlignmentFailure> {
        let malformed = |e: subsync::errors::FormatParseError| AlignmentFailure::MalformedOutput(e.to_string());
        let reference = SubtitleStream::load(reference, StreamOrigin::Embedded).map_err(malformed)?;
        let target = SubtitleStream::load(target, StreamOrigin::External).map_err(malformed)?;

        self.calls.lock().unwrap().push(AlignCall {
            reference_events: reference.event_count(),
            reference_texts: reference.events().iter().map(|e| e.text.clone()).collect(),
            target_events: target.event_count(),
            target_texts: target.events().iter().map(|e| e.text.clone()).collect(),
        });

        if self.fail {
            return Err(AlignmentFailure::ExitStatus {
                code: Some(1),
                stderr: "error: no speech detected".to_string(),
            });
        }

        let mut shifted = TimingTransform::constant(self.shift_ms).apply(&target).map_err(malformed)?;
        if self.drop_last {
            let mut events = shifted.events().to_vec();
            events.pop();
            shifted = shifted.derive(events).map_err(malformed)?;
        }
        fs::write(output, shifted.serialize()).map_err(|e| AlignmentFailure::Spawn(e.to_string()))
    }
}

/// Everything the decider was asked
#[derive(Debug, Default)]
pub struct DeciderLog {
    pub stream_prompts: Vec<StreamOrigin>,
    pub tag_requests: Vec<TagRef>,
    pub scrub_requests: Vec<ScrubCategory>,
}

/// Answers from a script, falling back to the suggestions
#[derive(Debug)]
pub struct ScriptedDecider {
    stream_choices: VecDeque<usize>,
    cancel_streams: bool,
    tag_decision: TagDecision,
    scrub: bool,
    log: Arc<Mutex<DeciderLog>>,
}

impl ScriptedDecider {
    pub fn new() -> Self {
        Self {
            stream_choices: VecDeque::new(),
            cancel_streams: false,
            tag_decision: TagDecision::Keep,
            scrub: false,
            log: Arc::new(Mutex::new(DeciderLog::default())),
        }
    }

    pub fn choosing(mut self, choices: &[usize]) -> Self {
        self.stream_choices = choices.iter().copied().collect();
        self
    }

    pub fn cancelling(mut self) -> Self {
        self.cancel_streams = true;
        self
    }

    pub fn deciding_tags(mut self, decision: TagDecision) -> Self {
        self.tag_decision = decision;
        self
    }

    pub fn scrubbing(mut self, scrub: bool) -> Self {
        self.scrub = scrub;
        self
    }

    pub fn log(&self) -> Arc<Mutex<DeciderLog>> {
        self.log.clone()
    }
}

impl DecisionProvider for ScriptedDecider {
    fn choose_stream(&mut self, side: &AmbiguousSide) -> Result<usize, SelectionError> {
        self.log.lock().unwrap().stream_prompts.push(side.side);
        if self.cancel_streams {
            return Err(SelectionError::Cancelled);
        }
        Ok(self.stream_choices.pop_front().unwrap_or(side.suggested))
    }

    fn decide_tags(&mut self, requests: &[TagDecisionRequest]) -> Result<Vec<(TagRef, TagDecision)>, SyncError> {
        let mut log = self.log.lock().unwrap();
        Ok(requests
            .iter()
            .map(|request| {
                log.tag_requests.push(request.tag.clone());
                (request.tag.clone(), self.tag_decision)
            })
            .collect())
    }

    fn confirm_scrub(&mut self, request: &ScrubDecisionRequest) -> Result<bool, SyncError> {
        self.log.lock().unwrap().scrub_requests.push(request.category);
        Ok(self.scrub)
    }
}
