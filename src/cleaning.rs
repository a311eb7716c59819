/*!
 * Stream cleaning.
 *
 * The pipeline runs the classifier over every event of a stream, keeps the
 * events that are not dropped, optionally scrubs their text, and returns a
 * new stream together with a report. The input stream is never touched.
 */

use std::collections::BTreeMap;
use log::{debug, trace};
use serde::Serialize;

use crate::classifier::{LineClassifier, ReasonCode, Verdict};
use crate::errors::SyncError;
use crate::scrubber::TextScrubber;
use crate::subtitle_processor::{strip_formatting, SubtitleEvent, SubtitleStream};
use crate::tag_rules::{event_tags, TagClass, TagDecisionCache, TagDecisionRequest, TagRef, TagRuleSet};

/// Examples kept per reason in a report
const REPORT_EXAMPLE_LIMIT: usize = 5;

/// Examples kept per ambiguous tag in a survey
const SURVEY_EXAMPLE_LIMIT: usize = 5;

// @struct: What cleaning did to one stream
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    // @field: Events looked at
    pub total: usize,

    // @field: Events in the cleaned stream
    pub kept: usize,

    // @field: Events removed
    pub dropped: usize,

    // @field: Kept events with undecided ambiguous tags
    pub undecided: usize,

    // @field: Zero-duration events
    pub suspicious_timing: usize,

    // @field: Event count per reason code
    pub by_reason: BTreeMap<ReasonCode, usize>,

    // @field: A few dropped lines per reason
    pub dropped_examples: BTreeMap<ReasonCode, Vec<String>>,

    // @field: Distinct undecided tags
    pub pending_tags: Vec<TagRef>,
}

impl CleaningReport {
    fn record(&mut self, event: &SubtitleEvent, verdict: Verdict, reason: ReasonCode, suspicious: bool, pending: &[TagRef]) {
        self.total += 1;
        *self.by_reason.entry(reason).or_insert(0) += 1;

        match verdict {
            Verdict::Drop => {
                self.dropped += 1;
                let examples = self.dropped_examples.entry(reason).or_default();
                if examples.len() < REPORT_EXAMPLE_LIMIT {
                    examples.push(event.plain_text().replace('\n', " / "));
                }
            }
            Verdict::Keep => self.kept += 1,
            Verdict::NeedsUserDecision => {
                self.kept += 1;
                self.undecided += 1;
            }
        }

        if suspicious {
            self.suspicious_timing += 1;
        }
        for tag in pending {
            if !self.pending_tags.contains(tag) {
                self.pending_tags.push(tag.clone());
            }
        }
    }

    /// Number of events with the given reason
    pub fn count(&self, reason: ReasonCode) -> usize {
        self.by_reason.get(&reason).copied().unwrap_or(0)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let reasons: Vec<String> = self.by_reason
            .iter()
            .map(|(reason, count)| format!("{}={}", reason, count))
            .collect();

        let mut summary = format!(
            "{} events: {} kept, {} dropped [{}]",
            self.total,
            self.kept,
            self.dropped,
            reasons.join(", ")
        );
        if self.undecided > 0 {
            summary.push_str(&format!(", {} with undecided tags", self.undecided));
        }
        if self.suspicious_timing > 0 {
            summary.push_str(&format!(", {} zero-length", self.suspicious_timing));
        }
        summary
    }
}

/// Cleaned copy of a stream
#[derive(Debug, Clone)]
pub struct CleanedStream {
    /// Kept events, original timing
    pub stream: SubtitleStream,

    /// What was removed and why
    pub report: CleaningReport,

    /// Index in the source stream of every kept event
    pub source_indices: Vec<usize>,
}

/// Classifier plus optional scrubbing over whole streams
pub struct CleaningPipeline {
    classifier: LineClassifier,
    scrubber: TextScrubber,
}

impl CleaningPipeline {
    pub fn new(classifier: LineClassifier) -> Self {
        Self {
            classifier,
            scrubber: TextScrubber::new(),
        }
    }

    pub fn with_scrubber(mut self, scrubber: TextScrubber) -> Self {
        self.scrubber = scrubber;
        self
    }

    pub fn classifier(&self) -> &LineClassifier {
        &self.classifier
    }

    /// Clean a stream
    ///
    /// Fails with `SyncError::EmptyStream` when nothing would be left.
    pub fn clean(&self, stream: &SubtitleStream) -> Result<CleanedStream, SyncError> {
        let mut report = CleaningReport::default();
        let mut kept = Vec::new();
        let mut source_indices = Vec::new();

        for (index, event) in stream.events().iter().enumerate() {
            let result = self.classifier.classify(event);
            let mut verdict = result.verdict;
            let mut reason = result.reason;

            if result.is_kept() {
                let text = self.scrubber.scrub(&event.text);
                if strip_formatting(&text).chars().any(char::is_alphanumeric) {
                    kept.push(event.with_text(text));
                    source_indices.push(index);
                } else {
                    verdict = Verdict::Drop;
                    reason = ReasonCode::ScrubbedEmpty;
                }
            }

            trace!("{} -> {:?} ({})", event, verdict, reason);
            report.record(event, verdict, reason, result.suspicious_timing, &result.pending_tags);
        }

        debug!("Cleaned {}: {}", stream.label(), report.summary());

        if kept.is_empty() {
            return Err(SyncError::EmptyStream {
                path: stream.source_path.clone(),
                report: Box::new(report),
            });
        }

        Ok(CleanedStream {
            stream: stream.derive(kept)?,
            report,
            source_indices,
        })
    }
}

/// Ambiguous tags of the streams that are not decided yet, most frequent first
pub fn survey_tags(streams: &[&SubtitleStream], rules: &TagRuleSet, decisions: &TagDecisionCache) -> Vec<TagDecisionRequest> {
    let mut found: BTreeMap<TagRef, (usize, Vec<String>)> = BTreeMap::new();

    for event in streams.iter().flat_map(|stream| stream.events()) {
        for tag in event_tags(event) {
            if rules.classify(&tag) != TagClass::AmbiguousPrompt || decisions.contains(&tag) {
                continue;
            }
            let (count, examples) = found.entry(tag).or_default();
            *count += 1;
            if examples.len() < SURVEY_EXAMPLE_LIMIT {
                let line = event.plain_text().replace('\n', " / ");
                if !line.is_empty() {
                    examples.push(line);
                }
            }
        }
    }

    let mut requests: Vec<TagDecisionRequest> = found
        .into_iter()
        .map(|(tag, (occurrences, examples))| TagDecisionRequest { tag, occurrences, examples })
        .collect();
    requests.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    requests
}
