/*!
 * Choosing the embedded/external pair to align.
 *
 * With one candidate on each side the pair is obvious. Otherwise the
 * selector narrows each crowded side by language and, when the remaining
 * candidates agree on a language, takes the one whose event count is closest
 * to the other side. Anything it cannot settle is returned as a
 * `SelectionRequest` for the caller to answer.
 */

use std::fmt;
use log::{debug, info};

use crate::errors::SelectionError;
use crate::language_utils;
use crate::subtitle_processor::{StreamOrigin, SubtitleStream};

/// Lines shown per candidate
pub const PREVIEW_LINES: usize = 3;

/// Chosen indices into the embedded and external candidate lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub embedded: usize,
    pub external: usize,
}

// @struct: What the user sees about a candidate
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSummary {
    // @field: Position in the candidate list
    pub index: usize,

    // @field: Container track index (embedded only)
    pub track_index: Option<usize>,

    // @field: Language tag
    pub language: Option<String>,

    // @field: Track title or file name
    pub title: Option<String>,

    // @field: Number of events
    pub event_count: usize,

    // @field: First lines, formatting stripped
    pub preview: Vec<String>,
}

impl CandidateSummary {
    pub fn from_stream(index: usize, stream: &SubtitleStream) -> Self {
        Self {
            index,
            track_index: stream.track_index,
            language: stream.language.clone(),
            title: stream.title.clone().or_else(|| {
                stream.source_path.file_name().map(|name| name.to_string_lossy().to_string())
            }),
            event_count: stream.event_count(),
            preview: stream.preview(PREVIEW_LINES),
        }
    }

    /// Language name for display, "unknown" when missing
    pub fn display_language(&self) -> String {
        match &self.language {
            Some(code) => language_utils::get_language_name(code).unwrap_or_else(|_| code.clone()),
            None => "unknown".to_string(),
        }
    }
}

impl fmt::Display for CandidateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(track) = self.track_index {
            write!(f, "#{} ", track)?;
        }
        write!(f, "{}", self.title.as_deref().unwrap_or("untitled"))?;
        write!(f, " [{}] {} events", self.display_language(), self.event_count)?;
        if !self.preview.is_empty() {
            write!(f, " | {}", self.preview.join(" | "))?;
        }
        Ok(())
    }
}

/// A side the caller has to choose on
#[derive(Debug, Clone, PartialEq)]
pub struct AmbiguousSide {
    pub side: StreamOrigin,
    pub candidates: Vec<CandidateSummary>,
    /// Index the selector would pick
    pub suggested: usize,
}

/// Sides needing an answer, plus the choice made so far
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRequest {
    pub sides: Vec<AmbiguousSide>,
    /// Automatic or suggested indices, overwritten by the answers
    pub provisional: Selection,
}

impl SelectionRequest {
    /// Apply answers given as (side, index) pairs
    pub fn answer(&self, answers: &[(StreamOrigin, usize)]) -> Result<Selection, SelectionError> {
        let mut selection = self.provisional;
        for (side, index) in answers {
            let ambiguous = self.sides
                .iter()
                .find(|s| s.side == *side)
                .ok_or(SelectionError::InvalidChoice { side: *side, index: *index, available: 0 })?;
            if *index >= ambiguous.candidates.len() {
                return Err(SelectionError::InvalidChoice {
                    side: *side,
                    index: *index,
                    available: ambiguous.candidates.len(),
                });
            }
            match side {
                StreamOrigin::Embedded => selection.embedded = *index,
                StreamOrigin::External => selection.external = *index,
            }
        }
        Ok(selection)
    }
}

/// Result of a selection attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    Selected(Selection),
    NeedsDecision(SelectionRequest),
}

/// Picks one embedded and one external stream
#[derive(Debug, Clone, Default)]
pub struct StreamSelector {
    language: Option<String>,
}

impl StreamSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefer candidates in this language on crowded sides
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Select automatically or describe what needs deciding
    pub fn select(
        &self,
        embedded: &[SubtitleStream],
        external: &[SubtitleStream],
    ) -> Result<SelectionOutcome, SelectionError> {
        if embedded.is_empty() {
            return Err(SelectionError::NoCandidates { side: StreamOrigin::Embedded });
        }
        if external.is_empty() {
            return Err(SelectionError::NoCandidates { side: StreamOrigin::External });
        }

        if embedded.len() == 1 && external.len() == 1 {
            return Ok(SelectionOutcome::Selected(Selection { embedded: 0, external: 0 }));
        }

        let mut sides = Vec::new();

        let external_pick = if external.len() == 1 {
            0
        } else {
            let target = (embedded.len() == 1).then(|| embedded[0].event_count());
            let (pick, settled) = self.narrow(external, target);
            if !settled {
                sides.push(self.ambiguous_side(StreamOrigin::External, external, pick));
            }
            pick
        };

        let embedded_pick = if embedded.len() == 1 {
            0
        } else {
            let target = Some(external[external_pick].event_count());
            let (pick, settled) = self.narrow(embedded, target);
            // With both sides crowded the embedded suggestion rests on a guess
            if !settled || external.len() > 1 {
                sides.push(self.ambiguous_side(StreamOrigin::Embedded, embedded, pick));
            }
            pick
        };

        let provisional = Selection { embedded: embedded_pick, external: external_pick };
        if sides.is_empty() {
            info!(
                "Selected embedded stream {} ({} events) for external stream {} ({} events)",
                embedded[embedded_pick].label(),
                embedded[embedded_pick].event_count(),
                external[external_pick].label(),
                external[external_pick].event_count()
            );
            return Ok(SelectionOutcome::Selected(provisional));
        }

        sides.sort_by_key(|side| side.side == StreamOrigin::External);
        Ok(SelectionOutcome::NeedsDecision(SelectionRequest { sides, provisional }))
    }

    /// Select, asking `choose` for every side that needs a decision
    pub fn select_with<F>(
        &self,
        embedded: &[SubtitleStream],
        external: &[SubtitleStream],
        mut choose: F,
    ) -> Result<Selection, SelectionError>
    where
        F: FnMut(&AmbiguousSide) -> Result<usize, SelectionError>,
    {
        match self.select(embedded, external)? {
            SelectionOutcome::Selected(selection) => Ok(selection),
            SelectionOutcome::NeedsDecision(request) => {
                let mut answers = Vec::new();
                for side in &request.sides {
                    answers.push((side.side, choose(side)?));
                }
                request.answer(&answers)
            }
        }
    }

    /// Best candidate of a crowded side and whether it is unambiguous
    ///
    /// Candidates in the preferred language are considered first. When all
    /// considered candidates share one language, the closest event count to
    /// `target` wins (earlier candidate on ties) and the pick is settled.
    fn narrow(&self, candidates: &[SubtitleStream], target: Option<usize>) -> (usize, bool) {
        let preferred: Vec<usize> = match &self.language {
            Some(language) => candidates
                .iter()
                .enumerate()
                .filter(|(_, stream)| {
                    stream.language.as_deref().is_some_and(|code| {
                        language_utils::language_codes_match(code, language)
                    })
                })
                .map(|(index, _)| index)
                .collect(),
            None => Vec::new(),
        };
        let pool: Vec<usize> = if preferred.is_empty() {
            (0..candidates.len()).collect()
        } else {
            preferred
        };

        let first_language = normalized_language(&candidates[pool[0]]);
        let same_language = pool.iter().all(|index| normalized_language(&candidates[*index]) == first_language);

        let pick = match target {
            Some(target) => pool
                .iter()
                .copied()
                .min_by_key(|index| (candidates[*index].event_count().abs_diff(target), *index))
                .unwrap_or(pool[0]),
            None => pool[0],
        };

        let settled = same_language && target.is_some();
        debug!(
            "Narrowed {} candidates to {} (pool {:?}, settled: {})",
            candidates.len(),
            pick,
            pool,
            settled
        );
        (pick, settled)
    }

    fn ambiguous_side(&self, side: StreamOrigin, candidates: &[SubtitleStream], suggested: usize) -> AmbiguousSide {
        AmbiguousSide {
            side,
            candidates: candidates
                .iter()
                .enumerate()
                .map(|(index, stream)| CandidateSummary::from_stream(index, stream))
                .collect(),
            suggested,
        }
    }
}

fn normalized_language(stream: &SubtitleStream) -> Option<String> {
    stream.language.as_deref().map(|code| {
        language_utils::normalize_to_part2t(code).unwrap_or_else(|_| code.to_lowercase())
    })
}

/// Identity of an embedded track across the videos of a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackSignature {
    pub language: Option<String>,
    pub title: Option<String>,
    pub codec: Option<String>,
}

/// Embedded track choice remembered for the rest of a batch
#[derive(Debug, Clone, Default)]
pub struct SelectionMemory {
    embedded: Option<TrackSignature>,
}

impl SelectionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, signature: TrackSignature) {
        debug!("Remembering embedded track choice {:?}", signature);
        self.embedded = Some(signature);
    }

    /// Index of the only candidate with the remembered signature
    pub fn recall(&self, candidates: &[TrackSignature]) -> Option<usize> {
        let remembered = self.embedded.as_ref()?;
        let mut matching = candidates
            .iter()
            .enumerate()
            .filter(|(_, signature)| *signature == remembered)
            .map(|(index, _)| index);
        let first = matching.next()?;
        matching.next().is_none().then_some(first)
    }
}
