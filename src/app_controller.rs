use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};

use crate::alignment::{AlassAligner, Aligner, AlignmentInvoker};
use crate::app_config::Config;
use crate::classifier::LineClassifier;
use crate::cleaning::{survey_tags, CleaningPipeline, CleaningReport};
use crate::errors::{SelectionError, SyncError};
use crate::file_utils::FileManager;
use crate::interaction::{AutoDecider, ConsolePrompter, DecisionProvider};
use crate::language_utils;
use crate::probe::{FfmpegProbe, MediaProbe, SubtitleTrackInfo};
use crate::scrubber::{ScrubCategory, TextScrubber};
use crate::selection::{SelectionMemory, StreamSelector};
use crate::subtitle_processor::{StreamOrigin, SubtitleStream};
use crate::tag_rules::{TagDecisionCache, TagRuleSet};

// @module: Application controller for subtitle syncing

/// Decisions collected while a controller runs, shared by all its pairs
#[derive(Debug, Default)]
pub struct RunState {
    // @field: Tag decisions of this run (merged with the decisions file)
    pub decisions: TagDecisionCache,

    // @field: Scrub categories the user enabled
    pub scrubber: TextScrubber,

    // @field: Scrub categories already offered
    pub scrub_asked: HashSet<ScrubCategory>,

    // @field: Embedded track picked by the user
    pub selection_memory: SelectionMemory,
}

/// Result of one successfully handled pair
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// The retimed subtitles were written
    Synced {
        output: PathBuf,
        events: usize,
        report: CleaningReport,
    },
    /// The output already existed and `force` was not set
    AlreadyExists(PathBuf),
}

/// End-of-batch accounting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub succeeded: Vec<PathBuf>,
    pub skipped: Vec<(PathBuf, String)>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Write the summary to the log, one line per skipped or failed pair
    pub fn log(&self) {
        info!("{}", self);
        for (video, reason) in &self.skipped {
            warn!("Skipped {}: {}", file_name(video), reason);
        }
        for (video, reason) in &self.failed {
            error!("Failed {}: {}", file_name(video), reason);
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} pairs: {} synced, {} skipped, {} failed",
            self.total(),
            self.succeeded.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Container prober
    probe: Arc<dyn MediaProbe>,

    // @field: External aligner
    aligner: Arc<dyn Aligner>,

    // @field: Answers prompts
    decider: Box<dyn DecisionProvider>,

    // @field: Per-run decisions
    state: RunState,
}

impl Controller {
    /// Controller backed by ffprobe/ffmpeg and alass
    ///
    /// `interactive` selects the console prompter, otherwise every question
    /// gets its default answer.
    pub fn with_config(config: Config, interactive: bool) -> Result<Self> {
        config.validate()?;

        let probe = Arc::new(FfmpegProbe::new(&config.tools));
        let aligner = Arc::new(AlassAligner::new(&config.tools));
        let decider: Box<dyn DecisionProvider> = if interactive {
            Box::new(ConsolePrompter::new())
        } else {
            Box::new(AutoDecider::new())
        };

        Ok(Self::with_components(config, probe, aligner, decider))
    }

    /// Controller with explicit collaborators
    pub fn with_components(
        config: Config,
        probe: Arc<dyn MediaProbe>,
        aligner: Arc<dyn Aligner>,
        decider: Box<dyn DecisionProvider>,
    ) -> Self {
        Self {
            config,
            probe,
            aligner,
            decider,
            state: RunState::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Sync one video against one or more candidate subtitle files
    pub async fn run_pair(
        &mut self,
        video: &Path,
        subtitles: &[PathBuf],
        output_dir: &Path,
        force_overwrite: bool,
    ) -> Result<PairOutcome, SyncError> {
        info!("Processing {}", file_name(video));

        let listed: Vec<SubtitleTrackInfo> = self.probe
            .list_subtitle_tracks(video)
            .await?
            .into_iter()
            .filter(|track| {
                if track.is_bitmap() {
                    warn!("Ignoring bitmap subtitle track {} ({})", track.index, track.codec_name);
                }
                !track.is_bitmap()
            })
            .collect();

        let external = self.load_external(subtitles)?;
        if external.is_empty() {
            return Err(SelectionError::NoCandidates { side: StreamOrigin::External }.into());
        }

        // A track that cannot be extracted or parsed only costs its own candidacy
        let scratch = tempfile::tempdir()?;
        let mut tracks = Vec::with_capacity(listed.len());
        let mut embedded = Vec::with_capacity(listed.len());
        for track in listed {
            match self.load_embedded(video, &track, scratch.path()).await {
                Ok(stream) => {
                    embedded.push(stream);
                    tracks.push(track);
                }
                Err(e) => warn!("Ignoring embedded track {} ({}): {}", track.index, track.display_name(), e),
            }
        }

        if embedded.len() > 1 {
            let signatures: Vec<_> = tracks.iter().map(SubtitleTrackInfo::signature).collect();
            if let Some(index) = self.state.selection_memory.recall(&signatures) {
                info!("Reusing the embedded track chosen earlier: {}", tracks[index].display_name());
                embedded = vec![embedded.swap_remove(index)];
                tracks = vec![tracks.swap_remove(index)];
            }
        }

        let selector = StreamSelector::new().with_language(self.config.language.clone());
        let decider = &mut self.decider;
        let mut asked_embedded = false;
        let selection = selector.select_with(&embedded, &external, |side| {
            asked_embedded |= side.side == StreamOrigin::Embedded;
            decider.choose_stream(side)
        })?;
        if asked_embedded {
            self.state.selection_memory.remember(tracks[selection.embedded].signature());
        }

        let reference = &embedded[selection.embedded];
        let target = &external[selection.external];
        info!("Reference: {} ({} events)", reference.label(), reference.event_count());
        info!("Target: {} ({} events)", target.label(), target.event_count());

        let output = FileManager::output_path(video, &target.source_path, output_dir);
        if output.exists() && !force_overwrite {
            return Ok(PairOutcome::AlreadyExists(output));
        }

        let rules = self.decide_tags(reference, target)?;
        self.decide_scrubbing(target)?;

        let profile = self.config.cleaning.heuristic_profile(&self.config.language);
        let pipeline = CleaningPipeline::new(LineClassifier::new(rules.clone(), &profile))
            .with_scrubber(self.state.scrubber.clone());

        let cleaned = pipeline.clean(target)?;
        info!("Cleaned {}: {}", target.label(), cleaned.report.summary());

        let cleaned_reference = if self.config.cleaning.clean_reference {
            // Heuristics of the reference's own language, never scrubbed
            let reference_profile = self.config.cleaning
                .stream_profile(reference.language.as_deref(), &self.config.language);
            let reference_pipeline = CleaningPipeline::new(LineClassifier::new(rules, &reference_profile));
            match reference_pipeline.clean(reference) {
                Ok(cleaned_reference) => {
                    info!("Cleaned {}: {}", reference.label(), cleaned_reference.report.summary());
                    Some(cleaned_reference.stream)
                }
                Err(SyncError::EmptyStream { report, .. }) => {
                    warn!(
                        "Cleaning would empty the reference ({}), aligning against it uncleaned",
                        report.summary()
                    );
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };
        let reference_input = cleaned_reference.as_ref().unwrap_or(reference);

        let invoker = AlignmentInvoker::new(self.aligner.as_ref());
        let retimed = invoker.align_to_file(reference_input, &cleaned.stream, target, &output).await?;

        Ok(PairOutcome::Synced {
            output,
            events: retimed.event_count(),
            report: cleaned.report,
        })
    }

    /// Sync every video of a directory against its paired subtitle file
    pub async fn run_folder(&mut self, input_dir: &Path, force_overwrite: bool) -> Result<BatchSummary> {
        if !input_dir.is_dir() {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let pairs = FileManager::discover_pairs(input_dir, self.config.output.include_ass_when_unpaired)?;
        if pairs.is_empty() {
            return Err(anyhow!("No video files found in directory: {:?}", input_dir));
        }

        let output_dir = self.config.output.directory.clone().unwrap_or_else(|| input_dir.to_path_buf());
        FileManager::ensure_dir(&output_dir)?;
        let stale = FileManager::remove_stale_temp_files(&output_dir)?;
        if stale > 0 {
            info!("Removed {} temporary file(s) left by an interrupted run", stale);
        }

        let progress_bar = ProgressBar::new(pairs.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pairs {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("=> "));

        let mut summary = BatchSummary::default();
        for pair in &pairs {
            progress_bar.set_message(file_name(&pair.video));

            let output = FileManager::output_path(&pair.video, &pair.subtitle, &output_dir);
            if output.exists() && !force_overwrite {
                warn!("Skipping {}, output already exists (use -f to force overwrite)", file_name(&pair.video));
                summary.skipped.push((pair.video.clone(), "output already exists".to_string()));
                progress_bar.inc(1);
                continue;
            }

            let subtitles = [pair.subtitle.clone()];
            let result = self.run_pair(&pair.video, &subtitles, &output_dir, force_overwrite).await;
            Self::record(&mut summary, &pair.video, result);
            progress_bar.inc(1);
        }

        progress_bar.finish_with_message("done");
        summary.log();
        Ok(summary)
    }

    fn record(summary: &mut BatchSummary, video: &Path, result: Result<PairOutcome, SyncError>) {
        match result {
            Ok(PairOutcome::Synced { output, events, .. }) => {
                info!("Success: {} ({} events)", output.display(), events);
                summary.succeeded.push(video.to_path_buf());
            }
            Ok(PairOutcome::AlreadyExists(output)) => {
                warn!("Skipping {}, {} already exists", file_name(video), output.display());
                summary.skipped.push((video.to_path_buf(), "output already exists".to_string()));
            }
            Err(e) if e.is_skip() => {
                warn!("Skipping {}: {}", file_name(video), e);
                summary.skipped.push((video.to_path_buf(), e.to_string()));
            }
            Err(e) => {
                if let SyncError::EmptyStream { report, .. } = &e {
                    for (reason, examples) in &report.dropped_examples {
                        debug!("Dropped as {}: {:?}", reason, examples);
                    }
                }
                error!("Error processing {}: {}", file_name(video), e);
                summary.failed.push((video.to_path_buf(), e.to_string()));
            }
        }
    }

    fn load_external(&self, subtitles: &[PathBuf]) -> Result<Vec<SubtitleStream>, SyncError> {
        subtitles
            .iter()
            .map(|path| {
                let language = language_utils::language_from_path(path)
                    .unwrap_or_else(|| self.config.language.clone());
                Ok(SubtitleStream::load(path, StreamOrigin::External)?.with_language(Some(language)))
            })
            .collect()
    }

    async fn load_embedded(
        &self,
        video: &Path,
        track: &SubtitleTrackInfo,
        scratch: &Path,
    ) -> Result<SubtitleStream, SyncError> {
        let path = self.probe.extract_track(video, track, scratch).await?;
        debug!("Extracted track {} to {}", track.index, path.display());

        Ok(SubtitleStream::load(&path, StreamOrigin::Embedded)?
            .with_track_index(track.index)
            .with_language(track.language.clone())
            .with_title(track.title.clone()))
    }

    /// Ask about unknown tags and return the resolved rule table
    fn decide_tags(&mut self, reference: &SubtitleStream, target: &SubtitleStream) -> Result<TagRuleSet, SyncError> {
        let decisions_file = self.config.cleaning.decisions_file.clone();
        if let Some(path) = &decisions_file {
            let stored = TagDecisionCache::load(path)?;
            let added = self.state.decisions.merge(&stored);
            if added > 0 {
                debug!("Loaded {} tag decisions from {}", added, path.display());
            }
        }

        let rules = TagRuleSet::builtin().with_overrides(self.config.cleaning.tag_overrides.clone());
        let mut surveyed = vec![target];
        if self.config.cleaning.clean_reference {
            surveyed.push(reference);
        }

        let requests = survey_tags(&surveyed, &rules, &self.state.decisions);
        if !requests.is_empty() {
            info!("{} styles or tags need a decision", requests.len());
            let mut recorded = 0;
            for (tag, decision) in self.decider.decide_tags(&requests)? {
                if self.state.decisions.record(tag, decision) {
                    recorded += 1;
                }
            }
            debug!("Recorded {} tag decisions", recorded);

            if let Some(path) = &decisions_file {
                self.state.decisions.persist(path)?;
            }
        }

        Ok(rules.resolve(&self.state.decisions))
    }

    /// Offer the configured scrub categories found in the target, once per run
    fn decide_scrubbing(&mut self, target: &SubtitleStream) -> Result<(), SyncError> {
        let pending: Vec<ScrubCategory> = self.config.cleaning.scrub_categories
            .iter()
            .copied()
            .filter(|category| !self.state.scrub_asked.contains(category))
            .collect();

        for request in TextScrubber::survey(target.events(), &pending) {
            self.state.scrub_asked.insert(request.category);
            if self.decider.confirm_scrub(&request)? {
                info!("Scrubbing {} from the aligner input", request.category);
                self.state.scrubber.enable(request.category);
            }
        }
        Ok(())
    }
}
