/*!
 * # subsync
 *
 * Re-time out-of-sync subtitle files against the subtitles embedded in a video.
 *
 * ## Features
 *
 * - Pick the embedded reference track and the external subtitle file to sync
 * - Clean both streams of signs, karaoke, lyrics and sound effects so the
 *   aligner only sees dialogue
 * - Ask once per run about unknown styles and tags, optionally remembering the
 *   answers between runs
 * - Align with an external tool (alass) and apply the resulting timing to the
 *   original, uncleaned subtitles
 * - Batch processing of a whole directory with a final summary
 *
 * ## Architecture
 *
 * - `subtitle_processor`: Subtitle events and streams, SRT and ASS/SSA parsing
 * - `tag_rules`: Style and override-tag classification, tag decisions
 * - `classifier`: Per-line keep/drop rule cascade
 * - `scrubber`: Optional removal of in-line noise from the aligner copy
 * - `cleaning`: Cleaning pipeline and reports
 * - `selection`: Choosing the embedded/external pair
 * - `probe`: Listing and extracting container subtitle tracks
 * - `alignment`: External aligner and timing transforms
 * - `interaction`: Answering selection, tag and scrub questions
 * - `file_utils`: File discovery, pairing and atomic writes
 * - `language_utils`: ISO language code utilities
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod errors;
pub mod subtitle_processor;
pub mod tag_rules;
pub mod classifier;
pub mod scrubber;
pub mod cleaning;
pub mod selection;
pub mod probe;
pub mod alignment;
pub mod interaction;
pub mod file_utils;
pub mod language_utils;
pub mod app_config;
pub mod app_controller;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{BatchSummary, Controller, PairOutcome};
pub use subtitle_processor::{StreamOrigin, SubtitleEvent, SubtitleFormat, SubtitleStream};
pub use classifier::{LineClassifier, ReasonCode, Verdict};
pub use cleaning::{CleaningPipeline, CleaningReport};
pub use selection::{Selection, StreamSelector};
pub use alignment::{Aligner, AlignmentInvoker, TimingTransform};
pub use language_utils::{language_codes_match, normalize_to_part2t, get_language_name};
pub use errors::{AlignmentFailure, FormatParseError, SelectionError, SyncError};
