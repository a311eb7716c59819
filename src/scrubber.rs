/*!
 * Optional text scrubbing of the aligner copy.
 *
 * Japanese subtitles often carry hearing-impaired annotations, furigana
 * readings and decoration symbols inside dialogue lines. They do not justify
 * dropping the line, but removing them gives the aligner cleaner input.
 * Every category is switched on separately after the user has seen samples.
 */

use std::collections::BTreeSet;
use std::fmt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::subtitle_processor::SubtitleEvent;

/// Maximum number of sample lines shown per category
pub const SURVEY_SAMPLE_LIMIT: usize = 10;

static HEARING_IMPAIRED_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"（.+?）").unwrap());
static SPECIAL_SYMBOLS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[♪～―~]").unwrap());
static FURIGANA_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([ぁ-ゞ]+?\)").unwrap());
static INITIAL_BRACKETS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(.+?\)").unwrap());
static SPACES_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{3000}]+").unwrap());

/// A kind of in-line noise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrubCategory {
    /// Full-width parenthesised annotations: `（ドアの音）`
    HearingImpaired,
    /// Decoration symbols: `♪ ～ ― ~`
    SpecialSymbols,
    /// Hiragana readings in ASCII parentheses: `漢字(かんじ)`
    Furigana,
    /// A parenthesised span opening the line, usually a speaker name
    InitialBrackets,
}

impl ScrubCategory {
    pub const ALL: [ScrubCategory; 4] = [
        Self::HearingImpaired,
        Self::SpecialSymbols,
        Self::Furigana,
        Self::InitialBrackets,
    ];

    fn regex(&self) -> &'static Regex {
        match self {
            Self::HearingImpaired => &*HEARING_IMPAIRED_REGEX,
            Self::SpecialSymbols => &*SPECIAL_SYMBOLS_REGEX,
            Self::Furigana => &*FURIGANA_REGEX,
            Self::InitialBrackets => &*INITIAL_BRACKETS_REGEX,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::HearingImpaired => "hearing impaired annotations （...）",
            Self::SpecialSymbols => "special symbols ♪ ～ ― ~",
            Self::Furigana => "furigana readings (...)",
            Self::InitialBrackets => "leading bracketed names (...)",
        }
    }

    /// Whether a single line contains this kind of noise
    pub fn matches(&self, line: &str) -> bool {
        self.regex().is_match(line)
    }
}

impl fmt::Display for ScrubCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Samples for one category, to be confirmed by the user
#[derive(Debug, Clone, PartialEq)]
pub struct ScrubDecisionRequest {
    pub category: ScrubCategory,
    /// Number of matching lines
    pub matches: usize,
    /// At most `SURVEY_SAMPLE_LIMIT` matching lines
    pub samples: Vec<String>,
}

/// Removes the enabled categories from event text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextScrubber {
    enabled: BTreeSet<ScrubCategory>,
}

fn lines_of(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').flat_map(|line| line.split("\\N"))
}

impl TextScrubber {
    /// Scrubber with nothing enabled
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories<I: IntoIterator<Item = ScrubCategory>>(categories: I) -> Self {
        Self {
            enabled: categories.into_iter().collect(),
        }
    }

    pub fn enable(&mut self, category: ScrubCategory) {
        self.enabled.insert(category);
    }

    pub fn is_enabled(&self, category: ScrubCategory) -> bool {
        self.enabled.contains(&category)
    }

    pub fn is_active(&self) -> bool {
        !self.enabled.is_empty()
    }

    pub fn enabled(&self) -> impl Iterator<Item = ScrubCategory> + '_ {
        self.enabled.iter().copied()
    }

    /// Count and sample the lines each category would touch
    ///
    /// Categories without a single match are left out.
    pub fn survey(events: &[SubtitleEvent], categories: &[ScrubCategory]) -> Vec<ScrubDecisionRequest> {
        categories
            .iter()
            .filter_map(|category| {
                let matching: Vec<&str> = events
                    .iter()
                    .flat_map(|event| lines_of(&event.text))
                    .filter(|line| category.matches(line))
                    .collect();
                if matching.is_empty() {
                    return None;
                }
                Some(ScrubDecisionRequest {
                    category: *category,
                    matches: matching.len(),
                    samples: matching.iter().take(SURVEY_SAMPLE_LIMIT).map(|line| line.to_string()).collect(),
                })
            })
            .collect()
    }

    /// Remove enabled categories line by line and collapse whitespace
    pub fn scrub(&self, text: &str) -> String {
        if !self.is_active() {
            return text.to_string();
        }

        lines_of(text)
            .map(|line| {
                let scrubbed = self.enabled.iter().fold(line.to_string(), |acc, category| {
                    category.regex().replace_all(&acc, "").into_owned()
                });
                SPACES_REGEX.replace_all(scrubbed.trim(), " ").into_owned()
            })
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
