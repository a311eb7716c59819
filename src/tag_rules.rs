/*!
 * Style and inline-tag rules.
 *
 * A `TagRuleSet` maps style names and inline override codes to a class that
 * tells the classifier whether the tag marks non-dialogue content. Tags that
 * no rule knows are ambiguous; the user decides them once per run and the
 * decisions live in a `TagDecisionCache` that is passed through explicitly.
 */

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::SyncError;
use crate::file_utils::FileManager;
use crate::subtitle_processor::SubtitleEvent;

// @const: Override block contents
static OVERRIDE_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([^}]*)\}").unwrap()
});

/// Karaoke timing codes
const KARAOKE_CODES: [&str; 4] = ["k", "K", "kf", "ko"];

/// Positioning and drawing codes
const EFFECT_CODES: [&str; 6] = ["pos", "move", "org", "p", "clip", "iclip"];

/// Font and colour codes that never change what a line says
const COSMETIC_CODES: [&str; 42] = [
    "alpha", "fscx", "fscy", "shad", "bord", "blur", "fade", "xbord", "ybord", "xshad", "yshad",
    "fad", "fax", "fay", "frx", "fry", "frz", "fsp", "pbo", "an", "be", "fe", "fn", "fr", "fs",
    "a", "b", "c", "i", "q", "r", "s", "t", "u",
    "1c", "2c", "3c", "4c", "1a", "2a", "3a", "4a",
];

const KARAOKE_STYLES: [&str; 4] = ["Karaoke", "Kara", "Romaji", "Kanji"];

const EFFECT_STYLES: [&str; 12] = [
    "OP", "ED", "Opening", "Ending", "Song", "Insert", "Lyrics", "Sign", "Caption", "Title", "Note", "TL Note",
];

const NEUTRAL_STYLES: [&str; 11] = [
    "Default", "Main", "Dialogue", "Dialog", "Italics", "Top", "Alt", "Narration", "Thoughts", "Flashback", "Overlap",
];

/// What a tag says about the line carrying it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagClass {
    /// The line is not dialogue (karaoke, signs, songs)
    StructuralNoise,
    /// Purely visual, the line is dialogue
    CosmeticKeep,
    /// Unknown, the user has to decide
    AmbiguousPrompt,
    /// Known dialogue style without a signal either way
    Neutral,
}

/// Flavour of structural noise, used for the reason code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NoiseKind {
    Karaoke,
    #[default]
    Effect,
}

/// A style name or an inline override code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagRef {
    /// Block-level style name
    Style(String),
    /// Inline override code without the backslash (`k`, `pos`, `fn`)
    Inline(String),
}

impl TagRef {
    pub fn style(name: impl Into<String>) -> Self {
        Self::Style(name.into())
    }

    pub fn inline(code: impl Into<String>) -> Self {
        Self::Inline(code.into())
    }

    pub fn is_style(&self) -> bool {
        matches!(self, Self::Style(_))
    }

    /// Whether this tag, used as a rule pattern, matches an observed tag
    pub fn matches(&self, observed: &TagRef) -> bool {
        match (self, observed) {
            (Self::Style(pattern), Self::Style(style)) => style_matches(pattern, style),
            (Self::Inline(pattern), Self::Inline(code)) => pattern == code,
            _ => false,
        }
    }
}

impl fmt::Display for TagRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Style(name) => write!(f, "style \"{}\"", name),
            Self::Inline(code) => write!(f, "inline \\{}", code),
        }
    }
}

fn style_tokens(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Token-wise, case-insensitive; long pattern tokens also match as a prefix
fn style_matches(pattern: &str, style: &str) -> bool {
    let pattern_tokens = style_tokens(pattern);
    let tokens = style_tokens(style);
    if pattern_tokens.is_empty() || tokens.len() < pattern_tokens.len() {
        return false;
    }

    tokens.windows(pattern_tokens.len()).any(|window| {
        window.iter().zip(&pattern_tokens).all(|(token, wanted)| {
            token == wanted || (wanted.chars().count() >= 4 && token.starts_with(wanted.as_str()))
        })
    })
}

// @struct: One entry of the rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRule {
    // @field: Style name or inline code to match
    pub pattern: TagRef,

    // @field: Classification of matching tags
    pub class: TagClass,

    // @field: Noise flavour for structural rules
    #[serde(default)]
    pub kind: NoiseKind,

    // @field: Human readable description
    #[serde(default)]
    pub description: String,

    // @field: Match only the identical tag, no token or prefix matching
    #[serde(default)]
    pub exact: bool,
}

impl TagRule {
    pub fn new(pattern: TagRef, class: TagClass, description: impl Into<String>) -> Self {
        Self {
            pattern,
            class,
            kind: NoiseKind::default(),
            description: description.into(),
            exact: false,
        }
    }

    pub fn with_kind(mut self, kind: NoiseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Restrict the rule to the identical tag
    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Whether the rule applies to an observed tag
    pub fn matches(&self, observed: &TagRef) -> bool {
        if self.exact {
            &self.pattern == observed
        } else {
            self.pattern.matches(observed)
        }
    }
}

/// Ordered rule table, first match wins
#[derive(Debug, Clone, PartialEq)]
pub struct TagRuleSet {
    rules: Vec<TagRule>,
}

impl TagRuleSet {
    /// Empty table, every tag is ambiguous
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Built-in table of common fansub styles and ASS override codes
    pub fn builtin() -> Self {
        let mut rules = Vec::new();

        for style in KARAOKE_STYLES {
            rules.push(
                TagRule::new(TagRef::style(style), TagClass::StructuralNoise, "karaoke line")
                    .with_kind(NoiseKind::Karaoke),
            );
        }
        for style in EFFECT_STYLES {
            rules.push(TagRule::new(TagRef::style(style), TagClass::StructuralNoise, "song, sign or note"));
        }
        for style in NEUTRAL_STYLES {
            rules.push(TagRule::new(TagRef::style(style), TagClass::Neutral, "dialogue style"));
        }
        for code in KARAOKE_CODES {
            rules.push(
                TagRule::new(TagRef::inline(code), TagClass::StructuralNoise, "karaoke syllable timing")
                    .with_kind(NoiseKind::Karaoke),
            );
        }
        for code in EFFECT_CODES {
            rules.push(TagRule::new(TagRef::inline(code), TagClass::StructuralNoise, "positioning or drawing"));
        }
        for code in COSMETIC_CODES {
            rules.push(TagRule::new(TagRef::inline(code), TagClass::CosmeticKeep, "font or colour override"));
        }

        Self { rules }
    }

    /// Put user rules in front of the existing ones
    pub fn with_overrides(mut self, overrides: Vec<TagRule>) -> Self {
        if !overrides.is_empty() {
            debug!("Applying {} tag rule overrides", overrides.len());
        }
        let mut rules = overrides;
        rules.append(&mut self.rules);
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &[TagRule] {
        &self.rules
    }

    /// First rule matching the tag
    pub fn lookup(&self, tag: &TagRef) -> Option<&TagRule> {
        self.rules.iter().find(|rule| rule.matches(tag))
    }

    /// Class of a tag; unknown tags are ambiguous
    pub fn classify(&self, tag: &TagRef) -> TagClass {
        self.lookup(tag)
            .map(|rule| rule.class)
            .unwrap_or(TagClass::AmbiguousPrompt)
    }

    /// Rule set with this run's user decisions appended
    ///
    /// A decision covers exactly the tag it was taken for: "Hero" decides
    /// nothing about "Heroine", which gets its own question.
    pub fn resolve(&self, decisions: &TagDecisionCache) -> TagRuleSet {
        let mut rules = self.rules.clone();
        rules.extend(decisions.iter().map(|(tag, decision)| decision.to_rule(tag.clone())));
        TagRuleSet { rules }
    }
}

impl Default for TagRuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The user's answer for an ambiguous tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagDecision {
    Keep,
    Drop,
}

impl TagDecision {
    /// Rule equivalent of the decision
    pub fn to_rule(self, tag: TagRef) -> TagRule {
        match self {
            Self::Keep => TagRule::new(tag, TagClass::Neutral, "kept by user").exact(),
            Self::Drop => TagRule::new(tag, TagClass::StructuralNoise, "dropped by user").exact(),
        }
    }
}

/// Serialized form of one cached decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDecisionEntry {
    pub tag: TagRef,
    pub decision: TagDecision,
}

/// Decisions taken during a run, append-only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TagDecisionEntry>", into = "Vec<TagDecisionEntry>")]
pub struct TagDecisionCache {
    decisions: BTreeMap<TagRef, TagDecision>,
}

impl From<Vec<TagDecisionEntry>> for TagDecisionCache {
    fn from(entries: Vec<TagDecisionEntry>) -> Self {
        let mut cache = Self::default();
        for entry in entries {
            cache.record(entry.tag, entry.decision);
        }
        cache
    }
}

impl From<TagDecisionCache> for Vec<TagDecisionEntry> {
    fn from(cache: TagDecisionCache) -> Self {
        cache.decisions
            .into_iter()
            .map(|(tag, decision)| TagDecisionEntry { tag, decision })
            .collect()
    }
}

impl TagDecisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a decision; returns false if the tag was already decided
    pub fn record(&mut self, tag: TagRef, decision: TagDecision) -> bool {
        if self.decisions.contains_key(&tag) {
            debug!("Ignoring second decision for {}", tag);
            return false;
        }
        self.decisions.insert(tag, decision);
        true
    }

    pub fn get(&self, tag: &TagRef) -> Option<TagDecision> {
        self.decisions.get(tag).copied()
    }

    pub fn contains(&self, tag: &TagRef) -> bool {
        self.decisions.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagRef, &TagDecision)> {
        self.decisions.iter()
    }

    /// Add every decision of `other` that is not known yet
    pub fn merge(&mut self, other: &TagDecisionCache) -> usize {
        other.iter()
            .filter(|(tag, decision)| self.record((*tag).clone(), **decision))
            .count()
    }

    /// Load persisted decisions; a missing file is an empty cache
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SyncError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            warn!("Cannot read tag decisions from {}: {}", path.display(), e);
            SyncError::Config(format!("invalid decisions file {}: {}", path.display(), e))
        })
    }

    /// Merge with what is on disk and write the result back
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<(), SyncError> {
        let path = path.as_ref();
        let mut on_disk = Self::load(path)?;
        let added = on_disk.merge(self);
        if added == 0 && path.exists() {
            return Ok(());
        }

        let json = serde_json::to_string_pretty(&on_disk)
            .map_err(|e| SyncError::Config(format!("cannot serialize tag decisions: {}", e)))?;
        FileManager::write_atomically(path, &json)?;
        debug!("Persisted {} new tag decisions to {}", added, path.display());
        Ok(())
    }
}

/// An ambiguous tag the user has to decide on
#[derive(Debug, Clone, PartialEq)]
pub struct TagDecisionRequest {
    /// The tag
    pub tag: TagRef,
    /// Number of events carrying it
    pub occurrences: usize,
    /// A few lines that carry it
    pub examples: Vec<String>,
}

impl fmt::Display for TagDecisionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} lines)", self.tag, self.occurrences)
    }
}

/// Distinct inline override codes of a text, in order of appearance
pub fn inline_tags(text: &str) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();

    for caps in OVERRIDE_BLOCK_REGEX.captures_iter(text) {
        let block = &caps[1];
        let mut rest = block;
        while let Some(pos) = rest.find('\\') {
            rest = &rest[pos + 1..];
            if let Some(code) = read_code(rest) {
                if !codes.iter().any(|c| c == &code) {
                    codes.push(code);
                }
            }
        }
    }

    codes
}

/// Read the code at the start of `input` (the text right after a backslash)
fn read_code(input: &str) -> Option<String> {
    let digit_len = input.chars().next().filter(char::is_ascii_digit).map_or(0, |_| 1);
    let letters: String = input[digit_len..]
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect();
    if letters.is_empty() {
        return None;
    }

    let candidate = format!("{}{}", &input[..digit_len], letters);
    let known = KARAOKE_CODES.iter()
        .chain(EFFECT_CODES.iter())
        .chain(COSMETIC_CODES.iter())
        .filter(|code| candidate.starts_with(**code))
        .max_by_key(|code| code.len());

    Some(known.map_or(candidate, |code| code.to_string()))
}

/// Style and inline tags of an event, style first
pub fn event_tags(event: &SubtitleEvent) -> Vec<TagRef> {
    let mut tags = Vec::new();
    if !event.style.trim().is_empty() {
        tags.push(TagRef::Style(event.style.trim().to_string()));
    }
    tags.extend(inline_tags(&event.text).into_iter().map(TagRef::Inline));
    tags
}
