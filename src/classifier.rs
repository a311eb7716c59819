/*!
 * Per-line dialogue/noise classification.
 *
 * The classifier is an ordered cascade of `LineRule`s. Tag rules come first,
 * then the text heuristics of a `HeuristicProfile`; the first rule that fires
 * decides. Classification is pure: the same event and rule table always give
 * the same result and nothing is ever asked from the user here.
 */

use std::fmt;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::language_utils;
use crate::subtitle_processor::{strip_formatting, EventKind, SubtitleEvent};
use crate::tag_rules::{event_tags, NoiseKind, TagClass, TagRef, TagRuleSet};

/// Keep/drop outcome for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Keep,
    Drop,
    /// Kept, but carries tags the user has not decided on
    NeedsUserDecision,
}

/// Why an event got its verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    KaraokeTag,
    EffectTag,
    LyricsPattern,
    BracketedSfx,
    PureSymbolLine,
    MatchedKeepRule,
    DefaultKeep,
    CommentEvent,
    BlacklistedPhrase,
    ScrubbedEmpty,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KaraokeTag => "karaoke-tag",
            Self::EffectTag => "effect-tag",
            Self::LyricsPattern => "lyrics-pattern",
            Self::BracketedSfx => "bracketed-sfx",
            Self::PureSymbolLine => "pure-symbol-line",
            Self::MatchedKeepRule => "matched-keep-rule",
            Self::DefaultKeep => "default-keep",
            Self::CommentEvent => "comment-event",
            Self::BlacklistedPhrase => "blacklisted-phrase",
            Self::ScrubbedEmpty => "scrubbed-empty",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// @struct: Result of classifying one event
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    // @field: Verdict
    pub verdict: Verdict,

    // @field: Reason code
    pub reason: ReasonCode,

    // @field: Tag that decided the verdict, if any
    pub matched_tag: Option<TagRef>,

    // @field: Ambiguous tags of the event that are still undecided
    pub pending_tags: Vec<TagRef>,

    // @field: Zero-duration event
    pub suspicious_timing: bool,
}

impl ClassificationResult {
    /// Everything that is not dropped stays in the stream
    pub fn is_kept(&self) -> bool {
        self.verdict != Verdict::Drop
    }
}

/// What a rule decided
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub verdict: Verdict,
    pub reason: ReasonCode,
    pub matched_tag: Option<TagRef>,
}

impl RuleMatch {
    pub fn drop(reason: ReasonCode) -> Self {
        Self { verdict: Verdict::Drop, reason, matched_tag: None }
    }

    pub fn keep(reason: ReasonCode) -> Self {
        Self { verdict: Verdict::Keep, reason, matched_tag: None }
    }

    pub fn with_tag(mut self, tag: TagRef) -> Self {
        self.matched_tag = Some(tag);
        self
    }
}

/// Everything a rule may look at
pub struct LineContext<'a> {
    pub event: &'a SubtitleEvent,
    /// Text without override blocks, HTML tags and hard line breaks
    pub plain_text: &'a str,
    /// Style first, then the inline codes
    pub tags: &'a [TagRef],
    pub rules: &'a TagRuleSet,
}

/// One step of the cascade
pub trait LineRule: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// `None` hands the event to the next rule
    fn evaluate(&self, context: &LineContext<'_>) -> Option<RuleMatch>;
}

/// Any tag classified as structural noise drops the line
pub struct StructuralTagRule;

impl LineRule for StructuralTagRule {
    fn name(&self) -> &'static str {
        "structural-tag"
    }

    fn evaluate(&self, context: &LineContext<'_>) -> Option<RuleMatch> {
        context.tags.iter().find_map(|tag| {
            let rule = context.rules.lookup(tag)?;
            if rule.class != TagClass::StructuralNoise {
                return None;
            }
            let reason = match rule.kind {
                NoiseKind::Karaoke => ReasonCode::KaraokeTag,
                NoiseKind::Effect => ReasonCode::EffectTag,
            };
            Some(RuleMatch::drop(reason).with_tag(tag.clone()))
        })
    }
}

/// A cosmetic-keep style keeps the line without looking at the text
pub struct KeepStyleRule;

impl LineRule for KeepStyleRule {
    fn name(&self) -> &'static str {
        "keep-style"
    }

    fn evaluate(&self, context: &LineContext<'_>) -> Option<RuleMatch> {
        let style = context.tags.iter().find(|tag| tag.is_style())?;
        (context.rules.classify(style) == TagClass::CosmeticKeep)
            .then(|| RuleMatch::keep(ReasonCode::MatchedKeepRule).with_tag(style.clone()))
    }
}

/// ASS comment lines are never shown
pub struct CommentRule;

impl LineRule for CommentRule {
    fn name(&self) -> &'static str {
        "comment"
    }

    fn evaluate(&self, context: &LineContext<'_>) -> Option<RuleMatch> {
        (context.event.kind == EventKind::Comment).then(|| RuleMatch::drop(ReasonCode::CommentEvent))
    }
}

/// Credits and watermarks
pub struct BlacklistRule {
    phrases: Vec<String>,
}

impl BlacklistRule {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_lowercase()).filter(|p| !p.is_empty()).collect(),
        }
    }
}

impl LineRule for BlacklistRule {
    fn name(&self) -> &'static str {
        "blacklist"
    }

    fn evaluate(&self, context: &LineContext<'_>) -> Option<RuleMatch> {
        let text = context.plain_text.to_lowercase();
        self.phrases
            .iter()
            .any(|phrase| text.contains(phrase.as_str()))
            .then(|| RuleMatch::drop(ReasonCode::BlacklistedPhrase))
    }
}

/// Lines made only of bracketed groups, like "(door creaks)"
pub struct BracketedSfxRule {
    pairs: Vec<(char, char)>,
}

impl BracketedSfxRule {
    pub fn new(pairs: &[(char, char)]) -> Self {
        Self { pairs: pairs.to_vec() }
    }

    fn closer_for(&self, c: char) -> Option<char> {
        self.pairs.iter().find(|(open, _)| *open == c).map(|(_, close)| *close)
    }
}

impl LineRule for BracketedSfxRule {
    fn name(&self) -> &'static str {
        "bracketed-sfx"
    }

    fn evaluate(&self, context: &LineContext<'_>) -> Option<RuleMatch> {
        let mut expected: Vec<char> = Vec::new();
        let mut groups = 0;
        let mut outside_has_letters = false;

        for c in context.plain_text.chars() {
            if let Some(close) = self.closer_for(c) {
                if expected.is_empty() {
                    groups += 1;
                }
                expected.push(close);
            } else if expected.last() == Some(&c) {
                expected.pop();
            } else if expected.is_empty() && c.is_alphabetic() {
                outside_has_letters = true;
            }
        }

        // Unbalanced brackets are not a reliable signal
        if !expected.is_empty() || groups == 0 || outside_has_letters {
            return None;
        }
        Some(RuleMatch::drop(ReasonCode::BracketedSfx))
    }
}

/// Lines without a single letter or digit
pub struct PureSymbolRule;

impl LineRule for PureSymbolRule {
    fn name(&self) -> &'static str {
        "pure-symbol"
    }

    fn evaluate(&self, context: &LineContext<'_>) -> Option<RuleMatch> {
        (!context.plain_text.chars().any(char::is_alphanumeric))
            .then(|| RuleMatch::drop(ReasonCode::PureSymbolLine))
    }
}

/// Song lyrics: note symbols at the edges or dense in a short line, or a
/// song-like style name
pub struct LyricsRule {
    notes: Vec<char>,
    wrap_symbols: Vec<char>,
    style_keywords: Vec<String>,
    max_chars: usize,
    min_ratio: f32,
}

impl LyricsRule {
    pub fn new(profile: &HeuristicProfile) -> Self {
        Self {
            notes: profile.note_symbols.clone(),
            wrap_symbols: profile.wrap_symbols.clone(),
            style_keywords: profile.lyric_style_keywords.iter().map(|k| k.to_lowercase()).collect(),
            max_chars: profile.max_lyric_chars,
            min_ratio: profile.min_note_ratio,
        }
    }
}

impl LineRule for LyricsRule {
    fn name(&self) -> &'static str {
        "lyrics"
    }

    fn evaluate(&self, context: &LineContext<'_>) -> Option<RuleMatch> {
        let style = context.event.style.to_lowercase();
        if self.style_keywords.iter().any(|keyword| style.contains(keyword.as_str())) {
            return Some(RuleMatch::drop(ReasonCode::LyricsPattern));
        }

        let text = context.plain_text.trim();
        let first = text.chars().next()?;
        let last = text.chars().last()?;

        if self.wrap_symbols.contains(&first) && self.wrap_symbols.contains(&last) && text.chars().count() > 1 {
            return Some(RuleMatch::drop(ReasonCode::LyricsPattern));
        }

        let note_count = text.chars().filter(|c| self.notes.contains(c)).count();
        if note_count == 0 {
            return None;
        }
        if self.notes.contains(&first) || self.notes.contains(&last) {
            return Some(RuleMatch::drop(ReasonCode::LyricsPattern));
        }

        let visible = text.chars().filter(|c| !c.is_whitespace()).count();
        let ratio = note_count as f32 / visible.max(1) as f32;
        (visible <= self.max_chars && ratio >= self.min_ratio)
            .then(|| RuleMatch::drop(ReasonCode::LyricsPattern))
    }
}

/// Language specific tables for the text heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicProfile {
    /// Preset name, for logs
    pub name: String,

    /// Opening/closing bracket pairs marking sound effects
    pub bracket_pairs: Vec<(char, char)>,

    /// Musical note symbols
    pub note_symbols: Vec<char>,

    /// Symbols that, wrapping a whole line, mark sung or hummed text
    pub wrap_symbols: Vec<char>,

    /// Style name fragments of song styles
    pub lyric_style_keywords: Vec<String>,

    /// Longest line still treated as lyrics by note density
    pub max_lyric_chars: usize,

    /// Minimum share of note symbols among visible characters
    pub min_note_ratio: f32,

    /// Phrases of credit and watermark lines
    pub blacklisted_phrases: Vec<String>,
}

impl Default for HeuristicProfile {
    fn default() -> Self {
        Self::english()
    }
}

impl HeuristicProfile {
    pub fn english() -> Self {
        Self {
            name: "english".to_string(),
            bracket_pairs: vec![('(', ')'), ('[', ']')],
            note_symbols: vec!['♪', '♫', '♬', '♩'],
            wrap_symbols: Vec::new(),
            lyric_style_keywords: vec!["song".to_string(), "insert".to_string(), "lyric".to_string()],
            max_lyric_chars: 60,
            min_note_ratio: 0.1,
            blacklisted_phrases: Vec::new(),
        }
    }

    pub fn japanese() -> Self {
        Self {
            name: "japanese".to_string(),
            bracket_pairs: vec![
                ('(', ')'),
                ('[', ']'),
                ('（', '）'),
                ('［', '］'),
                ('【', '】'),
                ('〔', '〕'),
            ],
            note_symbols: vec!['♪', '♫', '♬', '♩'],
            wrap_symbols: vec!['～', '―', '~'],
            lyric_style_keywords: vec![
                "song".to_string(),
                "insert".to_string(),
                "lyric".to_string(),
                "歌".to_string(),
                "挿入歌".to_string(),
            ],
            max_lyric_chars: 40,
            min_note_ratio: 0.1,
            blacklisted_phrases: vec!["NETFLIX".to_string()],
        }
    }

    /// Preset for a language code; languages without a preset use English
    pub fn for_language(code: &str) -> Self {
        match language_utils::normalize_to_part2t(code).as_deref() {
            Ok("jpn") => Self::japanese(),
            Ok("eng") => Self::english(),
            _ => {
                debug!("No heuristic preset for '{}', using english", code);
                Self::english()
            }
        }
    }

    /// Text heuristics of this profile, in cascade order
    pub fn text_rules(&self) -> Vec<Box<dyn LineRule>> {
        vec![
            Box::new(BlacklistRule::new(&self.blacklisted_phrases)),
            Box::new(BracketedSfxRule::new(&self.bracket_pairs)),
            Box::new(PureSymbolRule),
            Box::new(LyricsRule::new(self)),
        ]
    }
}

/// Rule cascade over a resolved tag table
pub struct LineClassifier {
    rules: TagRuleSet,
    cascade: Vec<Box<dyn LineRule>>,
}

impl LineClassifier {
    /// Tag rules, comment lines, then the profile's text heuristics
    pub fn new(rules: TagRuleSet, profile: &HeuristicProfile) -> Self {
        let mut cascade: Vec<Box<dyn LineRule>> = vec![
            Box::new(StructuralTagRule),
            Box::new(KeepStyleRule),
            Box::new(CommentRule),
        ];
        cascade.extend(profile.text_rules());

        debug!("Classifier uses the '{}' heuristic profile", profile.name);
        Self { rules, cascade }
    }

    /// Classifier with a custom cascade
    pub fn with_cascade(rules: TagRuleSet, cascade: Vec<Box<dyn LineRule>>) -> Self {
        Self { rules, cascade }
    }

    pub fn tag_rules(&self) -> &TagRuleSet {
        &self.rules
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.cascade.iter().map(|rule| rule.name()).collect()
    }

    /// Classify one event
    pub fn classify(&self, event: &SubtitleEvent) -> ClassificationResult {
        let tags = event_tags(event);
        let plain_text = strip_formatting(&event.text);
        let pending_tags: Vec<TagRef> = tags
            .iter()
            .filter(|tag| self.rules.classify(tag) == TagClass::AmbiguousPrompt)
            .cloned()
            .collect();

        let context = LineContext {
            event,
            plain_text: &plain_text,
            tags: &tags,
            rules: &self.rules,
        };

        let decided = self.cascade.iter().find_map(|rule| rule.evaluate(&context));
        let outcome = decided.unwrap_or_else(|| {
            let verdict = if pending_tags.is_empty() { Verdict::Keep } else { Verdict::NeedsUserDecision };
            RuleMatch { verdict, reason: ReasonCode::DefaultKeep, matched_tag: None }
        });

        ClassificationResult {
            verdict: outcome.verdict,
            reason: outcome.reason,
            matched_tag: outcome.matched_tag,
            pending_tags,
            suspicious_timing: event.is_zero_duration(),
        }
    }
}
