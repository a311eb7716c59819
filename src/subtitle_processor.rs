use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{FormatParseError, SyncError};

// @module: Subtitle data model and SRT/ASS reading and writing

// @const: SRT timing line, comma or dot before the milliseconds
static SRT_TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})").unwrap()
});

// @const: ASS timestamp (H:MM:SS.cc)
static ASS_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2})[.:](\d{1,3})$").unwrap()
});

// @const: ASS override block ({\...})
static OVERRIDE_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{[^}]*\}").unwrap()
});

// @const: SRT/HTML style tag (<i>, </font>, ...)
static HTML_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?[a-zA-Z][^>]*>").unwrap()
});

/// Default column layout of an ASS `[Events]` section
const DEFAULT_ASS_FORMAT: [&str; 10] = [
    "Layer", "Start", "End", "Style", "Name", "MarginL", "MarginR", "MarginV", "Effect", "Text",
];

/// Where a subtitle stream comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamOrigin {
    /// A track stored inside the video container
    Embedded,
    /// A subtitle file next to the video
    External,
}

impl fmt::Display for StreamOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => write!(f, "embedded"),
            Self::External => write!(f, "external"),
        }
    }
}

/// Text subtitle formats understood by the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// SubRip
    Srt,
    /// Advanced SubStation Alpha (SSA files are read as ASS)
    Ass,
}

impl SubtitleFormat {
    /// Format for a file extension, case-insensitive
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "ass" | "ssa" => Some(Self::Ass),
            _ => None,
        }
    }

    /// Format for a file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Format produced when extracting a track with the given ffprobe codec name
    pub fn for_codec(codec_name: &str) -> Self {
        match codec_name {
            "ass" | "ssa" => Self::Ass,
            _ => Self::Srt,
        }
    }

    /// Preferred file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
        }
    }
}

/// ASS line type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventKind {
    #[default]
    Dialogue,
    /// `Comment:` lines are kept in the file but never rendered
    Comment,
}

// @struct: Single timed subtitle event
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEvent {
    // @field: Start time in ms
    pub start_ms: u64,

    // @field: End time in ms
    pub end_ms: u64,

    // @field: Raw text, may contain inline override tags; lines separated by '\n' or \N
    pub text: String,

    // @field: Block-level style name ("Default" for SRT)
    pub style: String,

    // @field: Speaker/actor label
    pub actor: Option<String>,

    // @field: Effect label
    pub effect: Option<String>,

    // @field: Dialogue or comment line
    pub kind: EventKind,

    // @field: Raw ASS column values, in the stream's Format order (empty for SRT)
    pub fields: Vec<String>,
}

impl SubtitleEvent {
    /// Create a dialogue event with the default style
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
            style: "Default".to_string(),
            actor: None,
            effect: None,
            kind: EventKind::Dialogue,
            fields: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }

    pub fn as_comment(mut self) -> Self {
        self.kind = EventKind::Comment;
        self
    }

    /// Duration in ms
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Zero-length events are legal but suspicious
    pub fn is_zero_duration(&self) -> bool {
        self.end_ms == self.start_ms
    }

    /// Copy of the event with new timing and the same text
    pub fn retimed(&self, start_ms: u64, end_ms: u64) -> Self {
        Self {
            start_ms,
            end_ms,
            ..self.clone()
        }
    }

    /// Copy of the event with new text and the same timing
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Text with formatting removed
    pub fn plain_text(&self) -> String {
        strip_formatting(&self.text)
    }
}

impl fmt::Display for SubtitleEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{} --> {}] {}: {}",
            format_srt_timestamp(self.start_ms),
            format_srt_timestamp(self.end_ms),
            self.style,
            self.text.replace('\n', "\\N")
        )
    }
}

/// Everything of an ASS file that is not an event line
#[derive(Debug, Clone, PartialEq)]
pub struct AssHeader {
    /// Sections before `[Events]` ([Script Info], styles), verbatim
    pub preamble: String,
    /// Column names of the `Format:` line
    pub format: Vec<String>,
    /// Sections after the events ([Fonts], [Graphics]), verbatim
    pub trailing: String,
}

impl Default for AssHeader {
    fn default() -> Self {
        Self {
            preamble: "[Script Info]\nScriptType: v4.00+\n\n[V4+ Styles]\n\
                Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
                Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1\n"
                .to_string(),
            format: DEFAULT_ASS_FORMAT.iter().map(|c| c.to_string()).collect(),
            trailing: String::new(),
        }
    }
}

/// Ordered, non-empty sequence of events with its provenance
///
/// A stream is never modified in place: cleaning and retiming derive new
/// streams so the parsed original always stays available.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStream {
    /// Embedded track or external file
    pub origin: StreamOrigin,

    /// Container track index (embedded streams only)
    pub track_index: Option<usize>,

    /// Language tag, if known
    pub language: Option<String>,

    /// Track title, if known
    pub title: Option<String>,

    /// File the events were read from
    pub source_path: PathBuf,

    /// Serialization format
    pub format: SubtitleFormat,

    /// ASS header, present for ASS streams
    pub ass_header: Option<AssHeader>,

    events: Vec<SubtitleEvent>,
}

impl SubtitleStream {
    /// Build a stream, ordering events by start time
    ///
    /// Fails when there are no events.
    pub fn new(
        origin: StreamOrigin,
        source_path: impl Into<PathBuf>,
        format: SubtitleFormat,
        mut events: Vec<SubtitleEvent>,
    ) -> Result<Self, FormatParseError> {
        let source_path = source_path.into();
        if events.is_empty() {
            return Err(FormatParseError::new("stream contains no subtitle events").with_path(source_path));
        }

        events.sort_by_key(|event| event.start_ms);

        let ass_header = match format {
            SubtitleFormat::Ass => Some(AssHeader::default()),
            SubtitleFormat::Srt => None,
        };

        Ok(Self {
            origin,
            track_index: None,
            language: None,
            title: None,
            source_path,
            format,
            ass_header,
            events,
        })
    }

    pub fn with_track_index(mut self, track_index: usize) -> Self {
        self.track_index = Some(track_index);
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_ass_header(mut self, header: AssHeader) -> Self {
        self.ass_header = Some(header);
        self
    }

    /// Events in start-time order
    pub fn events(&self) -> &[SubtitleEvent] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// New stream with the same provenance and different events
    pub fn derive(&self, events: Vec<SubtitleEvent>) -> Result<Self, FormatParseError> {
        let mut derived = Self::new(self.origin, self.source_path.clone(), self.format, events)?;
        derived.track_index = self.track_index;
        derived.language = self.language.clone();
        derived.title = self.title.clone();
        derived.ass_header = self.ass_header.clone();
        Ok(derived)
    }

    /// Human readable label for logs and prompts
    pub fn label(&self) -> String {
        let name = self.source_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source_path.display().to_string());
        match self.track_index {
            Some(index) => format!("{} (track {})", name, index),
            None => name,
        }
    }

    /// First `count` non-empty lines without formatting
    pub fn preview(&self, count: usize) -> Vec<String> {
        self.events
            .iter()
            .filter(|event| event.kind == EventKind::Dialogue)
            .map(|event| event.plain_text().replace('\n', " / "))
            .filter(|text| !text.is_empty())
            .take(count)
            .collect()
    }

    /// Load a subtitle file, choosing the parser from its extension
    pub fn load<P: AsRef<Path>>(path: P, origin: StreamOrigin) -> Result<Self, FormatParseError> {
        let path = path.as_ref();
        let format = SubtitleFormat::from_path(path)
            .ok_or_else(|| FormatParseError::new("unsupported subtitle extension").with_path(path))?;

        let bytes = fs::read(path)
            .map_err(|e| FormatParseError::new(format!("cannot read file: {}", e)).with_path(path))?;
        let content = String::from_utf8_lossy(&bytes);

        Self::parse_str(&content, format, origin, path)
    }

    /// Parse subtitle content of a known format
    pub fn parse_str(
        content: &str,
        format: SubtitleFormat,
        origin: StreamOrigin,
        path: impl Into<PathBuf>,
    ) -> Result<Self, FormatParseError> {
        let path = path.into();
        let result = match format {
            SubtitleFormat::Srt => parse_srt_string(content)
                .and_then(|events| Self::new(origin, path.clone(), format, events)),
            SubtitleFormat::Ass => parse_ass_string(content).and_then(|(header, events)| {
                Self::new(origin, path.clone(), format, events).map(|stream| stream.with_ass_header(header))
            }),
        };

        result.map_err(|e| if e.path.is_none() { e.with_path(path) } else { e })
    }

    /// Serialize the stream in its own format
    pub fn serialize(&self) -> String {
        match self.format {
            SubtitleFormat::Srt => serialize_srt(&self.events),
            SubtitleFormat::Ass => {
                let default_header;
                let header = match &self.ass_header {
                    Some(header) => header,
                    None => {
                        default_header = AssHeader::default();
                        &default_header
                    }
                };
                serialize_ass(header, &self.events)
            }
        }
    }

    /// Write the stream to a file, creating parent directories
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SyncError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())?;
        debug!("Wrote {} events to {}", self.events.len(), path.display());
        Ok(())
    }
}

impl fmt::Display for SubtitleStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] {} events",
            self.origin,
            self.label(),
            self.language.as_deref().unwrap_or("unknown"),
            self.events.len()
        )
    }
}

/// Remove ASS override blocks and HTML-style tags, normalising line breaks
pub fn strip_formatting(text: &str) -> String {
    let without_blocks = OVERRIDE_BLOCK_REGEX.replace_all(text, "");
    let without_tags = HTML_TAG_REGEX.replace_all(&without_blocks, "");
    without_tags
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format milliseconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_srt_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Format milliseconds as an ASS timestamp (H:MM:SS.cc), rounded to centiseconds
pub fn format_ass_timestamp(ms: u64) -> String {
    let centis = (ms + 5) / 10;
    let hours = centis / 360_000;
    let minutes = (centis % 360_000) / 6_000;
    let seconds = (centis % 6_000) / 100;
    let cs = centis % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, cs)
}

/// Parse an ASS timestamp (H:MM:SS.cc) to milliseconds
pub fn parse_ass_timestamp(timestamp: &str) -> Option<u64> {
    let caps = ASS_TIME_REGEX.captures(timestamp.trim())?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    let fraction = fraction_to_ms(&caps[4])?;

    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    Some(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + fraction)
}

/// "5" -> 500, "05" -> 50, "005" -> 5
fn fraction_to_ms(digits: &str) -> Option<u64> {
    let value: u64 = digits.parse().ok()?;
    Some(match digits.len() {
        1 => value * 100,
        2 => value * 10,
        _ => value,
    })
}

fn srt_caps_to_ms(caps: &regex::Captures, start_idx: usize) -> Option<u64> {
    let hours: u64 = caps.get(start_idx)?.as_str().parse().ok()?;
    let minutes: u64 = caps.get(start_idx + 1)?.as_str().parse().ok()?;
    let seconds: u64 = caps.get(start_idx + 2)?.as_str().parse().ok()?;
    let millis = fraction_to_ms(caps.get(start_idx + 3)?.as_str())?;

    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    Some(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
}

/// Parse SRT content into events
///
/// Blocks without a timing line or without text are skipped with a warning;
/// content without a single usable block is an error.
pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEvent>, FormatParseError> {
    let content = content.trim_start_matches('\u{feff}');
    let mut events = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut block_start_line = 1;

    let mut flush = |block: &mut Vec<&str>, first_line: usize| {
        if block.is_empty() {
            return;
        }

        let timing_pos = block.iter().take(2).position(|line| SRT_TIMING_REGEX.is_match(line));
        let Some(timing_pos) = timing_pos else {
            warn!("Skipping SRT block at line {} without a timing line", first_line);
            block.clear();
            return;
        };

        let timing = block[timing_pos];
        let parsed = SRT_TIMING_REGEX
            .captures(timing)
            .and_then(|caps| Some((srt_caps_to_ms(&caps, 1)?, srt_caps_to_ms(&caps, 5)?)));

        match parsed {
            Some((start_ms, end_ms)) if end_ms >= start_ms => {
                let text = block[timing_pos + 1..]
                    .iter()
                    .map(|line| line.trim_end())
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.trim().is_empty() {
                    warn!("Skipping empty SRT entry at line {}", first_line);
                } else {
                    events.push(SubtitleEvent::new(start_ms, end_ms, text));
                }
            }
            Some((start_ms, end_ms)) => {
                warn!(
                    "Skipping SRT entry at line {}: end {} before start {}",
                    first_line,
                    format_srt_timestamp(end_ms),
                    format_srt_timestamp(start_ms)
                );
            }
            None => warn!("Invalid SRT timing at line {}: {}", first_line + timing_pos, timing.trim()),
        }
        block.clear();
    };

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            flush(&mut block, block_start_line);
            continue;
        }
        if block.is_empty() {
            block_start_line = index + 1;
        }
        block.push(line);
    }
    flush(&mut block, block_start_line);

    if events.is_empty() {
        return Err(FormatParseError::new("no valid SRT entries found"));
    }

    Ok(events)
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    if line.len() >= prefix.len() && line.is_char_boundary(prefix.len()) && line[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

/// Parse ASS/SSA content into its header and events
pub fn parse_ass_string(content: &str) -> Result<(AssHeader, Vec<SubtitleEvent>), FormatParseError> {
    let content = content.trim_start_matches('\u{feff}');
    let mut preamble: Vec<&str> = Vec::new();
    let mut trailing: Vec<&str> = Vec::new();
    let mut format: Option<Vec<String>> = None;
    let mut events = Vec::new();
    let mut in_events = false;
    let mut after_events = false;

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            if trimmed.eq_ignore_ascii_case("[events]") {
                in_events = true;
                continue;
            }
            if in_events {
                in_events = false;
                after_events = true;
            }
        }

        if after_events {
            trailing.push(line);
            continue;
        }
        if !in_events {
            preamble.push(line);
            continue;
        }

        if let Some(columns) = strip_prefix_ignore_case(trimmed, "Format:") {
            format = Some(columns.split(',').map(|c| c.trim().to_string()).collect());
            continue;
        }

        let (kind, rest) = if let Some(rest) = strip_prefix_ignore_case(trimmed, "Dialogue:") {
            (EventKind::Dialogue, rest)
        } else if let Some(rest) = strip_prefix_ignore_case(trimmed, "Comment:") {
            (EventKind::Comment, rest)
        } else {
            if !trimmed.is_empty() && !trimmed.starts_with(';') {
                debug!("Ignoring unknown line {} in [Events]: {}", line_number, trimmed);
            }
            continue;
        };

        let columns = format.get_or_insert_with(|| DEFAULT_ASS_FORMAT.iter().map(|c| c.to_string()).collect());
        if let Some(event) = parse_ass_event(kind, rest.trim_start(), columns, line_number)? {
            events.push(event);
        }
    }

    if events.is_empty() {
        return Err(FormatParseError::new("no Dialogue lines found in [Events]"));
    }

    let mut preamble_text = preamble.join("\n");
    if !preamble_text.is_empty() && !preamble_text.ends_with('\n') {
        preamble_text.push('\n');
    }

    let header = AssHeader {
        preamble: preamble_text,
        format: format.unwrap_or_else(|| DEFAULT_ASS_FORMAT.iter().map(|c| c.to_string()).collect()),
        trailing: trailing.join("\n"),
    };

    Ok((header, events))
}

fn parse_ass_event(
    kind: EventKind,
    values: &str,
    columns: &[String],
    line_number: usize,
) -> Result<Option<SubtitleEvent>, FormatParseError> {
    let values: Vec<&str> = values.splitn(columns.len(), ',').collect();
    if values.len() < columns.len() {
        return Err(FormatParseError::at_line(
            line_number,
            format!("expected {} fields, found {}", columns.len(), values.len()),
        ));
    }

    let mut event = SubtitleEvent::new(0, 0, String::new());
    event.kind = kind;

    for (column, value) in columns.iter().zip(values.iter()) {
        match column.to_ascii_lowercase().as_str() {
            "start" => {
                event.start_ms = parse_ass_timestamp(value)
                    .ok_or_else(|| FormatParseError::at_line(line_number, format!("invalid start time '{}'", value)))?;
            }
            "end" => {
                event.end_ms = parse_ass_timestamp(value)
                    .ok_or_else(|| FormatParseError::at_line(line_number, format!("invalid end time '{}'", value)))?;
            }
            "style" => event.style = value.trim().to_string(),
            "name" | "actor" => event.actor = Some(value.trim().to_string()).filter(|v| !v.is_empty()),
            "effect" => event.effect = Some(value.trim().to_string()).filter(|v| !v.is_empty()),
            "text" => event.text = value.to_string(),
            _ => {}
        }
    }
    event.fields = values.iter().map(|v| v.to_string()).collect();

    if event.end_ms < event.start_ms {
        warn!("Skipping ASS event at line {}: ends before it starts", line_number);
        return Ok(None);
    }

    Ok(Some(event))
}

fn serialize_srt(events: &[SubtitleEvent]) -> String {
    let mut output = String::new();
    let dialogue = events.iter().filter(|event| event.kind == EventKind::Dialogue);
    for (index, event) in dialogue.enumerate() {
        output.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_timestamp(event.start_ms),
            format_srt_timestamp(event.end_ms),
            event.text.replace("\\N", "\n")
        ));
    }
    output
}

fn serialize_ass(header: &AssHeader, events: &[SubtitleEvent]) -> String {
    let mut output = header.preamble.clone();
    if !output.is_empty() && !output.ends_with("\n\n") {
        output.push('\n');
    }
    output.push_str("[Events]\n");
    output.push_str(&format!("Format: {}\n", header.format.join(", ")));

    for event in events {
        let values: Vec<String> = header.format
            .iter()
            .enumerate()
            .map(|(index, column)| match column.to_ascii_lowercase().as_str() {
                "start" => format_ass_timestamp(event.start_ms),
                "end" => format_ass_timestamp(event.end_ms),
                "style" => event.style.clone(),
                "name" | "actor" => event.actor.clone().unwrap_or_default(),
                "effect" => event.effect.clone().unwrap_or_default(),
                "text" => event.text.replace('\n', "\\N"),
                other => event.fields.get(index).cloned().unwrap_or_else(|| default_ass_value(other)),
            })
            .collect();

        let prefix = match event.kind {
            EventKind::Dialogue => "Dialogue",
            EventKind::Comment => "Comment",
        };
        output.push_str(&format!("{}: {}\n", prefix, values.join(",")));
    }

    if !header.trailing.trim().is_empty() {
        output.push('\n');
        output.push_str(header.trailing.trim_start_matches('\n'));
        if !output.ends_with('\n') {
            output.push('\n');
        }
    }

    output
}

fn default_ass_value(column: &str) -> String {
    match column {
        "layer" | "marginl" | "marginr" | "marginv" => "0".to_string(),
        "marked" => "Marked=0".to_string(),
        _ => String::new(),
    }
}
