use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::classifier::HeuristicProfile;
use crate::scrubber::ScrubCategory;
use crate::tag_rules::TagRule;

/// Application configuration module
/// This module handles loading, validating and saving the settings of a run.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Language of the external subtitles (ISO), selects the heuristics
    #[serde(default = "default_language")]
    pub language: String,

    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Cleaning behaviour
    #[serde(default)]
    pub cleaning: CleaningConfig,

    /// Output location
    #[serde(default)]
    pub output: OutputConfig,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// External tool locations and limits
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolsConfig {
    // @field: ffprobe binary
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    // @field: ffmpeg binary
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    // @field: Aligner binary
    #[serde(default = "default_aligner_path")]
    pub aligner_path: String,

    // @field: Extra aligner arguments, appended after the file arguments
    #[serde(default)]
    pub aligner_args: Vec<String>,

    // @field: ffprobe timeout
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    // @field: ffmpeg extraction timeout
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,

    // @field: Aligner timeout
    #[serde(default = "default_aligner_timeout_secs")]
    pub aligner_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe_path(),
            ffmpeg_path: default_ffmpeg_path(),
            aligner_path: default_aligner_path(),
            aligner_args: Vec::new(),
            probe_timeout_secs: default_probe_timeout_secs(),
            extract_timeout_secs: default_extract_timeout_secs(),
            aligner_timeout_secs: default_aligner_timeout_secs(),
        }
    }
}

/// Cleaning configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CleaningConfig {
    // @field: Also clean the embedded reference stream
    #[serde(default = "default_true")]
    pub clean_reference: bool,

    // @field: Rules placed before the built-in table
    #[serde(default)]
    pub tag_overrides: Vec<TagRule>,

    // @field: Custom heuristic table replacing the language preset
    #[serde(default)]
    pub profile: Option<HeuristicProfile>,

    // @field: Scrub categories offered to the user
    #[serde(default = "default_scrub_categories")]
    pub scrub_categories: Vec<ScrubCategory>,

    // @field: File keeping tag decisions between runs
    #[serde(default)]
    pub decisions_file: Option<PathBuf>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            clean_reference: true,
            tag_overrides: Vec::new(),
            profile: None,
            scrub_categories: default_scrub_categories(),
            decisions_file: None,
        }
    }
}

impl CleaningConfig {
    /// Per-user location for remembered tag decisions
    pub fn default_decisions_path() -> Option<PathBuf> {
        dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .map(|base| base.join("subsync").join("tag_decisions.json"))
    }

    /// Custom profile, else the preset of the language
    pub fn heuristic_profile(&self, language: &str) -> HeuristicProfile {
        self.profile
            .clone()
            .unwrap_or_else(|| HeuristicProfile::for_language(language))
    }

    /// Profile for a stream tagged with `stream_language`
    ///
    /// Streams in another language than the configured one get their own
    /// preset; untagged streams are assumed to be in the configured language.
    pub fn stream_profile(&self, stream_language: Option<&str>, language: &str) -> HeuristicProfile {
        match stream_language {
            Some(code) if !crate::language_utils::language_codes_match(code, language) => {
                HeuristicProfile::for_language(code)
            }
            _ => self.heuristic_profile(language),
        }
    }
}

/// Output configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutputConfig {
    // @field: Output directory, the input directory when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,

    // @field: Add .ass/.ssa files when .srt files alone do not pair up
    #[serde(default = "default_true")]
    pub include_ass_when_unpaired: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            include_ass_when_unpaired: true,
        }
    }
}

fn default_language() -> String {
    "ja".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_aligner_path() -> String {
    "alass".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    60
}

fn default_extract_timeout_secs() -> u64 {
    120
}

fn default_aligner_timeout_secs() -> u64 {
    600
}

fn default_scrub_categories() -> Vec<ScrubCategory> {
    ScrubCategory::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.language)
            .context("Invalid subtitle language")?;

        let tools = [
            ("ffprobe_path", &self.tools.ffprobe_path),
            ("ffmpeg_path", &self.tools.ffmpeg_path),
            ("aligner_path", &self.tools.aligner_path),
        ];
        for (name, value) in tools {
            if value.trim().is_empty() {
                return Err(anyhow!("Tool path '{}' must not be empty", name));
            }
        }

        let timeouts = [
            ("probe_timeout_secs", self.tools.probe_timeout_secs),
            ("extract_timeout_secs", self.tools.extract_timeout_secs),
            ("aligner_timeout_secs", self.tools.aligner_timeout_secs),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(anyhow!("Timeout '{}' must be greater than zero", name));
            }
        }

        if let Some(profile) = &self.cleaning.profile {
            if !(0.0..=1.0).contains(&profile.min_note_ratio) {
                return Err(anyhow!("Heuristic min_note_ratio must be between 0 and 1"));
            }
        }

        Ok(())
    }

    /// Load the configuration, writing the defaults first when the file is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .context(format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_reader(BufReader::new(file))
                .context(format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .context(format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: LogLevel::default(),
            language: default_language(),
            tools: ToolsConfig::default(),
            cleaning: CleaningConfig::default(),
            output: OutputConfig::default(),
        }
    }
}
