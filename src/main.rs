#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use subsync::app_config::{self, CleaningConfig, Config};
use subsync::probe::{FfmpegProbe, MediaProbe};
use subsync::{language_utils, Controller, PairOutcome};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync one video against one or more candidate subtitle files
    Pair {
        /// Video whose embedded subtitles are the reference
        #[arg(value_name = "VIDEO")]
        video: PathBuf,

        /// Subtitle files to choose from
        #[arg(value_name = "SUBTITLES", required = true, num_args = 1..)]
        subtitles: Vec<PathBuf>,
    },

    /// List the subtitle tracks of a video
    Tracks {
        #[arg(value_name = "VIDEO")]
        video: PathBuf,
    },

    /// Generate shell completions for subsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subsync - re-time subtitles against the subtitles embedded in a video
#[derive(Parser, Debug)]
#[command(name = "subsync")]
#[command(version)]
#[command(about = "Clean and re-time out-of-sync subtitle files")]
#[command(long_about = "subsync pairs every video of a directory with an external subtitle file, \
cleans both the embedded and the external subtitles of signs, karaoke, lyrics and sound effects, \
aligns them with alass and writes the external subtitles with corrected timing.

EXAMPLES:
    subsync                                     # Sync every video of the current directory
    subsync -f ~/anime/show                     # Overwrite existing outputs
    subsync -y --language en ~/shows/season1    # No prompts, English heuristics
    subsync pair ep01.mkv ep01.ja.srt ep01.ass  # Choose among several subtitle files
    subsync tracks ep01.mkv                     # Show the embedded subtitle tracks
    subsync completions bash > subsync.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in subsync.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory with the videos and subtitle files
    #[arg(value_name = "INPUT_DIR", default_value = ".")]
    input_dir: PathBuf,

    /// Force overwrite of existing output files
    #[arg(short, long, global = true, alias = "force")]
    force_overwrite: bool,

    /// Answer every question with its default, never prompt
    #[arg(short, long, global = true)]
    yes: bool,

    /// Language of the external subtitles (e.g. 'ja', 'en')
    #[arg(long, global = true)]
    language: Option<String>,

    /// Aligner binary
    #[arg(short, long, global = true)]
    aligner: Option<String>,

    /// Directory for the synced subtitles
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Remember tag decisions between runs
    #[arg(long, global = true)]
    remember_decisions: bool,

    /// Configuration file path
    #[arg(short, long, global = true, alias = "config", default_value = "subsync.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and marker for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "x"),
            Level::Warn => ("\x1B[1;33m", "!"),
            Level::Info => ("\x1B[1;32m", " "),
            Level::Debug => ("\x1B[1;36m", "?"),
            Level::Trace => ("\x1B[1;35m", "."),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, marker) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", colour, now, marker, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Everything is allowed through the logger, the max level filters
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match &cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(*shell, &mut cmd, "subsync", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Tracks { video }) => {
            let config = load_config(&cli)?;
            list_tracks(&config, video).await
        }
        Some(Commands::Pair { video, subtitles }) => {
            let config = load_config(&cli)?;
            run_pair(config, &cli, video, subtitles).await
        }
        None => {
            let config = load_config(&cli)?;
            run_folder(config, &cli).await
        }
    }
}

/// Load the config file and apply the command line overrides
fn load_config(options: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&options.config_path)?;

    if let Some(language) = &options.language {
        config.language = language.clone();
    }
    if let Some(aligner) = &options.aligner {
        config.tools.aligner_path = aligner.clone();
    }
    if let Some(output_dir) = &options.output_dir {
        config.output.directory = Some(output_dir.clone());
    }
    if options.remember_decisions && config.cleaning.decisions_file.is_none() {
        config.cleaning.decisions_file = CleaningConfig::default_decisions_path();
        if config.cleaning.decisions_file.is_none() {
            warn!("No data directory found, tag decisions will not be remembered");
        }
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate()
        .context("Configuration validation failed")?;

    log::set_max_level(config.log_level.to_level_filter());
    Ok(config)
}

fn is_interactive(options: &CommandLineOptions) -> bool {
    !options.yes && std::io::stdin().is_terminal()
}

async fn run_folder(config: Config, options: &CommandLineOptions) -> Result<()> {
    let input_dir = &options.input_dir;
    if input_dir.is_file() {
        return Err(anyhow!(
            "{:?} is a file; use `subsync pair <VIDEO> <SUBTITLES>...` for a single video",
            input_dir
        ));
    }

    let mut controller = Controller::with_config(config, is_interactive(options))?;
    let summary = controller.run_folder(input_dir, options.force_overwrite).await?;

    if summary.has_failures() {
        return Err(anyhow!("{} of {} pairs failed", summary.failed.len(), summary.total()));
    }
    Ok(())
}

async fn run_pair(config: Config, options: &CommandLineOptions, video: &Path, subtitles: &[PathBuf]) -> Result<()> {
    if !video.is_file() {
        return Err(anyhow!("Video file does not exist: {:?}", video));
    }

    let output_dir = match &config.output.directory {
        Some(directory) => directory.clone(),
        None => video.parent().unwrap_or(Path::new(".")).to_path_buf(),
    };

    let mut controller = Controller::with_config(config, is_interactive(options))?;
    match controller.run_pair(video, subtitles, &output_dir, options.force_overwrite).await? {
        PairOutcome::Synced { output, events, report } => {
            info!("Cleaning: {}", report.summary());
            info!("Success: {} ({} events)", output.display(), events);
        }
        PairOutcome::AlreadyExists(output) => {
            warn!("Output file already exists: {:?}. Use -f to force overwrite.", output);
        }
    }
    Ok(())
}

async fn list_tracks(config: &Config, video: &Path) -> Result<()> {
    let probe = FfmpegProbe::new(&config.tools);
    let tracks = probe
        .list_subtitle_tracks(video)
        .await
        .map_err(|e| anyhow!("Failed to list subtitle tracks: {}", e))?;

    if tracks.is_empty() {
        warn!("No subtitle tracks found in file: {:?}", video);
        return Ok(());
    }

    for track in &tracks {
        let language = track
            .language
            .as_deref()
            .map(|code| language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "Track {}: {} [{}] {}{}",
            track.index,
            language,
            track.codec_name,
            track.title.as_deref().unwrap_or("No title"),
            if track.is_bitmap() { " (bitmap, ignored)" } else { "" }
        );
    }
    Ok(())
}
