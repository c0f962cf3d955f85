// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use subrecon::app_config::{self, Config, TranslationProvider};
use subrecon::app_controller::Controller;
use subrecon::file_utils::FileManager;
use subrecon::language_utils::{self, StopwordDetector};
use subrecon::providers::deepl::DeepL;
use subrecon::subtitle_processor::{self, SubtitleDocument};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Deepl,
    Mock,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Deepl => TranslationProvider::DeepL,
            CliTranslationProvider::Mock => TranslationProvider::Mock,
        }
    }
}

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
    /// Translate a subtitle file or every subtitle file of a directory
    Translate(TranslateArgs),

    /// Guess the language of a subtitle file
    Detect {
        /// Subtitle file to inspect
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Check that a file is well-formed SRT and report long lines
    Validate {
        /// Subtitle file to check
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Maximum characters per line
        #[arg(long, default_value_t = 40)]
        max_chars_per_line: usize,
    },

    /// List the glossaries of the configured DeepL account
    Glossaries {
        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: String,

        /// DeepL API key, overriding the configuration
        #[arg(long, env = "DEEPL_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Generate shell completions for subrecon
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input subtitle file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// DeepL API key, overriding the configuration
    #[arg(long, env = "DEEPL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr'), or 'auto'
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Subtitles sent per provider call
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Directory for translated files (defaults to next to the input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// subrecon - batch-and-reconcile subtitle translation
///
/// Translates SRT subtitles in batches through a machine translation API and
/// maps each translated batch back onto the original subtitles.
#[derive(Parser, Debug)]
#[command(name = "subrecon")]
#[command(version)]
#[command(about = "Batch-and-reconcile SRT subtitle translation")]
#[command(long_about = "subrecon translates SRT subtitles through DeepL in batches, mapping every
translated batch back onto the original subtitles and scoring how reliable each mapping was.

EXAMPLES:
    subrecon translate movie.srt                    # Translate using default config
    subrecon translate -f movie.srt                 # Force overwrite existing files
    subrecon translate -s en -t de movie.srt        # Translate from English to German
    subrecon translate -p mock /subtitles/          # Dry run over a whole directory
    subrecon detect movie.srt                       # Guess the subtitle language
    subrecon validate movie.srt                     # Check SRT structure and line lengths
    subrecon completions bash > subrecon.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. The DeepL key may also come from DEEPL_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
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

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour prefix for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
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
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level), now, Self::get_emoji_for_level(level), record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set per command
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Translate(args) => run_translate(args).await,
        Commands::Detect { file } => run_detect(&file),
        Commands::Validate { file, max_chars_per_line } => run_validate(&file, max_chars_per_line),
        Commands::Glossaries { config_path, api_key } => run_glossaries(&config_path, api_key).await,
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subrecon", &mut std::io::stdout());
            Ok(())
        }
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(config_log_level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(api_key) = &options.api_key {
        config.translation.active_provider_config_mut().api_key = api_key.clone();
    }

    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }

    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }

    if let Some(batch_size) = options.batch_size {
        config.translation.common.batch_size = batch_size;
    }

    match &options.log_level {
        Some(log_level) => config.log_level = log_level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    // Validate the configuration after loading and overriding
    config.validate()
        .context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;

    if options.input_path.is_file() {
        controller.translate_file(&options.input_path, options.output_dir.as_deref(), options.force_overwrite).await?;
    } else if options.input_path.is_dir() {
        if options.output_dir.is_some() {
            warn!("--output-dir is ignored for directories, translations are written next to their source");
        }
        let summary = controller.translate_folder(&options.input_path, options.force_overwrite).await?;
        if summary.failed > 0 {
            return Err(anyhow!("{} file(s) failed to translate", summary.failed));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    Ok(())
}

fn run_detect(file: &Path) -> Result<()> {
    let content = FileManager::read_to_string(file)?;
    let detection = language_utils::detect_srt_language(&StopwordDetector::default(), &content);
    println!("{}", serde_json::to_string_pretty(&detection)?);

    if !detection.success {
        return Err(anyhow!(detection.message.unwrap_or_else(|| "Could not detect language".to_string())));
    }
    Ok(())
}

fn run_validate(file: &Path, max_chars_per_line: usize) -> Result<()> {
    let content = FileManager::read_to_string(file)?;
    subtitle_processor::check_srt(&content)
        .with_context(|| format!("Rejected {:?}", file))?;

    let document = SubtitleDocument::parse(&content);
    let violations = subtitle_processor::validate_line_length(&document, max_chars_per_line);
    for violation in &violations {
        warn!("{}", violation);
    }

    info!("{:?}: {} subtitles, {} characters, {} long lines",
          file, document.len(), document.total_text_chars(), violations.len());
    Ok(())
}

async fn run_glossaries(config_path: &str, api_key: Option<String>) -> Result<()> {
    let mut config = Config::load_or_create(config_path)?;
    config.translation.provider = TranslationProvider::DeepL;
    if let Some(api_key) = api_key {
        config.translation.active_provider_config_mut().api_key = api_key;
    }
    log::set_max_level(config.log_level.to_level_filter());

    let api_key = config.translation.get_api_key();
    if api_key.is_empty() {
        return Err(anyhow!("Translation API key is required for DeepL provider"));
    }

    let client = DeepL::new(api_key, config.translation.get_endpoint(), config.translation.get_timeout_secs());
    let usage = client.usage().await?;
    info!("Characters used: {} / {}", usage.character_count, usage.character_limit);

    let glossaries = client.list_glossaries().await?;
    if glossaries.is_empty() {
        info!("No glossaries defined");
    }
    for glossary in glossaries {
        println!("{}\t{} -> {}\t{}", glossary.glossary_id, glossary.source_lang, glossary.target_lang, glossary.name);
    }
    Ok(())
}
