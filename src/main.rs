//! Photo Organizer - sort a photo folder into dated subdirectories
//!
//! Command-line front end: loads configuration, starts one background
//! organize run, renders its progress and lets Ctrl-C cancel it.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use photo_organizer::{
    Cli, Config, OrganizeEngine, ProgressEvent, RunEvent, RunOutcome, RunSummary,
};
use std::path::{Path, PathBuf};
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored terminal output for the command line front end

    use crossterm::{
        ExecutableCommand,
        cursor::MoveToColumn,
        style::{Color, Print, Stylize, style},
        terminal::{Clear, ClearType},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    /// Print a separator line
    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(60))));
    }

    /// Print a centered title
    pub fn print_title(title: &str) {
        let padding = 60usize.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(format!(
            "{}{} {}{}\n",
            left_pad,
            "╔".bold(),
            title.bold(),
            "╗".bold(),
        )));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print a warning message
    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print an error message
    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print a key/value pair
    pub fn print_key_value(key: &str, value: &str, value_color: Option<Color>) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = match value_color {
            Some(color) => style(value).with(color),
            None => style(value).bold(),
        };
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print a statistic
    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    /// Redraw the single progress line
    pub fn print_progress(current: usize, total: usize, percent: usize, message: &str) {
        let mut out = stdout();
        let _ = out.execute(MoveToColumn(0));
        let _ = out.execute(Clear(ClearType::CurrentLine));
        if total > 0 {
            let counter = format!("[{}/{}] {:>3}% ", current, total, percent);
            let _ = out.execute(Print(style(counter).with(CliTheme::ACCENT)));
        }
        let _ = out.execute(Print(message));
    }

    /// End the progress line
    pub fn finish_progress() {
        let _ = stdout().execute(Print("\n"));
    }

    /// Print the log file path
    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style("Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    /// Print a blank line
    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

/// Failed files listed in the terminal summary before truncating
const MAX_LISTED_FAILURES: usize = 10;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{}", Config::sample_config());
        return Ok(());
    }

    // Get the executable directory for Config and Log directories
    let exe_dir = get_executable_dir()?;

    let config = load_config(&cli, &exe_dir)?;
    let log_path = get_log_path(&exe_dir, &config);
    let guard = setup_logging(&cli, &config, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Photo Organizer starting");
    if config.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    let root = validate_root(&config)?;
    let engine = OrganizeEngine::from_config(&config);
    let handle = engine.start(root)?;

    let token = handle.cancel_token();
    ctrlc::set_handler(move || {
        token.cancel();
        eprintln!("\nCancelling after the current file...");
    })
    .context("Failed to install Ctrl-C handler")?;

    let mut progress_shown = false;
    for event in handle.events() {
        if let RunEvent::Progress(progress) = event
            && !cli.json
        {
            render_progress(&progress);
            progress_shown = true;
        }
    }
    if progress_shown {
        cli_output::finish_progress();
    }

    let summary = handle.wait()?;
    info!(log_file = %log_path.display(), "{}", summary.summary());

    if cli.json {
        println!("{}", summary.to_json()?);
    } else {
        print_summary(&summary, &log_path);
    }

    if summary.outcome == RunOutcome::FatalError {
        error!(error = ?summary.fatal_error, "Run aborted");
        // Flush the log file before exiting
        drop(guard);
        std::process::exit(1);
    }

    Ok(())
}

fn render_progress(event: &ProgressEvent) {
    let percent = (event.ratio() * 100.0).round() as usize;
    cli_output::print_progress(event.current, event.total, percent, &event.message);
}

fn print_summary(summary: &RunSummary, log_path: &Path) {
    use cli_output::*;

    let title = match summary.outcome {
        RunOutcome::Completed => "Organization complete",
        RunOutcome::Cancelled => "Organization cancelled",
        RunOutcome::FatalError => "Organization failed",
    };

    print_separator();
    print_title(title);
    print_separator();

    if let Some(ref fatal) = summary.fatal_error {
        print_blank();
        print_error(fatal);
    }

    print_blank();
    print_stat("Found", &summary.total.to_string(), CliTheme::ACCENT);
    print_stat("Processed", &summary.processed.to_string(), CliTheme::SUCCESS);
    print_stat("Errors", &summary.errors.to_string(), CliTheme::ERROR);
    print_blank();

    if summary.cancelled {
        let untouched = summary.total - summary.processed - summary.errors;
        print_warning(&format!("Cancelled, {} files were left untouched", untouched));
    }

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        print_separator();
        print_error(&format!("Failed files: {}", failures.len()));
        print_blank();
        for failure in failures.iter().take(MAX_LISTED_FAILURES) {
            print_key_value(
                &failure.source.display().to_string(),
                failure.error.as_deref().unwrap_or("unknown error"),
                Some(CliTheme::ERROR),
            );
        }
        if failures.len() > MAX_LISTED_FAILURES {
            print_key_value(
                "...",
                &format!("and {} more, see the log", failures.len() - MAX_LISTED_FAILURES),
                None,
            );
        }
    }

    print_separator();
    print_log_path(&log_path.display().to_string());
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Log file path: `<log_dir>/Organize_<timestamp>.log`
fn get_log_path(exe_dir: &Path, config: &Config) -> PathBuf {
    let log_dir = config
        .log_dir
        .clone()
        .unwrap_or_else(|| exe_dir.join("Log"));
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("Organize_{}.log", timestamp))
}

/// Resolve config path - supports shorthand syntax
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let config_dir = exe_dir.join("Config");
    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());

    let mut in_config_dir = config_dir.join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        let file_config = Config::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    Ok(config)
}

/// The root to organize, made absolute
fn validate_root(config: &Config) -> Result<PathBuf> {
    let Some(ref root) = config.root else {
        anyhow::bail!("No directory to organize. Pass ROOT or set `root` in the config file");
    };

    if !root.is_dir() {
        warn!(root = %root.display(), "Root is not a readable directory");
    }

    std::path::absolute(root)
        .with_context(|| format!("Cannot resolve directory {}", root.display()))
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, config: &Config, log_path: &Path) -> Result<WorkerGuard> {
    let level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // The progress line owns stdout; only problems go to the console
    let console = fmt::layer().with_writer(std::io::stderr.with_max_level(Level::WARN));
    let subscriber = tracing_subscriber::registry().with(env_filter).with(console);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .init();
    }

    Ok(guard)
}
