//! marklive - Main Entry Point
//!
//! Renders, watches and exports Markdown files through the preview pipeline.

use clap::{Parser, Subcommand};
use log::{info, warn};
use marklive::config::{JsonFileStore, Settings, Theme};
use marklive::document::SourceDocument;
use marklive::error::{Error, Result, ResultExt};
use marklive::export::{self, ExportFormat, ExportOptions};
use marklive::markdown::RenderServices;
use marklive::preview::{outline, Preview, StepOutcome};
use marklive::watch::{self, FileWatcher, WatchEvent};
use marklive::Orchestrator;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

/// Application name constant.
const APP_NAME: &str = "marklive";

#[derive(Parser)]
#[command(name = "marklive")]
#[command(version, about = "Live Markdown preview: math, diagrams, code and safe HTML", long_about = None)]
#[command(after_help = "EXAMPLES:
    marklive render notes.md -o notes.html     Render to a standalone page
    marklive watch notes.md -o notes.html      Re-render on every save
    marklive export notes.md --format print    Print-ready document
    marklive outline notes.md                  Show the heading outline")]
struct Cli {
    /// JSON settings file to use instead of the stored preferences
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a Markdown file to HTML
    Render {
        /// Markdown input file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Color theme (light or dark); defaults to the stored preference
        #[arg(long, value_parser = parse_theme)]
        theme: Option<Theme>,

        /// Emit only the rendered content, without the page around it
        #[arg(long)]
        fragment: bool,
    },

    /// Re-render a Markdown file whenever it changes
    Watch {
        /// Markdown input file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output HTML file
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Color theme (light or dark)
        #[arg(long, value_parser = parse_theme)]
        theme: Option<Theme>,
    },

    /// Export a Markdown file
    ///
    /// There is no direct PDF writer: export with `--format print` and save
    /// the result as PDF from a browser's print dialog.
    #[command(after_help = "PDF: export with --format print, open the file in a browser and print it to PDF.")]
    Export {
        /// Markdown input file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Export format: md, html or print (print-styled HTML, the route to PDF)
        #[arg(short, long, value_parser = parse_format, default_value = "html")]
        format: ExportFormat,

        /// Output file (the format's default name when omitted)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Color theme (light or dark)
        #[arg(long, value_parser = parse_theme)]
        theme: Option<Theme>,
    },

    /// Print the heading outline of a Markdown file
    Outline {
        /// Markdown input file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli.command, cli.config.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: Option<&Path>) -> Result<()> {
    match command {
        Command::Render {
            input,
            output,
            theme,
            fragment,
        } => render(&input, output.as_deref(), load_settings(config, theme)?, fragment),
        Command::Watch {
            input,
            output,
            theme,
        } => watch_file(&input, &output, load_settings(config, theme)?),
        Command::Export {
            input,
            format,
            output,
            theme,
        } => export_file(&input, format, output, load_settings(config, theme)?),
        Command::Outline { input } => print_outline(&input, load_settings(config, None)?),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn render(input: &Path, output: Option<&Path>, settings: Settings, fragment: bool) -> Result<()> {
    let orchestrator = Orchestrator::new(RenderServices::default(), &settings);
    let text = read_source(input)?;

    let (document, outcomes) = orchestrator.render(&text);
    warn_failed(&outcomes);

    let body = document.to_html();
    let html = if fragment {
        body
    } else {
        export::generate_html_document(&body, &export_options(input, &settings))
    };

    match output {
        Some(path) => export::write_export(path, &html),
        None => {
            println!("{html}");
            Ok(())
        }
    }
}

fn watch_file(input: &Path, output: &Path, settings: Settings) -> Result<()> {
    let options = export_options(input, &settings);
    let mut orchestrator = Orchestrator::new(RenderServices::default(), &settings);
    let mut source = SourceDocument::new(read_source(input)?);
    let mut preview = Preview::default();

    let report = orchestrator.force_refresh(&source, &mut preview);
    warn_failed(&report.outcomes);
    export::write_export(output, &export::generate_html_document(&preview.html(), &options))?;

    let watcher = FileWatcher::new(input)?;
    info!("{} watching {} (Ctrl+C to stop)", APP_NAME, input.display());

    loop {
        let timeout = orchestrator
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_millis(500));

        if let Some(events) = watcher.wait_events(timeout) {
            for event in &events {
                match event {
                    WatchEvent::Removed(path) => warn!("{} was removed", path.display()),
                    WatchEvent::Error(message) => warn!("Watcher: {}", message),
                    WatchEvent::Changed(_) => {}
                }
            }
            if watch::has_changes(&events) {
                match read_source(input) {
                    Ok(text) if text != source.text() => {
                        source.set_text(text);
                        orchestrator.on_document_changed(Instant::now());
                    }
                    Ok(_) => {}
                    Err(e) => warn!("{}", e),
                }
            }
        }

        if let Some(report) = orchestrator.poll(Instant::now(), &source, &mut preview) {
            warn_failed(&report.outcomes);
            let html = export::generate_html_document(&preview.html(), &options);
            export::write_export(output, &html)
                .unwrap_or_warn_default((), "Failed to write preview");
        }
    }
}

fn export_file(
    input: &Path,
    format: ExportFormat,
    output: Option<PathBuf>,
    settings: Settings,
) -> Result<()> {
    let text = read_source(input)?;

    let body = if format == ExportFormat::Markdown {
        String::new()
    } else {
        let orchestrator = Orchestrator::new(RenderServices::default(), &settings);
        let (document, outcomes) = orchestrator.render(&text);
        warn_failed(&outcomes);
        document.to_html()
    };

    let contents = export::export_contents(format, &text, &body, &export_options(input, &settings));
    let output = output.unwrap_or_else(|| PathBuf::from(format.default_file_name()));
    export::write_export(&output, &contents)
}

fn print_outline(input: &Path, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(RenderServices::default(), &settings);
    let text = read_source(input)?;

    let (document, _) = orchestrator.render(&text);
    print!("{}", outline::build_from_document(&document).to_text());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Settings from `--config` or the stored preferences, with the
/// command-line theme taking precedence.
///
/// An unreadable `--config` file is an error; an unreadable preference store
/// falls back to defaults.
fn load_settings(config: Option<&Path>, theme: Option<Theme>) -> Result<Settings> {
    let mut settings = match config {
        Some(path) => Settings::load_json_file(path)?,
        None => JsonFileStore::open_default()
            .map(|store| Settings::load_from(&store))
            .unwrap_or_warn_default(Settings::default(), "Failed to open preference store"),
    };
    if let Some(theme) = theme {
        settings.theme = theme;
    }
    Ok(settings)
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn export_options(input: &Path, settings: &Settings) -> ExportOptions {
    let title = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Markdown Export".to_string());
    ExportOptions::default()
        .with_title(title)
        .with_theme(settings.theme)
}

fn warn_failed(outcomes: &[StepOutcome]) {
    for outcome in outcomes.iter().filter(|o| !o.is_ok()) {
        warn!("Post-render step '{}' did not apply: {:?}", outcome.step, outcome.status);
    }
}

fn parse_theme(value: &str) -> std::result::Result<Theme, String> {
    Theme::from_name(value).ok_or_else(|| format!("unknown theme '{value}' (light or dark)"))
}

fn parse_format(value: &str) -> std::result::Result<ExportFormat, String> {
    ExportFormat::from_name(value)
        .ok_or_else(|| format!("unknown format '{value}' (md, html or print)"))
}
