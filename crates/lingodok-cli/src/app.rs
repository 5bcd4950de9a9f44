//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use lingodok_ooxml::TextRun;
use lingodok_translate::{
    GlossaryTransform, IdentityTransform, TextTransform, TranslateSettings,
    TranslationOrchestrator, TranslationReport, UppercaseTransform,
};

/// Output format for extracted runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One run per line: id, role, part, text
    #[default]
    Text,
    /// JSON array for tool consumption
    Json,
}

/// Built-in transforms available from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TransformKind {
    /// Keep every text as it is
    #[default]
    Identity,
    /// Upper-case every text
    Upper,
    /// Replace terms from the `[glossary]` table of the config file
    Glossary,
}

#[derive(Parser)]
#[command(name = "lingodok")]
#[command(author, version, about = "Translate DOCX and PPTX text without touching the layout", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the translatable text runs of a package in reading order
    Extract {
        /// Input DOCX or PPTX file
        input: PathBuf,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run a transform over every text run and save the result
    Translate {
        /// Input DOCX or PPTX file
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Transform to apply
        #[arg(short, long, value_enum, default_value = "identity")]
        transform: TransformKind,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum transform calls in flight (overrides the config file)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Write a starter configuration file
    Init {
        /// Configuration file path
        #[arg(default_value = "lingodok.toml")]
        path: PathBuf,
    },
}

/// Run the CLI application
///
/// Parses arguments, installs logging and dispatches to the command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Extract { input, format } => {
            extract_command(&input, format)?;
        }
        Commands::Translate {
            input,
            output,
            transform,
            config,
            concurrency,
        } => {
            let report =
                translate_command(&input, &output, transform, config.as_deref(), concurrency)?;
            println!(
                "Translated {} runs ({} skipped), {} replaced in {} parts",
                report.transformed, report.skipped, report.replaced, report.parts_rewritten
            );
            println!("  Created: {}", output.display());
        }
        Commands::Init { path } => {
            init_command(&path)?;
            println!("  Created: {}", path.display());
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Execute the extract command
pub fn extract_command(input: &Path, format: OutputFormat) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let runs = TranslationOrchestrator::new()
        .extract_text(input)
        .with_context(|| format!("Failed to extract text from {}", input.display()))?;

    print!("{}", format_runs(&runs, format)?);
    Ok(())
}

/// Render extracted runs for output
pub fn format_runs(runs: &[TextRun], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(runs).context("Failed to serialize runs to JSON")?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Text => Ok(runs
            .iter()
            .map(|run| {
                format!(
                    "{}\t{}\t{}\t{}\n",
                    run.id,
                    run.role,
                    run.part_name,
                    run.text.escape_debug()
                )
            })
            .collect()),
    }
}

/// Execute the translate command
pub fn translate_command(
    input: &Path,
    output: &Path,
    transform: TransformKind,
    config: Option<&Path>,
    concurrency: Option<usize>,
) -> Result<TranslationReport> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let settings = match config {
        Some(path) => TranslateSettings::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => TranslateSettings::default(),
    };

    let mut orchestrator =
        TranslationOrchestrator::from_settings(&settings).context("Invalid configuration")?;
    if let Some(limit) = concurrency {
        orchestrator = orchestrator.with_concurrency(limit);
    }

    let transform: Box<dyn TextTransform> = match transform {
        TransformKind::Identity => Box::new(IdentityTransform),
        TransformKind::Upper => Box::new(UppercaseTransform),
        TransformKind::Glossary => {
            if settings.glossary.is_empty() {
                anyhow::bail!("The glossary transform needs a [glossary] table in --config");
            }
            Box::new(GlossaryTransform::new(&settings.glossary))
        }
    };
    debug!("Using {:?}", orchestrator);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime
        .block_on(orchestrator.translate_and_save(input, output, transform))
        .with_context(|| format!("Failed to translate {}", input.display()))
}

/// Write a starter configuration file, refusing to overwrite one
pub fn init_command(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Config file already exists: {}", path.display());
    }
    let content = toml_template(&TranslateSettings::default());
    fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

fn toml_template(settings: &TranslateSettings) -> String {
    format!(
        "# lingodok configuration\n\n[translate]\nconcurrency = {}\nskip_patterns = []\n\n[glossary]\n# \"Source term\" = \"Target term\"\n",
        settings.translate.concurrency
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_translate_args() {
        let cli = Cli::try_parse_from([
            "lingodok",
            "-vv",
            "translate",
            "in.docx",
            "-o",
            "out.docx",
            "--transform",
            "upper",
            "--concurrency",
            "4",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Translate {
                transform,
                concurrency,
                config,
                ..
            } => {
                assert_eq!(transform, TransformKind::Upper);
                assert_eq!(concurrency, Some(4));
                assert!(config.is_none());
            }
            _ => panic!("expected translate"),
        }
    }

    #[test]
    fn test_translate_requires_output() {
        assert!(Cli::try_parse_from(["lingodok", "translate", "in.docx"]).is_err());
    }

    #[test]
    fn test_default_config_parses() {
        let parsed =
            TranslateSettings::from_toml_str(&toml_template(&TranslateSettings::default()))
                .unwrap();
        assert_eq!(parsed, TranslateSettings::default());
    }
}
