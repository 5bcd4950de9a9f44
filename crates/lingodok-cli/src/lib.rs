//! lingodok CLI - Command-line interface library
//!
//! This library provides the CLI functionality for lingodok, including:
//! - Extract: list the translatable text runs of a DOCX/PPTX package
//! - Translate: run a transform over those runs and save a new package
//! - Init: write a starter `lingodok.toml`
//!
//! # Binary Usage
//!
//! ```bash
//! # Show the runs of a document
//! lingodok extract report.docx --format json
//!
//! # Apply the glossary from a config file
//! lingodok translate deck.pptx -o deck.de.pptx --transform glossary --config lingodok.toml
//! ```

pub mod app;

// Re-export main entry point and types
pub use app::{extract_command, format_runs, init_command, translate_command};
pub use app::{run_cli, OutputFormat, TransformKind};
