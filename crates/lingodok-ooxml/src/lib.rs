//! # lingodok-ooxml
//!
//! Structure-preserving text round-trips for OOXML packages.
//!
//! This crate provides functionality to:
//! - Open DOCX/PPTX containers and expose their parts
//! - Enumerate every translatable text run in reading order
//! - Rewrite exactly those runs, addressed by position, and save the package
//!   with every other byte of it unchanged
//!
//! ## Example: Rewriting a Document
//!
//! ```no_run
//! use lingodok_ooxml::{Package, ReplacementMap, TextRunExtractor, TextRunRewriter};
//!
//! let mut package = Package::open("report.docx")?;
//! let runs = TextRunExtractor::extract(&mut package)?;
//!
//! let replacements: ReplacementMap = runs
//!     .iter()
//!     .map(|run| (run.id, run.text.to_uppercase()))
//!     .collect();
//!
//! TextRunRewriter::rewrite(&mut package, &runs, &replacements)?;
//! package.save("report.upper.docx")?;
//! # Ok::<(), lingodok_ooxml::OoxmlError>(())
//! ```

pub mod adapter;
pub mod archive;
pub mod error;
pub mod extract;
pub mod rewrite;
pub mod run;
pub mod xml;

#[doc(hidden)]
pub mod test_utils;

pub use adapter::{FormatAdapter, PackageKind, PartGroup, PartPattern, PartRole, ScanPart};
pub use archive::Package;
pub use error::{OoxmlError, Result};
pub use extract::TextRunExtractor;
pub use rewrite::{RewriteStats, TextRunRewriter};
pub use run::{PathStep, ReplacementMap, RunId, TextRun};
pub use xml::{CodecOptions, Element, Node, XmlDocument};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
