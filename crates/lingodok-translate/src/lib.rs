//! # lingodok-translate
//!
//! Runs a text transform over every translatable run of a DOCX or PPTX
//! package and saves the result with the document structure untouched.
//!
//! ## Example
//!
//! ```no_run
//! use lingodok_translate::{TranslationOrchestrator, UppercaseTransform};
//!
//! # async fn run() -> lingodok_translate::Result<()> {
//! let report = TranslationOrchestrator::new()
//!     .with_concurrency(4)
//!     .translate_and_save("deck.pptx", "deck.upper.pptx", UppercaseTransform)
//!     .await?;
//! println!("{} of {} runs replaced", report.replaced, report.runs);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod transform;

pub use config::{OrchestrationSettings, TranslateSettings};
pub use error::{BoxError, Result, TranslateError};
pub use orchestrator::{Progress, TranslationOrchestrator, TranslationReport};
pub use transform::{
    AsyncFnTransform, BatchFnTransform, BatchTransform, FnTransform, GlossaryTransform,
    IdentityTransform, TextTransform, UppercaseTransform,
};
