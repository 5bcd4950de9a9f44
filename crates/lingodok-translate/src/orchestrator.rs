//! Translation orchestration
//!
//! One operation is: open, extract, transform every selected run, rewrite,
//! save. Transforms only see strings; all results are collected before the
//! rewrite starts, and nothing is written unless every transform succeeded.
//!
//! Transforms come in two shapes: a [`TextTransform`] called once per run,
//! or a [`BatchTransform`] handed every selected text in a single call.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use lingodok_ooxml::{
    FormatAdapter, Package, PackageKind, ReplacementMap, RunId, TextRun, TextRunExtractor,
    TextRunRewriter,
};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::TranslateSettings;
use crate::error::{Result, TranslateError};
use crate::transform::{BatchTransform, TextTransform};

type RunFilter = dyn Fn(&TextRun) -> bool + Send + Sync;
type ProgressFn = dyn for<'a> Fn(Progress<'a>) + Send + Sync;

/// Transform progress, reported after each settled run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress<'a> {
    pub completed: usize,
    pub total: usize,
    /// The run that just settled
    pub id: RunId,
    /// Its source text
    pub text: &'a str,
}

/// Summary of a successful translation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TranslationReport {
    /// Runs found by extraction
    pub runs: usize,
    /// Runs sent to the transform
    pub transformed: usize,
    /// Runs left out by the filter
    pub skipped: usize,
    /// Leaves whose text actually changed
    pub replaced: usize,
    /// Parts re-serialized into the output
    pub parts_rewritten: usize,
}

/// Drives extraction, transformation, rewrite and save
#[derive(Clone)]
pub struct TranslationOrchestrator {
    concurrency: usize,
    filter: Option<Arc<RunFilter>>,
    progress: Option<Arc<ProgressFn>>,
    adapter: Option<FormatAdapter>,
}

impl Default for TranslationOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TranslationOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationOrchestrator")
            .field("concurrency", &self.concurrency)
            .field("filter", &self.filter.is_some())
            .field("progress", &self.progress.is_some())
            .field("adapter", &self.adapter)
            .finish()
    }
}

impl TranslationOrchestrator {
    /// Sequential orchestrator translating every run
    pub fn new() -> Self {
        Self {
            concurrency: 1,
            filter: None,
            progress: None,
            adapter: None,
        }
    }

    /// Build an orchestrator from loaded settings
    pub fn from_settings(settings: &TranslateSettings) -> Result<Self> {
        let rules = settings.translate.skip_rules()?;
        let orchestrator = Self::new().with_concurrency(settings.translate.concurrency);

        if rules.is_empty() {
            return Ok(orchestrator);
        }
        Ok(orchestrator.with_filter(move |run: &TextRun| {
            !rules.iter().any(|rule| rule.is_match(&run.text))
        }))
    }

    /// Allow up to `limit` transform calls in flight (at least one)
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Only send runs for which `filter` returns true to the transform
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&TextRun) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Call `progress` after each transform result arrives
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(Progress<'_>) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Use `adapter` instead of detecting the package kind
    pub fn with_adapter(mut self, adapter: FormatAdapter) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// List the text runs of a package without changing anything
    pub fn extract_text(&self, path: impl AsRef<Path>) -> Result<Vec<TextRun>> {
        let mut package = self.open(path.as_ref())?;
        Ok(TextRunExtractor::extract(&mut package)?)
    }

    /// Translate `input` and write the result to `output`
    ///
    /// If any transform call fails, `output` is neither created nor touched.
    pub async fn translate_and_save(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        transform: impl TextTransform + 'static,
    ) -> Result<TranslationReport> {
        let (input, output) = (input.as_ref(), output.as_ref());
        let mut package = self.open(input)?;

        let report = self.translate_package(&mut package, Arc::new(transform)).await?;
        package.save(output)?;

        info!(
            "Translated {} -> {} ({} runs, {} replaced)",
            input.display(),
            output.display(),
            report.runs,
            report.replaced
        );
        Ok(report)
    }

    /// Translate a package held in memory
    pub async fn translate_bytes(
        &self,
        input: Vec<u8>,
        kind: PackageKind,
        transform: impl TextTransform + 'static,
    ) -> Result<(Vec<u8>, TranslationReport)> {
        let adapter = self.adapter.clone().unwrap_or_else(|| kind.adapter());
        let mut package = Package::from_bytes(input, adapter)?;

        let report = self.translate_package(&mut package, Arc::new(transform)).await?;
        Ok((package.to_bytes()?, report))
    }

    /// Translate `input` with a single batch call and write the result to `output`
    ///
    /// The transform receives the selected texts in reading order and must
    /// return exactly as many results. On any failure `output` is left alone.
    pub async fn translate_batch_and_save(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        transform: impl BatchTransform,
    ) -> Result<TranslationReport> {
        let (input, output) = (input.as_ref(), output.as_ref());
        let mut package = self.open(input)?;

        let report = self.translate_package_batch(&mut package, &transform).await?;
        package.save(output)?;

        info!(
            "Batch translated {} -> {} ({} runs, {} replaced)",
            input.display(),
            output.display(),
            report.runs,
            report.replaced
        );
        Ok(report)
    }

    /// Batch-translate a package held in memory
    pub async fn translate_batch_bytes(
        &self,
        input: Vec<u8>,
        kind: PackageKind,
        transform: impl BatchTransform,
    ) -> Result<(Vec<u8>, TranslationReport)> {
        let adapter = self.adapter.clone().unwrap_or_else(|| kind.adapter());
        let mut package = Package::from_bytes(input, adapter)?;

        let report = self.translate_package_batch(&mut package, &transform).await?;
        Ok((package.to_bytes()?, report))
    }

    fn open(&self, path: &Path) -> Result<Package> {
        let package = match &self.adapter {
            Some(adapter) => Package::open_with(path, adapter.clone())?,
            None => Package::open(path)?,
        };
        Ok(package)
    }

    async fn translate_package(
        &self,
        package: &mut Package,
        transform: Arc<dyn TextTransform>,
    ) -> Result<TranslationReport> {
        let runs = TextRunExtractor::extract(package)?;
        let pending = self.pending(&runs);

        let transformed = pending.len();
        let replacements = if self.concurrency > 1 && transformed > 1 {
            self.transform_concurrent(pending, transform).await?
        } else {
            self.transform_sequential(pending, transform.as_ref()).await?
        };

        Self::apply(package, &runs, transformed, &replacements)
    }

    async fn translate_package_batch(
        &self,
        package: &mut Package,
        transform: &dyn BatchTransform,
    ) -> Result<TranslationReport> {
        let runs = TextRunExtractor::extract(package)?;
        let pending = self.pending(&runs);

        let transformed = pending.len();
        let replacements = self.transform_batch(pending, transform).await?;

        Self::apply(package, &runs, transformed, &replacements)
    }

    fn pending(&self, runs: &[TextRun]) -> Vec<(RunId, String)> {
        let pending: Vec<(RunId, String)> = runs
            .iter()
            .filter(|run| self.selects(run))
            .map(|run| (run.id, run.text.clone()))
            .collect();

        let skipped = runs.len() - pending.len();
        if skipped > 0 {
            debug!("Skipping {} of {} runs", skipped, runs.len());
        }
        pending
    }

    fn apply(
        package: &mut Package,
        runs: &[TextRun],
        transformed: usize,
        replacements: &ReplacementMap,
    ) -> Result<TranslationReport> {
        let stats = TextRunRewriter::rewrite(package, runs, replacements)?;

        Ok(TranslationReport {
            runs: runs.len(),
            transformed,
            skipped: runs.len() - transformed,
            replaced: stats.replaced,
            parts_rewritten: stats.parts_modified,
        })
    }

    async fn transform_sequential(
        &self,
        pending: Vec<(RunId, String)>,
        transform: &dyn TextTransform,
    ) -> Result<ReplacementMap> {
        let total = pending.len();
        let mut replacements = ReplacementMap::new();

        for (id, text) in pending {
            let translated = transform
                .transform(&text)
                .await
                .map_err(|e| TranslateError::translation(id, e))?;
            replacements.insert(id, translated);
            self.report(replacements.len(), total, id, &text);
        }

        Ok(replacements)
    }

    async fn transform_batch(
        &self,
        pending: Vec<(RunId, String)>,
        transform: &dyn BatchTransform,
    ) -> Result<ReplacementMap> {
        let total = pending.len();
        let mut replacements = ReplacementMap::new();
        if total == 0 {
            return Ok(replacements);
        }

        debug!("Transforming {} runs in one batch", total);
        let (ids, texts): (Vec<RunId>, Vec<String>) = pending.into_iter().unzip();
        let translated = transform
            .transform_batch(&texts)
            .await
            .map_err(|e| TranslateError::batch(total, e))?;

        if translated.len() != total {
            return Err(TranslateError::batch(
                total,
                format!("expected {} translations, got {}", total, translated.len()),
            ));
        }

        for ((id, text), result) in ids.into_iter().zip(&texts).zip(translated) {
            replacements.insert(id, result);
            self.report(replacements.len(), total, id, text);
        }
        Ok(replacements)
    }

    async fn transform_concurrent(
        &self,
        pending: Vec<(RunId, String)>,
        transform: Arc<dyn TextTransform>,
    ) -> Result<ReplacementMap> {
        let total = pending.len();
        debug!("Transforming {} runs, {} at a time", total, self.concurrency);

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (id, text) in pending {
            let permits = Arc::clone(&permits);
            let transform = Arc::clone(&transform);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| TranslateError::TaskFailed {
                        reason: e.to_string(),
                    })?;
                match transform.transform(&text).await {
                    Ok(translated) => Ok((id, text, translated)),
                    Err(e) => Err(TranslateError::translation(id, e)),
                }
            });
        }

        let mut replacements = ReplacementMap::new();
        while let Some(joined) = tasks.join_next().await {
            let settled = joined
                .map_err(|e| TranslateError::TaskFailed {
                    reason: e.to_string(),
                })
                .and_then(|result| result);

            match settled {
                Ok((id, text, translated)) => {
                    replacements.insert(id, translated);
                    self.report(replacements.len(), total, id, &text);
                }
                Err(err) => {
                    warn!("Aborting translation: {}", err);
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }

        Ok(replacements)
    }

    fn selects(&self, run: &TextRun) -> bool {
        match &self.filter {
            Some(keep) => keep(run),
            None => true,
        }
    }

    fn report(&self, completed: usize, total: usize, id: RunId, text: &str) {
        if let Some(progress) = &self.progress {
            progress(Progress {
                completed,
                total,
                id,
                text,
            });
        }
    }
}
