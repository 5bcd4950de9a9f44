//! Positional text rewriting
//!
//! Replacements are applied to the leaves visited by the same walk the
//! extractor uses: run `t_n` is the n-th leaf the walk reaches. A leaf's
//! current text is never used to find it, so repeated strings are always
//! replaced at the right place.

use tracing::{debug, info};

use crate::archive::Package;
use crate::error::{OoxmlError, Result};
use crate::extract::walk_package;
use crate::run::{ReplacementMap, RunId, TextRun};

/// Outcome of a rewrite pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Leaves visited
    pub visited: usize,
    /// Leaves whose text changed
    pub replaced: usize,
    /// Leaves with a replacement identical to their current text
    pub unchanged: usize,
    /// Parts that now need re-serializing
    pub parts_modified: usize,
}

/// Applies a [`ReplacementMap`] to a package's trees
pub struct TextRunRewriter;

impl TextRunRewriter {
    /// Replace the text of the runs named in `replacements`
    ///
    /// `runs` must be the complete result of the last extraction over this
    /// package. The walk is verified against it (leaf count, part and path of
    /// every leaf) before any leaf is touched, so an error leaves the trees
    /// as they were.
    pub fn rewrite(
        package: &mut Package,
        runs: &[TextRun],
        replacements: &ReplacementMap,
    ) -> Result<RewriteStats> {
        if let Some(id) = replacements.ids().find(|id| id.index() >= runs.len()) {
            return Err(OoxmlError::UnknownRun { id });
        }

        let mut visited = 0;
        walk_package(package, |part, path, _leaf| {
            if let Some(run) = runs.get(visited) {
                if run.id != RunId(visited) || run.part_name != part.name || run.path != path {
                    return Err(OoxmlError::RunPathMismatch {
                        id: RunId(visited),
                        part: part.name.clone(),
                    });
                }
            }
            visited += 1;
            Ok(())
        })?;

        if visited != runs.len() {
            return Err(OoxmlError::NodeCountMismatch {
                expected: runs.len(),
                actual: visited,
            });
        }

        let mut stats = RewriteStats {
            visited,
            ..RewriteStats::default()
        };
        let mut touched: Vec<String> = Vec::new();
        let mut ordinal = 0;

        walk_package(package, |part, _path, leaf| {
            let id = RunId(ordinal);
            ordinal += 1;

            if let Some(text) = replacements.get(id) {
                if leaf.text() == text {
                    stats.unchanged += 1;
                } else {
                    leaf.set_text(text);
                    stats.replaced += 1;
                    if touched.last() != Some(&part.name) {
                        touched.push(part.name.clone());
                    }
                }
            }
            Ok(())
        })?;

        for name in &touched {
            debug!("Rewrote text in {}", name);
            package.mark_modified(name);
        }
        stats.parts_modified = touched.len();

        info!(
            "Rewrote {} of {} text runs across {} parts",
            stats.replaced, stats.visited, stats.parts_modified
        );
        Ok(stats)
    }
}
