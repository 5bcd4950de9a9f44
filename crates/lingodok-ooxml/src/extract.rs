//! Text run extraction
//!
//! Scanned parts are visited in adapter order. Inside each part the subtree
//! under the scan root is walked in pre-order, element children in document
//! order. Every element carrying the adapter's leaf tag with non-blank text
//! becomes a [`TextRun`]; the walk does not descend into leaves.
//!
//! The same walk drives the rewriter, so the n-th leaf seen here is the n-th
//! leaf seen there.

use tracing::{debug, info};

use crate::adapter::ScanPart;
use crate::archive::Package;
use crate::error::{OoxmlError, Result};
use crate::run::{PathStep, RunId, TextRun};
use crate::xml::{Element, Node};

type LeafVisitor<'a> = dyn FnMut(&[PathStep], &mut Element) -> Result<()> + 'a;

/// Walk every non-blank leaf of every scanned part, in scan order
pub(crate) fn walk_package<F>(package: &mut Package, mut visit: F) -> Result<()>
where
    F: FnMut(&ScanPart, &[PathStep], &mut Element) -> Result<()>,
{
    let leaf_tag = package.adapter().leaf_tag();
    let kind = package.kind();
    let mut path = Vec::new();

    for i in 0..package.scan_parts().len() {
        let part = package.scan_parts()[i].clone();
        let doc = package.scan_tree_mut(i)?;

        match doc.root_mut().find_mut(part.scan_root) {
            Some(root) => {
                let mut visit_part = |steps: &[PathStep], leaf: &mut Element| visit(&part, steps, leaf);
                walk(root, leaf_tag, &mut path, &mut visit_part)?;
            }
            None if part.required => {
                return Err(OoxmlError::invalid_package(
                    kind,
                    format!("<{}> in {}", part.scan_root, part.name),
                ));
            }
            None => debug!("{} has no <{}>, skipping", part.name, part.scan_root),
        }
    }

    Ok(())
}

fn walk(
    element: &mut Element,
    leaf_tag: &str,
    path: &mut Vec<PathStep>,
    visit: &mut LeafVisitor<'_>,
) -> Result<()> {
    let mut index = 0;
    for child in element.children.iter_mut() {
        let Node::Element(child) = child else {
            continue;
        };

        path.push(PathStep {
            tag: child.tag().to_string(),
            index,
        });
        index += 1;

        if child.tag() == leaf_tag {
            if !is_blank(&child.text()) {
                visit(path, child)?;
            }
        } else {
            walk(child, leaf_tag, path, visit)?;
        }

        path.pop();
    }
    Ok(())
}

/// Whitespace-only text is never extracted nor rewritten
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Collects text runs from a package
pub struct TextRunExtractor;

impl TextRunExtractor {
    /// Extract all runs of a package in scan order
    ///
    /// Parts are parsed on first access and stay parsed inside the package,
    /// ready for [`crate::TextRunRewriter`].
    pub fn extract(package: &mut Package) -> Result<Vec<TextRun>> {
        let mut runs: Vec<TextRun> = Vec::new();

        walk_package(package, |part, path, leaf| {
            let ordinal = runs.len();
            runs.push(TextRun {
                id: RunId(ordinal),
                part_name: part.name.clone(),
                role: part.role,
                path: path.to_vec(),
                order_index: ordinal,
                text: leaf.text().into_owned(),
            });
            Ok(())
        })?;

        info!("Extracted {} text runs from {} parts", runs.len(), package.scan_parts().len());
        Ok(runs)
    }
}
