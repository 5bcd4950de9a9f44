//! Text runs and replacement maps

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::adapter::PartRole;

/// Identifier of a text run, dense and zero-based in extraction order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub usize);

impl RunId {
    /// Position of the run in the extraction sequence
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t_{}", self.0)
    }
}

/// One step from the scan root towards a leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Qualified tag of the element entered
    pub tag: String,
    /// Index among the parent's element children
    pub index: usize,
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.tag, self.index)
    }
}

/// A translatable leaf found during extraction
///
/// This is a snapshot: it locates the leaf by part name and path but does
/// not hold on to the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub id: RunId,
    pub part_name: String,
    pub role: PartRole,
    pub path: Vec<PathStep>,
    pub order_index: usize,
    pub text: String,
}

impl TextRun {
    /// Path rendered as `w:p[0]/w:r[1]/w:t[0]`
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(PathStep::to_string)
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Replacement text keyed by run id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementMap {
    entries: BTreeMap<RunId, String>,
}

impl ReplacementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the replacement for a run, returning any previous one
    pub fn insert(&mut self, id: RunId, text: impl Into<String>) -> Option<String> {
        self.entries.insert(id, text.into())
    }

    pub fn get(&self, id: RunId) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: RunId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = RunId> + '_ {
        self.entries.keys().copied()
    }
}

impl FromIterator<(RunId, String)> for ReplacementMap {
    fn from_iter<I: IntoIterator<Item = (RunId, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(RunId, String)> for ReplacementMap {
    fn extend<I: IntoIterator<Item = (RunId, String)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_display() {
        assert_eq!(RunId(7).to_string(), "t_7");
        assert_eq!(RunId(7).index(), 7);
    }

    #[test]
    fn test_path_string() {
        let run = TextRun {
            id: RunId(0),
            part_name: "word/document.xml".into(),
            role: PartRole::Body,
            path: vec![
                PathStep {
                    tag: "w:p".into(),
                    index: 2,
                },
                PathStep {
                    tag: "w:r".into(),
                    index: 1,
                },
                PathStep {
                    tag: "w:t".into(),
                    index: 1,
                },
            ],
            order_index: 0,
            text: "Hi".into(),
        };
        assert_eq!(run.path_string(), "w:p[2]/w:r[1]/w:t[1]");
    }

    #[test]
    fn test_replacement_map() {
        let mut map: ReplacementMap = [(RunId(2), "b".to_string()), (RunId(0), "a".to_string())]
            .into_iter()
            .collect();
        assert_eq!(map.insert(RunId(2), "c"), Some("b".to_string()));
        assert_eq!(map.get(RunId(2)), Some("c"));
        assert!(!map.contains(RunId(1)));
        assert_eq!(map.ids().collect::<Vec<_>>(), vec![RunId(0), RunId(2)]);
    }
}
