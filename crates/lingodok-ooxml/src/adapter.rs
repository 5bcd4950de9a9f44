//! Format adapters
//!
//! An adapter declares, for one package kind, which parts carry translatable
//! text and in what order they are scanned, the element that roots the scan
//! inside each part, and the leaf tag whose direct text is translatable. The
//! extractor and rewriter are driven entirely by these declarations.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OoxmlError, Result};

/// Package kinds with a built-in adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// WordprocessingML (DOCX and friends)
    WordDocument,
    /// PresentationML (PPTX and friends)
    Presentation,
}

impl PackageKind {
    /// Detect the package kind from a file extension (with or without dot)
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "docx" | "docm" | "dotx" | "dotm" => Some(Self::WordDocument),
            "pptx" | "pptm" | "potx" | "potm" => Some(Self::Presentation),
            _ => None,
        }
    }

    /// Detect the package kind from a path, failing for unknown extensions
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&extension).ok_or_else(|| {
            if extension.is_empty() {
                OoxmlError::unsupported("")
            } else {
                OoxmlError::unsupported(format!(".{}", extension.to_ascii_lowercase()))
            }
        })
    }

    /// The adapter for this package kind
    pub fn adapter(self) -> FormatAdapter {
        match self {
            Self::WordDocument => FormatAdapter::word_document(),
            Self::Presentation => FormatAdapter::presentation(),
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WordDocument => write!(f, "word document"),
            Self::Presentation => write!(f, "presentation"),
        }
    }
}

/// What a scanned part is within its package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartRole {
    Body,
    Header,
    Footer,
    Footnotes,
    Endnotes,
    Slide,
    Notes,
}

impl PartRole {
    /// Lowercase label used in listings
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Header => "header",
            Self::Footer => "footer",
            Self::Footnotes => "footnotes",
            Self::Endnotes => "endnotes",
            Self::Slide => "slide",
            Self::Notes => "notes",
        }
    }
}

impl fmt::Display for PartRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How part names of a group are matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartPattern {
    /// A single part with a fixed name
    Exact(&'static str),
    /// `{prefix}{N}{suffix}` with N a decimal number, visited in ascending N
    Numbered {
        prefix: &'static str,
        suffix: &'static str,
    },
}

impl PartPattern {
    /// The number a part name carries under this pattern, or `None` if it does not match
    ///
    /// `Exact` patterns match with number 0.
    pub fn match_number(&self, name: &str) -> Option<u64> {
        match self {
            Self::Exact(exact) => (name == *exact).then_some(0),
            Self::Numbered { prefix, suffix } => {
                let digits = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok()
            }
        }
    }
}

impl fmt::Display for PartPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Numbered { prefix, suffix } => write!(f, "{prefix}N{suffix}"),
        }
    }
}

/// One group of parts scanned together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartGroup {
    /// Role reported for runs found in these parts
    pub role: PartRole,
    /// Which part names belong to the group
    pub pattern: PartPattern,
    /// Element whose subtree is scanned (first match in pre-order)
    pub scan_root: &'static str,
    /// Whether the package is invalid without at least one matching part
    pub required: bool,
}

/// A part resolved against a concrete package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPart {
    pub name: String,
    pub role: PartRole,
    pub scan_root: &'static str,
    /// Whether the part belongs to a required group
    pub required: bool,
}

/// Scan declarations for one package kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatAdapter {
    kind: PackageKind,
    groups: Vec<PartGroup>,
    leaf_tag: &'static str,
}

impl FormatAdapter {
    /// Create an adapter from explicit declarations
    pub fn new(kind: PackageKind, leaf_tag: &'static str, groups: Vec<PartGroup>) -> Self {
        Self {
            kind,
            groups,
            leaf_tag,
        }
    }

    /// WordprocessingML: body, headers, footers, footnotes, endnotes; leaf `w:t`
    pub fn word_document() -> Self {
        Self::new(
            PackageKind::WordDocument,
            "w:t",
            vec![
                PartGroup {
                    role: PartRole::Body,
                    pattern: PartPattern::Exact("word/document.xml"),
                    scan_root: "w:body",
                    required: true,
                },
                PartGroup {
                    role: PartRole::Header,
                    pattern: PartPattern::Numbered {
                        prefix: "word/header",
                        suffix: ".xml",
                    },
                    scan_root: "w:hdr",
                    required: false,
                },
                PartGroup {
                    role: PartRole::Footer,
                    pattern: PartPattern::Numbered {
                        prefix: "word/footer",
                        suffix: ".xml",
                    },
                    scan_root: "w:ftr",
                    required: false,
                },
                PartGroup {
                    role: PartRole::Footnotes,
                    pattern: PartPattern::Exact("word/footnotes.xml"),
                    scan_root: "w:footnotes",
                    required: false,
                },
                PartGroup {
                    role: PartRole::Endnotes,
                    pattern: PartPattern::Exact("word/endnotes.xml"),
                    scan_root: "w:endnotes",
                    required: false,
                },
            ],
        )
    }

    /// PresentationML: slides then speaker notes; leaf `a:t`
    pub fn presentation() -> Self {
        Self::new(
            PackageKind::Presentation,
            "a:t",
            vec![
                PartGroup {
                    role: PartRole::Slide,
                    pattern: PartPattern::Numbered {
                        prefix: "ppt/slides/slide",
                        suffix: ".xml",
                    },
                    scan_root: "p:sld",
                    required: true,
                },
                PartGroup {
                    role: PartRole::Notes,
                    pattern: PartPattern::Numbered {
                        prefix: "ppt/notesSlides/notesSlide",
                        suffix: ".xml",
                    },
                    scan_root: "p:notes",
                    required: false,
                },
            ],
        )
    }

    /// Package kind this adapter handles
    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    /// Tag whose direct text content is translatable
    pub fn leaf_tag(&self) -> &'static str {
        self.leaf_tag
    }

    /// Declared part groups in scan order
    pub fn groups(&self) -> &[PartGroup] {
        &self.groups
    }

    /// Resolve the scan order against the part names present in a package
    ///
    /// Groups are visited in declaration order; numbered parts within a
    /// group in ascending numeric order, independent of container order.
    pub fn resolve<'a>(&self, names: impl IntoIterator<Item = &'a str> + Clone) -> Result<Vec<ScanPart>> {
        let mut parts = Vec::new();

        for group in &self.groups {
            let mut matched: Vec<(u64, &str)> = names
                .clone()
                .into_iter()
                .filter_map(|name| group.pattern.match_number(name).map(|n| (n, name)))
                .collect();

            if matched.is_empty() && group.required {
                return Err(OoxmlError::invalid_package(
                    self.kind,
                    group.pattern.to_string(),
                ));
            }

            matched.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
            parts.extend(matched.into_iter().map(|(_, name)| ScanPart {
                name: name.to_string(),
                role: group.role,
                scan_root: group.scan_root,
                required: group.required,
            }));
        }

        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(
            PackageKind::from_extension(".DOCX"),
            Some(PackageKind::WordDocument)
        );
        assert_eq!(
            PackageKind::from_extension("pptx"),
            Some(PackageKind::Presentation)
        );
        assert_eq!(PackageKind::from_extension(".pdf"), None);

        let err = PackageKind::from_path("notes.md").unwrap_err();
        assert!(matches!(err, OoxmlError::UnsupportedFormat { ref extension } if extension == ".md"));
        assert!(PackageKind::from_path("README").is_err());
    }

    #[test]
    fn test_numbered_pattern() {
        let pattern = PartPattern::Numbered {
            prefix: "ppt/slides/slide",
            suffix: ".xml",
        };
        assert_eq!(pattern.match_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(pattern.match_number("ppt/slides/slide.xml"), None);
        assert_eq!(pattern.match_number("ppt/slides/_rels/slide1.xml.rels"), None);
        assert_eq!(pattern.match_number("ppt/slides/slideLayout1.xml"), None);
    }

    #[test]
    fn test_word_resolution_order() {
        let names = [
            "word/footer1.xml",
            "word/header10.xml",
            "word/styles.xml",
            "word/header2.xml",
            "word/document.xml",
            "word/footnotes.xml",
        ];
        let parts = FormatAdapter::word_document()
            .resolve(names.iter().copied())
            .unwrap();
        let order: Vec<_> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "word/document.xml",
                "word/header2.xml",
                "word/header10.xml",
                "word/footer1.xml",
                "word/footnotes.xml",
            ]
        );
        assert_eq!(parts[1].role, PartRole::Header);
        assert_eq!(parts[1].scan_root, "w:hdr");
    }

    #[test]
    fn test_missing_required_part() {
        let err = FormatAdapter::presentation()
            .resolve(["ppt/presentation.xml", "ppt/notesSlides/notesSlide1.xml"])
            .unwrap_err();
        assert_eq!(err.code(), "OOXML003");
        assert!(err.to_string().contains("ppt/slides/slideN.xml"));
    }
}
