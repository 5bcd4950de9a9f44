//! Shared test utilities for lingodok-ooxml
//!
//! Fixture packages are assembled in memory with [`ZipWriter`], so tests can
//! control part order and compression exactly.

use std::io::{Cursor, Read, Write};

use zip::read::ZipArchive;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Namespace declarations used by the WordprocessingML fixtures
pub const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

/// Namespace declarations used by the PresentationML fixtures
pub const P_NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

/// Build a ZIP container from `(name, contents)` pairs, in the given order
pub fn build_package(entries: &[(&str, &[u8])], method: CompressionMethod) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(method);

    for (name, contents) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents).unwrap();
    }

    zip.finish().unwrap();
    buffer.into_inner()
}

/// Wrap body content in a complete `word/document.xml`
pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document {W_NS}><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

/// Wrap content in a header part
pub fn header_xml(content: &str) -> String {
    format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr {W_NS}>{content}</w:hdr>"#)
}

/// Wrap content in a footer part
pub fn footer_xml(content: &str) -> String {
    format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:ftr {W_NS}>{content}</w:ftr>"#)
}

/// Wrap shape-tree content in a complete slide part
pub fn slide_xml(sp_tree: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {P_NS}><p:cSld><p:spTree>{sp_tree}</p:spTree></p:cSld></p:sld>"#
    )
}

/// A text shape holding one paragraph per entry, one run per paragraph
pub fn text_shape(paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|t| format!(r#"<a:p><a:r><a:rPr lang="en-US"/><a:t>{t}</a:t></a:r></a:p>"#))
        .collect();
    format!(r#"<p:sp><p:txBody><a:bodyPr/>{body}</p:txBody></p:sp>"#)
}

/// Create a minimal DOCX whose body holds the given content
pub fn minimal_docx(body: &str) -> Vec<u8> {
    let document = document_xml(body);
    build_package(
        &[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("word/document.xml", document.as_bytes()),
        ],
        CompressionMethod::Deflated,
    )
}

/// Create a minimal PPTX with one slide part per entry
pub fn minimal_pptx(slides: &[String]) -> Vec<u8> {
    let names: Vec<String> = (1..=slides.len())
        .map(|n| format!("ppt/slides/slide{n}.xml"))
        .collect();
    let mut entries: Vec<(&str, &[u8])> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("ppt/presentation.xml", b"<p:presentation/>".as_slice()),
    ];
    for (name, slide) in names.iter().zip(slides) {
        entries.push((name.as_str(), slide.as_bytes()));
    }
    build_package(&entries, CompressionMethod::Deflated)
}

/// Extract any part's content from a container as a string
pub fn read_part(package: &[u8], name: &str) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(package)).unwrap();
    let mut file = archive.by_name(name).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).unwrap();
    Some(contents)
}

/// Entry names of a container in order
pub fn entry_names(package: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(package)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index_raw(i).unwrap().name().to_string())
        .collect()
}
