//! End-to-end translation tests over packages written to disk

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lingodok_ooxml::test_utils::{
    build_package, document_xml, entry_names, footer_xml, header_xml, minimal_docx, minimal_pptx,
    read_part, slide_xml, text_shape,
};
use lingodok_ooxml::{OoxmlError, PartRole, RunId};
use lingodok_translate::{
    AsyncFnTransform, BatchFnTransform, BoxError, FnTransform, IdentityTransform, TranslateError,
    TranslationOrchestrator, UppercaseTransform,
};
use tempfile::TempDir;
use zip::CompressionMethod;

fn paragraphs(texts: &[&str]) -> String {
    texts
        .iter()
        .map(|t| format!("<w:p><w:r><w:t>{t}</w:t></w:r></w:p>"))
        .collect()
}

fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn five_runs(dir: &TempDir) -> PathBuf {
    let docx = minimal_docx(&paragraphs(&["one", "two", "three", "four", "five"]));
    write_fixture(dir, "five.docx", &docx)
}

fn document(path: &Path) -> String {
    read_part(&std::fs::read(path).unwrap(), "word/document.xml").unwrap()
}

#[test]
fn test_extract_is_idempotent_and_read_only() {
    let dir = TempDir::new().unwrap();
    let input = five_runs(&dir);
    let before = std::fs::read(&input).unwrap();

    let orchestrator = TranslationOrchestrator::new();
    let first = orchestrator.extract_text(&input).unwrap();
    let second = orchestrator.extract_text(&input).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
    assert_eq!(std::fs::read(&input).unwrap(), before);
}

#[test]
fn test_blank_leaves_are_not_runs() {
    let dir = TempDir::new().unwrap();
    let body = r#"<w:p><w:r><w:t>Title</w:t></w:r><w:r><w:t xml:space="preserve">   </w:t></w:r><w:r><w:t/></w:r></w:p>"#;
    let input = write_fixture(&dir, "blank.docx", &minimal_docx(body));

    let runs = TranslationOrchestrator::new().extract_text(&input).unwrap();
    let texts: Vec<_> = runs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["Title"]);
}

#[tokio::test]
async fn test_blank_leaves_survive_translation() {
    let dir = TempDir::new().unwrap();
    let body = r#"<w:p><w:r><w:t>Title</w:t></w:r><w:r><w:t xml:space="preserve">   </w:t></w:r><w:r><w:t/></w:r></w:p>"#;
    let input = write_fixture(&dir, "blank.docx", &minimal_docx(body));
    let output = dir.path().join("blank.out.docx");

    TranslationOrchestrator::new()
        .translate_and_save(&input, &output, UppercaseTransform)
        .await
        .unwrap();

    let expected = document(&input).replace("<w:t>Title</w:t>", "<w:t>TITLE</w:t>");
    assert_eq!(document(&output), expected);
}

#[test]
fn test_runs_follow_part_order() {
    let dir = TempDir::new().unwrap();
    let footer = footer_xml(&paragraphs(&["page footer"]));
    let header = header_xml(&paragraphs(&["page header"]));
    let document = document_xml(&paragraphs(&["first", "second"]));
    let docx = build_package(
        &[
            ("word/footer1.xml", footer.as_bytes()),
            ("word/header1.xml", header.as_bytes()),
            ("word/document.xml", document.as_bytes()),
        ],
        CompressionMethod::Deflated,
    );
    let input = write_fixture(&dir, "parts.docx", &docx);

    let runs = TranslationOrchestrator::new().extract_text(&input).unwrap();
    let found: Vec<_> = runs.iter().map(|r| (r.id, r.role)).collect();
    assert_eq!(
        found,
        vec![
            (RunId(0), PartRole::Body),
            (RunId(1), PartRole::Body),
            (RunId(2), PartRole::Header),
            (RunId(3), PartRole::Footer),
        ]
    );
}

#[tokio::test]
async fn test_identity_translation_keeps_every_part() {
    let dir = TempDir::new().unwrap();
    let input = five_runs(&dir);
    let output = dir.path().join("out.docx");

    let report = TranslationOrchestrator::new()
        .translate_and_save(&input, &output, IdentityTransform)
        .await
        .unwrap();
    assert_eq!(report.transformed, 5);
    assert_eq!(report.replaced, 0);
    assert_eq!(report.parts_rewritten, 0);

    let source = std::fs::read(&input).unwrap();
    let target = std::fs::read(&output).unwrap();
    let names = entry_names(&source);
    assert_eq!(names, entry_names(&target));
    for name in &names {
        assert_eq!(read_part(&source, name), read_part(&target, name), "{name}");
    }
}

#[tokio::test]
async fn test_repeated_text_is_replaced_in_place() {
    let dir = TempDir::new().unwrap();
    let pptx = minimal_pptx(&[slide_xml(&text_shape(&["Hello", "Hello"]))]);
    let input = write_fixture(&dir, "hello.pptx", &pptx);
    let output = dir.path().join("hello.out.pptx");

    let counter = AtomicUsize::new(0);
    let numbered = FnTransform(move |text: &str| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok::<_, BoxError>(format!("{text}-{n}"))
    });

    TranslationOrchestrator::new()
        .translate_and_save(&input, &output, numbered)
        .await
        .unwrap();

    let slide = read_part(&std::fs::read(&output).unwrap(), "ppt/slides/slide1.xml").unwrap();
    let first = slide.find("<a:t>Hello-1</a:t>").unwrap();
    let second = slide.find("<a:t>Hello-2</a:t>").unwrap();
    assert!(first < second);
    assert!(!slide.contains("<a:t>Hello</a:t>"));
}

#[tokio::test]
async fn test_failed_transform_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let input = five_runs(&dir);
    let output = dir.path().join("never.docx");

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let failing = FnTransform(move |text: &str| {
        seen.fetch_add(1, Ordering::SeqCst);
        if text == "two" {
            Err("service unavailable")
        } else {
            Ok(text.to_uppercase())
        }
    });

    let err = TranslationOrchestrator::new()
        .translate_and_save(&input, &output, failing)
        .await
        .unwrap_err();

    assert!(matches!(err, TranslateError::Translation { id: RunId(1), .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_failed_transform_leaves_existing_output() {
    let dir = TempDir::new().unwrap();
    let input = five_runs(&dir);
    let output = write_fixture(&dir, "existing.docx", b"previous contents");

    let failing = AsyncFnTransform(|text: String| async move {
        if text == "four" {
            Err::<String, BoxError>("timeout".into())
        } else {
            Ok(text)
        }
    });

    let result = TranslationOrchestrator::new()
        .with_concurrency(3)
        .translate_and_save(&input, &output, failing)
        .await;

    assert!(matches!(result, Err(TranslateError::Translation { id: RunId(3), .. })));
    assert_eq!(std::fs::read(&output).unwrap(), b"previous contents");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_results_keep_their_runs() {
    let dir = TempDir::new().unwrap();
    let input = five_runs(&dir);
    let output = dir.path().join("concurrent.docx");

    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (in_flight_c, peak_c) = (Arc::clone(&in_flight), Arc::clone(&peak));

    // Shorter texts take longer, so results arrive out of order
    let slow_upper = AsyncFnTransform(move |text: String| {
        let in_flight = Arc::clone(&in_flight_c);
        let peak = Arc::clone(&peak_c);
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(60 / text.len() as u64)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, BoxError>(text.to_uppercase())
        }
    });

    let report = TranslationOrchestrator::new()
        .with_concurrency(2)
        .translate_and_save(&input, &output, slow_upper)
        .await
        .unwrap();

    assert_eq!(report.replaced, 5);
    assert!(peak.load(Ordering::SeqCst) <= 2);

    let xml = document(&output);
    let positions: Vec<_> = ["ONE", "TWO", "THREE", "FOUR", "FIVE"]
        .iter()
        .map(|t| xml.find(&format!("<w:t>{t}</w:t>")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_filter_and_progress() {
    let dir = TempDir::new().unwrap();
    let input = five_runs(&dir);
    let output = dir.path().join("filtered.docx");

    let updates = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&updates);
    let report = TranslationOrchestrator::new()
        .with_filter(|run| run.text.starts_with('t'))
        .with_progress(move |p| {
            counted.fetch_add(1, Ordering::SeqCst);
            assert_eq!(p.total, 2);
        })
        .translate_and_save(&input, &output, UppercaseTransform)
        .await
        .unwrap();

    assert_eq!(report.transformed, 2);
    assert_eq!(report.skipped, 3);
    assert_eq!(updates.load(Ordering::SeqCst), 2);

    let xml = document(&output);
    assert!(xml.contains("<w:t>one</w:t>"));
    assert!(xml.contains("<w:t>TWO</w:t>"));
    assert!(xml.contains("<w:t>THREE</w:t>"));
}

#[tokio::test]
async fn test_batch_translation_saves_in_place() {
    let dir = TempDir::new().unwrap();
    let input = five_runs(&dir);
    let output = dir.path().join("batch.docx");

    let upper = BatchFnTransform(|texts: Vec<String>| async move {
        Ok::<_, BoxError>(texts.iter().map(|t| t.to_uppercase()).collect())
    });
    let report = TranslationOrchestrator::new()
        .translate_batch_and_save(&input, &output, upper)
        .await
        .unwrap();

    assert_eq!(report.replaced, 5);
    let expected = ["one", "two", "three", "four", "five"]
        .iter()
        .fold(document(&input), |xml, t| {
            xml.replace(&format!("<w:t>{t}</w:t>"), &format!("<w:t>{}</w:t>", t.to_uppercase()))
        });
    assert_eq!(document(&output), expected);
}

#[tokio::test]
async fn test_short_batch_leaves_existing_output() {
    let dir = TempDir::new().unwrap();
    let input = five_runs(&dir);
    let output = write_fixture(&dir, "existing.docx", b"previous contents");

    let extra = BatchFnTransform(|mut texts: Vec<String>| async move {
        texts.push("surplus".to_string());
        Ok::<_, BoxError>(texts)
    });
    let err = TranslationOrchestrator::new()
        .translate_batch_and_save(&input, &output, extra)
        .await
        .unwrap_err();

    assert!(matches!(err, TranslateError::Batch { runs: 5, .. }));
    assert_eq!(std::fs::read(&output).unwrap(), b"previous contents");
}

#[tokio::test]
async fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "notes.txt", b"plain text");
    let output = dir.path().join("notes.out.txt");

    let err = TranslationOrchestrator::new()
        .translate_and_save(&input, &output, IdentityTransform)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TranslateError::Package(OoxmlError::UnsupportedFormat { .. })
    ));
    assert!(!output.exists());
}
