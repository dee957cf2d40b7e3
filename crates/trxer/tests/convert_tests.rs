//! End-to-end conversion of TRX fixtures with the bundled and custom templates.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trxer::markup::{self, Element, Node};
use trxer::{convert, ConvertOptions, EmbeddedAssets, MapAssets, TrxerError, TEMPLATE_ASSET};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(name)
}

/// Copy a fixture into a fresh directory so the report lands there
fn staged(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join(name);
    fs::copy(fixture(name), &input).unwrap();
    (dir, input)
}

fn find_all<'a>(element: &'a Element, name: &str, found: &mut Vec<&'a Element>) {
    if element.is(name) {
        found.push(element);
    }
    for child in element.elements() {
        find_all(child, name, found);
    }
}

fn elements<'a>(root: &'a Element, name: &str) -> Vec<&'a Element> {
    let mut found = Vec::new();
    find_all(root, name, &mut found);
    found
}

#[test]
fn sample_report_is_self_contained_and_well_formed() {
    let (_dir, input) = staged("sample.trx");
    let output = convert(&ConvertOptions::new(&input, &EmbeddedAssets)).unwrap();
    assert_eq!(output, trxer::default_output_path(&input));

    let html = fs::read_to_string(&output).unwrap();
    let document = markup::parse(&html).expect("report parses as markup");
    let root = &document.root;

    let head = root.child("head").unwrap();
    assert!(head.child("link").is_none());
    assert_eq!(head.children_named("style").count(), 2);
    let scripts = elements(root, "script");
    assert_eq!(scripts.len(), 1);
    assert_eq!(scripts[0].attr("src"), None);
    assert!(scripts[0].text().contains("function toggleClass"));

    assert!(html.contains("Adds_TwoNumbers"));
    assert!(html.contains("42 ms"));
    assert!(html.contains("1.25 seconds"));
    assert!(html.contains("2.08 minutes"));
    assert!(html.contains("3.50 seconds"));
    assert!(html.contains("Assert.AreEqual failed. Expected:&lt;0&gt;. Actual:&lt;1&gt;."));
    assert!(!html.contains("{["));
}

#[test]
fn sample_report_groups_by_class() {
    let (_dir, input) = staged("sample.trx");
    let output = convert(&ConvertOptions::new(&input, &EmbeddedAssets)).unwrap();
    let document = markup::parse(&fs::read_to_string(output).unwrap()).unwrap();

    let captions: Vec<(String, String)> = elements(&document.root, "caption")
        .into_iter()
        .map(|c| {
            let name = c
                .elements()
                .find(|e| e.attr("class") == Some("class-name"))
                .map(Element::text)
                .unwrap_or_default();
            (c.attr("class").unwrap_or_default().to_string(), name)
        })
        .collect();
    assert_eq!(
        captions,
        vec![
            ("Failed".to_string(), "Calc.Tests.MathTests".to_string()),
            ("Warning".to_string(), "Calc.Tests.ParserTests".to_string()),
        ]
    );

    let images = elements(&document.root, "img");
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].attr("src"), Some("C:\\\\results\\\\divide.png"));
}

#[test]
fn minimal_run_without_times_renders() {
    let (dir, input) = staged("minimal.trx");
    convert(&ConvertOptions::new(&input, &EmbeddedAssets)).unwrap();
    let html = fs::read_to_string(dir.path().join("minimal.trx.html")).unwrap();
    assert!(html.contains("OnlyTest"));
    assert!(html.contains("5 ms"));
    assert!(html.contains("100%"));
}

#[test]
fn existing_output_is_overwritten() {
    let (dir, input) = staged("minimal.trx");
    let output = dir.path().join("minimal.trx.html");
    fs::write(&output, "stale").unwrap();
    convert(&ConvertOptions::new(&input, &EmbeddedAssets)).unwrap();
    assert!(fs::read_to_string(output).unwrap().starts_with("<!DOCTYPE html>"));
}

fn assert_no_report(dir: &Path) {
    let leftovers: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
        .collect();
    assert!(leftovers.is_empty(), "unexpected output: {leftovers:?}");
}

#[test]
fn missing_template_asset_fails_before_writing() {
    let (dir, input) = staged("sample.trx");
    let mut assets = MapAssets::from_embedded();
    assets.remove(TEMPLATE_ASSET);

    let err = convert(&ConvertOptions::new(&input, &assets)).unwrap_err();
    assert!(matches!(err, TrxerError::ResourceNotFound { ref name } if name == TEMPLATE_ASSET));
    assert_eq!(err.exit_code(), 3);
    assert_no_report(dir.path());
}

#[test]
fn missing_stylesheet_fails_before_writing() {
    let (dir, input) = staged("sample.trx");
    let mut assets = MapAssets::from_embedded();
    assets.remove("trxer-table.css");

    let err = convert(&ConvertOptions::new(&input, &assets)).unwrap_err();
    assert!(matches!(err, TrxerError::ResourceNotFound { ref name } if name == "trxer-table.css"));
    assert_no_report(dir.path());
}

#[test]
fn malformed_trx_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.trx");
    fs::write(&input, "<TestRun><Results><UnitTestResult></Results></TestRun>").unwrap();

    let err = convert(&ConvertOptions::new(&input, &EmbeddedAssets)).unwrap_err();
    assert!(matches!(err, TrxerError::MalformedInput { .. }));
    assert_eq!(err.exit_code(), 4);
    assert_no_report(dir.path());
}

#[test]
fn helper_failure_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("odd.trx");
    fs::write(
        &input,
        "<TestRun><Results><UnitTestResult testName=\"t\" duration=\"forever\" outcome=\"Passed\"/></Results></TestRun>",
    )
    .unwrap();

    let err = convert(&ConvertOptions::new(&input, &EmbeddedAssets)).unwrap_err();
    assert!(matches!(err, TrxerError::FormatError { .. }));
    assert_no_report(dir.path());
}

#[test]
fn custom_template_from_map_assets() {
    let (dir, input) = staged("sample.trx");
    let assets = MapAssets::new()
        .with("s.js", "var report = true;")
        .with("s.css", "li { margin: 0 }")
        .with(
            TEMPLATE_ASSET,
            "<html><head><link rel=\"stylesheet\" href=\"s.css\"/><script src=\"s.js\"></script></head>\
<body><ul>{[#each results as r]}<li>{[ r.name ]}={[ r.outcome ]}</li>{[/each]}</ul></body></html>",
        );
    let output = dir.path().join("custom.html");
    convert(&ConvertOptions::new(&input, &assets).with_output(&output)).unwrap();

    let document = markup::parse(&fs::read_to_string(&output).unwrap()).unwrap();
    let items: Vec<String> = elements(&document.root, "li").into_iter().map(Element::text).collect();
    assert_eq!(
        items,
        vec![
            "Adds_TwoNumbers=Passed",
            "Divides_ByZero=Failed",
            "Parses_Header=NotExecuted",
        ]
    );
    let head = document.root.child("head").unwrap();
    assert!(matches!(
        head.child("style").map(|s| s.children.as_slice()),
        Some([Node::Text(css)]) if css == "li { margin: 0 }"
    ));
}
