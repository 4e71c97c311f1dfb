//! End-to-end tests for the extraction pipeline: load, resolve namespaces,
//! extract, serialize. Each test drives the library API on an in-memory
//! document, exercising the three observed namespace dialects and the
//! recovery behavior on malformed input.

use appcast_extract::{
    extract_releases, parse_document, Dialect, FeedNamespaces, LoadError, ParseMode, ReleaseRecord,
};
use pretty_assertions::assert_eq;

const SPARKLE: &str = "http://www.andymatuschak.org/xml-namespaces/sparkle";

fn run(bytes: &[u8], mode: ParseMode) -> Vec<ReleaseRecord> {
    let root = parse_document(bytes, mode).expect("parse failed");
    let ns = FeedNamespaces::resolve(bytes, &root);
    extract_releases(&root, &ns)
}

/// The same logical feed rendered in each of the three observed
/// namespace-declaration styles.
fn dialect_fixtures() -> [(Dialect, String); 3] {
    let item = r#"<item>
                 <title>Version 1.2.3</title>
                 <sparkle:version>42</sparkle:version>
                 <sparkle:shortVersionString>1.2.3</sparkle:shortVersionString>
                 <description>Bug fixes</description>
                 <enclosure url="https://example.com/app-1.2.3.delta" sparkle:deltaFrom="1.2.2"/>
                 <enclosure url="https://example.com/app-1.2.3.zip" length="1024" type="application/octet-stream"/>
               </item>"#;
    [
        (
            Dialect::Conformant,
            format!(
                r#"<rss xmlns="http://backend.userland.com/rss2" xmlns:sparkle="{SPARKLE}" version="2.0"><channel>{item}</channel></rss>"#
            ),
        ),
        (
            Dialect::DegenerateDefault,
            format!(
                r#"<rss xmlns="xmlns" xmlns:sparkle="{SPARKLE}" version="2.0"><channel>{item}</channel></rss>"#
            ),
        ),
        (
            Dialect::PreCleaned,
            format!(
                r#"<rss xmlns:sparkle="{SPARKLE}" version="2.0"><channel>{item}</channel></rss>"#
            ),
        ),
    ]
}

#[test]
fn test_all_dialects_yield_identical_records() {
    let expected = vec![ReleaseRecord {
        build_num: "42".to_string(),
        short_version_str: "1.2.3".to_string(),
        description: "Bug fixes".to_string(),
        zip_url: "https://example.com/app-1.2.3.zip".to_string(),
        zip_filename: "app-1.2.3.zip".to_string(),
    }];
    for (dialect, input) in dialect_fixtures() {
        let root = parse_document(input.as_bytes(), ParseMode::Recover).expect("parse failed");
        let ns = FeedNamespaces::resolve(input.as_bytes(), &root);
        assert_eq!(ns.dialect(), dialect, "wrong dialect detected");
        assert_eq!(
            extract_releases(&root, &ns),
            expected,
            "dialect {:?} produced different records",
            dialect
        );
    }
}

#[test]
fn test_worked_scenario_compact_json() {
    let input = format!(
        r#"<rss xmlns:sparkle="{SPARKLE}" version="2.0"><channel>
             <item>
               <sparkle:version>42</sparkle:version>
               <sparkle:shortVersionString>1.2.3</sparkle:shortVersionString>
               <description>Bug fixes</description>
               <enclosure url="https://example.com/app-1.2.3.zip"/>
             </item>
           </channel></rss>"#
    );
    let releases = run(input.as_bytes(), ParseMode::Recover);
    let json = serde_json::to_string(&releases).unwrap();
    assert_eq!(
        json,
        r#"[{"build_num":"42","short_version_str":"1.2.3","description":"Bug fixes","zip_url":"https://example.com/app-1.2.3.zip","zip_filename":"app-1.2.3.zip"}]"#
    );
}

#[test]
fn test_output_is_valid_json_with_exact_keys() {
    for (_, input) in dialect_fixtures() {
        let releases = run(input.as_bytes(), ParseMode::Recover);
        let json = serde_json::to_string(&releases).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let array = value.as_array().expect("output is not a JSON array");
        for obj in array {
            let obj = obj.as_object().expect("entry is not a JSON object");
            let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
            keys.sort_unstable();
            assert_eq!(
                keys,
                vec![
                    "build_num",
                    "description",
                    "short_version_str",
                    "zip_filename",
                    "zip_url"
                ]
            );
            assert!(obj.values().all(|v| v.is_string()));
        }
    }
}

#[test]
fn test_extraction_is_idempotent() {
    let fixtures = dialect_fixtures();
    let (_, input) = &fixtures[1];
    let first = serde_json::to_string(&run(input.as_bytes(), ParseMode::Recover)).unwrap();
    let second = serde_json::to_string(&run(input.as_bytes(), ParseMode::Recover)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_empty_feed_yields_empty_array() {
    let input = r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
    let releases = run(input.as_bytes(), ParseMode::Recover);
    assert!(releases.is_empty());
    assert_eq!(serde_json::to_string(&releases).unwrap(), "[]");
}

#[test]
fn test_incomplete_items_dropped_order_preserved() {
    let input = format!(
        r#"<rss xmlns:sparkle="{SPARKLE}" version="2.0"><channel>
             <item>
               <sparkle:version>3</sparkle:version>
               <sparkle:shortVersionString>0.3</sparkle:shortVersionString>
               <enclosure url="https://example.com/app-0.3.zip"/>
             </item>
             <item>
               <sparkle:version>2</sparkle:version>
               <enclosure url="https://example.com/app-0.2.zip"/>
             </item>
             <item>
               <sparkle:version>1</sparkle:version>
               <sparkle:shortVersionString>0.1</sparkle:shortVersionString>
               <enclosure url="https://example.com/app-0.1.zip"/>
             </item>
           </channel></rss>"#
    );
    let releases = run(input.as_bytes(), ParseMode::Recover);
    assert_eq!(releases.len(), 2);
    assert_eq!(releases[0].build_num, "3");
    assert_eq!(releases[1].build_num, "1");
}

#[test]
fn test_recovery_parses_malformed_feed_strict_rejects_it() {
    // Unescaped ampersand in the description and a stray trailing end tag.
    let input = format!(
        r#"<rss xmlns="xmlns" xmlns:sparkle="{SPARKLE}"><channel>
             <item>
               <sparkle:version>42</sparkle:version>
               <sparkle:shortVersionString>1.2.3</sparkle:shortVersionString>
               <description>Fixes & improvements</description>
               <enclosure url="https://example.com/app-1.2.3.zip"/>
             </item>
           </channel></rss></extra>"#
    );

    let releases = run(input.as_bytes(), ParseMode::Recover);
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].description, "Fixes & improvements");

    assert!(matches!(
        parse_document(input.as_bytes(), ParseMode::Strict),
        Err(LoadError::Parse(_))
    ));
}

#[test]
fn test_unreadable_input_is_fatal() {
    assert!(matches!(
        parse_document(b"", ParseMode::Recover),
        Err(LoadError::Empty)
    ));
    assert!(parse_document(b"complete garbage, no markup", ParseMode::Recover).is_err());
}

#[test]
fn test_delta_selection_independent_of_order() {
    for (first, second) in [
        (
            r#"<enclosure url="https://example.com/d.zip" sparkle:deltaFrom="1.0"/>"#,
            r#"<enclosure url="https://example.com/full.zip"/>"#,
        ),
        (
            r#"<enclosure url="https://example.com/full.zip"/>"#,
            r#"<enclosure url="https://example.com/d.zip" sparkle:deltaFrom="1.0"/>"#,
        ),
    ] {
        let input = format!(
            r#"<rss xmlns:sparkle="{SPARKLE}"><channel><item>
                 <sparkle:version>42</sparkle:version>
                 <sparkle:shortVersionString>1.2.3</sparkle:shortVersionString>
                 {first}{second}
               </item></channel></rss>"#
        );
        let releases = run(input.as_bytes(), ParseMode::Recover);
        assert_eq!(releases[0].zip_url, "https://example.com/full.zip");
    }
}

#[test]
fn test_url_not_trimmed() {
    let input = format!(
        r#"<rss xmlns:sparkle="{SPARKLE}"><channel><item>
             <sparkle:version>42</sparkle:version>
             <sparkle:shortVersionString>1.2.3</sparkle:shortVersionString>
             <enclosure url=" https://example.com/app.zip "/>
           </item></channel></rss>"#
    );
    let releases = run(input.as_bytes(), ParseMode::Recover);
    assert_eq!(releases[0].zip_url, " https://example.com/app.zip ");
}
