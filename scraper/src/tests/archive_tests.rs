use anyhow::Result;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

use super::fixtures;
use crate::archive::{
    date_from_filename, date_from_title, manifest_id_from_url, parse_manifest, parse_search_results, search_url,
    KbArchiveScraper, NewspaperIssue,
};
use crate::config::{ScraperConfig, DAGENS_NYHETER_ID};
use crate::error::FailureKind;
use crate::io::{file_name_from_url, sanitize_title, write_atomic};

// Test successful parsing of a sample search results page
#[test]
fn test_sample_search_results_parsing() {
    let html = fixtures::load_html_fixture("search_results");
    let issues = parse_search_results(&html);

    // The third result has no IIIF image and is skipped
    assert_eq!(issues.len(), 2);

    assert_eq!(
        issues[0],
        NewspaperIssue {
            title: "DAGENS NYHETER".to_string(),
            date: "1865-01-02".to_string(),
            manifest_id: "dark-1234567".to_string(),
        }
    );

    // No date element, so the date comes from the page file name
    assert_eq!(issues[1].title, "Post- och Inrikes Tidningar");
    assert_eq!(issues[1].date, "1865-01-02");
    assert_eq!(issues[1].manifest_id, "dark-7654321");
}

#[test]
fn test_empty_search_page() {
    let html = r#"
    <html>
    <head><title>Sök</title></head>
    <body><div class="search-results"></div></body>
    </html>
    "#;

    assert!(parse_search_results(html).is_empty());
}

#[test]
fn test_missing_title_and_date_use_placeholders() {
    let html = r#"
    <html><body>
      <div class="search-result-item">
        <img data-src="https://data.kb.se/iiif/3/dark-42/full/200,/0/default.jpg" />
      </div>
    </body></html>
    "#;

    let issues = parse_search_results(html);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].title, "Unknown");
    assert_eq!(issues[0].date, "Unknown_Date");
    assert_eq!(issues[0].manifest_id, "dark-42");
}

#[test]
fn test_slashes_in_dates_become_dashes() {
    let html = r#"
    <html><body>
      <div class="search-result-item">
        <div class="search-result-item-title">Aftonbladet</div>
        <p class="search-result-item-date">1865/01/02</p>
        <img src="https://data.kb.se/iiif/3/dark-9/full/200,/0/default.jpg" />
      </div>
    </body></html>
    "#;

    let issues = parse_search_results(html);
    assert_eq!(issues[0].date, "1865-01-02");
}

#[test]
fn test_date_from_title_tag_before_file_name() {
    let html = r#"
    <html><body>
      <div class="search-result-item">
        <div class="search-result-item-title">Aftonbladet</div>
        <title>Aftonbladet 1865-01-03 | Svenska dagstidningar</title>
        <img src="https://data.kb.se/iiif/3/dark-9%2Fbib1_18650102_0_1_0001.jp2/full/200,/0/default.jpg" />
      </div>
    </body></html>
    "#;

    let issues = parse_search_results(html);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].date, "1865-01-03");
}

#[test]
fn test_date_from_title() {
    assert_eq!(
        date_from_title("<title>DAGENS NYHETER 1865-01-02 | Tidningar</title>"),
        Some("1865-01-02".to_string())
    );
    assert_eq!(
        date_from_title("<head><title>Post- och Inrikes Tidningar 1865-01-31|KB</title></head>"),
        Some("1865-01-31".to_string())
    );
    // Needs a name before the date and a bar after it
    assert_eq!(date_from_title("<title>1865-01-02 | Tidningar</title>"), None);
    assert_eq!(date_from_title("<title>DAGENS NYHETER 1865-01-02</title>"), None);
    assert_eq!(date_from_title("<title>DAGENS NYHETER 1865-1-2 | Tidningar</title>"), None);
    assert_eq!(date_from_title("DAGENS NYHETER 1865-01-02 | Tidningar"), None);
}

#[test]
fn test_manifest_id_from_url() {
    assert_eq!(
        manifest_id_from_url("https://data.kb.se/iiif/3/dark-1234567%2Fpage.jp2/full/max/0/default.jpg"),
        Some("dark-1234567".to_string())
    );
    assert_eq!(
        manifest_id_from_url("https://data.kb.se/iiif/10/dark-1/x"),
        Some("dark-1".to_string())
    );
    assert_eq!(manifest_id_from_url("https://data.kb.se/iiif/v3/dark-1/x"), None);
    assert_eq!(manifest_id_from_url("https://example.com/iiif/3/dark-1/x"), None);
    assert_eq!(manifest_id_from_url("https://data.kb.se/iiif/3/"), None);
}

#[test]
fn test_date_from_filename() {
    assert_eq!(
        date_from_filename("x/bib13991099_18650102_0_1_0001.jp2"),
        Some("1865-01-02".to_string())
    );
    assert_eq!(date_from_filename("bibliography_18650102_"), None);
    assert_eq!(date_from_filename("bib12_1865010_"), None);
    assert_eq!(date_from_filename("no dates here"), None);
}

#[test]
fn test_manifest_parsing() {
    let json = fixtures::load_json_fixture("manifest");
    let urls = parse_manifest(&json).unwrap();

    assert_eq!(
        urls,
        vec![
            "https://data.kb.se/dark-1234567/bib13991099_18650102_0_1_0001.jp2",
            "https://data.kb.se/dark-1234567/bib13991099_18650102_0_1_0002.jp2",
        ]
    );
}

#[test]
fn test_manifest_without_items() {
    assert!(parse_manifest(r#"{"type": "Manifest"}"#).unwrap().is_empty());

    let err = parse_manifest("<html>not json</html>").unwrap_err();
    assert_eq!(err.kind(), FailureKind::Parse);
}

#[test]
fn test_search_url() {
    let url = search_url(
        "https://tidningar.kb.se/search",
        "1865-01-31",
        "1865-02-01",
        DAGENS_NYHETER_ID,
    )
    .unwrap();

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(url.host_str(), Some("tidningar.kb.se"));
    assert!(pairs.contains(&("q".to_string(), "*".to_string())));
    assert!(pairs.contains(&("from".to_string(), "1865-01-31".to_string())));
    assert!(pairs.contains(&("to".to_string(), "1865-02-01".to_string())));
    assert!(pairs.contains(&("isPartOf.@id".to_string(), DAGENS_NYHETER_ID.to_string())));
}

#[test]
fn test_sanitize_title() {
    assert_eq!(sanitize_title("  DAGENS NYHETER  "), "DAGENS NYHETER");
    assert_eq!(sanitize_title("Göteborgs Handels- och Sjöfartstidning"), "Göteborgs Handels- och Sjöfartstidning");
    assert_eq!(sanitize_title("Aftonbladet: 1865/01"), "Aftonbladet 186501");
    assert_eq!(sanitize_title("?!"), "Unknown");
}

#[test]
fn test_file_name_from_url() {
    assert_eq!(
        file_name_from_url("https://data.kb.se/dark-1/bib1_18650102_0_1_0001.jp2"),
        Some("bib1_18650102_0_1_0001.jp2".to_string())
    );
    assert_eq!(
        file_name_from_url("https://data.kb.se/dark-1/page%20one.jp2"),
        Some("page one.jp2".to_string())
    );
    // An encoded slash must not become a path separator
    assert_eq!(
        file_name_from_url("https://data.kb.se/dark-1/..%2F..%2Fstate.json"),
        Some(".._.._state.json".to_string())
    );
    assert_eq!(file_name_from_url("https://data.kb.se/dark-1/%2E%2E"), None);
    assert_eq!(file_name_from_url("https://data.kb.se/"), None);
    assert_eq!(file_name_from_url("not a url"), None);
}

#[test]
fn test_issue_folder_layout() {
    let issue = NewspaperIssue {
        title: "DAGENS NYHETER".to_string(),
        date: "1865-01-02".to_string(),
        manifest_id: "dark-1".to_string(),
    };
    let folder = issue.folder(std::path::Path::new("kb_newspapers"));
    assert!(folder.ends_with("kb_newspapers/DAGENS NYHETER/1865-01-02"));
}

#[test]
fn test_existing_pages_are_not_downloaded_again() {
    let dir = tempdir().unwrap();
    let config = ScraperConfig {
        download_dir: dir.path().to_path_buf(),
        // Nothing listens here, a real request would fail
        api_base_url: "http://127.0.0.1:9".to_string(),
        retry_count: 1,
        retry_backoff: Duration::ZERO,
        ..ScraperConfig::default()
    };
    let scraper = KbArchiveScraper::new(config).unwrap();

    let page = dir.path().join("DN").join("1865-01-02").join("0001.jp2");
    write_atomic(&page, b"jp2").unwrap();

    scraper
        .download_file("http://127.0.0.1:9/0001.jp2", &page)
        .unwrap();
    assert_eq!(fs::read(&page).unwrap(), b"jp2");
}

// Regression tests - saved search pages with result markup must yield issues
#[test]
fn test_regression_search_pages() -> Result<()> {
    let failures_dir = std::path::Path::new("src/tests/fixtures/failures");
    if !failures_dir.exists() {
        // Nothing captured yet
        return Ok(());
    }

    let mut failures: Vec<String> = Vec::new();
    for entry in fs::read_dir(failures_dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "html") {
            let name = path.file_stem().unwrap().to_string_lossy().to_string();
            println!("Testing regression case: {}", name);

            if let Some(html) = fixtures::load_failure_html(&name) {
                if html.contains("search-result-item") && parse_search_results(&html).is_empty() {
                    failures.push(format!("Still failing: {}", name));
                }
            }
        }
    }
    if !failures.is_empty() {
        return Err(anyhow::anyhow!(failures.join("\n")));
    }

    Ok(())
}
