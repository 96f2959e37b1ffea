//! Day scraper for the KB (Kungliga biblioteket) newspaper archive.
//!
//! A day is scraped by searching `tidningar.kb.se` for the date range, reading
//! the IIIF manifest of every issue found, and downloading each page as JP2
//! into `<download_dir>/<Title>/<YYYY-MM-DD>/`.

use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::executor::{DayScraper, IssueSummary, ScrapeOutput, ScrapeRequest};
use crate::io::{copy_atomic, file_name_from_url, sanitize_title};

const IIIF_PREFIX: &str = "https://data.kb.se/iiif/";

/// An issue listed on a search results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewspaperIssue {
    pub title: String,
    pub date: String,
    pub manifest_id: String,
}

impl NewspaperIssue {
    pub fn folder(&self, download_dir: &Path) -> PathBuf {
        download_dir.join(&self.title).join(&self.date)
    }
}

/// Search page URL for one newspaper and date range.
pub fn search_url(
    base: &str,
    start_date: &str,
    end_date: &str,
    paper_id: &str,
) -> Result<Url, ScrapeError> {
    Url::parse_with_params(
        base,
        &[
            ("q", "*"),
            ("from", start_date),
            ("to", end_date),
            ("isPartOf.@id", paper_id),
        ],
    )
    .map_err(|e| ScrapeError::Other(format!("Invalid search URL {}: {}", base, e)))
}

/// Extract the issues from a search results page.
///
/// Results without a manifest id are skipped.
pub fn parse_search_results(html: &str) -> Vec<NewspaperIssue> {
    let document = Html::parse_document(html);
    let result_selector = Selector::parse("div.search-result-item").unwrap();

    let mut issues = Vec::new();
    for (index, result) in document.select(&result_selector).enumerate() {
        match parse_search_result(&result) {
            Some(issue) => {
                debug!("Result {}: {} - {} ({})", index + 1, issue.title, issue.date, issue.manifest_id);
                issues.push(issue);
            }
            None => warn!("Result {}: no manifest id found, skipping", index + 1),
        }
    }
    issues
}

fn parse_search_result(result: &ElementRef) -> Option<NewspaperIssue> {
    let date_selector = Selector::parse("p.search-result-item-date").unwrap();
    let title_selector = Selector::parse("div.search-result-item-title").unwrap();

    let manifest_id = manifest_id_from_element(result)?;

    let title = result
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .map(|t| sanitize_title(&t))
        .unwrap_or_else(|| "Unknown".to_string());

    let date = result
        .select(&date_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|d| !d.is_empty())
        .or_else(|| {
            let html = result.html();
            date_from_title(&html).or_else(|| date_from_filename(&html))
        })
        .map(|d| d.replace('/', "-"))
        .unwrap_or_else(|| "Unknown_Date".to_string());

    Some(NewspaperIssue {
        title,
        date,
        manifest_id,
    })
}

/// Find the manifest id in the first IIIF image link, preferring `data-src` over `src`.
fn manifest_id_from_element(result: &ElementRef) -> Option<String> {
    let any_selector = Selector::parse("*").unwrap();
    ["data-src", "src"].iter().find_map(|attr| {
        result
            .select(&any_selector)
            .filter_map(|el| el.value().attr(attr))
            .find_map(manifest_id_from_url)
    })
}

/// `https://data.kb.se/iiif/<n>/<manifest-id>/...` -> `<manifest-id>`
pub fn manifest_id_from_url(url: &str) -> Option<String> {
    let rest = url.strip_prefix(IIIF_PREFIX)?;
    let (number, rest) = rest.split_once('/')?;
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let id: String = rest.chars().take_while(|c| *c != '/' && *c != '%').collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Pull the date out of a title tag like `<title>DAGENS NYHETER 1865-01-02 | Tidningar</title>`.
pub fn date_from_title(text: &str) -> Option<String> {
    let start = text.find("<title>")? + "<title>".len();
    let (head, _) = text[start..].split_once('|')?;
    let (name, date) = head.trim_end().rsplit_once(char::is_whitespace)?;
    if name.trim().is_empty() || !is_iso_date(date) {
        return None;
    }
    Some(date.to_string())
}

fn is_iso_date(text: &str) -> bool {
    text.len() == 10
        && text.char_indices().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        })
}

/// Pull a date out of page file names like `bib4345612_18650101_0_11_0001.jp2`.
pub fn date_from_filename(text: &str) -> Option<String> {
    text.match_indices("bib").find_map(|(pos, _)| {
        let rest = &text[pos + 3..];
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        let rest = rest[digits..].strip_prefix('_')?;
        let date = rest.get(..8)?;
        if !date.chars().all(|c| c.is_ascii_digit()) || !rest[8..].starts_with('_') {
            return None;
        }
        Some(format!("{}-{}-{}", &date[..4], &date[4..6], &date[6..8]))
    })
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    items: Vec<Canvas>,
}

#[derive(Debug, Deserialize)]
struct Canvas {
    #[serde(default)]
    items: Vec<AnnotationPage>,
}

#[derive(Debug, Deserialize)]
struct AnnotationPage {
    #[serde(default)]
    items: Vec<Annotation>,
}

#[derive(Debug, Deserialize)]
struct Annotation {
    body: Option<AnnotationBody>,
}

#[derive(Debug, Deserialize)]
struct AnnotationBody {
    id: Option<String>,
}

/// JP2 page URLs listed in an IIIF manifest, in page order.
pub fn parse_manifest(json: &str) -> Result<Vec<String>, ScrapeError> {
    let manifest: Manifest = serde_json::from_str(json)
        .map_err(|e| ScrapeError::Parse(format!("Invalid manifest JSON: {}", e)))?;

    Ok(manifest
        .items
        .into_iter()
        .flat_map(|canvas| canvas.items)
        .flat_map(|page| page.items)
        .filter_map(|annotation| annotation.body.and_then(|b| b.id))
        .filter(|id| id.ends_with(".jp2"))
        .collect())
}

/// Scrapes the KB archive over one HTTP session.
pub struct KbArchiveScraper {
    client: Client,
    config: ScraperConfig,
}

impl KbArchiveScraper {
    pub fn new(config: ScraperConfig) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://tidningar.kb.se/"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn fetch_search_page(
        &self,
        start_date: &str,
        end_date: &str,
        paper_id: &str,
    ) -> Result<String, ScrapeError> {
        let url = search_url(&self.config.search_url, start_date, end_date, paper_id)?;
        info!("Using search URL: {}", url);

        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }

    pub fn fetch_manifest(&self, manifest_id: &str) -> Result<Vec<String>, ScrapeError> {
        let url = format!(
            "{}/{}/manifest",
            self.config.api_base_url.trim_end_matches('/'),
            manifest_id
        );
        info!("Fetching manifest data from: {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .send()?
            .error_for_status()?;
        parse_manifest(&response.text()?)
    }

    /// Download every page of an issue, returning the number of pages on disk.
    pub fn download_issue(
        &self,
        issue: &NewspaperIssue,
        deadline: Instant,
    ) -> Result<usize, ScrapeError> {
        let urls = self.fetch_manifest(&issue.manifest_id)?;
        info!("Found {} JP2 files for {} - {}", urls.len(), issue.title, issue.date);

        if urls.is_empty() {
            return Err(ScrapeError::Parse(format!(
                "No JP2 files in manifest {} for {} - {}",
                issue.manifest_id, issue.title, issue.date
            )));
        }

        let folder = issue.folder(&self.config.download_dir);
        for url in &urls {
            if Instant::now() > deadline {
                return Err(ScrapeError::Timeout(format!(
                    "deadline passed while downloading {} - {}",
                    issue.title, issue.date
                )));
            }

            let url = url.replace("\\\\", "/").replace("\\/", "/");
            let file_name = file_name_from_url(&url)
                .ok_or_else(|| ScrapeError::Parse(format!("No file name in {}", url)))?;
            self.download_file(&url, &folder.join(file_name))?;
        }
        Ok(urls.len())
    }

    /// Fetch one file, skipping it if already present and retrying transient failures.
    pub fn download_file(&self, url: &str, path: &Path) -> Result<(), ScrapeError> {
        if path.exists() {
            debug!("File already exists: {}", path.display());
            return Ok(());
        }

        let attempts = self.config.retry_count.max(1);
        let mut attempt = 1;
        loop {
            match self.try_download(url, path) {
                Ok(bytes) => {
                    debug!("Downloaded {} ({} bytes)", path.display(), bytes);
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    warn!("Retry {}/{} downloading {}: {}", attempt, attempts, url, e);
                    thread::sleep(self.config.retry_backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_download(&self, url: &str, path: &Path) -> Result<u64, ScrapeError> {
        let mut response = self
            .client
            .get(url)
            .header(ACCEPT, "image/jpeg, image/png, image/jp2, */*")
            .send()?
            .error_for_status()?;
        Ok(copy_atomic(path, &mut response)?)
    }

    fn scrape_paper(
        &self,
        request: &ScrapeRequest,
        paper_id: &str,
        output: &mut ScrapeOutput,
        failures: &mut Vec<ScrapeError>,
    ) -> Result<(), ScrapeError> {
        let html = self.fetch_search_page(&request.start_date, &request.end_date, paper_id)?;
        let issues = parse_search_results(&html);
        info!("Found {} newspaper issues for {}", issues.len(), paper_id);

        for issue in issues {
            match self.download_issue(&issue, request.deadline) {
                Ok(pages) => {
                    info!("Successfully downloaded issue: {} - {}", issue.title, issue.date);
                    output.issues.push(IssueSummary {
                        title: issue.title,
                        date: issue.date,
                        pages,
                    });
                }
                Err(e @ ScrapeError::Timeout(_)) => return Err(e),
                Err(e) => {
                    warn!("Failed to download issue: {} - {}: {}", issue.title, issue.date, e);
                    failures.push(e);
                }
            }
        }
        Ok(())
    }
}

impl DayScraper for KbArchiveScraper {
    fn scrape(&mut self, request: &ScrapeRequest) -> Result<ScrapeOutput, ScrapeError> {
        let paper_ids = if request.newspaper_ids.is_empty() {
            self.config.default_paper_ids.clone()
        } else {
            request.newspaper_ids.clone()
        };

        let mut output = ScrapeOutput::default();
        let mut failures = Vec::new();
        for paper_id in &paper_ids {
            self.scrape_paper(request, paper_id, &mut output, &mut failures)?;
        }

        // A day only counts as done when every issue found made it to disk.
        match failures.len() {
            0 => Ok(output),
            count => {
                let first = failures.remove(0);
                let message = format!(
                    "{} of {} issues failed, first: {}",
                    count,
                    count + output.issues.len(),
                    first.message()
                );
                Err(first.with_message(message))
            }
        }
    }
}
