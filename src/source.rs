use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tracing::{info, warn};

use crate::cache::DatasetCache;
use crate::parser;
use crate::record::Dataset;

static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^/]+/(?:europe/)?([^?#]*)").unwrap());

const USER_AGENT: &str = concat!("techpays/", env!("CARGO_PKG_VERSION"));

/// Optional filter segments, appended to the base URL in this order.
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub country: Option<String>,
    pub level: Option<String>,
    pub category: Option<String>,
}

impl PageFilter {
    fn segments(&self) -> impl Iterator<Item = &str> {
        [&self.country, &self.level, &self.category]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .map(|s| s.trim_matches('/'))
            .filter(|s| !s.is_empty())
    }
}

pub fn page_url(base: &str, filter: &PageFilter) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for seg in filter.segments() {
        url.push('/');
        url.push_str(seg);
    }
    url
}

/// Path below the region root, e.g. `netherlands/senior` for
/// `https://techpays.eu/europe/netherlands/senior`.
pub fn relative_path(url: &str) -> String {
    PATH_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "europe".to_string())
}

/// Output directory for a page under `root`, and the file stem for its exports.
pub fn output_location(root: &str, url: &str) -> (PathBuf, String) {
    let rel = relative_path(url);
    let stem = rel.rsplit('/').next().unwrap_or(&rel).to_string();
    (PathBuf::from(root).join(&rel), stem)
}

pub fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

pub async fn fetch_html(client: &reqwest::Client, url: &str) -> Result<String> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Downloading {}", url));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = fetch_body(client, url).await;
    pb.finish_and_clear();
    let html = result?;
    info!(url, bytes = html.len(), "fetched page");
    Ok(html)
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String> {
    client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Bad status from {}", url))?
        .text()
        .await
        .with_context(|| format!("Failed to read body of {}", url))
}

/// Cached dataset for `url`, or fetch, parse and remember it. Parse failures
/// are not retried: the same payload would fail again.
pub async fn load_dataset(
    client: &reqwest::Client,
    url: &str,
    cache: Option<&mut dyn DatasetCache>,
) -> Result<Dataset> {
    if let Some(cache) = cache.as_deref() {
        if let Some(ds) = cache.get(url)? {
            info!(url, records = ds.len(), "using cached dataset");
            return Ok(ds);
        }
    }

    let html = fetch_html(client, url).await?;
    parse_and_remember(url, &html, cache)
}

/// Parse a fetched page and store the dataset only once decoding succeeded.
fn parse_and_remember(
    url: &str,
    html: &str,
    cache: Option<&mut dyn DatasetCache>,
) -> Result<Dataset> {
    let dataset = parse_fetched(url, html)?;
    if let Some(cache) = cache {
        if let Err(e) = cache.put(url, &dataset) {
            warn!(url, "failed to cache dataset: {:#}", e);
        }
    }
    Ok(dataset)
}

/// Run the parse core on a page body, labelling failures with the page URL.
pub fn parse_fetched(url: &str, html: &str) -> Result<Dataset> {
    let dataset = parser::parse_page(html)
        .with_context(|| format!("Failed to parse compensation data from {}", url))?;
    info!(url, records = dataset.len(), "decoded compensation list");
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[test]
    fn builds_url_from_filters() {
        let f = PageFilter {
            country: Some("netherlands".into()),
            level: Some("senior".into()),
            category: None,
        };
        assert_eq!(
            page_url("https://techpays.eu/europe/", &f),
            "https://techpays.eu/europe/netherlands/senior"
        );
        assert_eq!(
            page_url("https://techpays.eu/europe", &PageFilter::default()),
            "https://techpays.eu/europe"
        );
    }

    #[test]
    fn output_location_follows_region_path() {
        let (dir, stem) = output_location("out", "https://techpays.eu/europe/netherlands/senior");
        assert_eq!(dir, PathBuf::from("out/netherlands/senior"));
        assert_eq!(stem, "senior");

        let (dir, stem) = output_location(".", "https://techpays.eu/europe/netherlands");
        assert_eq!(dir, PathBuf::from("./netherlands"));
        assert_eq!(stem, "netherlands");
    }

    #[test]
    fn region_root_falls_back() {
        assert_eq!(relative_path("https://techpays.eu/europe"), "europe");
        assert_eq!(relative_path("not a url"), "europe");
    }

    #[test]
    fn parse_failure_names_url() {
        let err = parse_fetched("https://techpays.eu/europe/x", "<html></html>").unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("https://techpays.eu/europe/x"));
        assert!(msg.contains("payload not found"));
    }

    const PAGE: &str = "<script>COMPENSATION_LIST = [\n  {\n    companyName: 'Adyen',\n    baseSalaryNumber: 95000\n  },\n];\n</script>";

    #[tokio::test]
    async fn cached_dataset_skips_fetch() {
        // nothing listens on the discard port, so any request would fail
        let url = "http://127.0.0.1:9/europe/netherlands";
        let cached = parser::parse_page(PAGE).unwrap();
        let mut cache = MemoryCache::new();
        cache.put(url, &cached).unwrap();

        let client = client().unwrap();
        let ds = load_dataset(&client, url, Some(&mut cache as &mut dyn DatasetCache))
            .await
            .unwrap();
        assert_eq!(ds, cached);
    }

    #[tokio::test]
    async fn fetch_failure_without_cache_entry() {
        let url = "http://127.0.0.1:9/europe/netherlands";
        let mut cache = MemoryCache::new();
        let client = client().unwrap();
        let err = load_dataset(&client, url, Some(&mut cache as &mut dyn DatasetCache))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains(url));
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_filled_only_after_decode() {
        let url = "https://techpays.eu/europe/netherlands";
        let mut cache = MemoryCache::new();

        let failed = parse_and_remember(url, "<html></html>", Some(&mut cache as &mut dyn DatasetCache));
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let ds = parse_and_remember(url, PAGE, Some(&mut cache as &mut dyn DatasetCache)).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(cache.get(url).unwrap(), Some(ds));
    }
}
