//! Two-category asset discovery.
//!
//! The primary pass scans the streamed document for image references and for
//! candidate github/project links. The frontier then visits at most one page
//! per category, harvesting images through the heavier noise filter and
//! cross-discovering the opposite category's link.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use paperdigest_shared::error::{PaperdigestError, Result};
use paperdigest_shared::progress::ProgressReporter;
use paperdigest_shared::types::{AssetCandidate, AssetSource};

use crate::client::PageClient;
use crate::filter::{is_supported_image_path, should_skip_asset};

static IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["'][^>]*>"#).expect("img tag regex")
});
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a[^>]+href=["']([^"']+)["'][^>]*>"#).expect("anchor tag regex")
});

/// Scan window high-water mark.
const MAX_BUFFER_BYTES: usize = 100_000;

/// Bytes kept when the window is trimmed; preserves tags split across chunks.
const KEPT_TAIL_BYTES: usize = 50_000;

/// Pause between frontier rounds.
const FRONTIER_PAUSE: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Frontier
// ---------------------------------------------------------------------------

/// The two linked-page categories the crawl follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCategory {
    Github,
    Project,
}

impl LinkCategory {
    fn opposite(self) -> Self {
        match self {
            Self::Github => Self::Project,
            Self::Project => Self::Github,
        }
    }

    fn source(self) -> AssetSource {
        match self {
            Self::Github => AssetSource::Github,
            Self::Project => AssetSource::Project,
        }
    }
}

/// Lifecycle of one frontier category.
///
/// First write wins: only an `Empty` slot accepts a URL, so later discoveries
/// for an already-filled category are ignored. `Visited` is terminal, reached
/// whether the fetch succeeded or not.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FrontierSlot {
    #[default]
    Empty,
    Pending(String),
    Visited,
}

impl FrontierSlot {
    /// Record a discovered URL. Returns whether the slot accepted it.
    fn offer(&mut self, url: String) -> bool {
        if matches!(self, Self::Empty) {
            *self = Self::Pending(url);
            true
        } else {
            false
        }
    }

    fn pending_url(&self) -> Option<&str> {
        match self {
            Self::Pending(url) => Some(url),
            _ => None,
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    fn visit(&mut self) {
        *self = Self::Visited;
    }
}

/// One slot per category.
#[derive(Debug, Default)]
pub struct Frontier {
    pub github: FrontierSlot,
    pub project: FrontierSlot,
}

impl Frontier {
    fn slot_mut(&mut self, category: LinkCategory) -> &mut FrontierSlot {
        match category {
            LinkCategory::Github => &mut self.github,
            LinkCategory::Project => &mut self.project,
        }
    }

    fn slot(&self, category: LinkCategory) -> &FrontierSlot {
        match category {
            LinkCategory::Github => &self.github,
            LinkCategory::Project => &self.project,
        }
    }

    fn has_pending(&self) -> bool {
        self.github.is_pending() || self.project.is_pending()
    }
}

// ---------------------------------------------------------------------------
// Primary scan
// ---------------------------------------------------------------------------

/// Incremental scanner fed by the document stream.
///
/// Keeps a bounded window of recent text so tags split across chunk
/// boundaries are still matched once complete. Only accepted URLs enter the
/// dedup set, so a string rejected in one role (say a relative href) can
/// still be recorded later in the other.
pub struct PrimaryScan {
    doc_id: String,
    base_url: String,
    buffer: String,
    seen_urls: HashSet<String>,
    candidates: Vec<AssetCandidate>,
    frontier: Frontier,
    github_url: Option<String>,
    project_url: Option<String>,
}

impl PrimaryScan {
    pub fn new(doc_id: &str, base_url: &str) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            base_url: base_url.to_string(),
            buffer: String::new(),
            seen_urls: HashSet::new(),
            candidates: Vec::new(),
            frontier: Frontier::default(),
            github_url: None,
            project_url: None,
        }
    }

    /// Feed one decoded chunk of the document.
    pub fn push_chunk(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        self.scan_window();

        if self.buffer.len() > MAX_BUFFER_BYTES {
            let mut cut = self.buffer.len() - KEPT_TAIL_BYTES;
            while !self.buffer.is_char_boundary(cut) {
                cut += 1;
            }
            self.buffer.drain(..cut);
        }
    }

    fn scan_window(&mut self) {
        let images: Vec<String> = IMG_RE
            .captures_iter(&self.buffer)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect();
        for src in images {
            self.record_image(&src);
        }

        let links: Vec<String> = LINK_RE
            .captures_iter(&self.buffer)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect();
        for href in links {
            self.record_link(&href);
        }
    }

    fn record_image(&mut self, src: &str) {
        if !is_supported_image_path(src) {
            return;
        }
        if !self.seen_urls.insert(src.to_string()) {
            return;
        }
        let Some(url) = absolutize(&self.base_url, src) else {
            return;
        };
        debug!(url = %url, "image candidate");
        self.candidates.push(AssetCandidate {
            url,
            name: candidate_name(src),
            source: AssetSource::Primary,
        });
    }

    fn record_link(&mut self, href: &str) {
        let Some(category) = classify_link(href, &self.doc_id) else {
            return;
        };
        if !self.seen_urls.insert(href.to_string()) {
            return;
        }
        self.offer(category, href);
    }

    fn offer(&mut self, category: LinkCategory, url: &str) {
        if self.frontier.slot_mut(category).offer(url.to_string()) {
            info!(?category, url, "linked page discovered");
            match category {
                LinkCategory::Github => self.github_url = Some(url.to_string()),
                LinkCategory::Project => self.project_url = Some(url.to_string()),
            }
        }
    }

    /// Number of candidates recorded so far.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Consume the scan, leaving the frontier ready for resolution.
    pub fn finish(self) -> CrawlState {
        CrawlState {
            doc_id: self.doc_id,
            candidates: self.candidates,
            frontier: self.frontier,
            github_url: self.github_url,
            project_url: self.project_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Document stream fetch
// ---------------------------------------------------------------------------

/// Stream the document at `url`, feeding `scan` chunk by chunk.
///
/// Returns the full accumulated text for the section tree builder. Chunks are
/// decoded lossily, so a multi-byte character split across chunks may degrade
/// to replacement characters.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_document(
    client: &PageClient,
    url: &str,
    scan: &mut PrimaryScan,
    progress: &dyn ProgressReporter,
) -> Result<String> {
    let mut response = client.get_with_retry(url).await?;
    progress.stream_started(response.content_length());

    let mut full_text = String::new();
    while let Some(bytes) = response
        .chunk()
        .await
        .map_err(|e| PaperdigestError::fetch(url, e.to_string()))?
    {
        let text = String::from_utf8_lossy(&bytes);
        full_text.push_str(&text);
        scan.push_chunk(&text);
        progress.stream_advanced(bytes.len() as u64);
    }

    info!(
        bytes = full_text.len(),
        candidates = scan.candidate_count(),
        "document streamed"
    );
    Ok(full_text)
}

// ---------------------------------------------------------------------------
// Frontier resolution
// ---------------------------------------------------------------------------

/// Candidates plus frontier state carried from the primary scan into
/// frontier resolution.
pub struct CrawlState {
    doc_id: String,
    candidates: Vec<AssetCandidate>,
    frontier: Frontier,
    github_url: Option<String>,
    project_url: Option<String>,
}

impl CrawlState {
    /// Turn the state into an outcome without visiting pending slots.
    pub fn into_outcome(self) -> CrawlOutcome {
        CrawlOutcome {
            candidates: self.candidates,
            github_url: self.github_url,
            project_url: self.project_url,
        }
    }
}

/// Final result of the discovery crawl.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// All discovered asset candidates, primary first.
    pub candidates: Vec<AssetCandidate>,
    /// Resolved repository link, when one was discovered.
    pub github_url: Option<String>,
    /// Resolved project-page link, when one was discovered.
    pub project_url: Option<String>,
}

/// Visit every pending frontier slot until none remain.
///
/// Each round fetches a pending page once, harvests its images through the
/// noise filter, marks the slot `Visited`, and offers the first opposite-
/// category link on that page to the (still empty) opposite slot. A failed
/// fetch is logged and the slot still becomes `Visited`.
pub async fn resolve_frontier(client: &PageClient, state: CrawlState) -> CrawlOutcome {
    let CrawlState {
        doc_id,
        mut candidates,
        mut frontier,
        mut github_url,
        mut project_url,
    } = state;

    while frontier.has_pending() {
        for category in [LinkCategory::Github, LinkCategory::Project] {
            let Some(url) = frontier.slot(category).pending_url().map(str::to_string) else {
                continue;
            };

            info!(?category, url = %url, "visiting linked page");
            match client.get_text(&url).await {
                Ok(body) => {
                    let found = linked_page_images(&body, &url, category.source());
                    info!(?category, images = found.len(), "linked page harvested");
                    candidates.extend(found);
                    frontier.slot_mut(category).visit();

                    let opposite = category.opposite();
                    if let Some(link) = find_category_link(&body, &url, &doc_id, opposite) {
                        if frontier.slot_mut(opposite).offer(link.clone()) {
                            info!(category = ?opposite, url = %link, "cross-discovered link");
                            match opposite {
                                LinkCategory::Github => github_url = Some(link),
                                LinkCategory::Project => project_url = Some(link),
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(?category, url = %url, error = %e, "linked page fetch failed");
                    frontier.slot_mut(category).visit();
                }
            }
        }

        tokio::time::sleep(FRONTIER_PAUSE).await;
    }

    CrawlOutcome {
        candidates,
        github_url,
        project_url,
    }
}

/// Extract noise-filtered image candidates from a linked page.
fn linked_page_images(body: &str, base_url: &str, source: AssetSource) -> Vec<AssetCandidate> {
    let mut found = Vec::new();
    for caps in IMG_RE.captures_iter(body) {
        let Some(src) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if !is_supported_image_path(src) || should_skip_asset(src) {
            continue;
        }
        let Some(url) = absolutize(base_url, src) else {
            continue;
        };
        found.push(AssetCandidate {
            name: candidate_name(src),
            url,
            source,
        });
    }
    found
}

/// First link of the wanted category on a linked page, absolutized.
fn find_category_link(
    body: &str,
    page_url: &str,
    doc_id: &str,
    wanted: LinkCategory,
) -> Option<String> {
    for caps in LINK_RE.captures_iter(body) {
        let Some(href) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if classify_link(href, doc_id) == Some(wanted) {
            return absolutize(page_url, href);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

/// Classify an anchor href as a followable linked page.
///
/// Rejects the paper's own anchors, LaTeXML artifacts, arXiv-internal links
/// and relative URLs; of the rest, `github.com` URLs are repository links and
/// everything else counts as a project page.
fn classify_link(href: &str, doc_id: &str) -> Option<LinkCategory> {
    if href.contains(doc_id) || href.contains("LaTeX") || href.contains("arxiv") {
        return None;
    }
    if !is_absolute_url(href) {
        return None;
    }

    if href.to_lowercase().contains("github.com") {
        Some(LinkCategory::Github)
    } else {
        Some(LinkCategory::Project)
    }
}

/// A URL is absolute when it has both a scheme and a host.
fn is_absolute_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| u.has_host())
}

/// Resolve `href` against `base` treated as a directory.
/// Absolute hrefs come back unchanged.
fn absolutize(base: &str, href: &str) -> Option<String> {
    let mut dir = base.trim_end_matches('/').to_string();
    dir.push('/');
    let joined = Url::parse(&dir).ok()?.join(href).ok()?;
    Some(joined.to_string())
}

/// Basename of the URL path minus its extension.
fn candidate_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let base = path.rsplit('/').next().unwrap_or(path);
    match base.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperdigest_shared::SilentProgress;

    const DOC_ID: &str = "2401.12345v1";
    const BASE: &str = "https://arxiv.org/html/2401.12345v1";

    #[test]
    fn primary_scan_collects_supported_images() {
        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        scan.push_chunk(r#"<img src="x/fig1.png"> <img src="x/data.csv"> <img src="x/fig2.jpg">"#);

        let state = scan.finish();
        let urls: Vec<&str> = state.candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://arxiv.org/html/2401.12345v1/x/fig1.png",
                "https://arxiv.org/html/2401.12345v1/x/fig2.jpg",
            ]
        );
        assert_eq!(state.candidates[0].name, "fig1");
        assert_eq!(state.candidates[0].source, AssetSource::Primary);
    }

    #[test]
    fn primary_scan_skips_noise_filter() {
        // favicon passes the primary pass; only linked pages filter it out
        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        scan.push_chunk(r#"<img src="assets/favicon.png">"#);
        assert_eq!(scan.candidate_count(), 1);
    }

    #[test]
    fn tag_split_across_chunks_is_still_matched() {
        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        scan.push_chunk(r#"<p>text</p><img src="figs/plo"#);
        assert_eq!(scan.candidate_count(), 0);
        scan.push_chunk(r#"t1.png"> more"#);
        assert_eq!(scan.candidate_count(), 1);
        // rescans of the window must not duplicate it
        scan.push_chunk("<p>tail</p>");
        assert_eq!(scan.candidate_count(), 1);
    }

    #[test]
    fn rejected_link_sighting_keeps_the_image_collectable() {
        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        scan.push_chunk(r#"<a href="figs/f1.png">figure link</a>"#);
        scan.push_chunk(r#"<img src="figs/f1.png">"#);

        let state = scan.finish();
        assert_eq!(state.candidates.len(), 1);
        assert!(state.candidates[0].url.ends_with("figs/f1.png"));
    }

    #[test]
    fn unsupported_image_sighting_keeps_the_link_followable() {
        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        scan.push_chunk(
            r#"<img src="https://github.com/org/x"> <a href="https://github.com/org/x">code</a>"#,
        );

        let state = scan.finish();
        assert!(state.candidates.is_empty());
        assert_eq!(
            state.frontier.github,
            FrontierSlot::Pending("https://github.com/org/x".into())
        );
    }

    #[test]
    fn first_seen_github_link_wins() {
        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        scan.push_chunk(r#"<a href="https://github.com/org/x">code</a>"#);
        scan.push_chunk(r#"<a href="https://github.com/org/y">mirror</a>"#);

        let state = scan.finish();
        assert_eq!(
            state.frontier.github,
            FrontierSlot::Pending("https://github.com/org/x".into())
        );
        assert_eq!(state.github_url.as_deref(), Some("https://github.com/org/x"));
    }

    #[test]
    fn own_anchors_and_arxiv_links_are_not_frontier() {
        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        scan.push_chunk(&format!(
            r##"<a href="https://arxiv.org/abs/{DOC_ID}">abs</a>
               <a href="#S1.{DOC_ID}">sec</a>
               <a href="https://example.com/LaTeXML">gen</a>
               <a href="relative/page.html">rel</a>"##
        ));

        let state = scan.finish();
        assert_eq!(state.frontier.github, FrontierSlot::Empty);
        assert_eq!(state.frontier.project, FrontierSlot::Empty);
    }

    #[test]
    fn non_github_absolute_link_becomes_project() {
        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        scan.push_chunk(r#"<a href="https://project-page.example.com/demo">demo</a>"#);

        let state = scan.finish();
        assert_eq!(
            state.frontier.project,
            FrontierSlot::Pending("https://project-page.example.com/demo".into())
        );
        assert!(state.github_url.is_none());
    }

    #[test]
    fn window_trim_keeps_tail_within_bounds() {
        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        let filler = "x".repeat(40_000);
        for _ in 0..5 {
            scan.push_chunk(&filler);
        }
        assert!(scan.buffer.len() <= MAX_BUFFER_BYTES);
    }

    #[test]
    fn candidate_names_drop_extension_only() {
        assert_eq!(candidate_name("x/fig.1.png"), "fig.1");
        assert_eq!(candidate_name("https://h.org/a/plot.png?v=2"), "plot");
        assert_eq!(candidate_name("noext"), "noext");
    }

    #[tokio::test]
    async fn fetch_document_returns_full_text_and_feeds_scan() {
        let server = wiremock::MockServer::start().await;
        let body = r#"<html><body><img src="figs/a.png"><p>hello</p></body></html>"#;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/html/doc1"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = PageClient::new(&test_fetch_config()).expect("client");
        let url = format!("{}/html/doc1", server.uri());
        let mut scan = PrimaryScan::new("doc1", &url);
        let text = fetch_document(&client, &url, &mut scan, &SilentProgress)
            .await
            .expect("fetch");

        assert_eq!(text, body);
        assert_eq!(scan.candidate_count(), 1);
    }

    #[tokio::test]
    async fn frontier_visits_pages_and_cross_discovers() {
        let server = wiremock::MockServer::start().await;

        // github page links to a project page; both serve one usable image
        let github_body = format!(
            r#"<img src="figs/results_grid.png">
               <img src="logo.png">
               <a href="{0}/project">project</a>"#,
            server.uri()
        );
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/repo"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(github_body))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/project"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(r#"<img src="figs/demo_frame.png">"#),
            )
            .mount(&server)
            .await;

        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        // wiremock URLs contain no "github.com", so seed the slot directly
        let repo_url = format!("{}/repo", server.uri());
        scan.frontier.github = FrontierSlot::Pending(repo_url.clone());
        scan.github_url = Some(repo_url);

        let client = PageClient::new(&test_fetch_config()).expect("client");
        let outcome = resolve_frontier(&client, scan.finish()).await;

        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].source, AssetSource::Github);
        assert!(outcome.candidates[0].url.ends_with("figs/results_grid.png"));
        assert_eq!(outcome.candidates[1].source, AssetSource::Project);
        assert!(outcome.project_url.as_deref().unwrap().ends_with("/project"));
    }

    #[tokio::test]
    async fn failed_frontier_fetch_still_settles_slot() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/gone"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut scan = PrimaryScan::new(DOC_ID, BASE);
        scan.frontier.project = FrontierSlot::Pending(format!("{}/gone", server.uri()));

        let client = PageClient::new(&test_fetch_config()).expect("client");
        let outcome = resolve_frontier(&client, scan.finish()).await;
        assert!(outcome.candidates.is_empty());
    }

    fn test_fetch_config() -> paperdigest_shared::FetchConfig {
        paperdigest_shared::FetchConfig {
            user_agent: "paperdigest-test".into(),
            request_timeout_secs: 5,
            max_attempts: 1,
            retry_delay_secs: 0,
        }
    }
}
