//! End-to-end ingestion pipeline.
//!
//! Drives one paper through stream fetch + primary scan, section tree
//! build, keyword-guided section extraction, frontier resolution and asset
//! download. Batch ingestion runs papers sequentially; one abandoned
//! document never sinks the rest.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use paperdigest_crawler::{
    download_all, fetch_document, resolve_frontier, DownloadOptions, PageClient, PrimaryScan,
};
use paperdigest_parser::{
    collect_section_text, collect_titles, find_section_by_path, parse_document,
};
use paperdigest_shared::config::{expand_home, AppConfig, FetchConfig};
use paperdigest_shared::error::{PaperdigestError, Result};
use paperdigest_shared::progress::ProgressReporter;
use paperdigest_shared::types::{DownloadedAsset, Paper, SectionNode};

use crate::keywords::{KeywordRequest, KeywordSource};

/// Keyword-suggestion rounds before a document is abandoned.
const MAX_KEYWORD_ATTEMPTS: u32 = 3;

/// The introduction is always located by this fixed path.
const INTRODUCTION_PATH: &[&str] = &["introduction"];

// ---------------------------------------------------------------------------
// Config and result types
// ---------------------------------------------------------------------------

/// Configuration for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Root output directory; per-paper files land in `<output_dir>/<id>/`.
    pub output_dir: PathBuf,
    /// Concurrent asset downloads.
    pub download_concurrency: usize,
    /// HTTP fetch settings.
    pub fetch: FetchConfig,
    /// Skip frontier fetches and asset downloads.
    pub skip_assets: bool,
}

impl From<&AppConfig> for IngestConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: expand_home(&config.defaults.output_dir),
            download_concurrency: config.defaults.download_concurrency,
            fetch: FetchConfig::from(config),
            skip_assets: false,
        }
    }
}

/// Extracted body text per target section. Empty strings mark sections that
/// could not be located.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SectionExtracts {
    pub introduction: String,
    pub method: String,
    pub conclusion: String,
}

/// Report for one ingested paper.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub paper_id: String,
    pub title: String,
    pub sections: SectionExtracts,
    /// Repository link found during the crawl, if any.
    pub github_url: Option<String>,
    /// Project-page link found during the crawl, if any.
    pub project_url: Option<String>,
    /// Persisted assets, in download-completion order.
    pub assets: Vec<DownloadedAsset>,
    /// Non-fatal per-asset failures.
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: f64,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub reports: Vec<IngestReport>,
    /// `(paper id, error)` per abandoned document.
    pub errors: Vec<(String, String)>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Ingest a single paper end to end.
#[instrument(skip_all, fields(paper = %paper.id))]
pub async fn ingest_paper(
    paper: &Paper,
    config: &IngestConfig,
    keywords: &dyn KeywordSource,
    progress: &dyn ProgressReporter,
) -> Result<IngestReport> {
    let started = Instant::now();
    let html_url = paper
        .links
        .html
        .as_deref()
        .ok_or_else(|| PaperdigestError::config(format!("paper {} has no HTML link", paper.id)))?;

    let client = PageClient::new(&config.fetch)?;

    // --- Phase 1: stream the document, scanning for assets and links ---
    progress.phase("fetch");
    let mut scan = PrimaryScan::new(&paper.id, html_url);
    let html = fetch_document(&client, html_url, &mut scan, progress).await?;

    // --- Phase 2: build the section tree ---
    progress.phase("parse");
    let parsed = parse_document(&html)?;
    let title = parsed.title.clone().unwrap_or_else(|| paper.title.clone());

    // --- Phase 3: keyword-guided section extraction ---
    progress.phase("extract");
    let sections = extract_sections(&parsed.root, &title, keywords)?;

    // --- Phase 4 + 5: linked-page crawl, then downloads ---
    let (outcome, assets, errors) = if config.skip_assets {
        info!("asset crawl skipped");
        (scan.finish().into_outcome(), Vec::new(), Vec::new())
    } else {
        progress.phase("crawl");
        let outcome = resolve_frontier(&client, scan.finish()).await;

        progress.phase("download");
        let options = DownloadOptions {
            output_dir: config.output_dir.clone(),
            concurrency: config.download_concurrency,
        };
        let downloads =
            download_all(&client, &paper.id, outcome.candidates.clone(), &options, progress).await;
        (outcome, downloads.assets, downloads.failures)
    };

    let report = IngestReport {
        paper_id: paper.id.clone(),
        title,
        sections,
        github_url: outcome.github_url,
        project_url: outcome.project_url,
        assets,
        errors,
        completed_at: Utc::now(),
        duration_secs: started.elapsed().as_secs_f64(),
    };

    info!(
        assets = report.assets.len(),
        asset_errors = report.errors.len(),
        duration_secs = report.duration_secs,
        "paper ingested"
    );
    progress.finished();
    Ok(report)
}

/// Ingest papers sequentially, recording abandoned documents instead of
/// aborting the batch.
pub async fn ingest_batch(
    papers: &[Paper],
    config: &IngestConfig,
    keywords: &dyn KeywordSource,
    progress: &dyn ProgressReporter,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for paper in papers {
        info!(paper = %paper.id, "ingesting");
        match ingest_paper(paper, config, keywords, progress).await {
            Ok(report) => outcome.reports.push(report),
            Err(e) => {
                warn!(paper = %paper.id, error = %e, "paper abandoned");
                outcome.errors.push((paper.id.clone(), e.to_string()));
            }
        }
    }

    info!(
        ok = outcome.reports.len(),
        failed = outcome.errors.len(),
        "batch complete"
    );
    outcome
}

// ---------------------------------------------------------------------------
// Section extraction
// ---------------------------------------------------------------------------

/// Run up to [`MAX_KEYWORD_ATTEMPTS`] suggestion rounds against the tree.
///
/// Early rounds require all three targets non-empty; the final round
/// tolerates a missing method. The introduction is always resolved via the
/// fixed path. A document whose introduction or conclusion is still empty
/// after the final round is abandoned.
fn extract_sections(
    root: &SectionNode,
    title: &str,
    keywords: &dyn KeywordSource,
) -> Result<SectionExtracts> {
    let request = KeywordRequest {
        title: title.to_string(),
        section_titles: collect_titles(&root.subsections),
    };

    let mut last = SectionExtracts::default();
    for attempt in 1..=MAX_KEYWORD_ATTEMPTS {
        let suggestion = match keywords.suggest(&request) {
            Ok(s) => s,
            Err(e) => {
                warn!(attempt, error = %e, "keyword suggestion failed");
                continue;
            }
        };

        let extracts = SectionExtracts {
            introduction: collect_by_path(root, INTRODUCTION_PATH),
            method: collect_by_path(root, &suggestion.method),
            conclusion: collect_by_path(root, &suggestion.conclusion),
        };

        if !extracts.introduction.is_empty() && !extracts.conclusion.is_empty() {
            if !extracts.method.is_empty() {
                return Ok(extracts);
            }
            if attempt == MAX_KEYWORD_ATTEMPTS {
                warn!("method section still empty after final attempt");
                return Ok(extracts);
            }
        }

        info!(
            attempt,
            introduction = !extracts.introduction.is_empty(),
            method = !extracts.method.is_empty(),
            conclusion = !extracts.conclusion.is_empty(),
            "extraction attempt incomplete"
        );
        last = extracts;
    }

    let missing = if last.introduction.is_empty() {
        "introduction"
    } else {
        "conclusion"
    };
    Err(PaperdigestError::section_not_found(missing))
}

fn collect_by_path<S: AsRef<str>>(root: &SectionNode, path: &[S]) -> String {
    find_section_by_path(&root.subsections, path)
        .map(collect_section_text)
        .unwrap_or_default()
}
