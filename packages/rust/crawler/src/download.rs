//! Concurrent, validated asset download.
//!
//! Candidates are fetched under a semaphore, validated as decodable images,
//! persisted under a per-document directory and deduplicated by output
//! filename. Failures are logged and reported, never fatal.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

use paperdigest_shared::error::{PaperdigestError, Result};
use paperdigest_shared::progress::ProgressReporter;
use paperdigest_shared::types::{AssetCandidate, DownloadedAsset};

use crate::client::PageClient;

/// Payloads smaller than this are truncated or error pages.
const MIN_PAYLOAD_BYTES: usize = 100;

/// Options for one download run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Root output directory; files land in `<output_dir>/<doc_id>/`.
    pub output_dir: PathBuf,
    /// Maximum concurrent downloads.
    pub concurrency: usize,
}

/// Outcome of a download run: persisted assets in completion order plus one
/// message per dropped candidate.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub assets: Vec<DownloadedAsset>,
    pub failures: Vec<String>,
}

/// Download every candidate, keeping the first-completed asset per output
/// filename.
pub async fn download_all(
    client: &PageClient,
    doc_id: &str,
    candidates: Vec<AssetCandidate>,
    options: &DownloadOptions,
    progress: &dyn ProgressReporter,
) -> DownloadReport {
    let dir = options.output_dir.join(doc_id);
    progress.download_started(candidates.len());

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for candidate in candidates {
        let client = client.clone();
        let dir = dir.clone();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // the semaphore is never closed while tasks run
            let _permit = semaphore.acquire_owned().await.ok();
            let url = candidate.url.clone();
            (url, download_one(&client, candidate, &dir).await)
        });
    }

    let mut report = DownloadReport::default();
    let mut seen_filenames: HashSet<String> = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        let (url, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "download task failed");
                continue;
            }
        };

        match result {
            Ok(asset) => {
                progress.download_advanced(&asset.filename);
                if seen_filenames.insert(asset.filename.clone()) {
                    report.assets.push(asset);
                } else {
                    debug!(filename = %asset.filename, "duplicate filename dropped");
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "asset dropped");
                progress.download_advanced(&url);
                report.failures.push(format!("{url}: {e}"));
            }
        }
    }

    info!(
        assets = report.assets.len(),
        failures = report.failures.len(),
        "downloads complete"
    );
    report
}

/// Fetch, validate, and persist one candidate.
#[instrument(skip_all, fields(url = %candidate.url))]
async fn download_one(
    client: &PageClient,
    candidate: AssetCandidate,
    dir: &Path,
) -> Result<DownloadedAsset> {
    let resp = client.get_with_retry(&candidate.url).await?;
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| PaperdigestError::fetch(&candidate.url, e.to_string()))?;

    if bytes.len() < MIN_PAYLOAD_BYTES {
        return Err(PaperdigestError::validation(format!(
            "payload too small ({} bytes)",
            bytes.len()
        )));
    }

    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| PaperdigestError::validation(format!("not a decodable image: {e}")))?;
    let format = image::guess_format(&bytes)
        .map(format_tag)
        .unwrap_or("unknown");

    let filename = format!("{}_{}", candidate.source.as_str(), url_basename(&candidate.url));
    let path = dir.join(&filename);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PaperdigestError::io(dir, e))?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| PaperdigestError::io(&path, e))?;

    debug!(
        path = %path.display(),
        width = decoded.width(),
        height = decoded.height(),
        format,
        "asset persisted"
    );

    Ok(DownloadedAsset {
        filename,
        path,
        url: candidate.url,
        source: candidate.source,
        width: decoded.width(),
        height: decoded.height(),
        format: format.to_string(),
        size_bytes: bytes.len() as u64,
    })
}

/// PIL-style uppercase tag for the detected format.
fn format_tag(format: image::ImageFormat) -> &'static str {
    match format {
        image::ImageFormat::Png => "PNG",
        image::ImageFormat::Jpeg => "JPEG",
        image::ImageFormat::Gif => "GIF",
        image::ImageFormat::Bmp => "BMP",
        image::ImageFormat::Tiff => "TIFF",
        other => other.extensions_str().first().copied().unwrap_or("unknown"),
    }
}

/// Last path segment of the URL, without query or fragment.
fn url_basename(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "asset".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperdigest_shared::types::AssetSource;
    use paperdigest_shared::{FetchConfig, SilentProgress};

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_fn(32, 32, |x, y| {
            image::Rgba([
                (x * 7 % 256) as u8,
                (y * 13 % 256) as u8,
                ((x ^ y) * 5 % 256) as u8,
                255,
            ])
        });
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    fn test_client() -> PageClient {
        PageClient::new(&FetchConfig {
            user_agent: "paperdigest-test".into(),
            request_timeout_secs: 5,
            max_attempts: 1,
            retry_delay_secs: 0,
        })
        .expect("client")
    }

    fn temp_options(concurrency: usize) -> DownloadOptions {
        DownloadOptions {
            output_dir: std::env::temp_dir()
                .join(format!("paperdigest-test-{}", fastrand::u64(..))),
            concurrency,
        }
    }

    fn candidate(url: String, source: AssetSource) -> AssetCandidate {
        AssetCandidate {
            name: String::new(),
            url,
            source,
        }
    }

    #[tokio::test]
    async fn one_failing_host_does_not_sink_the_batch() {
        let server = wiremock::MockServer::start().await;
        let png = png_bytes();
        assert!(png.len() >= MIN_PAYLOAD_BYTES);

        for i in 0..9 {
            wiremock::Mock::given(wiremock::matchers::method("GET"))
                .and(wiremock::matchers::path(format!("/img/f{i}.png")))
                .respond_with(
                    wiremock::ResponseTemplate::new(200).set_body_bytes(png.clone()),
                )
                .mount(&server)
                .await;
        }
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/img/broken.png"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut candidates: Vec<AssetCandidate> = (0..9)
            .map(|i| {
                candidate(
                    format!("{}/img/f{i}.png", server.uri()),
                    AssetSource::Primary,
                )
            })
            .collect();
        candidates.push(candidate(
            format!("{}/img/broken.png", server.uri()),
            AssetSource::Primary,
        ));

        let report = download_all(
            &test_client(),
            "doc1",
            candidates,
            &temp_options(4),
            &SilentProgress,
        )
        .await;

        assert_eq!(report.assets.len(), 9);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("broken.png"));
        for asset in &report.assets {
            assert!(asset.path.exists());
            assert_eq!(asset.width, 32);
            assert_eq!(asset.height, 32);
            assert_eq!(asset.format, "PNG");
        }
    }

    #[tokio::test]
    async fn duplicate_basenames_keep_first_completed() {
        let server = wiremock::MockServer::start().await;
        let png = png_bytes();
        for prefix in ["a", "b"] {
            wiremock::Mock::given(wiremock::matchers::method("GET"))
                .and(wiremock::matchers::path(format!("/{prefix}/fig1.png")))
                .respond_with(
                    wiremock::ResponseTemplate::new(200).set_body_bytes(png.clone()),
                )
                .mount(&server)
                .await;
        }

        let candidates = vec![
            candidate(format!("{}/a/fig1.png", server.uri()), AssetSource::Primary),
            candidate(format!("{}/b/fig1.png", server.uri()), AssetSource::Primary),
        ];

        let report = download_all(
            &test_client(),
            "doc1",
            candidates,
            &temp_options(1),
            &SilentProgress,
        )
        .await;

        assert_eq!(report.assets.len(), 1);
        assert_eq!(report.assets[0].filename, "primary_fig1.png");
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn undecodable_payload_is_dropped_without_a_file() {
        let server = wiremock::MockServer::start().await;
        let not_an_image = "this is definitely not image data ".repeat(10);
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/bad.png"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(not_an_image))
            .mount(&server)
            .await;

        let options = temp_options(1);
        let report = download_all(
            &test_client(),
            "doc1",
            vec![candidate(
                format!("{}/bad.png", server.uri()),
                AssetSource::Primary,
            )],
            &options,
            &SilentProgress,
        )
        .await;

        assert!(report.assets.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("not a decodable image"));
        assert!(!options.output_dir.join("doc1").join("primary_bad.png").exists());
    }

    #[tokio::test]
    async fn tiny_payload_is_rejected() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/tiny.png"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(vec![0u8; 10]))
            .mount(&server)
            .await;

        let report = download_all(
            &test_client(),
            "doc1",
            vec![candidate(
                format!("{}/tiny.png", server.uri()),
                AssetSource::Primary,
            )],
            &temp_options(1),
            &SilentProgress,
        )
        .await;

        assert!(report.assets.is_empty());
        assert!(report.failures[0].contains("payload too small"));
    }

    #[tokio::test]
    async fn filenames_carry_the_source_tag() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/media/plot.png"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_bytes(png_bytes()),
            )
            .mount(&server)
            .await;

        let report = download_all(
            &test_client(),
            "2401.12345v1",
            vec![candidate(
                format!("{}/media/plot.png", server.uri()),
                AssetSource::Github,
            )],
            &temp_options(1),
            &SilentProgress,
        )
        .await;

        assert_eq!(report.assets.len(), 1);
        let asset = &report.assets[0];
        assert_eq!(asset.filename, "github_plot.png");
        assert!(asset.path.ends_with("2401.12345v1/github_plot.png"));
        assert_eq!(asset.size_bytes, png_bytes().len() as u64);
    }
}
