//! Retrying HTTP client shared by every fetch in the pipeline.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{instrument, warn};

use paperdigest_shared::config::FetchConfig;
use paperdigest_shared::error::{PaperdigestError, Result};

/// Statuses worth retrying with exponential backoff.
const RETRYABLE_STATUSES: &[u16] = &[403, 429, 500, 502, 503, 504];

/// Upper bound of the random jitter added to each backoff delay.
const JITTER_MS: u64 = 1000;

/// HTTP client with a bounded retry policy.
///
/// Non-success statuses outside [`RETRYABLE_STATUSES`] abort immediately;
/// timeouts and transport errors retry after a fixed delay.
#[derive(Debug, Clone)]
pub struct PageClient {
    client: reqwest::Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl PageClient {
    /// Build a client from fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PaperdigestError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        })
    }

    /// GET a URL under the retry policy. The response body is unread.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        for attempt in 0..self.max_attempts {
            match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if is_retryable(resp.status()) => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        status = resp.status().as_u16(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retryable status, backing off"
                    );
                    if attempt + 1 < self.max_attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
                Ok(resp) => {
                    return Err(PaperdigestError::fetch(
                        url,
                        format!("HTTP {}", resp.status()),
                    ));
                }
                Err(e) => {
                    let kind = if e.is_timeout() { "timeout" } else { "transport error" };
                    warn!(attempt, error = %e, "{kind}, will retry");
                    if attempt + 1 < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(PaperdigestError::ExhaustedRetries {
            url: url.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// GET a URL and read the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self.get_with_retry(url).await?;
        resp.text()
            .await
            .map_err(|e| PaperdigestError::fetch(url, e.to_string()))
    }

    /// Exponential backoff with jitter: `delay * 2^attempt + rand(0..1s)`,
    /// saturating rather than overflowing at extreme settings.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.retry_delay.as_millis() as u64;
        let scaled = base.saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(scaled.saturating_add(fastrand::u64(0..JITTER_MS)))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(max_attempts: u32) -> FetchConfig {
        FetchConfig {
            user_agent: "paperdigest-test".into(),
            request_timeout_secs: 5,
            max_attempts,
            retry_delay_secs: 0,
        }
    }

    #[tokio::test]
    async fn succeeds_after_retryable_status() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/page"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/page"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = PageClient::new(&test_config(3)).expect("client");
        let body = client
            .get_text(&format!("{}/page", server.uri()))
            .await
            .expect("should recover after 503");
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn non_retryable_status_fails_without_retry() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/missing"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = PageClient::new(&test_config(3)).expect("client");
        let err = client
            .get_with_retry(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[tokio::test]
    async fn backoff_saturates_at_extreme_attempts() {
        let client = PageClient::new(&FetchConfig {
            retry_delay_secs: 2,
            ..test_config(u32::MAX)
        })
        .expect("client");
        assert_eq!(client.backoff_delay(90), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn persistent_server_error_exhausts_retries() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/down"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = PageClient::new(&test_config(2)).expect("client");
        let err = client
            .get_with_retry(&format!("{}/down", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaperdigestError::ExhaustedRetries { attempts: 2, .. }
        ));
    }
}
