//! Rate-limit-aware request execution.
//!
//! Every HTTP call a tenant client issues passes through
//! [`RateLimitStrategy::execute`]: responses other than 429 come back
//! verbatim, a 429 sleeps until the reset timestamp the tenant announced
//! (or a randomised backoff when the headers are unusable) and retries.
//! No attempt cap is imposed here; callers own cancellation.
//!
//! Time is abstracted behind [`Timeline`] so tests control virtual time.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Shortest sleep between retries
pub const MIN_WAIT: Duration = Duration::from_secs(1);

/// Longest sleep between retries
pub const MAX_WAIT: Duration = Duration::from_secs(60);

const LIMIT_HEADER: &str = "X-RateLimit-Limit";
const RESET_HEADER: &str = "X-RateLimit-Reset";

/// Wall-clock abstraction injected into the strategy
#[async_trait]
pub trait Timeline: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the caller for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Timeline backed by the system clock and the tokio timer
pub struct SystemTimeline;

#[async_trait]
impl Timeline for SystemTimeline {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Raw response observed by the strategy before status handling
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: String,
}

impl ApiResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Clamp a tenant-announced wait into the supported window.
///
/// Monotonic: anything at or below [`MIN_WAIT`] maps to [`MIN_WAIT`],
/// anything at or above [`MAX_WAIT`] maps to [`MAX_WAIT`].
pub fn apply_min_max_defaults(duration: Duration) -> Duration {
    duration.clamp(MIN_WAIT, MAX_WAIT)
}

/// Retry/sleep decorator around tenant HTTP calls
pub struct RateLimitStrategy {
    timeline: Arc<dyn Timeline>,
}

impl RateLimitStrategy {
    /// Create a strategy over the given timeline
    pub fn new(timeline: Arc<dyn Timeline>) -> Self {
        Self { timeline }
    }

    /// Create a strategy over the system clock
    pub fn system() -> Self {
        Self::new(Arc::new(SystemTimeline))
    }

    /// Run a request, sleeping and retrying for as long as the tenant
    /// answers 429. Any other response, including transport errors, is
    /// returned verbatim.
    pub async fn execute<F, Fut>(&self, mut request: F) -> Result<ApiResponse>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<ApiResponse>> + Send,
    {
        let mut attempts: u32 = 0;
        loop {
            let response = request().await?;
            if response.status != 429 {
                return Ok(response);
            }

            attempts += 1;
            match extract_rate_limit_headers(&response) {
                Ok((limit, reset_micros)) => {
                    let wait = apply_min_max_defaults(self.duration_until(reset_micros));
                    warn!(
                        limit = %limit,
                        wait_seconds = wait.as_secs(),
                        "Tenant is rate limiting requests, sleeping until reset"
                    );
                    self.timeline.sleep(wait).await;
                }
                Err(reason) => {
                    let (wait, resume_at) = self.generate_sleep_duration(attempts);
                    warn!(
                        %reason,
                        %resume_at,
                        "Tenant is rate limiting requests without usable headers, backing off"
                    );
                    self.timeline.sleep(wait).await;
                }
            }
        }
    }

    fn duration_until(&self, reset_micros: i64) -> Duration {
        let delta_micros = reset_micros - self.timeline.now().timestamp_micros();
        if delta_micros <= 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(delta_micros as u64)
        }
    }

    /// Randomised fallback wait: uniform in `(MIN_WAIT, 2·MIN_WAIT]`, scaled
    /// by `max(1, attempts)`. Also returns the human-readable wall-clock
    /// time at which the request resumes, for the log line.
    fn generate_sleep_duration(&self, attempts: u32) -> (Duration, String) {
        let multiplier = attempts.max(1);
        let jitter_millis = rand::thread_rng().gen_range(1..=MIN_WAIT.as_millis() as u64);
        let wait = (MIN_WAIT + Duration::from_millis(jitter_millis)) * multiplier;

        let resume_at = self.timeline.now() + chrono::Duration::milliseconds(wait.as_millis() as i64);
        (wait, resume_at.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

fn extract_rate_limit_headers(
    response: &ApiResponse,
) -> std::result::Result<(String, i64), String> {
    let limit = response
        .header(LIMIT_HEADER)
        .ok_or_else(|| format!("rate limit header `{LIMIT_HEADER}` not found"))?;
    let reset = response
        .header(RESET_HEADER)
        .ok_or_else(|| format!("rate limit header `{RESET_HEADER}` not found"))?;

    let reset_micros: i64 = reset.trim().parse().map_err(|_| {
        format!("rate limit header `{RESET_HEADER}` value `{reset}` is not a valid unix timestamp")
    })?;

    Ok((limit.to_string(), reset_micros))
}
