use fnd_core::{Error, Result};
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Minimum spacing between two granted requests.
    pub min_interval: Duration,
    /// Total attempts per request, including the first one.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Spaces outgoing requests and retries throttled ones.
///
/// Shared behind an `Arc` by every caller that talks to the same upstream.
/// The lock only guards the slot reservation; callers wait for their slot
/// and perform the request without holding it.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    last_request_at: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            last_request_at: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Waits until at least `min_interval` has passed since the previous grant.
    /// Returns the instant the caller was granted.
    pub async fn acquire(&self) -> Instant {
        let slot = {
            let mut last = self.last_request_at.lock().await;
            let now = Instant::now();
            let slot = match *last {
                Some(previous) => now.max(previous + self.config.min_interval),
                None => now,
            };
            *last = Some(slot);
            slot
        };

        if slot > Instant::now() {
            debug!("Rate limiting: waiting {:?}", slot - Instant::now());
        }
        sleep_until(slot).await;
        slot
    }

    /// Sends the request built by `build`, retrying on 429 and transport errors.
    pub async fn request_with_retry<F>(&self, mut build: F) -> Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let max_attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            self.acquire().await;
            match build().send().await {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    last_error = Some(Error::RateLimited { attempts: attempt });
                    if attempt < max_attempts {
                        let wait = self.config.retry_delay * attempt;
                        warn!(
                            "Rate limit hit, waiting {:?} before retry {}/{}",
                            wait,
                            attempt + 1,
                            max_attempts
                        );
                        sleep(wait).await;
                    }
                }
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => return Err(Error::HttpStatus(response.status().as_u16())),
                Err(e) => {
                    warn!("Request failed (attempt {}/{}): {}", attempt, max_attempts, e);
                    last_error = Some(Error::Http(e));
                    if attempt < max_attempts {
                        sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(Error::RateLimited { attempts: max_attempts }))
    }
}
