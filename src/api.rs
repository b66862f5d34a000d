//! Chat-model calls with retry.
//!
//! The LLM extractor talks to an OpenAI-compatible endpoint through
//! `awful_aj`. Transient failures (rate limits, resets, overloaded servers)
//! are retried here so the discovery loop only ever sees a final answer or a
//! final failure.
//!
//! - [`AskAsync`]: send text, get a response
//! - [`AskFnWrapper`]: `awful_aj::api::ask` behind [`AskAsync`]
//! - [`RetryAsk`]: exponential backoff with jitter around any [`AskAsync`]

use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Async text-in, response-out model call.
pub trait AskAsync {
    type Response;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Retries the wrapped [`AskAsync`] with exponential backoff.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + jitter(0..=max_jitter)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
    max_jitter_ms: u64,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter_ms: 250,
        }
    }

    pub fn with_max_delay(mut self, max_delay: StdDuration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_max_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter_ms = max_jitter.as_millis() as u64;
        self
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms = total_t0.elapsed().as_millis();

                    if attempt > self.max_retries {
                        error!(attempt, max = self.max_retries, elapsed_ms, error = %e, "Model call exhausted retries");
                        return Err(e);
                    }

                    let jitter = match self.max_jitter_ms {
                        0 => 0,
                        max => rng().random_range(0..=max),
                    };
                    let delay = self.backoff(attempt) + StdDuration::from_millis(jitter);
                    warn!(attempt, max = self.max_retries, elapsed_ms, ?delay, error = %e, "Model call failed; backing off");
                    sleep(delay).await;
                }
            }
        }
    }
}

/// `awful_aj::api::ask` bound to a config and chat template.
#[derive(Debug)]
pub struct AskFnWrapper<'a> {
    pub config: &'a AwfulJadeConfig,
    pub template: &'a ChatTemplate,
}

impl AskAsync for AskFnWrapper<'_> {
    type Response = String;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "Model API call failed");
        }
        res
    }
}

/// Send `text` through `template`, retrying up to `retries` times.
#[instrument(level = "info", skip_all, fields(bytes = text.len()))]
pub async fn ask_with_backoff(
    config: &AwfulJadeConfig,
    template: &ChatTemplate,
    text: &str,
    retries: usize,
) -> Result<String, Box<dyn Error>> {
    let t0 = Instant::now();
    let api = RetryAsk::new(AskFnWrapper { config, template }, retries, StdDuration::from_secs(1));
    let res = api.ask(text).await;

    match &res {
        Ok(_) => info!(elapsed_ms = t0.elapsed().as_millis(), "Model call succeeded"),
        Err(e) => error!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "Model call failed"),
    }
    res
}
