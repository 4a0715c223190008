//! Page fetching with bounded retries and scoped browser sessions.
//!
//! # Architecture
//!
//! - [`PageFetcher`]: one navigation attempt against a URL
//! - [`FetcherFactory`]: opens a fresh [`FetchSession`] per source run
//! - [`FetchSession`]: wraps a fetcher with the retry policy and releases the
//!   underlying session exactly once, on `release()` or on drop
//! - [`HttpBrowser`]: the production fetcher, either a direct desktop-browser
//!   HTTP client or a remote headless browser exposing a `/content` endpoint
//!
//! # Retry Strategy
//!
//! - Up to `attempts` navigations per URL (3 by default)
//! - Fixed delay between attempts (2 seconds by default)
//! - Only transport errors and 5xx responses are retried; a 4xx answer
//!   gives up on the URL immediately
//! - After the last failed attempt the URL is reported as unavailable
//!   (`None`); callers skip it and carry on

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Desktop Chrome user agent presented to portals.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("render endpoint error (status {status}): {message}")]
    Render { status: u16, message: String },
    #[error("could not open browser session: {0}")]
    Session(String),
}

impl FetchError {
    /// Whether another attempt could succeed. Client errors (4xx) and a
    /// closed session are final; transport failures and 5xx are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status { status, .. } | FetchError::Render { status, .. } => *status >= 500,
            FetchError::Session(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// A single navigation capability.
pub trait PageFetcher {
    /// Load `url` once and return its rendered HTML.
    async fn get(&mut self, url: &str) -> Result<String, FetchError>;

    /// Tear down whatever the fetcher holds (browser process, connections).
    fn close(&mut self) {}
}

/// Opens one fetch session per source run.
pub trait FetcherFactory {
    type Fetcher: PageFetcher;

    fn open(&self) -> Result<FetchSession<Self::Fetcher>, FetchError>;
}

/// How many times a navigation is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// A fetcher bound to one source run.
///
/// Dropping the session releases it if `release()` was not called, so every
/// exit path (early return, `?`, panic unwind) tears the browser down once.
pub struct FetchSession<T: PageFetcher> {
    inner: T,
    policy: RetryPolicy,
    released: bool,
}

impl<T: PageFetcher> FetchSession<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            released: false,
        }
    }

    /// Fetch `url`, retrying transient failures per the session's policy.
    ///
    /// Returns `None` once every attempt has failed.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&mut self, url: &str) -> Option<String> {
        let total_t0 = Instant::now();
        let attempts = self.policy.attempts.max(1);

        for attempt in 1..=attempts {
            match self.inner.get(url).await {
                Ok(html) => {
                    debug!(attempt, bytes = html.len(), "Page loaded");
                    return Some(html);
                }
                Err(e) if !e.is_retryable() => {
                    warn!(attempt, error = %e, "get {url} failed; not retrying");
                    return None;
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max = attempts,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        error = %e,
                        "get {url} failed"
                    );
                    if attempt < attempts {
                        sleep(self.policy.delay).await;
                    }
                }
            }
        }

        warn!(%url, attempts, "Giving up on URL after exhausting retries");
        None
    }

    /// Release the underlying session. Further calls are no-ops.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.inner.close();
            debug!("Fetch session released");
        }
    }
}

impl<T: PageFetcher> Drop for FetchSession<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: PageFetcher> fmt::Debug for FetchSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchSession")
            .field("policy", &self.policy)
            .field("released", &self.released)
            .finish()
    }
}

/// Browser presentation and timeout settings.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Hide `navigator.webdriver` and similar automation markers.
    pub suppress_automation: bool,
    pub page_load_timeout: Duration,
    pub script_timeout: Duration,
    /// Base URL of a headless browser service with a `/content` endpoint.
    /// When absent pages are fetched directly over HTTP.
    pub render_endpoint: Option<String>,
    pub render_token: Option<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: DESKTOP_USER_AGENT.to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            suppress_automation: true,
            page_load_timeout: Duration::from_secs(30),
            script_timeout: Duration::from_secs(30),
            render_endpoint: None,
            render_token: None,
        }
    }
}

/// Production [`FetcherFactory`].
#[derive(Debug, Clone, Default)]
pub struct HttpBrowserFactory {
    pub options: BrowserOptions,
    pub retry: RetryPolicy,
}

impl FetcherFactory for HttpBrowserFactory {
    type Fetcher = HttpBrowser;

    fn open(&self) -> Result<FetchSession<HttpBrowser>, FetchError> {
        let browser = HttpBrowser::launch(self.options.clone())?;
        info!(
            render = self.options.render_endpoint.is_some(),
            headless = self.options.headless,
            "Browser session opened"
        );
        Ok(FetchSession::new(browser, self.retry))
    }
}

/// Fetches pages as a desktop browser would.
pub struct HttpBrowser {
    client: Option<reqwest::Client>,
    options: BrowserOptions,
}

impl HttpBrowser {
    pub fn launch(options: BrowserOptions) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("id-ID,id;q=0.9,en;q=0.8"));

        // The render endpoint needs room for both the navigation and the
        // in-page wait, so its client timeout covers the two together.
        let timeout = if options.render_endpoint.is_some() {
            options.page_load_timeout + options.script_timeout
        } else {
            options.page_load_timeout
        };

        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Session(e.to_string()))?;

        Ok(Self {
            client: Some(client),
            options,
        })
    }

    fn client(&self) -> Result<&reqwest::Client, FetchError> {
        self.client
            .as_ref()
            .ok_or_else(|| FetchError::Session("browser session already closed".into()))
    }

    fn render_request(&self, url: &str) -> serde_json::Value {
        serde_json::json!({
            "url": url,
            "userAgent": self.options.user_agent,
            "viewport": {
                "width": self.options.viewport_width,
                "height": self.options.viewport_height,
            },
            "gotoOptions": {
                "timeout": self.options.page_load_timeout.as_millis() as u64,
                "waitUntil": "networkidle2",
            },
            "waitForFunction": {
                "fn": "() => document.readyState === 'complete'",
                "timeout": self.options.script_timeout.as_millis() as u64,
            },
        })
    }

    fn render_url(&self, base: &str) -> String {
        let mut endpoint = format!("{}/content", base.trim_end_matches('/'));
        let mut params = Vec::new();
        if let Some(ref token) = self.options.render_token {
            params.push(format!("token={}", urlencoding::encode(token)));
        }
        if self.options.suppress_automation {
            params.push("stealth=true".to_string());
        }
        if !self.options.headless {
            params.push("headless=false".to_string());
        }
        if !params.is_empty() {
            endpoint.push('?');
            endpoint.push_str(&params.join("&"));
        }
        endpoint
    }
}

impl PageFetcher for HttpBrowser {
    async fn get(&mut self, url: &str) -> Result<String, FetchError> {
        let client = self.client()?;

        let resp = match self.options.render_endpoint {
            Some(ref base) => {
                let resp = client
                    .post(self.render_url(base))
                    .json(&self.render_request(url))
                    .send()
                    .await?;
                let status = resp.status();
                if !status.is_success() {
                    let message = resp.text().await.unwrap_or_default();
                    return Err(FetchError::Render {
                        status: status.as_u16(),
                        message,
                    });
                }
                resp
            }
            None => {
                let resp = client.get(url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                resp
            }
        };

        Ok(resp.text().await?)
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            info!("Browser session closed");
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory site used by runner, aggregator and pipeline tests.

    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Serves canned HTML by URL. `failing` URLs fail at the transport level,
    /// unknown URLs answer 404.
    #[derive(Clone, Default)]
    pub struct StaticSite {
        pages: Arc<HashMap<String, String>>,
        failing: Arc<HashSet<String>>,
        statuses: Arc<HashMap<String, u16>>,
        pub opened: Arc<AtomicUsize>,
        pub closed: Arc<AtomicUsize>,
        pub requests: Arc<Mutex<Vec<String>>>,
        pub fail_open: bool,
        pub attempts: usize,
    }

    impl StaticSite {
        pub fn new<I, K, V>(pages: I) -> Self
        where
            I: IntoIterator<Item = (K, V)>,
            K: Into<String>,
            V: Into<String>,
        {
            Self {
                pages: Arc::new(pages.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
                attempts: 1,
                ..Self::default()
            }
        }

        pub fn with_failing<I: IntoIterator<Item = &'static str>>(mut self, urls: I) -> Self {
            self.failing = Arc::new(urls.into_iter().map(String::from).collect());
            self
        }

        /// Answer `url` with an HTTP error status on every attempt.
        pub fn with_status(mut self, url: &str, status: u16) -> Self {
            let mut statuses = (*self.statuses).clone();
            statuses.insert(url.to_string(), status);
            self.statuses = Arc::new(statuses);
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        pub fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    pub struct StaticFetcher {
        site: StaticSite,
    }

    impl PageFetcher for StaticFetcher {
        async fn get(&mut self, url: &str) -> Result<String, FetchError> {
            self.site.requests.lock().unwrap().push(url.to_string());
            if self.site.failing.contains(url) {
                return Err(FetchError::Network(format!("connection reset: {url}")));
            }
            if let Some(&status) = self.site.statuses.get(url) {
                return Err(FetchError::Status {
                    status,
                    url: url.to_string(),
                });
            }
            self.site
                .pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                })
        }

        fn close(&mut self) {
            self.site.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl FetcherFactory for StaticSite {
        type Fetcher = StaticFetcher;

        fn open(&self) -> Result<FetchSession<StaticFetcher>, FetchError> {
            if self.fail_open {
                return Err(FetchError::Session("chromedriver missing".into()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            let policy = RetryPolicy {
                attempts: self.attempts,
                delay: Duration::ZERO,
            };
            Ok(FetchSession::new(StaticFetcher { site: self.clone() }, policy))
        }
    }
}
