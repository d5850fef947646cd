//! Rate-limited HTTP client for the SEC EDGAR JSON API.

use async_trait::async_trait;
use filings_core::{
    Cik, CompanyFacts, CompanySubmissions, FilingSource, FilingsError, Result, TickerEntry,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// SEC EDGAR API base URL
const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// SEC company tickers URL
const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Default rate limit: 10 requests per second (SEC requirement)
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Rate limiter to ensure we don't exceed SEC's rate limits
#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            last_request: now.checked_sub(min_interval).unwrap_or(now),
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// SEC EDGAR API client.
///
/// Implements [`FilingSource`] over the public EDGAR endpoints, with rate
/// limiting per SEC requirements (max 10 requests/second).
#[derive(Debug, Clone)]
pub struct EdgarClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
    tickers_url: String,
}

impl EdgarClient {
    /// Create a new EDGAR client with the specified user agent.
    ///
    /// The SEC requires identifying user agent headers. Format should be:
    /// "AppName/Version (contact@email.com)"
    ///
    /// # Errors
    /// Returns [`FilingsError::Network`] if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FilingsError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Create a new EDGAR client with a custom HTTP client.
    ///
    /// The client is expected to carry its own identifying user agent.
    ///
    /// # Example
    /// ```
    /// use filings_edgar::EdgarClient;
    /// use std::time::Duration;
    ///
    /// let client = reqwest::Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .user_agent("MyApp/1.0 (contact@example.com)")
    ///     .build()
    ///     .unwrap();
    ///
    /// let edgar = EdgarClient::with_client(client);
    /// ```
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            base_url: EDGAR_BASE_URL.to_string(),
            tickers_url: COMPANY_TICKERS_URL.to_string(),
        }
    }

    /// Point the client at different endpoints (mirrors, proxies).
    #[must_use]
    pub fn with_endpoints(mut self, base_url: &str, tickers_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.tickers_url = tickers_url.to_string();
        self
    }

    /// URL of the submissions document for `cik`.
    fn submissions_url(&self, cik: &Cik) -> String {
        format!("{}/submissions/CIK{}.json", self.base_url, cik)
    }

    /// URL of the company facts document for `cik`.
    fn company_facts_url(&self, cik: &Cik) -> String {
        format!("{}/api/xbrl/companyfacts/CIK{}.json", self.base_url, cik)
    }

    /// GET `url` and decode the JSON body. Non-2xx statuses are errors.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        // Rate limit
        self.rate_limiter.lock().await.wait().await;

        debug!(url, "Fetching EDGAR document");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FilingsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FilingsError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| FilingsError::Parse(format!("Failed to parse {url}: {e}")))
    }
}

#[async_trait]
impl FilingSource for EdgarClient {
    fn name(&self) -> &str {
        "SEC EDGAR"
    }

    async fn ticker_directory(&self) -> Result<Vec<TickerEntry>> {
        let raw: Map<String, Value> = self.get_json(&self.tickers_url).await?;
        let entries = parse_ticker_directory(raw)?;
        debug!(count = entries.len(), "Fetched ticker directory");
        Ok(entries)
    }

    async fn company_submissions(&self, cik: &Cik) -> Result<CompanySubmissions> {
        self.get_json(&self.submissions_url(cik)).await
    }

    async fn company_facts(&self, cik: &Cik) -> Result<CompanyFacts> {
        self.get_json(&self.company_facts_url(cik)).await
    }
}

/// Converts the index-keyed directory object into entries, keeping document order.
fn parse_ticker_directory(raw: Map<String, Value>) -> Result<Vec<TickerEntry>> {
    raw.into_iter()
        .map(|(index, entry)| {
            serde_json::from_value(entry).map_err(|e| {
                FilingsError::Parse(format!("Invalid ticker directory entry {index}: {e}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_building() {
        let client = EdgarClient::new("Test/1.0 (test@example.com)").unwrap();
        let cik = Cik::from_raw(320193);

        assert_eq!(
            client.submissions_url(&cik),
            "https://data.sec.gov/submissions/CIK0000320193.json"
        );
        assert_eq!(
            client.company_facts_url(&cik),
            "https://data.sec.gov/api/xbrl/companyfacts/CIK0000320193.json"
        );
        assert_eq!(client.name(), "SEC EDGAR");
    }

    #[test]
    fn test_custom_endpoints() {
        let client = EdgarClient::new("Test/1.0 (test@example.com)")
            .unwrap()
            .with_endpoints("http://localhost:8080/", "http://localhost:8080/tickers.json");

        assert_eq!(
            client.submissions_url(&Cik::new("1")),
            "http://localhost:8080/submissions/CIK0000000001.json"
        );
        assert_eq!(client.tickers_url, "http://localhost:8080/tickers.json");
    }

    #[test]
    fn test_parse_ticker_directory_keeps_order() {
        let raw = json!({
            "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
            "1": {"cik_str": 789019, "ticker": "MSFT", "title": "Microsoft Corp"}
        });
        let Value::Object(map) = raw else {
            unreachable!()
        };

        let entries = parse_ticker_directory(map).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ticker, "AAPL");
        assert_eq!(entries[1].cik_str, 789019);
    }

    #[test]
    fn test_parse_ticker_directory_rejects_bad_entry() {
        let raw = json!({"0": {"ticker": "AAPL"}});
        let Value::Object(map) = raw else {
            unreachable!()
        };

        assert!(matches!(
            parse_ticker_directory(map),
            Err(FilingsError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_limiter_spacing() {
        let mut limiter = RateLimiter::new(Duration::from_millis(20));
        limiter.wait().await;
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(15));
    }
}
