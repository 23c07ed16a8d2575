use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scraper::Html;
use std::thread;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Blocking HTTP fetcher with the config's headers/proxies baked into the
/// client and a bounded retry budget per URL.
pub struct Fetcher {
    client: Client,
    retries: u32,
    delay: Duration,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT);
        for (scheme, url) in &config.proxies {
            let proxy = match scheme.as_str() {
                "http" => reqwest::Proxy::http(url)?,
                "https" => reqwest::Proxy::https(url)?,
                _ => reqwest::Proxy::all(url)?,
            };
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            retries: config.retries.max(1),
            delay: Duration::from_secs(config.retry_delay_secs),
        })
    }

    /// GET a page and parse it into a document. Timeouts sleep before the
    /// next attempt, other errors go straight back around the loop; after
    /// the retry budget is spent the fetch soft-fails to `None`. Never
    /// returns an error to the caller.
    pub fn get(&self, url: &str) -> Option<Html> {
        for attempt in 1..=self.retries {
            match self.client.get(url).send().and_then(|r| r.text()) {
                Ok(body) => return Some(Html::parse_document(&body)),
                Err(e) if e.is_timeout() => {
                    warn!(
                        url,
                        attempt,
                        delay_secs = self.delay.as_secs(),
                        "request timed out, retrying"
                    );
                    thread::sleep(self.delay);
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "request failed");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_builds_from_default_config() {
        let fetcher = Fetcher::new(&Config::default()).unwrap();
        assert_eq!(fetcher.retries, 3);
        assert_eq!(fetcher.delay, Duration::from_secs(1));
    }

    #[test]
    fn test_fetcher_rejects_malformed_header() {
        let mut config = Config::default();
        config
            .headers
            .insert("bad header name".to_string(), "x".to_string());
        assert!(Fetcher::new(&config).is_err());
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        let mut config = Config::default();
        config.retries = 0;
        let fetcher = Fetcher::new(&config).unwrap();
        assert_eq!(fetcher.retries, 1);
    }

    #[test]
    fn test_unreachable_url_soft_fails_to_none() {
        let mut config = Config::default();
        config.retries = 1;
        config.retry_delay_secs = 0;
        let fetcher = Fetcher::new(&config).unwrap();
        // Not a URL at all: every attempt errors, the caller just gets None.
        assert!(fetcher.get("not a url").is_none());
    }
}
