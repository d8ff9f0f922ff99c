// src/probe/http.rs
// =============================================================================
// This module measures a single stream endpoint over HTTP.
//
// Key functionality:
// - Rejects urls that are not http/https before touching the network
// - Sends a GET and treats any non-2xx status as a failure
// - Reads only the first N bytes of the body (a live stream never ends,
//   so we must not download the whole thing)
// - A body that ends before N bytes is a short read and fails, unless
//   short reads were explicitly allowed
// - Maps reqwest errors onto ProbeError variants
//
// The deadline for the whole probe is enforced one level up, in batch.rs.
// The client timeout here is only a backstop.
//
// Rust concepts:
// - Traits: StreamProbe lets tests replace the network with a script
// - async-trait: Async functions inside a trait
// - Result<T, E>: Every failure is a ProbeError value, never a panic
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

// Why a probe failed
//
// Any of these makes the entry unreachable for this run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    #[error("timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("body read failed: {0}")]
    Body(String),
    #[error("empty body")]
    EmptyBody,
    #[error("short read of {got}/{wanted} bytes")]
    ShortRead { got: usize, wanted: usize },
    #[error("unsupported scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("probe aborted: {0}")]
    Aborted(String),
    #[error("request failed: {0}")]
    Request(String),
}

// Something that can read the first bytes of a stream
//
// Returns how many bytes were read (at most `limit`).
#[async_trait]
pub trait StreamProbe: Send + Sync + 'static {
    async fn read_prefix(&self, url: &str, limit: usize) -> Result<usize, ProbeError>;
}

// The real probe, backed by a shared reqwest client
//
// We reuse one client for all requests (connection pooling)
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    accept_short_reads: bool,
}

impl HttpProbe {
    pub fn new(timeout: Duration, user_agent: &str) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))  // Follow up to 5 redirects
            .user_agent(user_agent)
            .build()?;

        Ok(HttpProbe {
            client,
            accept_short_reads: false,
        })
    }

    // Lets a body that ends early count with the bytes that arrived
    pub fn accept_short_reads(mut self, accept: bool) -> Self {
        self.accept_short_reads = accept;
        self
    }
}

#[async_trait]
impl StreamProbe for HttpProbe {
    async fn read_prefix(&self, url: &str, limit: usize) -> Result<usize, ProbeError> {
        let url = checked_url(url)?;

        let mut response = self.client.get(url).send().await.map_err(categorize_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        // Pull chunks until we have enough or the server closes the body
        let mut read = 0usize;
        while read < limit {
            match response.chunk().await {
                Ok(Some(chunk)) => read += chunk.len(),
                Ok(None) => break,
                Err(e) => return Err(ProbeError::Body(e.to_string())),
            }
        }

        if read == 0 {
            return Err(ProbeError::EmptyBody);
        }
        if read < limit && !self.accept_short_reads {
            return Err(ProbeError::ShortRead {
                got: read,
                wanted: limit,
            });
        }

        Ok(read.min(limit))
    }
}

// Parses the url and only lets http/https through
//
// IPTV lists are full of rtp:// and udp:// multicast addresses that a plain
// HTTP client can't read.
fn checked_url(raw: &str) -> Result<Url, ProbeError> {
    let url = Url::parse(raw.trim()).map_err(|e| ProbeError::InvalidUrl(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProbeError::UnsupportedScheme(other.to_string())),
    }
}

// Categorizes different error types from reqwest
fn categorize_error(error: reqwest::Error) -> ProbeError {
    if error.is_timeout() {
        ProbeError::Timeout
    } else if error.is_connect() {
        ProbeError::Connect(error.to_string())
    } else if error.is_redirect() {
        ProbeError::Request("too many redirects".to_string())
    } else {
        ProbeError::Request(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn probe() -> HttpProbe {
        HttpProbe::new(Duration::from_secs(2), "iptv-sorter-test").unwrap()
    }

    #[tokio::test]
    async fn test_reads_prefix_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live.ts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64 * 1024]))
            .mount(&server)
            .await;

        let read = probe()
            .read_prefix(&format!("{}/live.ts", server.uri()), 1024)
            .await
            .unwrap();
        assert_eq!(read, 1024);
    }

    #[tokio::test]
    async fn test_short_body_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("0123456789"))
            .mount(&server)
            .await;

        let result = probe()
            .read_prefix(&format!("{}/live.ts", server.uri()), 1024)
            .await;
        assert_eq!(result, Err(ProbeError::ShortRead { got: 10, wanted: 1024 }));
    }

    #[tokio::test]
    async fn test_short_body_allowed_when_enabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n"))
            .mount(&server)
            .await;

        let read = probe()
            .accept_short_reads(true)
            .read_prefix(&format!("{}/index.m3u8", server.uri()), 1024)
            .await
            .unwrap();
        assert_eq!(read, "#EXTM3U\n".len());
    }

    #[tokio::test]
    async fn test_empty_body_fails_even_when_short_reads_allowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = probe()
            .accept_short_reads(true)
            .read_prefix(&server.uri(), 1024)
            .await;
        assert_eq!(result, Err(ProbeError::EmptyBody));
    }

    #[tokio::test]
    async fn test_empty_body_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = probe().read_prefix(&server.uri(), 1024).await;
        assert_eq!(result, Err(ProbeError::EmptyBody));
    }

    #[tokio::test]
    async fn test_not_found_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = probe().read_prefix(&server.uri(), 1024).await;
        assert_eq!(result, Err(ProbeError::Status(404)));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let probe = HttpProbe::new(Duration::from_millis(200), "iptv-sorter-test").unwrap();
        let result = probe.read_prefix(&server.uri(), 1024).await;
        assert_eq!(result, Err(ProbeError::Timeout));
    }

    #[tokio::test]
    async fn test_refused_connection_fails() {
        // Port 9 (discard) is almost never listening on localhost
        let result = probe().read_prefix("http://127.0.0.1:9/live", 1024).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_checked_url() {
        assert!(checked_url("http://example.com/live").is_ok());
        assert!(checked_url(" https://example.com/live ").is_ok());
        assert_eq!(
            checked_url("rtp://239.0.0.1:5000"),
            Err(ProbeError::UnsupportedScheme("rtp".to_string()))
        );
        assert!(matches!(
            checked_url("not a url"),
            Err(ProbeError::InvalidUrl(_))
        ));
    }
}
