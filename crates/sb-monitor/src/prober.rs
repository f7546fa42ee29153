//! Single-shot reachability probing.
//!
//! A probe never fails outward: DNS failures, refused connections, timeouts
//! and non-success HTTP statuses are all the `Down` observation, not errors.

use async_trait::async_trait;
use std::borrow::Cow;
use std::time::{Duration, Instant};
use tracing::debug;

use sb_common::WebsiteStatus;

/// Prefix `https://` when the URL carries no scheme; schemed URLs pass
/// through unchanged.
pub fn normalize_url(url: &str) -> Cow<'_, str> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Cow::Borrowed(url)
    } else {
        Cow::Owned(format!("https://{url}"))
    }
}

/// Outcome of one probe: a status and the wall-clock latency from request
/// start to response or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: WebsiteStatus,
    pub response_time_ms: i64,
}

/// Seam for the worker's probing step.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HTTP prober over a shared client. Redirects are followed; the request
/// timeout bounds how long one slow site can hold up a batch.
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for Prober {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let full_url = normalize_url(url);
        let start = Instant::now();
        let result = self.client.get(full_url.as_ref()).send().await;
        let response_time_ms = start.elapsed().as_millis() as i64;

        let status = match result {
            Ok(response) if response.status().is_success() => WebsiteStatus::Up,
            Ok(response) => {
                debug!(url = %full_url, http_status = %response.status(), "Probe returned non-success status");
                WebsiteStatus::Down
            }
            Err(e) => {
                debug!(url = %full_url, error = %e, "Probe failed");
                WebsiteStatus::Down
            }
        };

        ProbeOutcome {
            status,
            response_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn schemeless_urls_get_https() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("sub.example.com/path"), "https://sub.example.com/path");
    }

    #[test]
    fn schemed_urls_pass_through() {
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }

    async fn serve_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn successful_response_is_up_with_nonnegative_latency() {
        let url = serve_once("200 OK").await;
        let prober = Prober::new(Duration::from_secs(5)).unwrap();
        let outcome = prober.probe(&url).await;
        assert_eq!(outcome.status, WebsiteStatus::Up);
        assert!(outcome.response_time_ms >= 0);
    }

    #[tokio::test]
    async fn server_error_is_down() {
        let url = serve_once("500 Internal Server Error").await;
        let prober = Prober::new(Duration::from_secs(5)).unwrap();
        let outcome = prober.probe(&url).await;
        assert_eq!(outcome.status, WebsiteStatus::Down);
    }

    #[tokio::test]
    async fn refused_connection_is_down_not_an_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = Prober::new(Duration::from_secs(5)).unwrap();
        let outcome = prober.probe(&format!("http://{addr}")).await;
        assert_eq!(outcome.status, WebsiteStatus::Down);
        assert!(outcome.response_time_ms >= 0);
    }
}
