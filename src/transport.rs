//! HTTP transport.
//!
//! Owns the outbound connection, is shared across the sender, and reports
//! status back to the drain loop: a single `reqwest::Client` POST per
//! batch, with optional gzip compression.

use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tracing::instrument;

use crate::retry::TRANSPORT_ERROR_STATUS;

const USER_AGENT_PREFIX: &str = "logzio-go/v1.0.0";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin wrapper around a `reqwest::Client`, constructed once and shared for
/// the lifetime of the [`crate::Sender`].
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            // Building fails only on TLS backend initialization errors; a
            // default client is always constructible in practice.
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// POST `body` to `url`. Returns the HTTP status code, or the sentinel
    /// `-1` on a transport-level failure (DNS, connect, timeout, TLS).
    #[instrument(name = "transport::post", skip(self, body, url), level = "debug")]
    pub async fn post(
        &self,
        url: &reqwest::Url,
        body: &[u8],
        compress: bool,
        attempt: u32,
        dropped_logs: u64,
    ) -> i32 {
        let mut request = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .header("logzio-shipper", shipper_header(attempt, dropped_logs));

        let payload = if compress {
            match gzip(body) {
                Ok(compressed) => {
                    request = request.header(reqwest::header::CONTENT_ENCODING, "gzip");
                    compressed
                }
                Err(e) => {
                    tracing::error!(error = %e, "transport: gzip compression failed, sending uncompressed");
                    body.to_vec()
                }
            }
        } else {
            body.to_vec()
        };

        match request.body(payload).send().await {
            Ok(response) => {
                let status = response.status().as_u16() as i32;
                tracing::debug!(status, attempt, "transport: response received");
                status
            }
            Err(e) => {
                tracing::error!(error = %e, attempt, "transport: request failed");
                TRANSPORT_ERROR_STATUS
            }
        }
    }

    /// Forwarded from [`crate::Sender::close_idle_connections`] — `reqwest`
    /// has no direct equivalent, so this drops and rebuilds the underlying
    /// client, the closest approximation of forcing idle connections shut.
    pub fn close_idle_connections(&mut self) {
        *self = Self::new();
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

fn shipper_header(attempt: u32, dropped_logs: u64) -> String {
    if dropped_logs == 0 {
        format!("{USER_AGENT_PREFIX}/{attempt}/0")
    } else {
        format!("{USER_AGENT_PREFIX}/{attempt}/1/NN:{dropped_logs}")
    }
}

fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipper_header_reports_no_loss() {
        assert_eq!(shipper_header(1, 0), "logzio-go/v1.0.0/1/0");
    }

    #[test]
    fn shipper_header_reports_loss_count() {
        assert_eq!(shipper_header(2, 7), "logzio-go/v1.0.0/2/1/NN:7");
    }

    #[test]
    fn gzip_round_trips() {
        let data = b"hello world\nsecond line\n";
        let compressed = gzip(data).unwrap();
        assert_ne!(compressed, data);

        use flate2::read::GzDecoder;
        use std::io::Read;
        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
