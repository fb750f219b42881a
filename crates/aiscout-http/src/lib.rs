//! Shared rate-limited HTTP client used by every source adapter
//! (spec.md §4.C).
//!
//! One [`reqwest::Client`] is built per process and reused. Requests carry
//! a baseline browser-like user agent; a short configurable list of
//! anti-bot hosts gets a single retry with an enriched header set on a 403.

mod redact;

pub use redact::redact_error_message;

use aiscout_utils::error::TransportError;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RETRIES: u32 = 2;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_timeout: Duration,
    anti_bot_hosts: Vec<String>,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        Self::with_timeout(user_agent, DEFAULT_TOTAL_TIMEOUT)
    }

    pub fn with_timeout(user_agent: &str, max_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .gzip(true)
            .build()
            .map_err(|e| TransportError::Transport {
                status: None,
                kind: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            client,
            max_timeout,
            anti_bot_hosts: Vec::new(),
        })
    }

    pub fn with_anti_bot_hosts(mut self, hosts: Vec<String>) -> Self {
        self.anti_bot_hosts = hosts;
        self
    }

    fn is_anti_bot_host(&self, url: &str) -> bool {
        self.anti_bot_hosts.iter().any(|host| url.contains(host))
    }

    /// `GET url` with optional headers and query params. On a 403 from a
    /// configured anti-bot host, retries once with an enriched,
    /// browser-shaped header set before giving up.
    pub async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        params: &[(&str, &str)],
    ) -> Result<Response, TransportError> {
        let builder = || {
            let mut b = self.client.get(url).query(params);
            for (k, v) in headers {
                b = b.header(*k, *v);
            }
            b
        };

        let anti_bot = self.is_anti_bot_host(url);
        let response = self.execute_with_retry(builder(), "fetch", anti_bot).await?;

        if response.status() == StatusCode::FORBIDDEN && anti_bot {
            warn!(url, "anti-bot host returned 403, retrying with enriched headers");
            let enriched = builder()
                .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
                .header("Accept-Encoding", "gzip, deflate, br")
                .header("Sec-Fetch-Dest", "document")
                .header("Sec-Fetch-Mode", "navigate")
                .header("Sec-Fetch-Site", "none");
            return self.execute_with_retry(enriched, "fetch-retry", false).await;
        }

        Ok(response)
    }

    /// `POST url` with a JSON body, used by the LLM classifier and
    /// translator. Shares the same retry/backoff policy as [`HttpClient::get`]
    /// but never attempts the anti-bot retry (it only applies to scraped
    /// pages).
    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<Response, TransportError> {
        let mut builder = self.client.post(url).json(body);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        self.execute_with_retry(builder, "post", false).await
    }

    /// Runs one request through the shared timeout/retry/backoff policy.
    /// `pass_through_forbidden` lets a 403 surface as `Ok` instead of the
    /// usual client-error `Err`, so [`HttpClient::get`] can inspect it and
    /// decide whether the host is worth an enriched-header retry.
    async fn execute_with_retry(
        &self,
        request_builder: reqwest::RequestBuilder,
        label: &str,
        pass_through_forbidden: bool,
    ) -> Result<Response, TransportError> {
        let effective_timeout = self.max_timeout;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let request = request_builder
                .try_clone()
                .ok_or_else(|| TransportError::Transport {
                    status: None,
                    kind: "failed to clone request for retry".to_string(),
                })?
                .timeout(effective_timeout)
                .build()
                .map_err(|e| TransportError::Transport {
                    status: None,
                    kind: redact_error_message(&e.to_string()),
                })?;

            debug!(label, attempt, "executing http request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        return Err(TransportError::RateLimited);
                    }
                    if status == StatusCode::FORBIDDEN && pass_through_forbidden {
                        return Ok(response);
                    }
                    if status.is_client_error() {
                        return Err(TransportError::Transport {
                            status: Some(status.as_u16()),
                            kind: format!("client error: {status}"),
                        });
                    }
                    if status.is_server_error() {
                        if attempt <= MAX_RETRIES {
                            warn!(label, attempt, %status, "server error, retrying");
                            tokio::time::sleep(INITIAL_BACKOFF * attempt).await;
                            continue;
                        }
                        return Err(TransportError::Transport {
                            status: Some(status.as_u16()),
                            kind: format!("server error after retries: {status}"),
                        });
                    }

                    return Ok(response);
                }
                Err(e) => {
                    if e.is_timeout() {
                        return Err(TransportError::Timeout(effective_timeout));
                    }
                    if attempt <= MAX_RETRIES {
                        warn!(label, attempt, error = %e, "network error, retrying");
                        tokio::time::sleep(INITIAL_BACKOFF * attempt).await;
                        continue;
                    }
                    return Err(TransportError::Transport {
                        status: None,
                        kind: redact_error_message(&e.to_string()),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_returns_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let client = HttpClient::new("aiscout-test/0.1").unwrap();
        let response = client
            .get(&format!("{}/ok", server.uri()), &[], &[])
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn rate_limited_maps_to_rate_limited_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = HttpClient::new("aiscout-test/0.1").unwrap();
        let err = client
            .get(&format!("{}/limited", server.uri()), &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::RateLimited));
    }

    #[tokio::test]
    async fn anti_bot_host_retries_with_enriched_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocked"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/blocked"))
            .respond_with(ResponseTemplate::new(200).set_body_string("unblocked"))
            .mount(&server)
            .await;

        let host = server.uri().replace("http://", "");
        let client = HttpClient::new("aiscout-test/0.1")
            .unwrap()
            .with_anti_bot_hosts(vec![host]);
        let response = client
            .get(&format!("{}/blocked", server.uri()), &[], &[])
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "unblocked");
    }
}
