// ABOUTME: Narrow HTTP fetch collaborator used by the pagination tracker.
// ABOUTME: Wraps reqwest behind a small Client/Response surface; no retry policy lives here.

//! HTTP client.
//!
//! The core engines never touch the network; this module exists so the
//! pagination tracker can perform its single upstream fetch through a
//! `fetch`-shaped capability whose response exposes the document parser.
//! Retry, backoff, and concurrency policy are deliberately out of scope.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{PluckError, Result};
use crate::parser::HtmlParser;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct Options {
    pub timeout: Duration,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
    /// When true, non-2xx responses are returned instead of raising
    /// [`PluckError::Status`].
    pub allow_non_success: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "pluck/0.1".to_string(),
            headers: HashMap::new(),
            allow_non_success: false,
        }
    }
}

/// Builder for [`Client`] instances.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Add a header sent with every request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Return non-2xx responses instead of raising.
    pub fn allow_non_success(mut self, allow: bool) -> Self {
        self.opts.allow_non_success = allow;
        self
    }

    pub fn build(self) -> Result<Client> {
        let http = reqwest::Client::builder()
            .timeout(self.opts.timeout)
            .user_agent(self.opts.user_agent.clone())
            .build()?;
        Ok(Client {
            http,
            opts: self.opts,
        })
    }
}

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl RequestOptions {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// A fetched response with its body read to completion.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    url: String,
    headers: HashMap<String, String>,
    body: String,
}

impl Response {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Binds the response body to a document parser.
    pub fn html_parser(&self) -> HtmlParser {
        HtmlParser::new(self.body.clone())
    }
}

/// A thin asynchronous HTTP client.
pub struct Client {
    http: reqwest::Client,
    opts: Options,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Performs one GET request and reads the body.
    pub async fn fetch(&self, request: &RequestOptions) -> Result<Response> {
        let mut outgoing = self.http.get(&request.url);
        for (key, value) in self.opts.headers.iter().chain(request.headers.iter()) {
            outgoing = outgoing.header(key, value);
        }

        let response = outgoing.send().await?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        let response = Response {
            status,
            url,
            headers,
            body,
        };

        if !response.is_success() && !self.opts.allow_non_success {
            return Err(PluckError::Status {
                code: response.status,
                url: response.url,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    fn client() -> Client {
        Client::builder().build().unwrap()
    }

    #[tokio::test]
    async fn fetch_reads_body_and_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/page");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<title>Hello</title>");
        });

        let response = client()
            .fetch(&RequestOptions::url(server.url("/page")))
            .await
            .unwrap();
        mock.assert();

        assert_eq!(response.status(), 200);
        assert!(response.is_success());
        assert_eq!(
            response.header("Content-Type"),
            Some("text/html; charset=utf-8")
        );
        assert_eq!(response.text(), "<title>Hello</title>");
    }

    #[tokio::test]
    async fn non_success_status_raises() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("nope");
        });

        let err = client()
            .fetch(&RequestOptions::url(server.url("/missing")))
            .await
            .unwrap_err();

        assert!(matches!(err, PluckError::Status { code: 404, .. }));
    }

    #[tokio::test]
    async fn non_success_status_allowed_when_configured() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("nope");
        });

        let client = Client::builder().allow_non_success(true).build().unwrap();
        let response = client
            .fetch(&RequestOptions::url(server.url("/missing")))
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn per_request_headers_are_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/auth")
                .header("x-api-key", "secret");
            then.status(200).body("ok");
        });

        client()
            .fetch(&RequestOptions::url(server.url("/auth")).header("x-api-key", "secret"))
            .await
            .unwrap();
        mock.assert();
    }
}
