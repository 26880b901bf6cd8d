//! HTTP transport used to deliver payloads to the LogSnag API.
use std::{sync::Arc, time::Duration};

use reqwest::{StatusCode, Url};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Decoded JSON response body.
pub type Response = Map<String, Value>;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `POST`, used to create events, identities and insights.
    Post,
    /// `PATCH`, used to mutate insights.
    Patch,
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// A single API call, fully validated and assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Endpoint path relative to the base URL, e.g. `/v1/log`.
    pub path: &'static str,
    /// Bearer token sent in the `Authorization` header.
    pub token: Arc<str>,
    /// JSON body.
    pub body: Value,
}

/// Delivers requests to the API and returns the decoded response.
///
/// Implement this to plug in a custom HTTP stack. Any `Fn(&Request) -> Result<Response>`
/// closure is a `Transport` too.
pub trait Transport {
    /// Send `request`, returning the decoded response body or a transport error.
    fn send(&self, request: &Request) -> Result<Response>;
}

impl<T: Fn(&Request) -> Result<Response>> Transport for T {
    fn send(&self, request: &Request) -> Result<Response> {
        self(request)
    }
}

/// Blocking reqwest transport.
///
/// Non-success statuses are returned as errors: [`Error::Unauthorized`] for 401 and
/// [`Error::HttpStatus`] for everything else. A successful response with an empty body decodes
/// to an empty [`Response`]; any other body must be a JSON object.
pub struct HttpTransport {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
    base_url: Url,
}

const USER_AGENT: &str = concat!("logsnag-rust/", env!("CARGO_PKG_VERSION"));

impl HttpTransport {
    pub(crate) fn new(base_url: &str, timeout: Option<Duration>) -> Result<HttpTransport> {
        let base_url = Url::parse(base_url).map_err(Error::InvalidBaseUrl)?;

        let mut builder = reqwest::blocking::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(HttpTransport {
            client: builder.build()?,
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let url = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&url).map_err(Error::InvalidBaseUrl)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        let url = self.endpoint(request.path)?;

        // `json` sets `Content-Type: application/json`.
        let response = self
            .client
            .request(request.method.into(), url)
            .bearer_auth(&*request.token)
            .json(&request.body)
            .send()?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            log::warn!(target: "logsnag", "client is not authorized. Check your token");
            return Err(Error::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        // Some endpoints acknowledge with an empty body.
        let body = response.bytes()?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Response::new());
        }
        serde_json::from_slice(&body).map_err(|err| Error::Decode(Arc::new(err)))
    }
}
