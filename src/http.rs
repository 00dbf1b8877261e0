use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::TessError;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Plain HTTP GET. Non-success statuses are returned, not turned into errors,
/// so callers decide what a miss means. Transport failures are errors.
pub trait RemoteFetch: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, TessError>;
}

pub fn user_agent() -> String {
    format!("tess-cat/{}", env!("CARGO_PKG_VERSION"))
}

pub(crate) fn default_headers() -> Result<HeaderMap, TessError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&user_agent()).map_err(|err| TessError::Http(err.to_string()))?,
    );
    Ok(headers)
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, TessError> {
        let client = Client::builder()
            .default_headers(default_headers()?)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| TessError::Http(err.to_string()))?;
        Ok(Self { client })
    }
}

impl RemoteFetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<HttpResponse, TessError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| TessError::Http(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|err| TessError::Http(err.to_string()))?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
