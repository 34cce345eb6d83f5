use gloo_net::http::{Request, Response};

use crate::error::FetchError;
use crate::fs::Fetch;

/// Fetches files over HTTP with the browser's `fetch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl HttpFetcher {
    async fn get(url: &str) -> Result<Response, FetchError> {
        let response = Request::get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if !response.ok() {
            return Err(FetchError::Status {
                status: response.status(),
            });
        }
        Ok(response)
    }
}

impl Fetch for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Self::get(url)
            .await?
            .binary()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        Self::get(url)
            .await?
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}
