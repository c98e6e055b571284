//! reqwest-backed [`BookService`] for the `/books` HTTP contract.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use catalog_kernel::settings::RemoteSettings;
use catalog_kernel::{Book, BookId, BookService, NewBook, RemoteError};

/// Remote book service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBookService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBookService {
    /// Creates a client rooted at `base_url` (e.g. `http://localhost:3000`).
    ///
    /// Every request is bounded by `timeout`; an expired request surfaces as
    /// [`RemoteError::Transport`].
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &RemoteSettings) -> Result<Self, RemoteError> {
        Self::new(
            settings.base_url.clone(),
            Duration::from_millis(settings.request_timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn books_url(&self) -> String {
        format!("{}/books", self.base_url)
    }

    fn book_url(&self, id: BookId) -> String {
        format!("{}/books/{}", self.base_url, id)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message: rejection_message(&body),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(classify)
    }
}

#[async_trait]
impl BookService for HttpBookService {
    async fn list(&self) -> Result<Vec<Book>, RemoteError> {
        let url = self.books_url();
        tracing::debug!(%url, "fetching book list");
        self.fetch(self.client.get(url)).await
    }

    async fn get(&self, id: BookId) -> Result<Book, RemoteError> {
        let url = self.book_url(id);
        tracing::debug!(%url, "fetching book");
        self.fetch(self.client.get(url)).await
    }

    async fn create(&self, book: &NewBook) -> Result<Book, RemoteError> {
        let url = self.books_url();
        tracing::debug!(%url, "creating book");
        self.fetch(self.client.post(url).json(book)).await
    }

    async fn update(&self, book: &Book) -> Result<Book, RemoteError> {
        let url = self.book_url(book.id);
        tracing::debug!(%url, active = book.active, "updating book");
        self.fetch(self.client.put(url).json(book)).await
    }

    async fn delete(&self, id: BookId) -> Result<(), RemoteError> {
        let url = self.book_url(id);
        tracing::debug!(%url, "deleting book");
        self.send(self.client.delete(url)).await.map(|_| ())
    }
}

fn classify(err: reqwest::Error) -> RemoteError {
    if err.is_decode() {
        RemoteError::Decode(err.to_string())
    } else {
        RemoteError::Transport(err.to_string())
    }
}

/// Longest plain-text rejection body shown to the user as is.
const MAX_TEXT_MESSAGE: usize = 200;

/// Pulls a human-readable message out of a rejection body.
///
/// Understands `{"error": {"message": ..}}`, `{"message": ..}`, and short
/// plain text. Empty bodies, markup, oversized text, and JSON without a
/// message yield `None`.
pub fn rejection_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(|message| message.as_str())
            .filter(|message| !message.is_empty())
            .map(str::to_string),
        Err(_) if body.starts_with('<') || body.chars().count() > MAX_TEXT_MESSAGE => None,
        Err(_) => Some(body.to_string()),
    }
}
