use async_trait::async_trait;
use thiserror::Error;

use crate::book::{Book, BookId, NewBook};

/// Failure talking to the remote book service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never completed: connection refused, reset, or timed out.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("remote rejected request with status {status}")]
    Rejected {
        status: u16,
        /// Error text carried in the response body, if any.
        message: Option<String>,
    },

    /// The service answered with a body we could not read.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Message safe to show next to the control that triggered the request.
    ///
    /// Prefers the service's own error text, then `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            Self::Transport(text) if !text.is_empty() => text.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Status code of a rejection, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Remote source of truth for the catalog.
///
/// Implementations map one-to-one onto the `/books` HTTP contract:
/// list, fetch one, create, full-record update, delete.
#[async_trait]
pub trait BookService: Send + Sync {
    /// `GET /books`
    async fn list(&self) -> Result<Vec<Book>, RemoteError>;

    /// `GET /books/{id}`
    async fn get(&self, id: BookId) -> Result<Book, RemoteError>;

    /// `POST /books`
    async fn create(&self, book: &NewBook) -> Result<Book, RemoteError>;

    /// `PUT /books/{id}` with the full record.
    async fn update(&self, book: &Book) -> Result<Book, RemoteError>;

    /// `DELETE /books/{id}`
    async fn delete(&self, id: BookId) -> Result<(), RemoteError>;
}
