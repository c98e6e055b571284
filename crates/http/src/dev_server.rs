//! In-memory book service speaking the `/books` contract.
//!
//! Ids are assigned sequentially from 1. `createdAt` and `modifiedAt` are
//! stamped here in RFC 3339 UTC; clients never set them.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::RwLock;

use catalog_kernel::{Book, BookId, NewBook};

use crate::error::AppError;

/// Books held by the development service, keyed and listed by id.
#[derive(Debug, Default)]
pub struct BookRegistry {
    last_id: BookId,
    books: BTreeMap<BookId, Book>,
}

impl BookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `books`; later creates continue after the
    /// highest id seen.
    pub fn with_books(books: impl IntoIterator<Item = Book>) -> Self {
        let mut registry = Self::new();
        for book in books {
            registry.last_id = registry.last_id.max(book.id);
            registry.books.insert(book.id, book);
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, id: BookId) -> Option<&Book> {
        self.books.get(&id)
    }

    pub fn list(&self) -> Vec<Book> {
        self.books.values().cloned().collect()
    }

    fn insert(&mut self, fields: NewBook, now: String) -> Book {
        self.last_id += 1;
        let book = Book {
            id: self.last_id,
            title: fields.title,
            author: fields.author,
            category: fields.category,
            isbn: fields.isbn,
            active: true,
            created_at: now.clone(),
            modified_at: now,
        };
        self.books.insert(book.id, book.clone());
        book
    }
}

/// Registry handle shared by every request.
pub type SharedRegistry = Arc<RwLock<BookRegistry>>;

/// Routes for `/books` and `/books/{id}`.
pub fn routes(registry: SharedRegistry) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(registry)
}

fn now_rfc3339() -> Result<String, AppError> {
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format timestamp")?;
    Ok(now)
}

fn require_fields(fields: &NewBook) -> Result<(), AppError> {
    let missing: Vec<&str> = [
        ("title", &fields.title),
        ("author", &fields.author),
        ("category", &fields.category),
        ("isbn", &fields.isbn),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let details = missing
        .iter()
        .map(|field| json!({"field": field, "error": "required"}))
        .collect();
    Err(AppError::validation(
        details,
        format!("missing required fields: {}", missing.join(", ")),
    ))
}

async fn list_books(State(registry): State<SharedRegistry>) -> Json<Vec<Book>> {
    Json(registry.read().await.list())
}

async fn get_book(
    State(registry): State<SharedRegistry>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>, AppError> {
    registry
        .read()
        .await
        .get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Book {id} not found")))
}

async fn create_book(
    State(registry): State<SharedRegistry>,
    Json(fields): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    require_fields(&fields)?;
    let now = now_rfc3339()?;

    let book = registry.write().await.insert(fields, now);
    tracing::info!(book_id = book.id, "book created");

    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(registry): State<SharedRegistry>,
    Path(id): Path<BookId>,
    Json(incoming): Json<Book>,
) -> Result<Json<Book>, AppError> {
    if incoming.id != id {
        return Err(AppError::bad_request(format!(
            "body id {} does not match path id {id}",
            incoming.id
        )));
    }
    require_fields(&NewBook::from(&incoming))?;
    let now = now_rfc3339()?;

    let mut registry = registry.write().await;
    let stored = registry
        .books
        .get_mut(&id)
        .ok_or_else(|| AppError::not_found(format!("Book {id} not found")))?;

    *stored = Book {
        created_at: stored.created_at.clone(),
        modified_at: now,
        ..incoming
    };
    tracing::info!(book_id = id, active = stored.active, "book updated");

    Ok(Json(stored.clone()))
}

async fn delete_book(
    State(registry): State<SharedRegistry>,
    Path(id): Path<BookId>,
) -> Result<StatusCode, AppError> {
    registry
        .write()
        .await
        .books
        .remove(&id)
        .ok_or_else(|| AppError::not_found(format!("Book {id} not found")))?;
    tracing::info!(book_id = id, "book deleted");

    Ok(StatusCode::OK)
}
