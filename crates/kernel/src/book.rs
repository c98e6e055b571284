use serde::{Deserialize, Serialize};

/// Identifier assigned to a book by the remote service.
pub type BookId = u64;

/// A persisted catalog record.
///
/// `created_at` and `modified_at` are owned by the remote service and kept as
/// the opaque strings it sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub isbn: String,
    #[serde(default = "Book::default_active")]
    pub active: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub modified_at: String,
}

impl Book {
    fn default_active() -> bool {
        true
    }

    /// Copy of this record with the editable fields taken from `fields`.
    pub fn with_fields(&self, fields: &NewBook) -> Self {
        Self {
            title: fields.title.clone(),
            author: fields.author.clone(),
            category: fields.category.clone(),
            isbn: fields.isbn.clone(),
            ..self.clone()
        }
    }
}

/// Body of a create request: a book before the service has assigned an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub category: String,
    /// Numeric text, kept as a string so leading zeros survive.
    pub isbn: String,
}

impl From<&Book> for NewBook {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.clone(),
            isbn: book.isbn.clone(),
        }
    }
}
