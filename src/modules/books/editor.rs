//! Single-record editor: hydrate, edit, validate, submit.
//!
//! The editor never touches a [`CatalogStore`](super::CatalogStore). It hands
//! the confirmed record back through [`Submission`] and the caller decides
//! whether to reload or absorb it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use catalog_kernel::{Book, BookId, BookService, NewBook, RemoteError};

const GENERIC_FAILURE: &str = "An error occurred. Please try again.";

/// Editable fields of a book record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Author,
    Category,
    Isbn,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Title, Field::Author, Field::Category, Field::Isbn];

    /// Key used in request bodies and validation results.
    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Author => "author",
            Field::Category => "category",
            Field::Isbn => "isbn",
        }
    }

    /// Form label.
    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "Book title",
            Field::Author => "Author name",
            Field::Category => "Category",
            Field::Isbn => "ISBN",
        }
    }

    pub fn required_message(self) -> &'static str {
        match self {
            Field::Title => "Title is required",
            Field::Author => "Author is required",
            Field::Category => "Category is required",
            Field::Isbn => "ISBN is required",
        }
    }

    fn value(self, draft: &NewBook) -> &str {
        match self {
            Field::Title => &draft.title,
            Field::Author => &draft.author,
            Field::Category => &draft.category,
            Field::Isbn => &draft.isbn,
        }
    }

    fn value_mut(self, draft: &mut NewBook) -> &mut String {
        match self {
            Field::Title => &mut draft.title,
            Field::Author => &mut draft.author,
            Field::Category => &mut draft.category,
            Field::Isbn => &mut draft.isbn,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Per-field error messages; only invalid fields have an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: BTreeMap<Field, &'static str>,
}

impl ValidationResult {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.errors.iter().map(|(field, message)| (*field, *message))
    }
}

/// Whether the draft will create a record or rewrite an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DraftMode {
    #[default]
    New,
    /// Holds the record as fetched; the draft's fields are laid over it on submit.
    Editing(Book),
}

impl DraftMode {
    pub fn id(&self) -> Option<BookId> {
        match self {
            DraftMode::New => None,
            DraftMode::Editing(book) => Some(book.id),
        }
    }
}

/// Result of the last submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Idle,
    Success(String),
    Failure(String),
}

/// A record the service has accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Created(Book),
    Updated(Book),
}

impl Submission {
    pub fn book(&self) -> &Book {
        match self {
            Submission::Created(book) | Submission::Updated(book) => book,
        }
    }

    pub fn into_book(self) -> Book {
        match self {
            Submission::Created(book) | Submission::Updated(book) => book,
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(ValidationResult),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Owns one draft record for the lifetime of a form.
pub struct RecordEditor {
    service: Arc<dyn BookService>,
    mode: DraftMode,
    draft: NewBook,
    validation: ValidationResult,
    outcome: Outcome,
}

impl RecordEditor {
    /// Editor with an empty draft in [`DraftMode::New`].
    pub fn new(service: Arc<dyn BookService>) -> Self {
        Self {
            service,
            mode: DraftMode::New,
            draft: NewBook::default(),
            validation: ValidationResult::default(),
            outcome: Outcome::Idle,
        }
    }

    pub fn mode(&self) -> &DraftMode {
        &self.mode
    }

    pub fn draft(&self) -> &NewBook {
        &self.draft
    }

    pub fn field(&self, field: Field) -> &str {
        field.value(&self.draft)
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Loads the record to edit when `id` is given; `None` keeps a new draft.
    ///
    /// A failed fetch is logged and leaves an empty draft in
    /// [`DraftMode::New`], so the form stays usable.
    pub async fn hydrate(&mut self, id: Option<BookId>) -> Result<(), RemoteError> {
        let Some(id) = id else {
            return Ok(());
        };

        match self.service.get(id).await {
            Ok(book) => {
                self.draft = NewBook::from(&book);
                self.mode = DraftMode::Editing(book);
                tracing::debug!(book_id = id, "editor hydrated");
                Ok(())
            }
            Err(err) => {
                self.draft = NewBook::default();
                self.mode = DraftMode::New;
                tracing::error!(book_id = id, error = %err, "failed to fetch book for editing");
                Err(err)
            }
        }
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        *field.value_mut(&mut self.draft) = value.into();
    }

    /// Recomputes per-field messages; true when every required field is filled.
    pub fn validate(&mut self) -> bool {
        self.validation = ValidationResult {
            errors: Field::ALL
                .into_iter()
                .filter(|field| field.value(&self.draft).is_empty())
                .map(|field| (field, field.required_message()))
                .collect(),
        };
        self.validation.is_empty()
    }

    /// Validates, then creates or updates the record depending on the mode.
    ///
    /// An invalid draft never reaches the service. On a remote failure the
    /// draft is kept so the user can retry.
    pub async fn submit(&mut self) -> Result<Submission, SubmitError> {
        if !self.validate() {
            return Err(SubmitError::Invalid(self.validation.clone()));
        }

        let result = match &self.mode {
            DraftMode::New => self
                .service
                .create(&self.draft)
                .await
                .map(Submission::Created),
            DraftMode::Editing(base) => self
                .service
                .update(&base.with_fields(&self.draft))
                .await
                .map(Submission::Updated),
        };

        match result {
            Ok(submission) => {
                let message = match &submission {
                    Submission::Created(_) => "Book added successfully!",
                    Submission::Updated(_) => "Book updated successfully!",
                };
                self.outcome = Outcome::Success(message.to_string());
                // A second submit from the same form must not create a duplicate.
                self.mode = DraftMode::Editing(submission.book().clone());
                tracing::info!(book_id = submission.book().id, "record submitted");
                Ok(submission)
            }
            Err(err) => {
                let fallback = match (&err, &self.mode) {
                    (RemoteError::Transport(_), _) => GENERIC_FAILURE,
                    (_, DraftMode::New) => "Failed to add book.",
                    (_, DraftMode::Editing(_)) => "Failed to update book.",
                };
                self.outcome = Outcome::Failure(err.user_message(fallback));
                tracing::warn!(book_id = ?self.mode.id(), error = %err, "record submission failed");
                Err(err.into())
            }
        }
    }
}
