//! Catalog state and record editing for books.

pub mod editor;
pub mod models;
pub mod store;

mod lanes;

#[cfg(test)]
pub(crate) mod fake;

pub use editor::{DraftMode, Field, Outcome, RecordEditor, SubmitError, Submission, ValidationResult};
pub use models::{Filter, ParseFilterError, ViewSummary, CATEGORY_OPTIONS};
pub use store::{CatalogStore, StoreError};
