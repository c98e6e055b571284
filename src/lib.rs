//! Book catalog client.
//!
//! [`CatalogStore`] keeps an in-memory catalog consistent with the remote book
//! service and derives the filtered view on every read. [`RecordEditor`] owns a
//! single draft record from hydration through submission.

pub mod modules;
pub mod utils;

pub use modules::books::{
    CatalogStore, DraftMode, Field, Filter, Outcome, RecordEditor, StoreError, SubmitError,
    Submission, ValidationResult, ViewSummary,
};
