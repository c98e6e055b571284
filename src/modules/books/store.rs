//! In-memory catalog kept consistent with the remote book service.
//!
//! `set_status` and `delete` apply locally first and keep a pre-image; a
//! failed remote confirmation restores it before the error is reported.
//! `update` only touches local state once the service has accepted it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use catalog_kernel::{Book, BookId, BookService, RemoteError};

use super::lanes::RecordLanes;
use super::models::{Filter, ViewSummary};

const UPDATE_FAILED: &str = "Failed to update book.";
const DELETE_FAILED: &str = "Failed to delete book.";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("book {0} is not in the catalog")]
    UnknownBook(BookId),

    #[error("book {id} is already {}", status_word(.active))]
    InvalidTransition { id: BookId, active: bool },

    #[error("book {0} must be deactivated before it can be deleted")]
    StillActive(BookId),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

fn status_word(active: &bool) -> &'static str {
    if *active {
        "active"
    } else {
        "deactivated"
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    books: Vec<Book>,
    filter: Filter,
    notice: Option<String>,
}

impl CatalogState {
    fn position(&self, id: BookId) -> Option<usize> {
        self.books.iter().position(|book| book.id == id)
    }

    fn find_mut(&mut self, id: BookId) -> Option<&mut Book> {
        self.books.iter_mut().find(|book| book.id == id)
    }

    fn replace(&mut self, book: Book) {
        if let Some(slot) = self.find_mut(book.id) {
            *slot = book;
        }
    }
}

/// Owner of the client-side book list and the current filter selection.
pub struct CatalogStore {
    service: Arc<dyn BookService>,
    state: Mutex<CatalogState>,
    lanes: RecordLanes,
}

impl CatalogStore {
    pub fn new(service: Arc<dyn BookService>) -> Self {
        Self::with_filter(service, Filter::default())
    }

    pub fn with_filter(service: Arc<dyn BookService>, filter: Filter) -> Self {
        Self {
            service,
            state: Mutex::new(CatalogState {
                filter,
                ..CatalogState::default()
            }),
            lanes: RecordLanes::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the catalog with the service's full list.
    ///
    /// On failure the error is logged and the previous list is kept as is.
    pub async fn load(&self) -> Result<usize, StoreError> {
        let fetched = match self.service.list().await {
            Ok(books) => books,
            Err(err) => {
                tracing::error!(error = %err, "failed to load catalog");
                return Err(err.into());
            }
        };

        let mut seen = HashSet::with_capacity(fetched.len());
        let mut books = Vec::with_capacity(fetched.len());
        for book in fetched {
            if seen.insert(book.id) {
                books.push(book);
            } else {
                tracing::warn!(book_id = book.id, "dropping duplicate book from service list");
            }
        }

        let count = books.len();
        self.state().books = books;
        tracing::info!(count, "catalog loaded");
        Ok(count)
    }

    pub fn set_filter(&self, filter: Filter) {
        self.state().filter = filter;
        tracing::debug!(%filter, "filter changed");
    }

    pub fn filter(&self) -> Filter {
        self.state().filter
    }

    /// Every book in fetch order.
    pub fn books(&self) -> Vec<Book> {
        self.state().books.clone()
    }

    pub fn book(&self, id: BookId) -> Option<Book> {
        let state = self.state();
        state.books.iter().find(|book| book.id == id).cloned()
    }

    /// Books matching the current filter, recomputed from the list on each call.
    pub fn filtered_view(&self) -> Vec<Book> {
        let state = self.state();
        state.filter.apply(&state.books)
    }

    pub fn summary(&self) -> ViewSummary {
        let state = self.state();
        ViewSummary {
            showing: state.books.iter().filter(|b| state.filter.matches(b)).count(),
            total: state.books.len(),
        }
    }

    /// Message from the most recent failed write, cleared by the next success.
    pub fn notice(&self) -> Option<String> {
        self.state().notice.clone()
    }

    pub fn clear_notice(&self) {
        self.state().notice = None;
    }

    /// True while a write on `id` is in flight or queued behind another.
    pub fn is_pending(&self, id: BookId) -> bool {
        self.lanes.is_pending(id)
    }

    /// Merges a record confirmed elsewhere (e.g. by the editor) without I/O.
    ///
    /// Returns false and leaves the list alone while a write on the same id
    /// is in flight; that write's confirmation settles the record instead.
    pub fn absorb(&self, book: Book) -> bool {
        if self.lanes.is_pending(book.id) {
            tracing::debug!(book_id = book.id, "skipping absorb while a write is pending");
            return false;
        }

        let mut state = self.state();
        match state.find_mut(book.id) {
            Some(slot) => *slot = book,
            None => state.books.push(book),
        }
        true
    }

    pub async fn deactivate(&self, id: BookId) -> Result<Book, StoreError> {
        self.set_status(id, false).await
    }

    pub async fn activate(&self, id: BookId) -> Result<Book, StoreError> {
        self.set_status(id, true).await
    }

    /// Flips `active` locally, then asks the service to persist the record.
    ///
    /// The new status is visible to [`CatalogStore::filtered_view`] while the
    /// request is in flight. If the service refuses, the previous status is
    /// restored before the error is returned.
    pub async fn set_status(&self, id: BookId, active: bool) -> Result<Book, StoreError> {
        let _lane = self.lanes.acquire(id).await;

        let outgoing = {
            let mut state = self.state();
            let book = state.find_mut(id).ok_or(StoreError::UnknownBook(id))?;
            if book.active == active {
                return Err(StoreError::InvalidTransition { id, active });
            }
            book.active = active;
            book.clone()
        };

        match self.service.update(&outgoing).await {
            Ok(confirmed) => {
                let mut state = self.state();
                state.replace(confirmed.clone());
                state.notice = None;
                tracing::info!(book_id = id, active, "book status changed");
                Ok(confirmed)
            }
            Err(err) => {
                let mut state = self.state();
                if let Some(book) = state.find_mut(id) {
                    book.active = !active;
                }
                state.notice = Some(err.user_message(UPDATE_FAILED));
                tracing::warn!(book_id = id, active, error = %err, "status change rolled back");
                Err(err.into())
            }
        }
    }

    /// Removes a deactivated book locally, then asks the service to delete it.
    ///
    /// If the service refuses, the record is put back at its old position.
    pub async fn delete(&self, id: BookId) -> Result<Book, StoreError> {
        let _lane = self.lanes.acquire(id).await;

        let (index, removed) = {
            let mut state = self.state();
            let index = state.position(id).ok_or(StoreError::UnknownBook(id))?;
            if state.books[index].active {
                return Err(StoreError::StillActive(id));
            }
            (index, state.books.remove(index))
        };

        match self.service.delete(id).await {
            Ok(()) => {
                let mut state = self.state();
                // A load that ran meanwhile may have brought the record back.
                state.books.retain(|book| book.id != id);
                state.notice = None;
                tracing::info!(book_id = id, "book deleted");
                Ok(removed)
            }
            Err(err) => {
                let mut state = self.state();
                if state.position(id).is_none() {
                    let at = index.min(state.books.len());
                    state.books.insert(at, removed);
                }
                state.notice = Some(err.user_message(DELETE_FAILED));
                tracing::warn!(book_id = id, error = %err, "delete rolled back");
                Err(err.into())
            }
        }
    }

    /// Sends a full record to the service and adopts the confirmed version.
    ///
    /// Nothing changes locally unless the service accepts the update.
    pub async fn update(&self, book: Book) -> Result<Book, StoreError> {
        let id = book.id;
        let _lane = self.lanes.acquire(id).await;

        if self.state().position(id).is_none() {
            return Err(StoreError::UnknownBook(id));
        }

        match self.service.update(&book).await {
            Ok(confirmed) => {
                let mut state = self.state();
                state.replace(confirmed.clone());
                state.notice = None;
                tracing::info!(book_id = id, "book updated");
                Ok(confirmed)
            }
            Err(err) => {
                self.state().notice = Some(err.user_message(UPDATE_FAILED));
                tracing::warn!(book_id = id, error = %err, "book update failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::fake::{book, Call, FakeBookService, Op};

    fn rejected() -> RemoteError {
        RemoteError::Rejected {
            status: 500,
            message: None,
        }
    }

    async fn loaded(books: Vec<Book>) -> (Arc<FakeBookService>, CatalogStore) {
        let fake = Arc::new(FakeBookService::with_books(books));
        let store = CatalogStore::new(fake.clone());
        store.load().await.unwrap();
        (fake, store)
    }

    #[tokio::test]
    async fn load_replaces_books_in_fetch_order() {
        let (_fake, store) = loaded(vec![book(3, "C", true), book(1, "A", false)]).await;
        assert_eq!(
            store.books().iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![3, 1]
        );
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_books() {
        let (fake, store) = loaded(vec![book(1, "A", true)]).await;
        let before = store.books();

        fake.fail_next(Op::List, RemoteError::Transport("connection refused".to_string()));
        let err = store.load().await.unwrap_err();

        assert!(matches!(err, StoreError::Remote(RemoteError::Transport(_))));
        assert_eq!(store.books(), before);
        assert_eq!(store.notice(), None);
    }

    #[tokio::test]
    async fn load_drops_duplicate_ids() {
        let (_fake, store) = loaded(vec![book(1, "A", true), book(1, "A again", false)]).await;
        assert_eq!(store.books(), vec![book(1, "A", true)]);
    }

    #[tokio::test]
    async fn filter_scenario_show_deactivated_then_all() {
        let (_fake, store) = loaded(vec![book(1, "A", true)]).await;

        store.set_filter("Show Deactivated".parse().unwrap());
        assert!(store.filtered_view().is_empty());

        store.set_filter("Show All".parse().unwrap());
        assert_eq!(store.filtered_view(), vec![book(1, "A", true)]);
    }

    #[tokio::test]
    async fn set_filter_is_idempotent() {
        let (_fake, store) = loaded(vec![book(1, "A", true), book(2, "B", false)]).await;

        store.set_filter(Filter::Deactivated);
        let once = store.filtered_view();
        store.set_filter(Filter::Deactivated);
        assert_eq!(store.filtered_view(), once);
        assert_eq!(store.summary(), ViewSummary { showing: 1, total: 2 });
    }

    #[tokio::test]
    async fn view_follows_every_mutation() {
        let (_fake, store) = loaded(vec![book(1, "A", true), book(2, "B", true)]).await;
        assert_eq!(store.filtered_view().len(), 2);

        store.deactivate(1).await.unwrap();
        assert_eq!(store.filtered_view(), vec![store.book(2).unwrap()]);

        store.set_filter(Filter::Deactivated);
        assert_eq!(store.filtered_view(), vec![store.book(1).unwrap()]);

        store.delete(1).await.unwrap();
        assert!(store.filtered_view().is_empty());
        assert_eq!(store.summary(), ViewSummary { showing: 0, total: 1 });
    }

    #[tokio::test]
    async fn deactivate_sends_full_record_and_adopts_confirmation() {
        let (fake, store) = loaded(vec![book(1, "A", true)]).await;

        let confirmed = store.deactivate(1).await.unwrap();

        let mut expected = book(1, "A", true);
        expected.active = false;
        assert_eq!(fake.calls().last(), Some(&Call::Update(expected)));
        assert!(!confirmed.active);
        assert_eq!(confirmed.modified_at, "2024-02-01T00:00:00Z");
        assert_eq!(store.book(1), Some(confirmed));
    }

    #[tokio::test]
    async fn status_change_is_visible_before_confirmation_and_rolled_back_on_failure() {
        let (fake, store) = loaded(vec![book(1, "A", true)]).await;
        let store = Arc::new(store);
        fake.hold(Op::Update);
        fake.fail_next(Op::Update, rejected());

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.set_status(1, false).await }
        });
        fake.entered.notified().await;

        // Optimistic value is observable while the request is in flight.
        assert!(!store.book(1).unwrap().active);
        assert!(store.is_pending(1));
        store.set_filter(Filter::Deactivated);
        assert_eq!(store.filtered_view().len(), 1);

        fake.release_one();
        let err = task.await.unwrap().unwrap_err();

        assert!(matches!(err, StoreError::Remote(_)));
        assert!(store.book(1).unwrap().active);
        assert!(store.filtered_view().is_empty());
        assert_eq!(store.notice().as_deref(), Some("Failed to update book."));
        assert!(!store.is_pending(1));
        assert!(fake.books()[0].active);
    }

    #[tokio::test]
    async fn rollback_surfaces_remote_message() {
        let (fake, store) = loaded(vec![book(1, "A", false)]).await;
        fake.fail_next(
            Op::Update,
            RemoteError::Rejected {
                status: 409,
                message: Some("record is locked".to_string()),
            },
        );

        store.activate(1).await.unwrap_err();
        assert!(!store.book(1).unwrap().active);
        assert_eq!(store.notice().as_deref(), Some("record is locked"));

        store.activate(1).await.unwrap();
        assert!(store.book(1).unwrap().active);
        assert_eq!(store.notice(), None);
    }

    #[tokio::test]
    async fn status_transitions_are_gated() {
        let (fake, store) = loaded(vec![book(1, "A", true), book(2, "B", false)]).await;
        let calls_before = fake.calls().len();

        assert!(matches!(
            store.activate(1).await,
            Err(StoreError::InvalidTransition { id: 1, active: true })
        ));
        assert!(matches!(
            store.deactivate(2).await,
            Err(StoreError::InvalidTransition { id: 2, active: false })
        ));
        assert!(matches!(store.delete(1).await, Err(StoreError::StillActive(1))));
        assert!(matches!(store.set_status(9, false).await, Err(StoreError::UnknownBook(9))));
        assert!(matches!(store.delete(9).await, Err(StoreError::UnknownBook(9))));

        assert_eq!(fake.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn status_is_always_boolean_after_toggles() {
        let (_fake, store) = loaded(vec![book(1, "A", true)]).await;
        for expected in [false, true, false] {
            store.set_status(1, expected).await.unwrap();
            assert_eq!(store.book(1).unwrap().active, expected);
        }
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_entry() {
        let (fake, store) =
            loaded(vec![book(1, "A", false), book(2, "B", false), book(3, "C", true)]).await;

        let removed = store.delete(2).await.unwrap();

        assert_eq!(removed.id, 2);
        assert_eq!(
            store.books().iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(fake.calls().last(), Some(&Call::Delete(2)));
    }

    #[tokio::test]
    async fn failed_delete_leaves_books_unchanged() {
        let (fake, store) =
            loaded(vec![book(1, "A", false), book(2, "B", false), book(3, "C", true)]).await;
        let before = store.books();
        fake.fail_next(Op::Delete, rejected());

        let err = store.delete(2).await.unwrap_err();

        assert!(matches!(err, StoreError::Remote(_)));
        assert_eq!(store.books(), before);
        assert_eq!(store.notice().as_deref(), Some("Failed to delete book."));
    }

    #[tokio::test]
    async fn toggles_on_one_id_reach_the_service_in_issue_order() {
        let (fake, store) = loaded(vec![book(1, "A", true)]).await;
        let store = Arc::new(store);
        fake.hold(Op::Update);

        let first = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.deactivate(1).await }
        });
        fake.entered.notified().await;

        let second = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.activate(1).await }
        });
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        // The second toggle waits for the first to be confirmed.
        assert_eq!(fake.calls().len(), 2);
        assert!(!store.book(1).unwrap().active);

        fake.release_one();
        first.await.unwrap().unwrap();

        fake.entered.notified().await;
        assert!(store.book(1).unwrap().active);
        fake.release_one();
        second.await.unwrap().unwrap();

        let updates: Vec<bool> = fake
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(book) => Some(book.active),
                _ => None,
            })
            .collect();
        assert_eq!(updates, vec![false, true]);
        assert!(fake.books()[0].active);
        assert!(store.book(1).unwrap().active);
    }

    #[tokio::test]
    async fn update_applies_only_after_confirmation() {
        let (fake, store) = loaded(vec![book(1, "A", true)]).await;

        let mut edited = book(1, "A, second edition", true);
        fake.fail_next(Op::Update, rejected());
        store.update(edited.clone()).await.unwrap_err();
        assert_eq!(store.book(1).unwrap().title, "A");

        edited.isbn = "222".to_string();
        let confirmed = store.update(edited).await.unwrap();
        assert_eq!(store.book(1), Some(confirmed));
        assert_eq!(store.book(1).unwrap().isbn, "222");
    }

    #[tokio::test]
    async fn update_of_unknown_book_is_rejected_locally() {
        let (fake, store) = loaded(vec![]).await;
        assert!(matches!(
            store.update(book(4, "D", true)).await,
            Err(StoreError::UnknownBook(4))
        ));
        assert_eq!(fake.calls(), vec![Call::List]);
    }

    #[tokio::test]
    async fn load_during_pending_delete_does_not_resurrect_record() {
        let (fake, store) = loaded(vec![book(1, "A", false), book(2, "B", true)]).await;
        let store = Arc::new(store);
        fake.hold(Op::Delete);

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.delete(1).await }
        });
        fake.entered.notified().await;

        // The service has not applied the delete yet, so the refresh sees it.
        store.load().await.unwrap();
        assert!(store.book(1).is_some());

        fake.release_one();
        task.await.unwrap().unwrap();

        let ids = |books: Vec<Book>| books.into_iter().map(|b| b.id).collect::<Vec<_>>();
        assert_eq!(ids(store.books()), ids(fake.books()));
        assert_eq!(ids(store.books()), vec![2]);
    }

    #[tokio::test]
    async fn absorb_waits_out_pending_writes() {
        let (fake, store) = loaded(vec![book(1, "A", false)]).await;
        let store = Arc::new(store);
        fake.hold(Op::Delete);

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.delete(1).await }
        });
        fake.entered.notified().await;

        assert!(!store.absorb(book(1, "A revised", false)));
        fake.release_one();
        task.await.unwrap().unwrap();

        assert!(store.books().is_empty());
        assert!(store.absorb(book(2, "B", true)));
    }

    #[tokio::test]
    async fn absorb_upserts_by_id() {
        let (_fake, store) = loaded(vec![book(1, "A", true)]).await;

        assert!(store.absorb(book(1, "A revised", true)));
        assert!(store.absorb(book(2, "B", true)));

        assert_eq!(
            store.books().iter().map(|b| b.title.as_str()).collect::<Vec<_>>(),
            vec!["A revised", "B"]
        );
    }
}
