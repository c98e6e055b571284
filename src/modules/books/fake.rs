//! Scripted in-memory [`BookService`] for store and editor tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use catalog_kernel::{Book, BookId, BookService, NewBook, RemoteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    List,
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    List,
    Get(BookId),
    Create(NewBook),
    Update(Book),
    Delete(BookId),
}

pub(crate) struct FakeBookService {
    books: Mutex<Vec<Book>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<Vec<(Op, RemoteError)>>,
    held: Mutex<HashSet<Op>>,
    /// Signalled each time a held call starts waiting.
    pub(crate) entered: Notify,
    release: Semaphore,
}

impl Default for FakeBookService {
    fn default() -> Self {
        Self {
            books: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            held: Mutex::new(HashSet::new()),
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }
}

impl FakeBookService {
    pub(crate) fn with_books(books: Vec<Book>) -> Self {
        Self {
            books: Mutex::new(books),
            ..Self::default()
        }
    }

    pub(crate) fn books(&self) -> Vec<Book> {
        self.books.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Makes the next call of kind `op` fail with `err`.
    pub(crate) fn fail_next(&self, op: Op, err: RemoteError) {
        self.failures.lock().unwrap().push((op, err));
    }

    /// Calls of kind `op` block until [`FakeBookService::release_one`].
    pub(crate) fn hold(&self, op: Op) {
        self.held.lock().unwrap().insert(op);
    }

    pub(crate) fn release_one(&self) {
        self.release.add_permits(1);
    }

    async fn enter(&self, op: Op, call: Call) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);

        let held = self.held.lock().unwrap().contains(&op);
        if held {
            self.entered.notify_one();
            self.release
                .acquire()
                .await
                .expect("release semaphore closed")
                .forget();
        }

        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|(failing, _)| *failing == op) {
            Some(index) => Err(failures.remove(index).1),
            None => Ok(()),
        }
    }
}

fn not_found(id: BookId) -> RemoteError {
    RemoteError::Rejected {
        status: 404,
        message: Some(format!("Book {id} not found")),
    }
}

#[async_trait]
impl BookService for FakeBookService {
    async fn list(&self) -> Result<Vec<Book>, RemoteError> {
        self.enter(Op::List, Call::List).await?;
        Ok(self.books())
    }

    async fn get(&self, id: BookId) -> Result<Book, RemoteError> {
        self.enter(Op::Get, Call::Get(id)).await?;
        self.books()
            .into_iter()
            .find(|book| book.id == id)
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, book: &NewBook) -> Result<Book, RemoteError> {
        self.enter(Op::Create, Call::Create(book.clone())).await?;
        let mut books = self.books.lock().unwrap();
        let id = books.iter().map(|b| b.id).max().unwrap_or(0) + 1;
        let created = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.clone(),
            isbn: book.isbn.clone(),
            active: true,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            modified_at: "2024-01-01T00:00:00Z".to_string(),
        };
        books.push(created.clone());
        Ok(created)
    }

    async fn update(&self, book: &Book) -> Result<Book, RemoteError> {
        self.enter(Op::Update, Call::Update(book.clone())).await?;
        let mut books = self.books.lock().unwrap();
        let stored = books
            .iter_mut()
            .find(|stored| stored.id == book.id)
            .ok_or_else(|| not_found(book.id))?;
        *stored = Book {
            modified_at: "2024-02-01T00:00:00Z".to_string(),
            ..book.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: BookId) -> Result<(), RemoteError> {
        self.enter(Op::Delete, Call::Delete(id)).await?;
        let mut books = self.books.lock().unwrap();
        let index = books
            .iter()
            .position(|book| book.id == id)
            .ok_or_else(|| not_found(id))?;
        books.remove(index);
        Ok(())
    }
}

pub(crate) fn book(id: BookId, title: &str, active: bool) -> Book {
    Book {
        id,
        title: title.to_string(),
        author: "X".to_string(),
        category: "Fiction".to_string(),
        isbn: "111".to_string(),
        active,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        modified_at: "2024-01-01T00:00:00Z".to_string(),
    }
}
