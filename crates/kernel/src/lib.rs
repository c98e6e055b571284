//! Core types shared by the catalog client, its remote service adapters, and
//! the command-line front end.

pub mod book;
pub mod service;
pub mod settings;

pub use book::{Book, BookId, NewBook};
pub use service::{BookService, RemoteError};
