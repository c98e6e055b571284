use comfy_table::{presets::UTF8_FULL, Cell, Table};

use catalog_app::utils::format_timestamp;
use catalog_kernel::Book;

const HEADERS: [&str; 8] = [
    "ID",
    "Book title",
    "Author name",
    "Category",
    "ISBN",
    "Created At",
    "Modified/Edited At",
    "Actions",
];

/// Actions available on a row; delete is only offered once deactivated.
pub fn row_actions(book: &Book) -> &'static str {
    if book.active {
        "Edit, Deactivate"
    } else {
        "Edit, Activate, Delete"
    }
}

pub fn book_table(books: &[Book]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(HEADERS);

    for book in books {
        let title = if book.active {
            book.title.clone()
        } else {
            format!("{} (deactivated)", book.title)
        };
        table.add_row(vec![
            Cell::new(book.id),
            Cell::new(title),
            Cell::new(&book.author),
            Cell::new(&book.category),
            Cell::new(&book.isbn),
            Cell::new(format_timestamp(&book.created_at)),
            Cell::new(format_timestamp(&book.modified_at)),
            Cell::new(row_actions(book)),
        ]);
    }

    table
}
