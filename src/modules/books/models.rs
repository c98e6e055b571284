use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use catalog_kernel::Book;

/// Categories offered by the record form.
pub const CATEGORY_OPTIONS: [&str; 3] = ["Fiction", "Non-fiction", "Sci-Fi"];

/// Which slice of the catalog is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    All,
    #[default]
    Active,
    Deactivated,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Active, Filter::Deactivated];

    /// Label shown in the filter selector.
    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "Show All",
            Filter::Active => "Show Active",
            Filter::Deactivated => "Show Deactivated",
        }
    }

    pub fn matches(self, book: &Book) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => book.active,
            Filter::Deactivated => !book.active,
        }
    }

    /// Projects `books` through this filter, preserving order.
    pub fn apply(self, books: &[Book]) -> Vec<Book> {
        books
            .iter()
            .filter(|book| self.matches(book))
            .cloned()
            .collect()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown filter '{0}'; expected all, active, or deactivated")]
pub struct ParseFilterError(pub String);

impl FromStr for Filter {
    type Err = ParseFilterError;

    /// Accepts selector labels (`Show Active`) and short names (`active`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let short = normalized
            .strip_prefix("show ")
            .unwrap_or(normalized.as_str());

        match short {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "deactivated" | "inactive" => Ok(Filter::Deactivated),
            _ => Err(ParseFilterError(s.to_string())),
        }
    }
}

/// Record counter shown above the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSummary {
    pub showing: usize,
    pub total: usize,
}

impl fmt::Display for ViewSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Showing {} of {}", self.showing, self.total)
    }
}
