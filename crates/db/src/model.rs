//! Canonical, format-independent representation of a bookshelf.
//!
//! Every adapter reads into and writes from these types; no adapter depends on another.
//! Numeric identifiers are assigned by the relational store and are `None` for values
//! read from formats that do not carry them.

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Upper bound of the personal rating scale.
pub const MAX_RATING: i32 = 5;

/// Root aggregate: one user's shelf of books.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookshelf {
    pub user: User,
    pub title: String,
    pub intro: String,
    pub books: Vec<Book>,
}

impl Bookshelf {
    /// Number of distinct authors across all books, keyed by name and url.
    pub fn unique_author_count(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        self.books
            .iter()
            .flat_map(|book| book.authors.iter())
            .filter(|author| seen.insert(&author.link))
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Storage key for the relational and document formats; empty when read from XML.
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl User {
    /// Returns the identifier, failing when a keyed store would receive an empty key.
    pub fn require_id(&self, format: &'static str) -> StorageResult<&str> {
        if self.id.is_empty() {
            return Err(StorageError::MissingUserId(format));
        }
        Ok(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub authors: Vec<Author>,
    pub publish: Publish,
    pub url: String,
    pub cover: String,
    /// Personal rating on a 0 to [`MAX_RATING`] scale.
    pub my_rating: i32,
    pub my_review: String,
}

impl Book {
    /// Rating expressed on a 0 to 100 scale.
    pub fn my_rating_percent(&self) -> i32 {
        self.my_rating * (100 / MAX_RATING)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publish {
    pub publisher: Publisher,
    pub year: i32,
    pub pages: i32,
}

/// The name and url pair shared by publishers and authors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameAndUrl {
    pub name: String,
    pub url: String,
}

impl NameAndUrl {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    #[serde(flatten)]
    pub link: NameAndUrl,
}

impl Publisher {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            link: NameAndUrl::new(name, url),
        }
    }

    pub fn name(&self) -> &str {
        &self.link.name
    }

    pub fn url(&self) -> &str {
        &self.link.url
    }
}

/// A book's author. Authors with the same name and url are the same person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub link: NameAndUrl,
}

impl Author {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            link: NameAndUrl::new(name, url),
        }
    }

    pub fn name(&self) -> &str {
        &self.link.name
    }

    pub fn url(&self) -> &str {
        &self.link.url
    }
}
