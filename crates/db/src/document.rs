//! Document-store adapter backed by MongoDB.
//!
//! One document holds a whole bookshelf with its books and authors embedded. The owning
//! user's identifier lives at `user.id` and is the lookup key. Writes insert a new
//! document every time; earlier documents for the same user are kept.

use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::{options::ClientOptions, Client, Collection};
use serde::{Deserialize, Serialize};

use crate::{
    adapter::{BookshelfReader, BookshelfWriter},
    error::{StorageError, StorageResult},
    model::{Author, Book, Bookshelf, NameAndUrl, Publish, Publisher, User},
};

/// Field holding the owning user's identifier.
pub const USER_ID_FIELD: &str = "user.id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookshelfDocument {
    pub user: UserDocument,
    pub title: String,
    pub intro: String,
    #[serde(default)]
    pub books: Vec<BookDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookDocument {
    pub name: String,
    #[serde(default)]
    pub authors: Vec<NameAndUrl>,
    pub publish: PublishDocument,
    pub url: String,
    pub cover: String,
    pub myrating: i32,
    pub myreview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishDocument {
    pub publisher: NameAndUrl,
    pub year: i32,
    pub pages: i32,
}

impl From<&Bookshelf> for BookshelfDocument {
    fn from(bookshelf: &Bookshelf) -> Self {
        BookshelfDocument {
            user: UserDocument {
                id: bookshelf.user.id.clone(),
                name: bookshelf.user.name.clone(),
                email: bookshelf.user.email.clone(),
            },
            title: bookshelf.title.clone(),
            intro: bookshelf.intro.clone(),
            books: bookshelf
                .books
                .iter()
                .map(|book| BookDocument {
                    name: book.name.clone(),
                    authors: book.authors.iter().map(|a| a.link.clone()).collect(),
                    publish: PublishDocument {
                        publisher: book.publish.publisher.link.clone(),
                        year: book.publish.year,
                        pages: book.publish.pages,
                    },
                    url: book.url.clone(),
                    cover: book.cover.clone(),
                    myrating: book.my_rating,
                    myreview: book.my_review.clone(),
                })
                .collect(),
        }
    }
}

impl From<BookshelfDocument> for Bookshelf {
    fn from(document: BookshelfDocument) -> Self {
        Bookshelf {
            user: User {
                id: document.user.id,
                name: document.user.name,
                email: document.user.email,
            },
            title: document.title,
            intro: document.intro,
            books: document
                .books
                .into_iter()
                .map(|book| Book {
                    id: None,
                    name: book.name,
                    authors: book
                        .authors
                        .into_iter()
                        .map(|link| Author { id: None, link })
                        .collect(),
                    publish: Publish {
                        publisher: Publisher {
                            link: book.publish.publisher,
                        },
                        year: book.publish.year,
                        pages: book.publish.pages,
                    },
                    url: book.url,
                    cover: book.cover,
                    my_rating: book.myrating,
                    my_review: book.myreview,
                })
                .collect(),
        }
    }
}

/// Filter selecting every document owned by `user_id`.
pub fn user_filter(user_id: &str) -> Document {
    doc! { USER_ID_FIELD: user_id }
}

/// Sort putting the earliest inserted document first.
///
/// Driver-generated `_id`s are ObjectIds, which lead with their creation time.
pub fn insertion_order() -> Document {
    doc! { "_id": 1 }
}

/// Reads and writes bookshelves as documents in one MongoDB collection.
#[derive(Debug, Clone)]
pub struct DocumentBookshelf {
    client: Client,
    collection: Collection<BookshelfDocument>,
    user_id: String,
}

impl DocumentBookshelf {
    pub fn new(client: Client, database: &str, collection: &str, user_id: impl Into<String>) -> Self {
        Self {
            collection: client.database(database).collection(collection),
            client,
            user_id: user_id.into(),
        }
    }

    /// Build a client for `dsn`. The driver connects lazily on first use.
    pub async fn connect(
        dsn: &str,
        database: &str,
        collection: &str,
        user_id: impl Into<String>,
    ) -> StorageResult<Self> {
        let options = ClientOptions::parse(dsn)
            .await
            .map_err(|e| StorageError::Connection(format!("{}: {}", dsn, e)))?;
        let client = Client::with_options(options)
            .map_err(|e| StorageError::Connection(format!("{}: {}", dsn, e)))?;

        tracing::debug!(database, collection, "opened MongoDB bookshelf store");
        Ok(Self::new(client, database, collection, user_id))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Load the shelf owned by `user_id`.
    ///
    /// When several documents match, the earliest inserted one wins.
    pub async fn read_user(&self, user_id: &str) -> StorageResult<Bookshelf> {
        let document = self
            .collection
            .find_one(user_filter(user_id))
            .sort(insertion_order())
            .await?
            .ok_or_else(|| {
                StorageError::NotFound(format!(
                    "bookshelf for user {} in collection {}",
                    user_id,
                    self.collection.name()
                ))
            })?;

        tracing::debug!(user_id, books = document.books.len(), "bookshelf read from MongoDB");
        Ok(document.into())
    }

    /// Insert `bookshelf` as a new document.
    pub async fn insert(&self, bookshelf: &Bookshelf) -> StorageResult<()> {
        let user_id = bookshelf.user.require_id("document")?;
        self.collection
            .insert_one(BookshelfDocument::from(bookshelf))
            .await?;

        tracing::info!(
            user_id,
            books = bookshelf.books.len(),
            collection = self.collection.name(),
            "bookshelf written to MongoDB"
        );
        Ok(())
    }

    /// Number of documents stored for `user_id`.
    pub async fn count_user(&self, user_id: &str) -> StorageResult<u64> {
        Ok(self.collection.count_documents(user_filter(user_id)).await?)
    }

    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

#[async_trait]
impl BookshelfReader for DocumentBookshelf {
    async fn read(&self) -> StorageResult<Bookshelf> {
        self.read_user(&self.user_id).await
    }
}

#[async_trait]
impl BookshelfWriter for DocumentBookshelf {
    async fn write(&self, bookshelf: &Bookshelf) -> StorageResult<()> {
        self.insert(bookshelf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{de::deserialize_from_bson, ser::serialize_to_bson, Bson};

    fn sample() -> Bookshelf {
        Bookshelf {
            user: User {
                id: "feedbee".into(),
                name: "Valera".into(),
                email: "feedbee@example.com".into(),
            },
            title: "Shelf".into(),
            intro: "Intro".into(),
            books: vec![Book {
                id: Some(11),
                name: "Refactoring".into(),
                authors: vec![Author {
                    id: Some(2),
                    link: NameAndUrl::new("Martin Fowler", "https://martinfowler.com"),
                }],
                publish: Publish {
                    publisher: Publisher::new("Addison-Wesley", "https://aw.com"),
                    year: 2018,
                    pages: 448,
                },
                url: "https://example.com/refactoring".into(),
                cover: "refactoring.jpg".into(),
                my_rating: 5,
                my_review: "Reread yearly.".into(),
            }],
        }
    }

    #[test]
    fn document_embeds_user_id_and_nested_books() {
        let bson = serialize_to_bson(&BookshelfDocument::from(&sample())).unwrap();
        let document = bson.as_document().unwrap();

        let user = document.get_document("user").unwrap();
        assert_eq!(user.get_str("id").unwrap(), "feedbee");

        let books = document.get_array("books").unwrap();
        let Bson::Document(book) = &books[0] else {
            panic!("book should be an embedded document");
        };
        assert_eq!(book.get_i32("myrating").unwrap(), 5);
        assert_eq!(book.get_str("myreview").unwrap(), "Reread yearly.");
        assert!(!book.contains_key("id"));

        let publisher = book.get_document("publish").unwrap().get_document("publisher").unwrap();
        assert_eq!(publisher.get_str("name").unwrap(), "Addison-Wesley");
    }

    #[test]
    fn document_round_trip_drops_only_numeric_ids() {
        let bson = serialize_to_bson(&BookshelfDocument::from(&sample())).unwrap();
        let restored: Bookshelf = deserialize_from_bson::<BookshelfDocument>(bson).unwrap().into();

        let mut expected = sample();
        expected.books[0].id = None;
        expected.books[0].authors[0].id = None;
        assert_eq!(restored, expected);
    }

    #[test]
    fn stored_object_id_is_ignored_on_decode() {
        let mut document = serialize_to_bson(&BookshelfDocument::from(&sample()))
            .unwrap()
            .as_document()
            .cloned()
            .unwrap();
        document.insert("_id", bson::oid::ObjectId::new());

        let restored: BookshelfDocument = deserialize_from_bson(Bson::Document(document)).unwrap();
        assert_eq!(restored.user.id, "feedbee");
    }

    #[test]
    fn user_filter_targets_embedded_id() {
        assert_eq!(user_filter("feedbee"), doc! { "user.id": "feedbee" });
    }

    #[test]
    fn insertion_order_sorts_object_ids_ascending() {
        assert_eq!(insertion_order(), doc! { "_id": 1 });

        let first = bson::oid::ObjectId::new();
        let second = bson::oid::ObjectId::new();
        assert!(first < second);
    }

    #[tokio::test]
    async fn insert_without_user_id_is_rejected_before_io() {
        let store = DocumentBookshelf::connect("mongodb://127.0.0.1:1", "bookshelf", "bookshelves", "")
            .await
            .unwrap();
        let mut shelf = sample();
        shelf.user.id.clear();

        assert!(matches!(
            store.write(&shelf).await,
            Err(StorageError::MissingUserId("document"))
        ));
    }
}
