//! XML file adapter.
//!
//! The file layout nests everything under a `bookshelf` root:
//!
//! ```xml
//! <bookshelf>
//!   <user><name/><email/></user>
//!   <title/><intro/>
//!   <books>
//!     <book>
//!       <name/>
//!       <authors><author><name/><url/></author></authors>
//!       <publish><publisher><name/><url/></publisher><year/><pages/></publish>
//!       <url/><cover/>
//!       <my><rating/><review/></my>
//!     </book>
//!   </books>
//! </bookshelf>
//! ```
//!
//! The format has no identifier fields: user ids and book/author ids are dropped on
//! write and come back empty on read.

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    adapter::{BookshelfReader, BookshelfWriter},
    error::{StorageError, StorageResult},
    model::{Author, Book, Bookshelf, NameAndUrl, Publish, Publisher, User},
};

/// Declaration written ahead of every document.
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

const ROOT_ELEMENT: &str = "bookshelf";

#[derive(Debug, Serialize, Deserialize)]
struct BookshelfXml {
    user: UserXml,
    title: String,
    intro: String,
    #[serde(default)]
    books: BooksXml,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserXml {
    name: String,
    email: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BooksXml {
    #[serde(default, rename = "book")]
    items: Vec<BookXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BookXml {
    name: String,
    #[serde(default)]
    authors: AuthorsXml,
    publish: PublishXml,
    url: String,
    cover: String,
    my: MyXml,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AuthorsXml {
    #[serde(default, rename = "author")]
    items: Vec<NameAndUrl>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PublishXml {
    publisher: NameAndUrl,
    year: i32,
    pages: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct MyXml {
    rating: i32,
    review: String,
}

impl From<BookshelfXml> for Bookshelf {
    fn from(xml: BookshelfXml) -> Self {
        Bookshelf {
            user: User {
                id: String::new(),
                name: xml.user.name,
                email: xml.user.email,
            },
            title: xml.title,
            intro: xml.intro,
            books: xml.books.items.into_iter().map(Book::from).collect(),
        }
    }
}

impl From<BookXml> for Book {
    fn from(xml: BookXml) -> Self {
        Book {
            id: None,
            name: xml.name,
            authors: xml
                .authors
                .items
                .into_iter()
                .map(|link| Author { id: None, link })
                .collect(),
            publish: Publish {
                publisher: Publisher {
                    link: xml.publish.publisher,
                },
                year: xml.publish.year,
                pages: xml.publish.pages,
            },
            url: xml.url,
            cover: xml.cover,
            my_rating: xml.my.rating,
            my_review: xml.my.review,
        }
    }
}

impl From<&Bookshelf> for BookshelfXml {
    fn from(bookshelf: &Bookshelf) -> Self {
        BookshelfXml {
            user: UserXml {
                name: bookshelf.user.name.clone(),
                email: bookshelf.user.email.clone(),
            },
            title: bookshelf.title.clone(),
            intro: bookshelf.intro.clone(),
            books: BooksXml {
                items: bookshelf.books.iter().map(BookXml::from).collect(),
            },
        }
    }
}

impl From<&Book> for BookXml {
    fn from(book: &Book) -> Self {
        BookXml {
            name: book.name.clone(),
            authors: AuthorsXml {
                items: book.authors.iter().map(|a| a.link.clone()).collect(),
            },
            publish: PublishXml {
                publisher: book.publish.publisher.link.clone(),
                year: book.publish.year,
                pages: book.publish.pages,
            },
            url: book.url.clone(),
            cover: book.cover.clone(),
            my: MyXml {
                rating: book.my_rating,
                review: book.my_review.clone(),
            },
        }
    }
}

/// Parses an XML document into the canonical shape.
pub fn parse_bookshelf(text: &str) -> StorageResult<Bookshelf> {
    let xml: BookshelfXml =
        quick_xml::de::from_str(text).map_err(|e| StorageError::Parse(e.to_string()))?;
    Ok(xml.into())
}

/// Renders a bookshelf as an indented XML document, declaration included.
pub fn render_bookshelf(bookshelf: &Bookshelf) -> StorageResult<String> {
    let mut body = String::new();
    let mut serializer = quick_xml::se::Serializer::with_root(&mut body, Some(ROOT_ELEMENT))
        .map_err(|e| StorageError::Parse(e.to_string()))?;
    serializer.indent('\t', 1);
    BookshelfXml::from(bookshelf)
        .serialize(serializer)
        .map_err(|e| StorageError::Parse(e.to_string()))?;

    Ok(format!("{XML_HEADER}{body}\n"))
}

/// Reads and writes a bookshelf stored as one XML file.
#[derive(Debug, Clone)]
pub struct XmlBookshelf {
    path: PathBuf,
}

impl XmlBookshelf {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Hidden sibling of `path` that a write fills before renaming it into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| OsStr::new(ROOT_ELEMENT)));
    name.push(".tmp");
    path.with_file_name(name)
}

fn file_error(path: &Path, err: std::io::Error) -> StorageError {
    match StorageError::from(err) {
        StorageError::NotFound(msg) => {
            StorageError::NotFound(format!("bookshelf file {}: {}", path.display(), msg))
        }
        StorageError::Io(msg) => StorageError::Io(format!("{}: {}", path.display(), msg)),
        other => other,
    }
}

#[async_trait]
impl BookshelfReader for XmlBookshelf {
    async fn read(&self) -> StorageResult<Bookshelf> {
        let path = std::path::absolute(&self.path).map_err(|e| file_error(&self.path, e))?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| file_error(&path, e))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| StorageError::Parse(format!("{}: {}", path.display(), e)))?;

        let bookshelf = parse_bookshelf(&text).map_err(|e| match e {
            StorageError::Parse(msg) => StorageError::Parse(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;

        tracing::debug!(
            path = %path.display(),
            books = bookshelf.books.len(),
            "bookshelf read from XML"
        );
        Ok(bookshelf)
    }
}

#[async_trait]
impl BookshelfWriter for XmlBookshelf {
    async fn write(&self, bookshelf: &Bookshelf) -> StorageResult<()> {
        let document = render_bookshelf(bookshelf)?;

        // Readers only ever see the old file or the complete new one.
        let staging = staging_path(&self.path);
        if let Err(e) = tokio::fs::write(&staging, document).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(file_error(&self.path, e));
        }
        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(file_error(&self.path, e));
        }

        tracing::info!(
            path = %self.path.display(),
            books = bookshelf.books.len(),
            "bookshelf written to XML"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bookshelf {
        let shared = Author::new("Kent Beck", "https://www.kentbeck.com");
        Bookshelf {
            user: User {
                id: String::new(),
                name: "Valera".into(),
                email: "feedbee@example.com".into(),
            },
            title: "Books I read".into(),
            intro: "Mostly software & craft".into(),
            books: vec![
                Book {
                    id: None,
                    name: "Extreme Programming Explained".into(),
                    authors: vec![shared.clone(), Author::new("Cynthia Andres", "https://example.com/ca")],
                    publish: Publish {
                        publisher: Publisher::new("Addison-Wesley", "https://aw.com"),
                        year: 2004,
                        pages: 224,
                    },
                    url: "https://example.com/xp".into(),
                    cover: "xp.jpg".into(),
                    my_rating: 5,
                    my_review: "Changed how I work.".into(),
                },
                Book {
                    id: None,
                    name: "Test Driven Development".into(),
                    authors: vec![shared],
                    publish: Publish {
                        publisher: Publisher::new("Addison-Wesley", "https://aw.com"),
                        year: 2002,
                        pages: 240,
                    },
                    url: "https://example.com/tdd".into(),
                    cover: "tdd.jpg".into(),
                    my_rating: 4,
                    my_review: "Red, green, refactor.".into(),
                },
            ],
        }
    }

    #[test]
    fn render_then_parse_reproduces_every_field() {
        let shelf = sample();
        let text = render_bookshelf(&shelf).unwrap();
        assert_eq!(parse_bookshelf(&text).unwrap(), shelf);
    }

    #[test]
    fn render_drops_identifiers() {
        let mut shelf = sample();
        shelf.user.id = "feedbee".into();
        shelf.books[0].id = Some(7);
        shelf.books[0].authors[0].id = Some(3);

        let text = render_bookshelf(&shelf).unwrap();
        assert!(!text.contains("feedbee<"));
        assert!(!text.contains("<id>"));

        let parsed = parse_bookshelf(&text).unwrap();
        assert_eq!(parsed.user.id, "");
        assert_eq!(parsed.books[0].id, None);
        assert_eq!(parsed.books[0].authors[0].id, None);
    }

    #[test]
    fn render_starts_with_declaration_and_nests_rating() {
        let text = render_bookshelf(&sample()).unwrap();
        assert!(text.starts_with(XML_HEADER));
        assert!(text.contains("<bookshelf>"));
        assert!(text.contains("<my>"));
        assert!(text.contains("<rating>5</rating>"));
        assert!(text.contains("\t<title>Books I read</title>"));
    }

    #[test]
    fn parse_accepts_shelf_without_books() {
        let text = "<bookshelf><user><name>A</name><email>a@b</email></user>\
                    <title>T</title><intro>I</intro></bookshelf>";
        let shelf = parse_bookshelf(text).unwrap();
        assert_eq!(shelf.user.name, "A");
        assert!(shelf.books.is_empty());
    }

    #[test]
    fn parse_rejects_missing_required_element() {
        let text = "<bookshelf><user><name>A</name><email>a@b</email></user>\
                    <intro>I</intro><books/></bookshelf>";
        assert!(matches!(parse_bookshelf(text), Err(StorageError::Parse(_))));
    }

    #[test]
    fn parse_rejects_malformed_document() {
        let text = "<bookshelf><user><name>A</name></bookshelf>";
        assert!(matches!(parse_bookshelf(text), Err(StorageError::Parse(_))));
    }

    #[test]
    fn parse_rejects_non_numeric_year() {
        let text = "<bookshelf><user><name>A</name><email>a@b</email></user>\
                    <title>T</title><intro>I</intro><books><book><name>B</name>\
                    <authors/><publish><publisher><name>P</name><url>u</url></publisher>\
                    <year>soon</year><pages>1</pages></publish><url>u</url><cover>c</cover>\
                    <my><rating>1</rating><review>r</review></my></book></books></bookshelf>";
        assert!(matches!(parse_bookshelf(text), Err(StorageError::Parse(_))));
    }

    #[tokio::test]
    async fn write_then_read_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = XmlBookshelf::new(dir.path().join("shelf.xml"));

        adapter.write(&sample()).await.unwrap();
        assert_eq!(adapter.read().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn write_truncates_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = XmlBookshelf::new(dir.path().join("shelf.xml"));

        adapter.write(&sample()).await.unwrap();
        let mut smaller = sample();
        smaller.books.truncate(1);
        adapter.write(&smaller).await.unwrap();

        assert_eq!(adapter.read().await.unwrap().books.len(), 1);
    }

    #[test]
    fn render_then_parse_keeps_surrounding_whitespace_and_markup() {
        let mut shelf = sample();
        shelf.title = " ".into();
        shelf.intro = String::new();
        shelf.user.name = "  Valera ".into();
        shelf.books[0].my_review = "  Line one.\n  Line two.  ".into();
        shelf.books[0].name = "Fish & Chips <2nd ed.>".into();
        shelf.books[1].authors.clear();

        let text = render_bookshelf(&shelf).unwrap();
        assert_eq!(parse_bookshelf(&text).unwrap(), shelf);

        let mut empty = sample();
        empty.books.clear();
        let text = render_bookshelf(&empty).unwrap();
        assert_eq!(parse_bookshelf(&text).unwrap(), empty);
    }

    #[tokio::test]
    async fn read_non_utf8_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.xml");
        tokio::fs::write(
            &path,
            b"<bookshelf><user><name>Caf\xe9</name><email>a@b</email></user>\
              <title>T</title><intro>I</intro></bookshelf>",
        )
        .await
        .unwrap();

        let result = XmlBookshelf::new(&path).read().await;
        assert!(matches!(result, Err(StorageError::Parse(_))), "unexpected {:?}", result);
    }

    #[tokio::test]
    async fn write_replaces_target_without_leaving_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.xml");
        tokio::fs::write(&path, "stale").await.unwrap();

        XmlBookshelf::new(&path).write(&sample()).await.unwrap();

        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            render_bookshelf(&sample()).unwrap()
        );
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("shelf.xml")]);
    }

    #[tokio::test]
    async fn write_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = XmlBookshelf::new(dir.path().join("nested").join("shelf.xml"));

        assert!(matches!(
            adapter.write(&sample()).await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn staging_path_is_hidden_sibling() {
        assert_eq!(
            staging_path(Path::new("public/data/shelf.xml")),
            PathBuf::from("public/data/.shelf.xml.tmp")
        );
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = XmlBookshelf::new(dir.path().join("absent.xml"));

        assert!(matches!(adapter.read().await, Err(StorageError::NotFound(_))));
    }
}
