//! Relational adapter backed by SQLite.
//!
//! The bookshelf is normalized into four tables:
//!
//! - `users` keyed by the string identifier, also holding the shelf title and intro
//! - `authors` and `books`, each owned by a user
//! - `books_authors` linking books to authors
//!
//! Deleting a user cascades to its books, authors and links, which is what makes
//! [`SqlBookshelf::write`] a replace rather than an append.

use std::{collections::HashMap, str::FromStr};

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    SqliteConnection,
};

use crate::{
    adapter::{BookshelfReader, BookshelfWriter},
    error::{StorageError, StorageResult},
    model::{Author, Book, Bookshelf, NameAndUrl, Publish, Publisher, User},
};

/// DDL for the bookshelf schema, executed in order by [`SqlBookshelf::init_schema`].
pub const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE users (
        identifier VARCHAR PRIMARY KEY ASC,
        name VARCHAR,
        email VARCHAR,
        title VARCHAR,
        intro VARCHAR
    )
    "#,
    r#"
    CREATE TABLE books (
        id INTEGER PRIMARY KEY,
        user VARCHAR,
        name VARCHAR,
        url VARCHAR,
        cover VARCHAR,
        publisher_name VARCHAR,
        publisher_url VARCHAR,
        year INTEGER,
        pages INTEGER,
        my_rating INTEGER,
        my_review VARCHAR,
        FOREIGN KEY(user) REFERENCES users(identifier) ON DELETE CASCADE ON UPDATE CASCADE
    )
    "#,
    r#"
    CREATE TABLE authors (
        id INTEGER PRIMARY KEY,
        user VARCHAR,
        name VARCHAR,
        url VARCHAR,
        FOREIGN KEY(user) REFERENCES users(identifier) ON DELETE CASCADE ON UPDATE CASCADE
    )
    "#,
    r#"
    CREATE TABLE books_authors (
        book_id INTEGER,
        author_id INTEGER,
        PRIMARY KEY(book_id, author_id),
        FOREIGN KEY(book_id) REFERENCES books(id) ON DELETE CASCADE ON UPDATE CASCADE,
        FOREIGN KEY(author_id) REFERENCES authors(id) ON DELETE CASCADE ON UPDATE CASCADE
    )
    "#,
];

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    identifier: String,
    name: String,
    email: String,
    title: String,
    intro: String,
}

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i64,
    name: String,
    url: String,
    cover: String,
    publisher_name: String,
    publisher_url: String,
    year: i32,
    pages: i32,
    my_rating: i32,
    my_review: String,
}

#[derive(Debug, sqlx::FromRow)]
struct AuthorRow {
    id: i64,
    name: String,
    url: String,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: Some(row.id),
            name: row.name,
            authors: Vec::new(),
            publish: Publish {
                publisher: Publisher::new(row.publisher_name, row.publisher_url),
                year: row.year,
                pages: row.pages,
            },
            url: row.url,
            cover: row.cover,
            my_rating: row.my_rating,
            my_review: row.my_review,
        }
    }
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Author {
            id: Some(row.id),
            link: NameAndUrl::new(row.name, row.url),
        }
    }
}

/// Reads and writes bookshelves in a SQLite database.
///
/// The adapter owns a single-connection pool; dropping the adapter releases it.
#[derive(Debug, Clone)]
pub struct SqlBookshelf {
    pool: SqlitePool,
    user_id: String,
}

impl SqlBookshelf {
    /// Wrap an existing pool. `user_id` selects the shelf returned by [`BookshelfReader::read`].
    pub fn new(pool: SqlitePool, user_id: impl Into<String>) -> Self {
        Self {
            pool,
            user_id: user_id.into(),
        }
    }

    /// Open the database at `url`, creating the file if needed.
    ///
    /// Foreign keys are switched on for the connection so deletes cascade.
    pub async fn connect(url: &str, user_id: impl Into<String>) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::Connection(format!("{}: {}", url, e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection(format!("{}: {}", url, e)))?;

        tracing::debug!(url, "opened SQLite bookshelf store");
        Ok(Self::new(pool, user_id))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Create the four bookshelf tables.
    ///
    /// Not guarded against re-running: a second call fails with [`StorageError::Schema`].
    pub async fn init_schema(&self) -> StorageResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Schema(e.to_string()))?;
        }

        tracing::info!("bookshelf schema created");
        Ok(())
    }

    /// Load the shelf owned by `user_id`.
    ///
    /// A missing user yields an empty [`Bookshelf`], not an error.
    pub async fn read_user(&self, user_id: &str) -> StorageResult<Bookshelf> {
        let user = sqlx::query_as::<_, UserRow>(
            "SELECT identifier, name, email, title, intro FROM users WHERE identifier = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = user else {
            tracing::debug!(user_id, "no bookshelf stored for user");
            return Ok(Bookshelf::default());
        };

        let rows = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT id, name, url, cover, publisher_name, publisher_url, year, pages, my_rating, my_review
            FROM books
            WHERE user = ?
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut books = Vec::with_capacity(rows.len());
        for row in rows {
            let mut book = Book::from(row);
            book.authors = self.book_authors(book.id.unwrap_or_default()).await?;
            books.push(book);
        }

        tracing::debug!(user_id, books = books.len(), "bookshelf read from SQLite");

        Ok(Bookshelf {
            user: User {
                id: user.identifier,
                name: user.name,
                email: user.email,
            },
            title: user.title,
            intro: user.intro,
            books,
        })
    }

    async fn book_authors(&self, book_id: i64) -> StorageResult<Vec<Author>> {
        let rows = sqlx::query_as::<_, AuthorRow>(
            r#"
            SELECT authors.id, authors.name, authors.url
            FROM books_authors
            JOIN authors ON authors.id = books_authors.author_id
            WHERE books_authors.book_id = ?
            ORDER BY books_authors.rowid
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Author::from).collect())
    }

    /// Replace everything stored for the bookshelf's user with `bookshelf`.
    ///
    /// Runs in one transaction: on any failure nothing is changed.
    pub async fn replace(&self, bookshelf: &Bookshelf) -> StorageResult<()> {
        let user_id = bookshelf.user.require_id("sql")?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM users WHERE identifier = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO users (identifier, name, email, title, intro) VALUES (?, ?, ?, ?, ?)")
            .bind(user_id)
            .bind(&bookshelf.user.name)
            .bind(&bookshelf.user.email)
            .bind(&bookshelf.title)
            .bind(&bookshelf.intro)
            .execute(&mut *tx)
            .await?;

        let author_ids = insert_authors(&mut tx, user_id, bookshelf).await?;

        for book in &bookshelf.books {
            let book_id = insert_book(&mut tx, user_id, book).await?;

            for author in &book.authors {
                let author_id = author_ids[&author.link];
                sqlx::query("INSERT INTO books_authors (book_id, author_id) VALUES (?, ?)")
                    .bind(book_id)
                    .bind(author_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            user_id,
            books = bookshelf.books.len(),
            authors = author_ids.len(),
            "bookshelf written to SQLite"
        );
        Ok(())
    }
}

/// Insert each distinct (name, url) author once and return the assigned ids.
async fn insert_authors<'a>(
    conn: &mut SqliteConnection,
    user_id: &str,
    bookshelf: &'a Bookshelf,
) -> StorageResult<HashMap<&'a NameAndUrl, i64>> {
    let mut ids = HashMap::new();

    for author in bookshelf.books.iter().flat_map(|book| book.authors.iter()) {
        if ids.contains_key(&author.link) {
            continue;
        }

        let result = sqlx::query("INSERT INTO authors (user, name, url) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(author.name())
            .bind(author.url())
            .execute(&mut *conn)
            .await?;

        ids.insert(&author.link, result.last_insert_rowid());
    }

    Ok(ids)
}

async fn insert_book(conn: &mut SqliteConnection, user_id: &str, book: &Book) -> StorageResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO books (
            user, name, url, cover, publisher_name, publisher_url,
            year, pages, my_rating, my_review
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&book.name)
    .bind(&book.url)
    .bind(&book.cover)
    .bind(book.publish.publisher.name())
    .bind(book.publish.publisher.url())
    .bind(book.publish.year)
    .bind(book.publish.pages)
    .bind(book.my_rating)
    .bind(&book.my_review)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

#[async_trait]
impl BookshelfReader for SqlBookshelf {
    async fn read(&self) -> StorageResult<Bookshelf> {
        self.read_user(&self.user_id).await
    }
}

#[async_trait]
impl BookshelfWriter for SqlBookshelf {
    async fn write(&self, bookshelf: &Bookshelf) -> StorageResult<()> {
        self.replace(bookshelf).await
    }
}
