use bookshelf_db::{Book, Bookshelf, User};
use serde::Serialize;

/// Everything the bookshelf page needs: the shelf plus where its assets live.
#[derive(Debug, Clone, Serialize)]
pub struct BookshelfPage {
    pub bookshelf: BookshelfView,
    /// Directory holding cover images, relative to the page
    pub covers_dir: String,
    pub img_dir: String,
    pub css_dir: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookshelfView {
    pub user: User,
    pub title: String,
    pub intro: String,
    pub books: Vec<BookView>,
}

/// A book with its rating already scaled for display.
#[derive(Debug, Clone, Serialize)]
pub struct BookView {
    #[serde(flatten)]
    pub book: Book,
    pub my_rating_percent: i32,
}

impl From<Bookshelf> for BookshelfView {
    fn from(bookshelf: Bookshelf) -> Self {
        Self {
            user: bookshelf.user,
            title: bookshelf.title,
            intro: bookshelf.intro,
            books: bookshelf.books.into_iter().map(BookView::from).collect(),
        }
    }
}

impl From<Book> for BookView {
    fn from(book: Book) -> Self {
        Self {
            my_rating_percent: book.my_rating_percent(),
            book,
        }
    }
}

/// Response of the schema provisioning trigger.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    pub sqlite_url: String,
    pub tables: usize,
}
