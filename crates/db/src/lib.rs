//! Bookshelf storage: the canonical model and its three persistence formats.
//!
//! - **Model** ([`model`]) - format-independent bookshelf, books, authors and publishers
//! - **Adapters** ([`adapter`]) - the reader/writer traits every format implements
//! - **XML** ([`xml`]) - one nested XML file per bookshelf
//! - **Relational** ([`sql`]) - normalized SQLite tables with de-duplicated authors
//! - **Document** ([`document`]) - one embedded MongoDB document per bookshelf
//! - **Backends** ([`backend`]) - adapters opened from configuration at runtime
//! - **Conversion** ([`convert`]) - read from one adapter, write to another
//! - **Errors** ([`error`]) - the storage error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_db::{convert::convert, sql::SqlBookshelf, xml::XmlBookshelf};
//!
//! let source = XmlBookshelf::new("public/data/feedbee.xml");
//! let target = SqlBookshelf::connect("sqlite://db.sqlite", "feedbee").await?;
//! convert(&source, &target, Some("feedbee")).await?;
//! ```

pub mod adapter;
pub mod backend;
pub mod convert;
pub mod document;
pub mod error;
pub mod model;
pub mod sql;
pub mod xml;

pub use adapter::{BookshelfReader, BookshelfWriter};
pub use backend::Backend;
pub use convert::{convert, run_conversion, ConversionReport};
pub use error::{StorageError, StorageResult};
pub use model::{Author, Book, Bookshelf, NameAndUrl, Publish, Publisher, User};
