//! Construction of adapters from configuration.
//!
//! A [`Backend`] is one opened storage location of any format. It implements both
//! adapter traits by delegating to the concrete adapter it wraps, so callers can pick
//! formats at runtime and hand the result to [`crate::convert`].

use async_trait::async_trait;
use bookshelf_kernel::{StorageFormat, StorageSettings};

use crate::{
    adapter::{BookshelfReader, BookshelfWriter},
    document::DocumentBookshelf,
    error::StorageResult,
    model::Bookshelf,
    sql::SqlBookshelf,
    xml::XmlBookshelf,
};

#[derive(Debug, Clone)]
pub enum Backend {
    Xml(XmlBookshelf),
    Sql(SqlBookshelf),
    Document(DocumentBookshelf),
}

impl Backend {
    /// Open `location` as `format`.
    ///
    /// `location` is a file path for XML, a SQLite URL for SQL and a MongoDB connection
    /// string for documents; database and collection names come from `storage`.
    /// `user_id` selects which shelf keyed formats read.
    pub async fn open(
        format: StorageFormat,
        location: &str,
        storage: &StorageSettings,
        user_id: &str,
    ) -> StorageResult<Self> {
        tracing::debug!(%format, location, user_id, "opening storage backend");

        Ok(match format {
            StorageFormat::Xml => Backend::Xml(XmlBookshelf::new(location)),
            StorageFormat::Sql => Backend::Sql(SqlBookshelf::connect(location, user_id).await?),
            StorageFormat::Document => Backend::Document(
                DocumentBookshelf::connect(
                    location,
                    &storage.mongo_database,
                    &storage.mongo_collection,
                    user_id,
                )
                .await?,
            ),
        })
    }

    pub fn format(&self) -> StorageFormat {
        match self {
            Backend::Xml(_) => StorageFormat::Xml,
            Backend::Sql(_) => StorageFormat::Sql,
            Backend::Document(_) => StorageFormat::Document,
        }
    }

    /// Release the backend's connections.
    pub async fn close(self) {
        match self {
            Backend::Xml(_) => {}
            Backend::Sql(store) => store.pool().close().await,
            Backend::Document(store) => store.shutdown().await,
        }
    }
}

#[async_trait]
impl BookshelfReader for Backend {
    async fn read(&self) -> StorageResult<Bookshelf> {
        match self {
            Backend::Xml(store) => store.read().await,
            Backend::Sql(store) => store.read().await,
            Backend::Document(store) => store.read().await,
        }
    }
}

#[async_trait]
impl BookshelfWriter for Backend {
    async fn write(&self, bookshelf: &Bookshelf) -> StorageResult<()> {
        match self {
            Backend::Xml(store) => store.write(bookshelf).await,
            Backend::Sql(store) => store.write(bookshelf).await,
            Backend::Document(store) => store.write(bookshelf).await,
        }
    }
}
