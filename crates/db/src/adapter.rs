//! The two capabilities every storage format provides.
//!
//! Adapters are bound to their location (file path, database plus user identifier) when
//! they are constructed, so conversion code only ever sees these traits and never the
//! concrete format behind them.

use async_trait::async_trait;

use crate::{error::StorageResult, model::Bookshelf};

/// Produces a freshly constructed [`Bookshelf`] from one storage location.
#[async_trait]
pub trait BookshelfReader: Send + Sync {
    async fn read(&self) -> StorageResult<Bookshelf>;
}

/// Persists a [`Bookshelf`] into one storage location.
#[async_trait]
pub trait BookshelfWriter: Send + Sync {
    async fn write(&self, bookshelf: &Bookshelf) -> StorageResult<()>;
}
