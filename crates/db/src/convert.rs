//! Conversion orchestration: read one bookshelf, optionally stamp its owner, write it.

use bookshelf_kernel::{ConversionSettings, StorageFormat, StorageSettings};
use serde::Serialize;

use crate::{
    adapter::{BookshelfReader, BookshelfWriter},
    backend::Backend,
    error::StorageResult,
    model::Bookshelf,
};

/// Summary of a finished conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub source: StorageFormat,
    pub destination: StorageFormat,
    pub source_location: String,
    pub destination_location: String,
    pub user_id: String,
    pub books: usize,
    pub authors: usize,
}

/// Pipe one bookshelf from `reader` to `writer`.
///
/// `stamp_user_id` replaces the owner's identifier between read and write; nothing else
/// about the bookshelf is changed. The written value is returned.
pub async fn convert(
    reader: &dyn BookshelfReader,
    writer: &dyn BookshelfWriter,
    stamp_user_id: Option<&str>,
) -> StorageResult<Bookshelf> {
    let mut bookshelf = reader.read().await?;

    if let Some(user_id) = stamp_user_id {
        bookshelf.user.id = user_id.to_string();
    }

    writer.write(&bookshelf).await?;
    Ok(bookshelf)
}

/// Open both ends of `conversion`, run it, and release the connections.
pub async fn run_conversion(
    conversion: &ConversionSettings,
    storage: &StorageSettings,
) -> StorageResult<ConversionReport> {
    tracing::info!(
        source = %conversion.source,
        destination = %conversion.destination,
        user_id = %conversion.user_id,
        "conversion started"
    );

    let reader = Backend::open(
        conversion.source,
        &conversion.source_location,
        storage,
        &conversion.user_id,
    )
    .await?;
    let writer = match Backend::open(
        conversion.destination,
        &conversion.destination_location,
        storage,
        &conversion.user_id,
    )
    .await
    {
        Ok(writer) => writer,
        Err(e) => {
            reader.close().await;
            return Err(e);
        }
    };

    let outcome = convert(&reader, &writer, conversion.stamped_user_id()).await;

    reader.close().await;
    writer.close().await;

    let bookshelf = outcome?;
    let report = ConversionReport {
        source: conversion.source,
        destination: conversion.destination,
        source_location: conversion.source_location.clone(),
        destination_location: conversion.destination_location.clone(),
        user_id: bookshelf.user.id.clone(),
        books: bookshelf.books.len(),
        authors: bookshelf.unique_author_count(),
    };

    tracing::info!(
        source = %report.source,
        destination = %report.destination,
        books = report.books,
        authors = report.authors,
        "conversion finished"
    );
    Ok(report)
}
