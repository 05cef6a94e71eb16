//! HTTP handlers for the bookshelf triggers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bookshelf_db::{
    run_conversion, sql::SqlBookshelf, xml::XmlBookshelf, BookshelfReader, ConversionReport,
};
use bookshelf_http::error::AppError;
use bookshelf_kernel::{ConversionSettings, Settings, StorageFormat};

use super::models::{BookshelfPage, SchemaReport};
use crate::utils;

pub fn router(settings: Arc<Settings>) -> Router {
    Router::new()
        .route("/", get(display))
        .route("/test", post(copy_xml))
        .route("/save-to-sqlite", post(xml_to_sql))
        .route("/save-to-xml", post(sql_to_xml))
        .route("/save-to-mongo", post(xml_to_document))
        .route("/mongo-to-xml", post(document_to_xml))
        .route("/init-db", post(init_db))
        .with_state(settings)
}

/// Read the XML source and return it ready for rendering.
async fn display(State(settings): State<Arc<Settings>>) -> Result<Json<BookshelfPage>, AppError> {
    let bookshelf = XmlBookshelf::new(&settings.storage.xml_source).read().await?;
    let prefix = &settings.server.static_prefix;

    Ok(Json(BookshelfPage {
        bookshelf: bookshelf.into(),
        covers_dir: utils::asset_dir(prefix, "data/covers"),
        img_dir: utils::asset_dir(prefix, "img"),
        css_dir: utils::asset_dir(prefix, "css"),
    }))
}

async fn copy_xml(settings: State<Arc<Settings>>) -> Result<Json<ConversionReport>, AppError> {
    convert_between(&settings, StorageFormat::Xml, StorageFormat::Xml).await
}

async fn xml_to_sql(settings: State<Arc<Settings>>) -> Result<Json<ConversionReport>, AppError> {
    convert_between(&settings, StorageFormat::Xml, StorageFormat::Sql).await
}

async fn sql_to_xml(settings: State<Arc<Settings>>) -> Result<Json<ConversionReport>, AppError> {
    convert_between(&settings, StorageFormat::Sql, StorageFormat::Xml).await
}

async fn xml_to_document(
    settings: State<Arc<Settings>>,
) -> Result<Json<ConversionReport>, AppError> {
    convert_between(&settings, StorageFormat::Xml, StorageFormat::Document).await
}

async fn document_to_xml(
    settings: State<Arc<Settings>>,
) -> Result<Json<ConversionReport>, AppError> {
    convert_between(&settings, StorageFormat::Document, StorageFormat::Xml).await
}

async fn convert_between(
    settings: &Settings,
    source: StorageFormat,
    destination: StorageFormat,
) -> Result<Json<ConversionReport>, AppError> {
    let conversion = ConversionSettings::new(source, destination, &settings.storage);
    let report = run_conversion(&conversion, &settings.storage).await?;
    Ok(Json(report))
}

/// Create the relational tables. Fails with a server error if they already exist.
async fn init_db(
    State(settings): State<Arc<Settings>>,
) -> Result<(StatusCode, Json<SchemaReport>), AppError> {
    let url = &settings.storage.sqlite_url;
    let store = SqlBookshelf::connect(url, &settings.storage.user_id).await?;
    let outcome = store.init_schema().await;
    store.pool().close().await;
    outcome?;

    tracing::info!(sqlite_url = %url, "relational schema created");
    Ok((
        StatusCode::CREATED,
        Json(SchemaReport {
            sqlite_url: url.clone(),
            tables: bookshelf_db::sql::SCHEMA.len(),
        }),
    ))
}
