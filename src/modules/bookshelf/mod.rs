pub mod models;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Module, Settings};
use serde_json::json;

/// Bookshelf display and storage conversion triggers
pub struct BookshelfModule {
    settings: Arc<Settings>,
}

impl BookshelfModule {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Module for BookshelfModule {
    fn name(&self) -> &'static str {
        "bookshelf"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let storage = &ctx.settings.storage;
        if tokio::fs::metadata(&storage.xml_source).await.is_err() {
            tracing::warn!(
                module = self.name(),
                xml_source = %storage.xml_source,
                "XML source not found; display and XML conversions will fail until it exists"
            );
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            sqlite_url = %storage.sqlite_url,
            mongo_database = %storage.mongo_database,
            user_id = %storage.user_id,
            "bookshelf module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.settings.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let conversion = |summary: &str| {
            json!({
                "post": {
                    "summary": summary,
                    "tags": ["Bookshelf"],
                    "responses": {
                        "200": {
                            "description": "Conversion finished",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/ConversionReport" }
                                }
                            }
                        },
                        "400": error("Destination needs a user identifier"),
                        "404": error("Source file, row or document not found"),
                        "409": error("Destination rejected the bookshelf"),
                        "422": error("Source could not be parsed"),
                        "500": error("Storage backend failure")
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Display the bookshelf from the XML source",
                        "tags": ["Bookshelf"],
                        "responses": {
                            "200": {
                                "description": "Bookshelf page model",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookshelfPage" }
                                    }
                                }
                            },
                            "404": error("XML source not found"),
                            "422": error("XML source could not be parsed")
                        }
                    }
                },
                "/test": conversion("Copy the XML source to the XML copy target"),
                "/save-to-sqlite": conversion("Replace the user's shelf in SQLite with the XML source"),
                "/save-to-xml": conversion("Export the user's shelf from SQLite to XML"),
                "/save-to-mongo": conversion("Insert the XML source into MongoDB as a new document"),
                "/mongo-to-xml": conversion("Export the user's shelf from MongoDB to XML"),
                "/init-db": {
                    "post": {
                        "summary": "Create the SQLite tables",
                        "tags": ["Bookshelf"],
                        "responses": {
                            "201": {
                                "description": "Schema created",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/SchemaReport" }
                                    }
                                }
                            },
                            "500": error("Schema already exists or database unreachable")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "ConversionReport": {
                        "type": "object",
                        "properties": {
                            "source": { "type": "string", "enum": ["xml", "sql", "document"] },
                            "destination": { "type": "string", "enum": ["xml", "sql", "document"] },
                            "source_location": { "type": "string" },
                            "destination_location": { "type": "string" },
                            "user_id": { "type": "string" },
                            "books": { "type": "integer" },
                            "authors": { "type": "integer", "description": "Distinct (name, url) pairs" }
                        },
                        "required": ["source", "destination", "source_location", "destination_location", "user_id", "books", "authors"]
                    },
                    "SchemaReport": {
                        "type": "object",
                        "properties": {
                            "sqlite_url": { "type": "string" },
                            "tables": { "type": "integer" }
                        },
                        "required": ["sqlite_url", "tables"]
                    },
                    "NameAndUrl": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "url": { "type": "string" }
                        },
                        "required": ["name", "url"]
                    },
                    "Book": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "authors": { "type": "array", "items": { "$ref": "#/components/schemas/NameAndUrl" } },
                            "publish": {
                                "type": "object",
                                "properties": {
                                    "publisher": { "$ref": "#/components/schemas/NameAndUrl" },
                                    "year": { "type": "integer" },
                                    "pages": { "type": "integer" }
                                }
                            },
                            "url": { "type": "string" },
                            "cover": { "type": "string" },
                            "my_rating": { "type": "integer", "minimum": 0, "maximum": 5 },
                            "my_rating_percent": { "type": "integer", "minimum": 0, "maximum": 100 },
                            "my_review": { "type": "string" }
                        }
                    },
                    "BookshelfPage": {
                        "type": "object",
                        "properties": {
                            "bookshelf": {
                                "type": "object",
                                "properties": {
                                    "user": {
                                        "type": "object",
                                        "properties": {
                                            "id": { "type": "string" },
                                            "name": { "type": "string" },
                                            "email": { "type": "string" }
                                        }
                                    },
                                    "title": { "type": "string" },
                                    "intro": { "type": "string" },
                                    "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } }
                                }
                            },
                            "covers_dir": { "type": "string" },
                            "img_dir": { "type": "string" },
                            "css_dir": { "type": "string" }
                        }
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "bookshelf module stopped");
        Ok(())
    }
}

/// Create a new instance of the bookshelf module
pub fn create_module(settings: Arc<Settings>) -> Arc<dyn Module> {
    Arc::new(BookshelfModule::new(settings))
}
