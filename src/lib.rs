//! Bookshelf application library
//!
//! Application modules and the startup sequence shared by the server binary and the CLI.

pub mod modules;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use bookshelf_kernel::{InitCtx, ModuleRegistry, Settings};

/// Build the registry, initialize its modules and serve HTTP until shutdown
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let settings = Arc::new(settings);

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings.clone())
        .context("failed to register modules")?;

    registry
        .init_modules(&InitCtx {
            settings: &settings,
        })
        .await?;

    let served = bookshelf_http::start_server(&registry, &settings).await;
    registry.stop_modules().await?;
    served
}
