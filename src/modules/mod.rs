pub mod bookshelf;

use std::sync::Arc;

use bookshelf_kernel::{ModuleRegistry, Settings};

/// Register all application modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, settings: Arc<Settings>) -> anyhow::Result<()> {
    registry.register(bookshelf::create_module(settings))?;
    Ok(())
}
