//! Kernel of the bookshelf application: layered settings, the module contract and the
//! registry that drives module lifecycles.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
pub use settings::{
    ConversionSettings, Environment, LogFormat, ServerSettings, Settings, StorageFormat,
    StorageSettings, TelemetrySettings,
};
