use std::{fmt, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit directory and environment name.
    pub fn load_from(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(config::Environment::with_prefix("BOOKSHELF").separator("__"));

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = match environment {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Directory holding covers, images and stylesheets.
    #[serde(default = "ServerSettings::default_public_dir")]
    pub public_dir: String,
    /// URL prefix the public directory is served under.
    #[serde(default = "ServerSettings::default_static_prefix")]
    pub static_prefix: String,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    fn default_public_dir() -> String {
        "public".to_string()
    }

    fn default_static_prefix() -> String {
        "/s".to_string()
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            public_dir: Self::default_public_dir(),
            static_prefix: Self::default_static_prefix(),
        }
    }
}

/// Persistence format a bookshelf can be read from or written to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    Xml,
    Sql,
    Document,
}

impl StorageFormat {
    /// Whether the format stores the owning user's identifier.
    pub fn carries_user_id(self) -> bool {
        !matches!(self, StorageFormat::Xml)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StorageFormat::Xml => "xml",
            StorageFormat::Sql => "sql",
            StorageFormat::Document => "document",
        }
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" => Ok(StorageFormat::Xml),
            "sql" | "sqlite" | "relational" => Ok(StorageFormat::Sql),
            "document" | "mongo" | "mongodb" => Ok(StorageFormat::Document),
            other => Err(format!(
                "unknown storage format '{}'; expected xml/sql/document",
                other
            )),
        }
    }
}

/// Locations of every storage backend plus the user identifier stamped on keyless sources.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "StorageSettings::default_xml_source")]
    pub xml_source: String,
    #[serde(default = "StorageSettings::default_xml_copy_target")]
    pub xml_copy_target: String,
    #[serde(default = "StorageSettings::default_xml_from_sql_target")]
    pub xml_from_sql_target: String,
    #[serde(default = "StorageSettings::default_xml_from_document_target")]
    pub xml_from_document_target: String,
    #[serde(default = "StorageSettings::default_sqlite_url")]
    pub sqlite_url: String,
    #[serde(default = "StorageSettings::default_mongo_dsn")]
    pub mongo_dsn: String,
    #[serde(default = "StorageSettings::default_mongo_database")]
    pub mongo_database: String,
    #[serde(default = "StorageSettings::default_mongo_collection")]
    pub mongo_collection: String,
    #[serde(default = "StorageSettings::default_user_id")]
    pub user_id: String,
}

impl StorageSettings {
    fn default_xml_source() -> String {
        "public/data/feedbee.xml".to_string()
    }

    fn default_xml_copy_target() -> String {
        "public/data/feedbee-test.xml".to_string()
    }

    fn default_xml_from_sql_target() -> String {
        "public/data/feedbee-from-sql.xml".to_string()
    }

    fn default_xml_from_document_target() -> String {
        "public/data/feedbee-from-mongo.xml".to_string()
    }

    fn default_sqlite_url() -> String {
        "sqlite://db.sqlite".to_string()
    }

    fn default_mongo_dsn() -> String {
        "mongodb://localhost:27017".to_string()
    }

    fn default_mongo_database() -> String {
        "bookshelf".to_string()
    }

    fn default_mongo_collection() -> String {
        "bookshelves".to_string()
    }

    fn default_user_id() -> String {
        "feedbee".to_string()
    }

    /// Location a format is read from by default.
    pub fn source_location(&self, format: StorageFormat) -> &str {
        match format {
            StorageFormat::Xml => &self.xml_source,
            StorageFormat::Sql => &self.sqlite_url,
            StorageFormat::Document => &self.mongo_dsn,
        }
    }

    /// Location a format is written to by default when fed from `source`.
    pub fn destination_location(&self, source: StorageFormat, destination: StorageFormat) -> &str {
        match (source, destination) {
            (StorageFormat::Xml, StorageFormat::Xml) => &self.xml_copy_target,
            (StorageFormat::Sql, StorageFormat::Xml) => &self.xml_from_sql_target,
            (StorageFormat::Document, StorageFormat::Xml) => &self.xml_from_document_target,
            (_, StorageFormat::Sql) => &self.sqlite_url,
            (_, StorageFormat::Document) => &self.mongo_dsn,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            xml_source: Self::default_xml_source(),
            xml_copy_target: Self::default_xml_copy_target(),
            xml_from_sql_target: Self::default_xml_from_sql_target(),
            xml_from_document_target: Self::default_xml_from_document_target(),
            sqlite_url: Self::default_sqlite_url(),
            mongo_dsn: Self::default_mongo_dsn(),
            mongo_database: Self::default_mongo_database(),
            mongo_collection: Self::default_mongo_collection(),
            user_id: Self::default_user_id(),
        }
    }
}

/// One conversion: which format to read, which to write, where, and for whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSettings {
    pub source: StorageFormat,
    pub destination: StorageFormat,
    pub source_location: String,
    pub destination_location: String,
    pub user_id: String,
}

impl ConversionSettings {
    /// Build a conversion using the configured default locations and user identifier.
    pub fn new(source: StorageFormat, destination: StorageFormat, storage: &StorageSettings) -> Self {
        Self {
            source,
            destination,
            source_location: storage.source_location(source).to_string(),
            destination_location: storage.destination_location(source, destination).to_string(),
            user_id: storage.user_id.clone(),
        }
    }

    pub fn with_source_location(mut self, location: impl Into<String>) -> Self {
        self.source_location = location.into();
        self
    }

    pub fn with_destination_location(mut self, location: impl Into<String>) -> Self {
        self.destination_location = location.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Identifier to stamp on the bookshelf between read and write, if any.
    ///
    /// Only keyless sources feeding keyed destinations need one.
    pub fn stamped_user_id(&self) -> Option<&str> {
        (!self.source.carries_user_id() && self.destination.carries_user_id())
            .then_some(self.user_id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_storage_points_at_feedbee() {
        let settings = Settings::default();
        assert_eq!(settings.storage.xml_source, "public/data/feedbee.xml");
        assert_eq!(settings.storage.user_id, "feedbee");
        assert_eq!(settings.storage.mongo_collection, "bookshelves");
    }

    #[test]
    fn storage_format_parses_aliases() {
        assert_eq!("XML".parse::<StorageFormat>(), Ok(StorageFormat::Xml));
        assert_eq!("sqlite".parse::<StorageFormat>(), Ok(StorageFormat::Sql));
        assert_eq!("mongo".parse::<StorageFormat>(), Ok(StorageFormat::Document));
        assert!("csv".parse::<StorageFormat>().is_err());
    }

    #[test]
    fn xml_destination_depends_on_source() {
        let storage = StorageSettings::default();
        let copy = ConversionSettings::new(StorageFormat::Xml, StorageFormat::Xml, &storage);
        let from_sql = ConversionSettings::new(StorageFormat::Sql, StorageFormat::Xml, &storage);
        let from_doc = ConversionSettings::new(StorageFormat::Document, StorageFormat::Xml, &storage);

        assert_eq!(copy.destination_location, "public/data/feedbee-test.xml");
        assert_eq!(from_sql.source_location, "sqlite://db.sqlite");
        assert_eq!(from_sql.destination_location, "public/data/feedbee-from-sql.xml");
        assert_eq!(from_doc.destination_location, "public/data/feedbee-from-mongo.xml");
    }

    #[test]
    fn user_id_is_stamped_only_from_keyless_to_keyed() {
        let storage = StorageSettings::default();
        let stamped = |source, destination| {
            ConversionSettings::new(source, destination, &storage)
                .stamped_user_id()
                .map(str::to_string)
        };

        assert_eq!(stamped(StorageFormat::Xml, StorageFormat::Sql), Some("feedbee".to_string()));
        assert_eq!(stamped(StorageFormat::Xml, StorageFormat::Document), Some("feedbee".to_string()));
        assert_eq!(stamped(StorageFormat::Xml, StorageFormat::Xml), None);
        assert_eq!(stamped(StorageFormat::Sql, StorageFormat::Xml), None);
        assert_eq!(stamped(StorageFormat::Document, StorageFormat::Sql), None);
    }

    #[test]
    fn overrides_replace_default_locations() {
        let conversion = ConversionSettings::new(
            StorageFormat::Xml,
            StorageFormat::Sql,
            &StorageSettings::default(),
        )
        .with_source_location("shelf.xml")
        .with_destination_location("sqlite::memory:")
        .with_user_id("alice");

        assert_eq!(conversion.source_location, "shelf.xml");
        assert_eq!(conversion.destination_location, "sqlite::memory:");
        assert_eq!(conversion.stamped_user_id(), Some("alice"));
    }

    #[test]
    fn load_from_missing_directory_uses_defaults() {
        let settings = Settings::load_from(std::path::Path::new("does/not/exist"), "staging")
            .expect("defaults should load");
        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn load_from_rejects_unknown_environment() {
        let result = Settings::load_from(std::path::Path::new("does/not/exist"), "qa");
        assert!(result.is_err());
    }
}
