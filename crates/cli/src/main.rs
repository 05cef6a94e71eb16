use anyhow::Context;
use clap::{Parser, Subcommand};

use bookshelf_db::{sql::SqlBookshelf, xml::XmlBookshelf, BookshelfReader};
use bookshelf_kernel::{ConversionSettings, Settings, StorageFormat};

/// Display a bookshelf and move it between XML, SQLite and MongoDB storage
#[derive(Debug, Parser)]
#[command(name = "bookshelf-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Print the XML bookshelf as JSON
    Show {
        /// XML file to read instead of the configured source
        #[arg(long)]
        source: Option<String>,
    },
    /// Read a bookshelf from one format and write it to another
    Convert {
        /// Source format: xml, sql or document
        #[arg(long)]
        from: StorageFormat,
        /// Destination format: xml, sql or document
        #[arg(long)]
        to: StorageFormat,
        /// Source file path or connection string
        #[arg(long)]
        source: Option<String>,
        /// Destination file path or connection string
        #[arg(long)]
        destination: Option<String>,
        /// User identifier to read, and to stamp on XML sources
        #[arg(long)]
        user: Option<String>,
    },
    /// Create the SQLite tables
    InitDb {
        /// SQLite URL instead of the configured one
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => bookshelf_app::serve(settings).await,
        Command::Show { source } => show(&settings, source).await,
        Command::Convert {
            from,
            to,
            source,
            destination,
            user,
        } => {
            let mut conversion = ConversionSettings::new(from, to, &settings.storage);
            if let Some(source) = source {
                conversion = conversion.with_source_location(source);
            }
            if let Some(destination) = destination {
                conversion = conversion.with_destination_location(destination);
            }
            if let Some(user) = user {
                conversion = conversion.with_user_id(user);
            }
            convert(&settings, &conversion).await
        }
        Command::InitDb { url } => {
            let url = url.unwrap_or_else(|| settings.storage.sqlite_url.clone());
            init_db(&url, &settings.storage.user_id).await
        }
    }
}

async fn show(settings: &Settings, source: Option<String>) -> anyhow::Result<()> {
    let path = source.unwrap_or_else(|| settings.storage.xml_source.clone());
    let bookshelf = XmlBookshelf::new(&path)
        .read()
        .await
        .with_context(|| format!("failed to read bookshelf from {}", path))?;

    println!("{}", serde_json::to_string_pretty(&bookshelf)?);
    Ok(())
}

async fn convert(settings: &Settings, conversion: &ConversionSettings) -> anyhow::Result<()> {
    let report = bookshelf_db::run_conversion(conversion, &settings.storage)
        .await
        .with_context(|| {
            format!(
                "failed to convert {} ({}) to {} ({})",
                conversion.source,
                conversion.source_location,
                conversion.destination,
                conversion.destination_location
            )
        })?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn init_db(url: &str, user_id: &str) -> anyhow::Result<()> {
    let store = SqlBookshelf::connect(url, user_id)
        .await
        .with_context(|| format!("failed to open {}", url))?;
    let outcome = store.init_schema().await;
    store.pool().close().await;
    outcome.with_context(|| format!("failed to create schema in {}", url))?;

    println!("created {} tables in {}", bookshelf_db::sql::SCHEMA.len(), url);
    Ok(())
}
