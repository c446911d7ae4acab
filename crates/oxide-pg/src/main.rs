//! oxide-pg CLI
//!
//! Inspects a live PostgreSQL schema through the catalog introspector.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_pg::{load_settings, PgCatalog};
use oxide_pg_core::builder::{build_alter_table_foreign_keys_queries, build_create_table_query};
use oxide_pg_core::catalog::Introspector;

/// Annotation-driven PostgreSQL table models.
#[derive(Parser)]
#[command(name = "oxide-pg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string.
    #[arg(short, long, env = "DATABASE_URL")]
    database_url: String,

    /// Schema to inspect; overrides the settings file.
    #[arg(short, long, env = "PG_SEARCH_PATH")]
    search_path: Option<String>,

    /// JSON settings file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables and the annotation of every column.
    Tables {
        /// Tables to list (all if not specified).
        tables: Vec<String>,

        /// Render the strict annotation form.
        #[arg(long)]
        strict: bool,
    },

    /// Print CREATE TABLE statements rebuilt from the live catalog.
    Ddl {
        /// Tables to print (all if not specified).
        tables: Vec<String>,
    },

    /// List triggers.
    Triggers {
        /// Tables whose triggers to list (all if not specified).
        tables: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = load_settings(cli.config.as_deref(), cli.search_path.as_deref())?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&cli.database_url)
        .await?;
    let catalog = PgCatalog::new(pool);
    let introspector = Introspector::new(&catalog, &settings);

    match cli.command {
        Commands::Tables { tables, strict } => {
            let tables = introspector.list_tables(&tables).await?;
            info!(search_path = %introspector.search_path(), tables = tables.len(), "listing tables");

            for table in &tables {
                println!("\n{} ({}) {}", table.name, table.kind.as_str(), table.record_name());
                if !table.description.is_empty() {
                    println!("  -- {}", table.description);
                }
                for column in &table.columns {
                    println!("  {}", column.field_tag(&settings.tag_key, strict));
                }
            }
        }

        Commands::Ddl { tables } => {
            let tables = introspector.list_tables(&tables).await?;
            let base_tables: Vec<_> = tables.iter().filter(|t| !t.is_read_only()).collect();

            for table in &base_tables {
                for statement in build_create_table_query(table)? {
                    println!("{statement}");
                }
            }
            for table in &base_tables {
                for statement in build_alter_table_foreign_keys_queries(table) {
                    println!("{statement}");
                }
            }
        }

        Commands::Triggers { tables } => {
            let triggers = introspector.list_triggers(&tables).await?;
            if triggers.is_empty() {
                info!("No triggers found.");
            }
            for trigger in &triggers {
                println!(
                    "{}.{} {} {} {} {}",
                    trigger.table_name,
                    trigger.name,
                    trigger.action_timing,
                    trigger.manipulation,
                    trigger.action_orientation,
                    trigger.action_statement
                );
            }
        }
    }

    Ok(())
}
