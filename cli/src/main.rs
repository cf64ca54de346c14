//! Fieldbridge CLI - export, diff and import entries against a store snapshot.
//!
//! The store is a JSON [`StoreSnapshot`] on disk. `import` saves changes as a
//! draft and writes the snapshot back; the canonical entry is never touched.
//! JSON results go to stdout, logs to stderr.

mod config;
mod error;

use crate::config::{Config, SeoMode};
use crate::error::{CliError, Result};
use clap::{Parser, Subcommand};
use fieldbridge_engine::{
    Error, Exporter, HandlerRegistry, Importer, MemoryStore, RecordId, SiteId, StoreSnapshot, UserId,
    DEFAULT_SITE_ID,
};
use serde_json::Value;
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when the draft fails validation.
const EXIT_REJECTED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "fieldbridge", version, about = "Field-aware entry export and draft import")]
struct Cli {
    /// Store snapshot path (overrides FIELDBRIDGE_STORE)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export an entry as a JSON document.
    Export {
        /// Entry id
        #[arg(long, required_unless_present = "path", conflicts_with = "path")]
        id: Option<RecordId>,
        /// Entry URI or slug
        #[arg(long)]
        path: Option<String>,
        #[arg(long, default_value_t = DEFAULT_SITE_ID)]
        site: SiteId,
        /// Output minified JSON
        #[arg(long)]
        min: bool,
    },
    /// Report which keys of an edited document differ from the stored entry.
    Diff {
        /// Document path, or `-` for stdin
        payload: String,
    },
    /// Save an edited document as a draft of its entry.
    Import {
        /// Document path, or `-` for stdin
        payload: String,
        /// Acting user recorded on the draft (overrides FIELDBRIDGE_USER_ID)
        #[arg(long)]
        user: Option<UserId>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "fieldbridge_cli=debug,fieldbridge_engine=debug"
    } else {
        "fieldbridge_cli=info,fieldbridge_engine=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    // Load configuration
    dotenvy::dotenv().ok();
    let mut config = Config::from_env()?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    let store = load_store(&config)?;
    let registry = build_registry(&store, config.seo);

    match cli.command {
        Command::Export { id, path, site, min } => {
            let exporter = Exporter::new(&store, registry.as_ref());
            let document = match (id, path) {
                (Some(id), _) => exporter.export_by_id(id, site)?,
                (None, Some(path)) => exporter.export_by_path(&path, site)?,
                (None, None) => {
                    return Err(Error::BadInput("either --id or --path is required".into()).into())
                }
            };
            print_json(&document.to_wire(), min)?;
        }
        Command::Diff { payload } => {
            let payload = read_payload(&payload)?;
            let changes = Importer::new(&store, registry.as_ref()).detect_changes(&payload)?;
            tracing::info!(entry_id = changes.entry_id, changed = ?changes.changed_keys(), "diff complete");
            print_json(&serde_json::to_value(&changes)?, false)?;
        }
        Command::Import { payload, user } => {
            let payload = read_payload(&payload)?;
            let acting_user = user.or(config.user_id);
            let result = Importer::new(&store, registry.as_ref()).import_record(&payload, acting_user)?;

            if result.draft_id.is_some() {
                save_store(&config.store_path, store.snapshot())?;
            }
            print_json(&serde_json::to_value(&result)?, false)?;

            if !result.success {
                tracing::warn!(entry_id = result.entry_id, "{}", result.message);
                return Ok(ExitCode::from(EXIT_REJECTED));
            }
            tracing::info!(entry_id = result.entry_id, draft_id = ?result.draft_id, "{}", result.message);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_store(config: &Config) -> Result<MemoryStore> {
    let path = &config.store_path;
    let json = fs::read_to_string(path).map_err(|e| CliError::file(path, e))?;
    let mut snapshot = StoreSnapshot::from_json(&json)?;
    if let Some(cp_url) = &config.cp_url {
        snapshot.cp_url = cp_url.clone();
    }
    tracing::debug!(path = %path.display(), records = snapshot.record_count(), "store loaded");
    Ok(MemoryStore::new(snapshot))
}

fn save_store(path: &Path, snapshot: StoreSnapshot) -> Result<()> {
    let json = snapshot.to_json_pretty()?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| CliError::file(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| CliError::file(path, e))?;
    tracing::debug!(path = %path.display(), "store saved");
    Ok(())
}

fn build_registry(store: &MemoryStore, seo: SeoMode) -> Arc<HandlerRegistry> {
    match seo {
        SeoMode::Auto => HandlerRegistry::bootstrap(store),
        SeoMode::On => HandlerRegistry::with_defaults(true),
        SeoMode::Off => HandlerRegistry::with_defaults(false),
    }
}

fn read_payload(source: &str) -> Result<Value> {
    let text = if source == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(source).map_err(|e| CliError::file(source, e))?
    };
    Ok(serde_json::from_str(&text)?)
}

fn print_json(value: &Value, min: bool) -> Result<()> {
    let out = if min {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{out}");
    Ok(())
}
