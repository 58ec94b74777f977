//! Catalog cache CLI
//!
//! Runs the refresh scheduler as a long-lived process, or single refreshes
//! and cache reads for inspection.

use std::path::PathBuf;

use catalog_cache::{
    App,
    app::load_inspiration_table,
    error::{AppError, Result},
    models::{Config, SnapshotKind},
};
use chrono::Utc;
use clap::{Parser, Subcommand};

/// catalog-cache - Brand Catalog Cache
#[derive(Parser, Debug)]
#[command(
    name = "catalog-cache",
    version,
    about = "Per-brand product catalog cache with keyword inspirations"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "storage/config.toml")]
    config: PathBuf,

    /// Override the snapshot directory from the configuration
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load snapshots and keep the cache refreshed until Ctrl-C
    Serve,

    /// Run one full refresh cycle now
    Refresh {
        /// Skip the cycle if both caches are still fresh
        #[arg(long)]
        if_due: bool,
    },

    /// Refresh a single brand
    RefreshBrand { brand: String },

    /// Print a brand's products as JSON
    Show {
        brand: String,

        /// Never contact the catalog
        #[arg(long)]
        cached_only: bool,
    },

    /// List inspirations, or print one as JSON
    Inspirations { id: Option<String> },

    /// Validate configuration and inspiration table
    Validate,

    /// Show current snapshot info
    Info,
}

/// Initialize logging from the verbosity flag or the configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let mut config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", cli.config.display());
            config
        }
        Err(e) => {
            log::warn!(
                "Config load failed from {}: {}. Using defaults.",
                cli.config.display(),
                e
            );
            Config::default()
        }
    };
    if let Some(dir) = &cli.storage_dir {
        config.paths.snapshot_dir = dir.to_string_lossy().to_string();
    }

    match cli.command {
        Command::Validate => validate(&config)?,
        command => run(command, config).await?,
    }

    log::info!("Done!");

    Ok(())
}

/// Validate configuration and the inspiration table.
fn validate(config: &Config) -> Result<()> {
    log::info!("Validating configuration...");
    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    log::info!("✓ Config OK ({} brands)", config.brands.len());

    let table = load_inspiration_table(config)?;
    log::info!("✓ Inspiration table OK ({} definitions)", table.len());

    log::info!("All validations passed!");
    Ok(())
}

/// Run a command against a loaded cache.
async fn run(command: Command, config: Config) -> Result<()> {
    let app = App::build(config)?;
    app.load().await;

    match command {
        Command::Serve => {
            let mut scheduler = app.scheduler();
            scheduler.start();
            log::info!("Serving; press Ctrl-C to stop");

            tokio::signal::ctrl_c().await?;
            log::info!("Shutdown requested");
            scheduler.stop().await;
        }

        Command::Refresh { if_due } => {
            let now = Utc::now();
            if if_due && !app.refresher.is_refresh_due(now) {
                log::info!("Caches are fresh, nothing to do");
                return Ok(());
            }
            let report = app.refresher.run_cycle(now).await;
            if report.persist_failures > 0 {
                log::warn!(
                    "{} snapshot writes failed; cache kept in memory only",
                    report.persist_failures
                );
            }
        }

        Command::RefreshBrand { brand } => {
            let stats = app.refresher.refresh_brand(&brand, Utc::now()).await?;
            log::info!(
                "{}: {} new, {} unchanged, {} updated, {} evicted",
                brand,
                stats.added,
                stats.unchanged,
                stats.updated,
                stats.evicted
            );
        }

        Command::Show { brand, cached_only } => {
            if cached_only {
                let products = app
                    .service
                    .get_cached_only(&brand)
                    .ok_or_else(|| AppError::UnknownBrand(brand.clone()))?;
                print_json(products.as_slice())?;
            } else {
                let listing = app.service.get_brand_products(&brand).await;
                if !listing.fresh {
                    log::warn!("Showing stale data for {}", brand);
                }
                print_json(listing.products.as_slice())?;
            }
        }

        Command::Inspirations { id: Some(id) } => {
            let view = app
                .service
                .get_inspiration(&id)
                .ok_or_else(|| AppError::config(format!("No inspiration '{id}' in cache")))?;
            if !view.fresh {
                log::warn!("Inspiration index is stale");
            }
            print_json(view.entry.as_ref())?;
        }

        Command::Inspirations { id: None } => {
            let listing = app.service.list_inspirations();
            for entry in &listing.entries {
                println!("{:<20} {:>3}  {}", entry.id, entry.products.len(), entry.name);
            }
            match listing.expires_at {
                Some(expiry) if listing.fresh => log::info!("Fresh until {}", expiry),
                Some(expiry) => log::warn!("Stale since {}", expiry),
                None => log::info!("No inspiration snapshot yet."),
            }
        }

        Command::Info => {
            let now = Utc::now();
            log::info!("Snapshot directory: {}", app.config.paths.snapshot_dir);
            log::info!(
                "Products: {} in {} buckets",
                app.store.product_count(),
                app.store.bucket_count()
            );
            log::info!("Inspirations: {}", app.store.inspiration_count());

            for kind in [SnapshotKind::Products, SnapshotKind::Inspirations] {
                match app.store.last_updated(kind) {
                    Some(ts) => log::info!(
                        "{} last updated {} ({})",
                        kind,
                        ts,
                        if app.store.is_fresh(kind, now) {
                            "fresh"
                        } else {
                            "stale"
                        }
                    ),
                    None => log::info!("No {} snapshot found yet.", kind),
                }
            }
            log::info!(
                "Refresh due: {}",
                if app.refresher.is_refresh_due(now) {
                    "yes"
                } else {
                    "no"
                }
            );
        }

        Command::Validate => validate(&app.config)?,
    }

    Ok(())
}
