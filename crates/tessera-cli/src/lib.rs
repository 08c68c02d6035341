//! # Tessera CLI
//!
//! Command-line tools for the persistent model cache.
//!
//! ## Commands
//! - `stats` - Entry counts per engine and age range
//! - `list` - List cached entries
//! - `show` - Show one cached entry
//! - `import` - Store a serialized asset file under a url
//! - `sweep` - Delete entries older than a maximum age
//! - `purge` - Delete every entry of one engine

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tessera_assets::{CacheConfig, CacheMetadata, EntrySummary, ModelCache, SerializedAsset};
use tessera_core::EngineKind;
use tessera_core::time::DAY_MILLIS;
use tessera_platform::{FileSystem, Timestamp};

/// Tessera model cache CLI
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Cache directory (overrides the config file)
    #[arg(short = 'd', long)]
    pub cache_dir: Option<PathBuf>,

    /// JSON cache configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show entry counts and age range
    Stats,

    /// List cached entries, oldest first
    List {
        /// Only entries for this engine
        #[arg(short, long)]
        engine: Option<EngineKind>,
    },

    /// Show the fresh entry cached for a url
    Show {
        /// Model url
        url: String,

        /// Engine the entry was written by
        #[arg(short, long)]
        engine: Option<EngineKind>,
    },

    /// Store a serialized asset (JSON) under a url
    Import {
        /// Serialized asset file
        file: PathBuf,

        /// Url to cache the asset under
        #[arg(short, long)]
        url: String,
    },

    /// Delete entries older than the maximum age
    Sweep {
        /// Maximum age in days (defaults to the configured age)
        #[arg(short, long)]
        max_age_days: Option<u64>,
    },

    /// Delete every entry written by one engine
    Purge {
        /// Engine to purge
        #[arg(short, long)]
        engine: EngineKind,
    },
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let mut stdout = std::io::stdout().lock();
    runtime.block_on(run(cli, &mut stdout))
}

/// Resolve the cache configuration from the config file and flags
pub fn load_config(config: Option<&Path>, cache_dir: Option<PathBuf>) -> Result<CacheConfig> {
    let mut resolved = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid cache config {}", path.display()))?
        }
        None => CacheConfig::default(),
    };
    if let Some(dir) = cache_dir {
        resolved.directory = Some(dir);
    }
    if resolved.directory.is_none() {
        resolved.directory = Some(FileSystem::new().cache_path("tessera"));
    }
    Ok(resolved)
}

fn describe(summary: &EntrySummary, now: Timestamp) -> String {
    let age = Timestamp::from_millis(summary.timestamp).age_at(now);
    format!(
        "{}  {:<7}  {:>4}  {}",
        &summary.id[..12.min(summary.id.len())],
        summary.engine_type,
        Timestamp::format_age(age),
        summary.url
    )
}

/// Run a command against the configured cache, writing output to `out`
pub async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.cache_dir)?;
    let max_age = config.max_age();
    let cache = ModelCache::new(config);
    cache.init().await.context("failed to open model cache")?;
    let now = Timestamp::now();

    match cli.command {
        Commands::Stats => {
            let stats = cache.stats();
            writeln!(out, "entries: {}", stats.entries)?;
            for (engine, count) in &stats.per_engine {
                writeln!(out, "  {:<7} {}", engine, count)?;
            }
            if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                let age = |ts| Timestamp::format_age(Timestamp::from_millis(ts).age_at(now));
                writeln!(out, "oldest: {} ago", age(oldest))?;
                writeln!(out, "newest: {} ago", age(newest))?;
            }
        }

        Commands::List { engine } => {
            for summary in cache.summaries(engine) {
                writeln!(out, "{}", describe(&summary, now))?;
            }
        }

        Commands::Show { url, engine } => {
            let Some(entry) = cache.get(&url, engine).await else {
                bail!("no fresh cache entry for {}", url);
            };
            writeln!(out, "{}", describe(&entry.summary(), now))?;
            writeln!(out, "version: {}", entry.version)?;
            writeln!(
                out,
                "meshes: {} ({} vertices, {} faces)",
                entry.model_data.meshes.len(),
                entry.model_data.vertex_count(),
                entry.model_data.face_count()
            )?;
            if let Some(metadata) = &entry.metadata {
                writeln!(out, "metadata: {}", serde_json::to_string(metadata)?)?;
            }
        }

        Commands::Import { file, url } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let asset: SerializedAsset = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a serialized asset", file.display()))?;
            let engine = asset.engine_type;
            let metadata = CacheMetadata::from_asset(&asset);
            cache.try_save(&url, asset, engine, Some(metadata)).await?;
            writeln!(out, "cached {} for {}", url, engine)?;
        }

        Commands::Sweep { max_age_days } => {
            let max_age = max_age_days
                .map(|days| Duration::from_millis(days.saturating_mul(DAY_MILLIS)))
                .unwrap_or(max_age);
            let removed = cache.clear_old_cache(max_age).await;
            writeln!(out, "removed {} entries", removed)?;
        }

        Commands::Purge { engine } => {
            let removed = cache.clear_cache_by_engine(engine).await;
            writeln!(out, "removed {} {} entries", removed, engine)?;
        }
    }

    Ok(())
}
