//! MEMO CLI
//!
//! Runs the debug server, drives a demo workload through a memoized async
//! function, and prints cache keys.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use memo_api::{ApiConfig, ApiServer};
use memo_cache::{cache_key, canonical_form, Cache, Completion, StoreConfig, Wrapped};
use memo_core::FnIdentity;
use memo_debug::{DebugRegistry, ViewQuery};

/// MEMO - memoization for callback-style async functions
#[derive(Parser)]
#[command(name = "memo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the debug server over the global registry
    Serve {
        /// Listen address (overrides MEMO_BIND)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
        /// Debug route path (overrides MEMO_DEBUG_PATH)
        #[arg(long)]
        path: Option<String>,
        /// Register a demo cache and keep it busy in the background
        #[arg(long)]
        demo: bool,
    },

    /// Drive a workload through a memoized lookup and print the snapshot
    Demo {
        /// Number of calls to issue
        #[arg(short, long, default_value = "40")]
        calls: usize,
        /// Number of distinct argument values
        #[arg(short, long, default_value = "8")]
        keys: u64,
        /// Store capacity in entries
        #[arg(long, default_value = "6", env = "MEMO_MAX_ENTRIES")]
        capacity: usize,
        /// Entry time-to-live in seconds
        #[arg(long, env = "MEMO_TTL_SECONDS")]
        ttl: Option<u64>,
        /// Simulated latency of the wrapped lookup in milliseconds
        #[arg(long, default_value = "5")]
        latency_ms: u64,
    },

    /// Print the canonical form and cache key of a call
    Key {
        /// Function name
        name: String,
        /// Arguments, each parsed as JSON (falls back to a string)
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "memo_cli=debug,memo_cache=debug,memo_store=debug,memo_debug=debug,memo_api=debug,info"
    } else {
        "memo_cli=info,memo_api=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { bind, path, demo } => cmd_serve(bind, path, demo).await,
        Commands::Demo {
            calls,
            keys,
            capacity,
            ttl,
            latency_ms,
        } => cmd_demo(calls, keys, capacity, ttl, latency_ms).await,
        Commands::Key { name, args } => cmd_key(&name, &args),
    }
}

type Profiles = Wrapped<(), String, anyhow::Error>;

/// Builds a cache and a memoized profile lookup that completes after
/// `latency` on a tokio task.
///
/// Ids divisible by 5 have no profile; ids divisible by 11 fail.
fn profile_lookup(config: StoreConfig, latency: Duration) -> Result<(Arc<Cache<String>>, Profiles)> {
    let cache = Arc::new(Cache::with_config(config)?);
    let lookup = cache.wrap_named(
        "fetch_profile",
        move |args: Vec<Value>, done: Completion<String, anyhow::Error>| {
            let id = args.first().and_then(Value::as_u64);
            tokio::spawn(async move {
                tokio::time::sleep(latency).await;
                let result = match id {
                    None => Err(anyhow!("fetch_profile expects a numeric id")),
                    Some(id) if id % 11 == 0 => Err(anyhow!("profile backend timed out for {}", id)),
                    Some(id) if id % 5 == 0 => Ok(None),
                    Some(id) => Ok(Some(format!("profile-{}", id))),
                };
                done(result)
            });
        },
    );
    Ok((cache, lookup))
}

/// Run the debug server
async fn cmd_serve(bind: Option<SocketAddr>, path: Option<String>, demo: bool) -> Result<()> {
    let mut config = ApiConfig::from_env();
    if let Some(bind) = bind {
        config.bind = bind;
    }
    if let Some(path) = path {
        config = config.with_debug_path(&path);
    }

    let registry = DebugRegistry::global();

    if demo {
        let (cache, lookup) =
            profile_lookup(StoreConfig::with_max_entries(16), Duration::from_millis(20))?;
        registry.register(cache, Some("profiles"));
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(250));
            let mut n = 0u64;
            loop {
                tick.tick().await;
                let id = (n * 7) % 24;
                n += 1;
                if let Err(e) = lookup.call_async(vec![json!(id)]).await {
                    debug!(error = %e, "Demo lookup failed");
                }
            }
        });
    }

    #[cfg(unix)]
    memo_api::spawn_signal_dump(registry.clone()).context("Failed to install SIGUSR2 handler")?;

    println!("{}", "Starting MEMO debug server...".cyan().bold());
    println!(
        "   {} http://{}{}",
        "Snapshot:".green(),
        config.bind,
        config.debug_path
    );
    println!("   {} http://{}/health", "Health check:".dimmed(), config.bind);
    #[cfg(unix)]
    println!("   {} kill -USR2 {}", "Dump:".dimmed(), std::process::id());
    println!("\n   Press Ctrl+C to stop.\n");

    let addr = config.bind;
    ApiServer::new(config, registry).run(addr).await?;

    Ok(())
}

/// Drive a demo workload
async fn cmd_demo(
    calls: usize,
    keys: u64,
    capacity: usize,
    ttl: Option<u64>,
    latency_ms: u64,
) -> Result<()> {
    if keys == 0 {
        return Err(anyhow!("--keys must be at least 1"));
    }

    let config = StoreConfig {
        ttl_seconds: ttl,
        ..StoreConfig::with_max_entries(capacity)
    };
    let (cache, lookup) = profile_lookup(config, Duration::from_millis(latency_ms))?;

    let registry = DebugRegistry::new();
    registry.register(cache.clone(), Some("profiles"));

    println!(
        "{} {} calls over {} ids (capacity {})",
        "Running".cyan().bold(),
        calls,
        keys,
        capacity
    );

    let start = Instant::now();
    let mut found = 0usize;
    let mut absent = 0usize;
    let mut failed = 0usize;

    // Rounds of concurrent calls so some misses overlap
    let ids: Vec<u64> = (0..calls as u64).map(|i| (i * 3) % keys).collect();
    for round in ids.chunks(4) {
        let results = join_all(round.iter().map(|id| lookup.call_async(vec![json!(id)]))).await;
        for result in results {
            match result {
                Ok(Some(_)) => found += 1,
                Ok(None) => absent += 1,
                Err(e) => {
                    debug!(error = %e, "Lookup failed");
                    failed += 1;
                }
            }
        }
    }
    let elapsed = start.elapsed();

    let stats = cache.stats().snapshot();
    println!("\n{}", "Results".bold());
    println!("   {} {}", "found:".green(), found);
    println!("   {} {}", "absent:".yellow(), absent);
    println!("   {} {}", "failed:".red(), failed);
    println!("   {} {:?}", "elapsed:".dimmed(), elapsed);

    println!("\n{}", "Cache".bold());
    println!("   {} {}", "hits:".green(), stats.hit);
    println!("   {} {}", "misses:".yellow(), stats.miss);
    println!("   {} {}%", "hitrate:".cyan(), stats.hitrate);
    println!("   {} {}", "entries:".dimmed(), cache.store().keycount());

    let snapshot = registry.view(&ViewQuery::detail("profiles"));
    println!("\n{}", "Snapshot".bold());
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}

/// Print a cache key
fn cmd_key(name: &str, args: &[String]) -> Result<()> {
    let identity = FnIdentity::named(name);
    let args: Vec<Value> = args
        .iter()
        .map(|a| serde_json::from_str(a).unwrap_or_else(|_| Value::String(a.clone())))
        .collect();

    println!("{} {}", "canonical:".dimmed(), canonical_form(&identity, &args));
    println!("{} {}", "key:".green().bold(), cache_key(&identity, &args));
    Ok(())
}
