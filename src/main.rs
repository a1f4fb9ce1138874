//! Anime Shorts name resolver
//!
//! Resolves MyAnimeList ids to titles for the static site generator, keeping
//! every downloaded title in a local JSON cache.

mod cache;
mod fetch;
mod id;
mod jikan;
mod sources;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use cache::{NameCache, DEFAULT_CACHE_FILE, DEFAULT_WRITE_EVERY};
use fetch::fetcher::{DEFAULT_MAX_RETRIES, DEFAULT_WAIT_INTERVAL};
use fetch::{FetchConfig, FetchError, NameFetcher, RateLimitedFetcher};
use id::CatalogId;
use jikan::client::JIKAN_BASE_URL;
use jikan::JikanClient;
use sources::DEFAULT_SOURCES_FILE;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "animeshorts-names")]
#[command(about = "Resolve MyAnimeList ids to titles through a persistent cache")]
#[command(version)]
struct Args {
    /// Name cache file
    #[arg(long, global = true, default_value = DEFAULT_CACHE_FILE, env = "ANIMESHORTS_NAME_CACHE")]
    cache: PathBuf,

    /// Minimum seconds between API requests (also the retry backoff unit)
    #[arg(long, global = true, default_value_t = DEFAULT_WAIT_INTERVAL.as_secs(), env = "ANIMESHORTS_FETCH_WAIT")]
    wait: u64,

    /// Attempts per id before giving up
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RETRIES, env = "ANIMESHORTS_FETCH_RETRIES")]
    retries: u32,

    /// Write the cache to disk every N downloads
    #[arg(long, global = true, default_value_t = DEFAULT_WRITE_EVERY, env = "ANIMESHORTS_FLUSH_EVERY")]
    flush_every: u32,

    /// Jikan API base URL
    #[arg(long, global = true, default_value = JIKAN_BASE_URL, env = "ANIMESHORTS_JIKAN_URL")]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve ids and print "<id>\t<name>"
    Resolve {
        #[arg(required = true)]
        ids: Vec<CatalogId>,
    },
    /// Download names for every MAL id in the curated list
    Warm {
        #[arg(long, default_value = DEFAULT_SOURCES_FILE)]
        sources: PathBuf,
    },
    /// Print every cached "<id>\t<name>"
    List,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    let log_level = env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = FetchConfig {
        wait_interval: Duration::from_secs(args.wait),
        max_retries: args.retries,
    };
    let client = JikanClient::with_base_url(&args.api_url)?;
    let fetcher = RateLimitedFetcher::new(client, config);
    info!(
        wait_secs = fetcher.config().wait_interval.as_secs(),
        retries = fetcher.config().max_retries,
        api = %args.api_url,
        "Fetcher ready"
    );

    let mut cache = NameCache::with_write_every(&args.cache, fetcher, args.flush_every)
        .with_context(|| format!("Failed to open name cache {}", args.cache.display()))?;

    match args.command {
        Command::Resolve { ids } => {
            resolve_and_flush(&mut cache, &ids, |id, name| println!("{}\t{}", id, name))?;
        }
        Command::Warm { sources } => {
            let records = sources::load_sources(&sources)?;
            let ids = sources::collect_mal_ids(&records)?;
            let pending = ids.iter().filter(|id| !cache.contains(**id)).count();
            info!(
                records = records.len(),
                ids = ids.len(),
                pending = pending,
                "Warming name cache"
            );
            resolve_and_flush(&mut cache, &ids, |_, _| {})?;
        }
        Command::List => {
            if cache.is_empty() {
                println!("No names cached in {}", cache.path().display());
            }
            for key in cache.ids() {
                let name = key
                    .parse::<CatalogId>()
                    .ok()
                    .and_then(|id| cache.get(id))
                    .unwrap_or_default();
                println!("{}\t{}", key, name);
            }
        }
    }

    let stats = cache.stats();
    info!(
        entries = cache.len(),
        hits = stats.hits,
        misses = stats.misses,
        scheduled_flushes = stats.scheduled_flushes,
        "Done"
    );

    Ok(())
}

/// Resolve every id in order, then flush the cache whether or not a
/// resolution failed. The first failure aborts the run.
fn resolve_and_flush<F, E>(cache: &mut NameCache<F>, ids: &[CatalogId], mut emit: E) -> Result<()>
where
    F: NameFetcher,
    E: FnMut(CatalogId, &str),
{
    let outcome = resolve_all(cache, ids, &mut emit);
    let flushed = cache
        .flush()
        .with_context(|| format!("Failed to write name cache {}", cache.path().display()));

    if let Err(e) = &outcome {
        error!(id = %e.id(), error = %e, "Aborting: unresolved id");
    }
    outcome.with_context(|| "Name resolution aborted")?;
    flushed
}

fn resolve_all<F, E>(cache: &mut NameCache<F>, ids: &[CatalogId], emit: &mut E) -> Result<(), FetchError>
where
    F: NameFetcher,
    E: FnMut(CatalogId, &str),
{
    for &id in ids {
        let name = cache.resolve(id)?;
        emit(id, &name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FailOn(u64);

    impl NameFetcher for FailOn {
        fn fetch(&mut self, id: CatalogId) -> Result<String, FetchError> {
            if id.get() == self.0 {
                Err(FetchError::Exhausted {
                    id,
                    attempts: 3,
                    last: None,
                })
            } else {
                Ok(format!("Title {}", id))
            }
        }
    }

    fn ids(raw: &[u64]) -> Vec<CatalogId> {
        raw.iter().map(|&n| CatalogId::new(n).unwrap()).collect()
    }

    #[test]
    fn test_failure_still_flushes_and_names_the_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.json");
        let mut cache = NameCache::open(&path, FailOn(3)).unwrap();

        let emitted = RefCell::new(Vec::new());
        let err = resolve_and_flush(&mut cache, &ids(&[1, 2, 3, 4]), |id, _| {
            emitted.borrow_mut().push(id.get())
        })
        .unwrap_err();

        assert!(format!("{:#}", err).contains("catalog id 3"));
        assert_eq!(*emitted.borrow(), vec![1, 2]);
        assert_eq!(cache.stats().flushes, 1);

        let on_disk: std::collections::BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.keys().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["animeshorts-names", "resolve", "32281"]).unwrap();
        assert_eq!(args.wait, 5);
        assert_eq!(args.retries, 3);
        assert_eq!(args.flush_every, 5);
        assert_eq!(args.cache, PathBuf::from("mal_name_cache.json"));
        assert!(matches!(args.command, Command::Resolve { ref ids } if ids.len() == 1));
    }

    #[test]
    fn test_args_reject_zero_id() {
        assert!(Args::try_parse_from(["animeshorts-names", "resolve", "0"]).is_err());
    }
}
