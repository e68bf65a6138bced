use crate::{
    cli::ResolveArgs,
    config::{Config, GeocodingGateway},
    gateways, input,
};
use anyhow::{Context, Result};
use geocache_core::{
    entities::{CoordinateKey, GeocodeResult},
    usecases::{self, ResolutionReport, ResolveParams},
};
use geocache_db_json::JsonFileStore;
use std::{
    future::Future,
    io,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Settings of a single `resolve` run.
struct ResolveRun {
    input: PathBuf,
    cache_file: PathBuf,
    lat_column: String,
    lon_column: String,
    params: ResolveParams,
    gateway: Option<GeocodingGateway>,
}

// Command line arguments take precedence over the configuration,
// which already includes the environment overrides.
fn resolve_run(cfg: Config, args: ResolveArgs) -> ResolveRun {
    let ResolveArgs {
        input,
        cache,
        min_delay,
        flush_every,
        retry_unresolved,
        lat_column,
        lon_column,
    } = args;
    let Config {
        cache: cache_cfg,
        resolution,
        input: input_cfg,
        geocoding,
    } = cfg;
    ResolveRun {
        input,
        cache_file: cache.unwrap_or(cache_cfg.file),
        lat_column: lat_column.unwrap_or(input_cfg.lat_column),
        lon_column: lon_column.unwrap_or(input_cfg.lon_column),
        params: ResolveParams {
            min_delay: min_delay.unwrap_or(resolution.min_delay),
            flush_every: flush_every.or(cache_cfg.flush_every),
            retry_unresolved: retry_unresolved || cache_cfg.retry_unresolved,
            interrupt: None,
        },
        gateway: geocoding.gateway,
    }
}

pub async fn resolve(cfg: Config, args: ResolveArgs) -> Result<()> {
    let ResolveRun {
        input,
        cache_file,
        lat_column,
        lon_column,
        mut params,
        gateway,
    } = resolve_run(cfg, args);

    if let Some(gw) = &gateway {
        gw.ensure_fair_use(params.min_delay)?;
    }

    let coordinates = input::read_coordinates_from_file(&input, &lat_column, &lon_column)
        .with_context(|| format!("Unable to read coordinates from '{}'", input.display()))?;
    log::info!(
        "Read {} coordinates from '{}'",
        coordinates.len(),
        input.display()
    );

    // A corrupt store must never be replaced by an empty one.
    let mut store = JsonFileStore::load(&cache_file)?;
    log::info!(
        "Loaded {} cached addresses from '{}'",
        store.len(),
        cache_file.display()
    );

    let interrupt = Arc::new(AtomicBool::new(false));
    watch_for_interrupt(Arc::clone(&interrupt));
    params.interrupt = Some(interrupt);

    // The blocking HTTP client must neither be created nor dropped
    // within the async runtime.
    let report = tokio::task::spawn_blocking(move || -> Result<ResolutionReport> {
        let gateway = gateways::geocoding_gateway(gateway)?;
        let report =
            usecases::resolve_addresses(&mut store, &*gateway, coordinates, &params)?;
        Ok(report)
    })
    .await
    .context("The resolver task failed")??;

    log_report(&report, &cache_file);
    Ok(())
}

/// Resolves once the process has been asked to stop (ctrl-c or SIGTERM).
#[cfg(unix)]
fn interrupt_signal() -> io::Result<impl Future<Output = io::Result<()>>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = terminate.recv() => Ok(()),
        }
    })
}

#[cfg(not(unix))]
fn interrupt_signal() -> io::Result<impl Future<Output = io::Result<()>>> {
    Ok(tokio::signal::ctrl_c())
}

fn watch_for_interrupt(interrupt: Arc<AtomicBool>) {
    match interrupt_signal() {
        Ok(signal) => {
            tokio::spawn(set_on_signal(signal, interrupt));
        }
        Err(err) => {
            log::warn!("Unable to listen for interrupt signals: {err}");
        }
    }
}

async fn set_on_signal<F>(signal: F, interrupt: Arc<AtomicBool>)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            log::warn!("Interrupted: finishing the current lookup and saving the cache");
            interrupt.store(true, Ordering::SeqCst);
        }
        Err(err) => {
            log::warn!("Unable to listen for interrupt signals: {err}");
        }
    }
}

fn log_report(report: &ResolutionReport, cache_file: &std::path::Path) {
    let ResolutionReport {
        total,
        hits,
        fetched,
        resolved,
        unresolved,
        invalid,
        entries,
        interrupted,
    } = report;
    if *invalid > 0 {
        log::warn!("Skipped {invalid} invalid coordinates");
    }
    if *interrupted {
        log::warn!("The run has been interrupted after {total} coordinates");
    }
    log::info!(
        "Processed {total} coordinates: {hits} cached, {fetched} queried ({resolved} resolved, {unresolved} unresolved)"
    );
    log::info!(
        "Saved {entries} addresses to '{}'",
        cache_file.display()
    );
}

pub fn stats(cache_file: PathBuf) -> Result<()> {
    let store = JsonFileStore::load(&cache_file)?;
    let stats = usecases::address_stats(store.iter().map(|(_, address)| address));
    let malformed_keys = store
        .iter()
        .filter(|(key, _)| key.parse::<CoordinateKey>().is_err())
        .count();
    println!("Cache:       {}", cache_file.display());
    println!("Entries:     {}", stats.entries);
    println!("Resolved:    {}", stats.resolved);
    println!("Unresolved:  {}", stats.unresolved);
    if malformed_keys > 0 {
        println!("Malformed:   {malformed_keys}");
    }
    Ok(())
}

pub fn lookup(cache_file: PathBuf, lat: f64, lon: f64) -> Result<()> {
    let store = JsonFileStore::load(&cache_file)?;
    let key = CoordinateKey::try_from_lat_lon(lat, lon)?;
    match usecases::lookup_address(&store, lat, lon)? {
        Some(GeocodeResult::Resolved(address)) => println!("{address}"),
        Some(GeocodeResult::Unresolved) => {
            println!("{key} has been cached as unresolved")
        }
        None => println!("{key} is not cached"),
    }
    Ok(())
}
