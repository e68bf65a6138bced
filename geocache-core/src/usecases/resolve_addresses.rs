use super::*;
use crate::{gateways::geocode::ReverseGeocodingGateway, util::throttle::Throttle};
use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ResolveParams {
    /// Lower bound for the time between the starts of two lookups.
    pub min_delay: Duration,
    /// Persist the store after this many new entries.
    pub flush_every: Option<NonZeroUsize>,
    /// Treat cached unresolved entries as misses.
    pub retry_unresolved: bool,
    /// Stops the run before the next coordinate once set.
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl Default for ResolveParams {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            flush_every: None,
            retry_unresolved: false,
            interrupt: None,
        }
    }
}

impl ResolveParams {
    fn is_interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Number of input records that have been processed.
    pub total: usize,
    pub hits: usize,
    /// Number of lookups sent to the gateway.
    pub fetched: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub invalid: usize,
    /// Number of entries in the store after the run.
    pub entries: usize,
    pub interrupted: bool,
}

fn is_cache_hit<R: AddressRepo>(repo: &R, key: &CoordinateKey, retry_unresolved: bool) -> bool {
    match repo.get_address(key) {
        Some(address) => !retry_unresolved || GeocodeResult::from_stored(&address).is_resolved(),
        None => false,
    }
}

/// Resolves all coordinates that are not yet cached and persists the store.
///
/// Coordinates are processed sequentially in input order. Lookups are only
/// sent on a cache miss and never faster than `params.min_delay`. Invalid
/// coordinates are skipped. The store is flushed at the end of the run,
/// also if the run has been interrupted.
pub fn resolve_addresses<R, I>(
    repo: &mut R,
    gateway: &dyn ReverseGeocodingGateway,
    coordinates: I,
    params: &ResolveParams,
) -> Result<ResolutionReport>
where
    R: AddressRepo,
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut report = ResolutionReport::default();
    let mut throttle = Throttle::new(params.min_delay);
    let mut unflushed = 0;

    for (index, (lat, lon)) in coordinates.into_iter().enumerate() {
        if params.is_interrupted() {
            log::warn!("Interrupted after {} coordinates", report.total);
            report.interrupted = true;
            break;
        }
        report.total += 1;
        let key = match CoordinateKey::try_from_lat_lon(lat, lon) {
            Ok(key) => key,
            Err(err) => {
                log::warn!("Skipping coordinate #{}: {err}", index + 1);
                report.invalid += 1;
                continue;
            }
        };
        if is_cache_hit(repo, &key, params.retry_unresolved) {
            report.hits += 1;
            continue;
        }
        log::info!("Querying {key}");
        throttle.wait();
        let result = gateway.reverse_geocode(&key);
        report.fetched += 1;
        if result.is_resolved() {
            report.resolved += 1;
        } else {
            report.unresolved += 1;
        }
        repo.put_address(&key, result.into_stored());
        unflushed += 1;
        if let Some(flush_every) = params.flush_every {
            if unflushed >= flush_every.get() {
                log::debug!("Flushing {unflushed} new addresses");
                repo.flush()?;
                unflushed = 0;
            }
        }
    }

    repo.flush()?;
    report.entries = repo.count_addresses();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repositories,
        usecases::tests::{MockDb, MockGeocoder},
    };

    fn no_delay() -> ResolveParams {
        ResolveParams {
            min_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn key(lat: f64, lon: f64) -> CoordinateKey {
        CoordinateKey::try_from_lat_lon(lat, lon).unwrap()
    }

    #[test]
    fn cache_hit_does_not_query_the_gateway() {
        let mut db = MockDb::with_addresses(&[("1.23,4.56", "Main St")]);
        let geocoder = MockGeocoder::default();
        let report = resolve_addresses(&mut db, &geocoder, [(1.23, 4.56)], &no_delay()).unwrap();
        assert!(geocoder.calls.borrow().is_empty());
        assert_eq!(report.hits, 1);
        assert_eq!(report.fetched, 0);
        assert_eq!(db.addresses.len(), 1);
        assert_eq!(db.get_address(&key(1.23, 4.56)).unwrap(), "Main St");
    }

    #[test]
    fn cache_miss_is_resolved_and_persisted() {
        let mut db = MockDb::default();
        let geocoder = MockGeocoder::with_addresses(&[("2.0,3.0", "Oak Ave")]);
        let report = resolve_addresses(&mut db, &geocoder, [(2.0, 3.0)], &no_delay()).unwrap();
        assert_eq!(geocoder.called_keys(), vec!["2.0,3.0"]);
        assert_eq!(db.get_address(&key(2.0, 3.0)).unwrap(), "Oak Ave");
        assert_eq!(db.persisted.get("2.0,3.0").unwrap(), "Oak Ave");
        assert_eq!(
            report,
            ResolutionReport {
                total: 1,
                fetched: 1,
                resolved: 1,
                entries: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn failed_lookup_is_stored_as_unresolved_and_run_continues() {
        let mut db = MockDb::default();
        let geocoder = MockGeocoder::with_addresses(&[("7.0,8.0", "Elm Rd")]);
        let report = resolve_addresses(
            &mut db,
            &geocoder,
            [(5.0, 6.0), (7.0, 8.0)],
            &no_delay(),
        )
        .unwrap();
        assert_eq!(geocoder.called_keys(), vec!["5.0,6.0", "7.0,8.0"]);
        assert_eq!(db.addresses.get("5.0,6.0").unwrap(), UNRESOLVED_ADDRESS);
        assert_eq!(db.addresses.get("7.0,8.0").unwrap(), "Elm Rd");
        assert_eq!(report.unresolved, 1);
        assert_eq!(report.resolved, 1);
    }

    #[test]
    fn unresolved_entries_are_not_retried_by_default() {
        let mut db = MockDb::with_addresses(&[("5.0,6.0", UNRESOLVED_ADDRESS)]);
        let geocoder = MockGeocoder::with_addresses(&[("5.0,6.0", "Pine St")]);
        resolve_addresses(&mut db, &geocoder, [(5.0, 6.0)], &no_delay()).unwrap();
        assert!(geocoder.calls.borrow().is_empty());
        assert_eq!(db.addresses.get("5.0,6.0").unwrap(), UNRESOLVED_ADDRESS);
    }

    #[test]
    fn unresolved_entries_are_retried_on_demand() {
        let mut db =
            MockDb::with_addresses(&[("5.0,6.0", UNRESOLVED_ADDRESS), ("1.0,1.0", "Main St")]);
        let geocoder = MockGeocoder::with_addresses(&[("5.0,6.0", "Pine St")]);
        let params = ResolveParams {
            retry_unresolved: true,
            ..no_delay()
        };
        resolve_addresses(&mut db, &geocoder, [(5.0, 6.0), (1.0, 1.0)], &params).unwrap();
        assert_eq!(geocoder.called_keys(), vec!["5.0,6.0"]);
        assert_eq!(db.addresses.get("5.0,6.0").unwrap(), "Pine St");
    }

    #[test]
    fn duplicate_coordinates_are_fetched_once() {
        let mut db = MockDb::default();
        let geocoder = MockGeocoder::with_addresses(&[("2.0,3.0", "Oak Ave")]);
        let report = resolve_addresses(
            &mut db,
            &geocoder,
            [(2.0, 3.0), (2.0, 3.0), (2.000, 3.0)],
            &no_delay(),
        )
        .unwrap();
        assert_eq!(geocoder.calls.borrow().len(), 1);
        assert_eq!(report.hits, 2);
        assert_eq!(report.entries, 1);
    }

    #[test]
    fn invalid_coordinates_are_skipped() {
        let mut db = MockDb::default();
        let geocoder = MockGeocoder::with_addresses(&[("2.0,3.0", "Oak Ave")]);
        let report = resolve_addresses(
            &mut db,
            &geocoder,
            [(f64::NAN, 1.0), (95.0, 1.0), (2.0, 3.0)],
            &no_delay(),
        )
        .unwrap();
        assert_eq!(report.invalid, 2);
        assert_eq!(report.total, 3);
        assert_eq!(geocoder.called_keys(), vec!["2.0,3.0"]);
    }

    #[test]
    fn consecutive_misses_respect_the_min_delay() {
        let min_delay = Duration::from_millis(300);
        let mut db = MockDb::with_addresses(&[("1.0,1.0", "Main St"), ("1.5,1.5", "Side St")]);
        let geocoder = MockGeocoder::default();
        let params = ResolveParams {
            min_delay,
            ..Default::default()
        };
        resolve_addresses(
            &mut db,
            &geocoder,
            [(2.0, 2.0), (1.0, 1.0), (1.5, 1.5), (3.0, 3.0)],
            &params,
        )
        .unwrap();
        let calls = geocoder.calls.borrow();
        assert_eq!(calls.len(), 2);
        let gap = calls[1].1.duration_since(calls[0].1);
        assert!(gap >= min_delay, "gap = {gap:?}");
    }

    #[test]
    fn hits_are_not_delayed() {
        let mut db = MockDb::with_addresses(&[("1.0,1.0", "Main St"), ("1.5,1.5", "Side St")]);
        let geocoder = MockGeocoder::default();
        let params = ResolveParams {
            min_delay: Duration::from_secs(30),
            ..Default::default()
        };
        let start = std::time::Instant::now();
        resolve_addresses(&mut db, &geocoder, [(1.0, 1.0), (1.5, 1.5)], &params).unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn flush_incrementally() {
        let mut db = MockDb::default();
        let geocoder = MockGeocoder::default();
        let params = ResolveParams {
            flush_every: NonZeroUsize::new(2),
            ..no_delay()
        };
        resolve_addresses(
            &mut db,
            &geocoder,
            [(1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0), (5.0, 5.0)],
            &params,
        )
        .unwrap();
        // two intermediate flushes and the final one
        assert_eq!(db.flush_count, 3);
        assert_eq!(db.persisted.len(), 5);
    }

    #[test]
    fn flush_when_interrupted() {
        let interrupt = Arc::new(AtomicBool::new(false));
        let mut db = MockDb::default();
        let geocoder = MockGeocoder {
            interrupt_on_call: Some(Arc::clone(&interrupt)),
            ..MockGeocoder::with_addresses(&[("1.0,1.0", "Main St")])
        };
        let params = ResolveParams {
            interrupt: Some(interrupt),
            ..no_delay()
        };
        let report =
            resolve_addresses(&mut db, &geocoder, [(1.0, 1.0), (2.0, 2.0)], &params).unwrap();
        assert!(report.interrupted);
        assert_eq!(report.total, 1);
        assert_eq!(geocoder.calls.borrow().len(), 1);
        assert_eq!(db.flush_count, 1);
        assert_eq!(db.persisted.get("1.0,1.0").unwrap(), "Main St");
    }

    #[test]
    fn failed_final_write_is_fatal() {
        let mut db = MockDb {
            fail_flush: true,
            ..Default::default()
        };
        let geocoder = MockGeocoder::with_addresses(&[("2.0,3.0", "Oak Ave")]);
        let err = resolve_addresses(&mut db, &geocoder, [(2.0, 3.0)], &no_delay()).unwrap_err();
        assert!(matches!(
            err,
            Error::Repo(repositories::Error::StoreWriteFailed { .. })
        ));
    }
}
