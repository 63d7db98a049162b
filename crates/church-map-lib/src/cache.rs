//! Time-boxed cache over the local church store
//!
//! Reads are always served from local storage; staleness only decides
//! whether a background refresh is triggered (stale-while-revalidate).
//! Refreshes are single-flight: one generation-numbered ticket may be
//! outstanding at a time, concurrent triggers share it, and a completion
//! whose generation is no longer current is discarded instead of clobbering
//! newer data.

use crate::church::Church;
use crate::filter::ConfessionFilter;
use crate::store::ChurchStore;
use crate::{MapError, Result};
use chrono::{DateTime, TimeDelta, Utc};

/// Cached data older than this triggers a background refresh
pub const CACHE_TTL_SECS: i64 = 3600;

/// Token for one in-flight refresh attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

impl RefreshTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a completed refresh attempt
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Data replaced wholesale; holds the new record count
    Applied(usize),
    /// Fetch failed; local data and timestamp untouched
    Failed(MapError),
    /// The ticket's generation was no longer current; result discarded
    Superseded,
}

/// Local cache of church records with a shared freshness timestamp
///
/// One timestamp covers the whole dataset regardless of which confessions
/// are enabled; a filter change re-runs the refresh decision but does not
/// get its own staleness clock.
pub struct ChurchCache<S> {
    store: S,
    last_refresh: Option<DateTime<Utc>>,
    inflight: Option<u64>,
    next_generation: u64,
}

impl<S: ChurchStore> ChurchCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_last_refresh(store, None)
    }

    /// Cache restored from a persisted snapshot and its refresh timestamp
    pub fn with_last_refresh(store: S, last_refresh: Option<DateTime<Utc>>) -> Self {
        Self {
            store,
            last_refresh,
            inflight: None,
            next_generation: 0,
        }
    }

    /// Instant of the last successful refresh, if any
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a remote refresh is due: no successful refresh yet, or the
    /// last one is more than [`CACHE_TTL_SECS`] ago. Exactly at the
    /// threshold counts as fresh.
    pub fn should_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.last_refresh {
            None => true,
            Some(last) => now - last > TimeDelta::seconds(CACHE_TTL_SECS),
        }
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.inflight.is_some()
    }

    /// Claim the single refresh slot
    ///
    /// Returns `None` while another refresh is outstanding; the caller then
    /// shares that attempt's eventual completion instead of starting a
    /// second fetch.
    pub fn begin_refresh(&mut self) -> Option<RefreshTicket> {
        if self.inflight.is_some() {
            tracing::debug!("refresh already in flight, sharing it");
            return None;
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        self.inflight = Some(generation);
        Some(RefreshTicket { generation })
    }

    /// Drop the in-flight ticket, if any
    ///
    /// A completion delivered for a cancelled ticket is discarded. Used when
    /// a filter change makes the outstanding fetch's scope obsolete.
    pub fn cancel_inflight(&mut self) {
        if let Some(generation) = self.inflight.take() {
            tracing::debug!(generation, "cancelled in-flight refresh");
        }
    }

    /// Apply the result of a refresh attempt
    ///
    /// Success replaces the full record set and bumps the timestamp; failure
    /// leaves both untouched. Either way the refresh slot is freed, unless
    /// the ticket was superseded in the meantime.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<Church>>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        if self.inflight != Some(ticket.generation) {
            tracing::debug!(
                generation = ticket.generation,
                "discarding superseded refresh completion"
            );
            return RefreshOutcome::Superseded;
        }
        self.inflight = None;

        match result {
            Ok(churches) => {
                let count = churches.len();
                if let Err(e) = self.store.replace_all(churches) {
                    tracing::warn!(error = %e, "failed to persist refreshed churches");
                    return RefreshOutcome::Failed(e);
                }
                self.last_refresh = Some(now);
                tracing::info!(count, "church cache refreshed");
                RefreshOutcome::Applied(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "church refresh failed, keeping local data");
                RefreshOutcome::Failed(e)
            }
        }
    }

    /// Best-known local records matching `filter`, regardless of staleness
    ///
    /// Never touches the network.
    pub fn load(&self, filter: &ConfessionFilter) -> Result<Vec<Church>> {
        self.store.by_confessions(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::church::Confession;
    use crate::store::MemoryStore;
    use crate::utils::lat_lon;

    fn church(id: i64, confession: Confession) -> Church {
        Church::new(id, lat_lon(55.75, 37.62), confession, format!("church {}", id))
    }

    fn cache() -> ChurchCache<MemoryStore> {
        ChurchCache::new(MemoryStore::new())
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_should_refresh_without_prior_timestamp() {
        assert!(cache().should_refresh(t0()));
    }

    #[test]
    fn test_should_refresh_boundary_both_sides() {
        let mut cache = cache();
        let ticket = cache.begin_refresh().unwrap();
        cache.complete_refresh(ticket, Ok(vec![]), t0());

        // Exactly one hour later: still fresh
        let exactly = t0() + TimeDelta::seconds(CACHE_TTL_SECS);
        assert!(!cache.should_refresh(exactly));

        // One second past the hour: stale
        let past = exactly + TimeDelta::seconds(1);
        assert!(cache.should_refresh(past));

        // One second before the hour: fresh
        let before = exactly - TimeDelta::seconds(1);
        assert!(!cache.should_refresh(before));
    }

    #[test]
    fn test_failed_refresh_keeps_timestamp_and_data() {
        let mut cache = cache();

        let ticket = cache.begin_refresh().unwrap();
        cache.complete_refresh(ticket, Ok(vec![church(1, Confession::Orthodox)]), t0());
        assert_eq!(cache.last_refresh(), Some(t0()));

        // Failure at a later instant: timestamp stays at t0, data stays put
        let later = t0() + TimeDelta::minutes(90);
        let ticket = cache.begin_refresh().unwrap();
        let outcome = cache.complete_refresh(
            ticket,
            Err(MapError::Fetch("directory unreachable".to_string())),
            later,
        );
        assert!(matches!(outcome, RefreshOutcome::Failed(_)));
        assert_eq!(cache.last_refresh(), Some(t0()));
        assert_eq!(cache.load(&ConfessionFilter::all()).unwrap().len(), 1);

        // A subsequent success moves the timestamp forward
        let t1 = later + TimeDelta::minutes(5);
        let ticket = cache.begin_refresh().unwrap();
        cache.complete_refresh(ticket, Ok(vec![church(2, Confession::Catholic)]), t1);
        assert_eq!(cache.last_refresh(), Some(t1));
    }

    #[test]
    fn test_load_serves_stale_data() {
        let mut cache = cache();
        let ticket = cache.begin_refresh().unwrap();
        cache.complete_refresh(ticket, Ok(vec![church(1, Confession::Orthodox)]), t0());

        let much_later = t0() + TimeDelta::days(3);
        assert!(cache.should_refresh(much_later));
        // Staleness never blocks the read
        assert_eq!(cache.load(&ConfessionFilter::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_load_applies_filter() {
        let mut cache = cache();
        let ticket = cache.begin_refresh().unwrap();
        cache.complete_refresh(
            ticket,
            Ok(vec![
                church(1, Confession::Orthodox),
                church(2, Confession::Catholic),
            ]),
            t0(),
        );

        let orthodox_only = ConfessionFilter::of([Confession::Orthodox]);
        let loaded = cache.load(&orthodox_only).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 1);
    }

    #[test]
    fn test_single_flight_blocks_second_begin() {
        let mut cache = cache();
        let first = cache.begin_refresh();
        assert!(first.is_some());
        assert!(cache.begin_refresh().is_none());
        assert!(cache.refresh_in_flight());

        cache.complete_refresh(first.unwrap(), Ok(vec![]), t0());
        assert!(!cache.refresh_in_flight());
        assert!(cache.begin_refresh().is_some());
    }

    #[test]
    fn test_cancelled_ticket_completion_is_discarded() {
        let mut cache = cache();
        let stale_ticket = cache.begin_refresh().unwrap();
        cache.cancel_inflight();

        let fresh_ticket = cache.begin_refresh().unwrap();

        // The cancelled fetch lands late: ignored, data untouched
        let outcome =
            cache.complete_refresh(stale_ticket, Ok(vec![church(9, Confession::Orthodox)]), t0());
        assert!(matches!(outcome, RefreshOutcome::Superseded));
        assert!(cache.store().is_empty());
        assert!(cache.last_refresh().is_none());

        // The current fetch still applies normally
        let outcome =
            cache.complete_refresh(fresh_ticket, Ok(vec![church(1, Confession::Orthodox)]), t0());
        assert!(matches!(outcome, RefreshOutcome::Applied(1)));
        assert_eq!(cache.store().len(), 1);
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut cache = cache();
        let ticket = cache.begin_refresh().unwrap();
        cache.complete_refresh(
            ticket,
            Ok(vec![
                church(1, Confession::Orthodox),
                church(2, Confession::Catholic),
            ]),
            t0(),
        );

        let ticket = cache.begin_refresh().unwrap();
        cache.complete_refresh(ticket, Ok(vec![church(3, Confession::Protestant)]), t0());

        let all = cache.load(&ConfessionFilter::all()).unwrap();
        let ids: Vec<i64> = all.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3]);
    }
}
