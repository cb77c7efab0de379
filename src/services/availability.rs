use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::database::models::Element;
use crate::database::{DatabaseError, Store};

/// Derived view of all elements handed out to visitors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Availability {
    /// mid → sponsor name of confirmed elements
    pub taken: BTreeMap<String, String>,
    pub reserved: Vec<String>,
}

impl Availability {
    pub fn is_claimed(&self, mid: &str) -> bool {
        self.taken.contains_key(mid) || self.reserved.iter().any(|m| m == mid)
    }
}

/// Serves the availability snapshot from the cache and rebuilds it on a miss
#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn Store>,
    cache: Arc<TtlCache<Availability>>,
    reservation_expiration: Duration,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<TtlCache<Availability>>,
        reservation_expiration: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            reservation_expiration,
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache<Availability>> {
        &self.cache
    }

    pub async fn snapshot(&self) -> Result<Arc<Availability>, DatabaseError> {
        if let Some(hit) = self.cache.get().await {
            return Ok(hit);
        }

        let generation = self.cache.generation();
        let elements = self.store.list_elements().await?;
        let cutoff = self.cutoff();

        let (snapshot, expired) = partition(elements, cutoff);

        if !expired.is_empty() {
            let purged = self.store.delete_elements(&expired).await?;
            info!(count = purged, mids = ?expired, "purged abandoned reservations");
        }

        let snapshot = Arc::new(snapshot);
        if !self.cache.set(snapshot.clone(), generation).await {
            debug!("availability changed during rebuild, not caching");
        }

        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    /// Reservations made before this instant are abandoned
    fn cutoff(&self) -> NaiveDateTime {
        let expiration = chrono::Duration::from_std(self.reservation_expiration)
            .unwrap_or_else(|_| chrono::Duration::weeks(52 * 1000));
        Utc::now()
            .naive_utc()
            .checked_sub_signed(expiration)
            .unwrap_or(NaiveDateTime::MIN)
    }
}

fn partition(elements: Vec<Element>, cutoff: NaiveDateTime) -> (Availability, Vec<String>) {
    let mut snapshot = Availability::default();
    let mut expired = Vec::new();

    for element in elements {
        match element.reservation {
            None => {
                snapshot.taken.insert(element.mid, element.name);
            }
            Some(at) if at < cutoff => expired.push(element.mid),
            Some(_) => snapshot.reserved.push(element.mid),
        }
    }

    snapshot.reserved.sort();
    (snapshot, expired)
}
