//! Geocoding collaborator seam.
//!
//! The live service behind this trait is external; resolution failures
//! drop an event from geography output only — the event still counts
//! for aggregation. The in-repo implementation is a lookup table from
//! configuration, wrapped in a memoizing cache so each distinct place
//! name is resolved at most once per run.

use std::cell::RefCell;
use std::collections::HashMap;

pub trait Geocoder {
    /// Place name → (lat, lon), or `None` when unresolvable.
    fn resolve(&self, name: &str) -> Option<(f64, f64)>;
}

/// Coordinates straight from the run configuration.
pub struct TableGeocoder {
    table: HashMap<String, (f64, f64)>,
}

impl TableGeocoder {
    pub fn new(table: HashMap<String, (f64, f64)>) -> Self {
        TableGeocoder { table }
    }
}

impl Geocoder for TableGeocoder {
    fn resolve(&self, name: &str) -> Option<(f64, f64)> {
        self.table.get(name).copied()
    }
}

/// Memoizing wrapper: remembers hits and misses, so a rate-limited
/// upstream is asked once per distinct name.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: RefCell<HashMap<String, Option<(f64, f64)>>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G) -> Self {
        CachedGeocoder {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    fn resolve(&self, name: &str) -> Option<(f64, f64)> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return *cached;
        }
        let result = self.inner.resolve(name);
        self.cache.borrow_mut().insert(name.to_string(), result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingGeocoder {
        calls: RefCell<usize>,
    }

    impl Geocoder for CountingGeocoder {
        fn resolve(&self, name: &str) -> Option<(f64, f64)> {
            *self.calls.borrow_mut() += 1;
            (name == "Normandy").then_some((49.0, -0.3))
        }
    }

    #[test]
    fn test_table_geocoder() {
        let mut table = HashMap::new();
        table.insert("Mosul".to_string(), (36.34, 43.13));
        let geo = TableGeocoder::new(table);
        assert_eq!(geo.resolve("Mosul"), Some((36.34, 43.13)));
        assert_eq!(geo.resolve("Atlantis"), None);
    }

    #[test]
    fn test_cache_resolves_each_name_once() {
        let geo = CachedGeocoder::new(CountingGeocoder {
            calls: RefCell::new(0),
        });
        assert_eq!(geo.resolve("Normandy"), Some((49.0, -0.3)));
        assert_eq!(geo.resolve("Normandy"), Some((49.0, -0.3)));
        // Misses are remembered too.
        assert_eq!(geo.resolve("Atlantis"), None);
        assert_eq!(geo.resolve("Atlantis"), None);
        assert_eq!(*geo.inner.calls.borrow(), 2);
    }
}
