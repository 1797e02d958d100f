use std::collections::BTreeMap;

/// In-process counters for the map runtime.
///
/// Keys are static names; sorted maps keep snapshots stable for logs and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    gauges: BTreeMap<&'static str, i64>,
    distributions: BTreeMap<&'static str, Distribution>,
}

/// Running summary of observed values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Distribution {
    pub count: u64,
    pub sum: i64,
    pub min: i64,
    pub max: i64,
}

impl Distribution {
    pub fn observe(&mut self, value: i64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&mut self, name: &'static str) {
        self.add(name, 1);
    }

    pub fn add(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn set_gauge(&mut self, name: &'static str, value: i64) {
        self.gauges.insert(name, value);
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.get(name).copied()
    }

    pub fn observe(&mut self, name: &'static str, value: i64) {
        self.distributions.entry(name).or_default().observe(value);
    }

    pub fn distribution(&self, name: &str) -> Option<Distribution> {
        self.distributions.get(name).copied()
    }

    /// Sorted `(name, value)` view of all counters.
    pub fn counters(&self) -> Vec<(&'static str, u64)> {
        self.counters.iter().map(|(k, v)| (*k, *v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Distribution, Metrics};

    #[test]
    fn counters_accumulate_and_default_to_zero() {
        let mut m = Metrics::new();
        m.incr("markers.rebuilds");
        m.add("markers.rebuilds", 2);
        assert_eq!(m.counter("markers.rebuilds"), 3);
        assert_eq!(m.counter("missing"), 0);
    }

    #[test]
    fn gauges_overwrite() {
        let mut m = Metrics::new();
        m.set_gauge("markers.live", 4);
        m.set_gauge("markers.live", 2);
        assert_eq!(m.gauge("markers.live"), Some(2));
        assert_eq!(m.gauge("other"), None);
    }

    #[test]
    fn distribution_tracks_extremes_and_mean() {
        let mut d = Distribution::default();
        assert_eq!(d.mean(), None);
        d.observe(4);
        d.observe(-2);
        d.observe(7);
        assert_eq!((d.count, d.min, d.max, d.sum), (3, -2, 7, 9));
        assert_eq!(d.mean(), Some(3.0));
    }

    #[test]
    fn counters_are_sorted_by_name() {
        let mut m = Metrics::new();
        m.incr("b");
        m.incr("a");
        assert_eq!(m.counters(), vec![("a", 1), ("b", 1)]);
    }
}
