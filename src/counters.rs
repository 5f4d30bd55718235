use std::collections::BTreeMap;

/// Named event counters for production monitoring of applied rewrites.
///
/// Counter names encode what happened and where, e.g.
/// `vt-helper/inlinecheck/aaload/(Point.sum()I)/bc=12`.
#[derive(Debug, Default)]
pub struct DebugCounters {
    counts: BTreeMap<String, u64>,
}

impl DebugCounters {
    pub fn bump(&mut self, name: String) {
        *self.counts.entry(name).or_insert(0) += 1;
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// Total across counters whose name starts with `prefix`.
    pub fn total_with_prefix(&self, prefix: &str) -> u64 {
        self.counts
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(_, v)| v)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
