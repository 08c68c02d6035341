//! Secondary indices over cache records
//!
//! Maps `url`, `engineType` and `timestamp` to entry ids. Ids within one key
//! are kept sorted so lookups return them in a stable order.

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use tessera_core::EngineKind;

use super::entry::EntrySummary;

#[derive(Debug, Default)]
pub(crate) struct CacheIndex {
    records: AHashMap<String, EntrySummary>,
    by_url: AHashMap<String, BTreeSet<String>>,
    by_engine: AHashMap<EngineKind, BTreeSet<String>>,
    by_timestamp: BTreeMap<u64, BTreeSet<String>>,
}

fn unlink<K: std::hash::Hash + Eq>(map: &mut AHashMap<K, BTreeSet<String>>, key: &K, id: &str) {
    if let Some(ids) = map.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            map.remove(key);
        }
    }
}

impl CacheIndex {
    /// Insert or replace a record
    pub fn insert(&mut self, summary: EntrySummary) {
        self.remove(&summary.id);

        let id = summary.id.clone();
        self.by_url
            .entry(summary.url.clone())
            .or_default()
            .insert(id.clone());
        self.by_engine
            .entry(summary.engine_type)
            .or_default()
            .insert(id.clone());
        self.by_timestamp
            .entry(summary.timestamp)
            .or_default()
            .insert(id.clone());
        self.records.insert(id, summary);
    }

    /// Remove a record, returning it if present
    pub fn remove(&mut self, id: &str) -> Option<EntrySummary> {
        let summary = self.records.remove(id)?;
        unlink(&mut self.by_url, &summary.url, id);
        unlink(&mut self.by_engine, &summary.engine_type, id);
        if let Some(ids) = self.by_timestamp.get_mut(&summary.timestamp) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_timestamp.remove(&summary.timestamp);
            }
        }
        Some(summary)
    }

    pub fn get(&self, id: &str) -> Option<&EntrySummary> {
        self.records.get(id)
    }

    /// Records stored for a url, across engines
    pub fn for_url(&self, url: &str) -> impl Iterator<Item = &EntrySummary> {
        self.by_url
            .get(url)
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id))
    }

    /// Ids of every record written by an engine
    pub fn ids_for_engine(&self, engine: EngineKind) -> Vec<String> {
        self.by_engine
            .get(&engine)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of every record with `timestamp <= cutoff`
    pub fn ids_at_or_before(&self, cutoff: u64) -> Vec<String> {
        self.by_timestamp
            .range(..=cutoff)
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// All records, oldest first
    pub fn iter_by_age(&self) -> impl Iterator<Item = &EntrySummary> {
        self.by_timestamp
            .values()
            .flatten()
            .filter_map(|id| self.records.get(id))
    }

    pub fn count_for_engine(&self, engine: EngineKind) -> usize {
        self.by_engine.get(&engine).map_or(0, BTreeSet::len)
    }

    pub fn oldest(&self) -> Option<u64> {
        self.by_timestamp.keys().next().copied()
    }

    pub fn newest(&self) -> Option<u64> {
        self.by_timestamp.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.by_url.clear();
        self.by_engine.clear();
        self.by_timestamp.clear();
    }
}
