//! Device Enumerator
//!
//! Offers the device names used in earlier runs as suggestions when the
//! subject types the name of their headphones.

use std::collections::HashSet;

use crate::history::record::SavedResult;
use crate::history::storage::StorageBackend;
use crate::history::store::HistoryStore;

/// Source of previously used device names
pub trait DeviceEnumerator {
    /// Known device names, most relevant first
    fn devices(&self) -> Vec<String>;
}

impl<B: StorageBackend> DeviceEnumerator for HistoryStore<B> {
    fn devices(&self) -> Vec<String> {
        self.known_devices()
    }
}

/// Distinct non-empty device names in the order they appear in `results`.
pub fn known_devices(results: &[SavedResult]) -> Vec<String> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter_map(|r| r.device.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter(|d| seen.insert(d.to_string()))
        .map(str::to_string)
        .collect()
}

/// Devices whose name contains `query`, ignoring case. An empty query matches all.
pub fn filter_suggestions<'a>(devices: &'a [String], query: &str) -> Vec<&'a str> {
    let needle = query.trim().to_lowercase();
    devices
        .iter()
        .filter(|d| d.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}
