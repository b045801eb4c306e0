//! Bounded side cache of rejected senders.

use std::net::Ipv4Addr;
use std::time::Instant;

use ahash::AHashMap;

use crate::UI_NODE_TABLE_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiNodeCategory {
    Unidentified,
    GroupMismatch,
    IpMismatch,
    Unresolvable,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UiNodeKey {
    pub hostname: String,
    pub group_id: String,
    pub source_ip: Ipv4Addr,
}

#[derive(Debug, Clone)]
pub struct UiNodeEntry {
    pub category: UiNodeCategory,
    pub last_received: Instant,
}

#[derive(Debug, Default, Clone)]
pub struct UiNodeTable(AHashMap<UiNodeKey, UiNodeEntry>);

impl UiNodeTable {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &UiNodeKey) -> Option<&UiNodeEntry> {
        self.0.get(key)
    }

    /// Insert or refresh the entry for `key`. If an entry already exists
    /// with a different category, it is replaced outright rather than
    /// merely touched, matching the protocol's "reclassify on mismatch"
    /// behavior.
    pub fn upsert(&mut self, key: UiNodeKey, category: UiNodeCategory, now: Instant) {
        if let Some(existing) = self.0.get(&key) {
            if existing.category == category {
                self.0.get_mut(&key).unwrap().last_received = now;
                return;
            }
        }

        if self.0.len() >= UI_NODE_TABLE_CAPACITY && !self.0.contains_key(&key) {
            self.evict_oldest();
        }

        self.0.insert(
            key,
            UiNodeEntry {
                category,
                last_received: now,
            },
        );
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .0
            .iter()
            .min_by_key(|(_, v)| v.last_received)
            .map(|(k, _)| k.clone())
        {
            self.0.remove(&oldest_key);
        }
    }

    /// Remove every entry older than `max_age` relative to `now`.
    pub fn cleanup(&mut self, now: Instant, max_age: std::time::Duration) {
        self.0
            .retain(|_, entry| now.saturating_duration_since(entry.last_received) <= max_age);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key(host: &str) -> UiNodeKey {
        UiNodeKey {
            hostname: host.to_string(),
            group_id: "g".to_string(),
            source_ip: Ipv4Addr::new(10, 0, 0, 1),
        }
    }

    #[test]
    fn upsert_refreshes_matching_category() {
        let mut table = UiNodeTable::default();
        let now = Instant::now();
        table.upsert(key("a"), UiNodeCategory::Unidentified, now);
        assert_eq!(table.len(), 1);

        let later = now + Duration::from_secs(1);
        table.upsert(key("a"), UiNodeCategory::Unidentified, later);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&key("a")).unwrap().last_received, later);
    }

    #[test]
    fn upsert_replaces_on_category_change() {
        let mut table = UiNodeTable::default();
        let now = Instant::now();
        table.upsert(key("a"), UiNodeCategory::Unidentified, now);
        table.upsert(key("a"), UiNodeCategory::IpMismatch, now);
        assert_eq!(table.get(&key("a")).unwrap().category, UiNodeCategory::IpMismatch);
    }

    #[test]
    fn cleanup_removes_stale_entries() {
        let mut table = UiNodeTable::default();
        let now = Instant::now();
        table.upsert(key("a"), UiNodeCategory::Unidentified, now);

        let much_later = now + Duration::from_secs(7200);
        table.cleanup(much_later, Duration::from_secs(3600));
        assert!(table.is_empty());
    }
}
