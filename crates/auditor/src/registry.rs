// Presence Registry
//
// This module tracks which musicians are currently playing. Entries are
// refreshed by the ingestor and lazily evicted when a snapshot is taken.

use orchestra_core::protocol::MusicianStatus;
use orchestra_core::vocabulary::Instrument;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A musician is active while its last sound is younger than this
pub const ACTIVITY_WINDOW: Duration = Duration::from_millis(5000);

/// One tracked musician
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicianEntry {
    pub uuid: String,
    pub instrument: Instrument,
    pub last_seen: Instant,
}

impl MusicianEntry {
    pub fn is_active(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) < ACTIVITY_WINDOW
    }

    pub fn status(&self) -> MusicianStatus {
        MusicianStatus {
            uuid: self.uuid.clone(),
            instrument: self.instrument,
        }
    }
}

/// Presence registry shared by the ingestor and the snapshot server
#[derive(Debug)]
pub struct PresenceRegistry {
    entries: RwLock<HashMap<String, MusicianEntry>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record a sound from `uuid` heard at `now`
    pub async fn upsert(&self, uuid: &str, instrument: Instrument, now: Instant) {
        let mut entries = self.entries.write().await;

        match entries.get_mut(uuid) {
            Some(entry) => {
                if entry.instrument != instrument {
                    tracing::debug!(
                        "Musician {} switched from {} to {}",
                        uuid,
                        entry.instrument,
                        instrument
                    );
                }
                entry.instrument = instrument;
                // Never move last_seen backwards
                entry.last_seen = entry.last_seen.max(now);
            }
            None => {
                tracing::info!("New musician {} playing {}", uuid, instrument);
                entries.insert(
                    uuid.to_string(),
                    MusicianEntry {
                        uuid: uuid.to_string(),
                        instrument,
                        last_seen: now,
                    },
                );
            }
        }
    }

    /// Evict inactive musicians, then return the active ones sorted by uuid
    pub async fn snapshot(&self, now: Instant) -> Vec<MusicianStatus> {
        self.entries(now)
            .await
            .iter()
            .map(MusicianEntry::status)
            .collect()
    }

    /// Same sweep as [`snapshot`](Self::snapshot), keeping `last_seen`
    pub async fn entries(&self, now: Instant) -> Vec<MusicianEntry> {
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| entry.is_active(now));
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::info!("Evicted {} inactive musician(s)", evicted);
        }

        let mut active: Vec<MusicianEntry> = entries.values().cloned().collect();
        active.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        active
    }

    /// Number of stored entries, stale ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let registry = PresenceRegistry::new();
        assert!(registry.snapshot(Instant::now()).await.is_empty());
    }

    #[tokio::test]
    async fn test_replay_creates_single_entry() {
        let registry = PresenceRegistry::new();
        let t0 = Instant::now();

        for i in 0..10 {
            registry.upsert("a1", Instrument::Trumpet, t0 + ms(i * 100)).await;
        }

        let snapshot = registry.snapshot(t0 + ms(1000)).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].uuid, "a1");
        assert_eq!(snapshot[0].instrument, Instrument::Trumpet);
    }

    #[tokio::test]
    async fn test_activity_window_boundary() {
        let registry = PresenceRegistry::new();
        let t0 = Instant::now();
        registry.upsert("a1", Instrument::Piano, t0).await;

        assert_eq!(registry.snapshot(t0 + ms(4999)).await.len(), 1);
        assert!(registry.snapshot(t0 + ms(5000)).await.is_empty());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_refresh_extends_activity() {
        let registry = PresenceRegistry::new();
        let t0 = Instant::now();
        registry.upsert("a1", Instrument::Drum, t0).await;
        registry.upsert("a1", Instrument::Drum, t0 + ms(3000)).await;

        assert_eq!(registry.snapshot(t0 + ms(7000)).await.len(), 1);
        assert!(registry.snapshot(t0 + ms(8000)).await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_entries_kept_without_readers() {
        let registry = PresenceRegistry::new();
        let t0 = Instant::now();
        registry.upsert("a1", Instrument::Flute, t0).await;
        registry.upsert("b2", Instrument::Violin, t0).await;

        // Eviction only happens on snapshot
        assert_eq!(registry.len().await, 2);
        assert!(registry.snapshot(t0 + ms(60_000)).await.is_empty());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_latest_instrument_wins() {
        let registry = PresenceRegistry::new();
        let t0 = Instant::now();
        registry.upsert("a1", Instrument::Piano, t0).await;
        registry.upsert("a1", Instrument::Violin, t0 + ms(10)).await;

        let snapshot = registry.snapshot(t0 + ms(20)).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].instrument, Instrument::Violin);
    }

    #[tokio::test]
    async fn test_older_timestamp_does_not_rewind() {
        let registry = PresenceRegistry::new();
        let t0 = Instant::now();
        registry.upsert("a1", Instrument::Piano, t0 + ms(4000)).await;
        registry.upsert("a1", Instrument::Piano, t0).await;

        let entries = registry.entries(t0 + ms(6000)).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].last_seen, t0 + ms(4000));
    }

    #[tokio::test]
    async fn test_snapshot_sorted_by_uuid() {
        let registry = PresenceRegistry::new();
        let t0 = Instant::now();
        registry.upsert("c", Instrument::Drum, t0).await;
        registry.upsert("a", Instrument::Piano, t0).await;
        registry.upsert("b", Instrument::Flute, t0).await;

        let uuids: Vec<String> = registry
            .snapshot(t0)
            .await
            .into_iter()
            .map(|s| s.uuid)
            .collect();
        assert_eq!(uuids, vec!["a", "b", "c"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_and_snapshots() {
        let registry = Arc::new(PresenceRegistry::new());
        let t0 = Instant::now();
        let identities = 8;
        let writes_per_task = 200;

        let mut handles = Vec::new();
        for writer in 0..identities {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let uuid = format!("musician-{}", writer);
                for i in 0..writes_per_task {
                    let instrument = Instrument::ALL[i % Instrument::ALL.len()];
                    registry.upsert(&uuid, instrument, t0 + ms(i as u64)).await;
                }
            }));
        }

        let reader = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    let entries = registry.entries(t0).await;
                    let unique: HashSet<&str> = entries.iter().map(|e| e.uuid.as_str()).collect();
                    assert_eq!(unique.len(), entries.len());
                    tokio::task::yield_now().await;
                }
            })
        };

        for handle in handles {
            handle.await.unwrap();
        }
        reader.await.unwrap();

        let entries = registry.entries(t0 + ms(writes_per_task as u64)).await;
        assert_eq!(entries.len(), identities);
        for entry in entries {
            assert_eq!(entry.last_seen, t0 + ms(writes_per_task as u64 - 1));
        }
    }
}
