//! Read-through cache for per-campaign data that rarely changes
//!
//! Entries expire after a fixed TTL; nothing invalidates them early. The
//! cache also tracks which users currently have a campaign open for editing.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::db::{CannedResponseRecord, InteractionStepRecord};

/// How long an editor counts as present after their last read
const EDITOR_PRESENCE: Duration = Duration::from_secs(120);

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

struct TtlMap<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlMap<K, V> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn get_fresh(&self, key: &K, ttl: Duration) -> Option<V> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < ttl)
            .map(|e| e.value.clone())
    }

    /// Return the cached value, or run `load` and cache its result.
    /// Errors are not cached.
    async fn get_or_load<F>(&self, key: K, ttl: Duration, load: F) -> Result<V>
    where
        F: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get_fresh(&key, ttl) {
            return Ok(value);
        }

        let value = load.await?;
        self.entries.write().insert(
            key,
            Entry {
                value: value.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Drop entries older than `ttl`
    fn cleanup_expired(&self, ttl: Duration) {
        self.entries.write().retain(|_, e| e.stored_at.elapsed() < ttl);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

pub struct CampaignCache {
    ttl: Duration,
    interaction_steps: TtlMap<i64, Vec<InteractionStepRecord>>,
    canned_responses: TtlMap<(i64, Option<i64>), Vec<CannedResponseRecord>>,
    custom_fields: TtlMap<i64, Vec<String>>,
    /// campaign id -> (user id -> (display name, last seen))
    editors: RwLock<HashMap<i64, HashMap<i64, (String, Instant)>>>,
}

impl CampaignCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            interaction_steps: TtlMap::new(),
            canned_responses: TtlMap::new(),
            custom_fields: TtlMap::new(),
            editors: RwLock::new(HashMap::new()),
        }
    }

    pub async fn interaction_steps<F>(&self, campaign_id: i64, load: F) -> Result<Vec<InteractionStepRecord>>
    where
        F: Future<Output = Result<Vec<InteractionStepRecord>>>,
    {
        self.interaction_steps.get_or_load(campaign_id, self.ttl, load).await
    }

    pub async fn canned_responses<F>(
        &self,
        campaign_id: i64,
        user_id: Option<i64>,
        load: F,
    ) -> Result<Vec<CannedResponseRecord>>
    where
        F: Future<Output = Result<Vec<CannedResponseRecord>>>,
    {
        self.canned_responses
            .get_or_load((campaign_id, user_id), self.ttl, load)
            .await
    }

    pub async fn custom_fields<F>(&self, campaign_id: i64, load: F) -> Result<Vec<String>>
    where
        F: Future<Output = Result<Vec<String>>>,
    {
        self.custom_fields.get_or_load(campaign_id, self.ttl, load).await
    }

    /// Mark `user_id` as editing the campaign and return the names of the
    /// other users seen editing it recently.
    pub fn touch_editor(&self, campaign_id: i64, user_id: i64, name: &str) -> Vec<String> {
        let now = Instant::now();
        let mut editors = self.editors.write();
        let campaign = editors.entry(campaign_id).or_default();

        campaign.retain(|_, (_, seen)| now.duration_since(*seen) < EDITOR_PRESENCE);
        campaign.insert(user_id, (name.to_string(), now));

        let mut others: Vec<(i64, String)> = campaign
            .iter()
            .filter(|(id, _)| **id != user_id)
            .map(|(id, (name, _))| (*id, name.clone()))
            .collect();
        others.sort();
        others.into_iter().map(|(_, name)| name).collect()
    }

    /// Drop expired entries and editors no longer present. Campaigns left
    /// with no editors are removed.
    pub fn cleanup_expired(&self) {
        self.interaction_steps.cleanup_expired(self.ttl);
        self.canned_responses.cleanup_expired(self.ttl);
        self.custom_fields.cleanup_expired(self.ttl);
        self.cleanup_editors(Instant::now());
    }

    fn cleanup_editors(&self, now: Instant) {
        let mut editors = self.editors.write();
        for campaign in editors.values_mut() {
            campaign.retain(|_, (_, seen)| now.duration_since(*seen) < EDITOR_PRESENCE);
        }
        editors.retain(|_, campaign| !campaign.is_empty());
    }

    /// Run [cleanup_expired](Self::cleanup_expired) every `every` until the
    /// cache is dropped
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        tokio::spawn(async move {
            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.cleanup_expired();
                debug!("Campaign cache cleaned");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_read_through_loads_once() {
        let cache = CampaignCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let keys = cache
                .custom_fields(1, async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["ward".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(keys, vec!["ward"]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_and_failed_loads_are_retried() {
        let cache = CampaignCache::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .custom_fields(1, async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Vec::new())
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let cache = CampaignCache::new(Duration::from_secs(60));
        let failed = cache
            .custom_fields(2, async { Err(anyhow::anyhow!("boom")) })
            .await;
        assert!(failed.is_err());
        let loaded = cache
            .custom_fields(2, async { Ok(vec!["zip".to_string()]) })
            .await
            .unwrap();
        assert_eq!(loaded, vec!["zip"]);
    }

    #[tokio::test]
    async fn test_cleanup_drops_expired_entries() {
        let cache = CampaignCache::new(Duration::ZERO);
        cache.custom_fields(1, async { Ok(vec!["ward".to_string()]) }).await.unwrap();
        cache.interaction_steps(1, async { Ok(Vec::new()) }).await.unwrap();
        cache.canned_responses(1, Some(3), async { Ok(Vec::new()) }).await.unwrap();
        assert_eq!(cache.custom_fields.len(), 1);

        cache.cleanup_expired();
        assert_eq!(cache.custom_fields.len(), 0);
        assert_eq!(cache.interaction_steps.len(), 0);
        assert_eq!(cache.canned_responses.len(), 0);

        let fresh = CampaignCache::new(Duration::from_secs(60));
        fresh.custom_fields(1, async { Ok(Vec::new()) }).await.unwrap();
        fresh.cleanup_expired();
        assert_eq!(fresh.custom_fields.len(), 1);
    }

    #[test]
    fn test_cleanup_removes_absent_editors() {
        let cache = CampaignCache::new(Duration::from_secs(60));
        cache.touch_editor(1, 10, "Ann");
        cache.cleanup_expired();
        assert_eq!(cache.editors.read()[&1].len(), 1);

        cache.cleanup_editors(Instant::now() + EDITOR_PRESENCE + Duration::from_secs(1));
        assert!(cache.editors.read().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_with_cache() {
        let cache = Arc::new(CampaignCache::new(Duration::ZERO));
        let handle = cache.spawn_cleanup(Duration::from_secs(1));
        drop(cache);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_touch_editor_lists_others() {
        let cache = CampaignCache::new(Duration::from_secs(60));
        assert!(cache.touch_editor(1, 10, "Ann").is_empty());
        assert_eq!(cache.touch_editor(1, 11, "Bob"), vec!["Ann"]);
        assert_eq!(cache.touch_editor(1, 10, "Ann"), vec!["Bob"]);
        assert!(cache.touch_editor(2, 10, "Ann").is_empty());
    }
}
