// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token to tenant resolution.
//!
//! [`AuthCache`] mirrors the tenant attributes the request path and the
//! dispatch pipeline read on every call. Entries never expire; every mutation
//! goes through a write-through helper that updates the store first and the
//! cache second, so a later [`AuthCache::resolve`] never sees a value older
//! than the last successful write.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use hookwire_core::{HookwireError, Subscriptions, TenantId, TenantInfo, TenantRecord, TenantStore};

/// A single cached attribute, used with [`AuthCache::invalidate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedField {
    Webhook(String),
    Identity(Option<String>),
    Events(Subscriptions),
    ProxyUrl(Option<String>),
}

/// Write-through cache from bearer token to [`TenantInfo`].
pub struct AuthCache {
    entries: DashMap<String, TenantInfo>,
    store: Arc<dyn TenantStore>,
}

impl AuthCache {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self {
            entries: DashMap::new(),
            store,
        }
    }

    /// The store this cache mirrors.
    pub fn store(&self) -> &Arc<dyn TenantStore> {
        &self.store
    }

    /// Resolves a token, loading it from the store on a miss.
    ///
    /// Fails with [`HookwireError::Unauthorized`] for an unknown token.
    pub async fn resolve(&self, token: &str) -> Result<TenantInfo, HookwireError> {
        if token.is_empty() {
            return Err(HookwireError::Unauthorized);
        }
        if let Some(info) = self.entries.get(token) {
            return Ok(info.clone());
        }

        let record = self
            .store
            .find_by_token(token)
            .await?
            .ok_or(HookwireError::Unauthorized)?;
        debug!(tenant_id = %record.id, "auth cache miss, loaded from store");

        // A write-through that raced this load wins.
        let info = self
            .entries
            .entry(token.to_string())
            .or_insert_with(|| TenantInfo::from(&record))
            .clone();
        Ok(info)
    }

    /// Cached value for `token`, without touching the store.
    pub fn get_cached(&self, token: &str) -> Option<TenantInfo> {
        self.entries.get(token).map(|entry| entry.clone())
    }

    /// Inserts a tenant directly, replacing any cached value.
    pub fn seed(&self, record: &TenantRecord) {
        self.entries
            .insert(record.token.clone(), TenantInfo::from(record));
    }

    pub fn remove(&self, token: &str) {
        self.entries.remove(token);
    }

    /// Overwrites one cached attribute. A token that is not cached is left
    /// alone; the next `resolve` loads it fresh.
    pub fn invalidate(&self, token: &str, field: CachedField) {
        if let Some(mut info) = self.entries.get_mut(token) {
            match field {
                CachedField::Webhook(webhook) => info.webhook = webhook,
                CachedField::Identity(jid) => info.jid = jid,
                CachedField::Events(subscriptions) => info.subscriptions = subscriptions,
                CachedField::ProxyUrl(proxy_url) => info.proxy_url = proxy_url,
            }
        }
    }

    pub async fn set_webhook(
        &self,
        tenant: TenantId,
        token: &str,
        webhook: &str,
    ) -> Result<(), HookwireError> {
        self.store.set_webhook(tenant, webhook).await?;
        self.invalidate(token, CachedField::Webhook(webhook.to_string()));
        Ok(())
    }

    pub async fn set_subscriptions(
        &self,
        tenant: TenantId,
        token: &str,
        subscriptions: Subscriptions,
    ) -> Result<(), HookwireError> {
        self.store
            .set_events(tenant, &subscriptions.to_stored())
            .await?;
        self.invalidate(token, CachedField::Events(subscriptions));
        Ok(())
    }

    /// Clears the stored subscription list. An empty list reads back as `All`.
    pub async fn clear_subscriptions(
        &self,
        tenant: TenantId,
        token: &str,
    ) -> Result<(), HookwireError> {
        self.store.set_events(tenant, "").await?;
        self.invalidate(token, CachedField::Events(Subscriptions::All));
        Ok(())
    }

    pub async fn set_identity(
        &self,
        tenant: TenantId,
        token: &str,
        jid: Option<&str>,
    ) -> Result<(), HookwireError> {
        self.store.set_jid(tenant, jid).await?;
        self.invalidate(token, CachedField::Identity(jid.map(str::to_string)));
        Ok(())
    }

    pub async fn set_proxy_url(
        &self,
        tenant: TenantId,
        token: &str,
        proxy_url: Option<&str>,
    ) -> Result<(), HookwireError> {
        self.store.set_proxy_url(tenant, proxy_url).await?;
        self.invalidate(token, CachedField::ProxyUrl(proxy_url.map(str::to_string)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookwire_core::EventType;
    use hookwire_test_utils::InMemoryTenantStore;

    fn setup() -> (Arc<InMemoryTenantStore>, AuthCache, TenantRecord) {
        let store = Arc::new(InMemoryTenantStore::new());
        let record = store.insert("acme", "abc");
        let cache = AuthCache::new(store.clone());
        (store, cache, record)
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let (_store, cache, _) = setup();
        assert!(matches!(
            cache.resolve("nope").await,
            Err(HookwireError::Unauthorized)
        ));
        assert!(matches!(cache.resolve("").await, Err(HookwireError::Unauthorized)));
    }

    #[tokio::test]
    async fn hit_does_not_touch_the_store() {
        let (store, cache, record) = setup();
        let first = cache.resolve("abc").await.unwrap();
        let second = cache.resolve("abc").await.unwrap();
        assert_eq!(first.id, record.id);
        assert_eq!(first, second);
        assert_eq!(store.token_lookups(), 1);
    }

    #[tokio::test]
    async fn resolve_reflects_webhook_update() {
        let (store, cache, record) = setup();
        cache.resolve("abc").await.unwrap();
        cache
            .set_webhook(record.id, "abc", "http://hooks.local/new")
            .await
            .unwrap();

        assert_eq!(cache.resolve("abc").await.unwrap().webhook, "http://hooks.local/new");
        assert_eq!(store.snapshot(record.id).unwrap().webhook, "http://hooks.local/new");
    }

    #[tokio::test]
    async fn failed_store_write_leaves_cache_untouched() {
        let (store, cache, record) = setup();
        cache.resolve("abc").await.unwrap();
        store.fail_writes(true);
        assert!(cache.set_webhook(record.id, "abc", "http://x").await.is_err());
        assert_eq!(cache.get_cached("abc").unwrap().webhook, "");
    }

    #[tokio::test]
    async fn subscriptions_and_identity_are_written_through() {
        let (store, cache, record) = setup();
        cache.resolve("abc").await.unwrap();

        cache
            .set_subscriptions(record.id, "abc", Subscriptions::parse(["Message"]))
            .await
            .unwrap();
        cache
            .set_identity(record.id, "abc", Some("5511@s.whatsapp.net"))
            .await
            .unwrap();

        let info = cache.resolve("abc").await.unwrap();
        assert!(info.subscriptions.contains(EventType::Message));
        assert!(!info.subscriptions.contains(EventType::Presence));
        assert_eq!(info.jid.as_deref(), Some("5511@s.whatsapp.net"));

        let row = store.snapshot(record.id).unwrap();
        assert_eq!(row.events, "Message");

        cache.clear_subscriptions(record.id, "abc").await.unwrap();
        assert!(cache.resolve("abc").await.unwrap().subscriptions.is_all());
        assert_eq!(store.snapshot(record.id).unwrap().events, "");
    }

    #[tokio::test]
    async fn invalidate_on_uncached_token_is_a_no_op() {
        let (_store, cache, _) = setup();
        cache.invalidate("abc", CachedField::Webhook("http://x".into()));
        assert!(cache.get_cached("abc").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn seed_and_remove() {
        let (_store, cache, mut record) = setup();
        record.webhook = "http://seeded".into();
        cache.seed(&record);
        assert_eq!(cache.get_cached("abc").unwrap().webhook, "http://seeded");
        cache.remove("abc");
        assert_eq!(cache.len(), 0);
    }
}
