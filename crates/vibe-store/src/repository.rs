//! [`SiteRepository`] over the blocking store
//!
//! Every call runs on tokio's blocking pool and maps [`StoreError`] into
//! the core's [`PersistenceError`].

use crate::error::StoreError;
use crate::store::SqliteStore;
use async_trait::async_trait;
use vibe_core::{
    DomainBinding, DomainMethod, PersistenceError, SaveReceipt, SaveRequest, Site, SiteId,
    SiteRepository, SiteSummary, User, UserId, Version,
};

fn logged(op: &str, err: StoreError) -> PersistenceError {
    tracing::warn!("Store {} failed: {}", op, err);
    err.into()
}

#[async_trait]
impl SiteRepository for SqliteStore {
    async fn fetch_or_create_user(&self, email: &str) -> Result<User, PersistenceError> {
        let email = email.to_string();
        self.blocking(move |store| store.fetch_or_create_user(&email))
            .await
            .map_err(|e| logged("fetch_or_create_user", e))
    }

    async fn save_version(&self, request: SaveRequest) -> Result<SaveReceipt, PersistenceError> {
        self.blocking(move |store| store.save_version(&request))
            .await
            .map_err(|e| logged("save_version", e))
    }

    async fn update_title(&self, site_id: SiteId, title: &str) -> Result<(), PersistenceError> {
        let title = title.to_string();
        self.blocking(move |store| store.update_title(site_id, &title))
            .await
            .map_err(|e| logged("update_title", e))
    }

    async fn load_site(&self, site_id: SiteId) -> Result<SiteSummary, PersistenceError> {
        self.blocking(move |store| store.load_site(site_id))
            .await
            .map_err(|e| logged("load_site", e))
    }

    async fn list_sites(&self, user_id: UserId) -> Result<Vec<SiteSummary>, PersistenceError> {
        self.blocking(move |store| store.list_sites(user_id))
            .await
            .map_err(|e| logged("list_sites", e))
    }

    async fn list_versions(&self, site_id: SiteId) -> Result<Vec<Version>, PersistenceError> {
        self.blocking(move |store| store.list_versions(site_id))
            .await
            .map_err(|e| logged("list_versions", e))
    }

    async fn set_published(&self, site_id: SiteId, published: bool) -> Result<Site, PersistenceError> {
        self.blocking(move |store| store.set_published(site_id, published))
            .await
            .map_err(|e| logged("set_published", e))
    }

    async fn delete_site(&self, site_id: SiteId) -> Result<(), PersistenceError> {
        self.blocking(move |store| store.delete_site(site_id))
            .await
            .map_err(|e| logged("delete_site", e))
    }

    async fn connect_domain(
        &self,
        site_id: SiteId,
        domain: &str,
        method: DomainMethod,
    ) -> Result<DomainBinding, PersistenceError> {
        let domain = domain.to_string();
        self.blocking(move |store| store.connect_domain(site_id, &domain, method))
            .await
            .map_err(|e| logged("connect_domain", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_document::Document;

    #[tokio::test]
    async fn concurrent_saves_get_distinct_sequence_numbers() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = SiteRepository::fetch_or_create_user(&store, "ada@example.com").await.unwrap();
        let first = SiteRepository::save_version(
            &store,
            SaveRequest {
                user_id: user.id,
                site_id: None,
                title: "Race".to_string(),
                document: Document::new("<p>0</p>"),
            },
        )
        .await
        .unwrap();

        let saves = (1..=8).map(|i| {
            let store = store.clone();
            let request = SaveRequest {
                user_id: user.id,
                site_id: Some(first.site_id),
                title: "Race".to_string(),
                document: Document::new(format!("<p>{i}</p>")),
            };
            tokio::spawn(async move { SiteRepository::save_version(&store, request).await })
        });
        let mut numbers = Vec::new();
        for handle in saves.collect::<Vec<_>>() {
            numbers.push(handle.await.unwrap().unwrap().sequence_number);
        }
        numbers.sort_unstable();

        assert_eq!(numbers, (2..=9).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn missing_site_maps_to_persistence_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let missing = SiteId::new();
        assert_eq!(
            SiteRepository::load_site(&store, missing).await.unwrap_err(),
            PersistenceError::SiteNotFound(missing)
        );
    }
}
