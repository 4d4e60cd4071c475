//! Site storage: load, list, rename, publish, delete, and custom domains.

use crate::error::{Result, StoreError};
use crate::store::{parse_id, parse_timestamp, timestamp, SqliteStore};
use crate::versions::document_from_row;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use vibe_core::site::normalize_domain;
use vibe_core::{DomainBinding, DomainMethod, DomainStatus, PersistenceError, Site, SiteId, SiteSummary, UserId};

const SUMMARY_SELECT: &str = "
    SELECT s.id, s.user_id, s.title, s.subdomain, s.custom_domain, s.custom_domain_status,
           s.is_published, s.current_version_id, s.created_at, s.updated_at,
           v.markup, v.content_hash
    FROM sites s
    LEFT JOIN versions v ON v.id = s.current_version_id";

impl SqliteStore {
    /// Loads a site with its current document.
    pub fn load_site(&self, site_id: SiteId) -> Result<SiteSummary> {
        let conn = self.conn.lock();
        load_summary(&conn, site_id)
    }

    /// Lists a user's sites, most recently updated first.
    pub fn list_sites(&self, user_id: UserId) -> Result<Vec<SiteSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{SUMMARY_SELECT} WHERE s.user_id = ?1 ORDER BY s.updated_at DESC, s.rowid DESC"
        ))?;
        let rows = stmt.query_map([user_id.to_string()], raw_summary)?;
        let mut sites = Vec::new();
        for row in rows {
            sites.push(summary_from_raw(row?)?);
        }
        Ok(sites)
    }

    /// Renames a site without creating a version.
    pub fn update_title(&self, site_id: SiteId, title: &str) -> Result<()> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE sites SET title = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![title, timestamp(Utc::now()), site_id.to_string()],
        )?;
        if rows == 0 {
            return Err(StoreError::SiteNotFound(site_id));
        }
        Ok(())
    }

    /// Sets the publish flag; repeating the current value succeeds.
    pub fn set_published(&self, site_id: SiteId, published: bool) -> Result<Site> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE sites SET is_published = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![published, timestamp(Utc::now()), site_id.to_string()],
        )?;
        if rows == 0 {
            return Err(StoreError::SiteNotFound(site_id));
        }
        tracing::info!(
            "Site {} {}",
            site_id.short(),
            if published { "published" } else { "unpublished" }
        );
        Ok(load_summary(&conn, site_id)?.site)
    }

    /// Deletes a site; versions and agent settings go with it.
    pub fn delete_site(&self, site_id: SiteId) -> Result<()> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM sites WHERE id = ?1", [site_id.to_string()])?;
        if rows == 0 {
            return Err(StoreError::SiteNotFound(site_id));
        }
        tracing::info!("Deleted site {}", site_id.short());
        Ok(())
    }

    /// Records a pending custom domain. No DNS check is made.
    pub fn connect_domain(
        &self,
        site_id: SiteId,
        domain: &str,
        method: DomainMethod,
    ) -> Result<DomainBinding> {
        let domain = normalize_domain(domain).map_err(|e| match e {
            PersistenceError::InvalidDomain(d) => StoreError::InvalidDomain(d),
            other => StoreError::Corrupt(other.to_string()),
        })?;
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE sites SET custom_domain = ?1, custom_domain_status = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![
                &domain,
                DomainStatus::Pending.to_string(),
                timestamp(Utc::now()),
                site_id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::SiteNotFound(site_id));
        }
        tracing::info!("Domain {} pending for site {}", domain, site_id.short());
        Ok(DomainBinding::pending(site_id, domain, method))
    }
}

fn load_summary(conn: &Connection, site_id: SiteId) -> Result<SiteSummary> {
    let raw = conn
        .query_row(
            &format!("{SUMMARY_SELECT} WHERE s.id = ?1"),
            [site_id.to_string()],
            raw_summary,
        )
        .optional()?
        .ok_or(StoreError::SiteNotFound(site_id))?;
    summary_from_raw(raw)
}

struct RawSummary {
    id: String,
    user_id: String,
    title: String,
    subdomain: String,
    custom_domain: Option<String>,
    custom_domain_status: Option<String>,
    is_published: bool,
    current_version_id: Option<String>,
    created_at: String,
    updated_at: String,
    markup: Option<String>,
    content_hash: Option<String>,
}

fn raw_summary(row: &Row<'_>) -> rusqlite::Result<RawSummary> {
    Ok(RawSummary {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        subdomain: row.get(3)?,
        custom_domain: row.get(4)?,
        custom_domain_status: row.get(5)?,
        is_published: row.get(6)?,
        current_version_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        markup: row.get(10)?,
        content_hash: row.get(11)?,
    })
}

fn summary_from_raw(raw: RawSummary) -> Result<SiteSummary> {
    let custom_domain_status = raw
        .custom_domain_status
        .as_deref()
        .map(str::parse::<DomainStatus>)
        .transpose()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let current_version_id = raw
        .current_version_id
        .as_deref()
        .map(|id| parse_id("current_version_id", id))
        .transpose()?;
    let document = match (raw.markup, raw.content_hash) {
        (Some(markup), Some(hash)) => Some(document_from_row(markup, &hash)?),
        (None, None) if current_version_id.is_none() => None,
        _ => {
            return Err(StoreError::Corrupt(format!(
                "site {} points at a missing version",
                raw.id
            )))
        }
    };

    Ok(SiteSummary {
        site: Site {
            id: parse_id("site id", &raw.id)?,
            user_id: parse_id("site user_id", &raw.user_id)?,
            title: raw.title,
            subdomain: raw.subdomain,
            custom_domain: raw.custom_domain,
            custom_domain_status,
            is_published: raw.is_published,
            current_version_id,
            created_at: parse_timestamp("site created_at", &raw.created_at)?,
            updated_at: parse_timestamp("site updated_at", &raw.updated_at)?,
        },
        document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_core::site::SaveRequest;
    use vibe_core::User;
    use vibe_document::Document;

    fn store_with_site() -> (SqliteStore, User, SiteId) {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = store.fetch_or_create_user("ada@example.com").unwrap();
        let receipt = store
            .save_version(&SaveRequest {
                user_id: user.id,
                site_id: None,
                title: "Bakery".to_string(),
                document: Document::new("<h1>Bakery</h1>"),
            })
            .unwrap();
        (store, user, receipt.site_id)
    }

    #[test]
    fn load_returns_current_document() {
        let (store, user, site_id) = store_with_site();

        let summary = store.load_site(site_id).unwrap();

        assert_eq!(summary.site.user_id, user.id);
        assert_eq!(summary.site.title, "Bakery");
        assert!(summary.site.subdomain.starts_with("site-"));
        assert!(!summary.site.is_published);
        assert_eq!(summary.document.unwrap().markup(), "<h1>Bakery</h1>");
    }

    #[test]
    fn rename_keeps_versions() {
        let (store, _, site_id) = store_with_site();
        store.update_title(site_id, "Patisserie").unwrap();
        assert_eq!(store.load_site(site_id).unwrap().site.title, "Patisserie");
        assert_eq!(store.list_versions(site_id).unwrap().len(), 1);
    }

    #[test]
    fn publishing_twice_is_a_no_op() {
        let (store, _, site_id) = store_with_site();

        let first = store.set_published(site_id, true).unwrap();
        let second = store.set_published(site_id, true).unwrap();

        assert!(first.is_published);
        assert!(second.is_published);
        assert!(!store.set_published(site_id, false).unwrap().is_published);
    }

    #[test]
    fn delete_cascades() {
        let (store, _, site_id) = store_with_site();

        store.delete_site(site_id).unwrap();

        let orphans: i64 = store
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM versions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(matches!(store.load_site(site_id), Err(StoreError::SiteNotFound(_))));
        assert!(matches!(store.delete_site(site_id), Err(StoreError::SiteNotFound(_))));
    }

    #[test]
    fn domain_binding_is_pending() {
        let (store, _, site_id) = store_with_site();

        let binding = store
            .connect_domain(site_id, "Shop.Example.com", DomainMethod::Manual)
            .unwrap();

        assert_eq!(binding.domain, "shop.example.com");
        assert_eq!(binding.status, DomainStatus::Pending);
        let site = store.load_site(site_id).unwrap().site;
        assert_eq!(site.custom_domain.as_deref(), Some("shop.example.com"));
        assert_eq!(site.custom_domain_status, Some(DomainStatus::Pending));
    }

    #[test]
    fn dotless_domain_is_rejected() {
        let (store, _, site_id) = store_with_site();
        assert!(matches!(
            store.connect_domain(site_id, "localhost", DomainMethod::Auto),
            Err(StoreError::InvalidDomain(_))
        ));
        assert_eq!(store.load_site(site_id).unwrap().site.custom_domain, None);
    }

    #[test]
    fn operations_on_missing_site_fail() {
        let (store, _, _) = store_with_site();
        let missing = SiteId::new();
        assert!(matches!(store.update_title(missing, "x"), Err(StoreError::SiteNotFound(_))));
        assert!(matches!(store.set_published(missing, true), Err(StoreError::SiteNotFound(_))));
        assert!(matches!(
            store.connect_domain(missing, "a.com", DomainMethod::Manual),
            Err(StoreError::SiteNotFound(_))
        ));
    }
}
