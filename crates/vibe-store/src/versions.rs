//! Version storage: append-only snapshots of a site's document.

use crate::error::{Result, StoreError};
use crate::store::{parse_id, parse_timestamp, timestamp, SqliteStore};
use chrono::Utc;
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior};
use vibe_core::site::{generate_subdomain, SaveReceipt, SaveRequest};
use vibe_core::{SiteId, Version, VersionId};
use vibe_document::{ContentHash, Document};

/// Name of the chat agent every new site starts with
pub const DEFAULT_AGENT_NAME: &str = "Support Bot";

impl SqliteStore {
    /// Append a version and make it current, creating the site if needed.
    ///
    /// Sequence numbers are assigned inside one immediate transaction, so
    /// concurrent saves to the same site never share a number.
    pub fn save_version(&self, request: &SaveRequest) -> Result<SaveReceipt> {
        let now = Utc::now();
        let at = timestamp(now);
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (site_id, created_site) = match request.site_id {
            Some(id) => {
                let exists = tx
                    .query_row("SELECT 1 FROM sites WHERE id = ?1", [id.to_string()], |_| Ok(()))
                    .optional()?;
                if exists.is_none() {
                    return Err(StoreError::SiteNotFound(id));
                }
                (id, false)
            }
            None => (create_site(&tx, request, now)?, true),
        };

        let sequence_number: u32 = tx.query_row(
            "SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM versions WHERE site_id = ?1",
            [site_id.to_string()],
            |row| row.get(0),
        )?;
        let version_id = VersionId::new();
        tx.execute(
            "INSERT INTO versions (id, site_id, sequence_number, markup, content_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                version_id.to_string(),
                site_id.to_string(),
                sequence_number,
                request.document.markup(),
                request.document.hash().to_string(),
                &at,
            ],
        )?;
        tx.execute(
            "UPDATE sites SET current_version_id = ?1, title = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![version_id.to_string(), &request.title, &at, site_id.to_string()],
        )?;
        tx.commit()?;

        tracing::debug!(
            "Stored version {} of site {} ({})",
            sequence_number,
            site_id.short(),
            request.document.hash().short()
        );
        Ok(SaveReceipt {
            site_id,
            version_id,
            sequence_number,
            created_site,
        })
    }

    /// Versions of a site, oldest first.
    pub fn list_versions(&self, site_id: SiteId) -> Result<Vec<Version>> {
        let conn = self.conn.lock();
        let exists = conn
            .query_row("SELECT 1 FROM sites WHERE id = ?1", [site_id.to_string()], |_| Ok(()))
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::SiteNotFound(site_id));
        }

        let mut stmt = conn.prepare(
            "SELECT id, sequence_number, markup, content_hash, created_at
             FROM versions WHERE site_id = ?1 ORDER BY sequence_number ASC",
        )?;
        let rows = stmt.query_map([site_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut versions = Vec::new();
        for row in rows {
            let (id, sequence_number, markup, hash, created_at) = row?;
            versions.push(Version {
                id: parse_id("version id", &id)?,
                site_id,
                sequence_number,
                document: document_from_row(markup, &hash)?,
                created_at: parse_timestamp("version created_at", &created_at)?,
            });
        }
        Ok(versions)
    }
}

/// Insert a site row and its agent settings
fn create_site(tx: &Transaction<'_>, request: &SaveRequest, now: chrono::DateTime<Utc>) -> Result<SiteId> {
    let site_id = SiteId::new();
    let at = timestamp(now);
    tx.execute(
        "INSERT INTO sites (id, user_id, title, subdomain, is_published, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
        rusqlite::params![
            site_id.to_string(),
            request.user_id.to_string(),
            &request.title,
            generate_subdomain(request.user_id, now),
            &at,
        ],
    )?;
    tx.execute(
        "INSERT INTO agent_settings (site_id, agent_name, is_active, created_at) VALUES (?1, ?2, 1, ?3)",
        rusqlite::params![site_id.to_string(), DEFAULT_AGENT_NAME, &at],
    )?;
    tracing::info!("Created site {} for user {}", site_id.short(), request.user_id.short());
    Ok(site_id)
}

/// Rebuild a stored document, checking its hash
pub(crate) fn document_from_row(markup: String, hash: &str) -> Result<Document> {
    let stored: ContentHash = hash
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("version content hash: {e}")))?;
    if !stored.verifies(&markup) {
        return Err(StoreError::Corrupt(format!(
            "version content hash mismatch: stored {}, computed {}",
            stored.short(),
            ContentHash::of_markup(&markup).short()
        )));
    }
    Ok(Document::new(markup))
}
