//! Sites, versions and the repository contract
//!
//! A site owns an append-only sequence of versions and points at the
//! current one. Versions are never edited; they disappear only with
//! their site.

use crate::error::PersistenceError;
use crate::types::{SiteId, UserId, VersionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use url::form_urlencoded;
use vibe_document::Document;

/// Title of a site nobody has named yet
pub const DEFAULT_TITLE: &str = "Untitled Project";

/// Starter credits for new users
pub const STARTER_CREDITS: i64 = 10;

/// Name used when the email gives nothing to work with
pub const FALLBACK_USER_NAME: &str = "Demo User";

/// IPv4 address custom domains point their apex at
pub const DNS_APEX_ADDRESS: &str = "76.76.21.21";

/// Target of the `www` CNAME record
pub const DNS_CNAME_TARGET: &str = "cname.vibebuilder.com";

/// An account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    pub credits: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// First word of the display name
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("there")
    }
}

/// Display name derived from an email's local part
///
/// `jane.doe@x.io` becomes `Jane Doe`.
#[must_use]
pub fn display_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let words: Vec<String> = local
        .split(|c: char| matches!(c, '.' | '_' | '-' | '+') || c.is_ascii_digit())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect();
    if words.is_empty() {
        FALLBACK_USER_NAME.to_string()
    } else {
        words.join(" ")
    }
}

/// Generated avatar URL for a display name
#[must_use]
pub fn avatar_url(name: &str) -> String {
    let name: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!("https://ui-avatars.com/api/?name={name}&background=0D8ABC&color=fff")
}

/// Subdomain slug for a new site
///
/// Unique per user and millisecond, with a random suffix for sites created
/// within the same millisecond.
#[must_use]
pub fn generate_subdomain(user_id: UserId, now: DateTime<Utc>) -> String {
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..4];
    format!("site-{}-{}-{suffix}", user_id.short(), now.timestamp_millis())
}

/// State of a custom domain binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    /// Recorded, DNS not yet checked
    Pending,
    /// Serving traffic
    Active,
}

impl Display for DomainStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Active => f.write_str("active"),
        }
    }
}

impl FromStr for DomainStatus {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            other => Err(PersistenceError::Corrupt(format!("unknown domain status {other:?}"))),
        }
    }
}

/// How the user wants to configure DNS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainMethod {
    /// Provider-assisted (Domain Connect)
    Auto,
    /// User enters records by hand
    Manual,
}

impl FromStr for DomainMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown domain method: {other}")),
        }
    }
}

/// A DNS record the user must create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Record type (`A`, `CNAME`)
    pub kind: String,
    /// Host label (`@`, `www`)
    pub host: String,
    /// Record value
    pub value: String,
}

/// Records every custom domain needs
#[must_use]
pub fn dns_records() -> Vec<DnsRecord> {
    vec![
        DnsRecord {
            kind: "A".into(),
            host: "@".into(),
            value: DNS_APEX_ADDRESS.into(),
        },
        DnsRecord {
            kind: "CNAME".into(),
            host: "www".into(),
            value: DNS_CNAME_TARGET.into(),
        },
    ]
}

/// Domain Connect URL for provider-assisted setup
#[must_use]
pub fn domain_connect_url(domain: &str) -> String {
    let domain: String = form_urlencoded::byte_serialize(domain.as_bytes()).collect();
    format!(
        "https://dcc.godaddy.com/manage/properties?domain={domain}&spid=VIBEBUILDER_DNS_SERVICE&namespace=vibebuilder"
    )
}

/// Normalize a custom domain
///
/// # Errors
/// [`PersistenceError::InvalidDomain`] when the domain is blank, has no
/// dot, or contains whitespace or a scheme.
pub fn normalize_domain(domain: &str) -> Result<String, PersistenceError> {
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    let valid = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.contains("..")
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if valid {
        Ok(domain)
    } else {
        Err(PersistenceError::InvalidDomain(domain))
    }
}

/// A pending custom domain and the setup it needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainBinding {
    pub site_id: SiteId,
    pub domain: String,
    pub method: DomainMethod,
    pub status: DomainStatus,
    /// Records for manual setup
    pub records: Vec<DnsRecord>,
    /// Provider URL, for [`DomainMethod::Auto`]
    pub connect_url: Option<String>,
}

impl DomainBinding {
    /// Pending binding with setup instructions
    #[must_use]
    pub fn pending(site_id: SiteId, domain: String, method: DomainMethod) -> Self {
        let connect_url = (method == DomainMethod::Auto).then(|| domain_connect_url(&domain));
        Self {
            site_id,
            domain,
            method,
            status: DomainStatus::Pending,
            records: dns_records(),
            connect_url,
        }
    }
}

/// A site record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub user_id: UserId,
    pub title: String,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub custom_domain_status: Option<DomainStatus>,
    pub is_published: bool,
    pub current_version_id: Option<VersionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable snapshot in a site's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub site_id: SiteId,
    /// Starts at 1, increases by one per save
    pub sequence_number: u32,
    pub document: Document,
    pub created_at: DateTime<Utc>,
}

/// A site with its current document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSummary {
    pub site: Site,
    /// Current version's document, if any
    pub document: Option<Document>,
}

/// Input to [`SiteRepository::save_version`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub user_id: UserId,
    /// Existing site, or `None` to create one
    pub site_id: Option<SiteId>,
    pub title: String,
    pub document: Document,
}

/// Result of a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReceipt {
    pub site_id: SiteId,
    pub version_id: VersionId,
    pub sequence_number: u32,
    /// Whether the save created the site
    pub created_site: bool,
}

/// Relational store for users, sites and versions
#[async_trait]
pub trait SiteRepository: Send + Sync {
    /// Find a user by email, creating it on first sight
    async fn fetch_or_create_user(&self, email: &str) -> Result<User, PersistenceError>;

    /// Append a version, creating the site if needed, and make it current
    ///
    /// Not idempotent: retrying a save that actually succeeded appends
    /// another version.
    async fn save_version(&self, request: SaveRequest) -> Result<SaveReceipt, PersistenceError>;

    /// Rename a site without creating a version
    async fn update_title(&self, site_id: SiteId, title: &str) -> Result<(), PersistenceError>;

    /// Load a site with its current document
    async fn load_site(&self, site_id: SiteId) -> Result<SiteSummary, PersistenceError>;

    /// Sites of a user, most recently updated first
    async fn list_sites(&self, user_id: UserId) -> Result<Vec<SiteSummary>, PersistenceError>;

    /// Versions of a site, oldest first
    async fn list_versions(&self, site_id: SiteId) -> Result<Vec<Version>, PersistenceError>;

    /// Set the publish flag; setting it to its current value succeeds
    async fn set_published(&self, site_id: SiteId, published: bool) -> Result<Site, PersistenceError>;

    /// Delete a site and its versions
    async fn delete_site(&self, site_id: SiteId) -> Result<(), PersistenceError>;

    /// Record a pending custom domain
    async fn connect_domain(
        &self,
        site_id: SiteId,
        domain: &str,
        method: DomainMethod,
    ) -> Result<DomainBinding, PersistenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_come_from_email() {
        assert_eq!(display_name_from_email("jane.doe@example.com"), "Jane Doe");
        assert_eq!(display_name_from_email("BOB_smith42@x.io"), "Bob Smith");
        assert_eq!(display_name_from_email("123@x.io"), FALLBACK_USER_NAME);
    }

    #[test]
    fn avatar_encodes_name() {
        assert_eq!(
            avatar_url("Demo User"),
            "https://ui-avatars.com/api/?name=Demo+User&background=0D8ABC&color=fff"
        );
    }

    #[test]
    fn subdomains_differ_within_a_millisecond() {
        let user = UserId::new();
        let now = Utc::now();
        let a = generate_subdomain(user, now);
        let b = generate_subdomain(user, now);
        assert!(a.starts_with(&format!("site-{}-", user.short())));
        assert_ne!(a, b);
    }

    #[test]
    fn domains_need_a_dot() {
        assert_eq!(normalize_domain(" Shop.Example.COM. ").unwrap(), "shop.example.com");
        for bad in ["localhost", "", "exa mple.com", "https://x.com", ".com", "a..b"] {
            assert!(matches!(normalize_domain(bad), Err(PersistenceError::InvalidDomain(_))), "{bad}");
        }
    }

    #[test]
    fn auto_binding_has_connect_url() {
        let site = SiteId::new();
        let auto = DomainBinding::pending(site, "shop.example.com".into(), DomainMethod::Auto);
        assert_eq!(auto.records.len(), 2);
        assert!(auto
            .connect_url
            .as_deref()
            .is_some_and(|u| u.contains("domain=shop.example.com")));

        let manual = DomainBinding::pending(site, "shop.example.com".into(), DomainMethod::Manual);
        assert_eq!(manual.connect_url, None);
        assert_eq!(manual.status, DomainStatus::Pending);
    }
}
