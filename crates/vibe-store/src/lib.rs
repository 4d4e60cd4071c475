//! Vibe Store - SQLite persistence
//!
//! Durable home for users, sites and their version history:
//! - Users fetched or created by email, with an empty profile
//! - Sites with a subdomain, publish flag, custom domain and agent settings
//! - Append-only versions numbered per site inside one transaction
//!
//! [`SqliteStore`] exposes blocking methods and implements
//! [`vibe_core::SiteRepository`] by running them on tokio's blocking pool.
//!
//! # Example
//!
//! ```rust,no_run
//! use vibe_core::SiteRepository;
//! use vibe_store::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("vibe.sqlite3")?;
//! let user = store.fetch_or_create_user("ada@example.com")?;
//! for summary in SiteRepository::list_sites(&store, user.id).await? {
//!     println!("{} {}", summary.site.id, summary.site.title);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
mod repository;
mod sites;
mod store;
mod users;
mod versions;

pub use error::{Result, StoreError};
pub use store::SqliteStore;
pub use versions::DEFAULT_AGENT_NAME;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
