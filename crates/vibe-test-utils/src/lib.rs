//! Testing utilities for the Vibe workspace
//!
//! Scripted capabilities, an in-memory repository and sample documents.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vibe_core::site::{avatar_url, display_name_from_email, generate_subdomain, normalize_domain, STARTER_CREDITS};
use vibe_core::{
    Capability, CapabilityError, CodingCapability, DomainBinding, DomainMethod, DomainStatus,
    GenerationPipeline, ImageCapability, PersistenceError, PipelineConfig, PlanningCapability,
    SaveReceipt, SaveRequest, Site, SiteId, SiteRepository, SiteSummary, User, UserId, Version,
    VersionId,
};
use vibe_document::Document;

// ---------------------------------------------------------------------------
// Sample documents
// ---------------------------------------------------------------------------

/// A page with `boxes` numbered paragraphs inside a section (section is box 1)
pub fn page_with_boxes(boxes: usize) -> String {
    let paragraphs: String = (0..boxes.saturating_sub(1))
        .map(|i| format!("<p>Paragraph {i}</p>"))
        .collect();
    format!("<!DOCTYPE html><html><body><section>{paragraphs}</section></body></html>")
}

/// A fenced page with `count` image placeholders
pub fn page_with_placeholders(count: usize) -> String {
    let images: String = (0..count)
        .map(|i| format!("<img data-image-prompt=\"picture {i}\" alt=\"\">"))
        .collect();
    format!("```html\n<html><body><section><h1>Gallery</h1>{images}</section></body></html>\n```")
}

/// A user that has not been stored anywhere
pub fn test_user() -> User {
    let name = "Ada Lovelace".to_string();
    User {
        id: UserId::new(),
        email: "ada@example.com".into(),
        avatar_url: avatar_url(&name),
        name,
        credits: STARTER_CREDITS,
        created_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Planner returning a fixed answer
#[derive(Debug)]
pub struct ScriptedPlanner {
    response: Option<String>,
    configured: bool,
    calls: AtomicUsize,
    contexts: Mutex<Vec<String>>,
}

impl ScriptedPlanner {
    pub fn new(response: Option<&str>) -> Self {
        Self {
            response: response.map(str::to_string),
            configured: true,
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Planner without a credential
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(None)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Context hints received, in call order
    pub fn contexts(&self) -> Vec<String> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl PlanningCapability for ScriptedPlanner {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn plan(
        &self,
        _directive: &str,
        _request: &str,
        context: &str,
    ) -> Result<Option<String>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().push(context.to_string());
        Ok(self.response.clone())
    }
}

/// Coder replaying queued answers; fails once the queue is empty
#[derive(Debug, Default)]
pub struct ScriptedCoder {
    responses: Mutex<VecDeque<Result<String, CapabilityError>>>,
    directives: Mutex<Vec<String>>,
}

impl ScriptedCoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful answer
    #[must_use]
    pub fn then_markup(self, markup: impl Into<String>) -> Self {
        self.responses.lock().push_back(Ok(markup.into()));
        self
    }

    /// Queue a failure
    #[must_use]
    pub fn then_fail(self, message: &str) -> Self {
        self.responses.lock().push_back(Err(CapabilityError::Request {
            capability: Capability::Coding,
            message: message.to_string(),
        }));
        self
    }

    pub fn calls(&self) -> usize {
        self.directives.lock().len()
    }

    /// Directives received, in call order
    pub fn directives(&self) -> Vec<String> {
        self.directives.lock().clone()
    }
}

#[async_trait]
impl CodingCapability for ScriptedCoder {
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, directive: &str, _instruction: &str) -> Result<String, CapabilityError> {
        self.directives.lock().push(directive.to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(CapabilityError::EmptyResponse {
                capability: Capability::Coding,
            }))
    }
}

/// Image backend that records concurrency
///
/// Every call sleeps for `latency` so concurrent calls overlap; prompts in
/// the failure set return an error.
#[derive(Debug)]
pub struct RecordingImager {
    latency: Duration,
    failing: HashSet<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl RecordingImager {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Make `prompt` fail
    #[must_use]
    pub fn failing_on(mut self, prompt: &str) -> Self {
        self.failing.insert(prompt.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most calls observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Calls still running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ImageCapability for RecordingImager {
    fn is_configured(&self) -> bool {
        true
    }

    async fn synthesize(&self, prompt: &str) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(prompt) {
            Err(CapabilityError::Status {
                capability: Capability::ImageSynthesis,
                status: 500,
                message: "synthesis failed".into(),
            })
        } else {
            Ok(format!("data:image/png;base64,{}", prompt.replace(' ', "_")))
        }
    }
}

/// Pipeline over the given fakes with an image concurrency bound
pub fn pipeline_with(
    planner: Arc<ScriptedPlanner>,
    coder: Arc<ScriptedCoder>,
    imager: Arc<RecordingImager>,
    max_concurrent_images: usize,
) -> GenerationPipeline {
    GenerationPipeline::new(planner, coder, imager)
        .with_config(PipelineConfig::new().with_max_concurrent_images(max_concurrent_images))
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Store {
    users: HashMap<String, User>,
    sites: Vec<Site>,
    versions: Vec<Version>,
}

/// Repository kept in memory, with switchable save failures
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
    fail_writes: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail until switched back
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn site_count(&self) -> usize {
        self.store.lock().sites.len()
    }

    pub fn version_count(&self) -> usize {
        self.store.lock().versions.len()
    }

    fn check_writable(&self) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(PersistenceError::Storage("writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

fn summary(store: &Store, site: &Site) -> SiteSummary {
    let document = site
        .current_version_id
        .and_then(|id| store.versions.iter().find(|v| v.id == id))
        .map(|v| v.document.clone());
    SiteSummary {
        site: site.clone(),
        document,
    }
}

#[async_trait]
impl SiteRepository for InMemoryRepository {
    async fn fetch_or_create_user(&self, email: &str) -> Result<User, PersistenceError> {
        let mut store = self.store.lock();
        if let Some(user) = store.users.get(email) {
            return Ok(user.clone());
        }
        let name = display_name_from_email(email);
        let user = User {
            id: UserId::new(),
            email: email.to_string(),
            avatar_url: avatar_url(&name),
            name,
            credits: STARTER_CREDITS,
            created_at: Utc::now(),
        };
        store.users.insert(email.to_string(), user.clone());
        Ok(user)
    }

    async fn save_version(&self, request: SaveRequest) -> Result<SaveReceipt, PersistenceError> {
        self.check_writable()?;
        let mut store = self.store.lock();
        let now = Utc::now();

        let (site_id, created_site) = match request.site_id {
            Some(id) => {
                let site = store
                    .sites
                    .iter_mut()
                    .find(|s| s.id == id)
                    .ok_or(PersistenceError::SiteNotFound(id))?;
                site.title = request.title.clone();
                (id, false)
            }
            None => {
                let site = Site {
                    id: SiteId::new(),
                    user_id: request.user_id,
                    title: request.title.clone(),
                    subdomain: generate_subdomain(request.user_id, now),
                    custom_domain: None,
                    custom_domain_status: None,
                    is_published: false,
                    current_version_id: None,
                    created_at: now,
                    updated_at: now,
                };
                let id = site.id;
                store.sites.push(site);
                (id, true)
            }
        };

        let sequence_number = store
            .versions
            .iter()
            .filter(|v| v.site_id == site_id)
            .map(|v| v.sequence_number)
            .max()
            .unwrap_or(0)
            + 1;
        let version = Version {
            id: VersionId::new(),
            site_id,
            sequence_number,
            document: request.document,
            created_at: now,
        };
        let version_id = version.id;
        store.versions.push(version);

        if let Some(site) = store.sites.iter_mut().find(|s| s.id == site_id) {
            site.current_version_id = Some(version_id);
            site.updated_at = now;
        }

        Ok(SaveReceipt {
            site_id,
            version_id,
            sequence_number,
            created_site,
        })
    }

    async fn update_title(&self, site_id: SiteId, title: &str) -> Result<(), PersistenceError> {
        self.check_writable()?;
        let mut store = self.store.lock();
        let site = store
            .sites
            .iter_mut()
            .find(|s| s.id == site_id)
            .ok_or(PersistenceError::SiteNotFound(site_id))?;
        site.title = title.to_string();
        site.updated_at = Utc::now();
        Ok(())
    }

    async fn load_site(&self, site_id: SiteId) -> Result<SiteSummary, PersistenceError> {
        let store = self.store.lock();
        let site = store
            .sites
            .iter()
            .find(|s| s.id == site_id)
            .ok_or(PersistenceError::SiteNotFound(site_id))?;
        Ok(summary(&store, site))
    }

    async fn list_sites(&self, user_id: UserId) -> Result<Vec<SiteSummary>, PersistenceError> {
        let store = self.store.lock();
        let mut sites: Vec<(usize, &Site)> = store
            .sites
            .iter()
            .enumerate()
            .filter(|(_, s)| s.user_id == user_id)
            .collect();
        sites.sort_by(|(ia, a), (ib, b)| b.updated_at.cmp(&a.updated_at).then(ib.cmp(ia)));
        Ok(sites.into_iter().map(|(_, s)| summary(&store, s)).collect())
    }

    async fn list_versions(&self, site_id: SiteId) -> Result<Vec<Version>, PersistenceError> {
        let store = self.store.lock();
        if !store.sites.iter().any(|s| s.id == site_id) {
            return Err(PersistenceError::SiteNotFound(site_id));
        }
        let mut versions: Vec<Version> = store
            .versions
            .iter()
            .filter(|v| v.site_id == site_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.sequence_number);
        Ok(versions)
    }

    async fn set_published(&self, site_id: SiteId, published: bool) -> Result<Site, PersistenceError> {
        self.check_writable()?;
        let mut store = self.store.lock();
        let site = store
            .sites
            .iter_mut()
            .find(|s| s.id == site_id)
            .ok_or(PersistenceError::SiteNotFound(site_id))?;
        site.is_published = published;
        site.updated_at = Utc::now();
        Ok(site.clone())
    }

    async fn delete_site(&self, site_id: SiteId) -> Result<(), PersistenceError> {
        self.check_writable()?;
        let mut store = self.store.lock();
        let before = store.sites.len();
        store.sites.retain(|s| s.id != site_id);
        if store.sites.len() == before {
            return Err(PersistenceError::SiteNotFound(site_id));
        }
        store.versions.retain(|v| v.site_id != site_id);
        Ok(())
    }

    async fn connect_domain(
        &self,
        site_id: SiteId,
        domain: &str,
        method: DomainMethod,
    ) -> Result<DomainBinding, PersistenceError> {
        self.check_writable()?;
        let domain = normalize_domain(domain)?;
        let mut store = self.store.lock();
        let site = store
            .sites
            .iter_mut()
            .find(|s| s.id == site_id)
            .ok_or(PersistenceError::SiteNotFound(site_id))?;
        site.custom_domain = Some(domain.clone());
        site.custom_domain_status = Some(DomainStatus::Pending);
        Ok(DomainBinding::pending(site_id, domain, method))
    }
}

/// Document built the way the pipeline builds them
pub fn generated(markup: &str) -> Document {
    Document::from_generated(markup)
}
