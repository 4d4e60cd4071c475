//! Command handlers
//!
//! Each handler writes its report to `out` and returns whether the
//! command succeeded.

use crate::config::AppConfig;
use anyhow::{anyhow, Context};
use clap::ArgMatches;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use vibe_core::{
    DomainBinding, DomainMethod, EditingSession, GenerationPipeline, SiteId, SiteRepository,
    SiteSummary, TurnOutcome, Version,
};
use vibe_document::{BoxId, Document};
use vibe_gemini::GeminiClient;
use vibe_sandbox::{embed_frame, frame_markup, FrameOptions, Viewport};
use vibe_store::SqliteStore;

fn required<'a, T>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a T>
where
    T: Clone + Send + Sync + 'static,
{
    args.get_one::<T>(name)
        .ok_or_else(|| anyhow!("missing argument <{name}>"))
}

/// Open the store named by the configuration
pub fn open_store(config: &AppConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("cannot open database {}", config.database_path.display()))?;
    Ok(Arc::new(store))
}

/// Dispatch a parsed command line
pub async fn dispatch(
    matches: &ArgMatches,
    config: &AppConfig,
    out: &mut (dyn Write + Send),
) -> anyhow::Result<bool> {
    let Some((name, args)) = matches.subcommand() else {
        return Err(anyhow!("no command given"));
    };
    let repo: Arc<dyn SiteRepository> = open_store(config)?;

    match name {
        "generate" => generate(args, config, repo, out).await,
        "sites" => {
            let email = required::<String>(args, "email")?;
            let user = repo.fetch_or_create_user(email).await?;
            let sites = repo.list_sites(user.id).await?;
            if sites.is_empty() {
                writeln!(out, "No sites for {}", user.email)?;
            }
            for summary in &sites {
                writeln!(out, "{}", site_line(summary))?;
            }
            Ok(true)
        }
        "versions" => {
            let site_id = *required::<SiteId>(args, "site")?;
            for version in repo.list_versions(site_id).await? {
                writeln!(out, "{}", version_line(&version))?;
            }
            Ok(true)
        }
        "publish" | "unpublish" => {
            let site_id = *required::<SiteId>(args, "site")?;
            let site = repo.set_published(site_id, name == "publish").await?;
            writeln!(
                out,
                "{} is {}",
                site.subdomain,
                if site.is_published { "published" } else { "not published" }
            )?;
            Ok(true)
        }
        "delete" => {
            let site_id = *required::<SiteId>(args, "site")?;
            repo.delete_site(site_id).await?;
            writeln!(out, "Deleted {site_id}")?;
            Ok(true)
        }
        "connect-domain" => {
            let site_id = *required::<SiteId>(args, "site")?;
            let domain = required::<String>(args, "domain")?;
            let method = *required::<DomainMethod>(args, "method")?;
            let binding = repo.connect_domain(site_id, domain, method).await?;
            write!(out, "{}", binding_report(&binding))?;
            Ok(true)
        }
        "render" => {
            let site_id = *required::<SiteId>(args, "site")?;
            let summary = repo.load_site(site_id).await?;
            let document = summary.document.unwrap_or_else(|| Document::new(""));
            let edit_mode = args.get_flag("edit");
            let html = if args.get_flag("raw") {
                frame_markup(&document, edit_mode)
            } else {
                let viewport = *required::<Viewport>(args, "viewport")?;
                embed_frame(&document, FrameOptions::new(edit_mode).with_viewport(viewport))
            };
            match args.get_one::<PathBuf>("out") {
                Some(path) => {
                    std::fs::write(path, html)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    writeln!(out, "Wrote {}", path.display())?;
                }
                None => writeln!(out, "{html}")?,
            }
            Ok(true)
        }
        other => Err(anyhow!("unknown command {other}")),
    }
}

async fn generate(
    args: &ArgMatches,
    config: &AppConfig,
    repo: Arc<dyn SiteRepository>,
    out: &mut (dyn Write + Send),
) -> anyhow::Result<bool> {
    let client = Arc::new(GeminiClient::from_env(config.gemini.clone())?);
    let pipeline = GenerationPipeline::new(client.clone(), client.clone(), client)
        .with_config(config.pipeline_config());

    let email = required::<String>(args, "email")?;
    let user = repo.fetch_or_create_user(email).await?;
    let mut session = match args.get_one::<SiteId>("site") {
        Some(site_id) => EditingSession::reopen(pipeline, repo, user, *site_id).await?,
        None => EditingSession::start(pipeline, repo, user).await,
    };
    if let Some(title) = args.get_one::<String>("title") {
        session.commit_title(title).await;
    }
    if let Some(&raw) = args.get_one::<u32>("box") {
        let id = BoxId::new(raw).ok_or_else(|| anyhow!("box ids start at 1"))?;
        session.select_box(id)?;
    }

    let instruction = args
        .get_many::<String>("instruction")
        .map(|words| words.map(String::as_str).collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let status = |line: &str| println!("  {line}");
    let outcome = session.submit(&instruction, &status).await?;

    if let Some(reply) = session.conversation().last() {
        writeln!(out, "{}", reply.content)?;
    }
    match outcome {
        TurnOutcome::Completed { generation, saved } => {
            writeln!(
                out,
                "{} boxes, {} images ({} fell back)",
                generation.document.boxes().len(),
                generation.images_synthesized,
                generation.image_failures.len()
            )?;
            match (saved, session.site_id()) {
                (true, Some(site_id)) => writeln!(out, "Saved site {site_id}")?,
                _ => writeln!(out, "Not saved: {:?}", session.save_tracker().last_error())?,
            }
            Ok(saved)
        }
        TurnOutcome::Failed(error) => {
            writeln!(out, "Turn failed: {error}")?;
            Ok(false)
        }
    }
}

/// One line of `sites` output
#[must_use]
pub fn site_line(summary: &SiteSummary) -> String {
    let site = &summary.site;
    let boxes = summary.document.as_ref().map_or(0, |d| d.boxes().len());
    format!(
        "{}  {:<24}  {}  {}  {} boxes  updated {}",
        site.id,
        site.title,
        site.subdomain,
        if site.is_published { "published" } else { "draft" },
        boxes,
        site.updated_at.format("%Y-%m-%d %H:%M")
    )
}

/// One line of `versions` output
#[must_use]
pub fn version_line(version: &Version) -> String {
    format!(
        "v{:<3} {}  {}  {} bytes  {}",
        version.sequence_number,
        version.id,
        version.document.hash().short(),
        version.document.len(),
        version.created_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// DNS instructions for a new binding
#[must_use]
pub fn binding_report(binding: &DomainBinding) -> String {
    let mut report = format!("{} is {}\n", binding.domain, binding.status);
    if let Some(url) = &binding.connect_url {
        report.push_str(&format!("Connect automatically: {url}\n"));
    }
    report.push_str("Or create these records:\n");
    for record in &binding.records {
        report.push_str(&format!("  {:<6} {:<4} {}\n", record.kind, record.host, record.value));
    }
    report
}
