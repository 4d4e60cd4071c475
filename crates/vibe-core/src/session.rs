//! Editing session
//!
//! Owns everything the user sees while editing one site:
//! - the displayed document (replaced only by a successful turn)
//! - the selected box, fed into the next instruction
//! - the conversation log
//! - the save indicator
//!
//! Turns take `&mut self`, so at most one pipeline run is in flight per
//! session.

use crate::autosave::{SaveState, SaveTracker};
use crate::conversation::{new_site_greeting, welcome_back_greeting, Conversation, Role, APOLOGY, CONFIRMATION};
use crate::error::{PipelineError, SessionError};
use crate::pipeline::{Generation, GenerationPipeline};
use crate::prompts::selection_hint;
use crate::site::{SaveRequest, SiteRepository, User, DEFAULT_TITLE};
use crate::status::StatusSink;
use crate::types::{Instruction, SiteId};
use std::sync::Arc;
use vibe_document::{BoxId, Document};

/// Page shown before the first instruction
pub const INITIAL_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gray-50 flex items-center justify-center min-h-screen">
    <div class="text-center p-8" data-vibe-box="1">
        <h1 class="text-4xl font-bold text-gray-800 mb-4" data-vibe-box="2">Welcome to your new site</h1>
        <p class="text-gray-600 mb-8" data-vibe-box="3">Tell the AI on the left what you want to build!</p>
        <button class="bg-blue-600 text-white px-6 py-3 rounded-lg hover:bg-blue-700 transition" data-vibe-box="4">Get Started</button>
    </div>
</body>
</html>
"#;

/// How a turn ended
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// New document displayed; `saved` tells whether persisting it worked
    Completed { generation: Generation, saved: bool },
    /// Turn failed; displayed document unchanged
    Failed(PipelineError),
}

impl TurnOutcome {
    /// Whether the turn produced a document
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// One user editing one site
pub struct EditingSession {
    pipeline: GenerationPipeline,
    repository: Arc<dyn SiteRepository>,
    user: User,
    site_id: Option<SiteId>,
    title: String,
    document: Document,
    selected_box: Option<BoxId>,
    conversation: Conversation,
    save: SaveTracker,
}

impl std::fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("user", &self.user.email)
            .field("site_id", &self.site_id)
            .field("title", &self.title)
            .field("document", &self.document.hash().short())
            .field("selected_box", &self.selected_box)
            .field("save", &self.save.state())
            .finish_non_exhaustive()
    }
}

impl EditingSession {
    /// Start a new site from the welcome page
    ///
    /// The welcome page is saved right away as version 1 of a new site. A
    /// failed save leaves the session usable with an `Error` indicator.
    pub async fn start(
        pipeline: GenerationPipeline,
        repository: Arc<dyn SiteRepository>,
        user: User,
    ) -> Self {
        let mut conversation = Conversation::new();
        conversation.push(Role::Assistant, new_site_greeting(user.first_name()));

        let mut session = Self {
            pipeline,
            repository,
            user,
            site_id: None,
            title: DEFAULT_TITLE.to_string(),
            document: Document::new(INITIAL_HTML),
            selected_box: None,
            conversation,
            save: SaveTracker::new(),
        };
        session.persist().await;
        session
    }

    /// Reopen an existing site at its current version
    ///
    /// # Errors
    /// `SessionError::Persistence` if the site cannot be loaded.
    pub async fn reopen(
        pipeline: GenerationPipeline,
        repository: Arc<dyn SiteRepository>,
        user: User,
        site_id: SiteId,
    ) -> Result<Self, SessionError> {
        let summary = repository.load_site(site_id).await?;
        let title = summary.site.title;
        tracing::info!("Reopened site {} ({})", site_id, title);

        let mut conversation = Conversation::new();
        conversation.push(Role::Assistant, welcome_back_greeting(&title));

        Ok(Self {
            pipeline,
            repository,
            user,
            site_id: Some(site_id),
            title,
            document: summary.document.unwrap_or_else(|| Document::new(INITIAL_HTML)),
            selected_box: None,
            conversation,
            save: SaveTracker::saved(),
        })
    }

    /// Run one instruction
    ///
    /// On success the new document replaces the displayed one, the
    /// selection is cleared (ids are renumbered) and the document is saved.
    /// On failure the displayed document, the selection and the save
    /// indicator are left as they were and one apology is logged.
    ///
    /// # Errors
    /// `SessionError::EmptyInstruction` for blank text; nothing is logged.
    pub async fn submit(
        &mut self,
        text: &str,
        status: &dyn StatusSink,
    ) -> Result<TurnOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInstruction);
        }
        self.conversation.push(Role::User, text);

        let instruction = Instruction::new(text)
            .with_prior(self.document.clone())
            .with_selection(self.selected_box);

        match self.pipeline.run(instruction, status).await {
            Ok(generation) => {
                self.document = generation.document.clone();
                self.selected_box = None;
                self.conversation.push(Role::Assistant, CONFIRMATION);
                let saved = self.persist().await;
                Ok(TurnOutcome::Completed { generation, saved })
            }
            Err(error) => {
                tracing::warn!("Turn failed, keeping document {}: {}", self.document.hash().short(), error);
                self.conversation.push(Role::Assistant, APOLOGY);
                Ok(TurnOutcome::Failed(error))
            }
        }
    }

    /// Commit a title edit
    ///
    /// Renames the existing site without a new version, or saves the
    /// current document as a new site if none exists yet. A blank title
    /// becomes the default title.
    pub async fn commit_title(&mut self, title: &str) -> SaveState {
        let title = title.trim();
        self.title = if title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            title.to_string()
        };

        match self.site_id {
            Some(site_id) => {
                self.save.begin();
                match self.repository.update_title(site_id, &self.title).await {
                    Ok(()) => self.save.succeed(),
                    Err(error) => self.save.fail(error),
                }
            }
            None => {
                self.persist().await;
            }
        }
        self.save.state()
    }

    /// Select a box of the current document
    ///
    /// Returns the suggested instruction prefix.
    ///
    /// # Errors
    /// `SessionError::UnknownBox` if the document has no such box; the
    /// previous selection is kept.
    pub fn select_box(&mut self, id: BoxId) -> Result<String, SessionError> {
        if !self.document.contains_box(id) {
            tracing::debug!("Ignoring selection of missing box {}", id);
            return Err(SessionError::UnknownBox(id));
        }
        self.selected_box = Some(id);
        Ok(selection_hint(id))
    }

    /// Drop the selection
    #[inline]
    pub fn clear_selection(&mut self) {
        self.selected_box = None;
    }

    /// Displayed document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Site being edited, once saved
    #[inline]
    #[must_use]
    pub fn site_id(&self) -> Option<SiteId> {
        self.site_id
    }

    /// Site title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Selected box
    #[inline]
    #[must_use]
    pub fn selected_box(&self) -> Option<BoxId> {
        self.selected_box
    }

    /// Chat history
    #[inline]
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Save indicator
    #[inline]
    #[must_use]
    pub fn save_state(&self) -> SaveState {
        self.save.state()
    }

    /// Save tracker with the last failure
    #[inline]
    #[must_use]
    pub fn save_tracker(&self) -> &SaveTracker {
        &self.save
    }

    /// Session owner
    #[inline]
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Save the displayed document as a new version
    async fn persist(&mut self) -> bool {
        self.save.begin();
        let request = SaveRequest {
            user_id: self.user.id,
            site_id: self.site_id,
            title: self.title.clone(),
            document: self.document.clone(),
        };
        match self.repository.save_version(request).await {
            Ok(receipt) => {
                tracing::info!(
                    "Saved site {} version {}",
                    receipt.site_id,
                    receipt.sequence_number
                );
                self.site_id = Some(receipt.site_id);
                self.save.succeed();
                true
            }
            Err(error) => {
                self.save.fail(error);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_page_has_four_numbered_boxes() {
        let doc = Document::new(INITIAL_HTML);
        assert_eq!(doc.boxes().len(), 4);
        assert!(doc.check_box_numbering().is_ok());
        assert_eq!(Document::from_generated(INITIAL_HTML).markup(), INITIAL_HTML.trim());
    }
}
