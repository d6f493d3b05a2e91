//! TemplateSession - the prompt template controller
//!
//! Holds the per-type template lists, the open editor draft, the template
//! shown in the viewer, and a pending delete confirmation. All mutations go
//! through the [`TemplateStore`] after the ownership rules have been checked
//! here, independently of what the caller offered the operator.
//!
//! State sits behind an async mutex that is released before every store
//! call, so other operations (closing the editor, listing another type) can
//! proceed while a request is in flight. List responses are tagged with a
//! per-type sequence number; a response older than the one already applied
//! is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use templatestore::{PromptTemplate, TemplateId, TemplateStore, TemplateType};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::classifier::{self, TemplateAction};
use crate::draft::WorkingDraft;
use crate::error::SessionError;

/// Load state of one template type's list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Never loaded successfully, nothing in flight
    Idle,
    /// At least one list request outstanding
    Loading,
    /// Holds the result of a successful list request
    Loaded,
}

/// What happened to a list response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    /// The response replaced the list for its type
    Applied { count: usize },
    /// A newer response had already been applied; this one was dropped
    Stale,
}

#[derive(Debug, Default)]
struct Bucket {
    templates: Vec<PromptTemplate>,
    issued_seq: u64,
    applied_seq: u64,
    in_flight: usize,
}

impl Bucket {
    fn status(&self) -> LoadStatus {
        if self.in_flight > 0 {
            LoadStatus::Loading
        } else if self.applied_seq > 0 {
            LoadStatus::Loaded
        } else {
            LoadStatus::Idle
        }
    }
}

#[derive(Debug)]
struct OpenDraft {
    generation: u64,
    draft: WorkingDraft,
}

#[derive(Debug, Default)]
struct SessionState {
    buckets: HashMap<TemplateType, Bucket>,
    editor: Option<OpenDraft>,
    draft_generation: u64,
    viewing: Option<PromptTemplate>,
    pending_delete: Option<PromptTemplate>,
}

impl SessionState {
    fn current(&self, template_type: TemplateType, id: &TemplateId) -> Option<&PromptTemplate> {
        self.buckets
            .get(&template_type)
            .and_then(|bucket| bucket.templates.iter().find(|t| &t.id == id))
    }

    /// Check `action` against both the caller's copy and the latest listed copy
    fn authorize(&self, template: &PromptTemplate, action: TemplateAction) -> Result<(), SessionError> {
        let listed_ok = self
            .current(template.template_type, &template.id)
            .is_none_or(|listed| classifier::permits(listed, action));

        if classifier::permits(template, action) && listed_ok {
            Ok(())
        } else {
            warn!(id = %template.id, %action, "authorize: action rejected for template owner");
            Err(SessionError::Authorization {
                action,
                id: template.id.clone(),
            })
        }
    }
}

/// Prompt template controller for one operator session
pub struct TemplateSession {
    store: Arc<dyn TemplateStore>,
    state: Mutex<SessionState>,
}

impl TemplateSession {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        debug!("TemplateSession::new: called");
        Self {
            store,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// The store this session issues its calls against
    pub fn store(&self) -> &Arc<dyn TemplateStore> {
        &self.store
    }

    // === Lists ===

    /// Fetch all templates of `template_type` and replace that list
    ///
    /// On failure the previous list stays. A response that arrives after a
    /// newer request's response was applied is dropped as [`ListOutcome::Stale`].
    pub async fn list(&self, template_type: TemplateType) -> Result<ListOutcome, SessionError> {
        let seq = {
            let mut state = self.state.lock().await;
            let bucket = state.buckets.entry(template_type).or_default();
            bucket.issued_seq += 1;
            bucket.in_flight += 1;
            bucket.issued_seq
        };
        debug!(%template_type, seq, "list: called");

        let result = self.store.list_templates(template_type).await;

        let mut state = self.state.lock().await;
        let bucket = state.buckets.entry(template_type).or_default();
        bucket.in_flight = bucket.in_flight.saturating_sub(1);

        if seq <= bucket.applied_seq {
            debug!(%template_type, seq, applied = bucket.applied_seq, "list: dropping stale response");
            return Ok(ListOutcome::Stale);
        }

        match result {
            Ok(templates) => {
                let count = templates.len();
                bucket.templates = templates;
                bucket.applied_seq = seq;
                debug!(%template_type, seq, count, "list: applied");
                Ok(ListOutcome::Applied { count })
            }
            Err(e) => {
                warn!(%template_type, error = %e, "list: store call failed, keeping previous list");
                Err(e.into())
            }
        }
    }

    /// Current list for `template_type`
    pub async fn templates(&self, template_type: TemplateType) -> Vec<PromptTemplate> {
        let state = self.state.lock().await;
        state
            .buckets
            .get(&template_type)
            .map(|bucket| bucket.templates.clone())
            .unwrap_or_default()
    }

    pub async fn bucket_status(&self, template_type: TemplateType) -> LoadStatus {
        let state = self.state.lock().await;
        state
            .buckets
            .get(&template_type)
            .map(Bucket::status)
            .unwrap_or(LoadStatus::Idle)
    }

    /// Look a template up in the current list for its type
    pub async fn find(&self, template_type: TemplateType, id: &TemplateId) -> Option<PromptTemplate> {
        let state = self.state.lock().await;
        state.current(template_type, id).cloned()
    }

    async fn refresh(&self, template_type: TemplateType) {
        if let Err(e) = self.list(template_type).await {
            warn!(%template_type, error = %e, "refresh: list failed after successful change");
        }
    }

    // === Editor ===

    /// Open the editor on a new draft, or on `existing`
    ///
    /// System templates open read-only: they can be inspected in the form
    /// but neither edited nor saved.
    pub async fn open_editor(
        &self,
        template_type: TemplateType,
        existing: Option<PromptTemplate>,
    ) -> Result<WorkingDraft, SessionError> {
        debug!(%template_type, existing = ?existing.as_ref().map(|t| &t.id), "open_editor: called");
        let draft = match existing {
            Some(tpl) if tpl.template_type != template_type => {
                return Err(SessionError::TypeMismatch {
                    expected: template_type,
                    actual: tpl.template_type,
                });
            }
            Some(tpl) => WorkingDraft::from_existing(tpl),
            None => WorkingDraft::new(template_type),
        };

        let mut state = self.state.lock().await;
        state.draft_generation += 1;
        let generation = state.draft_generation;
        state.editor = Some(OpenDraft {
            generation,
            draft: draft.clone(),
        });
        Ok(draft)
    }

    /// Modify the open draft in place
    pub async fn edit_draft<F>(&self, edit: F) -> Result<WorkingDraft, SessionError>
    where
        F: FnOnce(&mut WorkingDraft),
    {
        let mut state = self.state.lock().await;
        let open = state.editor.as_mut().ok_or(SessionError::NoDraft)?;
        if open.draft.is_read_only() {
            return Err(SessionError::ReadOnlyDraft);
        }
        edit(&mut open.draft);
        Ok(open.draft.clone())
    }

    /// Snapshot of the open draft
    pub async fn draft(&self) -> Option<WorkingDraft> {
        let state = self.state.lock().await;
        state.editor.as_ref().map(|open| open.draft.clone())
    }

    /// Discard the open draft
    pub async fn close_editor(&self) {
        debug!("close_editor: called");
        self.state.lock().await.editor = None;
    }

    /// Persist the open draft
    ///
    /// Creates a user template for a new draft, updates the record otherwise.
    /// On success the list for the draft's type is refreshed and the editor
    /// closes (unless a different draft was opened meanwhile). On failure
    /// the draft stays open untouched.
    pub async fn save(&self) -> Result<PromptTemplate, SessionError> {
        let (generation, draft) = {
            let state = self.state.lock().await;
            let open = state.editor.as_ref().ok_or(SessionError::NoDraft)?;
            if let Some(existing) = open.draft.existing() {
                state.authorize(existing, TemplateAction::Edit)?;
            }
            (open.generation, open.draft.clone())
        };
        debug!(template_type = %draft.template_type(), generation, "save: called");

        if let Some(field) = draft.missing_field() {
            debug!(field, "save: required field empty");
            return Err(SessionError::Validation { field });
        }

        let payload = draft.to_payload();
        let result = match draft.existing() {
            Some(existing) => self.store.update_template(&existing.id, payload).await,
            None => self.store.create_template(payload).await,
        };
        let saved = result.map_err(|e| {
            warn!(error = %e, "save: store call failed, draft kept open");
            SessionError::from(e)
        })?;
        info!(id = %saved.id, template_type = %saved.template_type, "Saved prompt template");

        {
            let mut state = self.state.lock().await;
            if state.editor.as_ref().is_some_and(|open| open.generation == generation) {
                state.editor = None;
            }
        }

        self.refresh(draft.template_type()).await;
        Ok(saved)
    }

    // === Copy / delete ===

    /// Copy a system template into a new user template
    pub async fn copy(&self, template: &PromptTemplate) -> Result<PromptTemplate, SessionError> {
        debug!(id = %template.id, "copy: called");
        self.state.lock().await.authorize(template, TemplateAction::Copy)?;

        let copy = self.store.copy_template(&template.id).await.map_err(|e| {
            warn!(id = %template.id, error = %e, "copy: store call failed");
            SessionError::from(e)
        })?;
        info!(source = %template.id, id = %copy.id, "Copied prompt template");

        self.refresh(template.template_type).await;
        Ok(copy)
    }

    /// Ask to delete a user template; nothing happens until confirmed
    pub async fn request_delete(&self, template: &PromptTemplate) -> Result<(), SessionError> {
        debug!(id = %template.id, "request_delete: called");
        let mut state = self.state.lock().await;
        state.authorize(template, TemplateAction::Delete)?;
        state.pending_delete = Some(template.clone());
        Ok(())
    }

    /// Template awaiting delete confirmation
    pub async fn pending_delete(&self) -> Option<PromptTemplate> {
        self.state.lock().await.pending_delete.clone()
    }

    pub async fn cancel_delete(&self) {
        debug!("cancel_delete: called");
        self.state.lock().await.pending_delete = None;
    }

    /// Delete the template from the last [`request_delete`](Self::request_delete)
    pub async fn confirm_delete(&self) -> Result<PromptTemplate, SessionError> {
        let target = {
            let mut state = self.state.lock().await;
            let target = state.pending_delete.take().ok_or(SessionError::NotConfirmed)?;
            state.authorize(&target, TemplateAction::Delete)?;
            target
        };
        debug!(id = %target.id, "confirm_delete: called");

        self.store.delete_template(&target.id).await.map_err(|e| {
            warn!(id = %target.id, error = %e, "confirm_delete: store call failed");
            SessionError::from(e)
        })?;
        info!(id = %target.id, "Deleted prompt template");

        {
            let mut state = self.state.lock().await;
            if state.viewing.as_ref().is_some_and(|t| t.id == target.id) {
                state.viewing = None;
            }
            if state
                .editor
                .as_ref()
                .and_then(|open| open.draft.existing())
                .is_some_and(|t| t.id == target.id)
            {
                state.editor = None;
            }
        }

        self.refresh(target.template_type).await;
        Ok(target)
    }

    // === Viewer ===

    pub async fn open_viewer(&self, template: PromptTemplate) {
        debug!(id = %template.id, "open_viewer: called");
        self.state.lock().await.viewing = Some(template);
    }

    pub async fn viewing(&self) -> Option<PromptTemplate> {
        self.state.lock().await.viewing.clone()
    }

    pub async fn close_viewer(&self) {
        debug!("close_viewer: called");
        self.state.lock().await.viewing = None;
    }
}
