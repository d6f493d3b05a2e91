//! PromptConsole - prompt template management for the storyboard pipeline
//!
//! Operators of the novel-to-storyboard pipeline keep a library of prompt
//! templates per category: style prompts, character and scene extraction,
//! and chapter splitting. Platform-seeded system templates are read-only
//! and can only be copied; operator templates are fully editable.
//!
//! # Modules
//!
//! - [`session`] - the controller: per-type lists, editor draft, viewer,
//!   create/update/copy/delete sequencing
//! - [`classifier`] - which actions a template's owner permits
//! - [`rewriter`] - words-per-shot encoding inside chapter-split bodies
//! - [`draft`] - the editor's working draft and starter bodies
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod classifier;
pub mod cli;
pub mod config;
pub mod draft;
mod error;
pub mod rewriter;
pub mod session;

pub use classifier::TemplateAction;
pub use config::Config;
pub use draft::{DraftTarget, WorkingDraft};
pub use error::SessionError;
pub use rewriter::RewriteParams;
pub use session::{ListOutcome, LoadStatus, TemplateSession};
