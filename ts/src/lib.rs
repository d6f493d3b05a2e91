//! TemplateStore - persistence contract for prompt templates
//!
//! Prompt templates drive the LLM calls of the novel-to-storyboard pipeline
//! (character/scene extraction, chapter splitting, style prompts). The
//! durable records live in a remote service; this crate defines the
//! operation contract that service offers and two adapters for it.
//!
//! # Adapters
//!
//! - [`HttpTemplateStore`] talks to the remote store's JSON API
//! - [`MemoryTemplateStore`] keeps records in-process with the same
//!   server-side rules (tests, offline demos)
//!
//! # Example
//!
//! ```ignore
//! use templatestore::{HttpTemplateStore, StoreConfig, TemplateStore, TemplateType};
//!
//! let store = HttpTemplateStore::from_config(&StoreConfig::default())?;
//! let templates = store.list_templates(TemplateType::ChapterSplit).await?;
//! ```

pub mod config;
mod error;
mod http;
mod memory;
pub mod model;
mod store;

pub use config::StoreConfig;
pub use error::StoreError;
pub use http::HttpTemplateStore;
pub use memory::MemoryTemplateStore;
pub use model::{GlobalConfig, PromptTemplate, TemplateId, TemplatePayload, TemplateType};
pub use store::TemplateStore;
