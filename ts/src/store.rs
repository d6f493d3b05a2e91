//! TemplateStore trait definition

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{GlobalConfig, PromptTemplate, TemplateId, TemplatePayload, TemplateType};

/// Durable home of prompt templates
///
/// Every call is an independent request against the store; nothing is
/// cached here. Callers own any in-memory view of the results.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// All templates of one type
    async fn list_templates(&self, template_type: TemplateType) -> Result<Vec<PromptTemplate>, StoreError>;

    /// Create a user template; the store assigns id and timestamp
    async fn create_template(&self, payload: TemplatePayload) -> Result<PromptTemplate, StoreError>;

    /// Replace the mutable fields of an existing template
    async fn update_template(&self, id: &TemplateId, payload: TemplatePayload) -> Result<PromptTemplate, StoreError>;

    /// Clone a system template into a new user template
    async fn copy_template(&self, id: &TemplateId) -> Result<PromptTemplate, StoreError>;

    /// Remove a template permanently
    async fn delete_template(&self, id: &TemplateId) -> Result<(), StoreError>;

    async fn get_global_config(&self) -> Result<GlobalConfig, StoreError>;

    /// Apply the fields set in `config`; returns the resulting config
    async fn set_global_config(&self, config: GlobalConfig) -> Result<GlobalConfig, StoreError>;
}
