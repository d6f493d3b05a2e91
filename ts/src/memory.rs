//! In-process template store
//!
//! Mirrors the server-side rules of the remote store: system templates are
//! read-only, copies become fresh user templates.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{GlobalConfig, PromptTemplate, TemplateId, TemplatePayload, TemplateType};
use crate::store::TemplateStore;

#[derive(Default)]
struct Records {
    templates: Vec<PromptTemplate>,
    global: GlobalConfig,
}

/// Template store held entirely in memory
#[derive(Default)]
pub struct MemoryTemplateStore {
    records: Mutex<Records>,
    offline: AtomicBool,
    call_count: AtomicUsize,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, typically with platform system templates
    pub fn with_templates(templates: Vec<PromptTemplate>) -> Self {
        debug!(count = templates.len(), "MemoryTemplateStore::with_templates: called");
        Self {
            records: Mutex::new(Records {
                templates,
                global: GlobalConfig::default(),
            }),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail as if the service were down
    pub fn set_offline(&self, offline: bool) {
        debug!(offline, "MemoryTemplateStore::set_offline: called");
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls served so far, failed ones included
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored record
    pub async fn snapshot(&self) -> Vec<PromptTemplate> {
        self.records.lock().await.templates.clone()
    }

    fn begin_call(&self) -> Result<(), StoreError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            debug!("MemoryTemplateStore: offline, failing call");
            return Err(StoreError::Api {
                status: 503,
                message: "template store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn new_record(payload: TemplatePayload, is_system: bool) -> PromptTemplate {
    PromptTemplate {
        id: TemplateId::new(Uuid::now_v7().to_string()),
        name: payload.name,
        description: payload.description,
        template: payload.template,
        template_type: payload.template_type,
        is_system,
        is_active: true,
        created_at: Utc::now(),
    }
}

fn forbidden(id: &TemplateId, action: &str) -> StoreError {
    StoreError::Api {
        status: 403,
        message: format!("system template {} cannot be {}", id, action),
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn list_templates(&self, template_type: TemplateType) -> Result<Vec<PromptTemplate>, StoreError> {
        debug!(%template_type, "MemoryTemplateStore::list_templates: called");
        self.begin_call()?;
        let records = self.records.lock().await;
        Ok(records
            .templates
            .iter()
            .filter(|t| t.template_type == template_type)
            .cloned()
            .collect())
    }

    async fn create_template(&self, payload: TemplatePayload) -> Result<PromptTemplate, StoreError> {
        debug!(name = %payload.name, "MemoryTemplateStore::create_template: called");
        self.begin_call()?;
        let record = new_record(payload, false);
        self.records.lock().await.templates.push(record.clone());
        Ok(record)
    }

    async fn update_template(&self, id: &TemplateId, payload: TemplatePayload) -> Result<PromptTemplate, StoreError> {
        debug!(%id, "MemoryTemplateStore::update_template: called");
        self.begin_call()?;
        let mut records = self.records.lock().await;
        let record = records
            .templates
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if record.is_system {
            return Err(forbidden(id, "modified"));
        }
        if record.template_type != payload.template_type {
            return Err(StoreError::Api {
                status: 400,
                message: format!("template type of {} cannot change", id),
            });
        }

        record.name = payload.name;
        record.description = payload.description;
        record.template = payload.template;
        Ok(record.clone())
    }

    async fn copy_template(&self, id: &TemplateId) -> Result<PromptTemplate, StoreError> {
        debug!(%id, "MemoryTemplateStore::copy_template: called");
        self.begin_call()?;
        let mut records = self.records.lock().await;
        let source = records
            .templates
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if !source.is_system {
            return Err(StoreError::Api {
                status: 400,
                message: format!("only system templates can be copied, {} is a user template", id),
            });
        }

        let copy = new_record(source.to_payload(), false);
        records.templates.push(copy.clone());
        Ok(copy)
    }

    async fn delete_template(&self, id: &TemplateId) -> Result<(), StoreError> {
        debug!(%id, "MemoryTemplateStore::delete_template: called");
        self.begin_call()?;
        let mut records = self.records.lock().await;
        let index = records
            .templates
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if records.templates[index].is_system {
            return Err(forbidden(id, "deleted"));
        }

        records.templates.remove(index);
        Ok(())
    }

    async fn get_global_config(&self) -> Result<GlobalConfig, StoreError> {
        debug!("MemoryTemplateStore::get_global_config: called");
        self.begin_call()?;
        Ok(self.records.lock().await.global.clone())
    }

    async fn set_global_config(&self, config: GlobalConfig) -> Result<GlobalConfig, StoreError> {
        debug!(?config, "MemoryTemplateStore::set_global_config: called");
        self.begin_call()?;
        let mut records = self.records.lock().await;
        records.global.merge(config);
        Ok(records.global.clone())
    }
}
