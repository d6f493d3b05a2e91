//! Integration tests for TemplateSession
//!
//! These drive the controller against an in-memory store and check the
//! ownership gates, the words-per-shot encoding on save, and list ordering.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use promptconsole::rewriter::{WORD_COUNT_PLACEHOLDER, placeholder_sentence, word_count_sentence};
use promptconsole::{ListOutcome, LoadStatus, SessionError, TemplateAction, TemplateSession};
use templatestore::{
    GlobalConfig, MemoryTemplateStore, PromptTemplate, StoreError, TemplateId, TemplatePayload, TemplateStore,
    TemplateType,
};
use tokio::sync::{mpsc, oneshot};

fn system_template(id: &str, template_type: TemplateType, body: &str) -> PromptTemplate {
    PromptTemplate {
        id: TemplateId::new(id),
        name: format!("系统模板 {}", id),
        description: "platform default".to_string(),
        template: body.to_string(),
        template_type,
        is_system: true,
        is_active: true,
        created_at: Utc::now(),
    }
}

fn seeded() -> (Arc<MemoryTemplateStore>, TemplateSession) {
    let store = Arc::new(MemoryTemplateStore::with_templates(vec![
        system_template("sys-scene", TemplateType::Scene, "场景描述：{场景描述}"),
        system_template(
            "sys-split",
            TemplateType::ChapterSplit,
            &format!("拆分章节，{}。", word_count_sentence(60)),
        ),
    ]));
    let session = TemplateSession::new(store.clone());
    (store, session)
}

async fn create_user_template(session: &TemplateSession, template_type: TemplateType, name: &str) -> PromptTemplate {
    session.open_editor(template_type, None).await.unwrap();
    session
        .edit_draft(|draft| draft.name = name.to_string())
        .await
        .unwrap();
    session.save().await.unwrap()
}

// =============================================================================
// Ownership gates
// =============================================================================

#[tokio::test]
async fn test_system_template_save_is_rejected_without_store_call() {
    let (store, session) = seeded();
    session.list(TemplateType::Scene).await.unwrap();
    let system = session
        .find(TemplateType::Scene, &TemplateId::new("sys-scene"))
        .await
        .unwrap();
    let calls = store.call_count();

    let draft = session.open_editor(TemplateType::Scene, Some(system)).await.unwrap();
    assert!(draft.is_read_only());

    let edit = session.edit_draft(|d| d.name = "hijack".to_string()).await;
    assert!(matches!(edit, Err(SessionError::ReadOnlyDraft)));

    let saved = session.save().await;
    assert!(matches!(
        saved,
        Err(SessionError::Authorization {
            action: TemplateAction::Edit,
            ..
        })
    ));
    assert_eq!(store.call_count(), calls);
    assert!(session.draft().await.is_some());
}

#[tokio::test]
async fn test_system_template_delete_is_rejected_without_store_call() {
    let (store, session) = seeded();
    let system = system_template("sys-scene", TemplateType::Scene, "场景描述：{场景描述}");

    let requested = session.request_delete(&system).await;
    assert!(matches!(
        requested,
        Err(SessionError::Authorization {
            action: TemplateAction::Delete,
            ..
        })
    ));
    assert!(session.pending_delete().await.is_none());

    let confirmed = session.confirm_delete().await;
    assert!(matches!(confirmed, Err(SessionError::NotConfirmed)));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_user_template_copy_is_rejected_without_store_call() {
    let (store, session) = seeded();
    let user = create_user_template(&session, TemplateType::Scene, "我的场景").await;
    let calls = store.call_count();

    let result = session.copy(&user).await;
    assert!(matches!(
        result,
        Err(SessionError::Authorization {
            action: TemplateAction::Copy,
            ..
        })
    ));
    assert_eq!(store.call_count(), calls);
}

#[tokio::test]
async fn test_stale_caller_copy_is_checked_against_listed_record() {
    let (store, session) = seeded();
    session.list(TemplateType::Scene).await.unwrap();
    let calls = store.call_count();

    // The caller believes the record is a user template; the list says otherwise
    let mut stale = system_template("sys-scene", TemplateType::Scene, "场景描述：{场景描述}");
    stale.is_system = false;

    let result = session.request_delete(&stale).await;
    assert!(matches!(result, Err(SessionError::Authorization { .. })));
    assert_eq!(store.call_count(), calls);
}

// =============================================================================
// Save
// =============================================================================

#[tokio::test]
async fn test_save_new_chapter_split_writes_word_count() {
    let (store, session) = seeded();

    session.open_editor(TemplateType::ChapterSplit, None).await.unwrap();
    session
        .edit_draft(|draft| {
            draft.name = "Foo".to_string();
            draft.description = String::new();
            draft.template = "x {每个分镜对应拆分故事字数} y".to_string();
            draft.word_count = 80;
        })
        .await
        .unwrap();

    let saved = session.save().await.unwrap();
    assert_eq!(saved.template, "x 80 y");
    assert!(!saved.is_system);

    let persisted = store.snapshot().await.into_iter().find(|t| t.id == saved.id).unwrap();
    assert_eq!(persisted.template, "x 80 y");

    assert!(session.draft().await.is_none(), "editor closes after save");
    let listed = session.templates(TemplateType::ChapterSplit).await;
    assert!(listed.iter().any(|t| t.id == saved.id));
}

#[tokio::test]
async fn test_reopened_chapter_split_round_trips_word_count() {
    let (_store, session) = seeded();

    session.open_editor(TemplateType::ChapterSplit, None).await.unwrap();
    session
        .edit_draft(|draft| {
            draft.name = "拆分".to_string();
            draft.template = format!("{}，{}", placeholder_sentence(), WORD_COUNT_PLACEHOLDER);
            draft.word_count = 80;
        })
        .await
        .unwrap();
    let saved = session.save().await.unwrap();

    let draft = session
        .open_editor(TemplateType::ChapterSplit, Some(saved.clone()))
        .await
        .unwrap();
    assert_eq!(draft.word_count, 80);

    session.edit_draft(|d| d.word_count = 200).await.unwrap();
    let updated = session.save().await.unwrap();

    assert_eq!(updated.id, saved.id);
    assert_eq!(updated.template, format!("{}，80", word_count_sentence(200)));
}

#[tokio::test]
async fn test_save_validates_required_fields_locally() {
    let (store, session) = seeded();
    session.open_editor(TemplateType::Style, None).await.unwrap();

    let result = session.save().await;
    assert!(matches!(result, Err(SessionError::Validation { field: "name" })));

    session
        .edit_draft(|d| {
            d.name = "水墨".to_string();
            d.template = String::new();
        })
        .await
        .unwrap();
    let result = session.save().await;
    assert!(matches!(result, Err(SessionError::Validation { field: "template" })));

    assert_eq!(store.call_count(), 0);
    assert_eq!(session.draft().await.unwrap().name, "水墨");
}

#[tokio::test]
async fn test_save_failure_keeps_draft() {
    let (store, session) = seeded();
    session.open_editor(TemplateType::Character, None).await.unwrap();
    session.edit_draft(|d| d.name = "主角".to_string()).await.unwrap();
    let before = session.draft().await.unwrap();

    store.set_offline(true);
    let result = session.save().await;

    assert!(matches!(result, Err(SessionError::Remote(_))));
    assert_eq!(session.draft().await, Some(before));
}

#[tokio::test]
async fn test_save_without_open_editor() {
    let (_store, session) = seeded();
    assert!(matches!(session.save().await, Err(SessionError::NoDraft)));
    assert!(matches!(session.edit_draft(|_| {}).await, Err(SessionError::NoDraft)));
}

#[tokio::test]
async fn test_open_editor_rejects_type_mismatch() {
    let (_store, session) = seeded();
    let scene = system_template("sys-scene", TemplateType::Scene, "body");

    let result = session.open_editor(TemplateType::Style, Some(scene)).await;
    assert!(matches!(
        result,
        Err(SessionError::TypeMismatch {
            expected: TemplateType::Style,
            actual: TemplateType::Scene
        })
    ));
    assert!(session.draft().await.is_none());
}

#[tokio::test]
async fn test_close_editor_discards_draft() {
    let (_store, session) = seeded();
    session.open_editor(TemplateType::Scene, None).await.unwrap();
    session.close_editor().await;
    assert!(session.draft().await.is_none());

    // Always allowed, even with nothing open
    session.close_editor().await;
}

// =============================================================================
// Copy and delete
// =============================================================================

#[tokio::test]
async fn test_copy_system_template() {
    let (_store, session) = seeded();
    session.list(TemplateType::ChapterSplit).await.unwrap();
    let source = session
        .find(TemplateType::ChapterSplit, &TemplateId::new("sys-split"))
        .await
        .unwrap();

    let copy = session.copy(&source).await.unwrap();

    assert_ne!(copy.id, source.id);
    assert!(!copy.is_system);
    assert_eq!(copy.name, source.name);
    assert_eq!(copy.description, source.description);
    assert_eq!(copy.template, source.template);

    let listed = session.templates(TemplateType::ChapterSplit).await;
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn test_copy_failure_is_recoverable() {
    let (store, session) = seeded();
    session.list(TemplateType::Scene).await.unwrap();
    let source = session
        .find(TemplateType::Scene, &TemplateId::new("sys-scene"))
        .await
        .unwrap();

    store.set_offline(true);
    assert!(matches!(session.copy(&source).await, Err(SessionError::Remote(_))));
    assert_eq!(session.templates(TemplateType::Scene).await.len(), 1);

    store.set_offline(false);
    assert!(session.copy(&source).await.is_ok());
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let (store, session) = seeded();
    let user = create_user_template(&session, TemplateType::Scene, "临时").await;
    let calls = store.call_count();

    session.request_delete(&user).await.unwrap();
    assert_eq!(session.pending_delete().await.map(|t| t.id), Some(user.id.clone()));
    session.cancel_delete().await;

    assert!(matches!(session.confirm_delete().await, Err(SessionError::NotConfirmed)));
    assert_eq!(store.call_count(), calls);
}

#[tokio::test]
async fn test_delete_removes_from_next_list() {
    let (_store, session) = seeded();
    let user = create_user_template(&session, TemplateType::Scene, "临时").await;
    session.open_viewer(user.clone()).await;

    session.request_delete(&user).await.unwrap();
    let deleted = session.confirm_delete().await.unwrap();
    assert_eq!(deleted.id, user.id);

    session.list(TemplateType::Scene).await.unwrap();
    let listed = session.templates(TemplateType::Scene).await;
    assert!(listed.iter().all(|t| t.id != user.id));
    assert!(session.viewing().await.is_none());
}

#[tokio::test]
async fn test_delete_failure_keeps_template_listed() {
    let (store, session) = seeded();
    let user = create_user_template(&session, TemplateType::Scene, "保留").await;

    session.request_delete(&user).await.unwrap();
    store.set_offline(true);
    assert!(matches!(session.confirm_delete().await, Err(SessionError::Remote(_))));

    let listed = session.templates(TemplateType::Scene).await;
    assert!(listed.iter().any(|t| t.id == user.id));
}

// =============================================================================
// Viewer
// =============================================================================

#[tokio::test]
async fn test_viewer_open_and_close() {
    let (_store, session) = seeded();
    let system = system_template("sys-scene", TemplateType::Scene, "body");

    assert!(session.viewing().await.is_none());
    session.open_viewer(system.clone()).await;
    assert_eq!(session.viewing().await, Some(system));
    session.close_viewer().await;
    assert!(session.viewing().await.is_none());
}

// =============================================================================
// Lists
// =============================================================================

#[tokio::test]
async fn test_list_failure_keeps_previous_list() {
    let (store, session) = seeded();
    assert_eq!(session.bucket_status(TemplateType::Scene).await, LoadStatus::Idle);

    let outcome = session.list(TemplateType::Scene).await.unwrap();
    assert_eq!(outcome, ListOutcome::Applied { count: 1 });
    assert_eq!(session.bucket_status(TemplateType::Scene).await, LoadStatus::Loaded);

    store.set_offline(true);
    assert!(matches!(session.list(TemplateType::Scene).await, Err(SessionError::Remote(_))));
    assert_eq!(session.templates(TemplateType::Scene).await.len(), 1);
    assert_eq!(session.bucket_status(TemplateType::Scene).await, LoadStatus::Loaded);
}

/// Store whose list responses are released by the test
struct GatedStore {
    gates: Mutex<VecDeque<oneshot::Receiver<Vec<PromptTemplate>>>>,
    started: mpsc::UnboundedSender<()>,
}

fn unsupported() -> StoreError {
    StoreError::InvalidResponse("not supported by GatedStore".to_string())
}

#[async_trait]
impl TemplateStore for GatedStore {
    async fn list_templates(&self, _template_type: TemplateType) -> Result<Vec<PromptTemplate>, StoreError> {
        let gate = self.gates.lock().unwrap().pop_front().expect("unexpected list call");
        let _ = self.started.send(());
        gate.await
            .map_err(|_| StoreError::InvalidResponse("gate dropped".to_string()))
    }

    async fn create_template(&self, _payload: TemplatePayload) -> Result<PromptTemplate, StoreError> {
        Err(unsupported())
    }

    async fn update_template(&self, _id: &TemplateId, _payload: TemplatePayload) -> Result<PromptTemplate, StoreError> {
        Err(unsupported())
    }

    async fn copy_template(&self, _id: &TemplateId) -> Result<PromptTemplate, StoreError> {
        Err(unsupported())
    }

    async fn delete_template(&self, _id: &TemplateId) -> Result<(), StoreError> {
        Err(unsupported())
    }

    async fn get_global_config(&self) -> Result<GlobalConfig, StoreError> {
        Err(unsupported())
    }

    async fn set_global_config(&self, _config: GlobalConfig) -> Result<GlobalConfig, StoreError> {
        Err(unsupported())
    }
}

struct Gates {
    session: Arc<TemplateSession>,
    senders: Vec<oneshot::Sender<Vec<PromptTemplate>>>,
    started: mpsc::UnboundedReceiver<()>,
}

fn gated(count: usize) -> Gates {
    let (started_tx, started_rx) = mpsc::unbounded_channel();
    let mut senders = Vec::new();
    let mut receivers = VecDeque::new();
    for _ in 0..count {
        let (tx, rx) = oneshot::channel();
        senders.push(tx);
        receivers.push_back(rx);
    }
    let store = GatedStore {
        gates: Mutex::new(receivers),
        started: started_tx,
    };
    Gates {
        session: Arc::new(TemplateSession::new(Arc::new(store))),
        senders,
        started: started_rx,
    }
}

fn character(id: &str) -> PromptTemplate {
    system_template(id, TemplateType::Character, "角色")
}

fn ids(templates: &[PromptTemplate]) -> Vec<String> {
    templates.iter().map(|t| t.id.to_string()).collect()
}

#[tokio::test]
async fn test_older_response_arriving_last_is_dropped() {
    let Gates {
        session,
        senders,
        mut started,
    } = gated(2);
    let mut senders = senders.into_iter();
    let gate_a = senders.next().unwrap();
    let gate_b = senders.next().unwrap();

    let a = tokio::spawn({
        let session = session.clone();
        async move { session.list(TemplateType::Character).await }
    });
    started.recv().await.unwrap();

    let b = tokio::spawn({
        let session = session.clone();
        async move { session.list(TemplateType::Character).await }
    });
    started.recv().await.unwrap();
    assert_eq!(session.bucket_status(TemplateType::Character).await, LoadStatus::Loading);

    gate_b.send(vec![character("b")]).unwrap();
    assert_eq!(b.await.unwrap().unwrap(), ListOutcome::Applied { count: 1 });

    gate_a.send(vec![character("a1"), character("a2")]).unwrap();
    assert_eq!(a.await.unwrap().unwrap(), ListOutcome::Stale);

    assert_eq!(ids(&session.templates(TemplateType::Character).await), vec!["b"]);
    assert_eq!(session.bucket_status(TemplateType::Character).await, LoadStatus::Loaded);
}

#[tokio::test]
async fn test_responses_in_issue_order_are_both_applied() {
    let Gates {
        session,
        senders,
        mut started,
    } = gated(2);
    let mut senders = senders.into_iter();
    let gate_a = senders.next().unwrap();
    let gate_b = senders.next().unwrap();

    let a = tokio::spawn({
        let session = session.clone();
        async move { session.list(TemplateType::Character).await }
    });
    started.recv().await.unwrap();
    let b = tokio::spawn({
        let session = session.clone();
        async move { session.list(TemplateType::Character).await }
    });
    started.recv().await.unwrap();

    gate_a.send(vec![character("a")]).unwrap();
    assert_eq!(a.await.unwrap().unwrap(), ListOutcome::Applied { count: 1 });
    assert_eq!(ids(&session.templates(TemplateType::Character).await), vec!["a"]);

    gate_b.send(vec![character("b1"), character("b2")]).unwrap();
    assert_eq!(b.await.unwrap().unwrap(), ListOutcome::Applied { count: 2 });
    assert_eq!(ids(&session.templates(TemplateType::Character).await), vec!["b1", "b2"]);
}

#[tokio::test]
async fn test_lists_of_different_types_are_independent() {
    let (_store, session) = seeded();

    let (scene, split) = tokio::join!(
        session.list(TemplateType::Scene),
        session.list(TemplateType::ChapterSplit)
    );
    assert_eq!(scene.unwrap(), ListOutcome::Applied { count: 1 });
    assert_eq!(split.unwrap(), ListOutcome::Applied { count: 1 });
    assert!(session.templates(TemplateType::Style).await.is_empty());
}
