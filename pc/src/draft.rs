//! Working draft for the template editor
//!
//! A draft is the unsaved edit buffer: it is created when the editor opens,
//! mutated while the operator types, and either persisted by a save or
//! discarded when the editor closes.

use templatestore::{PromptTemplate, TemplatePayload, TemplateType};

use crate::rewriter::{self, DEFAULT_WORD_COUNT, RewriteParams};

/// What a draft will be saved as
#[derive(Debug, Clone, PartialEq)]
pub enum DraftTarget {
    /// Saving creates a new user template
    New,
    /// Saving updates this record
    Existing(PromptTemplate),
}

/// Unsaved edit buffer for one template
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingDraft {
    pub name: String,
    pub description: String,
    pub template: String,
    /// Words per shot; only meaningful for `chapter_split`
    pub word_count: u32,
    template_type: TemplateType,
    target: DraftTarget,
}

impl WorkingDraft {
    /// Blank draft with the starter body for `template_type`
    pub fn new(template_type: TemplateType) -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            template: starter_body(template_type),
            word_count: DEFAULT_WORD_COUNT,
            template_type,
            target: DraftTarget::New,
        }
    }

    /// Draft loaded from a stored record, recovering its words-per-shot count
    pub fn from_existing(existing: PromptTemplate) -> Self {
        let params = rewriter::extract_params(&existing.template, existing.template_type);
        Self {
            name: existing.name.clone(),
            description: existing.description.clone(),
            template: existing.template.clone(),
            word_count: params.word_count,
            template_type: existing.template_type,
            target: DraftTarget::Existing(existing),
        }
    }

    pub fn template_type(&self) -> TemplateType {
        self.template_type
    }

    pub fn target(&self) -> &DraftTarget {
        &self.target
    }

    /// The record being edited, if any
    pub fn existing(&self) -> Option<&PromptTemplate> {
        match &self.target {
            DraftTarget::Existing(tpl) => Some(tpl),
            DraftTarget::New => None,
        }
    }

    /// System templates open for inspection only
    pub fn is_read_only(&self) -> bool {
        self.existing().is_some_and(|tpl| tpl.is_system)
    }

    pub fn params(&self) -> RewriteParams {
        RewriteParams {
            word_count: self.word_count,
        }
    }

    /// First required field left empty, if any
    ///
    /// Whitespace-only counts as empty.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.template.trim().is_empty() {
            Some("template")
        } else {
            None
        }
    }

    /// Payload to persist, with the words-per-shot count written into the body
    pub fn to_payload(&self) -> TemplatePayload {
        TemplatePayload {
            name: self.name.clone(),
            description: self.description.clone(),
            template: rewriter::rewrite(&self.template, self.template_type, &self.params()),
            template_type: self.template_type,
        }
    }
}

/// Starter body offered when creating a template of `template_type`
pub fn starter_body(template_type: TemplateType) -> String {
    match template_type {
        TemplateType::Style => "画面风格：\n- 色调：\n- 光影：\n- 镜头语言：".to_string(),
        TemplateType::CharacterParse => {
            "请从以下小说文本中提取所有出场角色，输出 JSON 数组，每个角色包含 name、gender、age、appearance、personality 字段。\n\n{小说文本}"
                .to_string()
        }
        TemplateType::SceneParse => {
            "请从以下小说文本中提取所有场景，输出 JSON 数组，每个场景包含 name、time、location、atmosphere 字段。\n\n{小说文本}"
                .to_string()
        }
        TemplateType::Character => "角色形象描述：{角色描述}\n请生成适合绘图模型的角色外观提示词。".to_string(),
        TemplateType::Scene => "场景描述：{场景描述}\n请生成适合绘图模型的场景提示词。".to_string(),
        TemplateType::ChapterSplit => format!(
            "请将以下章节拆分为连续的分镜，{}，保持情节完整，不要遗漏对白。\n输出 JSON 数组，每个分镜包含 index、content、characters、scene 字段。\n\n{{章节内容}}",
            rewriter::placeholder_sentence()
        ),
    }
}
