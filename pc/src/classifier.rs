//! Ownership rules for prompt templates
//!
//! System templates are seeded by the platform and may only be copied.
//! User templates may be edited and deleted but not copied. The session
//! re-checks these before every store call, whatever the UI offered.

use templatestore::PromptTemplate;

/// Operations a template can be subjected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateAction {
    View,
    Edit,
    Copy,
    Delete,
}

impl std::fmt::Display for TemplateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::Edit => write!(f, "edit"),
            Self::Copy => write!(f, "copy"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

pub fn is_editable(template: &PromptTemplate) -> bool {
    !template.is_system
}

pub fn is_deletable(template: &PromptTemplate) -> bool {
    !template.is_system
}

pub fn is_copyable(template: &PromptTemplate) -> bool {
    template.is_system
}

/// Whether `action` is permitted on `template`
pub fn permits(template: &PromptTemplate, action: TemplateAction) -> bool {
    match action {
        TemplateAction::View => true,
        TemplateAction::Edit => is_editable(template),
        TemplateAction::Copy => is_copyable(template),
        TemplateAction::Delete => is_deletable(template),
    }
}

/// Actions to offer for `template`, in display order
pub fn allowed_actions(template: &PromptTemplate) -> Vec<TemplateAction> {
    [
        TemplateAction::View,
        TemplateAction::Edit,
        TemplateAction::Copy,
        TemplateAction::Delete,
    ]
    .into_iter()
    .filter(|action| permits(template, *action))
    .collect()
}
