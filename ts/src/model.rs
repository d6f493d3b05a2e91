//! Prompt template records as the store persists them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Category of a prompt template
///
/// Fixed at creation time. Decides which console section shows the
/// template and which substitution rules apply when it is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Style,
    CharacterParse,
    SceneParse,
    Character,
    Scene,
    ChapterSplit,
}

impl TemplateType {
    /// Every template type, in console display order
    pub const ALL: [TemplateType; 6] = [
        Self::Style,
        Self::CharacterParse,
        Self::SceneParse,
        Self::Character,
        Self::Scene,
        Self::ChapterSplit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::CharacterParse => "character_parse",
            Self::SceneParse => "scene_parse",
            Self::Character => "character",
            Self::Scene => "scene",
            Self::ChapterSplit => "chapter_split",
        }
    }
}

impl std::fmt::Display for TemplateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TemplateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "style" => Ok(Self::Style),
            "character_parse" => Ok(Self::CharacterParse),
            "scene_parse" => Ok(Self::SceneParse),
            "character" => Ok(Self::Character),
            "scene" => Ok(Self::Scene),
            "chapter_split" => Ok(Self::ChapterSplit),
            _ => Err(format!("Unknown template type: {}", s)),
        }
    }
}

/// Opaque template identifier assigned by the store
///
/// Stores may hand out numeric or string ids; both are kept as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for TemplateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

fn default_active() -> bool {
    true
}

/// A persisted prompt template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Body consumed by downstream LLM calls
    pub template: String,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
    /// Built-in record seeded by the platform; read-only, copyable
    #[serde(default)]
    pub is_system: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PromptTemplate {
    /// The mutable fields of this record, ready to send back to the store
    pub fn to_payload(&self) -> TemplatePayload {
        TemplatePayload {
            name: self.name.clone(),
            description: self.description.clone(),
            template: self.template.clone(),
            template_type: self.template_type,
        }
    }
}

/// Body of a create or update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePayload {
    pub name: String,
    pub description: String,
    pub template: String,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
}

/// Platform-wide prompt settings
///
/// Every field is optional so a `set` call only touches what it names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_characters_prompt: Option<String>,
}

impl GlobalConfig {
    /// Overlay the fields `update` sets onto `self`
    pub fn merge(&mut self, update: GlobalConfig) {
        if update.parse_characters_prompt.is_some() {
            self.parse_characters_prompt = update.parse_characters_prompt;
        }
    }
}
