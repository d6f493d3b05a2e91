//! Words-per-shot parameter for chapter-split templates
//!
//! Chapter-split templates carry no structured field for the shot size.
//! The count lives inside the template body: a fixed sentence holds it in
//! a slot, and bare placeholder tokens elsewhere are replaced by it. This
//! module is the only place that knows that encoding; callers work with
//! [`RewriteParams`].

use regex::{NoExpand, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;
use templatestore::TemplateType;
use tracing::debug;

/// Token standing for the words-per-shot count in a draft body
pub const WORD_COUNT_PLACEHOLDER: &str = "{每个分镜对应拆分故事字数}";

/// Count assumed when a body carries no recognisable count
pub const DEFAULT_WORD_COUNT: u32 = 50;

/// Range offered to operators; not enforced by the rewriter
pub const MIN_WORD_COUNT: u32 = 10;
pub const MAX_WORD_COUNT: u32 = 500;

const SENTENCE_PREFIX: &str = "每个分镜的字数必须控制在";
const SENTENCE_SUFFIX: &str = "字左右";

/// The fixed sentence, with either the placeholder or a number in its slot
///
/// The slot takes ASCII digits only; full-width digits in prose are left alone.
static SENTENCE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(
        "{}(?:{}|[0-9]+){}",
        regex::escape(SENTENCE_PREFIX),
        regex::escape(WORD_COUNT_PLACEHOLDER),
        regex::escape(SENTENCE_SUFFIX)
    ))
    .ok()
});

static EXTRACT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"必须控制在([0-9]+)字").ok());

/// Structured parameters applied to a body before it is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteParams {
    pub word_count: u32,
}

impl Default for RewriteParams {
    fn default() -> Self {
        Self {
            word_count: DEFAULT_WORD_COUNT,
        }
    }
}

/// The fixed sentence with `word_count` in its slot
pub fn word_count_sentence(word_count: u32) -> String {
    format!("{}{}{}", SENTENCE_PREFIX, word_count, SENTENCE_SUFFIX)
}

/// The fixed sentence with the placeholder in its slot, as starter bodies carry it
pub fn placeholder_sentence() -> String {
    format!("{}{}{}", SENTENCE_PREFIX, WORD_COUNT_PLACEHOLDER, SENTENCE_SUFFIX)
}

/// Produce the body to persist from a draft body
///
/// Only `chapter_split` bodies are touched. The first occurrence of the
/// fixed sentence gets the count in its slot, then every remaining bare
/// placeholder is replaced. Anything not found is left alone.
pub fn rewrite(body: &str, template_type: TemplateType, params: &RewriteParams) -> String {
    if template_type != TemplateType::ChapterSplit {
        return body.to_string();
    }
    debug!(word_count = params.word_count, body_len = body.len(), "rewrite: called");

    let count = params.word_count.to_string();
    let sentence = word_count_sentence(params.word_count);
    let with_sentence = match SENTENCE_RE.as_ref() {
        Some(re) => re.replace(body, NoExpand(&sentence)),
        None => Cow::Borrowed(body),
    };
    with_sentence.replace(WORD_COUNT_PLACEHOLDER, &count)
}

/// Recover the count a previous [`rewrite`] embedded in `body`
///
/// Falls back to [`DEFAULT_WORD_COUNT`] when the sentence was removed or
/// reworded.
pub fn extract_word_count(body: &str) -> u32 {
    let count = EXTRACT_RE
        .as_ref()
        .and_then(|re| re.captures(body))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    match count {
        Some(n) => n,
        None => {
            debug!("extract_word_count: no count in body, using default");
            DEFAULT_WORD_COUNT
        }
    }
}

/// Parameters to preload into an editor for an existing body
pub fn extract_params(body: &str, template_type: TemplateType) -> RewriteParams {
    match template_type {
        TemplateType::ChapterSplit => RewriteParams {
            word_count: extract_word_count(body),
        },
        _ => RewriteParams::default(),
    }
}
