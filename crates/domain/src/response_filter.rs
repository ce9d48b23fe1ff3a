//! Spoken-text response filter
//!
//! Language models like to answer in markdown and sprinkle stage directions
//! (`*waves*`) into their replies. None of that should reach a speech
//! synthesizer, so every reply passes through [`filter`] first.

use std::sync::LazyLock;

use regex::Regex;

static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)```.*?```"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| compile(r"\*\*([^*]+)\*\*"));
static STAGE_DIRECTION: LazyLock<Regex> = LazyLock::new(|| compile(r"\*[^*]+\*"));
static DOUBLE_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| compile(r"__([^_]+)__"));
static UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| compile(r"_([^_]+)_"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"`([^`]+)`"));
static HEADING: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^[ \t]*#+[ \t]*"));
static LINK: LazyLock<Regex> = LazyLock::new(|| compile(r"\[([^\]]+)\]\([^)]+\)"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+"));

#[allow(clippy::expect_used)] // Infallible with the static patterns above
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// Strip non-spoken markup from a model reply
///
/// Total and deterministic: empty or whitespace-only input yields an empty
/// string. The result is a fixed point, so `filter(filter(x)) == filter(x)`.
pub fn filter(text: &str) -> String {
    let mut current = single_pass(text);
    loop {
        let next = single_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

// Every rewrite either shortens the text or only normalizes whitespace, so
// repeating the pass terminates.
fn single_pass(text: &str) -> String {
    // Fences go first: unwrapping inline code would otherwise eat their backticks.
    let text = FENCED_CODE.replace_all(text, " ");
    let text = BOLD.replace_all(&text, "$1");
    let text = STAGE_DIRECTION.replace_all(&text, " ");
    let text = DOUBLE_UNDERSCORE.replace_all(&text, "$1");
    let text = UNDERSCORE.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = LINK.replace_all(&text, "$1");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}
