use regex::Regex;
use serde_yaml::Value;
use std::sync::LazyLock;

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

static FRONTMATTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?s)\A---\s*\n(.*?)\n(?:---|\.\.\.)\s*\n?"));

/// Split a note into parsed front matter and the byte offset where the
/// markdown body begins.
pub(super) fn split_frontmatter(content: &str) -> (Option<Value>, usize) {
    let Some(caps) = FRONTMATTER_REGEX.captures(content) else {
        return (None, 0);
    };
    let body_start = caps.get(0).map_or(0, |m| m.end());
    let parsed = caps
        .get(1)
        .and_then(|m| serde_yaml::from_str::<Value>(m.as_str()).ok());
    (parsed, body_start)
}

pub(super) fn frontmatter_title(frontmatter: Option<&Value>) -> Option<String> {
    frontmatter?
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
