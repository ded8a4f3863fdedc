//! Extracting JSON from free-form model output.
//!
//! Models wrap structured output in fenced code blocks, leave it inline in
//! prose, or get it slightly wrong. Nothing here fails loudly: every
//! function returns what it could find, and malformed candidates are
//! skipped.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A fenced code block found in model output.
#[derive(Debug, Clone, PartialEq)]
pub struct FencedBlock {
    /// Info string after the opening fence (e.g. `json`), lowercased.
    pub lang: Option<String>,
    pub body: String,
    /// Byte range of the whole block, fences included.
    pub start: usize,
    pub end: usize,
}

/// Where a structured value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSource {
    /// The n-th fenced block (0-based).
    Fenced(usize),
    /// A brace-matched object in the raw text.
    Inline,
}

/// Every fenced block, in order of appearance. An unterminated fence is
/// not a block.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(open_rel) = text[cursor..].find("```") {
        let open = cursor + open_rel;
        let after_ticks = open + 3;
        let line_end = match text[after_ticks..].find('\n') {
            Some(i) => after_ticks + i,
            None => break,
        };
        let info = text[after_ticks..line_end].trim();
        let body_start = line_end + 1;

        let Some(close_rel) = text[body_start..].find("```") else {
            break;
        };
        let close = body_start + close_rel;

        blocks.push(FencedBlock {
            lang: (!info.is_empty()).then(|| info.to_lowercase()),
            body: text[body_start..close].trim_end_matches(['\r', '\n']).to_string(),
            start: open,
            end: close + 3,
        });
        cursor = close + 3;
    }

    blocks
}

/// Top-level `{...}` substrings, matched by brace depth while respecting
/// JSON string literals.
pub fn brace_objects(text: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        objects.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    objects
}

/// Remove fence delimiter lines, keeping their content.
pub fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse JSON, tolerating a byte-order mark and trailing commas.
pub fn parse_json_lenient(text: &str) -> Result<Value, String> {
    let trimmed = text.trim().trim_start_matches('\u{feff}');
    if trimmed.is_empty() {
        return Err("empty input".into());
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(first) => match strip_trailing_commas(trimmed) {
            Some(repaired) => serde_json::from_str(&repaired).map_err(|_| first.to_string()),
            None => Err(first.to_string()),
        },
    }
}

/// Drop commas directly before a closing `}` or `]`, outside string
/// literals. `None` when there were none.
fn strip_trailing_commas(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut changed = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' && text[i + 1..].trim_start().starts_with(['}', ']']) {
            changed = true;
            continue;
        }
        out.push(c);
    }

    changed.then_some(out)
}

/// Find the first JSON value in `text` that deserializes into `T` and
/// passes `accept`: fenced blocks first, then inline objects if no fenced
/// block qualified.
pub fn extract_json<T, F>(text: &str, accept: F) -> Option<(T, BlockSource)>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let try_parse = |raw: &str| -> Option<T> {
        let value = parse_json_lenient(raw).ok()?;
        let parsed: T = serde_json::from_value(value).ok()?;
        accept(&parsed).then_some(parsed)
    };

    for (i, block) in fenced_blocks(text).iter().enumerate() {
        if let Some(parsed) = try_parse(&block.body) {
            return Some((parsed, BlockSource::Fenced(i)));
        }
    }

    brace_objects(text)
        .into_iter()
        .find_map(try_parse)
        .map(|parsed| (parsed, BlockSource::Inline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[test]
    fn finds_blocks_in_order_with_lang() {
        let text = "intro\n```json\n{\"a\":1}\n```\nmiddle\n```\nplain\n```\n";
        let blocks = fenced_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lang.as_deref(), Some("json"));
        assert_eq!(blocks[0].body, "{\"a\":1}");
        assert_eq!(blocks[1].lang, None);
        assert_eq!(&text[blocks[0].start..blocks[0].end], "```json\n{\"a\":1}\n```");
    }

    #[test]
    fn unterminated_fence_is_ignored() {
        assert!(fenced_blocks("```json\n{\"a\":1}\n").is_empty());
    }

    #[test]
    fn brace_matching_skips_braces_in_strings() {
        let text = r#"Here: {"text": "a } b", "n": {"x": 1}} and {"y": 2}"#;
        let objects = brace_objects(text);
        assert_eq!(objects, vec![r#"{"text": "a } b", "n": {"x": 1}}"#, r#"{"y": 2}"#]);
    }

    #[test]
    fn lenient_parse_fixes_trailing_commas() {
        let value = parse_json_lenient("{\"a\": [1, 2,], }").unwrap();
        assert_eq!(value["a"][1], 2);
        assert!(parse_json_lenient("{not json").is_err());
        assert!(parse_json_lenient("   ").is_err());
    }

    #[test]
    fn trailing_comma_repair_leaves_strings_alone() {
        let value = parse_json_lenient("{\"note\": \"sets,} reps,]\", \"quote\": \"a\\\",}\",}").unwrap();
        assert_eq!(value["note"], "sets,} reps,]");
        assert_eq!(value["quote"], "a\",}");
        assert_eq!(strip_trailing_commas("[1, 2]"), None);
    }

    #[test]
    fn second_fenced_block_wins_when_first_is_malformed() {
        let text = "```json\n{\"name\": \"Push\",,, oops\n```\n\n```json\n{\"name\": \"Pull\"}\n```";
        let (parsed, source) = extract_json::<Named, _>(text, |_| true).unwrap();
        assert_eq!(parsed.name, "Pull");
        assert_eq!(source, BlockSource::Fenced(1));
    }

    #[test]
    fn falls_back_to_inline_objects() {
        let text = "Sure! {\"name\": \"Legs\"} Let me know.";
        let (parsed, source) = extract_json::<Named, _>(text, |_| true).unwrap();
        assert_eq!(parsed, Named { name: "Legs".into() });
        assert_eq!(source, BlockSource::Inline);
    }

    #[test]
    fn accept_predicate_skips_blocks() {
        let text = "```\n{\"name\": \"\"}\n```\n```\n{\"name\": \"Real\"}\n```";
        let (parsed, _) = extract_json::<Named, _>(text, |n| !n.name.is_empty()).unwrap();
        assert_eq!(parsed.name, "Real");
    }

    #[test]
    fn strip_fences_keeps_content() {
        assert_eq!(strip_fences("Hi\n```json\n{\"a\":1}\n```\nBye"), "Hi\n{\"a\":1}\nBye");
    }
}
