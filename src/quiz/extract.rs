//! Pull a single JSON object out of a free-form LLM reply.
//!
//! Models are asked for pure JSON but routinely wrap it in a markdown fence or surround it with
//! chatter.  Two strategies are tried in order:
//!
//! 1. the contents of a triple-backtick fence, optionally tagged `json`
//! 2. the first balanced `{...}` span in the text
//!
//! Only a JSON object counts.  A fence holding an array or a bare string is skipped like any
//! other unusable fence.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```[ \t]*(?:json)?[ \t]*\r?\n?(.*?)```").expect("fenced block pattern")
});

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON object found in model reply")]
    NoObject,
    #[error("malformed JSON in model reply: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn extract_json(text: &str) -> Result<Value, ParseError> {
    for captures in FENCED_BLOCK.captures_iter(text) {
        let Some(body) = captures.get(1) else {
            continue;
        };
        let parsed = serde_json::from_str::<Value>(body.as_str().trim());
        if let Ok(value @ Value::Object(_)) = parsed {
            return Ok(value);
        }
    }

    let span = first_balanced_object(text).ok_or(ParseError::NoObject)?;
    match serde_json::from_str(span)? {
        value @ Value::Object(_) => Ok(value),
        _ => Err(ParseError::NoObject),
    }
}

/// Find the first `{...}` span whose braces balance.  Braces inside JSON string literals are not
/// counted, so a statement such as `"use {x}"` cannot end the span early.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
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
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tagged_fence() {
        let text = "Aqui está:\n```json\n{\"banca\": \"FGV\"}\n```\nBons estudos!";
        assert_eq!(extract_json(text).unwrap(), json!({"banca": "FGV"}));
    }

    #[test]
    fn untagged_fence_uppercase_tag() {
        assert_eq!(
            extract_json("```{\"a\": 1}```").unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            extract_json("```JSON\n{\"a\": 2}\n```").unwrap(),
            json!({"a": 2})
        );
    }

    #[test]
    fn bare_object_with_chatter() {
        let text = "Claro! {\"tema\": \"geral\", \"questoes\": [{\"x\": {}}]} Espero ter ajudado.";
        assert_eq!(
            extract_json(text).unwrap(),
            json!({"tema": "geral", "questoes": [{"x": {}}]})
        );
    }

    #[test]
    fn broken_fence_falls_back_to_scan() {
        let text = "```json\n{\"a\": oops}\n```\n{\"a\": 3}";
        // The fenced body is malformed; the scan finds the fence's object first and fails too.
        assert!(matches!(extract_json(text), Err(ParseError::Malformed(_))));

        let text = "```\nnot json\n```\n{\"a\": 3}";
        assert_eq!(extract_json(text).unwrap(), json!({"a": 3}));
    }

    #[test]
    fn braces_inside_strings() {
        let text = r#"Resposta: {"enunciado": "Conjunto {a, b} e \"}\" citado", "n": 1} fim"#;
        assert_eq!(
            extract_json(text).unwrap(),
            json!({"enunciado": "Conjunto {a, b} e \"}\" citado", "n": 1})
        );
    }

    #[test]
    fn fenced_non_objects_are_skipped() {
        assert!(matches!(
            extract_json("```json\n[\"questao 1\", \"questao 2\"]\n```"),
            Err(ParseError::NoObject)
        ));
        assert!(matches!(
            extract_json("```\n\"texto\"\n```"),
            Err(ParseError::NoObject)
        ));

        let text = "```json\n[1, 2]\n```\nSegue: ```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn nothing_to_extract() {
        assert!(matches!(
            extract_json("Desculpe, não consigo."),
            Err(ParseError::NoObject)
        ));
        assert!(matches!(
            extract_json("{\"unterminated\": true"),
            Err(ParseError::NoObject)
        ));
    }
}
