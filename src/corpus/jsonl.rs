use anyhow::{Context, Result};
use serde_json::Value;
use tracing::warn;

/// Extract `field` from each JSON object line
///
/// Lines that are not JSON objects are an error; objects without a string
/// value under `field` are skipped.
pub fn documents(content: &str, field: &str) -> Result<Vec<String>> {
    let mut docs = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON on line {}", line_num + 1))?;

        match value.get(field).and_then(Value::as_str) {
            Some(text) if !text.trim().is_empty() => docs.push(text.to_string()),
            Some(_) => {}
            None => warn!(line = line_num + 1, field, "record has no text field, skipping"),
        }
    }

    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_field() {
        let content = r#"{"text": "جملة اولى", "id": 1}
{"id": 2}

{"text": "جملة ثانية"}"#;
        let docs = documents(content, "text").unwrap();
        assert_eq!(docs, vec!["جملة اولى", "جملة ثانية"]);
    }

    #[test]
    fn test_custom_field() {
        let docs = documents(r#"{"body": "نص"}"#, "body").unwrap();
        assert_eq!(docs, vec!["نص"]);
    }

    #[test]
    fn test_invalid_json() {
        let err = documents("{\"text\": \"a\"}\nnot json", "text").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
