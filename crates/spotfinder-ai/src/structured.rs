//! Typed requests for structured data from a text generator.

use serde::de::DeserializeOwned;

use crate::client::TextGenerator;
use crate::error::AnalysisError;

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````) and
/// whitespace. Anything else is left for the parser to reject.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.trim()
}

/// Parse generated text as `T` and run `validate` over it.
///
/// # Errors
/// `AnalysisError::Malformed` when the text isn't valid JSON for `T` or the
/// validator rejects it.
pub fn parse_structured<T, F>(text: &str, validate: F) -> Result<T, AnalysisError>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> Result<(), String>,
{
    let cleaned = strip_code_fence(text);
    let value: T = serde_json::from_str(cleaned)
        .map_err(|e| AnalysisError::Malformed(format!("not valid JSON: {}", e)))?;
    validate(&value).map_err(AnalysisError::Malformed)?;
    Ok(value)
}

/// Ask `generator` for JSON and decode it into `T`.
///
/// No repair and no retry: a reply that doesn't parse or validate is a
/// `Malformed` error. Provider failures pass through unchanged.
///
/// # Errors
/// `AnalysisError::Provider` or `AnalysisError::Malformed`.
pub async fn request_structured<T, F>(
    generator: &dyn TextGenerator,
    system: &str,
    user: &str,
    temperature: Option<f32>,
    validate: F,
) -> Result<T, AnalysisError>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> Result<(), String>,
{
    let text = generator.complete(system, user, temperature).await?;
    parse_structured(&text, validate).map_err(|e| {
        tracing::warn!("Discarding unparseable completion: {}", e);
        e
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pair {
        name: String,
    }

    fn accept(_: &Vec<Pair>) -> Result<(), String> {
        Ok(())
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("  [1]  "), "[1]");
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json [1] ```"), "[1]");
    }

    #[test]
    fn test_parse_structured_accepts_fenced_json() {
        let parsed: Vec<Pair> =
            parse_structured("```json\n[{\"name\": \"Bass\"}]\n```", accept).unwrap();
        assert_eq!(parsed, vec![Pair { name: "Bass".into() }]);
    }

    #[test]
    fn test_parse_structured_rejects_prose() {
        let result: Result<Vec<Pair>, _> =
            parse_structured("Here are three fish: bass, pike and perch.", accept);
        assert!(matches!(result, Err(AnalysisError::Malformed(_))));
    }

    #[test]
    fn test_validator_failure_is_malformed() {
        let result: Result<Vec<Pair>, _> = parse_structured("[]", |v: &Vec<Pair>| {
            if v.is_empty() {
                Err("empty".to_string())
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(AnalysisError::Malformed(ref m)) if m == "empty"));
    }
}
