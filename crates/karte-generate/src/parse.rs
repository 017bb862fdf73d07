use serde::Deserialize;
use serde_json::Value;

use crate::error::GenerateError;

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// The `error.message` of an upstream failure body, if it carries a non-empty one.
pub fn upstream_error_message(body: &Value) -> Option<String> {
    let envelope = ErrorEnvelope::deserialize(body).ok()?;
    envelope
        .error?
        .message
        .filter(|m| !m.trim().is_empty())
}

/// Pull the completion text out of the first candidate's first part.
pub fn extract_text(body: &Value) -> Result<String, GenerateError> {
    let response = GenerateContentResponse::deserialize(body)
        .map_err(|_| GenerateError::UnexpectedUpstreamShape)?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or(GenerateError::UnexpectedUpstreamShape)
}

/// Parse completion text and check it carries a `nodes` array.
/// The parsed value is returned untouched.
pub fn normalize(raw: &str) -> Result<Value, GenerateError> {
    let data: Value =
        serde_json::from_str(raw).map_err(|e| GenerateError::MalformedJson(e.to_string()))?;

    match data.get("nodes") {
        Some(Value::Array(_)) => Ok(data),
        _ => Err(GenerateError::InvalidShape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_comes_from_first_candidate_first_part() {
        let body = json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"nodes\":[]}"}, {"text": "ignored"}]}},
                {"content": {"parts": [{"text": "second"}]}}
            ]
        });
        assert_eq!(extract_text(&body).unwrap(), "{\"nodes\":[]}");
    }

    #[test]
    fn missing_candidates_is_a_named_failure() {
        for body in [
            json!({}),
            json!({"candidates": []}),
            json!({"candidates": [{"finishReason": "SAFETY"}]}),
            json!({"candidates": [{"content": {"parts": []}}]}),
            json!({"candidates": "nope"}),
            Value::Null,
        ] {
            assert!(matches!(
                extract_text(&body),
                Err(GenerateError::UnexpectedUpstreamShape)
            ));
        }
    }

    #[test]
    fn error_message_is_read_when_present() {
        assert_eq!(
            upstream_error_message(&json!({"error": {"message": "quota exceeded", "code": 429}})),
            Some("quota exceeded".to_string())
        );
        assert_eq!(upstream_error_message(&json!({"error": {"message": ""}})), None);
        assert_eq!(upstream_error_message(&json!({"error": "flat"})), None);
        assert_eq!(upstream_error_message(&Value::Null), None);
    }

    #[test]
    fn normalize_forwards_the_object_verbatim() {
        let raw = r#"{"nodes":[{"id":"problem-1","label":"H1","type":"problem","parentId":null}],"extra":1}"#;
        let v = normalize(raw).unwrap();
        assert_eq!(v, serde_json::from_str::<Value>(raw).unwrap());
    }

    #[test]
    fn normalize_rejects_wrapped_json() {
        for raw in [
            "```json\n{\"nodes\": []}\n```",
            "Sure! Here it is: {\"nodes\": []} hope that helps",
            "{\"nodes\": []} trailing",
        ] {
            assert!(matches!(normalize(raw), Err(GenerateError::MalformedJson(_))));
        }
    }

    #[test]
    fn normalize_rejects_unparsable_text() {
        let err = normalize("not json at all").unwrap_err();
        assert!(matches!(err, GenerateError::MalformedJson(_)));
        assert!(err.to_string().starts_with("APIから返されたJSONを解析できませんでした"));
    }

    #[test]
    fn normalize_requires_a_nodes_array() {
        for raw in [r#"{"node": []}"#, r#"{"nodes": {}}"#, r#"{"nodes": null}"#, "[1,2]"] {
            let err = normalize(raw).unwrap_err();
            assert!(matches!(err, GenerateError::InvalidShape));
            assert_eq!(err.to_string(), "無効なデータ構造がAPIから返されました");
        }
    }
}
