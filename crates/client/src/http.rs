//! Shared helpers for reading backend failures.

use serde_json::Value;

/// Human-readable message from an error body (`message`, then `detail`).
pub(crate) fn message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "detail"]
        .iter()
        .find_map(|key| value.get(key)?.as_str())
        .map(str::to_string)
}

/// Consume a failed response and pull out its message, if any.
pub(crate) async fn failure_message(response: reqwest::Response) -> Option<String> {
    let body = response.text().await.ok()?;
    message_from_body(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_message_over_detail() {
        assert_eq!(
            message_from_body(r#"{"message":"Credenciales incorrectas","detail":"x"}"#).as_deref(),
            Some("Credenciales incorrectas")
        );
        assert_eq!(message_from_body(r#"{"detail":"Not found"}"#).as_deref(), Some("Not found"));
    }

    #[test]
    fn ignores_non_string_and_non_json_bodies() {
        assert_eq!(message_from_body(r#"{"detail":[{"loc":["body"]}]}"#), None);
        assert_eq!(message_from_body("<html>502</html>"), None);
    }
}
