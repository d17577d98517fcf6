//! Gateway failures, normalized into one human-readable message each.

/// Errors from the bot backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced a response (connect failure, timeout, reset).
    #[error("Error: {0}")]
    Network(String),
    /// The backend answered with a non-success status or an unreadable body.
    #[error("{message}")]
    Server { status: u16, message: String },
    /// Speech-to-text failed or returned an unusable transcript.
    #[error("speech recognition failed: {0}")]
    Recognition(String),
    /// Text-to-speech failed.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
}

impl GatewayError {
    /// Build a server error from the status and raw body.
    ///
    /// The backend's own message wins: `errorMessage` from a JSON body, else a JSON string body,
    /// else a non-empty plain-text body. Otherwise a generic status line is used.
    pub fn from_response(status: u16, reason: &str, url: &str, body: &str) -> Self {
        let message = server_message(body).unwrap_or_else(|| {
            format!(
                "Error code: {}\nMessage: Http failure response for {}: {} {}",
                status, url, status, reason
            )
        });
        GatewayError::Server { status, message }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when no response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, GatewayError::Network(_))
    }
}

fn server_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => map
            .get("errorMessage")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        Ok(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Ok(_) => None,
        Err(_) => Some(body.to_string()),
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => GatewayError::Server {
                status: status.as_u16(),
                message: format!("Error code: {}\nMessage: {}", status.as_u16(), e),
            },
            None if e.is_decode() => GatewayError::Server {
                status: 200,
                message: format!("invalid response body: {}", e),
            },
            None => GatewayError::Network(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_message_takes_precedence() {
        let e = GatewayError::from_response(
            500,
            "Internal Server Error",
            "http://x/chat",
            r#"{"errorMessage":"Bot unavailable"}"#,
        );
        assert_eq!(e.to_string(), "Bot unavailable");
        assert_eq!(e.status(), Some(500));
    }

    #[test]
    fn plain_text_body_is_used() {
        let e = GatewayError::from_response(503, "Service Unavailable", "http://x/chat", "maintenance");
        assert_eq!(e.to_string(), "maintenance");
    }

    #[test]
    fn generic_message_when_body_has_nothing_useful() {
        let e = GatewayError::from_response(404, "Not Found", "http://x/chat", r#"{"detail":1}"#);
        assert_eq!(
            e.to_string(),
            "Error code: 404\nMessage: Http failure response for http://x/chat: 404 Not Found"
        );
    }

    #[test]
    fn network_errors_are_tagged_distinctly() {
        let e = GatewayError::Network("connection refused".into());
        assert!(e.is_network());
        assert_eq!(e.status(), None);
        assert_eq!(e.to_string(), "Error: connection refused");
    }
}
