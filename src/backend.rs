use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::model::TreeNode;

const GENERATE_PATH: &str = "/api/ai/mindmap";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Topic is empty")]
    EmptyTopic,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error("Server returned HTML instead of JSON. This might be a server error.")]
    HtmlBody,

    #[error("Server returned an empty response")]
    EmptyBody,

    #[error("Invalid response from server: {0}")]
    InvalidBody(String),

    #[error("Discarded response {seq}; request {latest} is newer")]
    Stale { seq: u64, latest: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; the generation path is appended to it.
    pub endpoint: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000".to_string(),
            token: None,
            timeout_secs: 60,
        }
    }
}

/// Anything that can turn a topic into a tree payload.
pub trait TreeSource {
    fn generate(&self, topic: &str) -> Result<TreeNode, BackendError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    topic: &'a str,
}

/// Blocking HTTP client for the mind-map generation endpoint.
pub struct HttpTreeSource {
    client: reqwest::blocking::Client,
    url: String,
    token: Option<String>,
}

impl HttpTreeSource {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let token = config.token.clone().filter(|token| {
            let usable = token.starts_with("eyJ");
            if !usable {
                warn!("ignoring backend token that is not a JWT");
            }
            usable
        });

        Ok(Self {
            client,
            url: format!("{}{}", config.endpoint.trim_end_matches('/'), GENERATE_PATH),
            token,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TreeSource for HttpTreeSource {
    fn generate(&self, topic: &str) -> Result<TreeNode, BackendError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(BackendError::EmptyTopic);
        }

        let mut request = self.client.post(&self.url).json(&GenerateRequest { topic });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        info!(topic, url = %self.url, "requesting mind map");
        let response = request
            .send()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        parse_generate_response(status, &body)
    }
}

/// Interprets a generation response body.
pub fn parse_generate_response(status: u16, body: &str) -> Result<TreeNode, BackendError> {
    let ok = (200..300).contains(&status);
    let text = body.trim();

    if text.is_empty() {
        return Err(if ok {
            BackendError::EmptyBody
        } else {
            BackendError::Status {
                status,
                message: "Request failed".to_string(),
            }
        });
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            if text.contains("<html") || text.contains("<!DOCTYPE") {
                return Err(BackendError::HtmlBody);
            }
            return Err(BackendError::InvalidBody(e.to_string()));
        }
    };

    let message_field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

    if !ok {
        let message = match &value {
            Value::String(message) => Some(message.clone()),
            _ => message_field("error").or_else(|| message_field("message")),
        };
        return Err(BackendError::Status {
            status,
            message: message.unwrap_or_else(|| "Request failed".to_string()),
        });
    }

    if let Some(error) = message_field("error") {
        return Err(BackendError::Rejected(error));
    }

    serde_json::from_value(value).map_err(|e| BackendError::InvalidBody(e.to_string()))
}

/// Hands out increasing sequence numbers so that only the newest response is applied.
#[derive(Debug, Default, Clone)]
pub struct RequestTracker {
    latest: u64,
    pending: bool,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.pending = true;
        self.latest
    }

    pub fn latest(&self) -> Option<u64> {
        (self.latest > 0).then_some(self.latest)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq != 0 && seq == self.latest
    }

    /// Passes the result through if `seq` is the newest request; otherwise drops it.
    pub fn accept<T>(&mut self, seq: u64, result: Result<T, BackendError>) -> Result<T, BackendError> {
        if !self.is_current(seq) {
            warn!(seq, latest = self.latest, "dropping stale backend response");
            return Err(BackendError::Stale {
                seq,
                latest: self.latest,
            });
        }
        self.pending = false;
        result
    }
}

/// Result of a generation request run off the UI thread.
#[derive(Debug)]
pub struct GenerationResponse {
    pub seq: u64,
    pub topic: String,
    pub result: Result<TreeNode, BackendError>,
}

/// Runs `source.generate(topic)` on a helper thread and sends the outcome back.
pub fn spawn_generation(
    source: Arc<dyn TreeSource + Send + Sync>,
    seq: u64,
    topic: String,
    sender: Sender<GenerationResponse>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let result = source.generate(&topic);
        // The receiver is gone when the UI has shut down; nothing left to do then.
        let _ = sender.send(GenerationResponse { seq, topic, result });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_parse_tree_body() {
        let body = r#"{"id":"root","title":"Rust","children":[{"id":"a","title":"Ownership"}]}"#;
        let tree = parse_generate_response(200, body).unwrap();
        assert_eq!(tree.id.as_deref(), Some("root"));
        assert_eq!(tree.children.len(), 1);
    }

    #[test]
    fn test_parse_empty_body() {
        assert_eq!(parse_generate_response(200, "  "), Err(BackendError::EmptyBody));
        assert!(matches!(
            parse_generate_response(502, ""),
            Err(BackendError::Status { status: 502, .. })
        ));
    }

    #[test]
    fn test_parse_html_body() {
        let body = "<!DOCTYPE html><html><body>Bad Gateway</body></html>";
        assert_eq!(parse_generate_response(502, body), Err(BackendError::HtmlBody));
    }

    #[test]
    fn test_parse_garbage_body() {
        assert!(matches!(
            parse_generate_response(200, "not json"),
            Err(BackendError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_parse_error_status_uses_error_then_message() {
        assert_eq!(
            parse_generate_response(401, r#"{"error":"Unauthorized"}"#),
            Err(BackendError::Status {
                status: 401,
                message: "Unauthorized".to_string()
            })
        );
        assert_eq!(
            parse_generate_response(500, r#"{"message":"boom"}"#),
            Err(BackendError::Status {
                status: 500,
                message: "boom".to_string()
            })
        );
        assert_eq!(
            parse_generate_response(500, r#""quota exceeded""#),
            Err(BackendError::Status {
                status: 500,
                message: "quota exceeded".to_string()
            })
        );
    }

    #[test]
    fn test_parse_error_field_on_success() {
        assert_eq!(
            parse_generate_response(200, r#"{"error":"model overloaded"}"#),
            Err(BackendError::Rejected("model overloaded".to_string()))
        );
    }

    #[test]
    fn test_tracker_drops_stale_responses() {
        let mut tracker = RequestTracker::new();
        assert_eq!(tracker.latest(), None);
        let first = tracker.issue();
        let second = tracker.issue();
        assert!(tracker.is_pending());

        assert_eq!(
            tracker.accept(first, Ok(1)),
            Err(BackendError::Stale {
                seq: first,
                latest: second
            })
        );
        assert!(tracker.is_pending());
        assert_eq!(tracker.accept(second, Ok(2)), Ok(2));
        assert!(!tracker.is_pending());
    }

    #[test]
    fn test_http_source_builds_url() {
        let config = BackendConfig {
            endpoint: "https://example.test/".to_string(),
            token: Some("not-a-jwt".to_string()),
            timeout_secs: 5,
        };
        let source = HttpTreeSource::new(&config).unwrap();
        assert_eq!(source.url(), "https://example.test/api/ai/mindmap");
        assert!(source.token.is_none());
    }

    #[test]
    fn test_empty_topic_rejected_without_request() {
        let source = HttpTreeSource::new(&BackendConfig::default()).unwrap();
        assert_eq!(source.generate("   "), Err(BackendError::EmptyTopic));
    }

    struct EchoSource;

    impl TreeSource for EchoSource {
        fn generate(&self, topic: &str) -> Result<TreeNode, BackendError> {
            Ok(TreeNode::new("root", topic))
        }
    }

    #[test]
    fn test_spawn_generation_reports_over_channel() {
        let (sender, receiver) = mpsc::channel();
        let handle = spawn_generation(Arc::new(EchoSource), 7, "Tides".to_string(), sender);
        handle.join().unwrap();
        let response = receiver.recv().unwrap();
        assert_eq!(response.seq, 7);
        assert_eq!(response.result.unwrap().title, "Tides");
    }
}
