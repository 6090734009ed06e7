//! API Client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat message for display
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Server-side session as the page renders it
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub messages: Vec<ChatMessage>,
    pub has_api_key: bool,
    pub result_count: u8,
}

/// Reply to a submitted question
#[derive(Clone, Debug, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub hint: Option<String>,
    pub session: SessionView,
}

/// Error body returned by the server
#[derive(Clone, Debug, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn transport(e: &reqwest::Error) -> Self {
        Self {
            error: e.to_string(),
            code: "NETWORK".into(),
        }
    }

    pub fn is_missing_key(&self) -> bool {
        self.code == "MISSING_API_KEY"
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// reqwest on WASM needs absolute URLs
fn url(path: &str) -> String {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into());
    format!("{origin}{path}")
}

async fn decode<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> ApiResult<T> {
    if response.status().is_success() {
        response.json().await.map_err(|e| ApiError::transport(&e))
    } else {
        let status = response.status();
        Err(response.json().await.unwrap_or_else(|_| ApiError {
            error: format!("Request failed ({status})"),
            code: "HTTP".into(),
        }))
    }
}

/// Start a session
pub async fn create_session() -> ApiResult<SessionView> {
    let response = reqwest::Client::new()
        .post(url("/api/sessions"))
        .send()
        .await
        .map_err(|e| ApiError::transport(&e))?;
    decode(response).await
}

/// Send the API key and/or result count
pub async fn update_settings(
    session_id: &str,
    api_key: Option<String>,
    result_count: Option<u8>,
) -> ApiResult<SessionView> {
    let body = serde_json::json!({
        "api_key": api_key,
        "result_count": result_count,
    });

    let response = reqwest::Client::new()
        .put(url(&format!("/api/sessions/{session_id}/settings")))
        .json(&body)
        .send()
        .await
        .map_err(|e| ApiError::transport(&e))?;
    decode(response).await
}

/// Ask a question
pub async fn send_chat(session_id: &str, message: &str) -> ApiResult<ChatReply> {
    let response = reqwest::Client::new()
        .post(url(&format!("/api/sessions/{session_id}/chat")))
        .json(&serde_json::json!({ "message": message }))
        .send()
        .await
        .map_err(|e| ApiError::transport(&e))?;
    decode(response).await
}

/// Clear the conversation back to the greeting
pub async fn reset(session_id: &str) -> ApiResult<SessionView> {
    let response = reqwest::Client::new()
        .post(url(&format!("/api/sessions/{session_id}/reset")))
        .send()
        .await
        .map_err(|e| ApiError::transport(&e))?;
    decode(response).await
}

#[derive(Deserialize)]
struct FeedbackAck {
    message: String,
}

/// Submit "Yes" / "No" and get the acknowledgement text
pub async fn send_feedback(session_id: &str, helpful: bool) -> ApiResult<String> {
    let body = serde_json::json!({ "feedback": if helpful { "yes" } else { "no" } });
    let response = reqwest::Client::new()
        .post(url(&format!("/api/sessions/{session_id}/feedback")))
        .json(&body)
        .send()
        .await
        .map_err(|e| ApiError::transport(&e))?;
    decode::<FeedbackAck>(response).await.map(|ack| ack.message)
}
