//! HTTP/WebSocket Handlers

use axum::{
    Json,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use chat_core::{
    AgentError, FailureKind, Message, Session, SessionId, SharedSession, TurnOutcome,
    controller::{self, CREDENTIAL_PROMPT},
    settings::Feedback,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
    pub sessions: usize,
}

/// Everything the page renders for a session. The key itself never leaves
/// the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub messages: Vec<Message>,
    pub has_api_key: bool,
    pub result_count: u8,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.to_string(),
            messages: session.conversation.all().to_vec(),
            has_api_key: session.settings.has_api_key(),
            result_count: session.settings.result_count.get(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub result_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: Message,
    /// Set when the reply is the apology
    pub failure: Option<FailureKind>,
    pub hint: Option<&'static str>,
    pub session: SessionView,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: Feedback,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn missing_credential() -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "MISSING_API_KEY", CREDENTIAL_PROMPT)
}

async fn find_session(state: &AppState, id: &str) -> ApiResult<SharedSession> {
    state
        .sessions
        .get(&SessionId::from_string(id))
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", "Session not found"))
}

fn turn_error(e: &AgentError) -> ApiError {
    match e {
        AgentError::InvalidMessage(_) => {
            api_error(StatusCode::BAD_REQUEST, "INVALID_MESSAGE", e.user_message())
        }
        _ => {
            tracing::error!("Turn error: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "TURN_ERROR", e.user_message())
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: state.config.groq.model.clone(),
        sessions: state.sessions.len().await,
    })
}

/// Start a session with a fresh greeting
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    let settings = chat_core::Settings {
        api_key: state.config.default_api_key.clone(),
        ..Default::default()
    };
    let (id, shared) = state.sessions.create(settings).await;
    tracing::info!(session = %id, "Session started");

    let view = SessionView::from(&*shared.lock().await);
    (StatusCode::CREATED, Json(view))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let shared = find_session(&state, &id).await?;
    let session = shared.lock().await;
    Ok(Json(SessionView::from(&*session)))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.sessions.remove(&SessionId::from_string(&id)).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", "Session not found"))
    }
}

/// Apply the settings panel
pub async fn update_settings(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SettingsRequest>,
) -> ApiResult<Json<SessionView>> {
    let shared = find_session(&state, &id).await?;
    let mut session = shared.lock().await;
    controller::update_settings(&mut session, payload.api_key, payload.result_count);
    Ok(Json(SessionView::from(&*session)))
}

/// "Clear Chat History"
pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let shared = find_session(&state, &id).await?;
    let mut session = shared.lock().await;
    session.reset();
    Ok(Json(SessionView::from(&*session)))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<FeedbackRequest>,
) -> ApiResult<Json<FeedbackResponse>> {
    find_session(&state, &id).await?;
    Ok(Json(FeedbackResponse {
        message: controller::acknowledge_feedback(payload.feedback),
    }))
}

/// Run one turn (non-streaming)
pub async fn chat_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let shared = find_session(&state, &id).await?;
    let mut session = shared.lock().await;

    let outcome = controller::run_turn(
        &mut session,
        &payload.message,
        state.dispatcher.as_ref(),
        None,
    )
    .await
    .map_err(|e| turn_error(&e))?;

    match outcome {
        TurnOutcome::MissingCredential => Err(missing_credential()),
        TurnOutcome::Completed { reply, failure } => Ok(Json(ChatResponse {
            reply,
            failure,
            hint: failure.map(FailureKind::hint),
            session: SessionView::from(&*session),
        })),
    }
}

/// WebSocket turns with streamed agent progress
pub async fn chat_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match find_session(&state, &id).await {
        Ok(_) => {
            let id = SessionId::from_string(&id);
            ws.on_upgrade(move |socket| handle_stream(socket, state, id))
        }
        Err(e) => e.into_response(),
    }
}

async fn send_json(sender: &mut SplitSink<WebSocket, WsMessage>, value: &serde_json::Value) -> bool {
    sender
        .send(WsMessage::Text(value.to_string().into()))
        .await
        .is_ok()
}

async fn handle_stream(socket: WebSocket, state: AppState, id: SessionId) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            _ => continue,
        };

        let request: ChatRequest = match serde_json::from_str(&msg) {
            Ok(r) => r,
            Err(e) => {
                let error = serde_json::json!({"type": "error", "code": "BAD_REQUEST", "error": e.to_string()});
                send_json(&mut sender, &error).await;
                continue;
            }
        };

        // The janitor may have pruned the session while the socket sat idle.
        let Some(shared) = state.sessions.get(&id).await else {
            tracing::info!(session = %id, "Stream closed for expired session");
            let error = serde_json::json!({
                "type": "error",
                "code": "SESSION_NOT_FOUND",
                "error": "Session not found",
            });
            send_json(&mut sender, &error).await;
            break;
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let turn = async {
            let mut session = shared.lock().await;
            let outcome =
                controller::run_turn(&mut session, &request.message, state.dispatcher.as_ref(), Some(&tx))
                    .await;
            drop(tx);
            outcome
        };

        let mut events = UnboundedReceiverStream::new(rx);
        let forward = async {
            let mut open = true;
            while let Some(event) = events.next().await {
                if open {
                    let value = serde_json::to_value(&event).unwrap_or_default();
                    open = send_json(&mut sender, &value).await;
                }
            }
            open
        };

        let (outcome, open) = tokio::join!(turn, forward);
        if !open {
            break;
        }

        let frame = match outcome {
            Ok(TurnOutcome::Completed { reply, failure }) => serde_json::json!({
                "type": "complete",
                "reply": reply,
                "failure": failure,
                "hint": failure.map(FailureKind::hint),
            }),
            Ok(TurnOutcome::MissingCredential) => serde_json::json!({
                "type": "error",
                "code": "MISSING_API_KEY",
                "error": CREDENTIAL_PROMPT,
            }),
            Err(e) => {
                let (_, Json(body)) = turn_error(&e);
                serde_json::json!({"type": "error", "code": body.code, "error": body.error})
            }
        };

        if !send_json(&mut sender, &frame).await {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use chat_core::{
        AgentEvent, Dispatcher, Role,
        controller::APOLOGY,
        message::GREETING,
        reasoning::EventSink,
        settings::Settings,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::ServerConfig;

    struct MockDispatcher {
        answer: Option<&'static str>,
    }

    #[async_trait]
    impl Dispatcher for MockDispatcher {
        async fn dispatch(
            &self,
            _history: &[Message],
            _settings: &Settings,
            events: Option<&EventSink>,
        ) -> chat_core::Result<String> {
            if let (Some(tx), Some(answer)) = (events, self.answer) {
                let _ = tx.send(AgentEvent::Thought {
                    text: "I can answer directly".into(),
                });
                let _ = tx.send(AgentEvent::Answer {
                    text: answer.into(),
                });
            }
            self.answer
                .map(str::to_string)
                .ok_or_else(|| AgentError::ProviderUnavailable("connection refused".into()))
        }
    }

    fn app_with(answer: Option<&'static str>, config: ServerConfig) -> Router {
        let state = AppState::new(Arc::new(MockDispatcher { answer }), config);
        crate::app(state)
    }

    fn app(answer: Option<&'static str>) -> Router {
        app_with(answer, ServerConfig::default())
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = call(app, "POST", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn set_key(app: &Router, id: &str) {
        let (status, body) = call(
            app,
            "PUT",
            &format!("/api/sessions/{id}/settings"),
            Some(json!({"api_key": "gsk_secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["has_api_key"], true);
        assert!(!body.to_string().contains("gsk_secret"));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&app(None), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_new_session_has_only_greeting() {
        let app = app(Some("4"));
        let id = new_session(&app).await;

        let (status, body) = call(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "assistant");
        assert_eq!(body["messages"][0]["content"], GREETING);
        assert_eq!(body["has_api_key"], false);
        assert_eq!(body["result_count"], 3);
    }

    #[tokio::test]
    async fn test_chat_without_key_is_401_and_appends_nothing() {
        let app = app(Some("4"));
        let id = new_session(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({"message": "What is 2+2?"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "MISSING_API_KEY");
        assert_eq!(body["error"], CREDENTIAL_PROMPT);

        let (_, view) = call(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(view["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_env_key_prepopulates_sessions() {
        let config = ServerConfig {
            default_api_key: chat_core::ApiKey::new("gsk_env"),
            ..ServerConfig::default()
        };
        let app = app_with(Some("4"), config);
        let id = new_session(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({"message": "What is 2+2?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["content"], "4");
    }

    #[tokio::test]
    async fn test_successful_turn() {
        let app = app(Some("4"));
        let id = new_session(&app).await;
        set_key(&app, &id).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({"message": "What is 2+2?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["role"], "assistant");
        assert_eq!(body["reply"]["content"], "4");
        assert!(body["failure"].is_null());

        let messages = body["session"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["role"], Role::User.to_string());
        assert_eq!(messages[1]["content"], "What is 2+2?");
    }

    #[tokio::test]
    async fn test_failed_turn_returns_apology_with_kind() {
        let app = app(None);
        let id = new_session(&app).await;
        set_key(&app, &id).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({"message": "What is 2+2?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["content"], APOLOGY);
        assert_eq!(body["failure"], "unavailable");
        assert!(!body.to_string().contains("connection refused"));
        assert_eq!(body["session"]["messages"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let app = app(Some("4"));
        let id = new_session(&app).await;
        set_key(&app, &id).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({"message": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_MESSAGE");
    }

    #[tokio::test]
    async fn test_three_turns_then_reset() {
        let app = app(Some("ok"));
        let id = new_session(&app).await;
        set_key(&app, &id).await;

        for n in 1..=3 {
            call(
                &app,
                "POST",
                &format!("/api/sessions/{id}/chat"),
                Some(json!({"message": format!("question {n}")})),
            )
            .await;
        }
        let (_, view) = call(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(view["messages"].as_array().unwrap().len(), 7);

        let (status, view) = call(&app, "POST", &format!("/api/sessions/{id}/reset"), None).await;
        assert_eq!(status, StatusCode::OK);
        let messages = view["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["content"], GREETING);
    }

    #[tokio::test]
    async fn test_result_count_clamped() {
        let app = app(None);
        let id = new_session(&app).await;

        let (_, view) = call(
            &app,
            "PUT",
            &format!("/api/sessions/{id}/settings"),
            Some(json!({"result_count": 9})),
        )
        .await;
        assert_eq!(view["result_count"], 5);

        let (_, view) = call(
            &app,
            "PUT",
            &format!("/api/sessions/{id}/settings"),
            Some(json!({"result_count": 0})),
        )
        .await;
        assert_eq!(view["result_count"], 1);
    }

    #[tokio::test]
    async fn test_feedback_acknowledged() {
        let app = app(None);
        let id = new_session(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/sessions/{id}/feedback"),
            Some(json!({"feedback": "no"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Thank you for your feedback: No");
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_sessions() {
        let app = app(None);
        let (status, body) = call(&app, "GET", "/api/sessions/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "SESSION_NOT_FOUND");

        let id = new_session(&app).await;
        let (status, _) = call(&app, "DELETE", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "DELETE", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ------------------------------------------------------------------------
    // WebSocket stream
    // ------------------------------------------------------------------------

    type WsClient = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn serve(app: &Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = app.clone();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    async fn connect(addr: std::net::SocketAddr, id: &str) -> WsClient {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/sessions/{id}/stream"))
            .await
            .unwrap();
        ws
    }

    async fn ask(ws: &mut WsClient, message: &str) {
        let frame = json!({"message": message}).to_string();
        ws.send(tokio_tungstenite::tungstenite::Message::Text(frame))
            .await
            .unwrap();
    }

    async fn next_frame(ws: &mut WsClient) -> Value {
        loop {
            let frame = tokio::time::timeout(std::time::Duration::from_secs(5), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let tokio_tungstenite::tungstenite::Message::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_stream_forwards_events_then_completes() {
        let app = app(Some("4"));
        let id = new_session(&app).await;
        set_key(&app, &id).await;
        let addr = serve(&app).await;

        let mut ws = connect(addr, &id).await;
        ask(&mut ws, "What is 2+2?").await;

        let thought = next_frame(&mut ws).await;
        assert_eq!(thought["type"], "thought");
        assert_eq!(thought["text"], "I can answer directly");

        let answer = next_frame(&mut ws).await;
        assert_eq!(answer, json!({"type": "answer", "text": "4"}));

        let complete = next_frame(&mut ws).await;
        assert_eq!(complete["type"], "complete");
        assert_eq!(complete["reply"]["role"], "assistant");
        assert_eq!(complete["reply"]["content"], "4");
        assert!(complete["failure"].is_null());
        assert!(complete["hint"].is_null());

        let (_, view) = call(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(view["messages"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_stream_without_key_sends_error_frame() {
        let app = app(Some("4"));
        let id = new_session(&app).await;
        let addr = serve(&app).await;

        let mut ws = connect(addr, &id).await;
        ask(&mut ws, "What is 2+2?").await;

        let frame = next_frame(&mut ws).await;
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["code"], "MISSING_API_KEY");
        assert_eq!(frame["error"], CREDENTIAL_PROMPT);

        let (_, view) = call(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(view["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_rejects_bad_frame_and_keeps_socket_open() {
        let app = app(Some("4"));
        let id = new_session(&app).await;
        set_key(&app, &id).await;
        let addr = serve(&app).await;

        let mut ws = connect(addr, &id).await;
        ws.send(tokio_tungstenite::tungstenite::Message::Text("not json".into()))
            .await
            .unwrap();
        let frame = next_frame(&mut ws).await;
        assert_eq!(frame["code"], "BAD_REQUEST");

        ask(&mut ws, "What is 2+2?").await;
        next_frame(&mut ws).await;
        next_frame(&mut ws).await;
        assert_eq!(next_frame(&mut ws).await["type"], "complete");
    }

    #[tokio::test]
    async fn test_stream_on_removed_session_reports_not_found() {
        let app = app(Some("4"));
        let id = new_session(&app).await;
        set_key(&app, &id).await;
        let addr = serve(&app).await;

        let mut ws = connect(addr, &id).await;
        let (status, _) = call(&app, "DELETE", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        ask(&mut ws, "What is 2+2?").await;
        let frame = next_frame(&mut ws).await;
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["code"], "SESSION_NOT_FOUND");

        let (status, _) = call(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
