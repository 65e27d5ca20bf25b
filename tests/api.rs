//! End-to-end tests for the HTTP API.
//!
//! Each test starts the real router on an ephemeral port backed by the
//! in-memory store, with a local axum server standing in for the LLM provider.
//!
//! Run with: cargo test --test api

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::{json, Value};

use healthchat::config::{AppConfig, StoreBackend};
use healthchat::llm::{LlmClient, UPSTREAM_ERROR_REPLY};
use healthchat::routes::chat::{EMPTY_MESSAGE_REPLY, MISSING_STUDENT_REPLY};
use healthchat::store::{
    ChatMessage, ChatRecord, ChatStore, HealthSnapshot, MemoryStore, SharedStore, StoreError,
    StudentProfile,
};
use healthchat::{create_router, AppState};

const BOT_REPLY: &str = "Bạn nên uống đủ nước và ngủ đủ giấc.";

/// Fake provider: answers with a fixed status and records every prompt.
#[derive(Clone)]
struct Provider {
    status: StatusCode,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Provider {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

async fn completions(State(provider): State<Provider>, Json(body): Json<Value>) -> impl IntoResponse {
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
    provider.prompts.lock().unwrap().push(prompt);

    if provider.status.is_success() {
        (
            provider.status,
            Json(json!({
                "choices": [{ "message": { "role": "assistant", "content": BOT_REPLY } }]
            })),
        )
            .into_response()
    } else {
        (provider.status, "upstream exploded").into_response()
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Start a fake provider and the real router over `store`.
async fn spawn_app(
    provider_status: StatusCode,
    personalized: bool,
    store: SharedStore,
) -> (String, Provider) {
    let provider = Provider::new(provider_status);
    let provider_url = serve(
        Router::new()
            .route("/chat/completions", post(completions))
            .with_state(provider.clone()),
    )
    .await;

    let mut config = AppConfig::default();
    config.llm.base_url = provider_url;
    config.llm.api_key = Some("sk-test".to_string());
    config.llm.timeout_seconds = 5;
    config.store.backend = StoreBackend::Memory;
    config.chat.personalized = personalized;

    let llm = LlmClient::new(&config.llm).unwrap();
    let base_url = serve(create_router(AppState::new(config, llm, store))).await;
    (base_url, provider)
}

struct TestApp {
    base_url: String,
    store: Arc<MemoryStore>,
    provider: Provider,
    client: reqwest::Client,
}

impl TestApp {
    async fn start(provider_status: StatusCode, personalized: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        let (base_url, provider) =
            spawn_app(provider_status, personalized, store.clone()).await;

        Self {
            base_url,
            store,
            provider,
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn chat(&self, body: Value) -> (StatusCode, String) {
        let response = self.post("/api/chat", body).await;
        let status = response.status();
        let body: Value = response.json().await.unwrap();
        (status, body["response"].as_str().unwrap().to_string())
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn empty_message_is_rejected_without_calling_provider() {
    let app = TestApp::start(StatusCode::OK, true).await;

    let (status, reply) = app.chat(json!({ "message": "" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, EMPTY_MESSAGE_REPLY);

    let (_, reply) = app.chat(json!({ "studentId": "SV001" })).await;
    assert_eq!(reply, EMPTY_MESSAGE_REPLY);

    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn missing_student_id_is_rejected_without_calling_provider() {
    let app = TestApp::start(StatusCode::OK, true).await;

    let (status, reply) = app.chat(json!({ "message": "Tôi bị đau đầu" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, MISSING_STUDENT_REPLY);

    let (_, reply) = app
        .chat(json!({ "message": "Tôi bị đau đầu", "studentId": "  " }))
        .await;
    assert_eq!(reply, MISSING_STUDENT_REPLY);

    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn provider_failure_returns_apology_and_records_nothing() {
    let app = TestApp::start(StatusCode::INTERNAL_SERVER_ERROR, true).await;

    let (status, reply) = app
        .chat(json!({ "message": "Tôi bị đau đầu", "studentId": "SV001", "studentName": "An" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, UPSTREAM_ERROR_REPLY);
    assert_eq!(app.provider.calls(), 1);
    assert!(app.store.fetch_chat_record("SV001").await.unwrap().is_none());
}

#[tokio::test]
async fn successful_exchange_appends_two_messages() {
    let app = TestApp::start(StatusCode::OK, true).await;
    let request = json!({ "message": "Tôi nên ăn gì?", "studentId": "SV001", "studentName": "An" });

    let (_, reply) = app.chat(request.clone()).await;
    assert_eq!(reply, BOT_REPLY);

    let record = app.store.fetch_chat_record("SV001").await.unwrap().unwrap();
    assert_eq!(record.messages.len(), 2);
    assert_eq!(record.student_name, "An");
    assert_eq!(record.messages[0].content, "Tôi nên ăn gì?");
    assert_eq!(record.last_message_content, BOT_REPLY);

    app.chat(request).await;
    let record = app.store.fetch_chat_record("SV001").await.unwrap().unwrap();
    assert_eq!(record.messages.len(), 4);
    assert_eq!(record.last_message_content, BOT_REPLY);

    // The second prompt carries the first exchange as history.
    let prompt = app.provider.last_prompt();
    assert!(prompt.contains("Sinh viên: Tôi nên ăn gì?"));
    assert!(prompt.contains(&format!("Trợ lý: {}", BOT_REPLY)));
}

#[tokio::test]
async fn prompt_includes_profile_and_measurements() {
    let app = TestApp::start(StatusCode::OK, true).await;
    app.store
        .insert_profile(
            "SV002",
            StudentProfile {
                name: Some("Trần Thị Bình".to_string()),
                gender: Some("Nữ".to_string()),
                major: Some("Dược".to_string()),
                cohort: Some("K47".to_string()),
                ..Default::default()
            },
        )
        .await;
    app.store
        .record_snapshot(
            "SV002",
            HealthSnapshot {
                follow_date: Some("2024-05-10".to_string()),
                height: Some(158.0),
                weight: Some(45.0),
                heart_rate: Some(80.0),
                ..Default::default()
            },
        )
        .await;

    app.chat(json!({ "message": "Tôi có gầy không?", "studentId": "SV002" }))
        .await;

    let prompt = app.provider.last_prompt();
    assert!(prompt.contains("- Họ tên: Trần Thị Bình"));
    assert!(prompt.contains("- Ngành học: Dược"));
    assert!(prompt.contains("Ngày đo 2024-05-10"));
    assert!(prompt.contains("BMI 18.03 (Gầy)"));
    assert!(prompt.contains("CÂU HỎI HIỆN TẠI: Tôi có gầy không?"));
}

#[tokio::test]
async fn basic_mode_forwards_message_verbatim() {
    let app = TestApp::start(StatusCode::OK, false).await;

    let (_, reply) = app.chat(json!({ "message": "cân nặng 70" })).await;
    assert_eq!(reply, BOT_REPLY);
    assert_eq!(app.provider.last_prompt(), "cân nặng 70");
    assert!(app.store.fetch_chat_record("SV001").await.unwrap().is_none());
}

#[tokio::test]
async fn health_reports_store_connection() {
    let app = TestApp::start(StatusCode::OK, true).await;

    let response = app.get("/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "healthy", "mongodb": "connected" }));

    let liveness = app.get("/health").await;
    assert_eq!(liveness.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn assess_runs_rule_table() {
    let app = TestApp::start(StatusCode::OK, true).await;

    let body: Value = app
        .post("/api/assess", json!({ "message": "cân nặng 30" }))
        .await
        .json()
        .await
        .unwrap();
    let report = body["response"].as_str().unwrap();
    assert!(report.contains("Weight: Cần điều chỉnh"));
    assert!(report.contains("Duy trì chế độ ăn cân bằng"));
    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn history_endpoint() {
    let app = TestApp::start(StatusCode::OK, true).await;

    let missing = app.get("/api/chat/history/SV404").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    app.chat(json!({ "message": "xin chào", "studentId": "SV003", "studentName": "Cường" }))
        .await;

    let found = app.get("/api/chat/history/SV003").await;
    assert_eq!(found.status(), StatusCode::OK);
    let record: Value = found.json().await.unwrap();
    assert_eq!(record["studentId"], "SV003");
    assert_eq!(record["messages"].as_array().unwrap().len(), 2);
    assert_eq!(record["messages"][0]["sender"], "user");
    assert_eq!(record["lastMessageSender"], "bot");
}

#[tokio::test]
async fn responses_carry_request_id_and_no_store() {
    let app = TestApp::start(StatusCode::OK, true).await;

    let response = app.post("/api/chat", json!({ "message": "" })).await;
    assert_eq!(response.headers()["cache-control"], "no-store");
    let request_id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
}

#[tokio::test]
async fn null_and_non_text_fields_still_get_a_reply() {
    let app = TestApp::start(StatusCode::OK, true).await;

    let (status, reply) = app.chat(json!({ "message": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, EMPTY_MESSAGE_REPLY);

    let (status, reply) = app
        .chat(json!({ "message": "xin chào", "studentId": null }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, MISSING_STUDENT_REPLY);

    let (status, reply) = app
        .chat(json!({ "message": "xin chào", "studentId": 12345 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, BOT_REPLY);
    assert!(app.store.fetch_chat_record("12345").await.unwrap().is_some());

    let response = app.post("/api/assess", json!({ "message": null })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["response"], EMPTY_MESSAGE_REPLY);
}

/// Store whose every call fails, as when MongoDB is down.
struct DownStore;

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".into())
}

#[async_trait]
impl ChatStore for DownStore {
    fn backend(&self) -> &'static str {
        "down"
    }

    async fn fetch_recent_messages(&self, _: &str, _: usize) -> Result<Vec<ChatMessage>, StoreError> {
        Err(down())
    }

    async fn fetch_profile(&self, _: &str) -> Result<Option<StudentProfile>, StoreError> {
        Err(down())
    }

    async fn fetch_recent_snapshots(&self, _: &str, _: usize) -> Result<Vec<HealthSnapshot>, StoreError> {
        Err(down())
    }

    async fn append_exchange(
        &self,
        _: &str,
        _: &str,
        _: ChatMessage,
        _: ChatMessage,
    ) -> Result<(), StoreError> {
        Err(down())
    }

    async fn fetch_chat_record(&self, _: &str) -> Result<Option<ChatRecord>, StoreError> {
        Err(down())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(down())
    }
}

#[tokio::test]
async fn store_outage_degrades_without_failing_requests() {
    let (base_url, provider) = spawn_app(StatusCode::OK, true, Arc::new(DownStore)).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/chat", base_url))
        .json(&json!({ "message": "Tôi bị đau đầu", "studentId": "SV001", "studentName": "An" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["response"], BOT_REPLY);

    // The prompt is still built, just without stored context.
    let prompt = provider.last_prompt();
    assert!(prompt.contains("- Họ tên: An"));
    assert!(prompt.contains("CÂU HỎI HIỆN TẠI: Tôi bị đau đầu"));

    let health: Value = client
        .get(format!("{}/api/health", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({ "status": "healthy", "mongodb": "disconnected" }));

    let history = client
        .get(format!("{}/api/chat/history/SV001", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(history.status(), StatusCode::SERVICE_UNAVAILABLE);
}
