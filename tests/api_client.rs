use axum::http::StatusCode;
use axum::routing::{ get, post };
use axum::{ Json, Router };
use serde_json::{ json, Value as JsonValue };
use std::sync::{ Arc, Mutex };
use std::time::Duration;

use casecut_client::api::{ ApiClient, ApiError, FailureKind };
use casecut_client::config::ClientConfig;
use casecut_client::history::{ HistoryStore, MemoryHistoryStore, CHAT_LIST_LIMIT };
use casecut_client::models::api::{ FeedbackRequest, QueryRequest };
use casecut_client::models::chat::{ MessageRole, UserRole };
use casecut_client::session::{ ChatSession, SendOutcome, ERROR_MARKER };

type Captured = Arc<Mutex<Vec<JsonValue>>>;

/// Serve `router` on an ephemeral port and return its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(&ClientConfig::for_backend(base_url).unwrap())
}

fn query_ok() -> JsonValue {
    json!({
        "success": true,
        "data": {
            "summary": "Section 420 IPC punishes cheating.",
            "cases": [
                { "court": "Supreme Court", "ipc_sections": ["420"], "text": "...", "outcome": "dismissed" },
                { "court": "Delhi High Court", "text": "...", "bench": "Division" }
            ],
            "source": "hybrid",
            "ranked": true,
            "total_retrieved": 20,
            "llm_time_ms": 1200
        }
    })
}

fn capturing_query(captured: Captured, reply: JsonValue) -> Router {
    Router::new().route(
        "/query",
        post(move |Json(body): Json<JsonValue>| {
            let captured = Arc::clone(&captured);
            let reply = reply.clone();
            async move {
                captured.lock().unwrap().push(body);
                Json(reply)
            }
        })
    )
}

#[tokio::test]
async fn query_returns_inner_data() {
    let captured: Captured = Arc::default();
    let base = serve(capturing_query(captured.clone(), query_ok())).await;

    let result = client(&base)
        .send_query(&QueryRequest::new("What is Section 420 IPC?", UserRole::Lawyer, "fraud")).await
        .unwrap();
    assert_eq!(result.summary, "Section 420 IPC punishes cheating.");
    assert_eq!(result.cases.len(), 2);
    assert_eq!(result.cases[1].extra.get("bench"), Some(&json!("Division")));
    assert_eq!(result.source, "hybrid");
    assert_eq!(result.total_retrieved, 20);

    let body = captured.lock().unwrap()[0].clone();
    assert_eq!(body, json!({ "query": "What is Section 420 IPC?", "role": "lawyer", "topic": "fraud", "k": 5 }));
}

#[tokio::test]
async fn rejected_envelope_carries_the_nested_message() {
    let reply = json!({ "success": false, "error": { "message": "Query too short", "type": "validation" } });
    let base = serve(capturing_query(Arc::default(), reply)).await;

    let err = client(&base)
        .send_query(&QueryRequest::new("hi", UserRole::Student, "all")).await
        .unwrap_err();
    assert_eq!(err.to_string(), "Query too short");
    assert_eq!(err.status(), 200);
    assert_eq!(err.kind(), FailureKind::Other);
}

#[tokio::test]
async fn http_errors_use_detail_when_present() {
    let router = Router::new().route(
        "/query",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": "Index not loaded" }))) })
    );
    let base = serve(router).await;

    let err = client(&base)
        .send_query(&QueryRequest::new("bail", UserRole::Judge, "bail")).await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Server { status: 500, message: "Index not loaded".into(), hint: None }
    );
    assert_eq!(err.kind(), FailureKind::Server);
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&base)
        .send_query(&QueryRequest::new("bail", UserRole::Lawyer, "bail")).await
        .unwrap_err();
    assert!(err.is_network_error());
    assert_eq!(err.status(), 0);
    assert_eq!(err.to_string(), format!("Cannot reach backend at {}. Is the server running?", base));
}

#[tokio::test]
async fn health_reports_details() {
    let router = Router::new().route(
        "/health",
        get(|| async { Json(json!({ "status": "healthy", "cases_indexed": 5000 })) })
    );
    let base = serve(router).await;

    let health = client(&base).health().await;
    assert!(health.connected);
    assert_eq!(health.details["status"], "healthy");
}

#[tokio::test]
async fn slow_health_reads_as_disconnected() {
    let router = Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "status": "healthy" }))
        })
    );
    let base = serve(router).await;

    let mut config = ClientConfig::for_backend(&base).unwrap();
    config.health_timeout = Duration::from_millis(200);
    let health = ApiClient::new(&config).health().await;
    assert!(!health.connected);
}

#[tokio::test]
async fn summarize_file_sends_the_url() {
    let captured: Captured = Arc::default();
    let sink = Arc::clone(&captured);
    let router = Router::new().route(
        "/summarize",
        post(move |Json(body): Json<JsonValue>| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(body);
                Json(json!({
                    "success": true,
                    "data": { "summary": "Appeal allowed.", "model_id": "casecut-legal", "mode": "summary", "provider": "local" }
                }))
            }
        })
    );
    let base = serve(router).await;

    let result = client(&base)
        .summarize_file("file:///tmp/pdfs/u1/1_order.pdf", "casecut-legal", "summary").await
        .unwrap();
    assert_eq!(result.summary, "Appeal allowed.");
    assert_eq!(result.provider, "local");

    let body = captured.lock().unwrap()[0].clone();
    assert_eq!(body["file_url"], "file:///tmp/pdfs/u1/1_order.pdf");
    assert_eq!(body["mode"], "summary");
    assert!(body.get("text").is_none());
}

#[tokio::test]
async fn summarize_text_sends_the_text() {
    let captured: Captured = Arc::default();
    let sink = Arc::clone(&captured);
    let router = Router::new().route(
        "/summarize",
        post(move |Json(body): Json<JsonValue>| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(body);
                Json(json!({ "success": true, "data": { "summary": "Conviction upheld.", "provider": "huggingface" } }))
            }
        })
    );
    let base = serve(router).await;

    let result = client(&base)
        .summarize_text("The trial court convicted the accused ...", "hf-falconsai", "summary").await
        .unwrap();
    assert_eq!(result.summary, "Conviction upheld.");
    assert_eq!(result.model_id, "");

    let body = captured.lock().unwrap()[0].clone();
    assert_eq!(
        body,
        json!({ "text": "The trial court convicted the accused ...", "model_id": "hf-falconsai", "mode": "summary" })
    );
}

#[tokio::test]
async fn feedback_accepts_a_bare_acknowledgement() {
    let router = Router::new().route("/feedback", post(|| async { Json(json!({ "status": "ok" })) }));
    let base = serve(router).await;

    let request = FeedbackRequest {
        query: "What is Section 420 IPC?".into(),
        rating: 1,
        role: UserRole::Lawyer,
    };
    assert!(client(&base).send_feedback(&request).await.is_ok());
}

#[tokio::test]
async fn session_talks_to_a_live_backend() {
    let base = serve(capturing_query(Arc::default(), query_ok())).await;
    let store = Arc::new(MemoryHistoryStore::new());
    let session = ChatSession::new(store.clone(), Arc::new(client(&base)), Some("u1".into())).await.unwrap();

    let outcome = session.send_message("What is Section 420 IPC?", UserRole::Lawyer, "fraud").await;
    let chat_id = match outcome {
        SendOutcome::Answered { chat_id } => chat_id,
        other => panic!("expected an answer, got {:?}", other),
    };

    let messages = store.list_messages("u1", &chat_id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].model.as_deref(), Some("casecut-legal:hybrid"));
    assert_eq!(messages[1].cases.as_ref().map(Vec::len), Some(2));
}

#[tokio::test]
async fn session_records_a_dead_backend() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let store = Arc::new(MemoryHistoryStore::new());
    let session = ChatSession::new(store.clone(), Arc::new(client(&base)), Some("u1".into())).await.unwrap();
    let outcome = session.send_message("Grounds for bail", UserRole::Lawyer, "bail").await;
    assert!(matches!(outcome, SendOutcome::Failed { kind: FailureKind::Network, .. }));

    let chats = store.list_chats("u1", CHAT_LIST_LIMIT).await.unwrap();
    let messages = store.list_messages("u1", &chats[0].id).await.unwrap();
    assert!(messages[1].text.starts_with(ERROR_MARKER));
    assert!(messages[1].text.contains(&base));
}
