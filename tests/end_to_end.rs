use pdf_qa_svc::backend::BackendClient;
use pdf_qa_svc::client::chat::{ChatDashboard, Controls};
use pdf_qa_svc::client::health::{HEALTH_POLL_INTERVAL, HealthWidget, Indicator};
use pdf_qa_svc::client::{ApiClient, PdfUpload, QaForm};
use pdf_qa_svc::{AppState, create_app};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve the proxy on an ephemeral port in front of `backend`
async fn spawn_proxy(backend: &MockServer) -> String {
    let app = create_app(AppState::new(BackendClient::new(backend.uri())));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn backend_with_answer() -> MockServer {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "$500",
            "context_chunks": ["Total: $500"],
            "processing_time": 1.23,
            "document_hash": "abc123"
        })))
        .expect(1)
        .mount(&backend)
        .await;
    backend
}

fn report_pdf() -> PdfUpload {
    PdfUpload::new("report.pdf", "application/pdf", vec![b'%'; 10 * 1024])
}

#[tokio::test]
async fn test_form_round_trip_through_proxy() {
    let backend = backend_with_answer().await;
    let proxy = spawn_proxy(&backend).await;

    let mut form = QaForm::new(ApiClient::new(&proxy));
    form.select_file(Some(report_pdf()));
    form.set_question("What is the total?");
    assert!(form.submit().await);

    let state = form.state();
    assert!(state.error.is_none(), "unexpected error: {:?}", state.error);
    let view = state.answer_view().unwrap();
    assert_eq!(view.answer, "$500");
    assert_eq!(view.processing_time, "1.23 seconds");
    assert_eq!(view.document_hash, "abc123");
    assert_eq!(view.context_chunks, vec!["Total: $500"]);

    let requests = backend.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains(r#"filename="report.pdf""#));
    assert!(body.contains("What is the total?"));
    assert!(!body.contains("top_k"));
}

#[tokio::test]
async fn test_form_shows_proxy_validation_error() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;
    let proxy = spawn_proxy(&backend).await;

    let mut form = QaForm::new(ApiClient::new(&proxy));
    form.select_file(Some(PdfUpload::new(
        "notes.txt",
        "text/plain",
        b"hello".to_vec(),
    )));
    form.set_question("What is this?");
    assert!(form.submit().await);

    assert_eq!(
        form.state().error_banner().as_deref(),
        Some("Error: Only PDF files are supported")
    );
    assert!(form.state().result.is_none());
}

#[tokio::test]
async fn test_chat_round_trip_through_proxy() {
    let backend = backend_with_answer().await;
    let proxy = spawn_proxy(&backend).await;

    let mut dashboard = ChatDashboard::with_pace(ApiClient::new(&proxy), Duration::from_millis(1));
    dashboard.select_file(report_pdf()).unwrap();
    dashboard.set_input("What is the total?");
    dashboard.ask().await.unwrap();
    dashboard.finish_reveal().await;

    let messages = &dashboard.state().messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].file.as_deref(), Some("report.pdf"));
    assert_eq!(messages[1].content, "$500");
    assert!(messages[1].complete);
    assert_eq!(dashboard.state().controls(), Controls::ResetOnly);
}

#[tokio::test]
async fn test_health_widget_through_proxy() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "timestamp": "2024-05-01T12:00:00Z",
            "services": {"embedding_model": "active", "gemini": "active"}
        })))
        .mount(&backend)
        .await;
    let proxy = spawn_proxy(&backend).await;

    let mut widget = HealthWidget::mount(ApiClient::new(&proxy), HEALTH_POLL_INTERVAL);
    let state = widget.settled().await.unwrap();
    assert_eq!(state.indicator(), Indicator::Green);
    assert_eq!(state.label(), "Backend Healthy");
}

#[tokio::test]
async fn test_health_widget_reports_unreachable_backend() {
    // Bind and release a port so nothing answers on it
    let dead = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let uri = format!("http://{}", dead.local_addr().unwrap());
    drop(dead);

    let app = create_app(AppState::new(BackendClient::new(uri)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut widget = HealthWidget::mount(ApiClient::new(&proxy), HEALTH_POLL_INTERVAL);
    let state = widget.settled().await.unwrap();
    assert_eq!(state.indicator(), Indicator::Red);
    assert_eq!(state.label(), "Backend Error");
}

#[tokio::test]
async fn test_chat_reveals_fallback_when_answer_missing() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "context_chunks": [],
            "processing_time": 0.1,
            "document_hash": "h"
        })))
        .mount(&backend)
        .await;
    let proxy = spawn_proxy(&backend).await;

    let mut dashboard = ChatDashboard::with_pace(ApiClient::new(&proxy), Duration::from_millis(1));
    dashboard.select_file(report_pdf()).unwrap();
    dashboard.set_input("What is the total?");
    dashboard.ask().await.unwrap();
    assert!(dashboard.state().is_typing());
    dashboard.finish_reveal().await;

    let last = dashboard.state().messages.last().unwrap();
    assert_eq!(last.content, "No answer returned.");
    assert!(last.complete);
}
