mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use portal_ai::assistants::OpenAiAssistants;
use portal_ai::chat::{ChatSession, HttpRelayClient, RunOutcome};
use portal_ai::server::{router, AppState};
use portal_ai::tools::{Dispatcher, ToolRegistry};
use portal_ai::types::Message;

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/event-stream")
}

async fn spawn_relay(upstream: &MockServer) -> String {
    let assistants = OpenAiAssistants::new("sk-test", upstream.uri(), "asst_portal");
    let app = router(AppState::new(Arc::new(assistants)));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn phenotype_question_round_trips_through_relay_and_tools() {
    let upstream = MockServer::start().await;
    let tools = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "thread_e2e" })))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_e2e/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_user" })))
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_e2e/runs"))
        .respond_with(sse_response(
            [
                run_created("run_e2e"),
                requires_action(
                    "run_e2e",
                    &[("call_1", "search_phenotypes", r#"{"queries":["unknown trait"]}"#)],
                ),
            ]
            .concat(),
        ))
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_e2e/runs/run_e2e/submit_tool_outputs"))
        .and(body_json(json!({
            "tool_outputs": [
                { "tool_call_id": "call_1", "output": "No matching phenotypes found." }
            ],
            "stream": true
        })))
        .respond_with(sse_response(
            [
                message_created(),
                text_delta("I could not find that phenotype."),
                run_completed("run_e2e"),
                done(),
            ]
            .concat(),
        ))
        .expect(1)
        .mount(&upstream)
        .await;

    Mock::given(method("POST"))
        .and(path("/search_phenotypes"))
        .and(body_json(json!({ "queries": ["unknown trait"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [] })))
        .expect(1)
        .mount(&tools)
        .await;

    let relay_url = spawn_relay(&upstream).await;
    let relay = HttpRelayClient::new(relay_url);
    let dispatcher = Dispatcher::new(ToolRegistry::portal(&tools.uri()));
    let mut session = ChatSession::new(Arc::new(relay), Some(dispatcher));

    let outcome = session.send("Which genes drive unknown trait?").await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(session.thread_id(), Some("thread_e2e"));
    assert_eq!(
        session.messages(),
        &[
            Message::user("Which genes drive unknown trait?"),
            Message::assistant("I could not find that phenotype."),
        ]
    );
    assert!(session.input_enabled());
}
