mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use study_assistant_core::PortError;

const QUIZ_REPLY: &str = r#"```json
{
  "questions": [
    {
      "question": "Which keyword declares an immutable binding?",
      "options": ["let", "mut", "static", "var"],
      "answer": "let",
      "explanation": "Bindings are immutable unless marked mut."
    }
  ]
}
```"#;

#[tokio::test]
async fn root_reports_that_nothing_is_uploaded() {
    let app = test_app().await;

    let resp = app.send(get("/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({ "status": "running", "pdf_uploaded": false })
    );
}

#[tokio::test]
async fn generation_before_upload_is_not_ready() {
    let app = test_app().await;

    let resp = app.send(get("/generate_notes")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["ready"], false);

    let resp = app
        .send(post_json("/generate_mcq", json!({ "difficulty_level": "easy" })))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["ready"], false);

    assert!(!app.fake.calls().iter().any(|c| c.starts_with("chat:")));
}

#[tokio::test]
async fn non_pdf_upload_is_rejected_before_anything_is_written() {
    let app = test_app().await;

    let resp = app.send(upload_request("notes.txt", b"plain text")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(app.stored_files().is_empty());
    assert!(app.fake.calls().is_empty());
}

#[tokio::test]
async fn upload_then_generate_notes() {
    let app = test_app().await;
    app.fake.set_chat_reply("## Chapter 1\n- Ownership");

    let resp = app.send(upload_request("lecture.pdf", b"%PDF-1.7 ...")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "PDF uploaded successfully.");
    assert_eq!(body["file_name"], "lecture.pdf");
    assert_eq!(body["file_id"], "file-1");

    let stored = app.stored_files();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].ends_with(".pdf"));
    assert_ne!(stored[0], "lecture.pdf");

    let resp = app.send(get("/")).await;
    assert_eq!(body_json(resp).await["pdf_uploaded"], true);

    let resp = app.send(get("/generate_notes")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["notes"], "## Chapter 1\n- Ownership");
}

#[tokio::test]
async fn failed_ingest_cleans_up_and_stays_not_ready() {
    let app = test_app().await;
    app.fake
        .fail_next_upload_with(PortError::Unavailable("connection reset".into()));

    let resp = app.send(upload_request("lecture.pdf", b"%PDF-1.7")).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(app.stored_files().is_empty());

    let resp = app.send(get("/generate_notes")).await;
    assert_eq!(body_json(resp).await["ready"], false);
}

#[tokio::test]
async fn generate_mcq_returns_the_parsed_quiz() {
    let app = test_app().await;
    app.send(upload_request("lecture.pdf", b"%PDF-1.7")).await;
    app.fake.set_chat_reply(QUIZ_REPLY);

    let resp = app
        .send(post_json("/generate_mcq", json!({ "difficulty_level": "hard" })))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let questions = body["mcq"]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0]["answer"], "let");
    assert_eq!(questions[0]["options"].as_array().unwrap().len(), 4);

    let prompt = app.fake.last_chat_message().unwrap();
    assert!(prompt.contains("hard"));
}

#[tokio::test]
async fn unparseable_or_empty_quiz_replies_are_server_errors() {
    let app = test_app().await;
    app.send(upload_request("lecture.pdf", b"%PDF-1.7")).await;

    app.fake.set_chat_reply("Sorry, I cannot help with that.");
    let resp = app
        .send(post_json("/generate_mcq", json!({ "difficulty_level": "medium" })))
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(resp).await.starts_with("Response formatting error"));

    app.fake.set_chat_reply("   ");
    let resp = app
        .send(post_json("/generate_mcq", json!({ "difficulty_level": "medium" })))
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unknown_difficulty_is_rejected() {
    let app = test_app().await;

    let resp = app
        .send(post_json("/generate_mcq", json!({ "difficulty_level": "impossible" })))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn admin_endpoints_manage_the_assistant() {
    let app = test_app().await;

    let resp = app.send(get("/create_pinecone_assistant")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(app.fake.has_assistant("pdf-assistant"));

    // Creating again fetches the existing assistant.
    let resp = app.send(get("/create_pinecone_assistant")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.send(get("/assistant_list")).await;
    let list = body_json(resp).await;
    assert_eq!(list[0]["name"], "pdf-assistant");
    assert_eq!(list[0]["status"], "Ready");

    let resp = app.send(get("/delete_pinecone_assistant")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!app.fake.has_assistant("pdf-assistant"));

    let resp = app.send(get("/assistant_list")).await;
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn deleting_the_assistant_forgets_the_document() {
    let app = test_app().await;
    app.send(upload_request("lecture.pdf", b"%PDF-1.7")).await;

    app.send(get("/delete_pinecone_assistant")).await;

    let resp = app.send(get("/generate_notes")).await;
    assert_eq!(body_json(resp).await["ready"], false);
}

#[tokio::test]
async fn study_routes_can_require_a_token() {
    let app = test_app_with(|config| config.require_auth_for_study = true).await;

    let resp = app.send(get("/generate_notes")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let token = register(&app, "student@example.com", "pw", "Student").await;
    let resp = app.send(get_with_token("/generate_notes", &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The status page stays public.
    let resp = app.send(get("/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
