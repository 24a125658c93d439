//! HTTP language-model client against in-process provider fakes

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use text2cypher_rag::config::{GEMINI_API_KEY, LLM_BASE_URL, OPENAI_API_KEY, OPENAI_BASE_URL};
use text2cypher_rag::llm::client::HttpLanguageModel;
use text2cypher_rag::{
    HttpModelProvider, LLMProvider, LanguageModel, LlmConfig, LlmError, ModelProvider, ModelRole, Prompt,
};

type Requests = Arc<Mutex<Vec<Value>>>;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn openai_chat(
    State(requests): State<Requests>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    requests.lock().unwrap().push(body.clone());
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
    if auth != Some("Bearer sk-test") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad key" })));
    }
    if body["messages"][1]["content"] == "explode" {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" })));
    }
    let reply = json!({
        "choices": [{ "message": { "role": "assistant", "content": "MATCH (m:Movie) RETURN m.title" } }]
    });
    (StatusCode::OK, Json(reply))
}

async fn spawn_openai() -> (String, Requests) {
    let requests = Requests::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(openai_chat))
        .with_state(Arc::clone(&requests));
    (format!("{}/v1", spawn(app).await), requests)
}

fn openai_config(base_url: &str, key: &str) -> LlmConfig {
    let mut env = HashMap::new();
    env.insert(OPENAI_API_KEY.to_string(), key.to_string());
    env.insert(OPENAI_BASE_URL.to_string(), format!("{}/", base_url));
    LlmConfig::for_provider(LLMProvider::OpenAI, &env).unwrap()
}

#[tokio::test]
async fn test_openai_synthesis_request_is_deterministic() {
    let (base_url, requests) = spawn_openai().await;
    let config = openai_config(&base_url, "sk-test");
    let model = HttpModelProvider.build(ModelRole::Synthesis, &config).unwrap();

    let reply = model
        .invoke(&Prompt::new("You write Cypher.", "Who directed Heat?"))
        .await
        .unwrap();
    assert_eq!(reply, "MATCH (m:Movie) RETURN m.title");

    let requests = requests.lock().unwrap();
    let body = &requests[0];
    assert_eq!(body["model"], config.model.as_str());
    assert_eq!(body["temperature"], json!(0.0));
    assert_eq!(body["messages"][0], json!({ "role": "system", "content": "You write Cypher." }));
    assert_eq!(body["messages"][1], json!({ "role": "user", "content": "Who directed Heat?" }));
}

#[tokio::test]
async fn test_openai_answer_request_keeps_provider_temperature() {
    let (base_url, requests) = spawn_openai().await;
    let config = openai_config(&base_url, "sk-test");
    let model = HttpModelProvider.build(ModelRole::Answer, &config).unwrap();

    model.invoke(&Prompt::new("sys", "summarize")).await.unwrap();
    assert!(requests.lock().unwrap()[0].get("temperature").is_none());
}

#[tokio::test]
async fn test_openai_error_status_is_api_error() {
    let (base_url, _) = spawn_openai().await;

    let model = HttpLanguageModel::new(&openai_config(&base_url, "sk-test"), Some(0.0)).unwrap();
    let err = model.invoke(&Prompt::new("sys", "explode")).await.unwrap_err();
    assert!(matches!(err, LlmError::ApiError(ref msg) if msg.contains("500")), "{}", err);

    let model = HttpLanguageModel::new(&openai_config(&base_url, "sk-wrong"), Some(0.0)).unwrap();
    let err = model.invoke(&Prompt::new("sys", "hi")).await.unwrap_err();
    assert!(matches!(err, LlmError::ApiError(_)), "{}", err);
}

async fn ollama_generate(State(requests): State<Requests>, Json(body): Json<Value>) -> Json<Value> {
    requests.lock().unwrap().push(body);
    Json(json!({ "model": "llama3", "response": "Heat was directed by Michael Mann.", "done": true }))
}

#[tokio::test]
async fn test_ollama_generate() {
    let requests = Requests::default();
    let app = Router::new()
        .route("/api/generate", post(ollama_generate))
        .with_state(Arc::clone(&requests));
    let base_url = spawn(app).await;

    let mut env = HashMap::new();
    env.insert(LLM_BASE_URL.to_string(), base_url);
    let config = LlmConfig::for_provider(LLMProvider::Ollama, &env).unwrap();
    let model = HttpLanguageModel::new(&config, Some(0.0)).unwrap();

    let reply = model.invoke(&Prompt::new("Answer briefly.", "Who directed Heat?")).await.unwrap();
    assert_eq!(reply, "Heat was directed by Michael Mann.");

    let requests = requests.lock().unwrap();
    assert_eq!(requests[0]["system"], "Answer briefly.");
    assert_eq!(requests[0]["prompt"], "Who directed Heat?");
    assert_eq!(requests[0]["stream"], false);
    assert_eq!(requests[0]["options"]["temperature"], json!(0.0));
}

async fn gemini_generate(
    State(requests): State<Requests>,
    Path(call): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok());
    requests.lock().unwrap().push(json!({
        "call": call,
        "key": key,
        "query_key": params.get("key"),
        "body": body,
    }));
    let reply = json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": "Heat " }, { "text": "(1995)" }] }
        }]
    });
    (StatusCode::OK, Json(reply))
}

#[tokio::test]
async fn test_gemini_generate_joins_parts() {
    let requests = Requests::default();
    let app = Router::new()
        .route("/models/:call", post(gemini_generate))
        .with_state(Arc::clone(&requests));
    let base_url = spawn(app).await;

    let mut env = HashMap::new();
    env.insert(GEMINI_API_KEY.to_string(), "gm-test".to_string());
    env.insert(LLM_BASE_URL.to_string(), base_url);
    let config = LlmConfig::for_provider(LLMProvider::Gemini, &env).unwrap();
    let model = HttpLanguageModel::new(&config, Some(0.0)).unwrap();

    let reply = model.invoke(&Prompt::new("sys", "Which movie?")).await.unwrap();
    assert_eq!(reply, "Heat (1995)");

    let requests = requests.lock().unwrap();
    let seen = &requests[0];
    assert_eq!(seen["call"], format!("{}:generateContent", config.model));
    assert_eq!(seen["key"], "gm-test");
    assert!(seen["query_key"].is_null());
    assert_eq!(seen["body"]["systemInstruction"]["parts"][0]["text"], "sys");
    assert_eq!(seen["body"]["contents"][0]["role"], "user");
    assert_eq!(seen["body"]["generationConfig"]["temperature"], json!(0.0));
}
