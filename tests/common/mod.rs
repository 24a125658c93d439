#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use text2cypher_rag::config::{NEO4J_PASSWORD, NEO4J_URI, NEO4J_USERNAME, OPENAI_API_KEY};
use text2cypher_rag::{
    AppConfig, ConnectionConfig, ConnectionProvider, GraphConnection, LanguageModel, LlmConfig,
    LlmError, LlmResult, ModelProvider, ModelRole, Prompt, QueryResult, RagError, RagResult,
};

pub const TOP_RATED_QUERY: &str =
    "MATCH (m:Movie)<-[r:RATED]-(:User) RETURN m.title AS title, avg(r.rating) AS userRating ORDER BY userRating DESC LIMIT 3";

pub fn test_env() -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert(NEO4J_URI.to_string(), "neo4j://localhost:7687".to_string());
    env.insert(NEO4J_USERNAME.to_string(), "neo4j".to_string());
    env.insert(NEO4J_PASSWORD.to_string(), "password".to_string());
    env.insert(OPENAI_API_KEY.to_string(), "sk-test".to_string());
    env
}

pub fn test_config() -> AppConfig {
    AppConfig::from_env(&test_env()).unwrap()
}

pub fn rows(columns: &[&str], rows: Vec<Vec<serde_json::Value>>) -> QueryResult {
    QueryResult::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows)
}

/// Counters shared by a fake store and every connection it hands out
#[derive(Default)]
pub struct StoreStats {
    pub opens: AtomicUsize,
    pub live: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub teardowns: AtomicUsize,
    pub executed: Mutex<Vec<String>>,
}

impl StoreStats {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

pub struct FakeConnection {
    stats: Arc<StoreStats>,
    closed: AtomicBool,
    result: QueryResult,
    execute_error: Option<String>,
}

#[async_trait]
impl GraphConnection for FakeConnection {
    async fn execute(&self, cypher: &str) -> RagResult<QueryResult> {
        if self.is_closed() {
            return Err(RagError::Connection("connection is closed".to_string()));
        }
        self.stats.executed.lock().unwrap().push(cypher.to_string());
        match &self.execute_error {
            Some(msg) => Err(RagError::Execution(msg.clone())),
            None => Ok(self.result.clone()),
        }
    }

    async fn close(&self) -> RagResult<()> {
        self.stats.close_calls.fetch_add(1, Ordering::SeqCst);
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.stats.teardowns.fetch_add(1, Ordering::SeqCst);
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-process stand-in for the graph store
#[derive(Default)]
pub struct FakeStore {
    pub stats: Arc<StoreStats>,
    pub result: QueryResult,
    pub fail_open: bool,
    pub execute_error: Option<String>,
}

impl FakeStore {
    pub fn returning(result: QueryResult) -> Self {
        Self {
            result,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ConnectionProvider for FakeStore {
    async fn open(&self, _config: &ConnectionConfig) -> RagResult<Arc<dyn GraphConnection>> {
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(RagError::Connection("authentication failure".to_string()));
        }
        self.stats.live.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeConnection {
            stats: Arc::clone(&self.stats),
            closed: AtomicBool::new(false),
            result: self.result.clone(),
            execute_error: self.execute_error.clone(),
        }))
    }
}

/// Replies with canned responses in order and records every prompt
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Arc<Self> {
        let model = Self::default();
        model.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        Arc::new(model)
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let model = Self::default();
        model.replies.lock().unwrap().push_back(Err(message.to_string()));
        Arc::new(model)
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, prompt: &Prompt) -> LlmResult<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LlmError::ApiError(message)),
            None => Err(LlmError::ApiError("no scripted reply left".to_string())),
        }
    }
}

/// Hands out the scripted synthesis and answer models
pub struct FakeModels {
    pub synthesis: Arc<ScriptedModel>,
    pub answer: Arc<ScriptedModel>,
    pub fail_build: Option<ModelRole>,
}

impl FakeModels {
    pub fn new(synthesis: Arc<ScriptedModel>, answer: Arc<ScriptedModel>) -> Self {
        Self {
            synthesis,
            answer,
            fail_build: None,
        }
    }
}

impl ModelProvider for FakeModels {
    fn build(&self, role: ModelRole, _config: &LlmConfig) -> LlmResult<Arc<dyn LanguageModel>> {
        if self.fail_build == Some(role) {
            return Err(LlmError::ConfigError(format!("cannot build {:?} model", role)));
        }
        let model: Arc<dyn LanguageModel> = match role {
            ModelRole::Synthesis => self.synthesis.clone(),
            ModelRole::Answer => self.answer.clone(),
        };
        Ok(model)
    }
}
