//! Neo4j over the HTTP transactional Cypher endpoint
//!
//! Each query is one auto-committed `POST {base}/db/{database}/tx/commit`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{RagError, RagResult};
use crate::graph::{ConnectionProvider, GraphConnection, QueryResult};

const HTTP_PORT: u16 = 7474;
const HTTPS_PORT: u16 = 7473;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Translate a Neo4j URI into the base URL of its HTTP endpoint.
///
/// `http`/`https` URIs pass through; driver schemes map to the default HTTP
/// connector of the same host.
pub fn http_base_url(uri: &str) -> RagResult<String> {
    let parsed = Url::parse(uri.trim())
        .map_err(|e| RagError::Config(format!("invalid graph store URI '{}': {}", uri, e)))?;

    let (scheme, default_port) = match parsed.scheme() {
        "http" | "https" => return Ok(parsed.as_str().trim_end_matches('/').to_string()),
        "neo4j" | "bolt" => ("http", HTTP_PORT),
        "neo4j+s" | "neo4j+ssc" | "bolt+s" | "bolt+ssc" => ("https", HTTPS_PORT),
        other => {
            return Err(RagError::Config(format!(
                "unsupported graph store URI scheme '{}'",
                other
            )))
        }
    };

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| RagError::Config(format!("graph store URI '{}' has no host", uri)))?;

    // Secure URIs without an explicit port stay on 443
    let port = match (scheme, parsed.port()) {
        ("https", None) => None,
        _ => Some(default_port),
    };
    Ok(match port {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    })
}

/// `{base}/db/{database}/tx/commit`, with the database name encoded as one path segment
pub fn commit_endpoint(base: &str, database: &str) -> RagResult<String> {
    let mut url = Url::parse(base)
        .map_err(|e| RagError::Config(format!("invalid graph store URL '{}': {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| RagError::Config(format!("graph store URL '{}' cannot take a path", base)))?
        .pop_if_empty()
        .extend(["db", database, "tx", "commit"]);
    Ok(url.into())
}

#[derive(Serialize)]
struct Statement<'a> {
    statement: &'a str,
    #[serde(rename = "resultDataContents")]
    result_data_contents: [&'a str; 1],
}

#[derive(Serialize)]
struct CommitRequest<'a> {
    statements: [Statement<'a>; 1],
}

#[derive(Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    data: Vec<Row>,
}

#[derive(Deserialize)]
struct Row {
    row: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

/// A verified session against one Neo4j database
pub struct Neo4jConnection {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
    closed: AtomicBool,
}

impl Neo4jConnection {
    /// Build the client and check reachability and credentials with `RETURN 1`
    pub async fn connect(config: &ConnectionConfig) -> RagResult<Self> {
        let base = http_base_url(&config.uri)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        let connection = Self {
            client,
            endpoint: commit_endpoint(&base, &config.database)?,
            username: config.username.clone(),
            password: config.password.clone(),
            closed: AtomicBool::new(false),
        };

        connection.post_statement("RETURN 1").await.map_err(|e| match e {
            RagError::Execution(msg) => RagError::Connection(msg),
            other => other,
        })?;

        info!(endpoint = %connection.endpoint, "connected to graph store");
        Ok(connection)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_statement(&self, cypher: &str) -> RagResult<QueryResult> {
        let body = CommitRequest {
            statements: [Statement {
                statement: cypher,
                result_data_contents: ["row"],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header("access-mode", "READ")
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Execution(format!("request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RagError::Connection(format!(
                "graph store rejected credentials for '{}' ({})",
                self.username, status
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Execution(format!("graph store returned {}: {}", status, text)));
        }

        let payload: CommitResponse = response
            .json()
            .await
            .map_err(|e| RagError::Execution(format!("malformed graph store response: {}", e)))?;

        if let Some(err) = payload.errors.into_iter().next() {
            return Err(RagError::Execution(format!("{}: {}", err.code, err.message)));
        }

        let result = payload
            .results
            .into_iter()
            .next()
            .map(|r| QueryResult::from_rows(r.columns, r.data.into_iter().map(|d| d.row).collect()))
            .unwrap_or_default();
        Ok(result)
    }
}

#[async_trait]
impl GraphConnection for Neo4jConnection {
    async fn execute(&self, cypher: &str) -> RagResult<QueryResult> {
        if self.is_closed() {
            return Err(RagError::Connection("connection is closed".to_string()));
        }
        debug!(%cypher, "executing query");
        let result = self.post_statement(cypher).await?;
        debug!(rows = result.len(), "query returned");
        Ok(result)
    }

    async fn close(&self) -> RagResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("connection already closed");
            return Ok(());
        }
        info!(endpoint = %self.endpoint, "closed graph store connection");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Opens [`Neo4jConnection`]s
pub struct Neo4jProvider;

#[async_trait]
impl ConnectionProvider for Neo4jProvider {
    async fn open(&self, config: &ConnectionConfig) -> RagResult<Arc<dyn GraphConnection>> {
        Ok(Arc::new(Neo4jConnection::connect(config).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_base_url() {
        assert_eq!(http_base_url("neo4j://localhost:7687").unwrap(), "http://localhost:7474");
        assert_eq!(http_base_url("bolt://10.0.0.5").unwrap(), "http://10.0.0.5:7474");
        assert_eq!(
            http_base_url("neo4j+s://demo.databases.neo4j.io").unwrap(),
            "https://demo.databases.neo4j.io"
        );
        assert_eq!(
            http_base_url("bolt+ssc://graph.internal:7687").unwrap(),
            "https://graph.internal:7473"
        );
        assert_eq!(http_base_url("http://localhost:7474/").unwrap(), "http://localhost:7474");
        assert_eq!(
            http_base_url("https://graph.example.com:8443").unwrap(),
            "https://graph.example.com:8443"
        );
    }

    #[test]
    fn test_commit_endpoint_encodes_database() {
        assert_eq!(
            commit_endpoint("http://localhost:7474", "movies").unwrap(),
            "http://localhost:7474/db/movies/tx/commit"
        );
        assert_eq!(
            commit_endpoint("https://graph.example.com:8443/neo4j", "movies").unwrap(),
            "https://graph.example.com:8443/neo4j/db/movies/tx/commit"
        );
        assert_eq!(
            commit_endpoint("http://localhost:7474", "../system?x").unwrap(),
            "http://localhost:7474/db/..%2Fsystem%3Fx/tx/commit"
        );
    }

    #[test]
    fn test_http_base_url_rejects_unknown_schemes() {
        assert!(matches!(http_base_url("redis://localhost:6379"), Err(RagError::Config(_))));
        assert!(matches!(http_base_url("not a uri"), Err(RagError::Config(_))));
    }

    #[test]
    fn test_commit_response_parsing() {
        let body = r#"{
            "results": [{"columns": ["title", "released"], "data": [{"row": ["Heat", 1995], "meta": [null, null]}]}],
            "errors": []
        }"#;
        let payload: CommitResponse = serde_json::from_str(body).unwrap();
        assert!(payload.errors.is_empty());
        let r = payload.results.into_iter().next().unwrap();
        let result = QueryResult::from_rows(r.columns, r.data.into_iter().map(|d| d.row).collect());
        assert_eq!(result.records[0]["released"], serde_json::json!(1995));
    }
}
