//! Schema & exemplar registry
//!
//! Static description of the movie graph handed to the query synthesizer,
//! plus the worked exemplars that steer Cypher generation.

use crate::error::{RagError, RagResult};
use serde::Serialize;
use std::fmt;

/// A node label or relationship type with its property signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementType {
    pub name: String,
    /// (property, type) pairs in declaration order
    pub properties: Vec<(String, String)>,
}

impl ElementType {
    pub fn new(name: &str, properties: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            properties: properties
                .iter()
                .map(|(k, t)| (k.to_string(), t.to_string()))
                .collect(),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props: Vec<String> = self
            .properties
            .iter()
            .map(|(k, t)| format!("{}: {}", k, t))
            .collect();
        write!(f, "{} {{{}}}", self.name, props.join(", "))
    }
}

/// An allowed `(source)-[relationship]->(target)` edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgePattern {
    pub source: String,
    pub relationship: String,
    pub target: String,
}

impl fmt::Display for EdgePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(:{})-[:{}]->(:{})", self.source, self.relationship, self.target)
    }
}

/// Node types, relationship types and allowed edges of the target graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDescription {
    pub nodes: Vec<ElementType>,
    pub relationships: Vec<ElementType>,
    pub edges: Vec<EdgePattern>,
}

impl SchemaDescription {
    /// The movie recommendations graph
    pub fn movies() -> Self {
        let edge = |source: &str, relationship: &str, target: &str| EdgePattern {
            source: source.to_string(),
            relationship: relationship.to_string(),
            target: target.to_string(),
        };

        Self {
            nodes: vec![
                ElementType::new("Person", &[("name", "STRING"), ("born", "INTEGER")]),
                ElementType::new(
                    "Movie",
                    &[("tagline", "STRING"), ("title", "STRING"), ("released", "INTEGER")],
                ),
                ElementType::new("Genre", &[("name", "STRING")]),
                ElementType::new("User", &[("name", "STRING")]),
            ],
            relationships: vec![
                ElementType::new("ACTED_IN", &[("role", "STRING")]),
                ElementType::new("RATED", &[("rating", "INTEGER")]),
            ],
            edges: vec![
                edge("Person", "ACTED_IN", "Movie"),
                edge("Person", "DIRECTED", "Movie"),
                edge("User", "RATED", "Movie"),
                edge("Movie", "IN_GENRE", "Genre"),
            ],
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.nodes.iter().any(|n| n.name == label)
            || self
                .edges
                .iter()
                .any(|e| e.source == label || e.target == label)
    }

    /// Relationship types with properties, plus the ones only named by edges
    pub fn has_relationship(&self, rel_type: &str) -> bool {
        self.relationships.iter().any(|r| r.name == rel_type)
            || self.edges.iter().any(|e| e.relationship == rel_type)
    }

    /// Text block given to the language model
    pub fn to_prompt_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Node properties:")?;
        for node in &self.nodes {
            writeln!(f, "{}", node)?;
        }
        writeln!(f)?;
        writeln!(f, "Relationship properties:")?;
        for rel in &self.relationships {
            writeln!(f, "{}", rel)?;
        }
        writeln!(f)?;
        writeln!(f, "The relationships:")?;
        for edge in &self.edges {
            writeln!(f, "{}", edge)?;
        }
        Ok(())
    }
}

const TOP_RATED_INTENT: &str = "Which movies have the highest average user rating?";

const TOP_RATED_QUERY: &str = "MATCH (node:Movie)<-[r:RATED]-(:User)
RETURN
    node.title AS title, node.plot AS plot,
    collect { MATCH (node)-[:IN_GENRE]->(g:Genre) RETURN g.name } AS genres,
    collect { MATCH (node)<-[:ACTED_IN]-(a:Person) RETURN a.name } AS actors,
    avg(r.rating) AS userRating
ORDER BY userRating DESC";

/// A worked translation: what the user asked and the Cypher that answers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exemplar {
    intent: String,
    query: String,
}

impl Exemplar {
    /// Both the intent and the query are required.
    pub fn new(intent: impl Into<String>, query: impl Into<String>) -> RagResult<Self> {
        let intent = intent.into().trim().to_string();
        let query = query.into().trim().to_string();
        if intent.is_empty() {
            return Err(RagError::Config("exemplar intent must not be empty".to_string()));
        }
        if query.is_empty() {
            return Err(RagError::Config("exemplar query must not be empty".to_string()));
        }
        Ok(Self { intent, query })
    }

    pub fn intent(&self) -> &str {
        &self.intent
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Ordered exemplars
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExemplarSet {
    exemplars: Vec<Exemplar>,
}

impl ExemplarSet {
    pub fn new(exemplars: Vec<Exemplar>) -> Self {
        Self { exemplars }
    }

    /// The built-in movie exemplar
    pub fn movies() -> Self {
        Self {
            exemplars: vec![Exemplar {
                intent: TOP_RATED_INTENT.to_string(),
                query: TOP_RATED_QUERY.to_string(),
            }],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exemplar> {
        self.exemplars.iter()
    }

    pub fn len(&self) -> usize {
        self.exemplars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exemplars.is_empty()
    }

    /// Exemplars rendered as question/Cypher pairs for a prompt
    pub fn to_prompt_text(&self) -> String {
        self.exemplars
            .iter()
            .map(|e| format!("Question: {}\nCypher:\n{}", e.intent, e.query))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
