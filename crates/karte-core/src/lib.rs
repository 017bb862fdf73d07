use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

// --- Request types ---

/// One hypothesis supplied by the caller, with its findings as free text.
/// Each line of `findings` is one observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HypothesisInput {
    #[serde(default)]
    pub hypothesis: String,
    #[serde(default)]
    pub findings: String,
}

impl HypothesisInput {
    pub fn new(hypothesis: impl Into<String>, findings: impl Into<String>) -> Self {
        Self {
            hypothesis: hypothesis.into(),
            findings: findings.into(),
        }
    }

    /// Non-empty finding lines, trimmed, in input order.
    pub fn finding_lines(&self) -> Vec<&str> {
        self.findings
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

// --- Flowchart types ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Problem,
    Finding,
}

/// A node in the generated flowchart. Problems are roots, findings hang off
/// exactly one problem through `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowchartNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowchartResult {
    pub nodes: Vec<FlowchartNode>,
}

/// Body of every failed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResult {
    pub error: String,
}

impl ErrorResult {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// A broken parent link or id collision in a generated flowchart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkIssue {
    DuplicateId(String),
    OrphanFinding(String),
    UnknownParent { id: String, parent_id: String },
    ParentNotProblem { id: String, parent_id: String },
    ProblemWithParent { id: String, parent_id: String },
}

impl fmt::Display for LinkIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkIssue::DuplicateId(id) => write!(f, "duplicate node id '{id}'"),
            LinkIssue::OrphanFinding(id) => write!(f, "finding '{id}' has no parent"),
            LinkIssue::UnknownParent { id, parent_id } => {
                write!(f, "'{id}' points at missing parent '{parent_id}'")
            }
            LinkIssue::ParentNotProblem { id, parent_id } => {
                write!(f, "finding '{id}' has non-problem parent '{parent_id}'")
            }
            LinkIssue::ProblemWithParent { id, parent_id } => {
                write!(f, "problem '{id}' has parent '{parent_id}'")
            }
        }
    }
}

impl FlowchartResult {
    /// Collect every parent-link violation. Order follows the node list.
    pub fn link_issues(&self) -> Vec<LinkIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        let types: HashMap<&str, NodeType> = self
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.node_type))
            .collect();

        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                issues.push(LinkIssue::DuplicateId(node.id.clone()));
            }
            match (node.node_type, &node.parent_id) {
                (NodeType::Problem, None) => {}
                (NodeType::Problem, Some(pid)) => issues.push(LinkIssue::ProblemWithParent {
                    id: node.id.clone(),
                    parent_id: pid.clone(),
                }),
                (NodeType::Finding, None) => {
                    issues.push(LinkIssue::OrphanFinding(node.id.clone()))
                }
                (NodeType::Finding, Some(pid)) => match types.get(pid.as_str()) {
                    Some(NodeType::Problem) => {}
                    Some(NodeType::Finding) => issues.push(LinkIssue::ParentNotProblem {
                        id: node.id.clone(),
                        parent_id: pid.clone(),
                    }),
                    None => issues.push(LinkIssue::UnknownParent {
                        id: node.id.clone(),
                        parent_id: pid.clone(),
                    }),
                },
            }
        }
        issues
    }
}

/// Id the generator is asked to give the problem node of the 1-based hypothesis `index`.
pub fn problem_node_id(index: usize) -> String {
    format!("problem-{}", index)
}

/// Id the generator is asked to give finding `line` (1-based) under hypothesis `index`.
pub fn finding_node_id(index: usize, line: usize) -> String {
    format!("finding-{}-{}", index, line)
}

// --- Generator settings ---

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_ENDPOINT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Full generateContent URL. Derived from `model` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: None,
        }
    }
}

// Keep the key out of logs.
impl fmt::Debug for GeneratorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorSettings")
            .field("has_key", &self.api_key().is_some())
            .field("model", &self.model)
            .field("endpoint", &self.endpoint_url())
            .finish()
    }
}

impl GeneratorSettings {
    /// The credential, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => format!("{}/{}:generateContent", DEFAULT_ENDPOINT_BASE, self.model),
        }
    }

    /// Overlay `GEMINI_API_KEY`, `GEMINI_MODEL` and `GEMINI_ENDPOINT` from `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty("GEMINI_MODEL") {
            self.model = model;
        }
        if let Some(endpoint) = non_empty("GEMINI_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        self
    }

    /// Settings file overlaid with the process environment.
    pub fn load(path: Option<&Path>) -> Self {
        let base = match path {
            Some(p) => read_settings_from(p),
            None => read_settings(),
        };
        base.with_overrides(|name| std::env::var(name).ok())
    }
}

// --- Storage ---

/// Resolve the settings directory (~/.karte/).
pub fn settings_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".karte")
}

pub fn settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

pub fn read_settings() -> GeneratorSettings {
    read_settings_from(&settings_path())
}

/// Read settings from `path`. A missing or unreadable file gives defaults.
pub fn read_settings_from(path: &Path) -> GeneratorSettings {
    if !path.exists() {
        return GeneratorSettings::default();
    }
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}
