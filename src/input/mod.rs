//! Dependency-graph export loading
//!
//! The export is a JSON array of Cytoscape-style elements. Nodes carry an
//! `id` naming a repository file; edges carry `source`/`target` and are
//! ignored.

use serde::Deserialize;
use serde_json::Map;
use std::path::Path;
use thiserror::Error;

/// Default location of the graph export
pub const DEFAULT_ELEMENTS_PATH: &str = "./cytoscape-elements.json";

/// Errors reading the graph export
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid graph export: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single graph element as exported
#[derive(Debug, Clone, Deserialize)]
pub struct GraphElement {
    /// Element attributes; absent on malformed entries
    #[serde(default)]
    pub data: Option<Map<String, serde_json::Value>>,
}

impl GraphElement {
    /// The file path this element names, if it is a node
    pub fn file_path(&self) -> Option<&str> {
        let data = self.data.as_ref()?;
        if data.contains_key("source") || data.contains_key("target") {
            return None;
        }
        data.get("id").and_then(|id| id.as_str())
    }
}

/// Load the ordered list of candidate file paths from a graph export
pub fn load_file_paths(path: &Path) -> Result<Vec<String>, InputError> {
    let content = std::fs::read_to_string(path)?;
    let paths = parse_file_paths(&content)?;
    tracing::info!("Found {} files in {:?}", paths.len(), path);
    Ok(paths)
}

/// Extract node ids from a graph export, preserving order
pub fn parse_file_paths(content: &str) -> Result<Vec<String>, InputError> {
    let elements: Vec<GraphElement> = serde_json::from_str(content)?;
    Ok(elements
        .iter()
        .filter_map(GraphElement::file_path)
        .map(str::to_string)
        .collect())
}
