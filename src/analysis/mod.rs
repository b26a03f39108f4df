//! Per-file analysis records
//!
//! An [`AnalysisRecord`] is what the model returns for one file. The JSON
//! field names are camelCase because existing consumers of the cache files
//! read them that way.

mod parse;

pub use parse::{parse_reply, ParsedReply};

use serde::{Deserialize, Deserializer, Serialize};

/// A Docker API usage found in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerApiUsage {
    /// Kind of API, e.g. "container", "image", "compose"
    #[serde(default)]
    pub api_type: String,
    /// What the code does with it
    #[serde(default)]
    pub description: String,
    /// Line number, when the model could tell
    #[serde(
        default,
        deserialize_with = "lenient_line",
        skip_serializing_if = "Option::is_none"
    )]
    pub line: Option<u32>,
    /// Short excerpt of the call site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

/// Accept a line as a number or a numeric string; anything else (ranges,
/// prose, negative numbers) becomes `None` instead of rejecting the record
fn lenient_line<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Full analysis of one file, stored in the combined-analysis table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// Whether the file integrates with Docker
    pub has_docker_integration: bool,
    /// Docker API usages
    #[serde(default)]
    pub docker_apis: Vec<DockerApiUsage>,
    /// Docker tools or libraries named in the file
    #[serde(default)]
    pub docker_tools: Vec<String>,
    /// Free-text summary
    pub summary: String,
    /// Classification such as component, api, utility, config, service
    pub file_type: String,
    /// Main functions of the file
    #[serde(default)]
    pub key_functions: Vec<String>,
}

/// File type recorded when the model reply could not be understood
pub const UNKNOWN_FILE_TYPE: &str = "unknown";

impl AnalysisRecord {
    /// Placeholder for a file whose content was read but whose analysis
    /// could not be parsed
    pub fn degraded(file_path: &str) -> Self {
        Self {
            has_docker_integration: false,
            docker_apis: Vec::new(),
            docker_tools: Vec::new(),
            summary: format!(
                "Could not fully analyze {}, but its content was read successfully.",
                file_path
            ),
            file_type: UNKNOWN_FILE_TYPE.to_string(),
            key_functions: Vec::new(),
        }
    }

    /// The Docker-only view kept in the container-analysis table
    pub fn docker_view(&self) -> DockerAnalysis {
        DockerAnalysis {
            has_docker_integration: self.has_docker_integration,
            docker_apis: self.docker_apis.clone(),
            docker_tools: self.docker_tools.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Subset of a record stored in the container-analysis table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerAnalysis {
    pub has_docker_integration: bool,
    #[serde(default)]
    pub docker_apis: Vec<DockerApiUsage>,
    #[serde(default)]
    pub docker_tools: Vec<String>,
    pub summary: String,
}
