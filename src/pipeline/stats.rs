//! Statistics over the combined-analysis table

use crate::analysis::AnalysisRecord;
use serde::Serialize;
use std::collections::HashMap;

/// Tallies of analyzed files
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Files with a record
    pub total: usize,
    /// Files flagged as integrating with Docker
    pub docker_files: usize,
    /// File type counts, most common first
    pub file_types: Vec<(String, usize)>,
}

impl CacheStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AnalysisRecord>) -> Self {
        let mut total = 0;
        let mut docker_files = 0;
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for record in records {
            total += 1;
            if record.has_docker_integration {
                docker_files += 1;
            }
            *counts.entry(record.file_type.as_str()).or_default() += 1;
        }

        let mut file_types: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(kind, count)| (kind.to_string(), count))
            .collect();
        file_types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            total,
            docker_files,
            file_types,
        }
    }

    /// Percentage of files with Docker integration, if any file was analyzed
    pub fn docker_percentage(&self) -> Option<f64> {
        (self.total > 0).then(|| self.docker_files as f64 / self.total as f64 * 100.0)
    }
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Analysis statistics")?;
        writeln!(f, "===================\n")?;
        writeln!(f, "Total files: {}", self.total)?;
        writeln!(f, "Docker integration: {}", self.docker_files)?;
        if let Some(pct) = self.docker_percentage() {
            writeln!(f, "Docker integration ratio: {:.1}%", pct)?;
        }

        if !self.file_types.is_empty() {
            writeln!(f, "\nFile types:")?;
            for (kind, count) in &self.file_types {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}
