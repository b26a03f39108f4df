//! Prompt templates for file analysis

use super::client::ChatMessage;

/// Prompt pair for analyzing one file
pub struct FileAnalysisPrompt;

impl FileAnalysisPrompt {
    /// Build the system and user messages for `file_path`.
    ///
    /// `content` must already be truncated to the model budget.
    pub fn messages(file_path: &str, content: &str, language: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(Self::system(language)),
            ChatMessage::user(Self::user(file_path, content)),
        ]
    }

    fn system(language: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(ANALYSIS_SYSTEM_PROMPT);
        prompt.push('\n');
        prompt.push_str(FORMAT_INSTRUCTIONS);
        prompt.push('\n');
        prompt.push_str(&format!(
            "Write the summary in {}. Make it detailed and practical for a developer.\n",
            language
        ));
        prompt
    }

    fn user(file_path: &str, content: &str) -> String {
        format!(
            "File path: {}\n\nFile content:\n```\n{}\n```\n\nAnalyze this file and return the structured result.",
            file_path, content
        )
    }
}

/// Truncate `content` to at most `max_chars` characters
pub fn truncate_content(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &content[..byte_index],
        None => content,
    }
}

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are an experienced code analyst. Analyze the given source file carefully and provide:

1. Summary: describe the main purpose and responsibilities of the file in one paragraph a developer can use as a reference.
2. Docker integration:
   - Detect whether the file uses the Docker API or related technology
   - Identify Docker features such as container management, image operations, network configuration
   - List the Docker tools or packages used
   - Judge how important and complex the Docker integration is
3. File type classification (for example: component, api, utility, config, service)
4. A list of the main functions

Pay particular attention to:
- Docker API calls
- Container operations (create, start, stop, remove)
- Image operations (build, pull, push)
- Docker Compose
- Dockerfiles
- Container orchestration
- Docker networks and volumes
"#;

const FORMAT_INSTRUCTIONS: &str = r#"Respond with a JSON object containing exactly these fields:

```json
{
  "hasDockerIntegration": false,
  "dockerApis": [
    {"apiType": "container", "description": "What the call does", "line": 42, "codeSnippet": "docker.createContainer(...)"}
  ],
  "dockerTools": ["dockerode"],
  "summary": "What the file does",
  "fileType": "service",
  "keyFunctions": ["startContainer"]
}
```

- "line" and "codeSnippet" may be omitted when unknown
- Use empty lists when there is nothing to report

Respond ONLY with the JSON object, no additional text.
"#;
