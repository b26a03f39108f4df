//! Decoding model replies into analysis records

use super::AnalysisRecord;

/// Outcome of decoding a model reply
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    /// The reply matched the record schema
    Parsed(AnalysisRecord),
    /// The reply could not be decoded; carries the decoder's complaint
    Unparseable(String),
}

/// Decode a free-text model reply against the record schema.
///
/// Candidates are tried in order: the whole reply, the body of a markdown
/// fence, then the outermost `{ ... }` span. String values may themselves
/// contain fences, so the whole reply always goes first.
pub fn parse_reply(reply: &str) -> ParsedReply {
    let mut first_error = None;

    for candidate in candidates(reply.trim()) {
        match serde_json::from_str::<AnalysisRecord>(candidate) {
            Ok(record) => return ParsedReply::Parsed(record),
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    ParsedReply::Unparseable(
        first_error.unwrap_or_else(|| "reply contains no JSON object".to_string()),
    )
}

fn candidates(reply: &str) -> Vec<&str> {
    let mut found = Vec::new();

    if reply.starts_with('{') {
        found.push(reply);
    }
    if let Some(span) = fenced_body(reply).and_then(object_span) {
        found.push(span);
    }
    if let Some(span) = object_span(reply) {
        found.push(span);
    }

    found.dedup();
    found
}

/// Text between the first opening fence and the last closing fence
fn fenced_body(reply: &str) -> Option<&str> {
    let start = reply.find("```")?;
    let after = &reply[start + 3..];
    // Skip the info string, e.g. ```json
    let after = match after.find('\n') {
        Some(newline) => &after[newline + 1..],
        None => after,
    };
    match after.rfind("```") {
        Some(end) => Some(&after[..end]),
        None => Some(after),
    }
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
