//! Incremental extraction of JSON objects from model output.
//!
//! Model replies often wrap JSON in prose or code fences, and streamed
//! replies arrive in arbitrary chunks. The extractor counts braces outside
//! string literals and yields each top-level object as soon as it closes.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    Inside,
    InString,
    Escape,
}

/// Brace-counting scanner that yields top-level JSON objects.
#[derive(Debug, Clone)]
pub struct JsonObjectExtractor {
    state: ScanState,
    depth: usize,
    buffer: String,
}

impl Default for JsonObjectExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonObjectExtractor {
    /// Creates an extractor positioned outside any object.
    #[must_use]
    pub const fn new() -> Self {
        Self { state: ScanState::Outside, depth: 0, buffer: String::new() }
    }

    /// Returns `true` while an object has been opened but not yet closed.
    #[must_use]
    pub fn in_object(&self) -> bool {
        self.state != ScanState::Outside
    }

    /// Feeds a chunk and returns every object that closed within it.
    ///
    /// A candidate that balances its braces but is not valid JSON is returned
    /// as an `Err`; scanning continues after it.
    pub fn push(&mut self, chunk: &str) -> Vec<Result<Value, serde_json::Error>> {
        let mut completed = Vec::new();

        for ch in chunk.chars() {
            match self.state {
                ScanState::Outside => {
                    if ch == '{' {
                        self.state = ScanState::Inside;
                        self.depth = 1;
                        self.buffer.clear();
                        self.buffer.push(ch);
                    }
                }
                ScanState::Inside => {
                    self.buffer.push(ch);
                    match ch {
                        '{' => self.depth += 1,
                        '}' => {
                            self.depth -= 1;
                            if self.depth == 0 {
                                self.state = ScanState::Outside;
                                completed.push(serde_json::from_str(&self.buffer));
                                self.buffer.clear();
                            }
                        }
                        '"' => self.state = ScanState::InString,
                        _ => {}
                    }
                }
                ScanState::InString => {
                    self.buffer.push(ch);
                    match ch {
                        '\\' => self.state = ScanState::Escape,
                        '"' => self.state = ScanState::Inside,
                        _ => {}
                    }
                }
                ScanState::Escape => {
                    self.buffer.push(ch);
                    self.state = ScanState::InString;
                }
            }
        }

        completed
    }
}

/// Extracts every top-level object from `text`, failing on the first
/// candidate that is not valid JSON.
///
/// # Errors
/// Returns the parse error of the first malformed candidate.
pub fn extract_json_objects(text: &str) -> Result<Vec<Value>, serde_json::Error> {
    JsonObjectExtractor::new().push(text).into_iter().collect()
}

/// Returns every well-formed top-level object in `text`, skipping candidates
/// that fail to parse.
#[must_use]
pub fn find_json_objects(text: &str) -> Vec<Value> {
    JsonObjectExtractor::new().push(text).into_iter().filter_map(Result::ok).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_inside_prose_and_fence() {
        let text = "Here you go:\n```json\n{\"nodes\": [{\"id\": \"start\"}]}\n```\nDone.";
        let objects = extract_json_objects(text).unwrap();
        assert_eq!(objects, vec![json!({"nodes": [{"id": "start"}]})]);
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"{"condition": "if x } then {y}", "n": 1}"#;
        let objects = extract_json_objects(text).unwrap();
        assert_eq!(objects[0]["condition"], "if x } then {y}");
        assert_eq!(objects[0]["n"], 1);
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let text = r#"{"say": "a \"quoted } brace\""}"#;
        let objects = extract_json_objects(text).unwrap();
        assert_eq!(objects[0]["say"], "a \"quoted } brace\"");
    }

    #[test]
    fn test_chunk_boundaries() {
        let mut extractor = JsonObjectExtractor::new();
        let chunks = ["prefix {\"a\"", ": {\"b\": \"}", "\"}", "} tail {\"c\": 2}"];

        let mut objects = Vec::new();
        for chunk in chunks {
            for result in extractor.push(chunk) {
                objects.push(result.unwrap());
            }
        }

        assert_eq!(objects, vec![json!({"a": {"b": "}"}}), json!({"c": 2})]);
        assert!(!extractor.in_object());
    }

    #[test]
    fn test_incomplete_object_pending() {
        let mut extractor = JsonObjectExtractor::new();
        assert!(extractor.push("{\"a\": [1, 2").is_empty());
        assert!(extractor.in_object());
    }

    #[test]
    fn test_malformed_candidate() {
        assert!(extract_json_objects("use {placeholders} then {\"ok\": true}").is_err());
        assert_eq!(find_json_objects("use {placeholders} then {\"ok\": true}"), vec![json!({"ok": true})]);
    }
}
