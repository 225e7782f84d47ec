//! Output classification.
//!
//! Every invocation's stdout becomes either structured JSON or opaque text.
//! Parse failure is a normal outcome here, never an error.

use crate::types::Outcome;
use serde_json::Value;

/// Command flag asking the CLI to pre-filter its own output.
pub const QUERY_FLAG: &str = "--query";

/// Key used when no name can be derived from the command.
pub const FALLBACK_KEY: &str = "Results";

/// Whether the command narrows its output with a query.
pub fn has_query(command: &[String]) -> bool {
    command
        .iter()
        .any(|t| t == QUERY_FLAG || t.starts_with("--query="))
}

/// Derive the result key for query-narrowed output from the operation name.
///
/// Drops the verb and capitalizes the remaining hyphen-separated words, so
/// `describe-security-groups` becomes `SecurityGroups`.
pub fn derive_key(command: &[String]) -> String {
    let key: String = command
        .get(1)
        .map(|op| op.split('-').skip(1).map(capitalize).collect())
        .unwrap_or_default();

    if key.is_empty() {
        FALLBACK_KEY.to_string()
    } else {
        key
    }
}

/// Uppercase the first character and lowercase the rest.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Classify the raw stdout of one invocation of `command`.
pub fn classify(raw: &str, command: &[String]) -> Outcome {
    if has_query(command) {
        let trimmed = raw.trim();
        let text = if trimmed.is_empty() { "[]" } else { trimmed };
        match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                let key = derive_key(command);
                log::trace!("query output wrapped under {key}");
                let mut wrapped = serde_json::Map::new();
                wrapped.insert(key, flatten_nested(value));
                Outcome::Structured(Value::Object(wrapped))
            }
            Err(_) => Outcome::Opaque(raw.to_string()),
        }
    } else {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Outcome::Structured(value),
            Err(_) => Outcome::Opaque(raw.to_string()),
        }
    }
}

/// Flatten one level when every element of a non-empty array is an array.
fn flatten_nested(value: Value) -> Value {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_array) => {
            Value::Array(
                items
                    .into_iter()
                    .flat_map(|item| match item {
                        Value::Array(inner) => inner,
                        other => vec![other],
                    })
                    .collect(),
            )
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cmd(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_derive_key() {
        assert_eq!(
            derive_key(&cmd(&["ec2", "describe-instances"])),
            "Instances"
        );
        assert_eq!(
            derive_key(&cmd(&["ec2", "describe-security-groups"])),
            "SecurityGroups"
        );
        assert_eq!(
            derive_key(&cmd(&["rds", "describe-db-instances"])),
            "DbInstances"
        );
        assert_eq!(derive_key(&cmd(&["ec2"])), FALLBACK_KEY);
        assert_eq!(derive_key(&cmd(&["ec2", "wait"])), FALLBACK_KEY);
    }

    #[test]
    fn test_query_key_matches_native_key() {
        let command = cmd(&[
            "ec2",
            "describe-security-groups",
            "--query",
            "SecurityGroups[]",
        ]);
        let native = json!({"SecurityGroups": [{"GroupId": "sg-1"}]});
        let native_key = native.as_object().unwrap().keys().next().unwrap().clone();
        assert_eq!(derive_key(&command), native_key);

        let outcome = classify(r#"[{"GroupId": "sg-1"}]"#, &command);
        assert_eq!(outcome, Outcome::Structured(native));
    }

    #[test]
    fn test_query_empty_output_is_empty_list() {
        let command = cmd(&["ec2", "describe-instances", "--query", "x"]);
        for raw in ["", "\n", "  \n\n"] {
            assert_eq!(
                classify(raw, &command),
                Outcome::Structured(json!({"Instances": []}))
            );
        }
    }

    #[test]
    fn test_query_nested_lists_flattened() {
        let command = cmd(&[
            "ec2",
            "describe-instances",
            "--query=Reservations[].Instances[].InstanceId",
        ]);
        let outcome = classify("[[\"i-1\", \"i-2\"], [\"i-3\"]]\n", &command);
        assert_eq!(
            outcome,
            Outcome::Structured(json!({"Instances": ["i-1", "i-2", "i-3"]}))
        );
    }

    #[test]
    fn test_query_scalar_kept() {
        let command = cmd(&["ec2", "describe-vpcs", "--query", "length(Vpcs)"]);
        assert_eq!(
            classify("3\n", &command),
            Outcome::Structured(json!({"Vpcs": 3}))
        );
    }

    #[test]
    fn test_plain_json() {
        let command = cmd(&["ec2", "describe-vpcs"]);
        let outcome = classify(r#"{"Vpcs": []}"#, &command);
        assert_eq!(outcome, Outcome::Structured(json!({"Vpcs": []})));
    }

    #[test]
    fn test_tabular_output_is_opaque() {
        let raw = "2024-01-01 10:00:00 my-bucket\n2024-02-01 11:00:00 other-bucket\n";
        let outcome = classify(raw, &cmd(&["s3", "ls"]));
        assert_eq!(outcome, Outcome::Opaque(raw.to_string()));

        let outcome = classify(raw, &cmd(&["s3", "ls", "--query", "x"]));
        assert!(outcome.is_opaque());
    }

    #[test]
    fn test_no_output_is_opaque_without_query() {
        assert_eq!(
            classify("", &cmd(&["s3", "cp", "a", "b"])),
            Outcome::Opaque(String::new())
        );
    }
}
