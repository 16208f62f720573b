//! Finding Normalization
//!
//! Two implementations of the analysis engine may render the same finding
//! differently in ways that carry no meaning for correctness:
//!
//! - `extra.message` is rendered text and its formatting varies
//! - `extra.lines` holds the matched source lines, whitespace handling varies
//! - `extra.metavars` bindings carry per-run unique identifiers, and
//!   deduplication of bindings depends on match order
//!
//! [`NormalizedFinding`] blanks these fields and keys equality, hashing and
//! ordering on a canonical serialization of what remains. The raw record is
//! kept alongside for display.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Options controlling which fields are masked before comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Keep metavariable bindings in the comparison (only their unique ids
    /// are blanked). Off by default: with it off, a change that only affects
    /// bindings is invisible to the diff.
    pub compare_bindings: bool,
}

/// A finding with its non-semantic fields masked
///
/// Equality, hashing and ordering use only the canonical form. Ordering is
/// descending by canonical text, which is the order diffs are printed in.
#[derive(Debug, Clone)]
pub struct NormalizedFinding {
    canonical: String,
    original: Value,
}

impl NormalizedFinding {
    /// Normalize a raw finding record; the input is not modified
    pub fn new(raw: &Value, options: NormalizeOptions) -> Self {
        let masked = mask_finding(raw, options);
        Self {
            canonical: canonical_json(&masked),
            original: raw.clone(),
        }
    }

    /// Canonical serialization used for comparison
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The record as the tool emitted it
    pub fn original(&self) -> &Value {
        &self.original
    }

    /// Rule identifier (`check_id`, falling back to `rule_id`)
    pub fn rule_id(&self) -> Option<&str> {
        self.original
            .get("check_id")
            .or_else(|| self.original.get("rule_id"))
            .and_then(Value::as_str)
    }

    /// Path of the file the finding is in
    pub fn path(&self) -> Option<&str> {
        self.original.get("path").and_then(Value::as_str)
    }

    /// Start line, when the record carries a `start.line` location
    pub fn line(&self) -> Option<u64> {
        self.original
            .get("start")
            .and_then(|s| s.get("line"))
            .and_then(Value::as_u64)
    }

    /// The original record rendered with sorted keys, for human triage
    pub fn display_json(&self) -> String {
        serde_json::to_string_pretty(&sort_keys(&self.original))
            .unwrap_or_else(|_| self.original.to_string())
    }
}

impl PartialEq for NormalizedFinding {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for NormalizedFinding {}

impl Hash for NormalizedFinding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl Ord for NormalizedFinding {
    fn cmp(&self, other: &Self) -> Ordering {
        other.canonical.cmp(&self.canonical)
    }
}

impl PartialOrd for NormalizedFinding {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Return a copy of `raw` with the divergence-prone fields blanked
pub fn mask_finding(raw: &Value, options: NormalizeOptions) -> Value {
    let mut masked = raw.clone();
    let Some(extra) = masked.get_mut("extra").and_then(Value::as_object_mut) else {
        return masked;
    };

    if extra.contains_key("message") {
        extra.insert("message".to_string(), Value::String(String::new()));
    }
    if extra.contains_key("lines") {
        extra.insert("lines".to_string(), Value::String(String::new()));
    }
    if let Some(metavars) = extra.get_mut("metavars") {
        if options.compare_bindings {
            if let Some(bindings) = metavars.as_object_mut() {
                for binding in bindings.values_mut() {
                    if let Some(fields) = binding.as_object_mut() {
                        if fields.contains_key("unique_id") {
                            fields.insert("unique_id".to_string(), Value::String(String::new()));
                        }
                    }
                }
            }
        } else {
            *metavars = Value::Object(Map::new());
        }
    }
    masked
}

/// Deterministic compact serialization with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

// Sorts explicitly: serde_json's `preserve_order` feature, if any crate in
// the build enables it, makes `Map` keep insertion order.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// Same reason as `write_canonical`
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut ordered = Map::new();
            for key in keys {
                if let Some(item) = map.get(&key) {
                    ordered.insert(key, sort_keys(item));
                }
            }
            Value::Object(ordered)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finding(message: &str, lines: &str, unique_id: &str) -> Value {
        json!({
            "check_id": "python.lang.eval",
            "path": "app/views.py",
            "start": { "line": 10, "col": 5, "offset": 120 },
            "end": { "line": 10, "col": 20, "offset": 135 },
            "extra": {
                "message": message,
                "lines": lines,
                "severity": "WARNING",
                "metavars": {
                    "$X": {
                        "abstract_content": "user_input",
                        "unique_id": { "type": "id", "value": unique_id }
                    }
                }
            }
        })
    }

    #[test]
    fn masked_fields_do_not_affect_equality() {
        let a = NormalizedFinding::new(
            &finding("eval of $X", "  eval(x)", "1"),
            NormalizeOptions::default(),
        );
        let b = NormalizedFinding::new(
            &finding("Eval of user_input", "eval(x)\n", "2"),
            NormalizeOptions::default(),
        );
        assert_eq!(a, b);
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn location_changes_are_visible() {
        let raw = finding("m", "l", "1");
        let mut moved = raw.clone();
        moved["start"]["line"] = json!(11);
        let a = NormalizedFinding::new(&raw, NormalizeOptions::default());
        let b = NormalizedFinding::new(&moved, NormalizeOptions::default());
        assert_ne!(a, b);
    }

    #[test]
    fn masking_does_not_touch_input() {
        let raw = finding("keep me", "and me", "42");
        let before = raw.clone();
        let normalized = NormalizedFinding::new(&raw, NormalizeOptions::default());
        assert_eq!(raw, before);
        assert_eq!(normalized.original(), &before);
    }

    #[test]
    fn metavars_collapse_to_empty_object() {
        let masked = mask_finding(&finding("m", "l", "1"), NormalizeOptions::default());
        assert_eq!(masked["extra"]["metavars"], json!({}));
        assert_eq!(masked["extra"]["message"], json!(""));
        assert_eq!(masked["extra"]["lines"], json!(""));
        assert_eq!(masked["extra"]["severity"], json!("WARNING"));
    }

    #[test]
    fn compare_bindings_keeps_bindings_but_blanks_ids() {
        let options = NormalizeOptions {
            compare_bindings: true,
        };
        let a = NormalizedFinding::new(&finding("m", "l", "1"), options);
        let b = NormalizedFinding::new(&finding("m", "l", "2"), options);
        assert_eq!(a, b);

        let mut rebound = finding("m", "l", "1");
        rebound["extra"]["metavars"]["$X"]["abstract_content"] = json!("other");
        let c = NormalizedFinding::new(&rebound, options);
        assert_ne!(a, c);
        // Invisible with the default options
        assert_eq!(
            NormalizedFinding::new(&finding("m", "l", "1"), NormalizeOptions::default()),
            NormalizedFinding::new(&rebound, NormalizeOptions::default())
        );
    }

    #[test]
    fn canonical_form_ignores_key_order() {
        let a = json!({ "b": 1, "a": { "y": [1, 2], "x": null } });
        let b = json!({ "a": { "x": null, "y": [1, 2] }, "b": 1 });
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&a), r#"{"a":{"x":null,"y":[1,2]},"b":1}"#);
    }

    #[test]
    fn display_json_sorts_nested_keys() {
        let raw = json!({ "path": "a.py", "check_id": "r", "extra": { "lines": "x", "message": "m" } });
        let shown = NormalizedFinding::new(&raw, NormalizeOptions::default()).display_json();
        let pos = |key: &str| shown.find(&format!("\"{key}\"")).unwrap();
        assert!(pos("check_id") < pos("extra"));
        assert!(pos("extra") < pos("path"));
        assert!(pos("lines") < pos("message"));
    }

    #[test]
    fn canonical_form_escapes_keys() {
        let v = json!({ "quo\"te": "line\nbreak" });
        assert_eq!(canonical_json(&v), r#"{"quo\"te":"line\nbreak"}"#);
    }

    #[test]
    fn ordering_is_descending_by_canonical_text() {
        let a = NormalizedFinding::new(&json!({ "check_id": "a" }), NormalizeOptions::default());
        let b = NormalizedFinding::new(&json!({ "check_id": "b" }), NormalizeOptions::default());
        assert!(b < a);
        let mut sorted = vec![a.clone(), b.clone()];
        sorted.sort();
        assert_eq!(sorted, vec![b, a]);
    }

    #[test]
    fn records_without_extra_are_kept_verbatim() {
        let raw = json!({ "check_id": "r", "path": "p" });
        assert_eq!(mask_finding(&raw, NormalizeOptions::default()), raw);
    }

    #[test]
    fn accessors_read_original_record() {
        let n = NormalizedFinding::new(&finding("m", "l", "1"), NormalizeOptions::default());
        assert_eq!(n.rule_id(), Some("python.lang.eval"));
        assert_eq!(n.path(), Some("app/views.py"));
        assert_eq!(n.line(), Some(10));
        assert!(n.display_json().contains("\"message\": \"m\""));
    }
}
