//! Option normalization for Ollama request bodies.
//!
//! Ollama keeps a handful of keys at the body root and expects every model
//! tuning parameter (temperature, num_ctx, ...) grouped under `options`.

use serde_json::{Map, Value};

/// Flat, per-request option bag.
pub type Options = Map<String, Value>;

/// Option key the structured-output layer writes its schema request under.
pub const RESPONSE_FORMAT: &str = "response_format";

/// Key of the nested tuning-parameter map.
pub const NESTED_OPTIONS: &str = "options";

/// Keys that stay at the root of an `/api/chat` body.
pub const CHAT_TOP_LEVEL_KEYS: &[&str] = &[
    "stream",
    "format",
    "keep_alive",
    "tools",
    "think",
    "logprobs",
    "top_logprobs",
];

/// Keys that stay at the root of an `/api/embed` body.
pub const EMBED_TOP_LEVEL_KEYS: &[&str] = &["truncate", "keep_alive", "dimensions"];

/// Split `options` into root keys and a nested `options` map.
///
/// Values already present in an explicit nested `options` map win over flat
/// keys of the same name. The nested map is left out when empty.
pub fn normalize(options: &Options, top_level_keys: &[&str]) -> Options {
    let mut nested = match options.get(NESTED_OPTIONS) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    let mut normalized = Map::new();

    for (key, value) in options {
        if key == NESTED_OPTIONS {
            continue;
        }
        if top_level_keys.contains(&key.as_str()) {
            normalized.insert(key.clone(), value.clone());
        } else if !nested.contains_key(key) {
            nested.insert(key.clone(), value.clone());
        }
    }

    if !nested.is_empty() {
        normalized.insert(NESTED_OPTIONS.into(), Value::Object(nested));
    }

    normalized
}

/// Move `response_format.json_schema.schema` to a root `format` key.
///
/// A `response_format` without a schema body (missing or `null`) is left untouched.
pub(crate) fn lift_response_format(options: &mut Options) {
    let schema = options
        .get(RESPONSE_FORMAT)
        .and_then(|format| format.get("json_schema"))
        .and_then(|json_schema| json_schema.get("schema"))
        .filter(|schema| !schema.is_null())
        .cloned();

    if let Some(schema) = schema {
        options.insert("format".into(), schema);
        options.remove(RESPONSE_FORMAT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn allow_listed_keys_stay_at_root() {
        let out = normalize(&opts(json!({ "stream": true, "think": false })), CHAT_TOP_LEVEL_KEYS);
        assert_eq!(Value::Object(out), json!({ "stream": true, "think": false }));
    }

    #[test]
    fn other_keys_are_nested() {
        let out = normalize(
            &opts(json!({ "keep_alive": "5m", "temperature": 0.2, "num_ctx": 4096 })),
            CHAT_TOP_LEVEL_KEYS,
        );
        assert_eq!(
            Value::Object(out),
            json!({ "keep_alive": "5m", "options": { "temperature": 0.2, "num_ctx": 4096 } })
        );
    }

    #[test]
    fn explicit_nested_value_wins_over_flat_key() {
        let out = normalize(
            &opts(json!({ "options": { "num_ctx": 1024 }, "num_ctx": 2048, "top_k": 40 })),
            CHAT_TOP_LEVEL_KEYS,
        );
        assert_eq!(out["options"], json!({ "num_ctx": 1024, "top_k": 40 }));
        assert!(out.get("num_ctx").is_none());
    }

    #[test]
    fn empty_nested_map_is_omitted() {
        let out = normalize(&opts(json!({ "options": {}, "stream": false })), CHAT_TOP_LEVEL_KEYS);
        assert!(out.get("options").is_none());
        assert_eq!(out["stream"], json!(false));
    }

    #[test]
    fn non_object_nested_options_are_dropped() {
        let out = normalize(&opts(json!({ "options": "bogus", "seed": 7 })), CHAT_TOP_LEVEL_KEYS);
        assert_eq!(Value::Object(out), json!({ "options": { "seed": 7 } }));
    }

    #[test]
    fn chat_keys_are_nested_for_embeddings() {
        let out = normalize(
            &opts(json!({ "stream": true, "truncate": false, "dimensions": 512 })),
            EMBED_TOP_LEVEL_KEYS,
        );
        assert_eq!(
            Value::Object(out),
            json!({ "truncate": false, "dimensions": 512, "options": { "stream": true } })
        );
    }

    #[test]
    fn empty_input_normalizes_to_empty() {
        assert!(normalize(&Options::new(), EMBED_TOP_LEVEL_KEYS).is_empty());
    }

    #[test]
    fn response_format_schema_is_lifted() {
        let schema = json!({ "type": "object", "properties": { "city": { "type": "string" } } });
        let mut options = opts(json!({
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": "city", "strict": true, "schema": schema.clone() }
            }
        }));
        lift_response_format(&mut options);
        assert_eq!(options["format"], schema);
        assert!(options.get(RESPONSE_FORMAT).is_none());
    }

    #[test]
    fn response_format_without_schema_is_kept() {
        let mut options = opts(json!({ "response_format": { "type": "json_object" } }));
        lift_response_format(&mut options);
        assert!(options.get("format").is_none());
        assert!(options.get(RESPONSE_FORMAT).is_some());
    }

    #[test]
    fn response_format_with_null_schema_is_kept() {
        let mut options = opts(json!({
            "response_format": { "type": "json_schema", "json_schema": { "name": "x", "schema": null } }
        }));
        lift_response_format(&mut options);
        assert!(options.get("format").is_none());
        assert_eq!(options[RESPONSE_FORMAT]["json_schema"]["name"], json!("x"));
    }
}
