//! Minimal JSON Schema validator for tool inputs.
//!
//! Covers the subset the tool catalog declares: `type`, `properties`,
//! `required`, `additionalProperties: false`, `items`, `enum`,
//! `minimum`/`maximum`, `minLength`/`maxLength`, `minItems`/`maxItems`.
//! Every violation is collected; validation never stops at the first one.

use serde_json::Value;

/// Validate `value` against `schema`, returning every violation found.
pub fn validate(schema: &Value, value: &Value) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    check(schema, value, "$", &mut errors);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn check(schema: &Value, value: &Value, path: &str, errors: &mut Vec<String>) {
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(expected, value) {
            errors.push(format!("{path}: expected {expected}, got {}", type_name(value)));
            return;
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            let options: Vec<String> = allowed.iter().map(Value::to_string).collect();
            errors.push(format!("{path}: must be one of {}", options.join(", ")));
        }
    }

    match value {
        Value::Object(map) => {
            let properties = schema.get("properties").and_then(Value::as_object);

            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for key in required.iter().filter_map(Value::as_str) {
                    if !map.contains_key(key) {
                        errors.push(format!("{path}.{key}: required property missing"));
                    }
                }
            }

            let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));
            for (key, child) in map {
                match properties.and_then(|p| p.get(key)) {
                    Some(child_schema) => check(child_schema, child, &format!("{path}.{key}"), errors),
                    None if closed => errors.push(format!("{path}.{key}: unknown property")),
                    None => {}
                }
            }
        }
        Value::Array(items) => {
            if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
                if (items.len() as u64) < min {
                    errors.push(format!("{path}: expected at least {min} items"));
                }
            }
            if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
                if (items.len() as u64) > max {
                    errors.push(format!("{path}: expected at most {max} items"));
                }
            }
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    check(item_schema, item, &format!("{path}[{i}]"), errors);
                }
            }
        }
        Value::String(s) => {
            let len = s.chars().count() as u64;
            if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
                if len < min {
                    errors.push(format!("{path}: shorter than {min} characters"));
                }
            }
            if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
                if len > max {
                    errors.push(format!("{path}: longer than {max} characters"));
                }
            }
        }
        Value::Number(n) => {
            let x = n.as_f64().unwrap_or_default();
            if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
                if x < min {
                    errors.push(format!("{path}: must be >= {min}"));
                }
            }
            if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
                if x > max {
                    errors.push(format!("{path}: must be <= {max}"));
                }
            }
        }
        _ => {}
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "minLength": 1 },
                "exercises": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "exerciseId": { "type": "integer" },
                            "sets": { "type": "integer", "minimum": 1, "maximum": 10 }
                        },
                        "required": ["exerciseId", "sets"]
                    }
                }
            },
            "required": ["name", "exercises"],
            "additionalProperties": false
        })
    }

    #[test]
    fn valid_input_passes() {
        let input = json!({"name": "Push", "exercises": [{"exerciseId": 1, "sets": 3}]});
        assert!(validate(&template_schema(), &input).is_ok());
    }

    #[test]
    fn collects_every_violation() {
        let input = json!({"exercises": [{"exerciseId": "one", "sets": 40}], "extra": true});
        let errors = validate(&template_schema(), &input).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("$.name: required")));
        assert!(errors.iter().any(|e| e.contains("$.exercises[0].exerciseId: expected integer")));
        assert!(errors.iter().any(|e| e.contains("$.exercises[0].sets: must be <= 10")));
        assert!(errors.iter().any(|e| e.contains("$.extra: unknown property")));
    }

    #[test]
    fn float_is_not_an_integer() {
        let errors = validate(&json!({"type": "integer"}), &json!(2.5)).unwrap_err();
        assert_eq!(errors, vec!["$: expected integer, got number".to_string()]);
    }

    #[test]
    fn enum_membership() {
        let schema = json!({"type": "string", "enum": ["kg", "lb"]});
        assert!(validate(&schema, &json!("kg")).is_ok());
        assert!(validate(&schema, &json!("stone")).is_err());
    }
}
