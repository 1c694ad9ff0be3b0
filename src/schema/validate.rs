use std::fmt;

use serde_json::{Map, Value};

use super::{ParamSchema, ParamType, ToolSchema};

/// Why a single parameter failed validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationReason {
    Missing,
    WrongType {
        expected: String,
        actual: &'static str,
    },
    NotInEnum {
        allowed: Vec<String>,
        actual: String,
    },
    Rule(String),
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationReason::Missing => write!(f, "is required"),
            ValidationReason::WrongType { expected, actual } => {
                write!(f, "expected {}, got {}", expected, actual)
            }
            ValidationReason::NotInEnum { allowed, actual } => {
                write!(f, "must be one of [{}], got '{}'", allowed.join(", "), actual)
            }
            ValidationReason::Rule(message) => write!(f, "{}", message),
        }
    }
}

/// A parameter that failed validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parameter '{field}' {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: ValidationReason,
}

/// Arguments that passed validation, in schema declaration order, with
/// defaults filled in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs {
    values: Vec<(String, Value)>,
    ignored: Vec<String>,
}

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arguments supplied by the caller that the schema does not declare
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    /// Convert to a JSON object keyed by parameter name
    pub fn into_value(self) -> Value {
        Value::Object(self.values.into_iter().collect())
    }
}

/// Validate raw call arguments against a tool schema.
///
/// Pure and deterministic: parameters are checked in declaration order and the
/// first failure is returned.
pub fn validate(
    schema: &ToolSchema,
    raw_args: &Map<String, Value>,
) -> Result<ValidatedArgs, ValidationError> {
    let mut values = Vec::with_capacity(schema.params.len());

    for param in &schema.params {
        let value = match raw_args.get(&param.name) {
            None | Some(Value::Null) => match &param.default {
                Some(default) => check_value(param, default).map_err(|reason| ValidationError {
                    field: param.name.clone(),
                    reason,
                })?,
                None => {
                    return Err(ValidationError {
                        field: param.name.clone(),
                        reason: ValidationReason::Missing,
                    });
                }
            },
            Some(raw) => check_value(param, raw).map_err(|reason| ValidationError {
                field: param.name.clone(),
                reason,
            })?,
        };
        values.push((param.name.clone(), value));
    }

    let ignored = raw_args
        .keys()
        .filter(|key| schema.get_param(key).is_none())
        .cloned()
        .collect();

    Ok(ValidatedArgs { values, ignored })
}

/// Type, enum and rule check for a single value, returning the coerced value
pub(crate) fn check_value(param: &ParamSchema, value: &Value) -> Result<Value, ValidationReason> {
    let wrong_type = || ValidationReason::WrongType {
        expected: param.param_type.json_type().to_string(),
        actual: json_type_name(value),
    };

    let coerced = match &param.param_type {
        ParamType::String => value.as_str().map(|_| value.clone()).ok_or_else(wrong_type)?,
        ParamType::Boolean => value.as_bool().map(Value::from).ok_or_else(wrong_type)?,
        ParamType::Number => value.as_f64().map(|_| value.clone()).ok_or_else(wrong_type)?,
        ParamType::Integer => coerce_integer(value).ok_or_else(wrong_type)?,
        ParamType::Array => value.as_array().map(|_| value.clone()).ok_or_else(wrong_type)?,
        ParamType::Object => value.as_object().map(|_| value.clone()).ok_or_else(wrong_type)?,
        ParamType::Enum(choices) => {
            let s = value.as_str().ok_or_else(wrong_type)?;
            if !choices.iter().any(|choice| choice == s) {
                return Err(ValidationReason::NotInEnum {
                    allowed: choices.clone(),
                    actual: s.to_string(),
                });
            }
            value.clone()
        }
    };

    for rule in &param.rules {
        rule.check(&coerced).map_err(ValidationReason::Rule)?;
    }

    Ok(coerced)
}

/// Integers pass through; floats with no fractional part become integers
fn coerce_integer(value: &Value) -> Option<Value> {
    if value.is_i64() || value.is_u64() {
        return Some(value.clone());
    }

    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        None
    }
}

fn json_type_name(value: &Value) -> &'static str {
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
