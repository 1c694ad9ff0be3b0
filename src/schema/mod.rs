mod publish;
mod validate;

pub use publish::{build_schema_block, render_schema_block};
pub use validate::{ValidatedArgs, ValidationError, ValidationReason, validate};

use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::error::ToolCallerError;

/// Primitive type accepted by a tool parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// A string restricted to the listed choices
    Enum(Vec<String>),
    Array,
    Object,
}

impl ParamType {
    /// Build an enum type from a list of choices
    pub fn one_of<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(choices.into_iter().map(Into::into).collect())
    }

    /// The JSON schema `type` keyword for this parameter
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamType::String | ParamType::Enum(_) => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Enum(choices) => write!(f, "one of [{}]", choices.join(", ")),
            other => write!(f, "{}", other.json_type()),
        }
    }
}

/// Field-level rule applied after the type check
#[derive(Debug, Clone)]
pub enum ParamRule {
    /// Rejects `/` and `\` anywhere in a string value
    NoPathSeparators,
    /// Rejects empty (or whitespace-only) strings
    NotEmpty,
    /// String value must match the regex
    Pattern(Regex),
}

impl ParamRule {
    /// Compile a pattern rule
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    /// Check a value against this rule, returning the violation message
    pub(crate) fn check(&self, value: &Value) -> Result<(), String> {
        let Some(s) = value.as_str() else {
            return Ok(());
        };

        match self {
            ParamRule::NoPathSeparators => {
                if s.contains('/') || s.contains('\\') {
                    return Err("may not contain path separators".to_string());
                }
            }
            ParamRule::NotEmpty => {
                if s.trim().is_empty() {
                    return Err("may not be empty".to_string());
                }
            }
            ParamRule::Pattern(re) => {
                if !re.is_match(s) {
                    return Err(format!("must match pattern {}", re.as_str()));
                }
            }
        }

        Ok(())
    }
}

/// Declaration of a single tool parameter
#[derive(Debug, Clone)]
pub struct ParamSchema {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    /// Default for optional parameters; `None` means the parameter is required
    pub default: Option<Value>,
    pub rules: Vec<ParamRule>,
}

impl ParamSchema {
    /// Create a required parameter
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            default: None,
            rules: Vec::new(),
        }
    }

    /// Create an optional parameter with a default value
    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        default: impl Into<Value>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            default: Some(default.into()),
            rules: Vec::new(),
        }
    }

    /// Attach a field-level rule
    pub fn rule(mut self, rule: ParamRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Declarative description of a tool and its parameters
#[derive(Debug, Clone)]
pub struct ToolSchema {
    /// Unique tool name, used as the registry key
    pub name: String,
    pub description: String,
    /// Parameters in declaration order
    pub params: Vec<ParamSchema>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Add a parameter to the schema
    pub fn param(mut self, param: ParamSchema) -> Self {
        self.params.push(param);
        self
    }

    /// Look up a parameter by name
    pub fn get_param(&self, name: &str) -> Option<&ParamSchema> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Names of parameters without a default, in declaration order
    pub fn required_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Check the structural invariants of the schema.
    ///
    /// The name must be non-empty, parameter names must be unique, and every
    /// default must itself pass the parameter's type, enum and rule checks.
    pub fn check(&self) -> Result<(), ToolCallerError> {
        let invalid = |message: String| ToolCallerError::InvalidSchema {
            tool_name: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("tool name must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for param in &self.params {
            if !seen.insert(param.name.as_str()) {
                return Err(invalid(format!("duplicate parameter '{}'", param.name)));
            }

            if let ParamType::Enum(choices) = &param.param_type {
                if choices.is_empty() {
                    return Err(invalid(format!(
                        "parameter '{}' has an empty enum",
                        param.name
                    )));
                }
            }

            if !param.rules.is_empty()
                && !matches!(param.param_type, ParamType::String | ParamType::Enum(_))
            {
                return Err(invalid(format!(
                    "rules on '{}' require a string parameter, not {}",
                    param.name,
                    param.param_type.json_type()
                )));
            }

            if let Some(default) = &param.default {
                validate::check_value(param, default).map_err(|reason| {
                    invalid(format!("default for '{}' {}", param.name, reason))
                })?;
            }
        }

        Ok(())
    }
}
