use serde_json::{Map, Value, json};

use super::{ParamType, ToolSchema};
use crate::tools::ToolRegistry;

/// Render every registered tool into the tool list embedded in the prompt.
///
/// Output order follows registration order.
pub fn build_schema_block(registry: &ToolRegistry) -> Value {
    Value::Array(
        registry
            .all()
            .iter()
            .map(|registration| publish_tool(&registration.schema))
            .collect(),
    )
}

/// Pretty-printed form of [`build_schema_block`]
pub fn render_schema_block(registry: &ToolRegistry) -> String {
    // Serializing a Value built from strings and numbers cannot fail
    serde_json::to_string_pretty(&build_schema_block(registry)).unwrap_or_else(|_| "[]".into())
}

fn publish_tool(schema: &ToolSchema) -> Value {
    let mut properties = Map::new();
    for param in &schema.params {
        let mut property = Map::new();
        property.insert("type".into(), json!(param.param_type.json_type()));
        if let ParamType::Enum(choices) = &param.param_type {
            property.insert("enum".into(), json!(choices));
        }
        if !param.description.is_empty() {
            property.insert("description".into(), json!(param.description));
        }
        if let Some(default) = &param.default {
            property.insert("default".into(), default.clone());
        }
        properties.insert(param.name.clone(), Value::Object(property));
    }

    json!({
        "name": schema.name,
        "description": schema.description,
        "parameters": {
            "type": "object",
            "properties": properties,
            "required": schema.required_names(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamSchema, ParamType};

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register_sync(
                ToolSchema::new("get_current_weather", "Return the current weather for a city.")
                    .param(ParamSchema::required(
                        "location",
                        ParamType::String,
                        "City name",
                    ))
                    .param(ParamSchema::optional(
                        "unit",
                        ParamType::one_of(["celsius", "fahrenheit"]),
                        "celsius",
                        "Temperature unit",
                    )),
                |args| Ok(args.into_value()),
            )
            .unwrap();
        registry
            .register_sync(ToolSchema::new("ping", ""), |_| Ok(json!("pong")))
            .unwrap();
        registry
    }

    #[test]
    fn block_lists_tools_in_registration_order() {
        let block = build_schema_block(&registry());
        let names: Vec<&str> = block
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["get_current_weather", "ping"]);
    }

    #[test]
    fn required_list_matches_params_without_defaults() {
        let block = build_schema_block(&registry());
        let weather = &block[0];
        assert_eq!(weather["parameters"]["type"], "object");
        assert_eq!(weather["parameters"]["required"], json!(["location"]));
        assert_eq!(
            weather["parameters"]["properties"]["unit"],
            json!({
                "type": "string",
                "enum": ["celsius", "fahrenheit"],
                "description": "Temperature unit",
                "default": "celsius"
            })
        );
    }

    #[test]
    fn empty_description_is_published_as_empty_string() {
        let block = build_schema_block(&registry());
        assert_eq!(block[1]["description"], "");
        assert_eq!(block[1]["parameters"]["required"], json!([]));
        assert_eq!(block[1]["parameters"]["properties"], json!({}));
    }

    #[test]
    fn rendered_block_is_indented_json() {
        let rendered = render_schema_block(&registry());
        assert!(rendered.starts_with("[\n  {"));
        let reparsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(reparsed, build_schema_block(&registry()));
    }
}
