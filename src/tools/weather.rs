use anyhow::{Context, Result};
use serde_json::{Value, json};

use super::ToolRegistry;
use crate::error::ToolCallerError;
use crate::schema::{ParamSchema, ParamType, ToolSchema, ValidatedArgs};

/// Demo weather lookup returning canned readings
pub struct WeatherTool;

impl WeatherTool {
    pub fn schema() -> ToolSchema {
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
            ))
    }

    pub async fn execute(args: ValidatedArgs) -> Result<Value> {
        let location = args.str("location").context("missing 'location' parameter")?;
        let unit = args.str("unit").unwrap_or("celsius");

        // Stand-in for a network call
        tokio::task::yield_now().await;

        let temperature = if unit == "celsius" { 20 } else { 68 };
        Ok(json!({
            "location": location,
            "temperature": temperature,
            "unit": unit,
        }))
    }

    pub fn register(self, registry: &mut ToolRegistry) -> Result<(), ToolCallerError> {
        registry.register_async(Self::schema(), Self::execute)
    }
}
