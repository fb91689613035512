//! `get_weather` tool: simulated weather lookup.

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};

use super::base::{optional_string, require_string, Tool};

pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather in a given location"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city and state, e.g. San Francisco, CA"
                },
                "unit": {
                    "type": "string",
                    "enum": ["celsius", "fahrenheit"],
                    "description": "The unit of temperature"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let location = require_string(&args, "location")?;
        let unit = optional_string(&args, "unit").unwrap_or_else(|| "celsius".to_string());
        let temperature: i64 = rand::thread_rng().gen_range(10..=39);

        Ok(json!({
            "location": location,
            "temperature": temperature,
            "unit": unit,
            "condition": "sunny"
        }))
    }
}
