//! Tool modules for the Toolrelay agent.

use std::sync::Arc;

pub mod base;
pub mod calculator;
pub mod registry;
pub mod weather;

pub use base::{optional_string, require_string, Tool};
pub use calculator::CalculatorTool;
pub use registry::ToolRegistry;
pub use weather::WeatherTool;

/// Registry holding the built-in tools (`calculate`, `get_weather`).
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WeatherTool));
    registry.register(Arc::new(CalculatorTool));
    registry
}
