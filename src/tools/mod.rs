//! Tool primitives shared by the MCP bridge: argument coercion, schema
//! validation, and the wrapped tool type.

pub mod arguments;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::{coerce_arguments, JsonObject};
pub use tool::{namespaced_name, ToolMap, WrappedTool};
pub use types::{ToolOutput, ToolParameters};
pub use validation::SchemaNode;
