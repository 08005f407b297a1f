pub mod docs;
mod registry;

pub use docs::{document_tools, DocumentTool};
pub use registry::{json_schema_enum, json_schema_object, Tool, ToolRegistry};
