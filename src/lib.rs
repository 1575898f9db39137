pub mod api_server;
pub mod core;
pub mod error;
pub mod schema;

pub use error::{CompletionError, ExtractError, NormalizeError};
pub use schema::{DraftDefaults, Edge, Node, NodeData, Position, SchemaDraft};
