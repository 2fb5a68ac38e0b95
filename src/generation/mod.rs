//! Generation domain module - orchestrates code generation workflow
//!
//! Takes a loaded service definition, optionally merges endpoints from an
//! external API specification, validates it and renders the service sources
//! through the template engine.

pub mod context;
pub mod merger;
pub mod orchestrator;
pub mod sanitizers;
pub mod traits;
pub mod types;

pub use context::*;
pub use merger::{MergedEndpoints, convert_to_rest_endpoint, generate_handler_name, merge_endpoints};
pub use orchestrator::*;
pub use traits::*;
pub use types::*;
