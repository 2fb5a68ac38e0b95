//! Infrastructure layer - concrete implementations of the generation ports

pub mod openapi;
pub mod output;
pub mod shell;
pub mod templates;

pub use output::FileSystemOutputService;
pub use shell::{CommandExecutor, CommandResult, ProcessCommandExecutor};
pub use templates::{TemplateEngine, TemplateError};
