//! Core building blocks shared by every layer: errors, configuration and
//! identifier utilities.

pub mod config;
pub mod error;
pub mod utils;

pub use error::{Error, Result};
