//! Utility functions and helpers.

pub mod env;

pub use env::{ENV_PREFIX, get_env_parsed, get_env_with_prefix};
