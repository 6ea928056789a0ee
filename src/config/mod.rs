// Configuration management module
// TOML-backed settings plus the guided first-run setup

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, GenerationConfig, OllamaConfig};
