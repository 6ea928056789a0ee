
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{Config, GenerationConfig, OllamaConfig};
use crate::embeddings::ollama::OllamaClient;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!(
        "{}",
        style("🔧 Scheme Advisor Configuration Setup").bold().cyan()
    );
    eprintln!();

    let mut config = Config::load().context("Failed to load existing configuration")?;

    eprintln!("{}", style("Embedding Backend").bold().yellow());
    eprintln!("Configure the Ollama instance used to embed passages and queries.");
    eprintln!();
    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Answer Generation").bold().yellow());
    eprintln!("Configure the model that composes grounded answers.");
    eprintln!();
    configure_generation(&mut config.generation)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before building the index.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    eprintln!("{}", describe(&config));
    Ok(())
}

/// Human-readable rendering of the effective configuration.
pub(crate) fn describe(config: &Config) -> String {
    format!(
        "Embedding backend: {}://{}:{}\n\
         Embedding model: {} ({} dimensions)\n\
         Generation model: {} (min score {:.2})\n\
         Chunking: {}..{} chars, {} overlap\n\
         Base directory: {}",
        config.ollama.protocol,
        config.ollama.host,
        config.ollama.port,
        config.ollama.model,
        config.ollama.embedding_dimension,
        config.generation.model,
        config.generation.min_score,
        config.chunking.min_chars,
        config.chunking.max_chars,
        config.chunking.overlap_chars,
        config.base_dir.display(),
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    ollama.host = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .interact_text()?;

    ollama.port = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .interact_text()?;

    ollama.model = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .interact_text()?;

    ollama.embedding_dimension = Input::new()
        .with_prompt("Embedding dimension")
        .default(ollama.embedding_dimension)
        .interact_text()?;

    Ok(())
}

fn configure_generation(generation: &mut GenerationConfig) -> Result<()> {
    generation.model = Input::new()
        .with_prompt("Generation model")
        .default(generation.model.clone())
        .interact_text()?;

    generation.min_score = Input::new()
        .with_prompt("Minimum retrieval score for answering")
        .default(generation.min_score)
        .interact_text()?;

    Ok(())
}

fn test_ollama_connection(config: &Config) -> bool {
    match OllamaClient::new(config) {
        Ok(client) => client.ping().is_ok(),
        Err(_) => false,
    }
}
