// Generation module
// The answer-composer boundary: prompt assembly over retrieved passages and
// a capability-typed text generator so the core tests fully offline


use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::SchemeError;
use crate::config::Config;
use crate::retriever::RetrievedPassage;

/// A black-box text generator: prompt in, prose out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// What came out of the composer boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposedAnswer {
    /// Free-text answer grounded in the retrieved evidence.
    Grounded(String),
    /// Retrieval was too weak to answer; the passages are still usable.
    NotFound,
}

/// Assembles the grounded prompt and calls the generator.
pub struct AnswerComposer<'a> {
    generator: &'a dyn TextGenerator,
    min_score: f32,
}

impl<'a> AnswerComposer<'a> {
    #[inline]
    pub fn new(generator: &'a dyn TextGenerator, min_score: f32) -> Self {
        Self {
            generator,
            min_score,
        }
    }

    /// Compose an answer from the ranked passages.
    ///
    /// When there is no evidence, or the best score falls below the
    /// configured floor, the generator is never called. A generator failure
    /// surfaces as a `Generation` error; the caller still holds the
    /// passages and can degrade to showing them.
    #[inline]
    pub async fn compose(
        &self,
        query: &str,
        passages: &[RetrievedPassage],
    ) -> crate::Result<ComposedAnswer> {
        let best_score = passages.first().map(|p| p.score).unwrap_or(0.0);
        if passages.is_empty() || best_score < self.min_score {
            debug!(
                "Best retrieval score {:.3} below floor {:.3}; not generating",
                best_score, self.min_score
            );
            return Ok(ComposedAnswer::NotFound);
        }

        let prompt = build_prompt(query, passages);
        let answer = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| SchemeError::Generation(e.to_string()))?;

        let answer = answer.trim();
        if answer.is_empty() || answer == "NOT FOUND" {
            return Ok(ComposedAnswer::NotFound);
        }

        Ok(ComposedAnswer::Grounded(answer.to_string()))
    }
}

/// Render the grounded prompt: rules, question, then every passage with its
/// source attribution.
#[inline]
pub fn build_prompt(query: &str, passages: &[RetrievedPassage]) -> String {
    let evidence = passages
        .iter()
        .map(|p| format!("[{} | page {}]\n{}", p.file_name, p.page_number, p.text))
        .join("\n\n");

    format!(
        "You are an advisor for Indian government welfare schemes.\n\
         \n\
         CRITICAL RULES:\n\
         - Use ONLY the evidence below for factual claims.\n\
         - Do NOT invent amounts, thresholds, or eligibility rules.\n\
         - If the evidence does not support the question, output ONLY: NOT FOUND\n\
         - Do NOT mention any links unless explicitly present in the evidence.\n\
         \n\
         Question:\n\
         {}\n\
         \n\
         Evidence:\n\
         {}\n\
         \n\
         Output format (short and clean):\n\
         1) Scheme / Topic\n\
         2) Eligibility: Eligible / Maybe / Not sure + reason\n\
         3) Benefits (if supported)\n\
         4) Citations: [file | page]\n\
         \n\
         If insufficient evidence, output ONLY: NOT FOUND",
        query, evidence
    )
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama-backed implementation of the generator boundary.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama
            .ollama_url()
            .context("Failed to build generation URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(
                config.generation.timeout_seconds,
            )))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.generation.model.clone(),
            agent,
        })
    }

    fn generate_blocking(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generate URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generate request")?;

        debug!("Requesting answer from {} ({})", url, self.model);

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| {
                warn!("Generation backend request failed: {}", e);
                anyhow::anyhow!("Generation request failed: {}", e)
            })?;

        let response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generate response")?;

        Ok(response.response)
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    #[inline]
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_blocking(prompt)
    }
}
