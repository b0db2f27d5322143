//! Question answering over indexed reviews.
//!
//! The question is embedded with the same model as the reviews, the closest
//! reviews are pulled from the index, and a generative model answers with
//! those reviews pasted in as context.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::embedding::{Embedder, EmbeddingError};
use crate::index::{IndexError, QueryMatch, VectorIndex};

/// Returned when the model produced no usable text.
pub const NO_RESPONSE: &str = "No response available";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed")]
    Transport(#[from] reqwest::Error),
    #[error("generation service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error("question is empty")]
    EmptyQuestion,
    #[error("failed to embed question")]
    Embedding(#[from] EmbeddingError),
    #[error("failed to query review index")]
    Index(#[from] IndexError),
    #[error("failed to generate answer")]
    Generation(#[from] GenerationError),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// `None` when the model returned no candidate text.
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError>;
}

/// Review context handed to the model, one entry per index match.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct ContextEntry<'a> {
    comment: Option<&'a str>,
    teacher_name: Option<&'a str>,
}

fn build_prompt(question: &str, matches: &[QueryMatch]) -> String {
    let context: Vec<ContextEntry<'_>> = matches
        .iter()
        .map(|m| ContextEntry {
            comment: m.metadata.get("comment").map(String::as_str),
            teacher_name: m.metadata.get("name").map(String::as_str),
        })
        .collect();
    // Serializing borrowed strings and options cannot fail.
    let context = serde_json::to_string(&context).unwrap_or_else(|_| "[]".to_owned());
    format!("{question} Use the following as context: {context}")
}

pub struct Answerer<'a> {
    pub embedder: &'a dyn Embedder,
    pub index: &'a dyn VectorIndex,
    pub generator: &'a dyn TextGenerator,
    pub top_k: usize,
}

impl Answerer<'_> {
    pub async fn ask(&self, question: &str) -> Result<String, AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskError::EmptyQuestion);
        }

        let vector = self.embedder.embed(question).await?;
        let matches = self.index.query(&vector, self.top_k).await?;
        info!(matches = matches.len(), top_k = self.top_k, "retrieved review context");

        let prompt = build_prompt(question, &matches);
        debug!(prompt = prompt.as_str(), "sending prompt");

        let answer = self.generator.generate(&prompt).await?;
        Ok(answer.unwrap_or_else(|| NO_RESPONSE.to_owned()))
    }
}
