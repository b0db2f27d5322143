//! In-process stand-ins for the browser, embedding service and index.

#![allow(dead_code)]

use async_trait::async_trait;
use review_indexer::embedding::{Embedder, EmbeddingError};
use review_indexer::index::{IndexError, QueryMatch, VectorIndex};
use review_indexer::render::{PageRenderer, RenderError, RenderedPage};
use review_indexer::review::IndexRecord;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Serves a fixed HTML document, or fails navigation when `html` is `None`.
pub struct FixtureRenderer {
    pub html: Option<String>,
    pub calls: AtomicUsize,
}

impl FixtureRenderer {
    pub fn serving(html: &str) -> Self {
        Self {
            html: Some(html.to_owned()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            html: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageRenderer for FixtureRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.html {
            Some(html) => Ok(RenderedPage {
                url: url.clone(),
                html: html.clone(),
            }),
            None => Err(RenderError::Navigation {
                url: url.clone(),
                source: anyhow::anyhow!("net::ERR_NAME_NOT_RESOLVED"),
            }),
        }
    }
}

/// Records every text it embeds and returns a small vector derived from it.
#[derive(Default)]
pub struct RecordingEmbedder {
    pub texts: Mutex<Vec<String>>,
    /// Fail on the call with this 0-based index.
    pub fail_at: Option<usize>,
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut texts = self.texts.lock().unwrap();
        if self.fail_at == Some(texts.len()) {
            return Err(EmbeddingError::Empty);
        }
        texts.push(text.to_owned());
        Ok(vec![text.len() as f32, texts.len() as f32, 1.0])
    }
}

/// Keeps each upsert batch it receives.
#[derive(Default)]
pub struct RecordingIndex {
    pub batches: Mutex<Vec<Vec<IndexRecord>>>,
}

impl RecordingIndex {
    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorIndex for RecordingIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize, IndexError> {
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(records.len())
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, IndexError> {
        let batches = self.batches.lock().unwrap();
        Ok(batches
            .iter()
            .flatten()
            .take(top_k)
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: 1.0,
                metadata: record.metadata.clone(),
            })
            .collect())
    }
}
