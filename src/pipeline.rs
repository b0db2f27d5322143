//! The scrape-then-index run: render, extract, embed, upsert.
//!
//! Stages run strictly in order and any failure ends the run. Nothing is
//! written to the index unless every review was embedded.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use url::Url;

use crate::embedding::{Embedder, EmbeddingError};
use crate::extract::{ExtractError, ReviewExtractor};
use crate::index::{IndexError, VectorIndex};
use crate::render::{PageRenderer, RenderError};
use crate::review::IndexRecord;
use crate::utils::{fmt_duration, log_if_slow};

/// Embedding calls slower than this get a warning.
const SLOW_EMBED: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Rendering,
    Extracting,
    Embedding,
    Writing,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Rendering => "rendering",
            Stage::Extracting => "extracting",
            Stage::Embedding => "embedding",
            Stage::Writing => "writing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to render page")]
    Navigation(#[from] RenderError),
    #[error("failed to extract professor page")]
    NotFound(#[from] ExtractError),
    #[error("failed to embed review {ordinal}")]
    Embedding {
        ordinal: usize,
        #[source]
        source: EmbeddingError,
    },
    #[error("failed to write reviews to index")]
    Index(#[from] IndexError),
}

impl PipelineError {
    /// The stage the run was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Navigation(_) => Stage::Rendering,
            PipelineError::NotFound(_) => Stage::Extracting,
            PipelineError::Embedding { .. } => Stage::Embedding,
            PipelineError::Index(_) => Stage::Writing,
        }
    }
}

/// Counts reported at the end of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub name: String,
    pub subject: String,
    pub reviews_found: usize,
    pub reviews_embedded: usize,
    pub records_written: usize,
}

/// Borrowed components for one run. The caller owns them, so the browser is
/// released when the caller's scope ends, whatever the outcome.
pub struct Pipeline<'a> {
    pub renderer: &'a dyn PageRenderer,
    pub extractor: &'a ReviewExtractor,
    pub embedder: &'a dyn Embedder,
    pub index: &'a dyn VectorIndex,
}

impl Pipeline<'_> {
    pub async fn run(&self, url: &Url) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        let mut stage = Stage::Idle;

        let result = self.run_stages(url, &mut stage).await;
        match &result {
            Ok(summary) => {
                transition(&mut stage, Stage::Done);
                info!(
                    written = summary.records_written,
                    duration = fmt_duration(start.elapsed()),
                    "run complete"
                );
            }
            Err(e) => {
                let failed_in = e.stage();
                transition(&mut stage, Stage::Failed);
                error!(stage = %failed_in, error = ?e, "run failed");
            }
        }
        result
    }

    async fn run_stages(&self, url: &Url, stage: &mut Stage) -> Result<RunSummary, PipelineError> {
        transition(stage, Stage::Rendering);
        let page = self.renderer.render(url).await?;

        transition(stage, Stage::Extracting);
        let professor = self.extractor.extract(&page)?;
        let reviews_found = professor.reviews.len();
        info!(count = reviews_found, "found reviews");

        transition(stage, Stage::Embedding);
        let mut records = Vec::with_capacity(reviews_found);
        for (ordinal, review) in professor.reviews.iter().enumerate() {
            let embed_start = Instant::now();
            let values = self
                .embedder
                .embed(review.comment_display())
                .await
                .map_err(|source| PipelineError::Embedding { ordinal, source })?;
            log_if_slow(embed_start, SLOW_EMBED, "embedding call");
            debug!(ordinal, dimension = values.len(), "review embedded");
            records.push(IndexRecord::from_review(review, ordinal, values));
        }
        let reviews_embedded = records.len();
        info!(count = reviews_embedded, "embedded reviews");

        transition(stage, Stage::Writing);
        let records_written = self.index.upsert(&records).await?;
        info!(count = records_written, "wrote reviews to index");

        Ok(RunSummary {
            name: professor.name,
            subject: professor.subject,
            reviews_found,
            reviews_embedded,
            records_written,
        })
    }
}

fn transition(stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "stage transition");
    *stage = next;
}
