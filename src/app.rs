use crate::ask::Answerer;
use crate::config::{Config, Selectors};
use crate::extract::ReviewExtractor;
use crate::gemini::GeminiClient;
use crate::index::PineconeIndex;
use crate::index::pinecone::controller_url;
use crate::pipeline::{Pipeline, RunSummary};
use crate::render::{ChromeRenderer, RenderOptions};
use anyhow::Context;
use tracing::info;
use url::Url;

/// Long-lived clients shared by the commands.
pub struct App {
    config: Config,
    gemini: GeminiClient,
    index: PineconeIndex,
}

impl App {
    /// Build the HTTP clients and resolve the index host.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let gemini = GeminiClient::new(
            &config.google_api_key,
            &config.gemini_base_url,
            &config.embedding_model,
            &config.generation_model,
            config.http_timeout,
        )
        .context("Failed to create Gemini client")?;

        let host = match &config.pinecone_host {
            Some(host) => host.clone(),
            None => {
                let controller = controller_url(&config.pinecone_environment)
                    .context("Invalid Pinecone environment")?;
                PineconeIndex::resolve_host(
                    &config.pinecone_api_key,
                    &controller,
                    &config.pinecone_index,
                    &config.pinecone_environment,
                    config.http_timeout,
                )
                .await
                .context("Failed to resolve Pinecone index host")?
            }
        };

        let index = PineconeIndex::new(
            &config.pinecone_api_key,
            &host,
            config.pinecone_namespace.clone(),
            config.http_timeout,
        )
        .context("Failed to create Pinecone client")?;

        info!(
            index = config.pinecone_index.as_str(),
            host = host.as_str(),
            embedding_model = config.embedding_model.as_str(),
            "clients ready"
        );

        Ok(App {
            config,
            gemini,
            index,
        })
    }

    /// Scrape one professor page into the index.
    ///
    /// The browser lives only for the duration of this call and is released
    /// on every path out of it.
    pub async fn scrape(&self, url: &Url) -> Result<RunSummary, anyhow::Error> {
        let selectors = Selectors::load(&self.config.selectors_file)
            .context("Failed to load page selectors")?;
        info!(
            file = %self.config.selectors_file.display(),
            revision = selectors.revision.as_str(),
            "page selectors loaded"
        );
        let extractor = ReviewExtractor::new(&selectors).context("Invalid page selectors")?;

        let renderer = ChromeRenderer::new(RenderOptions {
            chrome_path: self.config.chrome_path.clone(),
            settle: self.config.render_settle,
        });

        let pipeline = Pipeline {
            renderer: &renderer,
            extractor: &extractor,
            embedder: &self.gemini,
            index: &self.index,
        };
        let result = pipeline.run(url).await;
        renderer.close();

        Ok(result?)
    }

    /// Answer a question from the indexed reviews.
    pub async fn ask(&self, question: &str) -> Result<String, anyhow::Error> {
        let answerer = Answerer {
            embedder: &self.gemini,
            index: &self.index,
            generator: &self.gemini,
            top_k: self.config.top_k,
        };
        Ok(answerer.ask(question).await?)
    }
}
