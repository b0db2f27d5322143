//! Pinecone data-plane client.

use anyhow::Context;
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{IndexError, QueryMatch, VectorIndex};
use crate::review::IndexRecord;

const API_KEY_HEADER: &str = "api-key";

/// Client for a single named Pinecone index.
pub struct PineconeIndex {
    http: reqwest::Client,
    host: String,
    namespace: Option<String>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Deserialize)]
struct RawMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: IndexMap<String, serde_json::Value>,
}

impl From<RawMatch> for QueryMatch {
    fn from(raw: RawMatch) -> Self {
        let metadata = raw
            .metadata
            .into_iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => (key, s),
                other => (key, other.to_string()),
            })
            .collect();
        Self {
            id: raw.id,
            score: raw.score,
            metadata,
        }
    }
}

#[derive(Deserialize)]
struct WhoAmI {
    project_name: String,
}

fn build_http(api_key: &str, timeout: Duration) -> anyhow::Result<reqwest::Client> {
    anyhow::ensure!(!api_key.trim().is_empty(), "missing Pinecone API key");
    let mut headers = HeaderMap::new();
    headers.insert(
        API_KEY_HEADER,
        HeaderValue::from_str(api_key.trim()).context("invalid Pinecone API key")?,
    );
    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .context("failed to build Pinecone HTTP client")
}

/// Controller endpoint for an environment such as `us-east-1-aws`.
pub fn controller_url(environment: &str) -> Result<Url, IndexError> {
    Ok(Url::parse(&format!(
        "https://controller.{environment}.pinecone.io"
    ))?)
}

impl PineconeIndex {
    pub fn new(
        api_key: &str,
        host: &Url,
        namespace: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_http(api_key, timeout)?,
            host: host.as_str().trim_end_matches('/').to_owned(),
            namespace,
        })
    }

    /// Data-plane host for `index`, derived from the project the key belongs to.
    pub async fn resolve_host(
        api_key: &str,
        controller: &Url,
        index: &str,
        environment: &str,
        timeout: Duration,
    ) -> anyhow::Result<Url> {
        let http = build_http(api_key, timeout)?;
        let endpoint = format!("{}/actions/whoami", controller.as_str().trim_end_matches('/'));

        let resp = http
            .get(&endpoint)
            .send()
            .await
            .map_err(IndexError::from)
            .context("failed to reach Pinecone controller")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexError::Rejected { status, body })
                .context("Pinecone controller rejected whoami");
        }

        let whoami: WhoAmI = resp
            .json()
            .await
            .map_err(IndexError::from)
            .context("failed to parse whoami response")?;
        let host = Url::parse(&format!(
            "https://{index}-{project}.svc.{environment}.pinecone.io",
            project = whoami.project_name
        ))
        .map_err(IndexError::from)?;

        info!(index, host = host.as_str(), "resolved Pinecone index host");
        Ok(host)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, IndexError> {
        let resp = self
            .http
            .post(format!("{}{path}", self.host))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexError::Rejected { status, body });
        }
        Ok(resp)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize, IndexError> {
        if records.is_empty() {
            debug!("empty batch, skipping upsert");
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: records,
            namespace: self.namespace.as_deref(),
        };
        let resp: UpsertResponse = self.post("/vectors/upsert", &request).await?.json().await?;
        debug!(
            sent = records.len(),
            upserted = resp.upserted_count,
            "batch upserted"
        );
        Ok(resp.upserted_count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, IndexError> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };
        let resp: QueryResponse = self.post("/query", &request).await?.json().await?;
        Ok(resp.matches.into_iter().map(QueryMatch::from).collect())
    }
}
