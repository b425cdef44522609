//! services/api/src/adapters/pinecone.rs
//!
//! This module contains the adapter for the Pinecone vector-search provider.
//! It implements the `RetrievalService` port from the `core` crate over
//! Pinecone's REST API: inference embed, index query and inference rerank.

use crate::config::PineconeSettings;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use support_chat_core::{retry, Doc, PortError, PortResult, RetrievalService, RetryPolicy};
use tracing::{debug, info};

const API_VERSION: &str = "2025-04";

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    parameters: EmbedParameters,
    inputs: Vec<EmbedInput<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedParameters {
    input_type: &'static str,
    truncate: &'static str,
}

#[derive(Debug, Serialize)]
struct EmbedInput<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    data: Vec<Embedding>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    metadata: Option<FaqMetadata>,
}

/// The metadata each indexed FAQ entry carries.
#[derive(Debug, Deserialize, Default)]
struct FaqMetadata {
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<RerankDocument<'a>>,
    top_n: usize,
    rank_fields: [&'static str; 1],
    return_documents: bool,
    parameters: RerankParameters,
}

#[derive(Debug, Serialize)]
struct RerankDocument<'a> {
    id: &'a str,
    question: &'a str,
    answer: &'a str,
}

#[derive(Debug, Serialize)]
struct RerankParameters {
    truncate: &'static str,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    #[serde(default)]
    data: Vec<RankedDocument>,
}

#[derive(Debug, Deserialize)]
struct RankedDocument {
    index: usize,
    #[serde(default)]
    document: Option<RankedFields>,
}

#[derive(Debug, Deserialize)]
struct RankedFields {
    #[serde(default)]
    id: String,
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `RetrievalService` using Pinecone.
#[derive(Clone)]
pub struct PineconeAdapter {
    client: Client,
    api_key: String,
    api_base: String,
    index_host: String,
    namespace: String,
    embed_model: String,
    rerank_model: String,
    retry_policy: RetryPolicy,
}

impl PineconeAdapter {
    /// Creates an adapter for a known data-plane host.
    pub fn new(
        settings: &PineconeSettings,
        index_host: &str,
        timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> PortResult<Self> {
        let client = build_client(timeout)?;
        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            api_base: trim_base(&settings.api_base),
            index_host: normalize_host(index_host),
            namespace: settings.namespace.clone(),
            embed_model: settings.embed_model.clone(),
            rerank_model: settings.rerank_model.clone(),
            retry_policy,
        })
    }

    /// Creates the adapter, describing the index first when no host is configured.
    pub async fn connect(
        settings: &PineconeSettings,
        timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> PortResult<Self> {
        let host = match &settings.index_host {
            Some(host) => host.clone(),
            None => {
                let client = build_client(timeout)?;
                let url = format!("{}/indexes/{}", trim_base(&settings.api_base), settings.index_name);
                let response = client
                    .get(&url)
                    .header("Api-Key", &settings.api_key)
                    .header("X-Pinecone-API-Version", API_VERSION)
                    .send()
                    .await
                    .map_err(|e| PortError::Provider(format!("Failed to describe index: {}", e)))?;
                let description: IndexDescription = decode(response).await?;
                info!(index = %settings.index_name, host = %description.host, "Resolved Pinecone index host");
                description.host
            }
        };
        Self::new(settings, &host, timeout, retry_policy)
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> PortResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Provider(format!("Pinecone request failed: {}", e)))?;
        decode(response).await
    }
}

fn build_client(timeout: Duration) -> PortResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PortError::Unexpected(format!("Failed to create HTTP client: {}", e)))
}

fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

/// Pinecone reports bare hostnames; tests and proxies may pass full URLs.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Server errors and throttling are transient; any other rejection is not.
async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> PortResult<R> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = format!("Pinecone returned {}: {}", status, body);
        return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            PortError::Provider(message)
        } else {
            PortError::Unexpected(message)
        });
    }
    response
        .json::<R>()
        .await
        .map_err(|e| PortError::Provider(format!("Malformed Pinecone response: {}", e)))
}

//=========================================================================================
// `RetrievalService` Trait Implementation
//=========================================================================================

#[async_trait]
impl RetrievalService for PineconeAdapter {
    async fn embed_query(&self, text: &str) -> PortResult<Vec<f32>> {
        let url = format!("{}/embed", self.api_base);
        let body = EmbedRequest {
            model: &self.embed_model,
            parameters: EmbedParameters {
                input_type: "query",
                truncate: "END",
            },
            inputs: vec![EmbedInput { text }],
        };

        let response: EmbedResponse =
            retry(&self.retry_policy, "embed_query", || self.post_json(&url, &body)).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|embedding| embedding.values)
            .filter(|values| !values.is_empty())
            .ok_or_else(|| PortError::Provider("Embedding response contained no vector".to_string()))
    }

    async fn query_documents(&self, vector: &[f32], top_k: usize) -> PortResult<Vec<Doc>> {
        let url = format!("{}/query", self.index_host);
        let body = QueryRequest {
            namespace: &self.namespace,
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };

        let response: QueryResponse =
            retry(&self.retry_policy, "query_documents", || self.post_json(&url, &body)).await?;

        let docs: Vec<Doc> = response
            .matches
            .into_iter()
            .map(|hit| {
                let metadata = hit.metadata.unwrap_or_default();
                Doc {
                    id: hit.id,
                    question: metadata.question,
                    text: metadata.answer,
                }
            })
            .collect();
        debug!(count = docs.len(), "Retrieved candidate documents");
        Ok(docs)
    }

    async fn rerank_documents(
        &self,
        query: &str,
        documents: &[Doc],
        top_n: usize,
    ) -> PortResult<Vec<Doc>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.api_base);
        let body = RerankRequest {
            model: &self.rerank_model,
            query,
            documents: documents
                .iter()
                .map(|d| RerankDocument {
                    id: &d.id,
                    question: &d.question,
                    answer: &d.text,
                })
                .collect(),
            top_n,
            rank_fields: ["question"],
            return_documents: true,
            parameters: RerankParameters { truncate: "END" },
        };

        let response: RerankResponse =
            retry(&self.retry_policy, "rerank_documents", || self.post_json(&url, &body)).await?;

        let reranked: Vec<Doc> = response
            .data
            .into_iter()
            .filter_map(|ranked| match ranked.document {
                Some(fields) => Some(Doc {
                    id: fields.id,
                    question: fields.question,
                    text: fields.answer,
                }),
                None => documents.get(ranked.index).cloned(),
            })
            .collect();
        info!(candidates = documents.len(), kept = reranked.len(), "Reranked documents");
        Ok(reranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hosts_get_https() {
        assert_eq!(normalize_host("faq-abc.svc.pinecone.io"), "https://faq-abc.svc.pinecone.io");
        assert_eq!(normalize_host("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
    }

    #[test]
    fn query_request_uses_camel_case_fields() {
        let vector = [0.1_f32, 0.2];
        let body = serde_json::to_value(QueryRequest {
            namespace: "faq",
            vector: &vector,
            top_k: 5,
            include_metadata: true,
            include_values: false,
        })
        .unwrap();
        assert_eq!(body["topK"], 5);
        assert_eq!(body["includeMetadata"], true);
        assert_eq!(body["includeValues"], false);
    }
}
