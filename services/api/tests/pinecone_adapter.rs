//! Pinecone retrieval adapter tests against a `wiremock` mock server.

use serde_json::json;
use std::time::Duration;
use support_chat_api::{adapters::PineconeAdapter, config::PineconeSettings};
use support_chat_core::{Doc, PortError, RetrievalService, RetryPolicy};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn settings(base_url: &str) -> PineconeSettings {
    PineconeSettings {
        api_key: "pc-test".to_string(),
        index_name: "faq".to_string(),
        index_host: None,
        namespace: "faq-ns".to_string(),
        api_base: base_url.to_string(),
        embed_model: "llama-text-embed-v2".to_string(),
        rerank_model: "bge-reranker-v2-m3".to_string(),
    }
}

fn make_adapter(server: &MockServer, attempts: u32) -> PineconeAdapter {
    PineconeAdapter::new(
        &settings(&server.uri()),
        &server.uri(),
        Duration::from_secs(5),
        RetryPolicy::new(attempts, Duration::ZERO),
    )
    .expect("adapter")
}

fn doc(id: &str, question: &str, answer: &str) -> Doc {
    Doc {
        id: id.to_string(),
        question: question.to_string(),
        text: answer.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Embed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn embed_sends_a_query_embedding_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(header("Api-Key", "pc-test"))
        .and(body_partial_json(json!({
            "model": "llama-text-embed-v2",
            "parameters": { "input_type": "query", "truncate": "END" },
            "inputs": [{ "text": "Refund policy?" }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama-text-embed-v2",
            "vector_type": "dense",
            "data": [{ "values": [0.25, -0.5, 1.0] }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vector = make_adapter(&server, 1)
        .embed_query("Refund policy?")
        .await
        .expect("embedding");

    assert_eq!(vector, vec![0.25, -0.5, 1.0]);
}

#[tokio::test]
async fn embed_without_a_vector_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let result = make_adapter(&server, 1).embed_query("anything").await;

    assert!(matches!(result, Err(PortError::Provider(_))));
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "values": [1.0] }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vector = make_adapter(&server, 3).embed_query("retry me").await.unwrap();

    assert_eq!(vector, vec![1.0]);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
        .expect(1)
        .mount(&server)
        .await;

    let result = make_adapter(&server, 5).embed_query("anything").await;

    assert!(matches!(result, Err(PortError::Unexpected(msg)) if msg.contains("bad model")));
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[tokio::test]
async fn query_maps_metadata_into_docs_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({
            "namespace": "faq-ns",
            "topK": 5,
            "includeMetadata": true,
            "includeValues": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {
                    "id": "faq-002",
                    "score": 0.91,
                    "metadata": {
                        "question": "What is the refund policy?",
                        "answer": "Refunds are issued within 5 business days."
                    }
                },
                { "id": "faq-009", "score": 0.40 }
            ],
            "namespace": "faq-ns"
        })))
        .mount(&server)
        .await;

    let docs = make_adapter(&server, 1)
        .query_documents(&[0.1, 0.2], 5)
        .await
        .unwrap();

    assert_eq!(
        docs,
        vec![
            doc(
                "faq-002",
                "What is the refund policy?",
                "Refunds are issued within 5 business days."
            ),
            doc("faq-009", "", ""),
        ]
    );
}

// ---------------------------------------------------------------------------
// Rerank
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rerank_returns_documents_in_rank_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .and(body_partial_json(json!({
            "model": "bge-reranker-v2-m3",
            "query": "Refund policy?",
            "top_n": 1,
            "rank_fields": ["question"],
            "return_documents": true,
            "parameters": { "truncate": "END" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "bge-reranker-v2-m3",
            "data": [{
                "index": 1,
                "score": 0.97,
                "document": {
                    "id": "faq-002",
                    "question": "What is the refund policy?",
                    "answer": "Refunds are issued within 5 business days."
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let candidates = vec![
        doc("faq-001", "How do I reset my password?", "Use the reset link."),
        doc(
            "faq-002",
            "What is the refund policy?",
            "Refunds are issued within 5 business days.",
        ),
    ];
    let reranked = make_adapter(&server, 1)
        .rerank_documents("Refund policy?", &candidates, 1)
        .await
        .unwrap();

    assert_eq!(reranked, vec![candidates[1].clone()]);
}

#[tokio::test]
async fn rerank_falls_back_to_the_candidate_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "index": 0, "score": 0.5 }]
        })))
        .mount(&server)
        .await;

    let candidates = vec![doc("faq-001", "q", "a")];
    let reranked = make_adapter(&server, 1)
        .rerank_documents("q", &candidates, 1)
        .await
        .unwrap();

    assert_eq!(reranked, candidates);
}

#[tokio::test]
async fn rerank_of_nothing_makes_no_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let reranked = make_adapter(&server, 1)
        .rerank_documents("q", &[], 1)
        .await
        .unwrap();

    assert!(reranked.is_empty());
}

// ---------------------------------------------------------------------------
// Index host resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_resolves_the_index_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/faq"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "faq",
            "host": server.uri(),
            "dimension": 1024,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matches": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = PineconeAdapter::connect(
        &settings(&server.uri()),
        Duration::from_secs(5),
        RetryPolicy::new(1, Duration::ZERO),
    )
    .await
    .expect("connect");
    let docs = adapter.query_documents(&[0.3], 3).await.unwrap();

    assert!(docs.is_empty());
}
