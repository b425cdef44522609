//! Shared fixtures for the API integration tests.
//!
//! In-memory fakes stand in for every port so the real axum router can be
//! driven end to end without Postgres or any model provider.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use support_chat_api::{
    config::Config,
    web::{router, state::AppState},
};
use support_chat_core::{
    AnswerGenerationService, AppendOutcome, Category, CategoryClassificationService, Chat,
    DatabaseService, Doc, Message, PortError, PortResult, RetrievalService, RetryPolicy, User,
    UserCredentials,
};
use tower::ServiceExt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DbState {
    users: HashMap<Uuid, (User, String)>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    chats: Vec<Chat>,
}

/// An in-memory `DatabaseService` that counts chat mutations.
#[derive(Default)]
pub struct FakeDb {
    state: Mutex<DbState>,
    chat_writes: AtomicUsize,
    /// Makes `append_messages` behave as if the chat vanished after it was read.
    pub append_misses: AtomicBool,
    /// Makes `create_chat` behave as if the user vanished after the lookup.
    pub user_vanishes_on_create: AtomicBool,
}

impl FakeDb {
    /// Inserts a user directly, bypassing registration.
    pub fn seed_user(&self, name: &str) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            is_admin: false,
            created_at: Utc::now(),
        };
        let id = user.id;
        self.state
            .lock()
            .unwrap()
            .users
            .insert(id, (user, String::new()));
        id
    }

    /// Issues a token for `user_id` without going through login.
    pub fn seed_token(&self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().to_string();
        self.state
            .lock()
            .unwrap()
            .sessions
            .insert(token.clone(), (user_id, Utc::now() + chrono::Duration::hours(1)));
        token
    }

    pub fn chat(&self, chat_id: Uuid) -> Option<Chat> {
        let state = self.state.lock().unwrap();
        state.chats.iter().find(|c| c.id == chat_id).cloned()
    }

    pub fn chat_count(&self) -> usize {
        self.state.lock().unwrap().chats.len()
    }

    /// Number of create/append/delete calls that reached the store.
    pub fn chat_writes(&self) -> usize {
        self.chat_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseService for FakeDb {
    async fn create_user(&self, name: &str, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut state = self.state.lock().unwrap();
        if state.users.values().any(|(u, _)| u.email == email) {
            return Err(PortError::AlreadyExists(
                "User already registered with this email".to_string(),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            is_admin: false,
            created_at: Utc::now(),
        };
        state
            .users
            .insert(user.id, (user.clone(), hashed_password.to_string()));
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let state = self.state.lock().unwrap();
        state
            .users
            .get(&user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let state = self.state.lock().unwrap();
        state
            .users
            .values()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                user_id: u.id,
                email: u.email.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let state = self.state.lock().unwrap();
        match state.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.state.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn create_chat(&self, user_id: Uuid, title: &str, messages: &[Message]) -> PortResult<Chat> {
        self.chat_writes.fetch_add(1, Ordering::SeqCst);
        if self.user_vanishes_on_create.load(Ordering::SeqCst) {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            messages: messages.to_vec(),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().chats.push(chat.clone());
        Ok(chat)
    }

    async fn append_messages(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        messages: &[Message],
    ) -> PortResult<AppendOutcome> {
        self.chat_writes.fetch_add(1, Ordering::SeqCst);
        if self.append_misses.load(Ordering::SeqCst) {
            return Ok(AppendOutcome::NotFound);
        }
        let mut state = self.state.lock().unwrap();
        match state
            .chats
            .iter_mut()
            .find(|c| c.id == chat_id && c.user_id == user_id)
        {
            Some(chat) => {
                chat.messages.extend_from_slice(messages);
                Ok(AppendOutcome::Persisted)
            }
            None => Ok(AppendOutcome::NotFound),
        }
    }

    async fn get_chat(&self, chat_id: Uuid, user_id: Uuid) -> PortResult<Chat> {
        let state = self.state.lock().unwrap();
        state
            .chats
            .iter()
            .find(|c| c.id == chat_id && c.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Chat not found".to_string()))
    }

    async fn list_chats_for_user(&self, user_id: Uuid) -> PortResult<Vec<Chat>> {
        let state = self.state.lock().unwrap();
        let mut chats: Vec<Chat> = state
            .chats
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats)
    }

    async fn delete_chat(&self, chat_id: Uuid, user_id: Uuid) -> PortResult<()> {
        self.chat_writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let before = state.chats.len();
        state
            .chats
            .retain(|c| !(c.id == chat_id && c.user_id == user_id));
        if state.chats.len() == before {
            return Err(PortError::NotFound("Chat not found".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Returns a fixed category and records how often it was asked.
#[derive(Default)]
pub struct FakeClassifier {
    pub category: Option<Category>,
    pub calls: AtomicUsize,
    /// Never answers, like a model endpoint that accepts the connection and stalls.
    pub hang: bool,
}

#[async_trait]
impl CategoryClassificationService for FakeClassifier {
    async fn classify_category(&self, _query: &str) -> Option<Category> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.category.clone()
    }
}

/// Serves a fixed corpus; records every embedded query text.
#[derive(Default)]
pub struct FakeRetrieval {
    pub docs: Vec<Doc>,
    pub fail: bool,
    pub embedded: Mutex<Vec<String>>,
    pub reranked_against: Mutex<Vec<String>>,
}

#[async_trait]
impl RetrievalService for FakeRetrieval {
    async fn embed_query(&self, text: &str) -> PortResult<Vec<f32>> {
        if self.fail {
            return Err(PortError::Provider("vector index unavailable".to_string()));
        }
        self.embedded.lock().unwrap().push(text.to_string());
        Ok(vec![0.5; 4])
    }

    async fn query_documents(&self, _vector: &[f32], top_k: usize) -> PortResult<Vec<Doc>> {
        Ok(self.docs.iter().take(top_k).cloned().collect())
    }

    async fn rerank_documents(&self, query: &str, documents: &[Doc], top_n: usize) -> PortResult<Vec<Doc>> {
        self.reranked_against.lock().unwrap().push(query.to_string());
        Ok(documents.iter().take(top_n).cloned().collect())
    }
}

/// Echoes a canned answer and records the history it was handed.
#[derive(Default)]
pub struct FakeAnswer {
    pub fail: bool,
    pub hang: bool,
    pub calls: AtomicUsize,
    pub seen_history: Mutex<Vec<Vec<Message>>>,
    pub seen_docs: Mutex<Vec<Vec<Doc>>>,
}

#[async_trait]
impl AnswerGenerationService for FakeAnswer {
    async fn generate_answer(
        &self,
        user_query: &str,
        docs: &[Doc],
        prev_messages: &[Message],
    ) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(PortError::Provider("model offline".to_string()));
        }
        self.seen_history.lock().unwrap().push(prev_messages.to_vec());
        self.seen_docs.lock().unwrap().push(docs.to_vec());
        Ok(format!("Answer to: {}", user_query))
    }
}

// ---------------------------------------------------------------------------
// App wiring
// ---------------------------------------------------------------------------

pub fn test_config() -> Config {
    let env: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://unused/test"),
        ("PINECONE_API_KEY", "pc-test"),
        ("PINECONE_INDEX_NAME", "faq"),
        ("ENVIRONMENT", "local"),
    ]);
    let mut config = Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
        .expect("test config");
    config.retry_policy = RetryPolicy::new(1, Duration::ZERO);
    config
}

pub fn faq_docs() -> Vec<Doc> {
    vec![
        Doc {
            id: "faq-001".to_string(),
            question: "How do I reset my password?".to_string(),
            text: "Use the 'Forgot password' link on the sign-in page.".to_string(),
        },
        Doc {
            id: "faq-002".to_string(),
            question: "What is the refund policy?".to_string(),
            text: "Refunds are issued within 5 business days.".to_string(),
        },
    ]
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<FakeDb>,
    pub classifier: Arc<FakeClassifier>,
    pub retrieval: Arc<FakeRetrieval>,
    pub answer: Arc<FakeAnswer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(FakeClassifier::default(), FakeRetrieval {
            docs: faq_docs(),
            ..Default::default()
        }, FakeAnswer::default())
    }

    pub fn with(classifier: FakeClassifier, retrieval: FakeRetrieval, answer: FakeAnswer) -> Self {
        Self::with_config(test_config(), classifier, retrieval, answer)
    }

    pub fn with_config(
        config: Config,
        classifier: FakeClassifier,
        retrieval: FakeRetrieval,
        answer: FakeAnswer,
    ) -> Self {
        let db = Arc::new(FakeDb::default());
        let classifier = Arc::new(classifier);
        let retrieval = Arc::new(retrieval);
        let answer = Arc::new(answer);
        let app_state = Arc::new(AppState {
            db: db.clone(),
            config: Arc::new(config),
            retrieval_adapter: retrieval.clone(),
            classifier_adapter: classifier.clone(),
            answer_adapter: answer.clone(),
        });
        Self {
            router: router(app_state),
            db,
            classifier,
            retrieval,
            answer,
        }
    }

    /// Sends one request through the router and decodes the JSON body (Null when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn post_chat(&self, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, "/chats", None, Some(body)).await
    }
}
