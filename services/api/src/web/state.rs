//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use support_chat_core::ports::{
    AnswerGenerationService, CategoryClassificationService, DatabaseService, RetrievalService,
};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub retrieval_adapter: Arc<dyn RetrievalService>,
    pub classifier_adapter: Arc<dyn CategoryClassificationService>,
    pub answer_adapter: Arc<dyn AnswerGenerationService>,
}
