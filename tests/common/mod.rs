#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use study_buddy::config::{QuizConfig, UploadConfig};
use study_buddy::{create_router, AppState, Database, LLMService, ModelClient, ModelError, StudyService};

/// In-process model that replays queued replies and records every prompt.
/// Once the queue is drained it keeps answering with `fallback`.
pub struct ScriptedModelClient {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModelClient {
    pub fn new(replies: Vec<Result<String, ModelError>>) -> Arc<Self> {
        Self::with_fallback(replies, "")
    }

    pub fn with_fallback(replies: Vec<Result<String, ModelError>>, fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback: fallback.to_string(),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn provider_name(&self) -> &'static str {
        "Scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-1"
    }
}

pub fn unavailable() -> ModelError {
    ModelError::Api {
        provider: "Scripted",
        status: 429,
        message: "quota exceeded".to_string(),
    }
}

pub const FOUR_MCQ: &str = "\
Q: What is 2+2?
A) 3
B) 4
C) 5
D) 6
Correct: B

Q: Which planet is known as the red planet?
A) Venus
B) Jupiter
C) Mars
D) Saturn
Correct: C

Q: What gas do plants absorb?
A) Oxygen
B) Carbon dioxide
C) Nitrogen
D) Helium
Correct: B

Q: How many legs does a spider have?
A) Six
B) Eight
C) Ten
D) Twelve
Correct: B";

pub const ONE_BROKEN_MCQ: &str = "\
Q: What is the powerhouse of the cell?
A) Nucleus
B) Mitochondria
C) Ribosome
Correct: B";

pub const ONE_TRUE_FALSE: &str = "\
Q: The sun is a star.
Correct: True";

pub const NOTE_TEXT: &str = "Photosynthesis converts light energy into chemical energy. \
Plants absorb carbon dioxide and release oxygen during the process.";

pub async fn memory_database() -> Database {
    Database::new("sqlite::memory:").await.unwrap()
}

pub fn service_with(client: Arc<ScriptedModelClient>) -> LLMService {
    LLMService::new(client, QuizConfig::default())
}

pub async fn test_state(client: Arc<ScriptedModelClient>, max_upload_mb: u64) -> AppState {
    AppState {
        study_service: StudyService::new(memory_database().await),
        llm_service: service_with(client),
        upload: UploadConfig { max_upload_mb },
    }
}

pub async fn test_server(client: Arc<ScriptedModelClient>) -> axum_test::TestServer {
    let state = test_state(client, 1).await;
    axum_test::TestServer::new(create_router(state)).unwrap()
}
