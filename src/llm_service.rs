use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::chunker::chunk_text;
use crate::config::{LLMConfig, QuizConfig};
use crate::llm_providers::{LLMProviderFactory, ModelClient, ModelError};
use crate::models::QuestionRecord;
use crate::prompts::{
    build_chat_prompt, build_chunk_summary_prompt, build_final_summary_prompt, build_quiz_prompt,
    build_summary_prompt, QuizMode, SummaryMode,
};
use crate::quiz_parser::parse_quiz_response;
use crate::quiz_validator::{check_questions, relaxed_threshold};

// Import logging macros
use crate::{log_llm_operation, log_validation};

/// Summaries, quizzes, and answers built on top of a model client.
#[derive(Clone)]
pub struct LLMService {
    client: Arc<dyn ModelClient>,
    quiz: QuizConfig,
}

impl LLMService {
    pub fn new(client: Arc<dyn ModelClient>, quiz: QuizConfig) -> Self {
        Self { client, quiz }
    }

    /// Build the configured HTTP provider.
    pub fn from_config(config: &LLMConfig, quiz: QuizConfig) -> Self {
        let provider = LLMProviderFactory::create_provider(
            config.provider,
            config.api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
            config.timeout(),
        );
        info!(
            provider = provider.provider_name(),
            model = provider.model_name(),
            "LLM service initialized"
        );
        Self::new(Arc::new(provider), quiz)
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    async fn call(&self, operation: &str, prompt: &str) -> Result<String, ModelError> {
        let provider = self.client.provider_name();
        log_llm_operation!(start, operation, provider = provider, input_chars = prompt.len());
        let started = Instant::now();

        let response = self.client.generate(prompt).await;
        match &response {
            Ok(_) => {
                log_llm_operation!(
                    success,
                    operation,
                    provider = provider,
                    duration_ms = started.elapsed().as_millis() as u64
                );
            }
            Err(e) => {
                log_llm_operation!(error, operation, provider = provider, error = e, attempt = 1_usize);
            }
        }
        response
    }

    /// Summarize `text`. Text longer than the configured chunk size is
    /// summarized chunk by chunk, then the partial summaries are condensed.
    pub async fn summarize(&self, text: &str, mode: SummaryMode) -> Result<String, ModelError> {
        let limit = self.quiz.summary_chunk_chars;
        if text.chars().count() <= limit {
            return self.call("summarize", &build_summary_prompt(text, mode)).await;
        }

        let chunks = chunk_text(text, limit);
        info!(chunks = chunks.len(), summary_type = %mode, "Summarizing long text in chunks");

        let mut partials = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let partial = self
                .call("summarize_chunk", &build_chunk_summary_prompt(chunk))
                .await?;
            if partial.trim().is_empty() {
                log_llm_operation!(warn, "summarize_chunk", "empty chunk summary");
            }
            partials.push(partial);
        }

        let combined = partials.join(" ");
        self.call("summarize_final", &build_final_summary_prompt(&combined, mode))
            .await
    }

    /// One generation attempt, returned as raw completion text.
    pub async fn generate_quiz_text(
        &self,
        text: &str,
        num_questions: usize,
        mode: QuizMode,
    ) -> Result<String, ModelError> {
        self.call("generate_quiz", &build_quiz_prompt(text, num_questions, mode))
            .await
    }

    /// Generate a quiz using the configured attempt budget.
    pub async fn generate_validated_quiz(
        &self,
        text: &str,
        num_questions: usize,
        mode: QuizMode,
    ) -> Result<Vec<QuestionRecord>, ModelError> {
        self.generate_validated_quiz_with_attempts(text, num_questions, mode, self.quiz.max_attempts)
            .await
    }

    /// Generate and validate a quiz, retrying rejected output up to
    /// `max_attempts` times. When no attempt passes, the last attempt's
    /// records are returned as they are. Model failures end the loop at once.
    pub async fn generate_validated_quiz_with_attempts(
        &self,
        text: &str,
        num_questions: usize,
        mode: QuizMode,
        max_attempts: usize,
    ) -> Result<Vec<QuestionRecord>, ModelError> {
        let max_attempts = max_attempts.max(1);
        let threshold = relaxed_threshold(num_questions);
        let mut last = Vec::new();

        for attempt in 1..=max_attempts {
            let completion = self.generate_quiz_text(text, num_questions, mode).await?;
            let records = parse_quiz_response(&completion, mode);

            match check_questions(&records, threshold) {
                Ok(()) => {
                    debug!(attempt, questions = records.len(), "Quiz passed validation");
                    return Ok(records);
                }
                Err(failure) => {
                    log_llm_operation!(
                        retry,
                        "generate_quiz",
                        attempt = attempt,
                        max_attempts = max_attempts,
                        reason = failure
                    );
                    log_validation!(failure, "quiz", error = failure);
                    last = records;
                }
            }
        }

        info!(
            questions = last.len(),
            requested = num_questions,
            "Returning unvalidated quiz after final attempt"
        );
        Ok(last)
    }

    /// Answer `question` about the notes in `context`. The prompt asks the
    /// model to rely on the notes first and fall back on general knowledge.
    pub async fn chat(&self, context: &str, question: &str) -> Result<String, ModelError> {
        self.call("chat", &build_chat_prompt(context, question)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Canned {
        replies: Mutex<VecDeque<Result<String, ModelError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(replies: Vec<Result<String, ModelError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelClient for Canned {
        async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }

        fn provider_name(&self) -> &'static str {
            "Canned"
        }

        fn model_name(&self) -> &str {
            "canned-model"
        }
    }

    const TWO_MCQ: &str = "Q: What is 2+2?\nA) 3\nB) 4\nC) 5\nD) 6\nCorrect: B\n\n\
                           Q: Capital of France?\nA) Rome\nB) Madrid\nC) Paris\nD) Berlin\nCorrect: C";

    #[tokio::test]
    async fn test_short_text_summarized_in_one_call() {
        let client = Canned::new(vec![Ok("A short summary.".to_string())]);
        let service = LLMService::new(client.clone(), QuizConfig::default());

        let summary = service.summarize("Cells divide.", SummaryMode::Concise).await.unwrap();
        assert_eq!(summary, "A short summary.");
        assert_eq!(client.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_quiz_prompt_reaches_client() {
        let client = Canned::new(vec![Ok(TWO_MCQ.to_string())]);
        let service = LLMService::new(client.clone(), QuizConfig::default());

        let records = service
            .generate_validated_quiz("Arithmetic and geography.", 3, QuizMode::Mcq)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].correct_answer, "Paris");

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Arithmetic and geography."));
    }

    #[tokio::test]
    async fn test_chat_uses_context() {
        let client = Canned::new(vec![Ok("Mitochondria.".to_string())]);
        let service = LLMService::new(client.clone(), QuizConfig::default());

        let answer = service
            .chat("The mitochondria is the powerhouse of the cell.", "What powers the cell?")
            .await
            .unwrap();
        assert_eq!(answer, "Mitochondria.");
        assert!(client.prompts.lock().unwrap()[0].contains("powerhouse"));
        assert_eq!(service.provider_name(), "Canned");
        assert_eq!(service.model_name(), "canned-model");
    }
}
