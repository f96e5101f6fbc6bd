use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    config::UploadConfig,
    errors::{classify_database_error, ApiError, ErrorContext, ErrorResponse},
    extraction::{extract_text, sanitize_filename, validate_file_size, validate_file_type},
    llm_service::LLMService,
    models::*,
    prompts::{QuizMode, SummaryMode},
    study_service::StudyService,
    text_utils::{count_words, estimate_reading_time, preview_text, validate_text_content},
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

const DEFAULT_NUM_QUESTIONS: usize = 5;
const MAX_NUM_QUESTIONS: usize = 20;
const DEFAULT_LIST_LIMIT: i64 = 10;
const MIN_USEFUL_WORDS: usize = 10;
const WORDS_PER_MINUTE: usize = 200;
// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub study_service: StudyService,
    pub llm_service: LLMService,
    pub upload: UploadConfig,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

impl ListParams {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 100)
    }
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ErrorResponse>;

fn database_failure(operation: &str, resource: &str, error: anyhow::Error) -> ErrorResponse {
    log_api_error!(operation, error = error, "database error");
    classify_database_error(&error).to_response_with_context(ErrorContext::new(operation, resource))
}

fn rejected(operation: &str, resource: &str, message: &str) -> ErrorResponse {
    ApiError::ValidationError(message.to_string())
        .to_response_with_context(ErrorContext::new(operation, resource))
}

// Service info

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "Study Buddy API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /health",
            "POST /api/upload",
            "POST /api/summarize",
            "POST /api/generate-quiz",
            "POST /api/chat",
            "GET /api/progress/:user_id",
            "GET /api/users/:user_id/notes",
            "GET /api/notes/:id",
            "GET /api/notes/:id/summaries",
            "GET /api/users/:user_id/quizzes",
            "GET /api/quizzes/:id",
            "POST /api/quizzes/:id/results",
        ],
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "llm_provider": state.llm_service.provider_name(),
        "llm_model": state.llm_service.model_name(),
    }))
}

// Upload

pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    log_api_start!("upload");

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut user_id: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_failure(e)),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_failure)?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("user_id") => {
                let value = field.text().await.map_err(multipart_failure)?;
                let value = value.trim();
                if !value.is_empty() {
                    user_id = Some(value.to_string());
                }
            }
            other => debug!(field = ?other, "Ignoring unknown multipart field"),
        }
    }

    let (original_name, bytes) = match file {
        Some((name, bytes)) if !name.is_empty() => (name, bytes),
        _ => return Err(rejected("upload", "file", "No file provided")),
    };

    if !validate_file_type(&original_name) {
        return Err(rejected(
            "upload",
            "file",
            "Invalid file type. Allowed types: .txt, .pdf, .docx",
        ));
    }

    if !validate_file_size(bytes.len(), state.upload.max_upload_mb) {
        return Err(ApiError::PayloadTooLarge(format!(
            "File too large. Maximum size: {}MB",
            state.upload.max_upload_mb
        ))
        .to_response_with_context(ErrorContext::new("upload", "file").with_id(&original_name)));
    }

    let filename = sanitize_filename(&original_name);
    let extract_name = filename.clone();
    let text = tokio::task::spawn_blocking(move || extract_text(&bytes, &extract_name))
        .await
        .map_err(|e| {
            ApiError::InternalError(e.to_string())
                .to_response_with_context(ErrorContext::new("upload", "file"))
        })?
        .map_err(|e| {
            ApiError::from(e)
                .to_response_with_context(ErrorContext::new("upload", "file").with_id(&filename))
        })?;

    if !validate_text_content(&text, MIN_USEFUL_WORDS) {
        log_api_warn!("upload", "extracted text is very short");
    }

    let note_id = match user_id.as_deref() {
        Some(user) => {
            let note = state
                .study_service
                .register_note(user, &filename, &text)
                .await
                .map_err(|e| database_failure("upload", "note", e))?;
            Some(note.id)
        }
        None => None,
    };

    let response = UploadResponse {
        filename,
        text_length: text.chars().count(),
        word_count: count_words(&text),
        reading_time_minutes: estimate_reading_time(&text, WORDS_PER_MINUTE),
        text_content: text,
        note_id,
    };

    info!(
        filename = %response.filename,
        words = response.word_count,
        note_id = ?response.note_id,
        "File processed"
    );
    Ok(Json(ApiResponse::success(response)))
}

fn multipart_failure(error: axum::extract::multipart::MultipartError) -> ErrorResponse {
    let context = ErrorContext::new("upload", "file");
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(error.body_text()).to_response_with_context(context)
    } else {
        ApiError::BadRequest(error.body_text()).to_response_with_context(context)
    }
}

/// Text to work on: inline text wins, otherwise the stored note's body.
async fn resolve_source(
    state: &AppState,
    operation: &str,
    text: Option<String>,
    note_id: Option<i64>,
) -> Result<(String, Option<Note>), ErrorResponse> {
    let note = match note_id {
        Some(id) => match state.study_service.get_note(id).await {
            Ok(Some(note)) => Some(note),
            Ok(None) => {
                return Err(ApiError::NotFound(format!("Note {} not found", id))
                    .to_response_with_context(
                        ErrorContext::new(operation, "note").with_id(&id.to_string()),
                    ));
            }
            Err(e) => return Err(database_failure(operation, "note", e)),
        },
        None => None,
    };

    let text = match (text.filter(|t| !t.trim().is_empty()), note.as_ref()) {
        (Some(text), _) => text,
        (None, Some(note)) => note.original_text.clone(),
        (None, None) => {
            return Err(rejected(operation, "text", "Either text or note_id is required"));
        }
    };

    Ok((text, note))
}

// Summaries

pub async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> ApiResult<SummaryResponse> {
    log_api_start!("summarize");

    let mode = SummaryMode::parse_or_default(request.summary_type.as_deref());
    let (text, note) = resolve_source(&state, "summarize", request.text, request.note_id).await?;

    let summary = state
        .llm_service
        .summarize(&text, mode)
        .await
        .map_err(|e| {
            ApiError::from(e).to_response_with_context(
                ErrorContext::new("summarize", "summary")
                    .with_user_message("Failed to generate summary"),
            )
        })?;

    let summary_id = match note {
        Some(note) => {
            let owner = request.user_id.unwrap_or(note.user_id);
            let saved = state
                .study_service
                .record_summary(note.id, &owner, &summary, mode.as_str())
                .await
                .map_err(|e| database_failure("summarize", "summary", e))?;
            Some(saved.id)
        }
        None => None,
    };

    debug!(preview = %preview_text(&summary, 200), "Summary generated");
    log_api_success!("summarize", "summary generated");

    Ok(Json(ApiResponse::success(SummaryResponse {
        original_length: text.chars().count(),
        summary_length: summary.chars().count(),
        summary,
        summary_type: mode.as_str().to_string(),
        summary_id,
    })))
}

pub async fn get_note_summaries(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
) -> ApiResult<Vec<Summary>> {
    log_api_start!("get_note_summaries", note_id = note_id);

    let summaries = state
        .study_service
        .list_summaries(note_id)
        .await
        .map_err(|e| database_failure("get_note_summaries", "summary", e))?;

    log_api_success!("get_note_summaries", count = summaries.len(), "summaries listed");
    Ok(Json(ApiResponse::success(summaries)))
}

// Quizzes

pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(request): Json<QuizRequest>,
) -> ApiResult<QuizResponse> {
    log_api_start!("generate_quiz");

    let num_questions = request.num_questions.unwrap_or(DEFAULT_NUM_QUESTIONS);
    if !(1..=MAX_NUM_QUESTIONS).contains(&num_questions) {
        return Err(rejected(
            "generate_quiz",
            "quiz",
            "num_questions must be between 1 and 20",
        ));
    }

    let mode = QuizMode::parse_or_default(request.question_type.as_deref());
    let (text, note) = resolve_source(&state, "generate_quiz", request.text, request.note_id).await?;

    let questions = state
        .llm_service
        .generate_validated_quiz(&text, num_questions, mode)
        .await
        .map_err(|e| {
            ApiError::from(e).to_response_with_context(
                ErrorContext::new("generate_quiz", "quiz")
                    .with_user_message("Failed to generate quiz"),
            )
        })?;

    if questions.is_empty() {
        log_api_warn!("generate_quiz", "model output contained no usable questions");
    }

    let quiz_id = match note {
        Some(note) => {
            let owner = request.user_id.unwrap_or(note.user_id);
            let saved = state
                .study_service
                .record_quiz(note.id, &owner, &questions, mode.as_str())
                .await
                .map_err(|e| database_failure("generate_quiz", "quiz", e))?;
            Some(saved.id)
        }
        None => None,
    };

    log_api_success!("generate_quiz", count = questions.len(), "quiz generated");
    Ok(Json(ApiResponse::success(QuizResponse { questions, quiz_id })))
}

pub async fn get_quiz(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Quiz> {
    log_api_start!("get_quiz", quiz_id = id);

    match state.study_service.get_quiz(id).await {
        Ok(Some(quiz)) => Ok(Json(ApiResponse::success(quiz))),
        Ok(None) => Err(ApiError::NotFound(format!("Quiz {} not found", id))
            .to_response_with_context(ErrorContext::new("get_quiz", "quiz").with_id(&id.to_string()))),
        Err(e) => Err(database_failure("get_quiz", "quiz", e)),
    }
}

pub async fn list_user_quizzes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<QuizListing>> {
    log_api_start!("list_user_quizzes", user_id = user_id);

    let quizzes = state
        .study_service
        .list_quizzes(&user_id, params.limit())
        .await
        .map_err(|e| database_failure("list_user_quizzes", "quiz", e))?;

    log_api_success!("list_user_quizzes", count = quizzes.len(), "quizzes listed");
    Ok(Json(ApiResponse::success(quizzes)))
}

pub async fn submit_quiz_result(
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
    Json(request): Json<SubmitQuizRequest>,
) -> ApiResult<QuizResult> {
    log_api_start!("submit_quiz_result", quiz_id = quiz_id);

    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(rejected("submit_quiz_result", "quiz_result", "user_id is required"));
    }

    match state
        .study_service
        .submit_quiz_result(quiz_id, user_id, &request.answers)
        .await
    {
        Ok(Some(result)) => {
            log_api_success!("submit_quiz_result", user_id = user_id, "result recorded");
            Ok(Json(ApiResponse::success(result)))
        }
        Ok(None) => Err(ApiError::NotFound(format!("Quiz {} not found", quiz_id))
            .to_response_with_context(
                ErrorContext::new("submit_quiz_result", "quiz").with_id(&quiz_id.to_string()),
            )),
        Err(e) => Err(database_failure("submit_quiz_result", "quiz_result", e)),
    }
}

// Chat

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    log_api_start!("chat");

    if request.question.trim().is_empty() {
        return Err(rejected("chat", "question", "question is required"));
    }
    if request.context.trim().is_empty() {
        return Err(rejected("chat", "context", "context is required"));
    }

    let answer = state
        .llm_service
        .chat(&request.context, &request.question)
        .await
        .map_err(|e| {
            ApiError::from(e).to_response_with_context(ErrorContext::new("chat", "answer"))
        })?;

    log_api_success!("chat", "question answered");
    Ok(Json(ApiResponse::success(ChatResponse { answer })))
}

// Notes and progress

pub async fn get_note(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Note> {
    log_api_start!("get_note", note_id = id);

    match state.study_service.get_note(id).await {
        Ok(Some(note)) => Ok(Json(ApiResponse::success(note))),
        Ok(None) => Err(ApiError::NotFound(format!("Note {} not found", id))
            .to_response_with_context(ErrorContext::new("get_note", "note").with_id(&id.to_string()))),
        Err(e) => Err(database_failure("get_note", "note", e)),
    }
}

pub async fn list_user_notes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<NoteListing>> {
    log_api_start!("list_user_notes", user_id = user_id);

    let notes = state
        .study_service
        .list_notes(&user_id, params.limit())
        .await
        .map_err(|e| database_failure("list_user_notes", "note", e))?;

    log_api_success!("list_user_notes", count = notes.len(), "notes listed");
    Ok(Json(ApiResponse::success(notes)))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Progress> {
    log_api_start!("get_progress", user_id = user_id);

    let progress = state
        .study_service
        .get_progress(&user_id)
        .await
        .map_err(|e| database_failure("get_progress", "progress", e))?;

    Ok(Json(ApiResponse::success(progress)))
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.upload.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        // Documents
        .route("/api/upload", post(upload_file))
        .route("/api/users/:user_id/notes", get(list_user_notes))
        .route("/api/notes/:id", get(get_note))
        .route("/api/notes/:id/summaries", get(get_note_summaries))
        // AI operations
        .route("/api/summarize", post(summarize))
        .route("/api/generate-quiz", post(generate_quiz))
        .route("/api/chat", post(chat))
        // Quizzes and progress
        .route("/api/users/:user_id/quizzes", get(list_user_quizzes))
        .route("/api/quizzes/:id", get(get_quiz))
        .route("/api/quizzes/:id/results", post(submit_quiz_result))
        .route("/api/progress/:user_id", get(get_progress))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
