use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a generated quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Mcq,
    TrueFalse,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Mcq => write!(f, "mcq"),
            QuestionKind::TrueFalse => write!(f, "true_false"),
        }
    }
}

/// A single parsed quiz question.
///
/// For `Mcq` records `options` holds the four option texts and
/// `correct_answer` is the text of one of them. For `TrueFalse` records
/// `options` is `None` and `correct_answer` is `"True"` or `"False"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
}

impl QuestionRecord {
    pub fn multiple_choice(question: String, options: Vec<String>, correct_answer: String) -> Self {
        Self {
            question,
            kind: QuestionKind::Mcq,
            options: Some(options),
            correct_answer,
        }
    }

    pub fn true_false(question: String, answer: bool) -> Self {
        Self {
            question,
            kind: QuestionKind::TrueFalse,
            options: None,
            correct_answer: if answer { "True" } else { "False" }.to_string(),
        }
    }

    pub fn option_count(&self) -> usize {
        self.options.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub user_id: String,
    pub filename: String,
    pub original_text: String,
    pub text_length: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Note row without its body, used for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteListing {
    pub id: i64,
    pub filename: String,
    pub text_length: i64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub id: i64,
    pub note_id: i64,
    pub user_id: String,
    pub summary_text: String,
    pub summary_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub note_id: i64,
    pub user_id: String,
    pub questions: Vec<QuestionRecord>,
    pub num_questions: i64,
    pub question_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizListing {
    pub id: i64,
    pub num_questions: i64,
    pub question_type: String,
    pub created_at: DateTime<Utc>,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: String,
    pub score: i64,
    pub total_questions: i64,
    pub percentage: f64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub user_id: String,
    pub total_notes: i64,
    pub total_quizzes: i64,
    pub total_attempts: i64,
    pub average_score: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

// Request bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub text: Option<String>,
    pub note_id: Option<i64>,
    pub user_id: Option<String>,
    pub summary_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizRequest {
    pub text: Option<String>,
    pub note_id: Option<i64>,
    pub user_id: Option<String>,
    pub num_questions: Option<usize>,
    pub question_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuizRequest {
    pub user_id: String,
    pub answers: Vec<String>,
}

// Response bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub text_content: String,
    pub text_length: usize,
    pub word_count: usize,
    pub reading_time_minutes: usize,
    pub note_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub original_length: usize,
    pub summary_length: usize,
    pub summary_type: String,
    pub summary_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResponse {
    pub questions: Vec<QuestionRecord>,
    pub quiz_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}
