use std::fmt;
use tracing::info;

/// Style of summary requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMode {
    Concise,
    Detailed,
    BulletPoints,
}

impl SummaryMode {
    /// Parse a request value, falling back to `Concise` for unknown input.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("concise") => SummaryMode::Concise,
            Some("detailed") => SummaryMode::Detailed,
            Some("bullet_points") | Some("bullets") => SummaryMode::BulletPoints,
            Some(other) => {
                info!("Unknown summary type '{}', defaulting to concise", other);
                SummaryMode::Concise
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMode::Concise => "concise",
            SummaryMode::Detailed => "detailed",
            SummaryMode::BulletPoints => "bullet_points",
        }
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mix of question kinds requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizMode {
    Mcq,
    TrueFalse,
    Mixed,
}

impl QuizMode {
    /// Parse a request value, falling back to `Mixed` for unknown input.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("mixed") => QuizMode::Mixed,
            Some("mcq") | Some("multiple_choice") => QuizMode::Mcq,
            Some("true_false") | Some("truefalse") => QuizMode::TrueFalse,
            Some(other) => {
                info!("Unknown question type '{}', defaulting to mixed", other);
                QuizMode::Mixed
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuizMode::Mcq => "mcq",
            QuizMode::TrueFalse => "true_false",
            QuizMode::Mixed => "mixed",
        }
    }

    /// Number of multiple-choice and true/false questions to request.
    pub fn split(&self, num_questions: usize) -> (usize, usize) {
        match self {
            QuizMode::Mcq => (num_questions, 0),
            QuizMode::TrueFalse => (0, num_questions),
            QuizMode::Mixed => {
                let mcq = num_questions / 2;
                (mcq, num_questions - mcq)
            }
        }
    }
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MCQ_FORMAT: &str = "Q: [Clear question here]
A) [First option]
B) [Second option]
C) [Third option]
D) [Fourth option]
Correct: [A/B/C/D]";

const TRUE_FALSE_FORMAT: &str = "Q: [Statement here]
Correct: [True/False]";

pub fn build_summary_prompt(text: &str, mode: SummaryMode) -> String {
    match mode {
        SummaryMode::Concise => {
            format!("Provide a concise summary of this text in 3-5 sentences:\n\n{}", text)
        }
        SummaryMode::Detailed => {
            format!("Provide a detailed summary covering all key points:\n\n{}", text)
        }
        SummaryMode::BulletPoints => format!("Summarize in clear bullet points:\n\n{}", text),
    }
}

/// Prompt for one chunk of a text too long to summarize in a single call.
pub fn build_chunk_summary_prompt(chunk: &str) -> String {
    format!("Summarize this text concisely:\n\n{}", chunk)
}

/// Prompt that merges the per-chunk summaries into the final one.
pub fn build_final_summary_prompt(combined_summaries: &str, mode: SummaryMode) -> String {
    format!(
        "Create a final {} summary from these summaries:\n\n{}",
        mode.as_str().replace('_', " "),
        combined_summaries
    )
}

/// Build the quiz instruction, spelling out the exact line format the
/// quiz parser understands.
pub fn build_quiz_prompt(text: &str, num_questions: usize, mode: QuizMode) -> String {
    match mode {
        QuizMode::Mcq => format!(
            "Generate exactly {} multiple-choice questions from this text.\n\n\
             Format EXACTLY like this for each question:\n{}\n\n\
             Text to generate questions from:\n{}",
            num_questions, MCQ_FORMAT, text
        ),
        QuizMode::TrueFalse => format!(
            "Generate exactly {} true/false questions from this text.\n\n\
             Format EXACTLY like this for each question:\n{}\n\n\
             Text to generate questions from:\n{}",
            num_questions, TRUE_FALSE_FORMAT, text
        ),
        QuizMode::Mixed => {
            let (mcq_count, tf_count) = mode.split(num_questions);
            format!(
                "Generate {} multiple-choice questions and {} true/false questions from this text.\n\n\
                 For MCQ questions, format EXACTLY like this:\n{}\n\n\
                 For True/False questions, format EXACTLY like this:\n{}\n\n\
                 Text to generate questions from:\n{}",
                mcq_count, tf_count, MCQ_FORMAT, TRUE_FALSE_FORMAT, text
            )
        }
    }
}

pub fn build_chat_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are an intelligent AI Study Buddy. Your goal is to help the student learn.

Context from the student's notes:
{}

Student's Question:
{}

Instructions:
1. PRIORITIZE the Context above. Answer based on the notes whenever possible.
2. If the student asks a general question (like "what else is important?" or "give me examples") that isn't in the notes, USE YOUR GENERAL KNOWLEDGE to help them.
3. If you use general knowledge, start your answer with: "This isn't explicitly in your notes, but..."
4. Be encouraging and concise."#,
        context, question
    )
}
