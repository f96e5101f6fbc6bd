use anyhow::Result;

use crate::database::Database;
use crate::models::*;

const OPTION_LETTERS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Clone)]
pub struct StudyService {
    db: Database,
}

impl StudyService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // Notes
    pub async fn register_note(&self, user_id: &str, filename: &str, text: &str) -> Result<Note> {
        self.db.upsert_user(user_id).await?;
        self.db.save_note(user_id, filename, text).await
    }

    pub async fn get_note(&self, id: i64) -> Result<Option<Note>> {
        self.db.get_note(id).await
    }

    pub async fn list_notes(&self, user_id: &str, limit: i64) -> Result<Vec<NoteListing>> {
        self.db.get_user_notes(user_id, limit).await
    }

    // Summaries
    pub async fn record_summary(
        &self,
        note_id: i64,
        user_id: &str,
        summary_text: &str,
        summary_type: &str,
    ) -> Result<Summary> {
        self.db.upsert_user(user_id).await?;
        self.db
            .save_summary(note_id, user_id, summary_text, summary_type)
            .await
    }

    pub async fn list_summaries(&self, note_id: i64) -> Result<Vec<Summary>> {
        self.db.get_note_summaries(note_id).await
    }

    // Quizzes
    pub async fn record_quiz(
        &self,
        note_id: i64,
        user_id: &str,
        questions: &[QuestionRecord],
        question_type: &str,
    ) -> Result<Quiz> {
        self.db.upsert_user(user_id).await?;
        self.db
            .save_quiz(note_id, user_id, questions, question_type)
            .await
    }

    pub async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>> {
        self.db.get_quiz(id).await
    }

    pub async fn list_quizzes(&self, user_id: &str, limit: i64) -> Result<Vec<QuizListing>> {
        self.db.get_user_quizzes(user_id, limit).await
    }

    /// Grade `answers` against `quiz` and store the result. Returns `None`
    /// when the quiz does not exist.
    pub async fn submit_quiz_result(
        &self,
        quiz_id: i64,
        user_id: &str,
        answers: &[String],
    ) -> Result<Option<QuizResult>> {
        let quiz = match self.db.get_quiz(quiz_id).await? {
            Some(quiz) => quiz,
            None => return Ok(None),
        };

        let score = grade_answers(&quiz, answers);
        self.db.upsert_user(user_id).await?;
        let result = self
            .db
            .save_quiz_result(quiz_id, user_id, score, quiz.questions.len() as i64)
            .await?;
        Ok(Some(result))
    }

    pub async fn get_progress(&self, user_id: &str) -> Result<Progress> {
        self.db.get_user_progress(user_id).await
    }
}

/// Number of answers that match their question. Answers beyond the last
/// question are ignored; missing answers count as wrong.
pub fn grade_answers(quiz: &Quiz, answers: &[String]) -> i64 {
    quiz.questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| is_correct(question, answer))
        .count() as i64
}

fn is_correct(question: &QuestionRecord, answer: &str) -> bool {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case(question.correct_answer.trim()) {
        return true;
    }

    let Some(options) = question.options.as_ref() else {
        return false;
    };
    options
        .iter()
        .position(|option| option == &question.correct_answer)
        .and_then(|index| OPTION_LETTERS.get(index))
        .is_some_and(|letter| answer.eq_ignore_ascii_case(letter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quiz(questions: Vec<QuestionRecord>) -> Quiz {
        Quiz {
            id: 1,
            note_id: 1,
            user_id: "u".to_string(),
            num_questions: questions.len() as i64,
            questions,
            question_type: "mixed".to_string(),
            created_at: Utc::now(),
        }
    }

    fn sample() -> Quiz {
        quiz(vec![
            QuestionRecord::true_false("Water boils at 100C at sea level.".to_string(), true),
            QuestionRecord::multiple_choice(
                "What is 2+2?".to_string(),
                vec!["3".into(), "4".into(), "5".into(), "6".into()],
                "4".to_string(),
            ),
        ])
    }

    #[test]
    fn test_grade_by_text_and_letter() {
        let quiz = sample();
        assert_eq!(grade_answers(&quiz, &["true".into(), " 4 ".into()]), 2);
        assert_eq!(grade_answers(&quiz, &["True".into(), "b".into()]), 2);
        assert_eq!(grade_answers(&quiz, &["False".into(), "A".into()]), 0);
    }

    #[test]
    fn test_missing_and_extra_answers() {
        let quiz = sample();
        assert_eq!(grade_answers(&quiz, &["True".into()]), 1);
        assert_eq!(grade_answers(&quiz, &["True".into(), "4".into(), "extra".into()]), 2);
        assert_eq!(grade_answers(&quiz, &[]), 0);
    }

    #[test]
    fn test_letter_does_not_match_true_false() {
        let quiz = quiz(vec![QuestionRecord::true_false("Q".to_string(), false)]);
        assert_eq!(grade_answers(&quiz, &["A".into()]), 0);
    }
}
