use crate::models::{QuestionKind, QuestionRecord};

/// Number of options a multiple-choice question must carry.
pub const MCQ_OPTION_COUNT: usize = 4;

/// First problem found in a question set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("expected at least {min} questions, got {found}")]
    TooFewQuestions { found: usize, min: usize },

    #[error("question {index} has empty text")]
    EmptyQuestion { index: usize },

    #[error("question {index} has no correct answer")]
    EmptyAnswer { index: usize },

    #[error("multiple-choice question {index} has {found} options, expected 4")]
    WrongOptionCount { index: usize, found: usize },
}

/// Minimum question count accepted from one generation attempt.
pub fn relaxed_threshold(num_questions: usize) -> usize {
    num_questions.saturating_sub(2).max(1)
}

pub fn check_questions(
    questions: &[QuestionRecord],
    min_questions: usize,
) -> Result<(), ValidationFailure> {
    if questions.len() < min_questions {
        return Err(ValidationFailure::TooFewQuestions {
            found: questions.len(),
            min: min_questions,
        });
    }

    for (index, question) in questions.iter().enumerate() {
        if question.question.trim().is_empty() {
            return Err(ValidationFailure::EmptyQuestion { index });
        }
        if question.correct_answer.trim().is_empty() {
            return Err(ValidationFailure::EmptyAnswer { index });
        }
        if question.kind == QuestionKind::Mcq && question.option_count() != MCQ_OPTION_COUNT {
            return Err(ValidationFailure::WrongOptionCount {
                index,
                found: question.option_count(),
            });
        }
    }

    Ok(())
}

pub fn validate_questions(questions: &[QuestionRecord], min_questions: usize) -> bool {
    check_questions(questions, min_questions).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(question: &str, options: &[&str]) -> QuestionRecord {
        QuestionRecord::multiple_choice(
            question.to_string(),
            options.iter().map(|o| o.to_string()).collect(),
            options.first().map(|o| o.to_string()).unwrap_or_default(),
        )
    }

    #[test]
    fn test_empty_set_fails() {
        assert!(!validate_questions(&[], 3));
        assert_eq!(
            check_questions(&[], 3),
            Err(ValidationFailure::TooFewQuestions { found: 0, min: 3 })
        );
    }

    #[test]
    fn test_three_well_formed_mcq_pass() {
        let questions = vec![
            mcq("one", &["a", "b", "c", "d"]),
            mcq("two", &["a", "b", "c", "d"]),
            mcq("three", &["a", "b", "c", "d"]),
        ];
        assert!(validate_questions(&questions, 3));
    }

    #[test]
    fn test_three_option_mcq_fails_regardless_of_count() {
        let questions = vec![
            mcq("one", &["a", "b", "c", "d"]),
            mcq("two", &["a", "b", "c"]),
            mcq("three", &["a", "b", "c", "d"]),
        ];
        assert!(!validate_questions(&questions, 1));
        assert_eq!(
            check_questions(&questions, 0),
            Err(ValidationFailure::WrongOptionCount { index: 1, found: 3 })
        );
    }

    #[test]
    fn test_true_false_exempt_from_option_count() {
        let questions = vec![QuestionRecord::true_false("Sky is blue".to_string(), true)];
        assert!(validate_questions(&questions, 1));
    }

    #[test]
    fn test_empty_fields_fail() {
        let mut question = QuestionRecord::true_false("Statement".to_string(), false);
        question.correct_answer = String::new();
        assert_eq!(
            check_questions(&[question], 1),
            Err(ValidationFailure::EmptyAnswer { index: 0 })
        );

        let blank = QuestionRecord::true_false("  ".to_string(), true);
        assert_eq!(
            check_questions(&[blank], 1),
            Err(ValidationFailure::EmptyQuestion { index: 0 })
        );
    }

    #[test]
    fn test_relaxed_threshold() {
        assert_eq!(relaxed_threshold(5), 3);
        assert_eq!(relaxed_threshold(3), 1);
        assert_eq!(relaxed_threshold(2), 1);
        assert_eq!(relaxed_threshold(0), 1);
        assert_eq!(relaxed_threshold(10), 8);
    }
}
