//! Turns a free-form quiz completion into [`QuestionRecord`]s.
//!
//! The model is asked to answer in the line format produced by
//! [`crate::prompts::build_quiz_prompt`]:
//!
//! ```text
//! Q: What is 2+2?
//! A) 3
//! B) 4
//! C) 5
//! D) 6
//! Correct: B
//! Q: The sky is blue.
//! Correct: True
//! ```
//!
//! Completions drift from that format, so every block is parsed on its own
//! and a malformed block is skipped with a [`SkipReason`] instead of failing
//! the whole response.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::models::{QuestionKind, QuestionRecord};
use crate::prompts::QuizMode;

const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

static BLOCK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:Q:|\d+\.)").expect("valid regex"));

static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*([A-D])\)").expect("valid regex"));

// Ends a question or option text: the next option line or `Correct:` line.
static FIELD_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n[ \t]*(?:[A-D]\)|(?i:correct:))").expect("valid regex")
});

static CORRECT_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[ \t]*correct:[ \t]*([a-d])\b").expect("valid regex"));

static CORRECT_BOOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[ \t]*correct:[ \t]*(true|false)\b").expect("valid regex"));

static CORRECT_RAW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[ \t]*correct:[ \t]*(\S*)").expect("valid regex"));

/// Why a block produced no question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingQuestionMarker,
    EmptyQuestion,
    IncompleteOptions { found: usize },
    UnresolvedAnswer { given: Option<String> },
    MissingTrueFalseAnswer,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingQuestionMarker => write!(f, "block has no 'Q:' marker"),
            SkipReason::EmptyQuestion => write!(f, "question text is empty"),
            SkipReason::IncompleteOptions { found } => {
                write!(f, "expected 4 options, found {}", found)
            }
            SkipReason::UnresolvedAnswer { given: Some(given) } => {
                write!(f, "correct answer '{}' is not an option letter", given)
            }
            SkipReason::UnresolvedAnswer { given: None } => {
                write!(f, "no 'Correct:' line for multiple-choice question")
            }
            SkipReason::MissingTrueFalseAnswer => write!(f, "no 'Correct: True|False' line"),
        }
    }
}

/// Result of parsing one block of the completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Parsed(QuestionRecord),
    Skipped(SkipReason),
}

/// Split a completion into blocks, one per intended question. A block starts
/// at a line beginning with `Q:` or a numbered list marker such as `3.`.
pub fn split_blocks(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.trim().split('\n') {
        if !current.is_empty() && BLOCK_START.is_match(line) {
            blocks.push(current.join("\n"));
            current.clear();
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks.retain(|block| !block.trim().is_empty());
    blocks
}

/// Text following a marker, up to the next option line, `Correct:` marker,
/// or the end of the block.
fn field_text(rest: &str) -> &str {
    let end = FIELD_BOUNDARY.find(rest).map_or(rest.len(), |m| m.start());
    rest[..end].trim()
}

fn extract_options(block: &str) -> Vec<String> {
    let mut starts: [Option<usize>; 4] = [None; 4];
    for caps in OPTION_LINE.captures_iter(block) {
        let (Some(letter), Some(whole)) = (caps.get(1), caps.get(0)) else {
            continue;
        };
        if let Some(slot) = letter
            .as_str()
            .chars()
            .next()
            .and_then(|c| OPTION_LETTERS.iter().position(|l| *l == c))
        {
            if starts[slot].is_none() {
                starts[slot] = Some(whole.end());
            }
        }
    }

    starts
        .iter()
        .flatten()
        .map(|&start| field_text(&block[start..]).to_string())
        .filter(|option| !option.is_empty())
        .collect()
}

fn letter_index(letter: &str) -> Option<usize> {
    let upper = letter.chars().next()?.to_ascii_uppercase();
    OPTION_LETTERS.iter().position(|l| *l == upper)
}

/// Parse a single block into a question or a skip reason.
pub fn parse_block(block: &str) -> BlockOutcome {
    let Some(marker) = block.find("Q:") else {
        return BlockOutcome::Skipped(SkipReason::MissingQuestionMarker);
    };

    let question = field_text(&block[marker + 2..]);
    if question.is_empty() {
        return BlockOutcome::Skipped(SkipReason::EmptyQuestion);
    }
    let question = question.to_string();

    if OPTION_LINE.is_match(block) {
        let options = extract_options(block);
        if options.len() != OPTION_LETTERS.len() {
            return BlockOutcome::Skipped(SkipReason::IncompleteOptions {
                found: options.len(),
            });
        }

        let answer = CORRECT_LETTER
            .captures(block)
            .and_then(|caps| caps.get(1))
            .and_then(|letter| letter_index(letter.as_str()))
            .and_then(|index| options.get(index).cloned());

        match answer {
            Some(correct_answer) => BlockOutcome::Parsed(QuestionRecord::multiple_choice(
                question,
                options,
                correct_answer,
            )),
            None => {
                let given = CORRECT_RAW
                    .captures(block)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                    .filter(|s| !s.is_empty());
                BlockOutcome::Skipped(SkipReason::UnresolvedAnswer { given })
            }
        }
    } else {
        match CORRECT_BOOL.captures(block).and_then(|caps| caps.get(1)) {
            Some(value) => BlockOutcome::Parsed(QuestionRecord::true_false(
                question,
                value.as_str().eq_ignore_ascii_case("true"),
            )),
            None => BlockOutcome::Skipped(SkipReason::MissingTrueFalseAnswer),
        }
    }
}

/// Parse every block of a completion, keeping the per-block outcome.
pub fn parse_blocks(text: &str) -> Vec<BlockOutcome> {
    split_blocks(text).iter().map(|block| parse_block(block)).collect()
}

/// Parse a completion into question records, dropping malformed blocks.
///
/// `expected` is informational: mixed content is accepted whatever mode was
/// requested.
pub fn parse_quiz_response(text: &str, expected: QuizMode) -> Vec<QuestionRecord> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (index, outcome) in parse_blocks(text).into_iter().enumerate() {
        match outcome {
            BlockOutcome::Parsed(record) => records.push(record),
            BlockOutcome::Skipped(reason) => {
                skipped += 1;
                debug!(block_index = index, reason = %reason, "Skipping quiz block");
            }
        }
    }

    let mismatched = records
        .iter()
        .filter(|r| match expected {
            QuizMode::Mcq => r.kind != QuestionKind::Mcq,
            QuizMode::TrueFalse => r.kind != QuestionKind::TrueFalse,
            QuizMode::Mixed => false,
        })
        .count();

    info!(
        expected_type = %expected,
        parsed = records.len(),
        skipped,
        mismatched_kind = mismatched,
        "Parsed quiz response"
    );

    records
}
