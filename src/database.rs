use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::models::*;

// Import logging macros
use crate::log_db_operation;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives only as long as its connection, so keep
        // exactly one open for the lifetime of the pool.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        let db = Database { pool };
        db.migrate().await?;
        log_db_operation!(info, "migrate", "database initialized");
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                last_active TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                original_text TEXT NOT NULL,
                text_length INTEGER NOT NULL,
                uploaded_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                note_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                summary_text TEXT NOT NULL,
                summary_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (note_id) REFERENCES notes(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quizzes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                note_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                questions TEXT NOT NULL,
                num_questions INTEGER NOT NULL,
                question_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (note_id) REFERENCES notes(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                quiz_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                score INTEGER NOT NULL,
                total_questions INTEGER NOT NULL,
                percentage REAL NOT NULL,
                completed_at TEXT NOT NULL,
                FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // User operations

    /// Create the user on first sight, otherwise refresh `last_active`.
    pub async fn upsert_user(&self, user_id: &str) -> Result<User> {
        let started = Instant::now();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (user_id, created_at, last_active) VALUES (?1, ?2, ?2)
            ON CONFLICT(user_id) DO UPDATE SET last_active = excluded.last_active
            "#,
        )
        .bind(user_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| anyhow!("User '{}' not found after upsert", user_id))?;
        log_db_operation!(debug, "upsert_user", id = user.id, duration_ms = elapsed_ms(started));
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(User {
                id: row.get("id"),
                user_id: row.get("user_id"),
                created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
                last_active: parse_timestamp(&row.get::<String, _>("last_active"))?,
            })
        })
        .transpose()
    }

    // Note operations

    pub async fn save_note(&self, user_id: &str, filename: &str, original_text: &str) -> Result<Note> {
        let started = Instant::now();
        let note = Note {
            id: 0,
            user_id: user_id.to_string(),
            filename: filename.to_string(),
            original_text: original_text.to_string(),
            text_length: original_text.chars().count() as i64,
            uploaded_at: Utc::now(),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO notes (user_id, filename, original_text, text_length, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&note.user_id)
        .bind(&note.filename)
        .bind(&note.original_text)
        .bind(note.text_length)
        .bind(note.uploaded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let note = Note {
            id: result.last_insert_rowid(),
            ..note
        };
        log_db_operation!(debug, "save_note", id = note.id, duration_ms = elapsed_ms(started));
        Ok(note)
    }

    pub async fn get_note(&self, id: i64) -> Result<Option<Note>> {
        let row = sqlx::query("SELECT * FROM notes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Note {
                id: row.get("id"),
                user_id: row.get("user_id"),
                filename: row.get("filename"),
                original_text: row.get("original_text"),
                text_length: row.get("text_length"),
                uploaded_at: parse_timestamp(&row.get::<String, _>("uploaded_at"))?,
            })
        })
        .transpose()
    }

    /// Newest first, without note bodies.
    pub async fn get_user_notes(&self, user_id: &str, limit: i64) -> Result<Vec<NoteListing>> {
        let started = Instant::now();
        let rows = sqlx::query(
            r#"
            SELECT id, filename, text_length, uploaded_at FROM notes
            WHERE user_id = ?1
            ORDER BY uploaded_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut notes = Vec::with_capacity(rows.len());
        for row in rows {
            notes.push(NoteListing {
                id: row.get("id"),
                filename: row.get("filename"),
                text_length: row.get("text_length"),
                uploaded_at: parse_timestamp(&row.get::<String, _>("uploaded_at"))?,
            });
        }

        log_db_operation!(debug, "get_user_notes", count = notes.len(), duration_ms = elapsed_ms(started));
        Ok(notes)
    }

    // Summary operations

    pub async fn save_summary(
        &self,
        note_id: i64,
        user_id: &str,
        summary_text: &str,
        summary_type: &str,
    ) -> Result<Summary> {
        let started = Instant::now();
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO summaries (note_id, user_id, summary_text, summary_type, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(note_id)
        .bind(user_id)
        .bind(summary_text)
        .bind(summary_type)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let summary = Summary {
            id: result.last_insert_rowid(),
            note_id,
            user_id: user_id.to_string(),
            summary_text: summary_text.to_string(),
            summary_type: summary_type.to_string(),
            created_at,
        };
        log_db_operation!(debug, "save_summary", id = summary.id, duration_ms = elapsed_ms(started));
        Ok(summary)
    }

    /// Newest first.
    pub async fn get_note_summaries(&self, note_id: i64) -> Result<Vec<Summary>> {
        let rows = sqlx::query(
            "SELECT * FROM summaries WHERE note_id = ?1 ORDER BY created_at DESC, id DESC",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            summaries.push(Summary {
                id: row.get("id"),
                note_id: row.get("note_id"),
                user_id: row.get("user_id"),
                summary_text: row.get("summary_text"),
                summary_type: row.get("summary_type"),
                created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            });
        }

        Ok(summaries)
    }

    // Quiz operations

    pub async fn save_quiz(
        &self,
        note_id: i64,
        user_id: &str,
        questions: &[QuestionRecord],
        question_type: &str,
    ) -> Result<Quiz> {
        let started = Instant::now();
        let created_at = Utc::now();
        let questions_json = serde_json::to_string(questions)?;

        let result = sqlx::query(
            r#"
            INSERT INTO quizzes (note_id, user_id, questions, num_questions, question_type, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(note_id)
        .bind(user_id)
        .bind(&questions_json)
        .bind(questions.len() as i64)
        .bind(question_type)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let quiz = Quiz {
            id: result.last_insert_rowid(),
            note_id,
            user_id: user_id.to_string(),
            questions: questions.to_vec(),
            num_questions: questions.len() as i64,
            question_type: question_type.to_string(),
            created_at,
        };
        log_db_operation!(debug, "save_quiz", id = quiz.id, duration_ms = elapsed_ms(started));
        Ok(quiz)
    }

    pub async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>> {
        let row = sqlx::query("SELECT * FROM quizzes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| self.row_to_quiz(&row)).transpose()
    }

    fn row_to_quiz(&self, row: &SqliteRow) -> Result<Quiz> {
        Ok(Quiz {
            id: row.get("id"),
            note_id: row.get("note_id"),
            user_id: row.get("user_id"),
            questions: serde_json::from_str(&row.get::<String, _>("questions"))?,
            num_questions: row.get("num_questions"),
            question_type: row.get("question_type"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        })
    }

    /// Newest first, each joined with its note's filename.
    pub async fn get_user_quizzes(&self, user_id: &str, limit: i64) -> Result<Vec<QuizListing>> {
        let started = Instant::now();
        let rows = sqlx::query(
            r#"
            SELECT q.id, q.num_questions, q.question_type, q.created_at, n.filename
            FROM quizzes q
            JOIN notes n ON q.note_id = n.id
            WHERE q.user_id = ?1
            ORDER BY q.created_at DESC, q.id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut quizzes = Vec::with_capacity(rows.len());
        for row in rows {
            quizzes.push(QuizListing {
                id: row.get("id"),
                num_questions: row.get("num_questions"),
                question_type: row.get("question_type"),
                created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
                filename: row.get("filename"),
            });
        }

        log_db_operation!(debug, "get_user_quizzes", count = quizzes.len(), duration_ms = elapsed_ms(started));
        Ok(quizzes)
    }

    // Result operations

    pub async fn save_quiz_result(
        &self,
        quiz_id: i64,
        user_id: &str,
        score: i64,
        total_questions: i64,
    ) -> Result<QuizResult> {
        let started = Instant::now();
        let percentage = if total_questions > 0 {
            score as f64 / total_questions as f64 * 100.0
        } else {
            0.0
        };
        let completed_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO quiz_results (quiz_id, user_id, score, total_questions, percentage, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(quiz_id)
        .bind(user_id)
        .bind(score)
        .bind(total_questions)
        .bind(percentage)
        .bind(completed_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let quiz_result = QuizResult {
            id: result.last_insert_rowid(),
            quiz_id,
            user_id: user_id.to_string(),
            score,
            total_questions,
            percentage,
            completed_at,
        };
        log_db_operation!(debug, "save_quiz_result", id = quiz_result.id, duration_ms = elapsed_ms(started));
        Ok(quiz_result)
    }

    /// Aggregate counts for one user. Unknown users get all zeros.
    pub async fn get_user_progress(&self, user_id: &str) -> Result<Progress> {
        let notes = sqlx::query(
            "SELECT COUNT(*) AS total, MAX(uploaded_at) AS last_upload FROM notes WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let total_quizzes: i64 = sqlx::query("SELECT COUNT(*) AS total FROM quizzes WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?
            .get("total");

        let results = sqlx::query(
            "SELECT COUNT(*) AS attempts, AVG(percentage) AS average FROM quiz_results WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let average: Option<f64> = results.get("average");
        let last_activity = notes
            .get::<Option<String>, _>("last_upload")
            .map(|s| parse_timestamp(&s))
            .transpose()?;

        Ok(Progress {
            user_id: user_id.to_string(),
            total_notes: notes.get("total"),
            total_quizzes,
            total_attempts: results.get("attempts"),
            average_score: (average.unwrap_or(0.0) * 100.0).round() / 100.0,
            last_activity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_user_is_idempotent() {
        let db = memory_db().await;
        let first = db.upsert_user("student-1").await.unwrap();
        let second = db.upsert_user("student-1").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.last_active >= first.last_active);
        assert!(db.get_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_note_requires_existing_user() {
        let db = memory_db().await;
        assert!(db.save_note("ghost", "a.txt", "text").await.is_err());
    }

    #[tokio::test]
    async fn test_quiz_questions_survive_storage() {
        let db = memory_db().await;
        db.upsert_user("student-1").await.unwrap();
        let note = db.save_note("student-1", "bio.txt", "Cells").await.unwrap();

        let questions = vec![
            QuestionRecord::true_false("Cells divide.".to_string(), true),
            QuestionRecord::multiple_choice(
                "2+2?".to_string(),
                vec!["3".into(), "4".into(), "5".into(), "6".into()],
                "4".to_string(),
            ),
        ];
        let saved = db.save_quiz(note.id, "student-1", &questions, "mixed").await.unwrap();
        let loaded = db.get_quiz(saved.id).await.unwrap().unwrap();

        assert_eq!(loaded.questions, questions);
        assert_eq!(loaded.num_questions, 2);
        assert!(db.get_quiz(saved.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_question_result_has_zero_percentage() {
        let db = memory_db().await;
        db.upsert_user("u").await.unwrap();
        let note = db.save_note("u", "n.txt", "body").await.unwrap();
        let quiz = db.save_quiz(note.id, "u", &[], "mcq").await.unwrap();

        let result = db.save_quiz_result(quiz.id, "u", 0, 0).await.unwrap();
        assert_eq!(result.percentage, 0.0);
    }
}
