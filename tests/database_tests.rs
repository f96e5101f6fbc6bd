mod common;

use common::*;
use study_buddy::{QuestionRecord, StudyService};

fn sample_questions() -> Vec<QuestionRecord> {
    vec![
        QuestionRecord::multiple_choice(
            "What do plants absorb?".to_string(),
            vec![
                "Oxygen".to_string(),
                "Carbon dioxide".to_string(),
                "Nitrogen".to_string(),
                "Helium".to_string(),
            ],
            "Carbon dioxide".to_string(),
        ),
        QuestionRecord::true_false("Plants release oxygen.".to_string(), true),
    ]
}

#[tokio::test]
async fn test_register_note_creates_user() {
    let db = memory_database().await;
    let service = StudyService::new(db.clone());

    let note = service
        .register_note("student-1", "bio.txt", NOTE_TEXT)
        .await
        .unwrap();

    assert_eq!(note.text_length, NOTE_TEXT.len() as i64);
    assert!(db.get_user("student-1").await.unwrap().is_some());

    let stored = service.get_note(note.id).await.unwrap().unwrap();
    assert_eq!(stored.original_text, NOTE_TEXT);
    assert_eq!(stored.filename, "bio.txt");
}

#[tokio::test]
async fn test_note_length_counts_characters() {
    let service = StudyService::new(memory_database().await);

    let note = service
        .register_note("student-1", "menu.txt", "café au lait")
        .await
        .unwrap();
    assert_eq!(note.text_length, 12);

    let listing = service.list_notes("student-1", 1).await.unwrap();
    assert_eq!(listing[0].text_length, 12);
}

#[tokio::test]
async fn test_note_listing_is_newest_first_and_limited() {
    let service = StudyService::new(memory_database().await);
    for name in ["a.txt", "b.txt", "c.txt"] {
        service.register_note("student-1", name, "body").await.unwrap();
    }
    service.register_note("student-2", "other.txt", "body").await.unwrap();

    let notes = service.list_notes("student-1", 2).await.unwrap();
    let names: Vec<&str> = notes.iter().map(|n| n.filename.as_str()).collect();
    assert_eq!(names, vec!["c.txt", "b.txt"]);

    assert!(service.list_notes("nobody", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_summaries_attach_to_note() {
    let service = StudyService::new(memory_database().await);
    let note = service.register_note("student-1", "bio.txt", NOTE_TEXT).await.unwrap();

    service
        .record_summary(note.id, "student-1", "Short version.", "concise")
        .await
        .unwrap();
    service
        .record_summary(note.id, "student-1", "- point", "bullet_points")
        .await
        .unwrap();

    let summaries = service.list_summaries(note.id).await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].summary_type, "bullet_points");
    assert_eq!(summaries[1].summary_text, "Short version.");
}

#[tokio::test]
async fn test_summary_for_missing_note_fails() {
    let service = StudyService::new(memory_database().await);
    assert!(service
        .record_summary(999, "student-1", "text", "concise")
        .await
        .is_err());
}

#[tokio::test]
async fn test_quiz_listing_includes_filename() {
    let service = StudyService::new(memory_database().await);
    let note = service.register_note("student-1", "plants.pdf", NOTE_TEXT).await.unwrap();
    let quiz = service
        .record_quiz(note.id, "student-1", &sample_questions(), "mixed")
        .await
        .unwrap();

    let listing = service.list_quizzes("student-1", 10).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, quiz.id);
    assert_eq!(listing[0].filename, "plants.pdf");
    assert_eq!(listing[0].num_questions, 2);
}

#[tokio::test]
async fn test_submit_grades_and_tracks_progress() {
    let service = StudyService::new(memory_database().await);
    let note = service.register_note("student-1", "plants.pdf", NOTE_TEXT).await.unwrap();
    let quiz = service
        .record_quiz(note.id, "student-1", &sample_questions(), "mixed")
        .await
        .unwrap();

    let perfect = service
        .submit_quiz_result(quiz.id, "student-1", &["b".to_string(), "TRUE".to_string()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(perfect.score, 2);
    assert_eq!(perfect.percentage, 100.0);

    let half = service
        .submit_quiz_result(quiz.id, "student-1", &["Oxygen".to_string(), "true".to_string()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(half.score, 1);
    assert_eq!(half.total_questions, 2);

    let third = service
        .submit_quiz_result(quiz.id, "student-1", &[])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(third.percentage, 0.0);

    let progress = service.get_progress("student-1").await.unwrap();
    assert_eq!(progress.total_notes, 1);
    assert_eq!(progress.total_quizzes, 1);
    assert_eq!(progress.total_attempts, 3);
    assert_eq!(progress.average_score, 50.0);
    assert_eq!(progress.last_activity, Some(note.uploaded_at));
}

#[tokio::test]
async fn test_submit_for_unknown_quiz_returns_none() {
    let service = StudyService::new(memory_database().await);
    let result = service
        .submit_quiz_result(42, "student-1", &["A".to_string()])
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_progress_for_new_user_is_empty() {
    let service = StudyService::new(memory_database().await);
    let progress = service.get_progress("fresh").await.unwrap();

    assert_eq!(progress.total_notes, 0);
    assert_eq!(progress.total_attempts, 0);
    assert_eq!(progress.average_score, 0.0);
    assert!(progress.last_activity.is_none());
}

#[tokio::test]
async fn test_average_is_rounded() {
    let db = memory_database().await;
    let service = StudyService::new(db.clone());
    let note = service.register_note("u", "n.txt", "body").await.unwrap();
    let quiz = service
        .record_quiz(note.id, "u", &sample_questions(), "mixed")
        .await
        .unwrap();

    db.save_quiz_result(quiz.id, "u", 1, 3).await.unwrap();
    let progress = service.get_progress("u").await.unwrap();
    assert_eq!(progress.average_score, 33.33);
}
