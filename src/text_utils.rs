pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated reading time in whole minutes, never less than one.
pub fn estimate_reading_time(text: &str, words_per_minute: usize) -> usize {
    let minutes = count_words(text) as f64 / words_per_minute.max(1) as f64;
    (minutes.round() as usize).max(1)
}

/// First `max_length` characters of `text`, with "..." appended when cut.
pub fn preview_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let head: String = text.chars().take(max_length).collect();
    format!("{}...", head)
}

/// Whether `text` has enough words to be worth sending to the model.
pub fn validate_text_content(text: &str, min_words: usize) -> bool {
    !text.trim().is_empty() && count_words(text) >= min_words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("  one two\tthree\n"), 3);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_reading_time() {
        let text = "word ".repeat(500);
        assert_eq!(estimate_reading_time(&text, 200), 3);
        assert_eq!(estimate_reading_time("tiny", 200), 1);
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview_text("short", 10), "short");
        assert_eq!(preview_text("abcdefghij", 4), "abcd...");
        assert_eq!(preview_text("ééééé", 2), "éé...");
    }

    #[test]
    fn test_validate_text_content() {
        assert!(!validate_text_content("too short", 10));
        assert!(validate_text_content(&"word ".repeat(10), 10));
        assert!(!validate_text_content("   ", 0));
    }
}
