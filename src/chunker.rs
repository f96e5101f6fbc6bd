/// Default character budget for a single prompt chunk.
pub const DEFAULT_CHUNK_CHARS: usize = 4000;

/// Split `text` into word-bounded chunks of at most `max_length` characters.
///
/// Words are packed greedily. A word longer than `max_length` becomes a
/// chunk of its own. Joining the result with single spaces yields the input
/// with all whitespace runs collapsed.
pub fn chunk_text(text: &str, max_length: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };

        if !current.is_empty() && needed > max_length {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
