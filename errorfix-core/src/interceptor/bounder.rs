/// Default cap on words forwarded to the completion service.
pub const DEFAULT_MAX_WORDS: usize = 9000;

/// Word-count bound applied to valid input before prompt construction.
///
/// Words are runs of non-whitespace. Truncation keeps the original text up to
/// the end of the last kept word, so inter-word whitespace (newlines in stack
/// traces included) survives. No marker is appended here; the prompt-level
/// token guard adds its own.
#[derive(Debug, Clone, Copy)]
pub struct InputBounder {
    max_words: usize,
}

impl Default for InputBounder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORDS)
    }
}

impl InputBounder {
    pub fn new(max_words: usize) -> Self {
        Self { max_words }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn bound<'a>(&self, text: &'a str) -> &'a str {
        match end_of_word(text, self.max_words) {
            Some(end) => text[..end].trim_end(),
            None => text,
        }
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Byte offset just past word number `n`, if the text has more than `n` words.
fn end_of_word(text: &str, n: usize) -> Option<usize> {
    let mut words = 0;
    let mut in_word = false;
    let mut cut = 0;

    for (idx, c) in text.char_indices() {
        if c.is_whitespace() {
            if in_word {
                in_word = false;
                if words == n {
                    cut = idx;
                }
            }
        } else if !in_word {
            in_word = true;
            words += 1;
            if words > n {
                return Some(cut);
            }
        }
    }
    None
}
